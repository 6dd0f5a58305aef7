use anyhow::Result;
use cookbook_filter::compiler::{CompilerConfig, FilterCompiler};
use cookbook_filter::condition::Aggregate;
use cookbook_filter::config::TableMappingConfig;
use cookbook_filter::{to_dnf, wire};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

const DEFAULT_MAPPING_FILE: &str = "table_mapping.json";

/// 创建编译器实例，优先使用JSON配置，失败时使用默认配置
fn create_compiler_with_config(path: &str) -> FilterCompiler {
    match TableMappingConfig::from_json_file(path) {
        Ok(table_mapping) => {
            println!("✅ 成功从JSON配置文件加载表映射: {}", path);
            for (entity, table) in table_mapping.get_mappings() {
                println!("  {} -> {}", entity, table);
            }
            FilterCompiler::from_config(CompilerConfig {
                table_mapping,
                ..Default::default()
            })
        }
        Err(e) => {
            println!("⚠️ 无法加载JSON配置文件 ({}), 使用默认配置", e);
            FilterCompiler::new()
        }
    }
}

fn print_help() {
    println!("命令:");
    println!("  :product | :dish | :menu   切换目标实体");
    println!("  :dnf <json>                只显示 DNF 规范化结果");
    println!("  :help                      显示帮助");
    println!("  :quit                      退出");
    println!("其他输入按 JSON 过滤器编译, 例如:");
    println!(
        r#"  {{"type":"and","values":[{{"type":"owner","values":["00000000-0000-0000-0000-000000000001"]}},{{"type":"greaterThan","values":["0"]}}]}}"#
    );
}

fn show_dnf(input: &str) {
    let filter = match wire::from_json(input) {
        Ok(filter) => filter,
        Err(e) => {
            println!("✗ 解析失败: {}", e);
            return;
        }
    };
    match to_dnf(&filter) {
        Ok(normalized) => {
            println!("输入: {}", filter);
            println!("DNF:  {}", normalized.as_filter());
            println!("JSON: {}", wire::to_json(normalized.as_filter()));
        }
        Err(e) => println!("✗ 规范化失败: {}", e),
    }
}

fn compile(compiler: &FilterCompiler, input: &str, aggregate: Aggregate) {
    match compiler.compile_json(input, aggregate) {
        Ok(result) => {
            println!("DNF: {}", result.normalized.as_filter());
            println!("\n[生成的 SQL]:");
            println!("{}", result.sql);
        }
        Err(e) if e.is_user_error() => println!("✗ 无效的过滤器: {}", e),
        Err(e) => println!("✗ 编译失败 (内部错误): {}", e),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    println!("--- Cookbook Filter: 过滤器到 SQL 编译器 ---");

    let mapping_file = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_MAPPING_FILE.to_string());
    let compiler = create_compiler_with_config(&mapping_file);
    let mut aggregate = Aggregate::Product;
    print_help();

    let mut editor = DefaultEditor::new()?;
    loop {
        match editor.readline(&format!("{}> ", aggregate)) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                editor.add_history_entry(line)?;

                match line {
                    ":quit" | ":q" => break,
                    ":help" => print_help(),
                    _ if line.starts_with(":dnf") => show_dnf(line.trim_start_matches(":dnf")),
                    _ if line.starts_with(':') => match line[1..].parse::<Aggregate>() {
                        Ok(next) => {
                            aggregate = next;
                            println!("目标实体: {}", aggregate);
                        }
                        Err(e) => println!("✗ {}", e),
                    },
                    _ => compile(&compiler, line, aggregate),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
