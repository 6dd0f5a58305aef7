//! Tag value type used by tag-coverage filters.

use crate::filter::ConstructionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A non-blank tag, stored and compared in normalized form.
///
/// Normalization trims the input, collapses runs of internal whitespace to a
/// single space and lowercases the result, so `" Quick  Meal"` and
/// `"quick meal"` are the same tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Tag(String);

impl Tag {
    pub fn new(value: impl AsRef<str>) -> Result<Self, ConstructionError> {
        let normalized = value
            .as_ref()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        if normalized.is_empty() {
            return Err(ConstructionError::BlankTag);
        }
        Ok(Tag(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Tag {
    type Error = ConstructionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Tag::new(value)
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        tag.0
    }
}
