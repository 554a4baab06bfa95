use serde::{Deserialize, Serialize};

/// Fields shared by every record the catalog service hands out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentObject {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub content_type: String,
    #[serde(default)]
    pub is_landscape: bool,
}

impl ContentObject {
    pub fn new(id: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content_type: content_type.into(),
            is_landscape: false,
        }
    }

    /// Wire-to-field renames for the base record. Everything maps identity.
    pub fn mapping() -> &'static [(&'static str, &'static str)] {
        &[]
    }
}
