use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamLanguage {
    pub code: String,
    #[serde(default, alias = "title")]
    pub name: Option<String>,
}

impl StreamLanguage {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: Some(name.into()),
        }
    }

    /// Label to show in a track picker, falling back to the code.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.code)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSubtitle {
    pub code: String,
    #[serde(default, alias = "title")]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl StreamSubtitle {
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.code)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamQuality {
    pub name: String,
    #[serde(default)]
    pub bitrate: Option<i64>,
}
