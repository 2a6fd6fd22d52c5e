//! Format catalogue entries.

use serde::{Deserialize, Serialize};

/// A reference format record, keyed by its code. Loaded once at startup and
/// never mutated by the write path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Format {
    pub code: String,
    pub name: String,
    pub version: Option<String>,
    pub mime_type: Option<String>,
}

impl Format {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            version: None,
            mime_type: None,
        }
    }

    /// A format known only by its code, used when an identification row
    /// references a code missing from the catalogue.
    pub fn unresolved(code: impl Into<String>) -> Self {
        Self::new(code, "")
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}
