use super::plugin::PluginKind;
use serde::Serialize;

/// Identifies one grid column. The code is unique within a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    code: String,
    name: String,
    kind: PluginKind,
}

impl Column {
    pub fn new(code: impl Into<String>, name: impl Into<String>, kind: PluginKind) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            kind,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PluginKind {
        self.kind
    }
}
