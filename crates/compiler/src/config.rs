//! Compiler configuration.
//!
//! Loaded from a `quill.toml` next to the program (or wherever `--config`
//! points). The only knob today is the result type of `/` between operands
//! below SINGLE:
//!
//! ```toml
//! float_divide = "double"
//! ```

use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Result type of float division when neither operand is already a float.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FloatDivide {
    #[default]
    Single,
    Double,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    pub float_divide: FloatDivide,
}

impl CompilerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| format!("invalid config: {e}"))
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let text = fs::read_to_string(path)
            .map_err(|e| format!("cannot read config {}: {e}", path.display()))?;
        Self::from_toml_str(&text)
    }
}
