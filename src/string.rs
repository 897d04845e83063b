//! Strings that may be read from an environment variable or a file.
//!
//! | Text form            | Resolved value                                   |
//! |----------------------|--------------------------------------------------|
//! | `$NAME`              | value of env var `NAME` (empty if unset)         |
//! | `/p`, `./p`, `../p`  | contents of file `p`, surrounding whitespace trimmed |
//! | anything else        | the text itself                                  |
//!
//! Serialization always emits the original text form, never the resolved value,
//! so secrets pulled from the environment or a file are not written back out.

use std::fmt;

use tracing::debug;

use crate::error::ConfigError;
use crate::value::{Settable, settable_serde};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndirectString {
    source: String,
    value: String,
}

impl IndirectString {
    /// A literal string. No environment or file lookup happens.
    pub fn literal(value: impl Into<String>) -> Self {
        let value = value.into();
        IndirectString {
            source: value.clone(),
            value,
        }
    }

    /// The resolved value.
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// The text this value was set from.
    pub fn source(&self) -> &str {
        &self.source
    }
}

fn is_file_reference(text: &str) -> bool {
    text.starts_with('/') || text.starts_with("./") || text.starts_with("../")
}

fn resolve(text: &str) -> Result<String, ConfigError> {
    if let Some(name) = text.strip_prefix('$') {
        let value = std::env::var_os(name)
            .map(|v| v.to_string_lossy().into_owned())
            .unwrap_or_default();
        debug!(var = name, "resolved string from environment");
        return Ok(value);
    }
    if is_file_reference(text) {
        let contents = std::fs::read_to_string(text).map_err(|e| ConfigError::io(text, e))?;
        debug!(path = text, "resolved string from file");
        return Ok(contents.trim().to_string());
    }
    Ok(text.to_string())
}

impl Settable for IndirectString {
    fn set(&mut self, text: &str) -> Result<(), ConfigError> {
        let value = resolve(text)?;
        self.source = text.to_string();
        self.value = value;
        Ok(())
    }

    fn to_text(&self) -> Result<String, ConfigError> {
        Ok(self.source.clone())
    }
}

impl fmt::Display for IndirectString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl AsRef<str> for IndirectString {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

settable_serde!(IndirectString);
