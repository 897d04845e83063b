use std::path::Path;

/// Structured text format of a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
    Toml,
}

impl Format {
    /// Pick a format from a file extension (`.json`, `.yaml`/`.yml`, `.toml`).
    /// Returns `None` for anything else.
    pub fn from_path(path: &Path) -> Option<Format> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("json") {
            Some(Format::Json)
        } else if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") {
            Some(Format::Yaml)
        } else if ext.eq_ignore_ascii_case("toml") {
            Some(Format::Toml)
        } else {
            None
        }
    }
}

/// What an [`EnvLoader`](crate::EnvLoader) does after a variable fails to parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Keep applying later variables; the first error is reported at the end.
    #[default]
    ContinueOnError,
    /// Skip every variable after the first failure.
    StopOnError,
}
