use std::path::PathBuf;
use thiserror::Error;

/// Broad classification of a [`ConfigError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed literal text for a type (missing colon, bad number, bad duration).
    Format,
    /// Well-formed but rejected (wrong network family, unknown auth mode).
    Validation,
    /// A file could not be read.
    Io,
    /// A JSON/YAML/TOML document does not match the expected shape.
    Structural,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid address format '{0}': should be net:addr")]
    AddrFormat(String),

    #[error("Invalid {family} network '{network}'")]
    InvalidNetwork {
        family: &'static str,
        network: String,
    },

    #[error("Failed to resolve {network} address '{address}': {source}")]
    Resolve {
        network: String,
        address: String,
        source: std::io::Error,
    },

    #[error("Invalid {network} address '{address}': {reason}")]
    InvalidAddress {
        network: String,
        address: String,
        reason: String,
    },

    #[error("Invalid duration '{input}': {reason}")]
    InvalidDuration { input: String, reason: &'static str },

    #[error("Invalid URL '{input}': {source}")]
    InvalidUrl {
        input: String,
        source: ::url::ParseError,
    },

    #[error("Invalid {kind} value '{input}': {reason}")]
    InvalidValue {
        kind: &'static str,
        input: String,
        reason: String,
    },

    #[error("Invalid ClientAuthType \"{0}\"")]
    UnknownClientAuth(String),

    #[error("Invalid ClientAuthType value {0}")]
    UnnamedClientAuth(u8),

    #[error("Failed to read {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid PEM data in {path}: {reason}")]
    Pem { path: PathBuf, reason: String },

    #[error("Invalid key pair ({cert_file}, {key_file}): {reason}")]
    KeyPair {
        cert_file: PathBuf,
        key_file: PathBuf,
        reason: String,
    },

    #[error("Failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to apply {path}: {source}")]
    Apply {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Cannot tell the format of {0}: expected a .json, .yaml, .yml or .toml extension")]
    UnknownFormat(PathBuf),

    #[error("Invalid TLS declaration: {0}")]
    TlsDeclaration(#[source] serde_yaml::Error),

    #[error("Failed to render TLS declaration: {0}")]
    TlsEncode(#[source] serde_json::Error),

    #[error("Invalid value in {path}: {source}")]
    Field {
        path: PathBuf,
        source: Box<ConfigError>,
    },

    #[error("Environment variable {key}: {source}")]
    Env {
        key: String,
        source: Box<ConfigError>,
    },

    #[error("Environment variable {key} is not valid unicode")]
    EnvNotUnicode { key: String },
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::IoError {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::AddrFormat(_)
            | ConfigError::InvalidDuration { .. }
            | ConfigError::InvalidUrl { .. }
            | ConfigError::InvalidValue { .. }
            | ConfigError::Pem { .. }
            | ConfigError::KeyPair { .. }
            | ConfigError::EnvNotUnicode { .. } => ErrorKind::Format,
            ConfigError::InvalidNetwork { .. }
            | ConfigError::Resolve { .. }
            | ConfigError::InvalidAddress { .. }
            | ConfigError::UnknownClientAuth(_)
            | ConfigError::UnnamedClientAuth(_)
            | ConfigError::UnknownFormat(_) => ErrorKind::Validation,
            ConfigError::IoError { .. } => ErrorKind::Io,
            ConfigError::Json { .. }
            | ConfigError::Yaml { .. }
            | ConfigError::Toml { .. }
            | ConfigError::Apply { .. }
            | ConfigError::TlsDeclaration(_)
            | ConfigError::TlsEncode(_) => ErrorKind::Structural,
            ConfigError::Env { source, .. } | ConfigError::Field { source, .. } => source.kind(),
        }
    }

    /// True when the error is a file read that failed because the file does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            ConfigError::IoError { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            ConfigError::Env { source, .. } | ConfigError::Field { source, .. } => {
                source.is_not_found()
            }
            _ => false,
        }
    }
}
