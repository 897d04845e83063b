//! Typed configuration values that parse themselves from strings, plus the
//! loaders that feed them: environment variables, JSON/YAML/TOML files, and
//! anything else that hands you text (CLI flags, HTTP headers, test code).
//!
//! ```ignore
//! #[derive(Serialize, Deserialize, Default)]
//! struct AppConfig {
//!     listen: TcpAddr,
//!     upstream: Url,
//!     timeout: Duration,
//!     token: IndirectString,
//!     tls: Tls,
//! }
//!
//! let mut config = AppConfig::default();
//! env::var(&mut config.listen, "APP_LISTEN")?;
//! file::load_yaml(&mut config, Path::new("/etc/app/app.yaml"), false)?;
//! ```
//!
//! # The settable contract
//!
//! Every value type implements [`Settable`]: one string in via
//! [`set`](Settable::set), one string out via [`to_text`](Settable::to_text).
//! A failed `set` leaves the value as it was. Serde goes through the same two
//! methods, so a `TcpAddr` is the string `"tcp:1.2.3.4:80"` in JSON, YAML and
//! TOML alike, and the same parser validates it wherever it comes from. Each
//! type also implements `FromStr` and `Display` so it drops straight into a
//! clap `value_parser!`.
//!
//! | Type               | Text form                        | Notes                               |
//! |--------------------|----------------------------------|-------------------------------------|
//! | [`Duration`]       | `1h30m`, `250ms`, `-1.5s`        | Go duration syntax                  |
//! | [`Addr`]           | `net:address`                    | neither half validated              |
//! | [`TcpAddr`]        | `tcp:host:port`                  | `tcp`, `tcp4`, `tcp6`; resolved     |
//! | [`UdpAddr`]        | `udp:host:port`                  | `udp`, `udp4`, `udp6`; resolved     |
//! | [`UnixAddr`]       | `unix:/path`                     | `unix`, `unixpacket`, `unixgram`    |
//! | [`IndirectString`] | `literal`, `$VAR`, `/path`       | serializes the reference, not value |
//! | [`Url`]            | URL or relative reference        | empty string means unset            |
//! | [`TlsClientAuth`]  | `none` ... `require+verify`      | case-insensitive                    |
//! | [`Tls`]            | inline JSON/YAML declaration     | loads PEM material on parse         |
//!
//! # Layer precedence
//!
//! ```text
//! Compiled defaults     Default::default() or hand-set fields
//!        ↑ overridden by
//! Environment vars      env::var / EnvLoader
//!        ↑ overridden by
//! Config file           file::load_*
//!        ↑ overridden by
//! CLI flags             Settable::set / FromStr
//! ```
//!
//! Environment comes before the file so that the file location itself can be
//! chosen by an environment variable. Every layer is sparse: an unset or empty
//! variable keeps the default, and a file only replaces the keys it mentions.
//!
//! # Environment variables
//!
//! The [`env`] module has one entry point per primitive type plus [`env::var`]
//! for any `Settable`. [`EnvLoader`] runs a chain of them under an
//! [`ErrorPolicy`] and can read from a synthetic lookup instead of the process
//! environment.
//!
//! # Config files
//!
//! [`file::load`] merges a JSON, YAML or TOML document over the current
//! struct. Missing optional files are skipped. Values the file does not
//! mention are carried over without being parsed again. The struct is replaced
//! only if the whole document applies cleanly, and a field's parse error keeps
//! its own [`ErrorKind`].
//!
//! # TLS
//!
//! A [`Tls`] field deserializes from a [`TlsConfig`] declaration and
//! immediately reads every CA bundle, certificate and key it names into a
//! [`TlsContext`] of rustls types. A missing or malformed file fails the load.
//! Serializing writes the declaration back, never the key material.
//!
//! # Errors and logging
//!
//! All fallible operations return [`ConfigError`], whose messages name the
//! offending text, path or variable. [`ConfigError::kind`] sorts them into
//! format, validation, I/O and structural failures. The crate emits `tracing`
//! events at debug and trace level and never logs values.

pub mod env;
pub mod error;
pub mod file;
pub mod types;
pub mod value;

mod addr;
mod duration;
pub(crate) mod merge;
mod string;
mod tls;
mod url;

#[cfg(test)]
mod fixtures;

pub use addr::{Addr, TcpAddr, TcpNetwork, UdpAddr, UdpNetwork, UnixAddr, UnixNetwork, render_addr};
pub use duration::Duration;
pub use env::EnvLoader;
pub use error::{ConfigError, ErrorKind};
pub use string::IndirectString;
pub use tls::{Tls, TlsCertificate, TlsClientAuth, TlsConfig, TlsContext};
pub use types::{ErrorPolicy, Format};
pub use crate::url::{Url, UrlRef};
pub use value::Settable;
