//! Environment variable overlay.
//!
//! Each call reads one variable and, if it is set to a non-empty string, parses
//! it into the destination. An absent or empty variable leaves the destination
//! at whatever default it already holds. A failed parse also leaves it
//! untouched and returns an error naming the variable.
//!
//! ```ignore
//! let mut port: u64 = 8080;
//! let mut listen = TcpAddr::default();
//! env::uint64_var(&mut port, "APP_PORT")?;
//! env::var(&mut listen, "APP_LISTEN")?;
//! ```
//!
//! [`EnvLoader`] batches many variables through one chain with an
//! [`ErrorPolicy`], and can read from a synthetic lookup instead of the process
//! environment.

use std::env::VarError;

use tracing::{debug, trace};

use crate::duration::Duration;
use crate::error::ConfigError;
use crate::types::ErrorPolicy;
use crate::value::Settable;

type Lookup<'a> = Box<dyn Fn(&str) -> Result<Option<String>, ConfigError> + 'a>;

fn process_lookup(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(ConfigError::EnvNotUnicode {
            key: key.to_string(),
        }),
    }
}

/// Look up `key` and hand a non-empty value to `apply`.
fn overlay<F>(
    lookup: &dyn Fn(&str) -> Result<Option<String>, ConfigError>,
    key: &str,
    apply: F,
) -> Result<(), ConfigError>
where
    F: FnOnce(&str) -> Result<(), ConfigError>,
{
    let text = match lookup(key)? {
        Some(text) if !text.is_empty() => text,
        _ => {
            trace!(key, "environment variable unset, keeping current value");
            return Ok(());
        }
    };
    apply(&text).map_err(|e| ConfigError::Env {
        key: key.to_string(),
        source: Box::new(e),
    })?;
    debug!(key, "applied environment variable");
    Ok(())
}

/// Types with a fixed textual parse for environment values.
trait Primitive: Sized {
    const KIND: &'static str;

    fn parse_text(text: &str) -> Result<Self, String>;
}

macro_rules! from_str_primitive {
    ($($ty:ty => $kind:literal),* $(,)?) => {
        $(
            impl Primitive for $ty {
                const KIND: &'static str = $kind;

                fn parse_text(text: &str) -> Result<Self, String> {
                    text.parse::<$ty>().map_err(|e| e.to_string())
                }
            }
        )*
    };
}

from_str_primitive! {
    isize => "integer",
    i64 => "64-bit integer",
    usize => "unsigned integer",
    u64 => "unsigned 64-bit integer",
    f64 => "float",
}

impl Primitive for bool {
    const KIND: &'static str = "boolean";

    fn parse_text(text: &str) -> Result<Self, String> {
        match text {
            "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
            "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
            _ => Err("expected one of 1, t, T, TRUE, true, True, 0, f, F, FALSE, false, False".into()),
        }
    }
}

fn set_primitive<P: Primitive>(dest: &mut P, text: &str) -> Result<(), ConfigError> {
    *dest = P::parse_text(text).map_err(|reason| ConfigError::InvalidValue {
        kind: P::KIND,
        input: text.to_string(),
        reason,
    })?;
    Ok(())
}

/// Apply variable `key` to any [`Settable`] value.
pub fn var<V: Settable + ?Sized>(value: &mut V, key: &str) -> Result<(), ConfigError> {
    overlay(&process_lookup, key, |text| value.set(text))
}

pub fn string_var(dest: &mut String, key: &str) -> Result<(), ConfigError> {
    overlay(&process_lookup, key, |text| {
        *dest = text.to_string();
        Ok(())
    })
}

/// Accepts `1 t T TRUE true True` and `0 f F FALSE false False`.
pub fn bool_var(dest: &mut bool, key: &str) -> Result<(), ConfigError> {
    overlay(&process_lookup, key, |text| set_primitive(dest, text))
}

pub fn int_var(dest: &mut isize, key: &str) -> Result<(), ConfigError> {
    overlay(&process_lookup, key, |text| set_primitive(dest, text))
}

pub fn int64_var(dest: &mut i64, key: &str) -> Result<(), ConfigError> {
    overlay(&process_lookup, key, |text| set_primitive(dest, text))
}

pub fn uint_var(dest: &mut usize, key: &str) -> Result<(), ConfigError> {
    overlay(&process_lookup, key, |text| set_primitive(dest, text))
}

pub fn uint64_var(dest: &mut u64, key: &str) -> Result<(), ConfigError> {
    overlay(&process_lookup, key, |text| set_primitive(dest, text))
}

pub fn float64_var(dest: &mut f64, key: &str) -> Result<(), ConfigError> {
    overlay(&process_lookup, key, |text| set_primitive(dest, text))
}

/// Accepts the same syntax as [`Duration::parse`], e.g. `1m30s`.
pub fn duration_var(dest: &mut Duration, key: &str) -> Result<(), ConfigError> {
    var(dest, key)
}

/// Applies many variables through one chain under an [`ErrorPolicy`].
///
/// With [`ContinueOnError`](ErrorPolicy::ContinueOnError) every call runs and
/// [`finish`](Self::finish) reports the first failure. With
/// [`StopOnError`](ErrorPolicy::StopOnError) calls after the first failure are
/// skipped.
///
/// ```ignore
/// let mut env = EnvLoader::new(ErrorPolicy::ContinueOnError);
/// env.string(&mut cfg.title, "APP_TITLE")
///     .uint64(&mut cfg.workers, "APP_WORKERS")
///     .var(&mut cfg.listen, "APP_LISTEN");
/// env.finish()?;
/// ```
pub struct EnvLoader<'a> {
    lookup: Lookup<'a>,
    policy: ErrorPolicy,
    first_error: Option<ConfigError>,
}

impl EnvLoader<'static> {
    /// Read from the process environment.
    pub fn new(policy: ErrorPolicy) -> Self {
        EnvLoader {
            lookup: Box::new(process_lookup),
            policy,
            first_error: None,
        }
    }
}

impl<'a> EnvLoader<'a> {
    /// Read from `lookup` instead of the process environment.
    pub fn with_lookup<F>(policy: ErrorPolicy, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + 'a,
    {
        EnvLoader {
            lookup: Box::new(move |key: &str| Ok(lookup(key))),
            policy,
            first_error: None,
        }
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// The first failure so far, if any.
    pub fn error(&self) -> Option<&ConfigError> {
        self.first_error.as_ref()
    }

    fn step<F>(&mut self, key: &str, apply: F) -> &mut Self
    where
        F: FnOnce(&str) -> Result<(), ConfigError>,
    {
        if self.first_error.is_some() && self.policy == ErrorPolicy::StopOnError {
            trace!(key, "skipping environment variable after earlier failure");
            return self;
        }
        if let Err(e) = overlay(&*self.lookup, key, apply) {
            debug!(key, error = %e, "environment variable rejected");
            self.first_error.get_or_insert(e);
        }
        self
    }

    pub fn var<V: Settable + ?Sized>(&mut self, value: &mut V, key: &str) -> &mut Self {
        self.step(key, |text| value.set(text))
    }

    pub fn string(&mut self, dest: &mut String, key: &str) -> &mut Self {
        self.step(key, |text| {
            *dest = text.to_string();
            Ok(())
        })
    }

    pub fn bool(&mut self, dest: &mut bool, key: &str) -> &mut Self {
        self.step(key, |text| set_primitive(dest, text))
    }

    pub fn int(&mut self, dest: &mut isize, key: &str) -> &mut Self {
        self.step(key, |text| set_primitive(dest, text))
    }

    pub fn int64(&mut self, dest: &mut i64, key: &str) -> &mut Self {
        self.step(key, |text| set_primitive(dest, text))
    }

    pub fn uint(&mut self, dest: &mut usize, key: &str) -> &mut Self {
        self.step(key, |text| set_primitive(dest, text))
    }

    pub fn uint64(&mut self, dest: &mut u64, key: &str) -> &mut Self {
        self.step(key, |text| set_primitive(dest, text))
    }

    pub fn float64(&mut self, dest: &mut f64, key: &str) -> &mut Self {
        self.step(key, |text| set_primitive(dest, text))
    }

    pub fn duration(&mut self, dest: &mut Duration, key: &str) -> &mut Self {
        self.var(dest, key)
    }

    /// Consume the loader, returning the first failure if there was one.
    pub fn finish(self) -> Result<(), ConfigError> {
        match self.first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for EnvLoader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvLoader")
            .field("policy", &self.policy)
            .field("first_error", &self.first_error)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addr::TcpAddr;
    use crate::error::ErrorKind;
    use crate::url::Url;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn loader(env: &HashMap<String, String>, policy: ErrorPolicy) -> EnvLoader<'_> {
        EnvLoader::with_lookup(policy, move |key| env.get(key).cloned())
    }

    // --- process environment ---

    #[test]
    fn unset_keeps_default() {
        temp_env::with_var_unset("CONFIGVAL_ENV_PORT", || {
            let mut port: u64 = 8080;
            uint64_var(&mut port, "CONFIGVAL_ENV_PORT").unwrap();
            assert_eq!(port, 8080);
        });
    }

    #[test]
    fn empty_keeps_default() {
        temp_env::with_var("CONFIGVAL_ENV_TITLE", Some(""), || {
            let mut title = String::from("Default Title");
            string_var(&mut title, "CONFIGVAL_ENV_TITLE").unwrap();
            assert_eq!(title, "Default Title");
        });
    }

    #[test]
    fn set_overrides_default() {
        temp_env::with_vars(
            [
                ("CONFIGVAL_ENV_VERSION", Some("3")),
                ("CONFIGVAL_ENV_TITLE", Some("From Env")),
            ],
            || {
                let mut version: isize = 2;
                let mut title = String::from("Default Title");
                int_var(&mut version, "CONFIGVAL_ENV_VERSION").unwrap();
                string_var(&mut title, "CONFIGVAL_ENV_TITLE").unwrap();
                assert_eq!(version, 3);
                assert_eq!(title, "From Env");
            },
        );
    }

    #[test]
    fn parse_failure_names_variable_and_keeps_value() {
        temp_env::with_var("CONFIGVAL_ENV_COUNT", Some("eleven"), || {
            let mut count: i64 = 7;
            let err = int64_var(&mut count, "CONFIGVAL_ENV_COUNT").unwrap_err();
            assert_eq!(count, 7);
            assert_eq!(err.kind(), ErrorKind::Format);
            let msg = err.to_string();
            assert!(msg.contains("CONFIGVAL_ENV_COUNT"));
            assert!(msg.contains("eleven"));
        });
    }

    #[test]
    fn settable_values() {
        temp_env::with_vars(
            [
                ("CONFIGVAL_ENV_URL", Some("http://www.example.com/")),
                ("CONFIGVAL_ENV_LISTEN", Some("tcp:127.0.0.1:53")),
                ("CONFIGVAL_ENV_TIMEOUT", Some("1m30s")),
            ],
            || {
                let mut url = Url::default();
                let mut listen = TcpAddr::default();
                let mut timeout = Duration::from_secs(5);
                var(&mut url, "CONFIGVAL_ENV_URL").unwrap();
                var(&mut listen, "CONFIGVAL_ENV_LISTEN").unwrap();
                duration_var(&mut timeout, "CONFIGVAL_ENV_TIMEOUT").unwrap();
                assert_eq!(url.to_text().unwrap(), "http://www.example.com/");
                assert_eq!(listen.port(), 53);
                assert_eq!(timeout, Duration::from_secs(90));
            },
        );
    }

    #[test]
    fn settable_failure_keeps_value() {
        temp_env::with_var("CONFIGVAL_ENV_LISTEN_BAD", Some("udp:127.0.0.1:53"), || {
            let mut listen: TcpAddr = "tcp:127.0.0.1:80".parse().unwrap();
            let err = var(&mut listen, "CONFIGVAL_ENV_LISTEN_BAD").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
            assert_eq!(listen.port(), 80);
        });
    }

    // --- typed parsers ---

    #[test]
    fn bool_tokens() {
        for token in ["1", "t", "T", "TRUE", "true", "True"] {
            let mut b = false;
            set_primitive(&mut b, token).unwrap();
            assert!(b, "{token}");
        }
        for token in ["0", "f", "F", "FALSE", "false", "False"] {
            let mut b = true;
            set_primitive(&mut b, token).unwrap();
            assert!(!b, "{token}");
        }
        let mut b = true;
        assert!(set_primitive(&mut b, "yes").is_err());
        assert!(set_primitive(&mut b, "tRUE").is_err());
        assert!(b);
    }

    #[test]
    fn unsigned_rejects_negative() {
        let mut n: usize = 4;
        let err = set_primitive(&mut n, "-1").unwrap_err();
        assert!(err.to_string().contains("unsigned integer"));
        assert_eq!(n, 4);
    }

    #[test]
    fn overflow_keeps_value() {
        let mut n: u64 = 1;
        assert!(set_primitive(&mut n, "18446744073709551616").is_err());
        assert_eq!(n, 1);
        set_primitive(&mut n, "18446744073709551615").unwrap();
        assert_eq!(n, u64::MAX);
    }

    #[test]
    fn floats() {
        let mut f = 0.0;
        set_primitive(&mut f, "2.5e3").unwrap();
        assert_eq!(f, 2500.0);
        assert!(set_primitive(&mut f, "2.5.3").is_err());
        assert_eq!(f, 2500.0);
    }

    // --- batching ---

    #[test]
    fn loader_applies_in_order() {
        let env = vars(&[
            ("APP_TITLE", "Batch"),
            ("APP_WORKERS", "16"),
            ("APP_DEBUG", "T"),
            ("APP_RATE", "0.25"),
        ]);
        let mut title = String::from("Default");
        let mut workers: u64 = 4;
        let mut debug = false;
        let mut rate = 1.0;
        let mut offset: i64 = -3;

        let mut loader = loader(&env, ErrorPolicy::ContinueOnError);
        loader
            .string(&mut title, "APP_TITLE")
            .uint64(&mut workers, "APP_WORKERS")
            .bool(&mut debug, "APP_DEBUG")
            .float64(&mut rate, "APP_RATE")
            .int64(&mut offset, "APP_OFFSET");
        loader.finish().unwrap();

        assert_eq!(title, "Batch");
        assert_eq!(workers, 16);
        assert!(debug);
        assert_eq!(rate, 0.25);
        assert_eq!(offset, -3);
    }

    #[test]
    fn continue_on_error_reports_first_failure() {
        let env = vars(&[("A", "x"), ("B", "y"), ("C", "9")]);
        let (mut a, mut b, mut c): (isize, usize, u64) = (1, 2, 3);

        let mut loader = loader(&env, ErrorPolicy::ContinueOnError);
        loader.int(&mut a, "A").uint(&mut b, "B").uint64(&mut c, "C");
        assert!(loader.error().is_some());
        let err = loader.finish().unwrap_err();

        assert!(matches!(&err, ConfigError::Env { key, .. } if key == "A"));
        assert_eq!((a, b, c), (1, 2, 9));
    }

    #[test]
    fn stop_on_error_skips_rest() {
        let env = vars(&[("A", "x"), ("C", "9")]);
        let (mut a, mut c): (isize, u64) = (1, 3);

        let mut loader = loader(&env, ErrorPolicy::StopOnError);
        loader.int(&mut a, "A").uint64(&mut c, "C");
        let err = loader.finish().unwrap_err();

        assert!(matches!(&err, ConfigError::Env { key, .. } if key == "A"));
        assert_eq!((a, c), (1, 3));
    }

    #[test]
    fn loader_settable_and_duration() {
        let env = vars(&[("LISTEN", "tcp6:[::1]:8053"), ("TIMEOUT", "250ms")]);
        let mut listen = TcpAddr::default();
        let mut timeout = Duration::ZERO;

        let mut loader = loader(&env, ErrorPolicy::default());
        loader
            .var(&mut listen, "LISTEN")
            .duration(&mut timeout, "TIMEOUT");
        loader.finish().unwrap();

        assert!(listen.ip().is_ipv6());
        assert_eq!(timeout, Duration::from_millis(250));
    }

    #[test]
    fn default_policy_continues() {
        assert_eq!(ErrorPolicy::default(), ErrorPolicy::ContinueOnError);
        let loader = EnvLoader::new(ErrorPolicy::default());
        assert_eq!(loader.policy(), ErrorPolicy::ContinueOnError);
        assert!(loader.finish().is_ok());
    }
}
