//! Loading a config struct from a JSON, YAML or TOML file.
//!
//! A file is a sparse overlay on the struct it is loaded into. The current
//! struct is serialized to a value tree, the document is deep-merged over it,
//! and the result is deserialized back. Keys the file does not mention keep
//! their current value, so defaults and environment overrides applied earlier
//! survive.
//!
//! Only values the file supplies are parsed. The crate's own value types
//! (addresses, durations, strings, URLs, TLS) that the file leaves alone are
//! carried across as-is: an indirect string is not re-read and TLS material is
//! not reloaded. A TLS block in the file replaces the whole declaration.
//! When a field rejects its text, the error keeps its own kind, wrapped in
//! [`ConfigError::Field`] with the file path.
//!
//! Plain fields of the target still make the round trip through the value
//! tree, which has two consequences:
//!
//! - `#[serde(skip)]` fields come back as their `Default`.
//! - A float holding NaN or infinity becomes `null` and fails the load.
//!
//! The target is only replaced when the whole load succeeds.
//!
//! A missing file is an error only when `required` is set. Any other read
//! failure is always an error.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::ConfigError;
use crate::merge::merge_values;
use crate::types::Format;
use crate::value::LoadScope;

/// Load `path` as `format` over `target`.
pub fn load<T>(target: &mut T, path: &Path, format: Format, required: bool) -> Result<(), ConfigError>
where
    T: Serialize + DeserializeOwned,
{
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "optional config file not found, skipping");
            return Ok(());
        }
        Err(e) => return Err(ConfigError::io(path, e)),
    };

    let document = parse_document(&content, path, format)?;
    if document.is_null() {
        debug!(path = %path.display(), "config file is empty");
        return Ok(());
    }

    let scope = LoadScope::enter();
    let apply_err = |source| match scope.take_field_error() {
        Some(field) => ConfigError::Field {
            path: path.to_path_buf(),
            source: Box::new(field),
        },
        None => ConfigError::Apply {
            path: path.to_path_buf(),
            source,
        },
    };
    let current = serde_json::to_value(&*target).map_err(apply_err)?;
    let merged = merge_values(current, document);
    let loaded = serde_json::from_value(merged).map_err(apply_err)?;
    drop(scope);
    *target = loaded;

    debug!(path = %path.display(), ?format, "loaded config file");
    Ok(())
}

pub fn load_json<T>(target: &mut T, path: &Path, required: bool) -> Result<(), ConfigError>
where
    T: Serialize + DeserializeOwned,
{
    load(target, path, Format::Json, required)
}

pub fn load_yaml<T>(target: &mut T, path: &Path, required: bool) -> Result<(), ConfigError>
where
    T: Serialize + DeserializeOwned,
{
    load(target, path, Format::Yaml, required)
}

pub fn load_toml<T>(target: &mut T, path: &Path, required: bool) -> Result<(), ConfigError>
where
    T: Serialize + DeserializeOwned,
{
    load(target, path, Format::Toml, required)
}

/// Like [`load`], with the format taken from the file extension.
pub fn load_auto<T>(target: &mut T, path: &Path, required: bool) -> Result<(), ConfigError>
where
    T: Serialize + DeserializeOwned,
{
    let format =
        Format::from_path(path).ok_or_else(|| ConfigError::UnknownFormat(path.to_path_buf()))?;
    load(target, path, format, required)
}

fn parse_document(content: &str, path: &Path, format: Format) -> Result<Value, ConfigError> {
    match format {
        Format::Json => serde_json::from_str(content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        }),
        Format::Yaml => serde_yaml::from_str(content).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        }),
        Format::Toml => toml::from_str(content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addr::{TcpNetwork, UnixNetwork};
    use crate::duration::Duration;
    use crate::error::ErrorKind;
    use crate::fixtures::test::{ExampleConfig, testdata};
    use crate::tls::TlsClientAuth;
    use crate::value::Settable;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn missing_optional_file_is_ok() {
        let dir = TempDir::new().unwrap();
        let mut config = ExampleConfig::default();
        config.num1 = 7;
        load_json(&mut config, &dir.path().join("nope.json"), false).unwrap();
        load_yaml(&mut config, &dir.path().join("nope.yaml"), false).unwrap();
        assert_eq!(config.num1, 7);
    }

    #[test]
    fn missing_required_file_names_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.yaml");
        let mut config = ExampleConfig::default();
        let err = load_yaml(&mut config, &path, true).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("nope.yaml"));
    }

    #[test]
    fn unreadable_path_fails_even_when_optional() {
        // A directory cannot be read as a file.
        let dir = TempDir::new().unwrap();
        let mut config = ExampleConfig::default();
        let err = load_json(&mut config, dir.path(), false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(!err.is_not_found());
    }

    #[test]
    fn json_document() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "app.json",
            r#"{
                "str1": "bla bla bla",
                "num1": 42,
                "url": "http://www.example.com:8080/hello",
                "dur": "1m30s",
                "addr": "tcp:localhost:80",
                "uaddr": "unix:/run/app.sock",
                "taddr": "tcp:1.2.3.4:80",
                "udaddr": "udp6:[::1]:53"
            }"#,
        );
        let mut config = ExampleConfig::default();
        load_json(&mut config, &path, true).unwrap();

        assert_eq!(config.str1.as_str(), "bla bla bla");
        assert_eq!(config.num1, 42);
        assert_eq!(config.url.get().unwrap().port(), Some(8080));
        assert_eq!(config.dur, Duration::from_secs(90));
        assert_eq!(config.addr.network(), "tcp");
        assert_eq!(config.addr.address(), "localhost:80");
        assert_eq!(config.uaddr.network(), UnixNetwork::Unix);
        assert_eq!(config.taddr.network(), TcpNetwork::Tcp);
        assert_eq!(config.taddr.port(), 80);
        assert!(config.udaddr.ip().is_ipv6());

        let out = serde_json::to_value(&config).unwrap();
        assert_eq!(out["taddr"], "tcp:1.2.3.4:80");
        assert_eq!(out["dur"], "1m30s");
    }

    #[test]
    fn yaml_document_with_tls() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "app.yaml",
            &format!(
                "num1: 3\ntls:\n  rootCAFiles: [{}]\n  clientAuth: Require+Verify\n  certificates:\n    - certFile: {}\n      keyFile: {}\n",
                testdata("root_ca.pem").display(),
                testdata("client.crt").display(),
                testdata("client.key").display(),
            ),
        );
        let mut config = ExampleConfig::default();
        load_yaml(&mut config, &path, true).unwrap();

        let ctx = config.tls.context();
        assert_eq!(ctx.client_auth(), TlsClientAuth::REQUIRE_AND_VERIFY);
        assert_eq!(ctx.root_cas().unwrap().len(), 1);
        assert_eq!(ctx.certificates().len(), 1);
        assert_eq!(config.num1, 3);
    }

    #[test]
    fn toml_document() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "app.toml", "num1 = 9\ndur = \"250ms\"\n");
        let mut config = ExampleConfig::default();
        load_auto(&mut config, &path, true).unwrap();
        assert_eq!(config.num1, 9);
        assert_eq!(config.dur, Duration::from_millis(250));
    }

    #[test]
    fn absent_keys_keep_current_values() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "app.yaml", "num1: 5\n");
        let mut config = ExampleConfig::default();
        config.taddr.set("tcp:127.0.0.1:8053").unwrap();
        config.str1.set("from env").unwrap();

        load_yaml(&mut config, &path, true).unwrap();

        assert_eq!(config.num1, 5);
        assert_eq!(config.taddr.port(), 8053);
        assert_eq!(config.str1.as_str(), "from env");
    }

    #[test]
    fn later_files_override_earlier() {
        let dir = TempDir::new().unwrap();
        let global = write(&dir, "global.yaml", "num1: 1\ndur: 10s\n");
        let local = write(&dir, "local.json", r#"{"num1": 2}"#);
        let mut config = ExampleConfig::default();
        load_auto(&mut config, &global, true).unwrap();
        load_auto(&mut config, &local, true).unwrap();
        assert_eq!(config.num1, 2);
        assert_eq!(config.dur, Duration::from_secs(10));
    }

    #[test]
    fn empty_yaml_is_no_op() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "empty.yaml", "");
        let mut config = ExampleConfig::default();
        config.num1 = 11;
        load_yaml(&mut config, &path, true).unwrap();
        assert_eq!(config.num1, 11);
    }

    #[test]
    fn malformed_document_is_structural() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "bad.json", "{ not json");
        let mut config = ExampleConfig::default();
        let err = load_json(&mut config, &path, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
        assert!(err.to_string().contains("bad.json"));
    }

    #[test]
    fn bad_field_leaves_target_untouched() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "bad.yaml", "num1: 5\ntaddr: BADADDR\n");
        let mut config = ExampleConfig::default();
        config.num1 = 1;
        let err = load_yaml(&mut config, &path, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(err.to_string().contains("BADADDR"));
        assert_eq!(config.num1, 1);
    }

    #[test]
    fn wrong_network_family_fails() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "bad.json", r#"{"taddr": "udp:1.2.3.4:53"}"#);
        let mut config = ExampleConfig::default();
        let err = load_json(&mut config, &path, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(matches!(
            &err,
            ConfigError::Field { source, .. }
                if matches!(**source, ConfigError::InvalidNetwork { .. })
        ));
        assert!(err.to_string().contains("udp"));
        assert!(err.to_string().contains("bad.json"));
    }

    #[test]
    fn missing_indirect_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "app.json", r#"{"str1": "/no/such/secret"}"#);
        let mut config = ExampleConfig::default();
        let err = load_json(&mut config, &path, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.is_not_found());
        assert!(err.to_string().contains("/no/such/secret"));
    }

    #[test]
    fn unmentioned_indirect_string_is_not_reread() {
        let dir = TempDir::new().unwrap();
        let secret = write(&dir, "secret", "hunter2\n");
        let mut config = ExampleConfig::default();
        config.str1.set(secret.to_str().unwrap()).unwrap();
        fs::remove_file(&secret).unwrap();

        let path = write(&dir, "app.yaml", "num1: 3\n");
        load_yaml(&mut config, &path, true).unwrap();

        assert_eq!(config.num1, 3);
        assert_eq!(config.str1.as_str(), "hunter2");
        assert_eq!(config.str1.source(), secret.to_str().unwrap());
    }

    #[test]
    fn unmentioned_tls_is_not_reloaded() {
        let dir = TempDir::new().unwrap();
        let ca = dir.path().join("ca.pem");
        fs::copy(testdata("root_ca.pem"), &ca).unwrap();
        let mut config = ExampleConfig::default();
        config
            .tls
            .set(&format!(r#"{{"rootCAFiles": ["{}"]}}"#, ca.display()))
            .unwrap();
        fs::remove_file(&ca).unwrap();

        let path = write(&dir, "app.yaml", "num1: 4\n");
        load_yaml(&mut config, &path, true).unwrap();

        assert_eq!(config.num1, 4);
        assert_eq!(config.tls.context().root_cas().unwrap().len(), 1);
    }

    #[derive(Serialize, serde::Deserialize, Default)]
    struct WithPlainFields {
        port: u16,
        ratio: f64,
        #[serde(skip)]
        cache: u32,
    }

    #[test]
    fn skipped_fields_reset_to_default() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "app.yaml", "port: 80\n");
        let mut config = WithPlainFields {
            cache: 42,
            ..WithPlainFields::default()
        };
        load_yaml(&mut config, &path, true).unwrap();
        assert_eq!(config.port, 80);
        assert_eq!(config.cache, 0);
    }

    #[test]
    fn nan_float_fails_the_load() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "app.yaml", "port: 80\n");
        let mut config = WithPlainFields {
            ratio: f64::NAN,
            ..WithPlainFields::default()
        };
        let err = load_yaml(&mut config, &path, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
        assert!(matches!(err, ConfigError::Apply { .. }));
        assert_eq!(config.port, 0);
    }

    #[test]
    fn tls_with_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "app.yaml",
            "tls:\n  rootCAFiles: [/file/does/not/exist.pem]\n",
        );
        let mut config = ExampleConfig::default();
        let err = load_yaml(&mut config, &path, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.is_not_found());
        assert!(err.to_string().contains("/file/does/not/exist.pem"));
        assert!(config.tls.context().root_cas().is_none());
    }

    #[test]
    fn unknown_extension_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "app.conf", "num1: 1\n");
        let mut config = ExampleConfig::default();
        let err = load_auto(&mut config, &path, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("app.conf"));
    }
}
