//! TLS settings: a serializable declaration plus the certificate material loaded
//! from it.
//!
//! A [`TlsConfig`] is what appears in a config file:
//!
//! ```yaml
//! rootCAFiles: [/etc/app/root.pem]
//! clientCAFiles: [/etc/app/clients.pem]
//! clientAuth: require+verify
//! certificates:
//!   - certFile: /etc/app/server.crt
//!     keyFile: /etc/app/server.key
//! ```
//!
//! Deserializing a [`Tls`] parses the declaration and then reads every file it
//! names into a [`TlsContext`]. Loading is all-or-nothing: the first unreadable or
//! malformed file fails the whole load. Serializing a `Tls` writes the
//! declaration only.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::RootCertStore;
use rustls::pki_types::CertificateDer;
use rustls::sign::CertifiedKey;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, trace, warn};

use crate::error::ConfigError;
use crate::value::{self, Settable, settable_serde};

/// How a server treats client certificates.
///
/// | Name             | Meaning                                          |
/// |------------------|--------------------------------------------------|
/// | `none`           | no client certificate requested (default)        |
/// | `request`        | requested, not required, not verified            |
/// | `require`        | required, not verified                           |
/// | `verify`         | requested, verified if given                     |
/// | `require+verify` | required and verified                            |
///
/// Names are matched case-insensitively. A value built with
/// [`from_code`](Self::from_code) from a code outside the table has no name and
/// fails to serialize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TlsClientAuth(u8);

const CLIENT_AUTH_NAMES: [(&str, u8); 5] = [
    ("none", 0),
    ("request", 1),
    ("require", 2),
    ("verify", 3),
    ("require+verify", 4),
];

const fn client_auth_table_is_injective() -> bool {
    let mut i = 0;
    while i < CLIENT_AUTH_NAMES.len() {
        let mut j = i + 1;
        while j < CLIENT_AUTH_NAMES.len() {
            if CLIENT_AUTH_NAMES[i].1 == CLIENT_AUTH_NAMES[j].1 {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

const _: () = assert!(client_auth_table_is_injective());

impl TlsClientAuth {
    pub const NONE: TlsClientAuth = TlsClientAuth(0);
    pub const REQUEST: TlsClientAuth = TlsClientAuth(1);
    pub const REQUIRE: TlsClientAuth = TlsClientAuth(2);
    pub const VERIFY: TlsClientAuth = TlsClientAuth(3);
    pub const REQUIRE_AND_VERIFY: TlsClientAuth = TlsClientAuth(4);

    pub const fn from_code(code: u8) -> Self {
        TlsClientAuth(code)
    }

    pub const fn code(self) -> u8 {
        self.0
    }

    pub fn name(self) -> Option<&'static str> {
        CLIENT_AUTH_NAMES
            .iter()
            .find(|(_, code)| *code == self.0)
            .map(|(name, _)| *name)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        CLIENT_AUTH_NAMES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, code)| TlsClientAuth(*code))
    }

    /// Whether the server asks the client for a certificate at all.
    pub fn requests_certificate(self) -> bool {
        self != Self::NONE
    }

    /// Whether a handshake without a client certificate is refused.
    pub fn requires_certificate(self) -> bool {
        self == Self::REQUIRE || self == Self::REQUIRE_AND_VERIFY
    }

    /// Whether a presented client certificate is checked against the client CAs.
    pub fn verifies_certificate(self) -> bool {
        self == Self::VERIFY || self == Self::REQUIRE_AND_VERIFY
    }
}

impl Settable for TlsClientAuth {
    fn set(&mut self, text: &str) -> Result<(), ConfigError> {
        *self = TlsClientAuth::from_name(text)
            .ok_or_else(|| ConfigError::UnknownClientAuth(text.to_string()))?;
        Ok(())
    }

    fn to_text(&self) -> Result<String, ConfigError> {
        self.name()
            .map(str::to_string)
            .ok_or(ConfigError::UnnamedClientAuth(self.0))
    }
}

impl fmt::Display for TlsClientAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "<invalid {}>", self.0),
        }
    }
}

settable_serde!(TlsClientAuth);

/// A certificate chain file and its private key file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsCertificate {
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
}

/// The TLS declaration as written in a config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsConfig {
    #[serde(rename = "rootCAFiles", default, skip_serializing_if = "Vec::is_empty")]
    pub root_ca_files: Vec<PathBuf>,

    #[serde(rename = "clientCAFiles", default, skip_serializing_if = "Vec::is_empty")]
    pub client_ca_files: Vec<PathBuf>,

    #[serde(rename = "clientAuth", default)]
    pub client_auth: TlsClientAuth,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub certificates: Vec<TlsCertificate>,
}

/// Certificate material loaded from a [`TlsConfig`].
#[derive(Debug, Clone, Default)]
pub struct TlsContext {
    client_auth: TlsClientAuth,
    root_cas: Option<RootCertStore>,
    client_cas: Option<RootCertStore>,
    certificates: Vec<Arc<CertifiedKey>>,
}

impl TlsContext {
    pub fn client_auth(&self) -> TlsClientAuth {
        self.client_auth
    }

    /// Trust anchors for verifying servers. `None` when no root CA files were declared.
    pub fn root_cas(&self) -> Option<&RootCertStore> {
        self.root_cas.as_ref()
    }

    /// Trust anchors for verifying clients. `None` when no client CA files were declared.
    pub fn client_cas(&self) -> Option<&RootCertStore> {
        self.client_cas.as_ref()
    }

    /// Certificates in declaration order. The first one is the fallback when no
    /// certificate matches a requested server name.
    pub fn certificates(&self) -> &[Arc<CertifiedKey>] {
        &self.certificates
    }
}

/// A TLS declaration together with the material loaded from it.
#[derive(Debug, Clone, Default)]
pub struct Tls {
    config: TlsConfig,
    context: TlsContext,
}

impl Tls {
    /// Read every file named by `config`. Fails on the first unreadable or
    /// malformed file; nothing is kept from a failed load.
    pub fn load(config: TlsConfig) -> Result<Self, ConfigError> {
        let context = load_context(&config)?;
        Ok(Tls { config, context })
    }

    pub fn config(&self) -> &TlsConfig {
        &self.config
    }

    pub fn context(&self) -> &TlsContext {
        &self.context
    }
}

fn load_context(config: &TlsConfig) -> Result<TlsContext, ConfigError> {
    let root_cas = if config.root_ca_files.is_empty() {
        None
    } else {
        Some(load_cert_pool(&config.root_ca_files)?)
    };

    let client_cas = if config.client_ca_files.is_empty() {
        None
    } else {
        Some(load_cert_pool(&config.client_ca_files)?)
    };

    let certificates = config
        .certificates
        .iter()
        .map(load_key_pair)
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        client_auth = %config.client_auth,
        root_cas = root_cas.as_ref().map_or(0, RootCertStore::len),
        client_cas = client_cas.as_ref().map_or(0, RootCertStore::len),
        certificates = certificates.len(),
        "loaded TLS material"
    );

    Ok(TlsContext {
        client_auth: config.client_auth,
        root_cas,
        client_cas,
        certificates,
    })
}

fn read_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, ConfigError> {
    let pem = std::fs::read(path).map_err(|e| ConfigError::io(path, e))?;
    let certs = rustls_pemfile::certs(&mut pem.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ConfigError::Pem {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    if certs.is_empty() {
        return Err(ConfigError::Pem {
            path: path.to_path_buf(),
            reason: "no certificates found".into(),
        });
    }
    Ok(certs)
}

fn load_cert_pool(files: &[PathBuf]) -> Result<RootCertStore, ConfigError> {
    let mut pool = RootCertStore::empty();
    for file in files {
        let certs = read_certs(file)?;
        let (added, ignored) = pool.add_parsable_certificates(certs);
        if ignored > 0 {
            warn!(path = %file.display(), ignored, "skipped unparsable certificates");
        }
        debug!(path = %file.display(), added, "added certificates to pool");
    }
    Ok(pool)
}

fn load_key_pair(pair: &TlsCertificate) -> Result<Arc<CertifiedKey>, ConfigError> {
    let chain = read_certs(&pair.cert_file)?;

    let key_pem = std::fs::read(&pair.key_file).map_err(|e| ConfigError::io(&pair.key_file, e))?;
    let key = rustls_pemfile::private_key(&mut key_pem.as_slice())
        .map_err(|e| ConfigError::Pem {
            path: pair.key_file.clone(),
            reason: e.to_string(),
        })?
        .ok_or_else(|| ConfigError::Pem {
            path: pair.key_file.clone(),
            reason: "no private key found".into(),
        })?;

    let signing_key =
        rustls::crypto::ring::sign::any_supported_type(&key).map_err(|e| ConfigError::KeyPair {
            cert_file: pair.cert_file.clone(),
            key_file: pair.key_file.clone(),
            reason: e.to_string(),
        })?;

    let certified = CertifiedKey::new(chain, signing_key);
    match certified.keys_match() {
        Ok(()) => {}
        // The signing key cannot report its public half; nothing to compare.
        Err(rustls::Error::InconsistentKeys(rustls::InconsistentKeys::Unknown)) => {
            trace!(key = %pair.key_file.display(), "key pair consistency not checkable");
        }
        Err(e) => {
            return Err(ConfigError::KeyPair {
                cert_file: pair.cert_file.clone(),
                key_file: pair.key_file.clone(),
                reason: e.to_string(),
            });
        }
    }
    Ok(Arc::new(certified))
}

impl Serialize for Tls {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match value::carry(self) {
            Some(token) => serializer.serialize_str(&token),
            None => self.config.serialize(serializer),
        }
    }
}

struct TlsVisitor;

impl<'de> Visitor<'de> for TlsVisitor {
    type Value = Tls;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a TLS declaration")
    }

    fn visit_str<E: de::Error>(self, text: &str) -> Result<Tls, E> {
        value::take_carried(text)
            .ok_or_else(|| E::invalid_type(de::Unexpected::Str(text), &self))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Tls, A::Error> {
        let config = TlsConfig::deserialize(de::value::MapAccessDeserializer::new(map))?;
        Tls::load(config).map_err(|e| de::Error::custom(value::record_field_error(e)))
    }
}

impl<'de> Deserialize<'de> for Tls {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TlsVisitor)
    }
}

/// Inline form: a JSON or YAML declaration, e.g. `{"rootCAFiles": ["ca.pem"]}`.
impl Settable for Tls {
    fn set(&mut self, text: &str) -> Result<(), ConfigError> {
        let config: TlsConfig = serde_yaml::from_str(text).map_err(ConfigError::TlsDeclaration)?;
        *self = Tls::load(config)?;
        Ok(())
    }

    fn to_text(&self) -> Result<String, ConfigError> {
        let auth = self.config.client_auth;
        if auth.name().is_none() {
            return Err(ConfigError::UnnamedClientAuth(auth.code()));
        }
        serde_json::to_string(&self.config).map_err(ConfigError::TlsEncode)
    }
}

impl std::str::FromStr for Tls {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tls = Tls::default();
        tls.set(s)?;
        Ok(tls)
    }
}
