use std::fmt;

use crate::error::ConfigError;
use crate::value::{Settable, settable_serde};

/// A parsed URI reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UrlRef {
    /// Has a scheme; stored in the `url` crate's canonical form.
    Absolute(::url::Url),
    /// No scheme, e.g. `/api/v1` or `../img?x=1`; stored as written.
    Relative(String),
}

/// An absolute URL or relative reference. The empty string is accepted and
/// means "no URL".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Url(Option<UrlRef>);

impl Url {
    /// The absolute URL, if this is one.
    pub fn get(&self) -> Option<&::url::Url> {
        match &self.0 {
            Some(UrlRef::Absolute(u)) => Some(u),
            _ => None,
        }
    }

    /// The relative reference, if this is one.
    pub fn relative(&self) -> Option<&str> {
        match &self.0 {
            Some(UrlRef::Relative(r)) => Some(r),
            _ => None,
        }
    }

    pub fn reference(&self) -> Option<&UrlRef> {
        self.0.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Resolve against `base`. An absolute URL is returned unchanged.
    pub fn resolve(&self, base: &::url::Url) -> Result<Option<::url::Url>, ConfigError> {
        match &self.0 {
            None => Ok(None),
            Some(UrlRef::Absolute(u)) => Ok(Some(u.clone())),
            Some(UrlRef::Relative(r)) => base
                .join(r)
                .map(Some)
                .map_err(|source| ConfigError::InvalidUrl {
                    input: r.clone(),
                    source,
                }),
        }
    }
}

impl From<::url::Url> for Url {
    fn from(u: ::url::Url) -> Self {
        Url(Some(UrlRef::Absolute(u)))
    }
}

fn invalid(text: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        kind: "URL",
        input: text.to_string(),
        reason: reason.to_string(),
    }
}

fn check_relative(text: &str) -> Result<(), ConfigError> {
    if text.chars().any(char::is_control) {
        return Err(invalid(text, "contains a control character"));
    }
    let first_segment = text.split(['/', '?', '#']).next().unwrap_or_default();
    if first_segment.contains(':') {
        return Err(invalid(text, "missing scheme or colon in first path segment"));
    }
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escape = bytes.get(i + 1..i + 3);
            if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
                return Err(invalid(text, "invalid percent escape"));
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    Ok(())
}

fn parse(text: &str) -> Result<UrlRef, ConfigError> {
    match ::url::Url::parse(text) {
        Ok(u) => Ok(UrlRef::Absolute(u)),
        Err(::url::ParseError::RelativeUrlWithoutBase) => {
            check_relative(text)?;
            Ok(UrlRef::Relative(text.to_string()))
        }
        Err(source) => Err(ConfigError::InvalidUrl {
            input: text.to_string(),
            source,
        }),
    }
}

impl Settable for Url {
    fn set(&mut self, text: &str) -> Result<(), ConfigError> {
        self.0 = if text.is_empty() {
            None
        } else {
            Some(parse(text)?)
        };
        Ok(())
    }

    fn to_text(&self) -> Result<String, ConfigError> {
        Ok(self.to_string())
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(UrlRef::Absolute(u)) => f.write_str(u.as_str()),
            Some(UrlRef::Relative(r)) => f.write_str(r),
            None => Ok(()),
        }
    }
}

settable_serde!(Url);
