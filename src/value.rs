//! The string-settable value contract shared by every scalar config type.
//!
//! A [`Settable`] value is fully determined by one string: [`set`](Settable::set)
//! parses it, [`to_text`](Settable::to_text) renders it back. Structured formats
//! see these values as plain string scalars. [`serialize_text`] and
//! [`deserialize_text`] route serde through the contract, so JSON, YAML and TOML
//! all reuse each type's own parser.

use std::any::Any;
use std::cell::RefCell;

use serde::de::{Deserialize, Deserializer, Error as _};
use serde::ser::{Error as _, Serializer};

use crate::error::ConfigError;

/// A value that can be assigned from a single string and rendered back to one.
///
/// A failed `set` leaves the value exactly as it was.
pub trait Settable {
    fn set(&mut self, text: &str) -> Result<(), ConfigError>;

    fn to_text(&self) -> Result<String, ConfigError>;
}

/// Serialize a [`Settable`] as a string scalar.
///
/// Usable directly as `#[serde(serialize_with = "configval::value::serialize_text")]`.
pub fn serialize_text<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Settable + ?Sized,
    S: Serializer,
{
    let text = value
        .to_text()
        .map_err(|e| S::Error::custom(record_field_error(e)))?;
    serializer.serialize_str(&text)
}

/// Deserialize a string scalar and hand it to a fresh value's [`Settable::set`].
pub fn deserialize_text<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: Settable + Default,
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    set_fresh(&text).map_err(D::Error::custom)
}

fn set_fresh<T: Settable + Default>(text: &str) -> Result<T, String> {
    let mut value = T::default();
    value.set(text).map_err(record_field_error)?;
    Ok(value)
}

// While a file is applied over a struct, the struct is serialized and read back.
// Inside a `LoadScope`, crate value types serialize as a token naming a stashed
// clone, and reading the token back returns that clone untouched. Keys the file
// replaces never see the token, so only they go through `set`.

const CARRY_PREFIX: &str = "\u{0}configval-carry:";

#[derive(Default)]
struct ScopeState {
    carried: Vec<Option<Box<dyn Any>>>,
    field_error: Option<ConfigError>,
}

thread_local! {
    static SCOPE: RefCell<Option<ScopeState>> = const { RefCell::new(None) };
}

/// Active for the duration of one file load on this thread.
pub(crate) struct LoadScope {
    previous: Option<ScopeState>,
}

impl LoadScope {
    pub(crate) fn enter() -> Self {
        let previous = SCOPE.with(|s| s.borrow_mut().replace(ScopeState::default()));
        LoadScope { previous }
    }

    /// The typed error behind the most recent failed `set` or `to_text`.
    pub(crate) fn take_field_error(&self) -> Option<ConfigError> {
        SCOPE.with(|s| s.borrow_mut().as_mut()?.field_error.take())
    }
}

impl Drop for LoadScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        SCOPE.with(|s| *s.borrow_mut() = previous);
    }
}

/// Keep `err` for the enclosing [`LoadScope`] and return its message for serde.
pub(crate) fn record_field_error(err: ConfigError) -> String {
    let message = err.to_string();
    SCOPE.with(|s| {
        if let Some(state) = s.borrow_mut().as_mut() {
            state.field_error = Some(err);
        }
    });
    message
}

/// Stash a clone of `value` and return its token, if a scope is active.
pub(crate) fn carry<T: Clone + 'static>(value: &T) -> Option<String> {
    SCOPE.with(|s| {
        let mut s = s.borrow_mut();
        let state = s.as_mut()?;
        state.carried.push(Some(Box::new(value.clone())));
        Some(format!("{CARRY_PREFIX}{}", state.carried.len() - 1))
    })
}

/// Take back a value stashed by [`carry`].
pub(crate) fn take_carried<T: 'static>(text: &str) -> Option<T> {
    let index: usize = text.strip_prefix(CARRY_PREFIX)?.parse().ok()?;
    SCOPE.with(|s| {
        let mut s = s.borrow_mut();
        let slot = s.as_mut()?.carried.get_mut(index)?.take()?;
        slot.downcast::<T>().ok().map(|value| *value)
    })
}

pub(crate) fn serialize_settable<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Settable + Clone + 'static,
    S: Serializer,
{
    match carry(value) {
        Some(token) => serializer.serialize_str(&token),
        None => serialize_text(value, serializer),
    }
}

pub(crate) fn deserialize_settable<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: Settable + Default + 'static,
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    if let Some(value) = take_carried(&text) {
        return Ok(value);
    }
    set_fresh(&text).map_err(D::Error::custom)
}

/// Implement `Serialize`, `Deserialize` and `FromStr` for a `Settable + Default + Clone` type.
macro_rules! settable_serde {
    ($ty:ty) => {
        impl ::serde::Serialize for $ty {
            fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                $crate::value::serialize_settable(self, serializer)
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $ty {
            fn deserialize<D: ::serde::Deserializer<'de>>(
                deserializer: D,
            ) -> Result<Self, D::Error> {
                $crate::value::deserialize_settable(deserializer)
            }
        }

        impl ::std::str::FromStr for $ty {
            type Err = $crate::error::ConfigError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let mut value = <$ty as Default>::default();
                $crate::value::Settable::set(&mut value, s)?;
                Ok(value)
            }
        }
    };
}

pub(crate) use settable_serde;
