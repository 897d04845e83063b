//! Signed nanosecond durations with compound text syntax (`"1m30s"`, `"100ms"`).
//!
//! Accepted units: `ns`, `us`, `µs`, `μs`, `ms`, `s`, `m`, `h`. Each component
//! may carry a decimal fraction (`"1.5h"`), components may repeat in any order,
//! and the whole string may carry a leading sign. A bare `"0"` is allowed.

use std::fmt;

use crate::error::ConfigError;
use crate::value::{Settable, settable_serde};

const NANOSECOND: u128 = 1;
const MICROSECOND: u128 = 1_000 * NANOSECOND;
const MILLISECOND: u128 = 1_000 * MICROSECOND;
const SECOND: u128 = 1_000 * MILLISECOND;
const MINUTE: u128 = 60 * SECOND;
const HOUR: u128 = 60 * MINUTE;

/// A signed span of time stored as nanoseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration(i64);

impl Duration {
    pub const ZERO: Duration = Duration(0);

    pub const fn from_nanos(nanos: i64) -> Self {
        Duration(nanos)
    }

    pub const fn from_millis(millis: i64) -> Self {
        Duration(millis.saturating_mul(1_000_000))
    }

    pub const fn from_secs(secs: i64) -> Self {
        Duration(secs.saturating_mul(1_000_000_000))
    }

    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Convert to a `std::time::Duration`. Negative durations have no std form.
    pub fn to_std(self) -> Option<std::time::Duration> {
        u64::try_from(self.0).ok().map(std::time::Duration::from_nanos)
    }

    /// Parse compound duration text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let invalid = |reason| ConfigError::InvalidDuration {
            input: text.to_string(),
            reason,
        };

        let (negative, mut rest) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            _ => (false, text),
        };
        if rest == "0" {
            return Ok(Duration(0));
        }
        if rest.is_empty() {
            return Err(invalid("empty duration"));
        }

        let mut total: u128 = 0;
        while !rest.is_empty() {
            let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
            let (int_part, after_int) = rest.split_at(int_len);
            let (frac_part, after_num) = match after_int.strip_prefix('.') {
                Some(after_dot) => {
                    let frac_len = after_dot.bytes().take_while(u8::is_ascii_digit).count();
                    after_dot.split_at(frac_len)
                }
                None => ("", after_int),
            };
            if int_part.is_empty() && frac_part.is_empty() {
                return Err(invalid("expected a number"));
            }

            let unit_len = after_num
                .char_indices()
                .find(|(_, c)| *c == '.' || c.is_ascii_digit())
                .map_or(after_num.len(), |(i, _)| i);
            let (unit_text, after_unit) = after_num.split_at(unit_len);
            let unit = match unit_text {
                "" => return Err(invalid("missing unit")),
                "ns" => NANOSECOND,
                "us" | "µs" | "μs" => MICROSECOND,
                "ms" => MILLISECOND,
                "s" => SECOND,
                "m" => MINUTE,
                "h" => HOUR,
                _ => return Err(invalid("unknown unit")),
            };

            let whole: u128 = if int_part.is_empty() {
                0
            } else {
                int_part.parse().map_err(|_| invalid("overflow"))?
            };
            let mut component = whole.checked_mul(unit).ok_or_else(|| invalid("overflow"))?;

            // Digits past 18 are below nanosecond precision for every unit.
            let mut scale: u128 = 1;
            let mut frac: u128 = 0;
            for digit in frac_part.bytes().take(18) {
                frac = frac * 10 + u128::from(digit - b'0');
                scale *= 10;
            }
            component += frac * unit / scale;

            total = total.checked_add(component).ok_or_else(|| invalid("overflow"))?;
            if total > 1u128 << 63 {
                return Err(invalid("overflow"));
            }
            rest = after_unit;
        }

        if negative {
            // -(1 << 63) is representable, its positive counterpart is not.
            let nanos = i128::try_from(total).map_err(|_| invalid("overflow"))?;
            i64::try_from(-nanos)
                .map(Duration)
                .map_err(|_| invalid("overflow"))
        } else {
            i64::try_from(total)
                .map(Duration)
                .map_err(|_| invalid("overflow"))
        }
    }
}

impl From<std::time::Duration> for Duration {
    /// Saturates at the largest representable duration.
    fn from(d: std::time::Duration) -> Self {
        Duration(i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return f.write_str("0s");
        }
        if self.0 < 0 {
            f.write_str("-")?;
        }
        let nanos = u128::from(self.0.unsigned_abs());

        if nanos < SECOND {
            let (unit, scale) = if nanos < MICROSECOND {
                ("ns", NANOSECOND)
            } else if nanos < MILLISECOND {
                ("µs", MICROSECOND)
            } else {
                ("ms", MILLISECOND)
            };
            return write!(f, "{}{unit}", decimal(nanos, scale));
        }

        let hours = nanos / HOUR;
        let minutes = (nanos % HOUR) / MINUTE;
        let seconds = nanos % MINUTE;
        if hours > 0 {
            write!(f, "{hours}h")?;
        }
        if hours > 0 || minutes > 0 {
            write!(f, "{minutes}m")?;
        }
        write!(f, "{}s", decimal(seconds, SECOND))
    }
}

/// Render `value / scale` with the shortest exact decimal fraction.
fn decimal(value: u128, scale: u128) -> String {
    let whole = value / scale;
    let frac = value % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let width = scale.ilog10() as usize;
    let digits = format!("{frac:0width$}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

impl Settable for Duration {
    fn set(&mut self, text: &str) -> Result<(), ConfigError> {
        *self = Duration::parse(text)?;
        Ok(())
    }

    fn to_text(&self) -> Result<String, ConfigError> {
        Ok(self.to_string())
    }
}

settable_serde!(Duration);
