//! Secret redaction for key material in logs.
//!
//! [`Redacted`] never exposes its inner value through `Debug` or `Display`;
//! both render as `"<redacted>"`.

use std::fmt::{self, Debug, Display};

/// Wrapper that redacts its inner value when formatted.
///
/// ```
/// use mim_bridger::redact::Redacted;
///
/// let key = Redacted("0xac09...");
/// assert_eq!(format!("{key}"), "<redacted>");
/// assert_eq!(format!("{key:?}"), "<redacted>");
/// ```
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Redacted<T>(pub T);

impl<T> Redacted<T> {
    /// Access the wrapped secret. Callers must not log the result.
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T> Debug for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl<T> Display for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}
