//! Parse, warn and default
//!
//! User supplied topology fields that only tune a rendered object must never
//! block a reconcile pass. A value that fails to parse is replaced by the
//! default and a [`FallbackWarning`] is handed back for the caller to log.

use std::fmt;

/// A user supplied value that was discarded in favour of a default
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackWarning {
    /// Spec field the value came from
    pub field: &'static str,
    /// Value as supplied by the user
    pub raw: String,
    /// Why it was rejected
    pub reason: String,
}

impl fmt::Display for FallbackWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "user provided {} {:?} is invalid ({}), using default value instead",
            self.field, self.raw, self.reason
        )
    }
}

/// Parse `raw` with `parser`, falling back to `default` on failure
///
/// An empty `raw` means the user did not set the field: the default is used
/// and no warning is produced.
pub fn parse_with_fallback<T, E, F>(
    field: &'static str,
    raw: &str,
    default: T,
    parser: F,
) -> (T, Option<FallbackWarning>)
where
    E: fmt::Display,
    F: FnOnce(&str) -> Result<T, E>,
{
    if raw.is_empty() {
        return (default, None);
    }

    match parser(raw) {
        Ok(value) => (value, None),
        Err(err) => (
            default,
            Some(FallbackWarning {
                field,
                raw: raw.to_string(),
                reason: err.to_string(),
            }),
        ),
    }
}
