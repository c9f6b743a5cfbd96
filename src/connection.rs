//! Composes the database connection descriptor from secret fragments.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};

use crate::error::ConfigurationError;
use crate::secrets::{FragmentKind, FragmentSet};

/// Placeholder written in place of the password in every diagnostic form.
pub const REDACTED: &str = "********";

/// Driver connection string: `Host=..;Port=..;Database=..;Username=..;Password=..`.
///
/// Only [`expose`](ConnectionDescriptor::expose) yields the real text; `Debug`
/// and `Display` print the redacted form.
#[derive(Clone)]
pub struct ConnectionDescriptor {
    full: SecretString,
    redacted: String,
}

impl ConnectionDescriptor {
    /// The descriptor as handed to the database driver.
    pub fn expose(&self) -> &str {
        self.full.expose_secret()
    }

    /// The descriptor with the password masked, safe to log.
    pub fn redacted(&self) -> &str {
        &self.redacted
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConnectionDescriptor").field(&self.redacted).finish()
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted)
    }
}

/// Builds the descriptor if, and only if, all five fragments are present.
///
/// # Errors
///
/// [`ConfigurationError::MissingFragments`] naming every absent fragment.
///
/// # Examples
///
/// ```
/// use acme_order::connection::compose;
/// use acme_order::secrets::{FragmentKind, FragmentSet};
/// use secrecy::SecretString;
///
/// let mut set = FragmentSet::default();
/// for (kind, value) in [
///     (FragmentKind::Host, "db"),
///     (FragmentKind::Port, "5432"),
///     (FragmentKind::Database, "orders"),
///     (FragmentKind::Username, "svc"),
///     (FragmentKind::Password, "pw"),
/// ] {
///     set.set(kind, Some(SecretString::new(value.to_string())));
/// }
///
/// let descriptor = compose(&set).unwrap();
/// assert_eq!(descriptor.expose(), "Host=db;Port=5432;Database=orders;Username=svc;Password=pw");
/// assert_eq!(descriptor.to_string(), "Host=db;Port=5432;Database=orders;Username=svc;Password=********");
/// ```
pub fn compose(fragments: &FragmentSet) -> Result<ConnectionDescriptor, ConfigurationError> {
    let missing = fragments.missing();
    if !missing.is_empty() {
        return Err(ConfigurationError::MissingFragments(missing));
    }

    let mut full = String::new();
    let mut redacted = String::new();
    for (i, kind) in FragmentKind::ALL.into_iter().enumerate() {
        if i > 0 {
            full.push(';');
            redacted.push(';');
        }
        let value = fragments
            .get(kind)
            .map(|s| s.expose_secret().as_str())
            .unwrap_or_default();
        let key = kind.driver_key();
        full.push_str(&format!("{key}={value}"));
        if kind == FragmentKind::Password {
            redacted.push_str(&format!("{key}={REDACTED}"));
        } else {
            redacted.push_str(&format!("{key}={value}"));
        }
    }

    Ok(ConnectionDescriptor {
        full: SecretString::new(full),
        redacted,
    })
}
