//! Database credential fragments read from a mounted secret directory.
//!
//! The platform mounts one file per fragment (`host`, `port`, `database`,
//! `username`, `password`) under a bindings directory. A file that is missing
//! or holds only whitespace is *absent*; that is a normal outcome here and
//! only becomes an error once the fragments are composed.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};

/// Directory the platform mounts database bindings into.
pub const DEFAULT_SECRETS_ROOT: &str = "/bindings/db";

/// Environment variable overriding [`DEFAULT_SECRETS_ROOT`].
pub const SECRETS_ROOT_ENV: &str = "ACME_SECRETS_ROOT";

/// One piece of the database connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FragmentKind {
    Host,
    Port,
    Database,
    Username,
    Password,
}

impl FragmentKind {
    /// Every fragment, in descriptor order.
    pub const ALL: [FragmentKind; 5] = [
        FragmentKind::Host,
        FragmentKind::Port,
        FragmentKind::Database,
        FragmentKind::Username,
        FragmentKind::Password,
    ];

    /// Name of the file holding this fragment.
    pub fn file_name(self) -> &'static str {
        match self {
            FragmentKind::Host => "host",
            FragmentKind::Port => "port",
            FragmentKind::Database => "database",
            FragmentKind::Username => "username",
            FragmentKind::Password => "password",
        }
    }

    /// Key used for this fragment in the driver connection string.
    pub fn driver_key(self) -> &'static str {
        match self {
            FragmentKind::Host => "Host",
            FragmentKind::Port => "Port",
            FragmentKind::Database => "Database",
            FragmentKind::Username => "Username",
            FragmentKind::Password => "Password",
        }
    }
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Reads one fragment file.
///
/// Returns `None` when the file is missing, unreadable, or blank. Surrounding
/// whitespace (typically a trailing newline) is trimmed from the value.
///
/// # Examples
///
/// ```
/// use acme_order::secrets::load_fragment;
/// use secrecy::ExposeSecret;
///
/// let dir = tempfile::tempdir().unwrap();
/// std::fs::write(dir.path().join("host"), "db.internal\n").unwrap();
/// std::fs::write(dir.path().join("port"), "   \n").unwrap();
///
/// let host = load_fragment(dir.path().join("host")).unwrap();
/// assert_eq!(host.expose_secret(), "db.internal");
/// assert!(load_fragment(dir.path().join("port")).is_none());
/// assert!(load_fragment(dir.path().join("database")).is_none());
/// ```
pub fn load_fragment(path: impl AsRef<Path>) -> Option<SecretString> {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(content) => {
            let trimmed = content.trim();
            if trimmed.is_empty() {
                tracing::debug!(path = %path.display(), "secret file is blank");
                None
            } else {
                Some(SecretString::new(trimmed.to_string()))
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "secret file not present");
            None
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "secret file unreadable, treating as absent");
            None
        }
    }
}

/// The five optional fragments, as read.
#[derive(Debug, Clone, Default)]
pub struct FragmentSet {
    pub host: Option<SecretString>,
    pub port: Option<SecretString>,
    pub database: Option<SecretString>,
    pub username: Option<SecretString>,
    pub password: Option<SecretString>,
}

impl FragmentSet {
    pub fn get(&self, kind: FragmentKind) -> Option<&SecretString> {
        self.slot(kind).as_ref()
    }

    pub fn set(&mut self, kind: FragmentKind, value: Option<SecretString>) {
        *self.slot_mut(kind) = value;
    }

    /// Fragments that are absent or blank, in descriptor order.
    pub fn missing(&self) -> Vec<FragmentKind> {
        FragmentKind::ALL
            .into_iter()
            .filter(|k| match self.get(*k) {
                Some(value) => value.expose_secret().trim().is_empty(),
                None => true,
            })
            .collect()
    }

    fn slot(&self, kind: FragmentKind) -> &Option<SecretString> {
        match kind {
            FragmentKind::Host => &self.host,
            FragmentKind::Port => &self.port,
            FragmentKind::Database => &self.database,
            FragmentKind::Username => &self.username,
            FragmentKind::Password => &self.password,
        }
    }

    fn slot_mut(&mut self, kind: FragmentKind) -> &mut Option<SecretString> {
        match kind {
            FragmentKind::Host => &mut self.host,
            FragmentKind::Port => &mut self.port,
            FragmentKind::Database => &mut self.database,
            FragmentKind::Username => &mut self.username,
            FragmentKind::Password => &mut self.password,
        }
    }
}

/// Reads every fragment from one directory.
#[derive(Debug, Clone)]
pub struct SecretLoader {
    root: PathBuf,
}

impl SecretLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root from `ACME_SECRETS_ROOT`, or the platform mount point.
    pub fn from_env() -> Self {
        match std::env::var(SECRETS_ROOT_ENV) {
            Ok(root) if !root.trim().is_empty() => Self::new(root),
            _ => Self::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, kind: FragmentKind) -> PathBuf {
        self.root.join(kind.file_name())
    }

    /// Reads all five fragments. Never fails; absence is recorded per fragment.
    pub fn load_all(&self) -> FragmentSet {
        let mut set = FragmentSet::default();
        for kind in FragmentKind::ALL {
            set.set(kind, load_fragment(self.path_of(kind)));
        }
        tracing::debug!(
            root = %self.root.display(),
            missing = set.missing().len(),
            "loaded database secret fragments"
        );
        set
    }
}

impl Default for SecretLoader {
    fn default() -> Self {
        Self::new(DEFAULT_SECRETS_ROOT)
    }
}
