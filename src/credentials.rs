//! Application-id resolution.
//!
//! Sources are tried in order and the first non-blank key wins. The standard
//! chain is: explicit key → session store → secrets file → `ESTAT_APP_ID`.

use log::{debug, warn};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{EstatError, Result};

/// Name of the environment variable and secrets-file key holding the app id.
pub const APP_ID_KEY: &str = "ESTAT_APP_ID";

/// One place an application id may come from.
pub trait CredentialSource: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;
    fn resolve(&self) -> Option<String>;
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|k| k.trim().to_string()).filter(|k| !k.is_empty())
}

/// Key passed directly by the caller (e.g. `--app-id`).
#[derive(Clone, Default)]
pub struct Explicit(Option<String>);

impl Explicit {
    pub fn new(key: Option<String>) -> Self {
        Self(key)
    }
}

impl fmt::Debug for Explicit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Explicit")
            .field(&self.0.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl CredentialSource for Explicit {
    fn name(&self) -> &str {
        "explicit"
    }

    fn resolve(&self) -> Option<String> {
        non_blank(self.0.clone())
    }
}

/// Key remembered for the lifetime of a session. Clones share the same slot.
#[derive(Clone, Default)]
pub struct SessionStore {
    key: Arc<RwLock<Option<String>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: impl Into<String>) {
        *self.key.write().unwrap_or_else(PoisonError::into_inner) = Some(key.into());
    }

    pub fn clear(&self) {
        *self.key.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set = self
            .key
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some();
        f.debug_struct("SessionStore").field("set", &set).finish()
    }
}

impl CredentialSource for SessionStore {
    fn name(&self) -> &str {
        "session"
    }

    fn resolve(&self) -> Option<String> {
        non_blank(
            self.key
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        )
    }
}

/// JSON secrets file, e.g. `{"ESTAT_APP_ID": "..."}`.
#[derive(Debug, Clone)]
pub struct SecretsFile {
    path: PathBuf,
    key: String,
}

impl SecretsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            key: APP_ID_KEY.to_string(),
        }
    }

    /// `<config dir>/estat/secrets.json`, if the platform has a config dir.
    pub fn default_location() -> Option<Self> {
        dirs::config_dir().map(|d| Self::new(d.join("estat").join("secrets.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialSource for SecretsFile {
    fn name(&self) -> &str {
        "secrets file"
    }

    fn resolve(&self) -> Option<String> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) => {
                debug!("secrets file {} not readable: {}", self.path.display(), e);
                return None;
            }
        };
        match serde_json::from_str::<Value>(&text) {
            Ok(v) => non_blank(v.get(&self.key).and_then(Value::as_str).map(str::to_string)),
            Err(e) => {
                warn!("ignoring malformed secrets file {}: {}", self.path.display(), e);
                None
            }
        }
    }
}

/// Environment variable (defaults to `ESTAT_APP_ID`).
#[derive(Debug, Clone)]
pub struct EnvVar {
    var: String,
}

impl EnvVar {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvVar {
    fn default() -> Self {
        Self::new(APP_ID_KEY)
    }
}

impl CredentialSource for EnvVar {
    fn name(&self) -> &str {
        "environment"
    }

    fn resolve(&self) -> Option<String> {
        non_blank(std::env::var(&self.var).ok())
    }
}

/// Ordered list of sources; the first that yields a key wins.
#[derive(Default)]
pub struct CredentialChain {
    sources: Vec<Box<dyn CredentialSource>>,
}

impl fmt::Debug for CredentialChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.sources.iter().map(|s| s.name()))
            .finish()
    }
}

impl CredentialChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: impl CredentialSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// explicit → session → secrets file (if given or discoverable) → environment.
    pub fn standard(
        explicit: Option<String>,
        session: &SessionStore,
        secrets: Option<SecretsFile>,
    ) -> Self {
        let mut chain = Self::new()
            .with(Explicit::new(explicit))
            .with(session.clone());
        if let Some(file) = secrets.or_else(SecretsFile::default_location) {
            chain = chain.with(file);
        }
        chain.with(EnvVar::default())
    }

    pub fn resolve(&self) -> Option<String> {
        self.sources.iter().find_map(|s| {
            let key = s.resolve();
            if key.is_some() {
                debug!("application id resolved from {}", s.name());
            }
            key
        })
    }

    /// Like [`resolve`](Self::resolve) but absence is an error.
    pub fn require(&self) -> Result<String> {
        self.resolve().ok_or(EstatError::AuthenticationMissing)
    }
}
