//! Credential resolution for the feed client.
//!
//! Two modes are supported, mirroring the usual service-account conventions:
//!
//! - **Explicit**: a credential file path supplied via CLI flag or the
//!   `QA_BRIDGE_CREDENTIALS` environment variable. Any failure to load it is
//!   fatal - the operator asked for that file specifically.
//! - **Ambient**: no explicit path. `GOOGLE_APPLICATION_CREDENTIALS` is
//!   honored first, then the well-known gcloud application-default location.
//!   If neither yields a key the context is anonymous, which local
//!   transports accept.
//!
//! Resolution only loads and parses the key; it never talks to the network.
//! The resulting [`AuthContext`] is the opaque handle the rest of the
//! process carries around.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

/// Environment variable naming an explicit credential file.
pub const CREDENTIALS_ENV: &str = "QA_BRIDGE_CREDENTIALS";

/// Environment variable honored during ambient discovery.
pub const AMBIENT_CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Well-known application-default credential path, relative to `$HOME`.
const ADC_WELL_KNOWN: &str = ".config/gcloud/application_default_credentials.json";

/// Errors that can occur while resolving credentials.
///
/// All variants are fatal at startup: a misconfigured credential source must
/// stop the process before it subscribes to anything.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The configured credential file does not exist.
    #[error("credential file not found: {0}")]
    NotFound(Utf8PathBuf),

    /// The credential file exists but could not be read.
    #[error("failed to read credential file '{path}': {source}")]
    Unreadable {
        /// The credential file path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The credential file is not valid service-account JSON.
    #[error("failed to parse credential file '{path}': {source}")]
    Malformed {
        /// The credential file path.
        path: Utf8PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// The subset of a service-account key the bridge cares about.
///
/// The private key material is deliberately never deserialized; nothing in
/// this process signs requests.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceAccountKey {
    /// The project the key belongs to.
    #[serde(default)]
    pub project_id: Option<String>,

    /// The service-account email.
    #[serde(default)]
    pub client_email: Option<String>,

    /// The id of the key pair, useful in diagnostics.
    #[serde(default)]
    pub private_key_id: Option<String>,
}

/// Where credentials come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialMode {
    /// A credential file named explicitly by the operator.
    Explicit(Utf8PathBuf),

    /// Ambient discovery (environment variable, then well-known path).
    Ambient,
}

impl CredentialMode {
    /// Picks the mode from an optional explicit path.
    ///
    /// The CLI layer passes the `--credentials` flag (or its
    /// [`CREDENTIALS_ENV`] fallback) here; absence means ambient discovery.
    #[must_use]
    pub fn discover(explicit: Option<Utf8PathBuf>) -> Self {
        explicit.map_or(Self::Ambient, Self::Explicit)
    }

    /// Resolves this mode into an authenticated context.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] if an explicitly configured file (by flag or
    /// environment variable) is missing, unreadable, or malformed. Ambient
    /// mode with nothing discoverable is not an error; it yields an
    /// anonymous context.
    pub fn resolve(&self) -> Result<AuthContext, AuthError> {
        match self {
            Self::Explicit(path) => {
                let key = load_key(path)?;
                Ok(AuthContext {
                    label: "explicit credential file".to_owned(),
                    path: Some(path.clone()),
                    key: Some(key),
                })
            }
            Self::Ambient => resolve_ambient(),
        }
    }
}

/// Ambient discovery: environment variable first, then the well-known path.
fn resolve_ambient() -> Result<AuthContext, AuthError> {
    if let Ok(env_path) = std::env::var(AMBIENT_CREDENTIALS_ENV) {
        let path = Utf8PathBuf::from(env_path);
        // The variable was set on purpose; failing to load it is fatal.
        let key = load_key(&path)?;
        return Ok(AuthContext {
            label: format!("ambient ({AMBIENT_CREDENTIALS_ENV})"),
            path: Some(path),
            key: Some(key),
        });
    }

    if let Ok(home) = std::env::var("HOME") {
        let path = Utf8PathBuf::from(home).join(ADC_WELL_KNOWN);
        if path.exists() {
            let key = load_key(&path)?;
            return Ok(AuthContext {
                label: "ambient (application default)".to_owned(),
                path: Some(path),
                key: Some(key),
            });
        }
    }

    Ok(AuthContext::anonymous())
}

/// Loads and parses one service-account key file.
fn load_key(path: &Utf8Path) -> Result<ServiceAccountKey, AuthError> {
    if !path.exists() {
        return Err(AuthError::NotFound(path.to_owned()));
    }

    let raw = std::fs::read_to_string(path).map_err(|source| AuthError::Unreadable {
        path: path.to_owned(),
        source,
    })?;

    serde_json::from_str(&raw).map_err(|source| AuthError::Malformed {
        path: path.to_owned(),
        source,
    })
}

/// An opaque authenticated client context.
///
/// Carries what the banner and the feed need to know about who the process
/// is running as; the rest of the pipeline treats it as a token of "startup
/// authentication succeeded".
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Human-readable description of where the credentials came from.
    label: String,

    /// The credential file the context was built from, if any.
    path: Option<Utf8PathBuf>,

    /// The parsed key, absent for anonymous contexts.
    key: Option<ServiceAccountKey>,
}

impl AuthContext {
    /// Creates an anonymous context (ambient mode, nothing discovered).
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            label: "anonymous (no credentials discovered)".to_owned(),
            path: None,
            key: None,
        }
    }

    /// Returns the human-readable credential mode, for the startup banner.
    #[must_use]
    pub fn mode_label(&self) -> &str {
        &self.label
    }

    /// Returns the credential file path, if the context was file-backed.
    #[must_use]
    pub fn credential_path(&self) -> Option<&Utf8Path> {
        self.path.as_deref()
    }

    /// Returns the project id from the key, if known.
    #[must_use]
    pub fn project_id(&self) -> Option<&str> {
        self.key.as_ref().and_then(|k| k.project_id.as_deref())
    }

    /// Returns `true` if no credentials were loaded.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.key.is_none()
    }
}
