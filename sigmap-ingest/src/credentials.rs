use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gcp_auth::{CustomServiceAccount, TokenProvider};
use serde::Deserialize;
use tracing::debug;

use crate::error::FeedError;

pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const SERVICE_ACCOUNT: &str = "service_account";

/// How the feed authenticates. Read once at startup.
///
/// A service account key mints access tokens on demand and refreshes them
/// before they expire. A plain token is sent as-is for the life of the
/// process.
#[derive(Clone)]
pub struct Credentials {
    kind: Kind,
}

#[derive(Clone)]
enum Kind {
    Token(String),
    ServiceAccount(Arc<CustomServiceAccount>),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            Kind::Token(_) => "token",
            Kind::ServiceAccount(_) => SERVICE_ACCOUNT,
        };
        f.debug_struct("Credentials")
            .field("kind", &kind)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
struct KeyFile {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default, alias = "token")]
    access_token: Option<String>,
}

impl Credentials {
    pub fn from_token(token: impl Into<String>) -> Self {
        Self {
            kind: Kind::Token(token.into()),
        }
    }

    /// Accepts a Google service account key, a JSON object with
    /// `access_token` (or `token`), or the bare token text.
    pub fn load(path: &Path) -> Result<Self, FeedError> {
        let text = fs::read_to_string(path).map_err(|source| FeedError::Credentials {
            path: path.to_path_buf(),
            source,
        })?;
        let text = text.trim();
        if text.is_empty() {
            return Err(FeedError::EmptyCredentials(path.to_path_buf()));
        }

        let Ok(file) = serde_json::from_str::<KeyFile>(text) else {
            if text.starts_with('{') || text.contains(char::is_whitespace) {
                return Err(FeedError::UnrecognizedCredentials(path.to_path_buf()));
            }
            return Ok(Self::from_token(text));
        };

        if file.kind.as_deref() == Some(SERVICE_ACCOUNT) {
            let account = CustomServiceAccount::from_json(text).map_err(|source| {
                FeedError::ServiceAccount {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            debug!("using service account key {}", path.display());
            return Ok(Self {
                kind: Kind::ServiceAccount(Arc::new(account)),
            });
        }

        match file.access_token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => Ok(Self::from_token(token)),
            Some(_) => Err(FeedError::EmptyCredentials(path.to_path_buf())),
            None => Err(FeedError::UnrecognizedCredentials(path.to_path_buf())),
        }
    }

    /// The token to send with the next request. Service account tokens are
    /// cached and only re-minted near expiry.
    pub async fn bearer(&self) -> Result<String, FeedError> {
        match &self.kind {
            Kind::Token(token) => Ok(token.clone()),
            Kind::ServiceAccount(account) => {
                let token = account
                    .token(&[DATASTORE_SCOPE])
                    .await
                    .map_err(FeedError::Auth)?;
                Ok(token.as_str().to_string())
            }
        }
    }
}

/// Configured path first, then the environment.
pub fn resolve_path(configured: Option<&str>) -> Result<PathBuf, FeedError> {
    if let Some(path) = configured.filter(|p| !p.trim().is_empty()) {
        return Ok(sigmap_core::expand_tilde(path));
    }
    match env::var(CREDENTIALS_ENV) {
        Ok(path) if !path.trim().is_empty() => Ok(sigmap_core::expand_tilde(&path)),
        _ => Err(FeedError::NoCredentials(CREDENTIALS_ENV)),
    }
}
