//! Google OAuth 2.0 authorization-code flow.
//!
//! The result of a successful login is a `DriveSession`: an explicit value
//! the caller owns, persists and hands to `GoogleDriveSource`. Nothing here
//! is process-global.

use chrono::{DateTime, Duration, Utc};
use kbchat_config::DriveConfig;
use kbchat_core::error::SourceError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";
const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Access tokens are treated as expired this long before Google says so.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Credentials for one authenticated user.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveSession {
    pub access_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    pub expires_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl std::fmt::Debug for DriveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveSession")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .finish()
    }
}

impl DriveSession {
    /// Build a session from a token endpoint response received at `now`.
    ///
    /// Refresh responses usually omit the refresh token, so the previous one
    /// is carried over.
    fn from_token_response(
        resp: TokenResponse,
        previous_refresh_token: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token.or(previous_refresh_token),
            expires_at: now + Duration::seconds(resp.expires_in),
            scope: resp.scope,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_SKEW_SECS) >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Read a saved session. A missing file means "not logged in".
    pub fn load(path: &Path) -> Result<Option<Self>, SourceError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SourceError::Io(format!("{}: {e}", path.display()))),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| SourceError::Io(format!("invalid session file {}: {e}", path.display())))
    }

    pub fn save(&self, path: &Path) -> Result<(), SourceError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| SourceError::Io(format!("{}: {e}", parent.display())))?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| SourceError::Io(e.to_string()))?;
        std::fs::write(path, content)
            .map_err(|e| SourceError::Io(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), "Drive session saved");
        Ok(())
    }
}

/// The OAuth client registered with Google.
#[derive(Clone)]
pub struct OAuthClient {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    token_url: String,
    http: reqwest::Client,
}

impl OAuthClient {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            token_url: TOKEN_URL.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Build from `[drive]` settings; all three client values must be set.
    pub fn from_config(config: &DriveConfig) -> Result<Self, SourceError> {
        match (&config.client_id, &config.client_secret, &config.redirect_uri) {
            (Some(id), Some(secret), Some(uri)) => Ok(Self::new(id, secret, uri)),
            _ => Err(SourceError::AuthorizationFailed(
                "GOOGLE_CLIENT_ID, GOOGLE_CLIENT_SECRET and GOOGLE_REDIRECT_URI must be set".into(),
            )),
        }
    }

    /// Point token requests elsewhere (e.g., for testing).
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// URL the user opens to grant read-only Drive access.
    pub fn authorization_url(&self) -> Result<String, SourceError> {
        let url = reqwest::Url::parse_with_params(
            AUTH_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", DRIVE_SCOPE),
                ("access_type", "offline"),
                ("include_granted_scopes", "true"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| SourceError::AuthorizationFailed(e.to_string()))?;
        Ok(url.into())
    }

    /// Trade an authorization code for a session.
    pub async fn exchange_code(&self, code: &str) -> Result<DriveSession, SourceError> {
        let resp = self
            .token_request(&[
                ("grant_type", "authorization_code"),
                ("code", code.trim()),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .await?;
        info!("Google Drive authorization completed");
        Ok(DriveSession::from_token_response(resp, None, Utc::now()))
    }

    /// Obtain a fresh access token using the session's refresh token.
    pub async fn refresh(&self, session: &DriveSession) -> Result<DriveSession, SourceError> {
        let refresh_token = session.refresh_token.as_deref().ok_or_else(|| {
            SourceError::NotAuthenticated("session expired and has no refresh token".into())
        })?;

        let resp = self
            .token_request(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .await?;
        debug!("Drive access token refreshed");
        Ok(DriveSession::from_token_response(
            resp,
            session.refresh_token.clone(),
            Utc::now(),
        ))
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse, SourceError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::AuthorizationFailed(format!(
                "token endpoint returned {}: {body}",
                status.as_u16()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| SourceError::AuthorizationFailed(format!("invalid token response: {e}")))
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

fn default_expires_in() -> i64 {
    3600
}
