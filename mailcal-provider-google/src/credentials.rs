//! OAuth credentials for the Gmail and Calendar APIs.
//!
//! The authorized-user token lives in a JSON file (`token.json`). It is
//! refreshed when expired, and when it is missing or cannot be refreshed the
//! installed-app consent flow runs against the client secrets in
//! `credentials.json`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use google_calendar::{AccessToken, Client};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tracing::{info, warn};

const REDIRECT_PORT: u16 = 8085;
const REDIRECT_URI: &str = "http://localhost:8085/callback";

pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/gmail.readonly",
    "https://www.googleapis.com/auth/calendar.events",
];

/// Tokens this close to expiry are treated as expired
const EXPIRY_MARGIN_SECS: i64 = 60;

/// OAuth client registration downloaded from the Google Cloud console
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).with_context(|| {
            format!(
                "Failed to read OAuth client secrets from {}. Download them from the Google Cloud console.",
                path.display()
            )
        })?;

        let file: ClientSecretsFile = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse OAuth client secrets in {}", path.display()))?;

        file.installed.or(file.web).with_context(|| {
            format!(
                "{} has neither an \"installed\" nor a \"web\" client",
                path.display()
            )
        })
    }
}

/// Contents of the token file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthorizedUser {
    pub token: String,
    #[serde(default)]
    pub refresh_token: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl AuthorizedUser {
    fn from_tokens(tokens: AccessToken, secrets: &ClientSecrets, previous_refresh: &str) -> Self {
        // Google usually omits the refresh token on refresh responses
        let refresh_token = if tokens.refresh_token.is_empty() {
            previous_refresh.to_string()
        } else {
            tokens.refresh_token
        };

        let expiry = (tokens.expires_in > 0).then(|| Utc::now() + Duration::seconds(tokens.expires_in));

        AuthorizedUser {
            token: tokens.access_token,
            refresh_token,
            client_id: secrets.client_id.clone(),
            client_secret: secrets.client_secret.clone(),
            expiry,
            scopes: SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn is_expired(&self) -> bool {
        match self.expiry {
            Some(expiry) => Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS) >= expiry,
            None => false,
        }
    }

    fn secrets(&self) -> ClientSecrets {
        ClientSecrets {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
        }
    }
}

/// A usable access token plus where it is persisted
pub struct Credentials {
    path: PathBuf,
    data: AuthorizedUser,
}

impl Credentials {
    /// Load the stored token, refreshing or re-authorizing as needed.
    pub async fn obtain(token_path: &Path, credentials_path: &Path) -> Result<Self> {
        if let Some(mut creds) = Self::load(token_path)? {
            if !creds.data.is_expired() {
                return Ok(creds);
            }

            if !creds.data.refresh_token.is_empty() {
                match creds.refresh().await {
                    Ok(()) => return Ok(creds),
                    Err(e) => warn!(error = %format!("{e:#}"), "token refresh failed, re-authorizing"),
                }
            }
        }

        Self::authorize(token_path, credentials_path).await
    }

    /// Run the consent flow unconditionally and store the result.
    pub async fn authorize(token_path: &Path, credentials_path: &Path) -> Result<Self> {
        let secrets = ClientSecrets::load(credentials_path)?;
        let tokens = consent_flow(&secrets).await?;

        let creds = Credentials {
            path: token_path.to_path_buf(),
            data: AuthorizedUser::from_tokens(tokens, &secrets, ""),
        };
        creds.save()?;

        info!(path = %token_path.display(), "stored new credentials");
        Ok(creds)
    }

    pub fn access_token(&self) -> &str {
        &self.data.token
    }

    pub fn data(&self) -> &AuthorizedUser {
        &self.data
    }

    /// Calendar API client carrying these credentials
    pub fn calendar_client(&self) -> Client {
        Client::new(
            self.data.client_id.clone(),
            self.data.client_secret.clone(),
            String::new(),
            self.data.token.clone(),
            self.data.refresh_token.clone(),
        )
    }

    fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read token from {}", path.display()))?;

        match serde_json::from_str::<AuthorizedUser>(&contents) {
            Ok(data) => Ok(Some(Credentials {
                path: path.to_path_buf(),
                data,
            })),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable token file");
                Ok(None)
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        let contents =
            serde_json::to_string_pretty(&self.data).context("Failed to serialize token")?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write token to {}", self.path.display()))?;

        // Owner-only, the file holds OAuth tokens
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("Failed to set permissions on {}", self.path.display()))?;
        }

        Ok(())
    }

    async fn refresh(&mut self) -> Result<()> {
        let tokens = self
            .calendar_client()
            .refresh_access_token()
            .await
            .context("Failed to refresh token")?;

        let secrets = self.data.secrets();
        self.data = AuthorizedUser::from_tokens(tokens, &secrets, &self.data.refresh_token);
        self.save()?;

        info!("refreshed access token");
        Ok(())
    }
}

async fn consent_flow(secrets: &ClientSecrets) -> Result<AccessToken> {
    let mut client = Client::new(
        secrets.client_id.clone(),
        secrets.client_secret.clone(),
        REDIRECT_URI.to_string(),
        String::new(),
        String::new(),
    );

    let scopes: Vec<String> = SCOPES.iter().map(|s| s.to_string()).collect();
    let auth_url = client.user_consent_url(&scopes);

    eprintln!("\nOpen this URL in your browser to authorize mailcal:\n");
    eprintln!("{}\n", auth_url);

    if open::that(&auth_url).is_err() {
        eprintln!("(Could not open browser automatically, please copy the URL above)");
    }

    let (code, state) = wait_for_callback().await?;

    client
        .get_access_token(&code, &state)
        .await
        .context("Failed to exchange code for tokens")
}

/// Listen on the redirect port for the browser coming back from consent
async fn wait_for_callback() -> Result<(String, String)> {
    let listener = TcpListener::bind(format!("127.0.0.1:{}", REDIRECT_PORT))
        .await
        .with_context(|| format!("Failed to bind to port {}", REDIRECT_PORT))?;

    info!(port = REDIRECT_PORT, "waiting for OAuth callback");

    accept_callback(&listener).await
}

/// Accept one request on `listener` and pull `code` and `state` from it
async fn accept_callback(listener: &TcpListener) -> Result<(String, String)> {
    let (stream, _) = listener
        .accept()
        .await
        .context("Failed to accept OAuth callback")?;

    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader
        .read_line(&mut request_line)
        .await
        .context("Failed to read OAuth callback request line")?;

    let (code, state) = parse_callback(&request_line)?;

    let response = "HTTP/1.1 200 OK\r\n\
        Content-Type: text/html\r\n\
        Connection: close\r\n\
        \r\n\
        <html><body>\
        <h1>mailcal is authorized</h1>\
        <p>You can close this window and return to the terminal.</p>\
        </body></html>";

    let mut stream = reader.into_inner();
    stream
        .write_all(response.as_bytes())
        .await
        .context("Failed to write OAuth callback response")?;
    stream.flush().await?;

    Ok((code, state))
}

/// Request line looks like: GET /callback?code=xxx&state=yyy HTTP/1.1
fn parse_callback(request_line: &str) -> Result<(String, String)> {
    let url_part = request_line
        .split_whitespace()
        .nth(1)
        .context("Invalid request")?;

    let url = url::Url::parse(&format!("http://localhost{}", url_part))?;

    if let Some((_, error)) = url.query_pairs().find(|(k, _)| k == "error") {
        anyhow::bail!("Authorization was denied: {}", error);
    }

    let code = url
        .query_pairs()
        .find(|(k, _)| k == "code")
        .map(|(_, v)| v.to_string())
        .context("No code in callback")?;

    let state = url
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.to_string())
        .context("No state in callback")?;

    Ok((code, state))
}
