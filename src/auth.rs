//! OAuth authorization for the Google Sheets API.
//!
//! The token is kept in a local file. A valid token is reused as is, an expired one is refreshed,
//! and when neither works the user is sent through the installed-app consent flow in a browser.

use std::collections::HashMap;
use std::future::IntoFuture as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use snafu::{ensure, Location, OptionExt as _, ResultExt as _, Snafu};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::instrument;
use url::Url;

pub const SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

const CONSENT_DONE: &str = "The authentication flow has completed. You may close this window.";

const CONSENT_PENDING: &str = "Waiting for the authorization redirect.";

/// The OAuth client, as downloaded from the Google Cloud console.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: Url,
    #[serde(default = "default_token_uri")]
    pub token_uri: Url,
}

fn default_auth_uri() -> Url {
    Url::parse("https://accounts.google.com/o/oauth2/auth").expect("valid url")
}

fn default_token_uri() -> Url {
    Url::parse("https://oauth2.googleapis.com/token").expect("valid url")
}

/// The secrets file wraps the client in an `installed` or `web` object.
#[derive(Debug, Deserialize)]
struct SecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// A missing file is a setup problem, not something to retry.
    pub async fn load(path: &Path) -> Result<ClientSecrets, AuthError> {
        ensure!(
            tokio::fs::try_exists(path).await.unwrap_or(false),
            MissingClientSecretsSnafu { path }
        );

        let content = tokio::fs::read_to_string(path)
            .await
            .context(ReadClientSecretsSnafu { path })?;

        let file: SecretsFile =
            serde_json::from_str(&content).context(ParseClientSecretsSnafu { path })?;

        file.installed
            .or(file.web)
            .context(NoClientConfigSnafu { path })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl Token {
    /// A token without an expiry never expires.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.expiry.map_or(true, |expiry| expiry > now)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl TokenResponse {
    /// Refresh responses usually leave out the refresh token, so the previous one is kept.
    fn into_token(self, previous_refresh: Option<String>, now: DateTime<Utc>) -> Token {
        Token {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
            expiry: self.expires_in.map(|seconds| now + Duration::seconds(seconds)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Authenticator {
    client: reqwest::Client,
    secrets: ClientSecrets,
    token_file: PathBuf,
    interactive: bool,
}

impl Authenticator {
    pub fn new(client: reqwest::Client, secrets: ClientSecrets, token_file: PathBuf) -> Self {
        Self {
            client,
            secrets,
            token_file,
            interactive: true,
        }
    }

    /// Never falls back to the browser consent flow, for unattended runs.
    pub fn unattended(mut self) -> Self {
        self.interactive = false;
        self
    }

    /// A usable access token, refreshed or newly granted if needed. Fresh tokens are saved.
    #[instrument(skip(self), fields(token_file = %self.token_file.display()))]
    pub async fn access_token(&self) -> Result<String, AuthError> {
        let stored = self.load_token().await?;

        let token = match stored {
            Some(token) if token.is_valid(Utc::now()) => {
                tracing::debug!("using stored token");
                return Ok(token.access_token);
            }
            Some(Token {
                refresh_token: Some(refresh_token),
                ..
            }) => {
                tracing::info!("stored token expired, refreshing");
                self.refresh(refresh_token).await?
            }
            _ if self.interactive => self.consent().await?,
            _ => return ConsentRequiredSnafu.fail(),
        };

        self.save_token(&token).await?;
        Ok(token.access_token)
    }

    async fn load_token(&self) -> Result<Option<Token>, AuthError> {
        let path = &self.token_file;

        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error).context(ReadTokenSnafu { path }),
        };

        match serde_json::from_str(&content) {
            Ok(token) => Ok(Some(token)),
            Err(error) => {
                tracing::warn!(%error, "ignoring unreadable token file");
                Ok(None)
            }
        }
    }

    async fn save_token(&self, token: &Token) -> Result<(), AuthError> {
        let path = &self.token_file;
        let content = serde_json::to_string_pretty(token).context(EncodeTokenSnafu)?;

        tokio::fs::write(path, content)
            .await
            .context(SaveTokenSnafu { path })?;

        tracing::info!(path = %path.display(), "saved token");
        Ok(())
    }

    async fn refresh(&self, refresh_token: String) -> Result<Token, AuthError> {
        let response = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", &refresh_token),
                ("client_id", &self.secrets.client_id),
                ("client_secret", &self.secrets.client_secret),
            ])
            .await?;

        Ok(response.into_token(Some(refresh_token), Utc::now()))
    }

    /// Sends the user to the consent page and waits for the browser to come back to a loopback address.
    async fn consent(&self) -> Result<Token, AuthError> {
        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .context(LoopbackSnafu)?;
        let port = listener.local_addr().context(LoopbackSnafu)?.port();
        let redirect_uri = format!("http://127.0.0.1:{port}");

        let mut consent_url = self.secrets.auth_uri.clone();
        consent_url
            .query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.secrets.client_id)
            .append_pair("redirect_uri", &redirect_uri)
            .append_pair("scope", SCOPE)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");

        println!("Please visit this URL to authorize this application:\n{consent_url}");
        tracing::info!(%redirect_uri, "waiting for consent");

        let code = match receive_redirect(listener).await? {
            Redirect::Code(code) => code,
            Redirect::Denied(reason) => return ConsentDeniedSnafu { reason }.fail(),
        };

        let response = self
            .request_token(&[
                ("grant_type", "authorization_code"),
                ("code", &code),
                ("redirect_uri", &redirect_uri),
                ("client_id", &self.secrets.client_id),
                ("client_secret", &self.secrets.client_secret),
            ])
            .await?;

        Ok(response.into_token(None, Utc::now()))
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let response = self
            .client
            .post(self.secrets.token_uri.clone())
            .form(form)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .context(TokenRequestSnafu)?;

        response.json().await.context(TokenRequestSnafu)
    }
}

/// What the browser brought back to the loopback address.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Redirect {
    Code(String),
    Denied(String),
}

impl Redirect {
    /// `None` for anything else the browser asks for, such as `/favicon.ico` or a bare `/`.
    fn from_query(query: &HashMap<String, String>) -> Option<Redirect> {
        if let Some(reason) = query.get("error") {
            return Some(Redirect::Denied(reason.clone()));
        }

        query.get("code").cloned().map(Redirect::Code)
    }
}

type RedirectSender = Arc<Mutex<Option<oneshot::Sender<Redirect>>>>;

/// Serves the loopback address until the first request carrying `code` or `error`.
///
/// Idle and unrelated connections are answered by the router and never end the wait.
async fn receive_redirect(listener: TcpListener) -> Result<Redirect, AuthError> {
    let (sender, received) = oneshot::channel();
    let (stop, stopped) = oneshot::channel::<()>();

    let app = Router::new()
        .route("/", get(landing))
        .with_state(RedirectSender::new(Mutex::new(Some(sender))));

    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        stopped.await.ok();
    });
    let server = tokio::spawn(server.into_future());

    let redirect = received.await;

    // the landing page is still delivered while open connections drain in the background
    stop.send(()).ok();
    if redirect.is_err() {
        if let Ok(Err(source)) = server.await {
            return Err(source).context(LoopbackSnafu);
        }
    }

    redirect.ok().context(LoopbackClosedSnafu)
}

async fn landing(
    State(sender): State<RedirectSender>, Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, &'static str) {
    let Some(redirect) = Redirect::from_query(&query) else {
        return (StatusCode::NOT_FOUND, CONSENT_PENDING);
    };

    let sender = sender.lock().ok().and_then(|mut sender| sender.take());
    if let Some(sender) = sender {
        sender.send(redirect).ok();
    }

    (StatusCode::OK, CONSENT_DONE)
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AuthError {
    #[snafu(display(
        "client secrets file `{}` not found, download credentials.json from the Google Cloud console",
        path.display()
    ))]
    MissingClientSecrets {
        path: PathBuf,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("could not read client secrets `{}`: {source}", path.display()))]
    ReadClientSecrets {
        path: PathBuf,
        source: std::io::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("client secrets `{}` are malformed: {source}", path.display()))]
    ParseClientSecrets {
        path: PathBuf,
        source: serde_json::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("client secrets `{}` have neither an `installed` nor a `web` client", path.display()))]
    NoClientConfig {
        path: PathBuf,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("could not read token `{}`: {source}", path.display()))]
    ReadToken {
        path: PathBuf,
        source: std::io::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("could not encode token: {source}"))]
    EncodeToken {
        source: serde_json::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("could not save token `{}`: {source}", path.display()))]
    SaveToken {
        path: PathBuf,
        source: std::io::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("token request failed: {source}"))]
    TokenRequest {
        source: reqwest::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("no usable token, run an interactive command once to authorize"))]
    ConsentRequired {
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("could not receive the consent redirect: {source}"))]
    Loopback {
        source: std::io::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("authorization was denied: {reason}"))]
    ConsentDenied {
        reason: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("the consent listener stopped before an authorization code arrived"))]
    LoopbackClosed {
        #[snafu(implicit)]
        location: Location,
    },
}
