//! Stateless HTTP trigger: every `POST /update` reads the video list from the configuration and runs one update.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use snafu::ResultExt as _;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::instrument;

use crate::auth::{AuthError, Authenticator, ClientSecrets};
use crate::config::Config;
use crate::error::{ApplicationError, BindAddressSnafu, WebServerSnafu};
use crate::sheets::{GoogleSheets, Sheet};
use crate::source::{VideoListJson, VideoSource};
use crate::tracker::Tracker;
use crate::youtube::{VideoRef, YouTube};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UpdateStatus {
    Success {
        message: String,
        timestamp: DateTime<Local>,
    },
    Error {
        message: String,
    },
}

impl UpdateStatus {
    fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

impl IntoResponse for UpdateStatus {
    fn into_response(self) -> Response {
        let status = match self {
            UpdateStatus::Success { .. } => StatusCode::OK,
            UpdateStatus::Error { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub client: reqwest::Client,
    pub youtube: YouTube,
}

impl AppState {
    pub fn new(config: Config, client: reqwest::Client) -> Self {
        Self {
            config: Arc::new(config),
            youtube: YouTube::new(client.clone()),
            client,
        }
    }

    /// Never prompts. A token has to be granted beforehand by an interactive command.
    async fn authorized_sheet(&self) -> Result<GoogleSheets, SetupError> {
        let spreadsheet_id = self.config.spreadsheet_id().map_err(SetupError::Config)?;

        let secrets = ClientSecrets::load(&self.config.credentials_file)
            .await
            .map_err(SetupError::Auth)?;
        let authenticator =
            Authenticator::new(self.client.clone(), secrets, self.config.token_file.clone())
                .unattended();
        authenticator.access_token().await.map_err(SetupError::Auth)?;

        Ok(GoogleSheets::authorized(self.client.clone(), spreadsheet_id, authenticator))
    }
}

#[derive(Debug)]
enum SetupError {
    Config(ApplicationError),
    Auth(AuthError),
}

impl std::fmt::Display for SetupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetupError::Config(error) => error.fmt(f),
            SetupError::Auth(error) => error.fmt(f),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/update", post(update))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: Config) -> Result<(), ApplicationError> {
    let address = config.host;
    let listener = TcpListener::bind(address)
        .await
        .context(BindAddressSnafu { address })?;

    tracing::info!(%address, "listening for update requests");

    let app = router(AppState::new(config, reqwest::Client::new()));
    axum::serve(listener, app).await.context(WebServerSnafu)
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[instrument(skip(state))]
async fn update(State(state): State<AppState>) -> UpdateStatus {
    let videos = match VideoListJson::new(state.config.videos_list.clone())
        .videos()
        .await
    {
        Ok(videos) if videos.is_empty() => return UpdateStatus::error("no video list found"),
        Ok(videos) => videos,
        Err(error) => return UpdateStatus::error(format!("could not read the video list: {error}")),
    };

    let sheet = match state.authorized_sheet().await {
        Ok(sheet) => sheet,
        Err(error) => {
            tracing::error!(%error, "spreadsheet setup failed");
            return UpdateStatus::error(format!("Google Sheets setup failed: {error}"));
        }
    };

    run_update(state.youtube.clone(), sheet, videos).await
}

/// One fetch-and-update over `videos`, reported the way the endpoint answers.
pub async fn run_update<S: Sheet>(youtube: YouTube, sheet: S, videos: Vec<VideoRef>) -> UpdateStatus {
    let count = videos.len();

    let mut tracker = Tracker::new(youtube, sheet);
    tracker.set_videos(videos);

    match tracker.update_now().await {
        Ok(outcome) => {
            tracing::info!(count, appended = outcome.appended, "update finished");
            UpdateStatus::Success {
                message: format!("updated {count} videos"),
                timestamp: Local::now(),
            }
        }
        Err(error) => {
            tracing::error!(%error, "update failed");
            UpdateStatus::error(format!("update failed: {error}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use axum_test::TestServer;
    use serde_json::{json, Value};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::sheets::memory::MemorySheet;

    fn server(config: Config) -> TestServer {
        TestServer::new(router(AppState::new(config, reqwest::Client::new()))).unwrap()
    }

    #[tokio::test]
    async fn health_check() {
        let response = server(Config::default()).get("/health").await;

        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["status"], "ok");
    }

    #[tokio::test]
    async fn missing_video_list() {
        let response = server(Config::default())
            .post("/update")
            .expect_failure()
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        response.assert_json(&json!({ "status": "error", "message": "no video list found" }));
    }

    #[tokio::test]
    async fn empty_video_list() {
        let config = Config {
            videos_list: Some("[]".to_string()),
            ..Config::default()
        };
        let response = server(config).post("/update").expect_failure().await;

        response.assert_json(&json!({ "status": "error", "message": "no video list found" }));
    }

    #[tokio::test]
    async fn setup_failure_is_reported() {
        let config = Config {
            videos_list: Some(r#"[{"url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ"}]"#.to_string()),
            spreadsheet_id: None,
            ..Config::default()
        };
        let response = server(config).post("/update").expect_failure().await;

        let body = response.json::<Value>();
        assert_eq!(body["status"], "error");
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("Google Sheets setup failed"));
    }

    #[tokio::test]
    async fn successful_update() {
        let pages = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#""viewCount":"1000""#))
            .mount(&pages)
            .await;

        let videos = vec![VideoRef::served_from("aaaaaaaaaaa", format!("{}/a", pages.uri()))];
        let status = run_update(YouTube::default(), MemorySheet::default(), videos).await;

        assert!(matches!(status, UpdateStatus::Success { ref message, .. } if message == "updated 1 videos"));
    }

    #[test]
    fn status_shape() {
        let status = serde_json::to_value(UpdateStatus::error("update failed: boom")).unwrap();
        assert_eq!(status, json!({ "status": "error", "message": "update failed: boom" }));
    }
}
