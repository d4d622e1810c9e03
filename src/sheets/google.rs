use serde::Deserialize;
use serde_json::json;
use snafu::ResultExt as _;
use tracing::instrument;

use super::*;
use crate::auth::Authenticator;

pub const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

#[derive(Clone)]
enum Credential {
    Fixed(String),
    /// Looked up before every request, so long-running schedules outlive a single token.
    Refreshing(Authenticator),
}

/// The tracked range of one spreadsheet, through the Sheets v4 REST API.
#[derive(Clone)]
pub struct GoogleSheets {
    client: reqwest::Client,
    endpoint: String,
    spreadsheet_id: String,
    credential: Credential,
}

impl std::fmt::Debug for GoogleSheets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSheets")
            .field("endpoint", &self.endpoint)
            .field("spreadsheet_id", &self.spreadsheet_id)
            .finish_non_exhaustive()
    }
}

impl GoogleSheets {
    pub fn new(
        client: reqwest::Client, spreadsheet_id: impl Into<String>, access_token: impl Into<String>,
    ) -> Self {
        Self::with_credential(client, spreadsheet_id, Credential::Fixed(access_token.into()))
    }

    pub fn authorized(
        client: reqwest::Client, spreadsheet_id: impl Into<String>, authenticator: Authenticator,
    ) -> Self {
        Self::with_credential(client, spreadsheet_id, Credential::Refreshing(authenticator))
    }

    fn with_credential(
        client: reqwest::Client, spreadsheet_id: impl Into<String>, credential: Credential,
    ) -> Self {
        Self {
            client,
            endpoint: SHEETS_API.to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            credential,
        }
    }

    /// Sends requests somewhere other than [SHEETS_API].
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn values_url(&self) -> String {
        format!("{}/{}/values/{RANGE}", self.endpoint, self.spreadsheet_id)
    }

    async fn access_token(&self) -> Result<String> {
        match &self.credential {
            Credential::Fixed(token) => Ok(token.clone()),
            Credential::Refreshing(authenticator) => {
                authenticator.access_token().await.context(AuthorizeSnafu {
                    spreadsheet_id: &self.spreadsheet_id,
                })
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Row>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateValuesResponse {
    #[serde(default)]
    updated_cells: u64,
}

impl Sheet for GoogleSheets {
    #[instrument(skip(self), fields(spreadsheet_id = %self.spreadsheet_id))]
    async fn read_rows(&self) -> Result<Vec<Row>> {
        let context = || ReadSheetSnafu {
            spreadsheet_id: &self.spreadsheet_id,
        };

        let access_token = self.access_token().await?;
        let response = self
            .client
            .get(self.values_url())
            .bearer_auth(access_token)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .with_context(|_| context())?;

        let range: ValueRange = response.json().await.with_context(|_| context())?;
        tracing::debug!(rows = range.values.len(), "read spreadsheet");

        Ok(range.values)
    }

    #[instrument(skip(self, rows), fields(spreadsheet_id = %self.spreadsheet_id, rows = rows.len()))]
    async fn write_rows(&self, rows: &[Row]) -> Result<u64> {
        let context = || WriteSheetSnafu {
            spreadsheet_id: &self.spreadsheet_id,
        };

        let body = json!({
            "range": RANGE,
            "majorDimension": "ROWS",
            "values": rows,
        });

        let access_token = self.access_token().await?;
        let response = self
            .client
            .put(self.values_url())
            .query(&[("valueInputOption", "RAW")])
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .with_context(|_| context())?;

        let update: UpdateValuesResponse = response.json().await.with_context(|_| context())?;
        tracing::info!(updated_cells = update.updated_cells, "updated spreadsheet");

        Ok(update.updated_cells)
    }
}
