use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::sync::Arc;

use crate::store::{
    ServiceAccountAuthenticator, Spreadsheet, SpreadsheetStore, StoreError, Worksheet,
    WorksheetRows,
};

/// Columns read when listing rows.
const LIST_COLUMNS: &str = "A:Z";

/// Google Sheets v4 REST adapter bound to one spreadsheet.
pub struct GoogleSheetsStore {
    inner: Arc<GoogleSheetsClient>,
}

struct GoogleSheetsClient {
    http_client: Client,
    base_url: String,
    spreadsheet_id: String,
    authenticator: ServiceAccountAuthenticator,
}

#[derive(Deserialize)]
struct SpreadsheetInfo {
    #[serde(default)]
    sheets: Vec<Sheet>,
}

#[derive(Deserialize)]
struct Sheet {
    properties: SheetProperties,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    #[serde(default)]
    sheet_id: i64,
    title: String,
}

#[derive(Deserialize)]
struct BatchUpdateResponse {
    #[serde(default)]
    replies: Vec<BatchUpdateReply>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateReply {
    add_sheet: Option<Sheet>,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

impl SheetProperties {
    fn into_worksheet(self) -> Worksheet {
        Worksheet {
            id: self.sheet_id,
            title: self.title,
        }
    }
}

impl GoogleSheetsStore {
    pub fn new(
        http_client: Client,
        base_url: String,
        spreadsheet_id: String,
        authenticator: ServiceAccountAuthenticator,
    ) -> GoogleSheetsStore {
        GoogleSheetsStore {
            inner: Arc::new(GoogleSheetsClient {
                http_client,
                base_url,
                spreadsheet_id,
                authenticator,
            }),
        }
    }
}

impl GoogleSheetsClient {
    /// `{base_url}/v4/spreadsheets/{segments..}`, each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = Url::parse(&self.base_url).map_err(|err| {
            StoreError::UnexpectedResponse(format!("invalid base url {}: {}", self.base_url, err))
        })?;

        url.path_segments_mut()
            .map_err(|_| {
                StoreError::UnexpectedResponse(format!("invalid base url {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(["v4", "spreadsheets"])
            .extend(segments);

        Ok(url)
    }

    fn values_url(&self, range: &str) -> Result<Url, StoreError> {
        self.url(&[self.spreadsheet_id.as_str(), "values", range])
    }
}

/// A1 notation scoped to `title`, e.g. `'Subscribers'!A1`.
pub fn a1_range(title: &str, cells: &str) -> String {
    format!("'{}'!{}", title.replace('\'', "''"), cells)
}

#[async_trait]
impl SpreadsheetStore for GoogleSheetsStore {
    #[tracing::instrument(
        name = "Open Google spreadsheet",
        skip(self),
        fields(spreadsheet_id = %self.inner.spreadsheet_id)
    )]
    async fn open(&self) -> Result<Box<dyn Spreadsheet>, StoreError> {
        let access_token = self.inner.authenticator.access_token().await?;
        let mut url = self.inner.url(&[self.inner.spreadsheet_id.as_str()])?;
        url.query_pairs_mut().append_pair("fields", "sheets.properties");

        let info = self
            .inner
            .http_client
            .get(url)
            .bearer_auth(access_token.expose_secret())
            .send()
            .await?
            .error_for_status()?
            .json::<SpreadsheetInfo>()
            .await?;

        let worksheets = info
            .sheets
            .into_iter()
            .map(|sheet| sheet.properties.into_worksheet())
            .collect();

        Ok(Box::new(GoogleSpreadsheet {
            client: self.inner.clone(),
            access_token,
            worksheets,
        }))
    }
}

struct GoogleSpreadsheet {
    client: Arc<GoogleSheetsClient>,
    access_token: Secret<String>,
    worksheets: Vec<Worksheet>,
}

impl GoogleSpreadsheet {
    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(self.access_token.expose_secret())
    }
}

#[async_trait]
impl Spreadsheet for GoogleSpreadsheet {
    fn worksheets(&self) -> &[Worksheet] {
        &self.worksheets
    }

    #[tracing::instrument(name = "Create worksheet", skip(self, header))]
    async fn create_worksheet(
        &self,
        title: &str,
        header: &[&str],
    ) -> Result<Worksheet, StoreError> {
        let batch_update = format!("{}:batchUpdate", self.client.spreadsheet_id);
        let body = serde_json::json!({
            "requests": [{ "addSheet": { "properties": { "title": title } } }]
        });

        let response = self
            .authorized(self.client.http_client.post(self.client.url(&[batch_update.as_str()])?))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<BatchUpdateResponse>()
            .await?;

        let worksheet = response
            .replies
            .into_iter()
            .find_map(|reply| reply.add_sheet)
            .map(|sheet| sheet.properties.into_worksheet())
            .ok_or_else(|| {
                StoreError::UnexpectedResponse(String::from("addSheet reply is missing"))
            })?;

        let mut url = self.client.values_url(&a1_range(title, "A1"))?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");

        self.authorized(self.client.http_client.put(url))
            .json(&serde_json::json!({ "values": [header] }))
            .send()
            .await?
            .error_for_status()?;

        Ok(worksheet)
    }

    #[tracing::instrument(name = "List worksheet rows", skip(self))]
    async fn list_rows(&self, worksheet: &Worksheet) -> Result<WorksheetRows, StoreError> {
        let url = self
            .client
            .values_url(&a1_range(&worksheet.title, LIST_COLUMNS))?;

        let value_range = self
            .authorized(self.client.http_client.get(url))
            .send()
            .await?
            .error_for_status()?
            .json::<ValueRange>()
            .await?;

        Ok(WorksheetRows::from_values(value_range.values))
    }

    #[tracing::instrument(name = "Append worksheet row", skip(self, row))]
    async fn append_row(&self, worksheet: &Worksheet, row: Vec<String>) -> Result<(), StoreError> {
        let append = format!("{}:append", a1_range(&worksheet.title, "A1"));
        let mut url = self.client.values_url(&append)?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");

        self.authorized(self.client.http_client.post(url))
            .json(&serde_json::json!({ "values": [row] }))
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}
