use async_trait::async_trait;

pub mod google_sheets;
pub mod in_memory;
pub mod service_account;

pub use google_sheets::GoogleSheetsStore;
pub use in_memory::InMemoryStore;
pub use service_account::ServiceAccountAuthenticator;

/// A named table inside the spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worksheet {
    pub id: i64,
    pub title: String,
}

/// Content of a worksheet: the header row and every data row below it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorksheetRows {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl WorksheetRows {
    pub fn from_values(mut values: Vec<Vec<String>>) -> WorksheetRows {
        if values.is_empty() {
            return WorksheetRows::default();
        }

        let header = values.remove(0);

        WorksheetRows {
            header,
            rows: values,
        }
    }

    /// Index of the header cell named `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|cell| cell == name)
    }

    /// Exact string comparison, no trimming or case folding.
    ///
    /// Fails when the header row has no `column` cell, since the first row
    /// may then be a data row that would escape the scan.
    pub fn contains(&self, column: &str, value: &str) -> Result<bool, StoreError> {
        let index = self.column_index(column).ok_or_else(|| {
            StoreError::UnexpectedResponse(format!(
                "Worksheet header {:?} has no {} column",
                self.header, column
            ))
        })?;

        Ok(self
            .rows
            .iter()
            .any(|row| row.get(index).map(String::as_str) == Some(value)))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("Failed to reach the spreadsheet service.")]
    Http(#[from] reqwest::Error),
    #[error("Failed to authenticate against the spreadsheet service: {0}")]
    Auth(String),
    #[error("Unexpected response from the spreadsheet service: {0}")]
    UnexpectedResponse(String),
    #[error("Spreadsheet store is unavailable: {0}")]
    Unavailable(String),
}

/// Entry point to the configured spreadsheet.
///
/// Holds only process-wide state (configuration, connection pools); every
/// request opens its own [`Spreadsheet`].
#[async_trait]
pub trait SpreadsheetStore: Send + Sync {
    /// Opens the spreadsheet by its configured id and loads its worksheet list.
    async fn open(&self) -> Result<Box<dyn Spreadsheet>, StoreError>;
}

/// An opened spreadsheet, valid for the duration of one request.
#[async_trait]
pub trait Spreadsheet: Send + Sync {
    /// Worksheets as loaded by [`SpreadsheetStore::open`].
    fn worksheets(&self) -> &[Worksheet];

    fn worksheet_by_title(&self, title: &str) -> Option<&Worksheet> {
        self.worksheets().iter().find(|sheet| sheet.title == title)
    }

    /// Adds a worksheet and writes `header` as its first row.
    async fn create_worksheet(&self, title: &str, header: &[&str])
        -> Result<Worksheet, StoreError>;

    async fn list_rows(&self, worksheet: &Worksheet) -> Result<WorksheetRows, StoreError>;

    async fn append_row(&self, worksheet: &Worksheet, row: Vec<String>) -> Result<(), StoreError>;
}

/// Resolves the worksheet titled `title`, creating it with `header` when absent.
/// An existing worksheet is returned untouched.
#[tracing::instrument(name = "Get or create worksheet", skip(spreadsheet, header))]
pub async fn get_or_create_worksheet(
    spreadsheet: &dyn Spreadsheet,
    title: &str,
    header: &[&str],
) -> Result<Worksheet, StoreError> {
    if let Some(worksheet) = spreadsheet.worksheet_by_title(title) {
        return Ok(worksheet.clone());
    }

    tracing::info!("Worksheet {} not found, creating it", title);

    spreadsheet.create_worksheet(title, header).await
}
