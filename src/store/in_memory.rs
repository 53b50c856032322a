use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::store::{Spreadsheet, SpreadsheetStore, StoreError, Worksheet, WorksheetRows};

#[derive(Debug)]
struct StoredWorksheet {
    worksheet: Worksheet,
    values: Vec<Vec<String>>,
}

#[derive(Debug, Default)]
struct InMemoryState {
    worksheets: Mutex<Vec<StoredWorksheet>>,
    unavailable: AtomicBool,
}

impl InMemoryState {
    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(String::from(
                "in-memory store switched off",
            )));
        }

        Ok(())
    }
}

/// Spreadsheet kept in process memory. Used for local runs and tests.
///
/// Clones share the same worksheets.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    state: Arc<InMemoryState>,
}

impl InMemoryStore {
    /// Makes every following call fail, or succeed again when `false`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Every row of `title`, header included.
    pub async fn values(&self, title: &str) -> Option<Vec<Vec<String>>> {
        self.state
            .worksheets
            .lock()
            .await
            .iter()
            .find(|stored| stored.worksheet.title == title)
            .map(|stored| stored.values.clone())
    }
}

#[async_trait]
impl SpreadsheetStore for InMemoryStore {
    async fn open(&self) -> Result<Box<dyn Spreadsheet>, StoreError> {
        self.state.check_available()?;

        let worksheets = self
            .state
            .worksheets
            .lock()
            .await
            .iter()
            .map(|stored| stored.worksheet.clone())
            .collect();

        Ok(Box::new(InMemorySpreadsheet {
            state: self.state.clone(),
            worksheets,
        }))
    }
}

struct InMemorySpreadsheet {
    state: Arc<InMemoryState>,
    worksheets: Vec<Worksheet>,
}

#[async_trait]
impl Spreadsheet for InMemorySpreadsheet {
    fn worksheets(&self) -> &[Worksheet] {
        &self.worksheets
    }

    async fn create_worksheet(
        &self,
        title: &str,
        header: &[&str],
    ) -> Result<Worksheet, StoreError> {
        self.state.check_available()?;

        let mut worksheets = self.state.worksheets.lock().await;

        if worksheets.iter().any(|stored| stored.worksheet.title == title) {
            return Err(StoreError::UnexpectedResponse(format!(
                "A sheet with the name \"{}\" already exists",
                title
            )));
        }

        let worksheet = Worksheet {
            id: worksheets.len() as i64,
            title: String::from(title),
        };

        worksheets.push(StoredWorksheet {
            worksheet: worksheet.clone(),
            values: vec![header.iter().map(|cell| cell.to_string()).collect()],
        });

        Ok(worksheet)
    }

    async fn list_rows(&self, worksheet: &Worksheet) -> Result<WorksheetRows, StoreError> {
        self.state.check_available()?;

        let worksheets = self.state.worksheets.lock().await;
        let stored = worksheets
            .iter()
            .find(|stored| stored.worksheet == *worksheet)
            .ok_or_else(|| missing(worksheet))?;

        Ok(WorksheetRows::from_values(stored.values.clone()))
    }

    async fn append_row(&self, worksheet: &Worksheet, row: Vec<String>) -> Result<(), StoreError> {
        self.state.check_available()?;

        let mut worksheets = self.state.worksheets.lock().await;
        let stored = worksheets
            .iter_mut()
            .find(|stored| stored.worksheet == *worksheet)
            .ok_or_else(|| missing(worksheet))?;

        stored.values.push(row);

        Ok(())
    }
}

fn missing(worksheet: &Worksheet) -> StoreError {
    StoreError::UnexpectedResponse(format!("Unable to parse range: {}", worksheet.title))
}
