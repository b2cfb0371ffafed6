use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::{ports::SheetStore, DomainError, SessionContext, SpreadsheetRef};

/// Sheets kept in process memory; row 0 is the header row.
pub struct InMemorySheetStore {
    sheets: RwLock<HashMap<String, Vec<Vec<String>>>>,
}

impl InMemorySheetStore {
    pub fn new() -> Self {
        Self {
            sheets: RwLock::new(HashMap::new()),
        }
    }

    pub fn seed(&self, spreadsheet_id: &str, headers: Vec<String>) {
        if let Ok(mut sheets) = self.sheets.write() {
            sheets.insert(spreadsheet_id.to_string(), vec![headers]);
        }
    }

    pub fn rows(&self, spreadsheet_id: &str) -> Vec<Vec<String>> {
        self.sheets
            .read()
            .ok()
            .and_then(|s| s.get(spreadsheet_id).cloned())
            .unwrap_or_default()
    }
}

impl Default for InMemorySheetStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SheetStore for InMemorySheetStore {
    async fn fetch_headers(
        &self,
        _session: &SessionContext,
        sheet: &SpreadsheetRef,
    ) -> Result<Vec<String>, DomainError> {
        let sheets = self
            .sheets
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?;
        Ok(sheets
            .get(sheet.id())
            .and_then(|rows| rows.first().cloned())
            .unwrap_or_default())
    }

    async fn append_rows(
        &self,
        _session: &SessionContext,
        sheet: &SpreadsheetRef,
        rows: Vec<Vec<String>>,
    ) -> Result<(), DomainError> {
        let mut sheets = self
            .sheets
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?;
        sheets.entry(sheet.id().to_string()).or_default().extend(rows);
        Ok(())
    }

    async fn update_headers(
        &self,
        _session: &SessionContext,
        sheet: &SpreadsheetRef,
        headers: &[String],
    ) -> Result<(), DomainError> {
        let mut sheets = self
            .sheets
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?;
        let rows = sheets.entry(sheet.id().to_string()).or_default();
        match rows.first_mut() {
            Some(first) => *first = headers.to_vec(),
            None => rows.push(headers.to_vec()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> SpreadsheetRef {
        SpreadsheetRef::parse("https://docs.google.com/spreadsheets/d/s1").unwrap()
    }

    #[tokio::test]
    async fn test_update_then_append() {
        let store = InMemorySheetStore::new();
        let session = SessionContext::new("t");

        assert!(store.fetch_headers(&session, &sheet()).await.unwrap().is_empty());

        store
            .update_headers(&session, &sheet(), &["Nama".to_string()])
            .await
            .unwrap();
        store
            .append_rows(&session, &sheet(), vec![vec!["Budi".to_string()]])
            .await
            .unwrap();

        assert_eq!(store.fetch_headers(&session, &sheet()).await.unwrap(), vec!["Nama"]);
        assert_eq!(store.rows("s1"), vec![vec!["Nama"], vec!["Budi"]]);
    }
}
