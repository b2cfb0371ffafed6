use async_trait::async_trait;

use crate::domain::{errors::DomainError, SessionContext, SpreadsheetRef};

#[async_trait]
pub trait SheetStore: Send + Sync {
    /// First row of the sheet, empty when the sheet has no header row.
    async fn fetch_headers(
        &self,
        session: &SessionContext,
        sheet: &SpreadsheetRef,
    ) -> Result<Vec<String>, DomainError>;

    async fn append_rows(
        &self,
        session: &SessionContext,
        sheet: &SpreadsheetRef,
        rows: Vec<Vec<String>>,
    ) -> Result<(), DomainError>;

    async fn update_headers(
        &self,
        session: &SessionContext,
        sheet: &SpreadsheetRef,
        headers: &[String],
    ) -> Result<(), DomainError>;
}
