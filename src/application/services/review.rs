use serde::Serialize;

use crate::domain::{BatchResult, DomainError, ExtractionRecord, Schema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    Open,
    /// Records are being written; the review is locked until the write settles.
    Committing,
    Closed,
}

/// Editable copy of a batch result, held until it is committed or discarded.
#[derive(Debug, Clone)]
pub struct ReviewStore {
    schema: Schema,
    records: Vec<ExtractionRecord>,
    state: ReviewState,
}

impl ReviewStore {
    pub fn new(schema: Schema, records: BatchResult) -> Self {
        let records: Vec<_> = records.iter().map(|r| r.conform(&schema)).collect();
        let state = if records.is_empty() {
            ReviewState::Closed
        } else {
            ReviewState::Open
        };
        Self {
            schema,
            records,
            state,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[ExtractionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn state(&self) -> ReviewState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == ReviewState::Closed
    }

    pub fn edit(&mut self, index: usize, field: &str, value: impl Into<String>) -> Result<(), DomainError> {
        self.ensure_open()?;
        if !self.schema.contains(field) {
            return Err(DomainError::validation(format!("Unknown field: {field}")));
        }
        let record = self.record_mut(index)?;
        record.set(field, value);
        Ok(())
    }

    /// Removes a record. Removing the last one closes the store.
    pub fn delete_record(&mut self, index: usize) -> Result<ReviewState, DomainError> {
        self.ensure_open()?;
        self.record_mut(index)?;
        self.records.remove(index);
        if self.records.is_empty() {
            self.state = ReviewState::Closed;
        }
        Ok(self.state)
    }

    /// Current records, ready to be persisted by the caller.
    pub fn commit(&self) -> Result<BatchResult, DomainError> {
        self.ensure_open()?;
        Ok(self.records.clone())
    }

    /// Hands the records to a save and locks the review until
    /// [`finish_commit`](Self::finish_commit) or [`abort_commit`](Self::abort_commit).
    pub fn begin_commit(&mut self) -> Result<BatchResult, DomainError> {
        let records = self.commit()?;
        self.state = ReviewState::Committing;
        Ok(records)
    }

    /// The save succeeded: the review is done.
    pub fn finish_commit(&mut self) -> Result<(), DomainError> {
        self.ensure_committing()?;
        self.discard();
        Ok(())
    }

    /// The save failed: reopen for edits and another attempt.
    pub fn abort_commit(&mut self) -> Result<(), DomainError> {
        self.ensure_committing()?;
        self.state = ReviewState::Open;
        Ok(())
    }

    pub fn discard(&mut self) {
        self.records.clear();
        self.state = ReviewState::Closed;
    }

    fn ensure_open(&self) -> Result<(), DomainError> {
        match self.state {
            ReviewState::Open => Ok(()),
            ReviewState::Committing => {
                Err(DomainError::validation("Review is being committed"))
            }
            ReviewState::Closed => Err(DomainError::validation("Review is closed")),
        }
    }

    fn ensure_committing(&self) -> Result<(), DomainError> {
        match self.state {
            ReviewState::Committing => Ok(()),
            _ => Err(DomainError::validation("Review is not being committed")),
        }
    }

    fn record_mut(&mut self, index: usize) -> Result<&mut ExtractionRecord, DomainError> {
        let len = self.records.len();
        self.records
            .get_mut(index)
            .ok_or_else(|| DomainError::not_found(format!("Record {index} (have {len})")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ReviewStore {
        let schema = Schema::new(["Nama", "Tanggal"]).unwrap();
        let records = vec![
            ExtractionRecord::blank(&schema).with("Nama", "Budi"),
            ExtractionRecord::blank(&schema).with("Nama", "Siti"),
        ];
        ReviewStore::new(schema, records)
    }

    #[test]
    fn test_edit_updates_value() {
        let mut store = store();
        store.edit(1, "Tanggal", "02-02-2026").unwrap();
        assert_eq!(store.records()[1].get("Tanggal"), Some("02-02-2026"));
        assert_eq!(store.records()[0].get("Tanggal"), Some(""));
    }

    #[test]
    fn test_edit_rejects_unknown_field_and_bad_index() {
        let mut store = store();
        assert!(matches!(
            store.edit(0, "Alamat", "x"),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            store.edit(5, "Nama", "x"),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn test_deleting_last_record_closes_store() {
        let mut store = store();
        assert_eq!(store.delete_record(0).unwrap(), ReviewState::Open);
        assert_eq!(store.records()[0].get("Nama"), Some("Siti"));
        assert_eq!(store.delete_record(0).unwrap(), ReviewState::Closed);
        assert!(store.is_closed());
        assert!(store.commit().is_err());
        assert!(store.edit(0, "Nama", "x").is_err());
    }

    #[test]
    fn test_commit_returns_edited_records() {
        let mut store = store();
        store.edit(0, "Nama", "BUDI SANTOSO").unwrap();
        let committed = store.commit().unwrap();
        assert_eq!(committed.len(), 2);
        assert_eq!(committed[0].get("Nama"), Some("BUDI SANTOSO"));
        assert!(!store.is_closed());
    }

    #[test]
    fn test_commit_in_progress_locks_the_review() {
        let mut store = store();
        let records = store.begin_commit().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(store.state(), ReviewState::Committing);

        assert!(store.edit(0, "Nama", "x").is_err());
        assert!(store.delete_record(0).is_err());
        assert!(store.begin_commit().is_err());

        store.finish_commit().unwrap();
        assert!(store.is_closed());
        assert!(store.is_empty());
    }

    #[test]
    fn test_failed_commit_reopens() {
        let mut store = store();
        store.begin_commit().unwrap();
        store.abort_commit().unwrap();
        assert_eq!(store.state(), ReviewState::Open);
        store.edit(0, "Nama", "BUDI").unwrap();
        assert_eq!(store.begin_commit().unwrap()[0].get("Nama"), Some("BUDI"));

        assert!(ReviewStore::new(Schema::new(["Nama"]).unwrap(), vec![])
            .abort_commit()
            .is_err());
    }

    #[test]
    fn test_discard_closes() {
        let mut store = store();
        store.discard();
        assert!(store.is_empty());
        assert_eq!(store.state(), ReviewState::Closed);
    }

    #[test]
    fn test_records_are_conformed_to_schema() {
        let schema = Schema::new(["Nama"]).unwrap();
        let store = ReviewStore::new(
            schema,
            vec![ExtractionRecord::new().with("Other", "x")],
        );
        assert_eq!(store.records()[0].keys().collect::<Vec<_>>(), ["Nama"]);
        assert!(ReviewStore::new(Schema::new(["Nama"]).unwrap(), vec![]).is_closed());
    }
}
