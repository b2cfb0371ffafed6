use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::domain::{
    ports::DocumentExtractor, progress_percent, BatchError, BatchReport, Document,
    FailedDocument, Schema,
};

pub const DEFAULT_CHUNK_SIZE: usize = 3;

/// Drives a set of documents through an extractor, `chunk_size` at a time.
///
/// Chunks run strictly in order. Documents inside a chunk are in flight
/// together on the calling task and their results are appended only once the
/// whole chunk has settled, so no locking is involved.
pub struct BatchOrchestrator {
    extractor: Arc<dyn DocumentExtractor>,
    chunk_size: usize,
}

impl BatchOrchestrator {
    pub fn new(extractor: Arc<dyn DocumentExtractor>) -> Self {
        Self::with_chunk_size(extractor, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(extractor: Arc<dyn DocumentExtractor>, chunk_size: usize) -> Self {
        Self {
            extractor,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Runs the batch to completion. Individual failures never abort it; they
    /// are reported in [`BatchReport::failures`]. `on_progress` is called once
    /// per chunk with the rounded share of processed documents.
    #[instrument(skip_all, fields(documents = documents.len(), chunk_size = self.chunk_size))]
    pub async fn run_batch<F>(
        &self,
        documents: Vec<Document>,
        schema: &Schema,
        mut on_progress: F,
    ) -> Result<BatchReport, BatchError>
    where
        F: FnMut(u8) + Send,
    {
        if documents.is_empty() {
            return Err(BatchError::NoDocuments);
        }

        let total = documents.len();
        let total_chunks = total.div_ceil(self.chunk_size);
        let mut report = BatchReport::default();
        let mut processed = 0;

        for (index, chunk) in documents.chunks(self.chunk_size).enumerate() {
            info!(
                chunk = index + 1,
                total_chunks,
                size = chunk.len(),
                "dispatching chunk"
            );

            let mut in_flight: FuturesUnordered<_> = chunk
                .iter()
                .map(|document| async move {
                    let outcome = self.extractor.extract_one(document, schema).await;
                    (document, outcome)
                })
                .collect();

            let mut records = Vec::new();
            let mut failures = Vec::new();
            while let Some((document, outcome)) = in_flight.next().await {
                match outcome {
                    Ok(extracted) => {
                        debug!(
                            document = document.name(),
                            records = extracted.len(),
                            "document extracted"
                        );
                        records.extend(extracted);
                    }
                    Err(e) => {
                        warn!(document = document.name(), error = %e, "document failed");
                        failures.push(FailedDocument::new(document.name(), e.to_string()));
                    }
                }
            }

            info!(
                chunk = index + 1,
                succeeded = chunk.len() - failures.len(),
                failed = failures.len(),
                "chunk settled"
            );

            report.records.extend(records);
            report.failures.extend(failures);
            processed += chunk.len();
            on_progress(progress_percent(processed, total));
        }

        if report.records.is_empty() {
            warn!(failed = report.failures.len(), "batch produced no records");
            return Err(BatchError::NothingExtracted {
                failures: report.failures,
            });
        }

        info!(
            records = report.records.len(),
            failed = report.failures.len(),
            "batch completed"
        );
        Ok(report)
    }
}
