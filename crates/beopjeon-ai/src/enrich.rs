use beopjeon_core::StatuteDocument;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::{EnrichRequest, Enricher, Instruction};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichStats {
    pub enriched: usize,
    pub empty: usize,
    pub failed: usize,
}

/// Summarise (or reformat) every document, best-effort.
///
/// Returns new documents in input order with `summary` set where the model
/// produced text. Failures are logged and leave the document unchanged.
pub async fn enrich_documents<E: Enricher + ?Sized>(
    enricher: &E,
    documents: Vec<StatuteDocument>,
    instruction: Instruction,
    max_chars: usize,
    concurrency: usize,
) -> (Vec<StatuteDocument>, EnrichStats) {
    let results: Vec<_> = stream::iter(documents.iter())
        .map(|doc| async move {
            let request = EnrichRequest::for_document(doc, instruction, max_chars);
            enricher.enrich(&request).await
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut stats = EnrichStats::default();
    let enriched = documents
        .into_iter()
        .zip(results)
        .map(|(doc, result)| match result {
            Ok(response) if !response.text.trim().is_empty() => {
                stats.enriched += 1;
                StatuteDocument {
                    summary: Some(response.text.trim().to_string()),
                    ..doc
                }
            }
            Ok(_) => {
                stats.empty += 1;
                doc
            }
            Err(e) => {
                warn!(statute_code = %doc.statute_code, error = %e, "enrichment failed");
                stats.failed += 1;
                doc
            }
        })
        .collect();

    info!(
        enriched = stats.enriched,
        empty = stats.empty,
        failed = stats.failed,
        "enrichment finished"
    );
    (enriched, stats)
}
