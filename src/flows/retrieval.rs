use crate::llm::Reranker;
use tracing::{debug, instrument, warn};

/// Pick the document most relevant to `query`.
///
/// The reranker's top `id` indexes `documents`. When the reranker fails or
/// returns an id outside the slice, the first document is used. `None` only
/// for an empty slice.
#[instrument(skip(reranker, documents), fields(documents = documents.len()))]
pub async fn best_context<'d>(
    reranker: &dyn Reranker,
    query: &str,
    documents: &'d [String],
) -> Option<&'d str> {
    let first = documents.first()?;

    let ranked = match reranker.rank(query, documents, 1).await {
        Ok(ranked) => ranked,
        Err(e) => {
            warn!(error = %e, "Rerank failed, using first document");
            return Some(first.as_str());
        }
    };

    match ranked.first().and_then(|top| documents.get(top.id).map(|doc| (top, doc))) {
        Some((top, doc)) => {
            debug!(id = top.id, score = top.score, "Best context selected");
            Some(doc.as_str())
        }
        None => {
            warn!(ranked = ranked.len(), "Rerank returned no usable id, using first document");
            Some(first.as_str())
        }
    }
}
