//! Ordered batch resolution with per-item isolation and pacing.

use std::sync::Arc;

use futures::stream::{self, StreamExt as _};
use sector_map_resolver_models::{ResolutionRequest, ResolutionResult};
use thiserror::Error;

use crate::Resolver;
use crate::config::EngineConfig;
use crate::pacer::Pacer;
use crate::progress::ProgressCallback;

/// Batch-level failures. Item failures are reported inside the results.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The batch has more items than the configured limit.
    #[error("Lote excede o limite de {max_items} itens")]
    BatchTooLarge {
        /// Number of items submitted.
        len: usize,
        /// Configured limit.
        max_items: usize,
    },
}

impl Resolver {
    /// Resolves every request, returning one result per request in input
    /// order.
    ///
    /// Items that reach an external collaborator are dispatched at least
    /// `config.pacing_ms` apart; items rejected during validation are not
    /// paced. Up to `config.concurrency` items are in flight at once.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::BatchTooLarge`] if `requests` has more than
    /// `config.max_batch_items` items. No item is processed in that case.
    pub async fn resolve_batch(
        &self,
        requests: &[ResolutionRequest],
        config: &EngineConfig,
        progress: Option<&Arc<dyn ProgressCallback>>,
    ) -> Result<Vec<ResolutionResult>, BatchError> {
        if requests.len() > config.max_batch_items {
            log::warn!(
                "Rejecting batch of {} items (limit {})",
                requests.len(),
                config.max_batch_items
            );
            return Err(BatchError::BatchTooLarge {
                len: requests.len(),
                max_items: config.max_batch_items,
            });
        }

        log::info!(
            "Resolving batch of {} items (concurrency={}, pacing={}ms)",
            requests.len(),
            config.concurrency,
            config.pacing_ms
        );

        if let Some(p) = progress {
            p.set_total(requests.len() as u64);
        }

        let pacer = Pacer::new(config.pacing_interval());
        let pacer = &pacer;

        let items = requests.iter().map(|request| async move {
            let result = self.resolve_paced(request, Some(pacer)).await;
            if let Some(p) = progress {
                p.inc(1);
            }
            result
        });

        let results: Vec<ResolutionResult> = stream::iter(items)
            .buffered(config.concurrency.max(1))
            .collect()
            .await;

        let failed = results.iter().filter(|r| !r.is_success()).count();
        log::info!(
            "Batch complete: {} resolved, {failed} failed",
            results.len() - failed
        );

        if let Some(p) = progress {
            p.finish(format!("{} items resolved", results.len()));
        }

        Ok(results)
    }
}
