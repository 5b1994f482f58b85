//! Fixed-size batch processing with per-batch failure isolation.
//!
//! Inference calls against local models are batched for throughput but can
//! fail for a whole batch at once (an OOM, one malformed item poisoning
//! tokenization). Catching failures at batch granularity bounds the blast
//! radius to `batch_size` items while the rest of the run proceeds.

use tracing::{info, warn};

use crate::error::{InferError, Result};

/// Default number of items per model invocation.
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Progress is reported whenever the cumulative item count crosses a
/// multiple of this many items, and after the final batch.
const PROGRESS_INTERVAL: usize = 100;

/// One task-specific step of the batch pipeline.
///
/// Implementations own the mapping from work items to model calls and the
/// shape of the error sentinel emitted when a whole batch fails.
#[async_trait::async_trait]
pub trait BatchAdapter: Send + Sync {
    type Item: Send + Sync;
    type Output: Send;

    /// Tag used in diagnostics for this adapter.
    fn task(&self) -> &'static str;

    /// Process one batch, returning exactly one output per input, in input
    /// order. Any error fails the batch as a whole.
    async fn process_batch(&self, batch: &[Self::Item]) -> Result<Vec<Self::Output>>;

    /// Error sentinel for one item of a failed batch: an empty/zero payload
    /// paired with the failure description, carrying the item's id through.
    fn error_output(&self, item: &Self::Item, error: &InferError) -> Self::Output;
}

/// Run `items` through `adapter` in contiguous batches of `batch_size`.
///
/// Guarantees `output.len() == items.len()` with outputs at the same ordinal
/// position as their inputs, regardless of how many batches fail. A failed
/// batch yields one error sentinel per item and the run continues; nothing
/// short of the caller's own I/O aborts the loop.
///
/// # Panics
///
/// Panics if `batch_size` is zero.
pub async fn run_batched<A: BatchAdapter>(
    adapter: &A,
    items: &[A::Item],
    batch_size: usize,
) -> Vec<A::Output> {
    assert!(batch_size > 0, "batch size must be positive");

    let total = items.len();
    let mut results = Vec::with_capacity(total);
    let mut failed_batches = 0usize;

    for batch in items.chunks(batch_size) {
        match adapter.process_batch(batch).await {
            Ok(outputs) if outputs.len() == batch.len() => results.extend(outputs),
            Ok(outputs) => {
                // The step broke the one-output-per-item contract; treat the
                // whole batch as failed rather than guessing an alignment.
                let err = InferError::Inference(format!(
                    "step returned {} results for a batch of {}",
                    outputs.len(),
                    batch.len()
                ));
                warn!("batch starting at {} failed: {err}", results.len());
                failed_batches += 1;
                results.extend(batch.iter().map(|item| adapter.error_output(item, &err)));
            }
            Err(err) => {
                warn!("batch starting at {} failed: {err}", results.len());
                failed_batches += 1;
                results.extend(batch.iter().map(|item| adapter.error_output(item, &err)));
            }
        }

        let done = results.len();
        if done % PROGRESS_INTERVAL == 0 || done == total {
            info!("processed {done}/{total} items");
        }
    }

    if failed_batches > 0 {
        warn!(
            "{} completed with {failed_batches} failed batch(es) out of {}",
            adapter.task(),
            total.div_ceil(batch_size)
        );
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct DoublingAdapter {
        calls: AtomicUsize,
        /// Batch indices (0-based) that fail.
        fail_batches: Vec<usize>,
        /// Return one result too few on every batch.
        short_output: bool,
    }

    impl DoublingAdapter {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_batches: Vec::new(),
                short_output: false,
            }
        }

        fn failing_on(batches: Vec<usize>) -> Self {
            Self {
                fail_batches: batches,
                ..Self::new()
            }
        }
    }

    #[derive(Debug, PartialEq)]
    struct Out {
        id: String,
        value: Option<i64>,
        error: Option<String>,
    }

    #[async_trait::async_trait]
    impl BatchAdapter for DoublingAdapter {
        type Item = (String, i64);
        type Output = Out;

        fn task(&self) -> &'static str {
            "double"
        }

        async fn process_batch(&self, batch: &[(String, i64)]) -> Result<Vec<Out>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_batches.contains(&call) {
                return Err(InferError::Inference("model exploded".to_string()));
            }
            let mut outputs: Vec<Out> = batch
                .iter()
                .map(|(id, n)| Out {
                    id: id.clone(),
                    value: Some(n * 2),
                    error: None,
                })
                .collect();
            if self.short_output {
                outputs.pop();
            }
            Ok(outputs)
        }

        fn error_output(&self, item: &(String, i64), error: &InferError) -> Out {
            Out {
                id: item.0.clone(),
                value: None,
                error: Some(error.to_string()),
            }
        }
    }

    fn items(n: usize) -> Vec<(String, i64)> {
        (0..n).map(|i| (format!("item-{i}"), i as i64)).collect()
    }

    #[tokio::test]
    async fn test_order_and_identity_preserved_across_batches() {
        let adapter = DoublingAdapter::new();
        let input = items(10);

        let output = run_batched(&adapter, &input, 3).await;

        assert_eq!(output.len(), input.len());
        for (i, out) in output.iter().enumerate() {
            assert_eq!(out.id, input[i].0);
            assert_eq!(out.value, Some(2 * i as i64));
            assert!(out.error.is_none());
        }
        assert_eq!(adapter.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_empty_input_runs_no_batches() {
        let adapter = DoublingAdapter::new();
        let output = run_batched(&adapter, &[], 32).await;
        assert!(output.is_empty());
        assert_eq!(adapter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_batch_is_isolated() {
        let adapter = DoublingAdapter::failing_on(vec![1]);
        let input = items(9);

        let output = run_batched(&adapter, &input, 3).await;

        assert_eq!(output.len(), 9);
        // Batches 0 and 2 succeed.
        for i in (0..3).chain(6..9) {
            assert!(output[i].error.is_none(), "item {i} unexpectedly failed");
        }
        // Every item of batch 1 carries the sentinel, ids intact.
        for i in 3..6 {
            assert_eq!(output[i].id, input[i].0);
            assert_eq!(output[i].value, None);
            assert!(output[i].error.as_deref().unwrap().contains("model exploded"));
        }
    }

    #[tokio::test]
    async fn test_every_batch_failing_still_fills_output() {
        let adapter = DoublingAdapter::failing_on(vec![0, 1, 2, 3]);
        let input = items(7);

        let output = run_batched(&adapter, &input, 2).await;

        assert_eq!(output.len(), 7);
        for (i, out) in output.iter().enumerate() {
            assert_eq!(out.id, input[i].0);
            assert!(out.error.is_some());
        }
    }

    #[tokio::test]
    async fn test_short_step_output_fails_the_batch() {
        let adapter = DoublingAdapter {
            short_output: true,
            ..DoublingAdapter::new()
        };
        let input = items(4);

        let output = run_batched(&adapter, &input, 4).await;

        assert_eq!(output.len(), 4);
        for out in &output {
            assert!(out.error.as_deref().unwrap().contains("3 results"));
        }
    }

    #[tokio::test]
    async fn test_last_partial_batch() {
        let adapter = DoublingAdapter::new();
        let input = items(5);

        let output = run_batched(&adapter, &input, 4).await;

        assert_eq!(output.len(), 5);
        assert_eq!(adapter.calls.load(Ordering::SeqCst), 2);
        assert_eq!(output[4].value, Some(8));
    }
}
