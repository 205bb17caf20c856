// ── Bounded fan-out ──
//
// One tokio task per item, admitted through a semaphore so at most `limit`
// run their bodies at once. Results come back in input order once every
// task has finished.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::error;

/// Run `work` over `items` with at most `limit` in flight (a limit of 0 is
/// treated as 1). Panicked tasks yield `None` in their slot.
pub(crate) async fn run_bounded<T, R, F, Fut>(items: Vec<T>, limit: usize, work: F) -> Vec<Option<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = R> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut tasks = JoinSet::new();
    let total = items.len();

    for (index, item) in items.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let fut = work(item);
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok()?;
            Some((index, fut.await))
        });
    }

    let mut results: Vec<Option<R>> = std::iter::repeat_with(|| None).take(total).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Some((index, value))) => {
                if let Some(slot) = results.get_mut(index) {
                    *slot = Some(value);
                }
            }
            Ok(None) => error!("worker pool semaphore closed"),
            Err(e) => error!(error = %e, "worker task panicked"),
        }
    }
    results
}
