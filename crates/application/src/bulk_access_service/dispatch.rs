use std::future::Future;

use initiative_access_core::{AppError, AppResult};
use tokio::task::JoinSet;
use tracing::warn;

/// Runs one task per item concurrently and waits for every result.
///
/// Results are returned in input order. A task that panics or is aborted is
/// reported as an internal error for its item; other tasks are unaffected.
pub(crate) async fn fan_out<I, O, F, Fut>(items: Vec<I>, task: F) -> Vec<(I, AppResult<O>)>
where
    I: Clone,
    O: Send + 'static,
    F: Fn(I) -> Fut,
    Fut: Future<Output = AppResult<O>> + Send + 'static,
{
    let mut join_set = JoinSet::new();
    for (index, item) in items.iter().cloned().enumerate() {
        let future = task(item);
        join_set.spawn(async move { (index, future.await) });
    }

    let mut results: Vec<Option<AppResult<O>>> = items.iter().map(|_| None).collect();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((index, result)) => {
                if let Some(slot) = results.get_mut(index) {
                    *slot = Some(result);
                }
            }
            Err(error) => warn!(error = %error, "bulk task terminated before reporting"),
        }
    }

    items
        .into_iter()
        .zip(results)
        .map(|(item, result)| {
            let result = result.unwrap_or_else(|| {
                Err(AppError::Internal(
                    "bulk task terminated before reporting".to_owned(),
                ))
            });
            (item, result)
        })
        .collect()
}
