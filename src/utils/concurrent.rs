//! Async combinators.
//!
//! - `fan_out`: run futures concurrently, wait for all, keep the first failure
//! - `ErrbackExt`: observe any fallible future through a completion callback

use std::future::Future;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::task::JoinHandle;

/// Run every task concurrently and wait for all of them to finish.
///
/// Returns the outputs in input order, or the first error by completion
/// order. A failure never cancels siblings that are still running.
pub async fn fan_out<I, F, T, E>(tasks: I) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    let mut pending: FuturesUnordered<_> = tasks
        .into_iter()
        .enumerate()
        .map(|(index, task)| async move { (index, task.await) })
        .collect();

    let mut results: Vec<Option<T>> = (0..pending.len()).map(|_| None).collect();
    let mut first_error: Option<E> = None;

    while let Some((index, outcome)) = pending.next().await {
        match outcome {
            Ok(value) => results[index] = Some(value),
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(results.into_iter().flatten().collect()),
    }
}

/// Callback-style observation of a fallible future.
///
/// The future is the primitive; `errback` spawns it and hands its outcome,
/// unchanged, to `callback`.
pub trait ErrbackExt<T, E>: Future<Output = Result<T, E>> + Sized {
    fn errback<C>(self, callback: C) -> JoinHandle<()>
    where
        Self: Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
        C: FnOnce(Result<T, E>) + Send + 'static,
    {
        tokio::spawn(async move { callback(self.await) })
    }
}

impl<F, T, E> ErrbackExt<T, E> for F where F: Future<Output = Result<T, E>> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fan_out_keeps_input_order() {
        let tasks = vec![30u64, 10, 20].into_iter().map(|ms| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok::<_, String>(ms)
        });

        assert_eq!(fan_out(tasks).await.unwrap(), vec![30, 10, 20]);
    }

    #[tokio::test]
    async fn test_fan_out_first_error_by_completion() {
        let finished = Arc::new(AtomicUsize::new(0));
        let tasks = vec![(40u64, Some("slow")), (5, Some("fast")), (20, None)]
            .into_iter()
            .map(|(ms, fail)| {
                let finished = finished.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    finished.fetch_add(1, Ordering::SeqCst);
                    match fail {
                        Some(msg) => Err(msg.to_string()),
                        None => Ok(ms),
                    }
                }
            });

        assert_eq!(fan_out(tasks).await.unwrap_err(), "fast");
        assert_eq!(finished.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_fan_out_empty_is_immediate() {
        let tasks: Vec<std::future::Ready<Result<u8, String>>> = Vec::new();
        let mut task = tokio_test::task::spawn(fan_out(tasks));
        let outcome = tokio_test::assert_ready!(task.poll());
        assert_eq!(outcome, Ok(vec![]));
    }

    #[tokio::test]
    async fn test_errback_sees_same_outcome() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        async { Err::<u8, String>("boom".to_string()) }
            .errback(move |outcome| {
                let _ = tx.send(outcome);
            })
            .await
            .unwrap();

        assert_eq!(rx.await.unwrap(), Err("boom".to_string()));
    }
}
