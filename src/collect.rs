//! Concurrent fan-out/fan-in
//!
//! [`fan_out`] runs one task per work item and gathers every success and
//! every failure into a [`Collected`]. The same primitive is used at each
//! nesting level: providers, repositories, and pull requests.

use crate::error::{Error, format_errors};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Deadline-bound, cancellable execution context
///
/// A child scope shares its parent's deadline and is cancelled whenever the
/// parent is.
#[derive(Debug, Clone)]
pub struct Scope {
    deadline: Instant,
    token: CancellationToken,
}

impl Scope {
    /// Root scope expiring `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            token: CancellationToken::new(),
        }
    }

    /// Derive a child scope
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            deadline: self.deadline,
            token: self.token.child_token(),
        }
    }

    /// Cancel this scope and every scope derived from it
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Run `fut` until it completes, the deadline passes, or the scope is cancelled
    ///
    /// An abandoned future is dropped at its next suspension point. `fut` is
    /// polled first, so an inner error that is already ready wins over this
    /// scope's own deadline or cancellation.
    pub async fn run<T, E, F>(&self, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<Error>,
    {
        tokio::select! {
            biased;
            result = fut => result,
            () = self.token.cancelled() => Err(Error::Cancelled.into()),
            () = tokio::time::sleep_until(self.deadline) => Err(Error::DeadlineExceeded.into()),
        }
    }
}

/// Successes and failures gathered from a fan-out
///
/// Order within either list is completion order and carries no meaning.
#[derive(Debug)]
pub struct Collected<T, E = Error> {
    /// Every successful result
    pub items: Vec<T>,
    /// Every error
    pub errors: Vec<E>,
}

impl<T, E> Default for Collected<T, E> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl<T, E> Collected<T, E> {
    /// Empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Move everything from `other` into `self`
    pub fn absorb(&mut self, other: Self) {
        self.items.extend(other.items);
        self.errors.extend(other.errors);
    }

    /// Transform every error, keeping items
    pub fn map_errors<E2>(self, f: impl FnMut(E) -> E2) -> Collected<T, E2> {
        Collected {
            items: self.items,
            errors: self.errors.into_iter().map(f).collect(),
        }
    }
}

impl<T> Collected<T> {
    /// Combine every error into at most one, keeping all items
    ///
    /// A lone error is kept as-is; several become one [`Error::Aggregate`]
    /// listing each message.
    #[must_use]
    pub fn fold_errors(mut self) -> Self {
        if self.errors.len() > 1 {
            let combined = Error::Aggregate(format_errors(&self.errors));
            self.errors = vec![combined];
        }
        self
    }
}

impl<T, E> Collected<Collected<T, E>, E> {
    /// Flatten nested collections produced by a fan-out of fan-outs
    pub fn flatten(self) -> Collected<T, E> {
        let mut flat = Collected {
            items: Vec::new(),
            errors: self.errors,
        };
        for inner in self.items {
            flat.absorb(inner);
        }
        flat
    }
}

/// Run `op` once per item concurrently and collect every outcome
///
/// Each item gets its own task. Workers report on two channels, one for
/// results and one for errors. A supervisor waits for all workers, turns a
/// panicked worker into an error, then closes both channels. The collecting
/// loop selects over both channels until both are closed, so every launched
/// unit contributes exactly one outcome and one failure never stops its
/// siblings.
///
/// Each worker receives a child of `scope`; nested fan-outs inside `op`
/// inherit its deadline and cancellation.
pub async fn fan_out<I, T, E, F, Fut>(
    scope: &Scope,
    items: impl IntoIterator<Item = I>,
    op: F,
) -> Collected<T, E>
where
    I: Send + 'static,
    T: Send + 'static,
    E: From<Error> + Send + 'static,
    F: Fn(Scope, I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    let scope = scope.child();
    let op = Arc::new(op);
    let (item_tx, mut item_rx) = mpsc::unbounded_channel::<T>();
    let (err_tx, mut err_rx) = mpsc::unbounded_channel::<E>();

    let mut workers = JoinSet::new();
    for item in items {
        let op = Arc::clone(&op);
        let scope = scope.clone();
        let item_tx = item_tx.clone();
        let err_tx = err_tx.clone();
        workers.spawn(async move {
            let work = (*op)(scope.clone(), item);
            match scope.run(work).await {
                Ok(value) => {
                    let _ = item_tx.send(value);
                }
                Err(err) => {
                    let _ = err_tx.send(err);
                }
            }
        });
    }
    let launched = workers.len();

    tokio::spawn(async move {
        while let Some(joined) = workers.join_next().await {
            if let Err(join_err) = joined {
                let _ = err_tx.send(E::from(Error::from(join_err)));
            }
        }
        drop(item_tx);
        drop(err_tx);
    });

    let mut collected = Collected::new();
    let mut items_open = true;
    let mut errors_open = true;
    while items_open || errors_open {
        tokio::select! {
            item = item_rx.recv(), if items_open => match item {
                Some(value) => collected.items.push(value),
                None => items_open = false,
            },
            err = err_rx.recv(), if errors_open => match err {
                Some(err) => collected.errors.push(err),
                None => errors_open = false,
            },
        }
    }

    debug!(
        launched,
        succeeded = collected.items.len(),
        failed = collected.errors.len(),
        "fan-out complete"
    );
    collected
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn scope() -> Scope {
        Scope::with_timeout(Duration::from_secs(10))
    }

    #[tokio::test]
    async fn test_fan_out_collects_all_successes() {
        let collected: Collected<u32> =
            fan_out(&scope(), 0..20u32, |_, n| async move { Ok(n * 2) }).await;

        let mut items = collected.items;
        items.sort_unstable();
        assert_eq!(items, (0..20).map(|n| n * 2).collect::<Vec<_>>());
        assert!(collected.errors.is_empty());
    }

    #[tokio::test]
    async fn test_fan_out_separates_failures() {
        let collected: Collected<u32> = fan_out(&scope(), 0..10u32, |_, n| async move {
            if n % 3 == 0 {
                Err(Error::HarnessApi(format!("unit {n}")))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(collected.items.len(), 6);
        assert_eq!(collected.errors.len(), 4);
    }

    #[tokio::test]
    async fn test_fan_out_empty_input() {
        let collected: Collected<u32> =
            fan_out(&scope(), Vec::<u32>::new(), |_, n| async move { Ok(n) }).await;
        assert!(collected.items.is_empty());
        assert!(collected.errors.is_empty());
    }

    #[tokio::test]
    async fn test_slow_unit_does_not_block_siblings() {
        let started = Instant::now();
        let root = Scope::with_timeout(Duration::from_millis(200));
        let collected: Collected<u32> = fan_out(&root, 0..5u32, |_, n| async move {
            if n == 0 {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            Ok(n)
        })
        .await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(collected.items.len(), 4);
        assert_eq!(collected.errors.len(), 1);
        assert!(matches!(collected.errors[0], Error::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_panicking_unit_becomes_error() {
        let collected: Collected<u32> = fan_out(&scope(), 0..3u32, |_, n| async move {
            assert!(n != 1, "worker exploded");
            Ok(n)
        })
        .await;

        assert_eq!(collected.items.len(), 2);
        assert_eq!(collected.errors.len(), 1);
        assert!(matches!(collected.errors[0], Error::Task(_)));
    }

    #[tokio::test]
    async fn test_nested_fan_out_flattens() {
        let collected: Collected<Collected<u32>> =
            fan_out(&scope(), 0..3u32, |scope, outer| async move {
                let inner = fan_out(&scope, 0..4u32, move |_, n| async move {
                    if outer == 2 && n == 0 {
                        Err(Error::GitHubApi("inner".to_string()))
                    } else {
                        Ok(outer * 10 + n)
                    }
                })
                .await;
                Ok::<_, Error>(inner)
            })
            .await;

        let flat = collected.flatten();
        assert_eq!(flat.items.len(), 11);
        assert_eq!(flat.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_propagates_to_nested_units() {
        let root = scope();
        let finished = Arc::new(AtomicUsize::new(0));
        let canceller = root.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let counter = Arc::clone(&finished);
        let collected: Collected<Collected<u32>> = fan_out(&root, 0..2u32, move |scope, _| {
            let counter = Arc::clone(&counter);
            async move {
                let inner = fan_out(&scope, 0..3u32, move |_, n| {
                    let counter = Arc::clone(&counter);
                    async move {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, Error>(n)
                    }
                })
                .await;
                Ok::<_, Error>(inner)
            }
        })
        .await;

        // Outer units either report the cancellation once or pass through
        // their inner units' cancellations, depending on wakeup order.
        let flat = collected.flatten();
        assert!(flat.items.is_empty());
        assert!((2..=6).contains(&flat.errors.len()));
        assert!(flat.errors.iter().all(|e| matches!(e, Error::Cancelled)));
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_child_scope_cancelled_with_parent() {
        let parent = scope();
        let grandchild = parent.child().child();
        parent.cancel();

        let result = grandchild
            .run(std::future::pending::<Result<(), Error>>())
            .await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancelling_child_leaves_parent() {
        let parent = Scope::with_timeout(Duration::from_millis(50));
        let child = parent.child();
        child.cancel();

        // The parent still runs until its own deadline, which the child shares
        let result = parent.run(std::future::pending::<Result<(), Error>>()).await;
        assert!(matches!(result, Err(Error::DeadlineExceeded)));
        let result = child.run(std::future::pending::<Result<(), Error>>()).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn test_fold_errors_combines_into_one() {
        let collected = Collected {
            items: vec![1, 2],
            errors: vec![
                Error::HarnessApi("r1".to_string()),
                Error::HarnessApi("r2".to_string()),
            ],
        }
        .fold_errors();

        assert_eq!(collected.items, vec![1, 2]);
        assert_eq!(collected.errors.len(), 1);
        assert_eq!(
            collected.errors[0].to_string(),
            "errors encountered:\nHarness API error: r1\nHarness API error: r2"
        );
    }

    #[test]
    fn test_fold_errors_keeps_single_error() {
        let collected: Collected<u32> = Collected {
            items: Vec::new(),
            errors: vec![Error::DeadlineExceeded],
        }
        .fold_errors();
        assert!(matches!(collected.errors.as_slice(), [Error::DeadlineExceeded]));
    }
}
