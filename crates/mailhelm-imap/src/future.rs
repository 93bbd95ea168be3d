//! Single-shot completion primitive.
//!
//! Each submitted command is paired with a [`Completion`]/[`CommandFuture`]
//! pair. The session driver holds the [`Completion`] and delivers exactly
//! one result; the caller awaits the [`CommandFuture`].

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::{Error, Result};

/// Producer half of a single-shot completion.
///
/// The first [`done`](Self::done) wins; later calls are no-ops. Delivery is
/// thread-safe (the underlying channel hands the value off atomically).
#[derive(Debug)]
pub struct Completion<T> {
    tx: Option<oneshot::Sender<Result<T>>>,
}

impl<T> Completion<T> {
    /// Creates a linked completion/future pair.
    #[must_use]
    pub fn channel() -> (Self, CommandFuture<T>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Some(tx) }, CommandFuture { rx })
    }

    /// Delivers the result.
    ///
    /// Returns `true` if this call delivered the value, `false` if the
    /// completion had already fired (the call is then a no-op).
    pub fn done(&mut self, result: Result<T>) -> bool {
        match self.tx.take() {
            // The receiver may have been dropped (advisory cancel); either
            // way this completion is now spent.
            Some(tx) => {
                let _ = tx.send(result);
                true
            }
            None => false,
        }
    }

    /// Returns `true` once a result has been delivered.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        self.tx.is_none()
    }
}

/// Caller half of a single-shot completion.
///
/// Dropping the future is an advisory cancel: the in-flight command still
/// runs to completion on the wire and its cleanup still executes; only the
/// result is discarded.
#[derive(Debug)]
pub struct CommandFuture<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> Future for CommandFuture<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| match received {
            Ok(result) => result,
            Err(_) => Err(Error::Cancelled),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_once() {
        let (mut completion, future) = Completion::channel();
        assert!(!completion.is_done());
        assert!(completion.done(Ok(1)));
        assert!(completion.is_done());
        assert!(!completion.done(Ok(2)));
        assert_eq!(future.await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delivers_error() {
        let (mut completion, future) = Completion::<u32>::channel();
        completion.done(Err(Error::Cancelled));
        assert!(matches!(future.await, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn dropped_completion_cancels() {
        let (completion, future) = Completion::<u32>::channel();
        drop(completion);
        assert!(matches!(future.await, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn dropped_future_is_advisory() {
        let (mut completion, future) = Completion::channel();
        drop(future);
        // Delivery to a cancelled caller is still a (spent) first delivery.
        assert!(completion.done(Ok(1)));
        assert!(!completion.done(Ok(2)));
    }
}
