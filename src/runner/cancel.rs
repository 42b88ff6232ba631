//! Invocation-scoped cancellation.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

/// One invocation's cancellation flag, shared with the nested calls it starts.
pub(crate) struct CancelSignal {
    tx: watch::Sender<bool>,
}

impl CancelSignal {
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub(crate) fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Completes once the flag is set.
    pub(crate) fn cancelled(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.tx.subscribe();
        async move {
            let seen = rx.wait_for(|cancelled| *cancelled).await.is_ok();
            if !seen {
                futures::future::pending::<()>().await;
            }
        }
    }
}

/// Cancels one invocation of a runner and every nested call it made.
///
/// Cancelling is idempotent and does not affect other invocations of the
/// same runner.
#[derive(Clone)]
pub struct CancelHandle {
    signal: Arc<CancelSignal>,
}

impl CancelHandle {
    pub(crate) fn new(signal: Arc<CancelSignal>) -> Self {
        Self { signal }
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.signal.cancel();
    }

    /// Returns true once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.signal.is_cancelled()
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
