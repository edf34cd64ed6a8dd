// ── Reactive feed subscription ──
//
// Handle vended by `AlertStore::subscribe`: a snapshot captured at creation
// plus change notification, either awaited directly or consumed as a `Stream`.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::store::FeedState;

pub struct FeedStream {
    current: Arc<FeedState>,
    receiver: watch::Receiver<Arc<FeedState>>,
}

impl FeedStream {
    pub(crate) fn new(mut receiver: watch::Receiver<Arc<FeedState>>) -> Self {
        let current = Arc::clone(&receiver.borrow_and_update());
        Self { current, receiver }
    }

    /// Snapshot captured at creation or by the last `changed()`.
    pub fn current(&self) -> &Arc<FeedState> {
        &self.current
    }

    pub fn latest(&self) -> Arc<FeedState> {
        Arc::clone(&self.receiver.borrow())
    }

    pub fn has_changed(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }

    /// Wait for the next change. `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<Arc<FeedState>> {
        self.receiver.changed().await.ok()?;
        let snap = Arc::clone(&self.receiver.borrow_and_update());
        self.current = Arc::clone(&snap);
        Some(snap)
    }

    pub fn into_stream(self) -> FeedWatchStream {
        FeedWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` of feed snapshots, starting with the current one.
pub struct FeedWatchStream {
    inner: WatchStream<Arc<FeedState>>,
}

impl Stream for FeedWatchStream {
    type Item = Arc<FeedState>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
