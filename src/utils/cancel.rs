//! Cancellation utilities
//!
//! A first-class cancellation handle for in-flight generations. Cancelling
//! makes the chunk stream end at its next poll; the stream then drops the
//! HTTP response, which closes the connection to the provider.

use crate::stream::ChunkStream;
use tokio_util::sync::CancellationToken;

/// A handle that can be used to request cancellation.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once cancellation is requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// A handle that is cancelled together with this one but can also be
    /// cancelled on its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }
}

/// End `inner` at its next poll once `handle` is cancelled.
///
/// Cancellation ends the stream cleanly without yielding an error.
pub(crate) fn wrap_stream(mut inner: ChunkStream, handle: CancelHandle) -> ChunkStream {
    let s = async_stream::stream! {
        use futures::StreamExt;
        loop {
            tokio::select! {
                biased;
                _ = handle.cancelled() => {
                    tracing::info!("generation cancelled by caller");
                    break;
                }
                item = inner.next() => match item {
                    Some(item) => yield item,
                    None => break,
                },
            }
        }
    };
    Box::pin(s)
}
