//! Relay Stream
//!
//! A spawned task reads the backend body, decodes it and pushes text
//! fragments into a bounded channel. The task stops as soon as any of these
//! happens: the backend signals `done`, the body ends or fails, the
//! cancellation token fires, or the receiving side is dropped. Returning
//! from the task drops the backend body, which releases the connection.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::decoder::ChunkDecoder;
use crate::backend::ByteStream;
use crate::error::RelayError;

/// Item produced by a [`RelayStream`]
pub type RelayItem = Result<Bytes, RelayError>;

/// Plain text fragments relayed from the backend
///
/// Dropping the stream stops the relay task and closes the backend
/// connection.
pub struct RelayStream {
    receiver: mpsc::Receiver<RelayItem>,
}

impl RelayStream {
    /// Receive the next fragment
    pub async fn recv(&mut self) -> Option<RelayItem> {
        self.receiver.recv().await
    }
}

impl Stream for RelayStream {
    type Item = RelayItem;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl std::fmt::Debug for RelayStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayStream").finish_non_exhaustive()
    }
}

/// Start relaying `upstream`
///
/// `capacity` bounds how many fragments may wait for a slow reader before
/// backend reads pause.
#[must_use]
pub fn spawn_relay(upstream: ByteStream, cancel: CancellationToken, capacity: usize) -> RelayStream {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    tokio::spawn(relay_task(upstream, tx, cancel));
    RelayStream { receiver: rx }
}

async fn relay_task(
    mut upstream: ByteStream,
    tx: mpsc::Sender<RelayItem>,
    cancel: CancellationToken,
) {
    let mut decoder = ChunkDecoder::new();
    let mut relayed = 0usize;

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                info!(
                    relayed,
                    pending = decoder.pending_len(),
                    "Relay cancelled, closing backend connection"
                );
                return;
            }
            () = tx.closed() => {
                info!(
                    relayed,
                    pending = decoder.pending_len(),
                    "Receiver gone, closing backend connection"
                );
                return;
            }
            next = upstream.next() => next,
        };

        let (decoded, ended) = match next {
            Some(Ok(bytes)) => (decoder.feed(&bytes), false),
            Some(Err(e)) => {
                warn!(error = %e, relayed, "Backend stream failed");
                let _ = send(&tx, &cancel, Err(e)).await;
                return;
            }
            None => (decoder.finish(), true),
        };

        for chunk in decoded.chunks {
            relayed += chunk.len();
            if !send(&tx, &cancel, Ok(Bytes::from(chunk))).await {
                debug!(relayed, "Relay stopped while sending");
                return;
            }
        }

        if decoded.done {
            debug!(relayed, dropped = decoder.dropped_lines(), "Backend signalled done");
            return;
        }
        if ended {
            debug!(relayed, dropped = decoder.dropped_lines(), "Backend closed the stream");
            return;
        }
    }
}

async fn send(tx: &mpsc::Sender<RelayItem>, cancel: &CancellationToken, item: RelayItem) -> bool {
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        result = tx.send(item) => result.is_ok(),
    }
}
