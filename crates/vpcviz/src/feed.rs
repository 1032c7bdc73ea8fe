//! Live WebSocket feeds.
//!
//! Each upgraded connection is split: the write half becomes the
//! publisher's sink, the read half is drained by a small task that cancels
//! the connection's token when the viewer sends Close or the socket errors.

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use vpcviz_core::{DeliveryError, DeliveryOutcome, Publisher, SnapshotSink, Topology};

/// Write half of an upgraded socket.
pub struct WsSink {
    inner: SplitSink<WebSocket, Message>,
}

impl SnapshotSink for WsSink {
    async fn send(&mut self, payload: String) -> Result<(), DeliveryError> {
        self.inner
            .send(Message::Text(payload.into()))
            .await
            .map_err(|e| DeliveryError::Transport {
                reason: e.to_string(),
            })
    }
}

/// Drive one viewer until it disconnects or `shutdown` fires.
pub async fn run_feed<T: Topology>(
    socket: WebSocket,
    publisher: &Publisher,
    shutdown: &CancellationToken,
) -> DeliveryOutcome {
    let (tx, mut rx) = socket.split();
    let cancel = shutdown.child_token();

    let reader = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            while let Some(msg) = rx.next().await {
                match msg {
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
            cancel.cancel();
        })
    };

    let mut sink = WsSink { inner: tx };
    let outcome = publisher.deliver::<T, _>(&mut sink, &cancel).await;

    reader.abort();
    let _ = sink.inner.close().await;
    debug!(lineage = %T::LINEAGE, ?outcome, "live viewer released");
    outcome
}
