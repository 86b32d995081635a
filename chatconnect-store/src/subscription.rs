use std::{
    pin::Pin,
    task::{Context, Poll},
};

use futures_util::Stream;
use tokio::sync::mpsc;

use crate::Document;

/// Every document currently matching a subscribed query.
pub type Snapshot = Vec<Document>;

pub type SnapshotSender = mpsc::UnboundedSender<Snapshot>;
type SnapshotReceiver = mpsc::UnboundedReceiver<Snapshot>;

/// A live feed of snapshots from a standing query.
///
/// Dropping the subscription tears the listener down.
pub struct Subscription {
    receiver: SnapshotReceiver,
    teardown: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(receiver: SnapshotReceiver, teardown: impl FnOnce() + Send + 'static) -> Self {
        Self {
            receiver,
            teardown: Some(Box::new(teardown)),
        }
    }

    /// Waits for the next snapshot, returning [None] once the store is gone.
    pub async fn next(&mut self) -> Option<Snapshot> {
        self.receiver.recv().await
    }
}

impl Stream for Subscription {
    type Item = Snapshot;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown()
        }
    }
}
