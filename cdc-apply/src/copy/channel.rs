use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::SinkExt;
use tokio_postgres::{Client, CopyInSink};

use crate::apply_error;
use crate::error::{ApplyResult, ErrorKind};

/// One open streaming bulk-load channel.
///
/// A channel is an append log: rows written to it are applied to the target
/// in order once the channel completes. `complete` and `abort` consume the
/// channel, so the type system guarantees no further writes after either.
#[async_trait]
pub trait CopyChannel: Send {
    /// Appends one encoded row to the channel.
    async fn write(&mut self, row: Bytes) -> ApplyResult<()>;

    /// Pushes rows buffered on the client side to the server without closing
    /// the channel.
    async fn flush(&mut self) -> ApplyResult<()>;

    /// Signals end-of-data and completes the load, returning the number of
    /// rows the server reports as loaded.
    async fn complete(self: Box<Self>) -> ApplyResult<u64>;

    /// Aborts the load, discarding all in-flight rows.
    async fn abort(self: Box<Self>) -> ApplyResult<()>;
}

/// Opens [`CopyChannel`]s against a target connection.
///
/// The underlying connection is owned by the enclosing framework and merely
/// borrowed here for the scope of each open channel.
#[async_trait]
pub trait CopyChannelProvider: Send + Sync {
    /// Opens a channel by issuing the given copy statement.
    async fn open(&self, statement: &str) -> ApplyResult<Box<dyn CopyChannel>>;
}

/// Production [`CopyChannel`] over a Postgres `COPY ... FROM STDIN` sink.
pub struct PgCopyChannel {
    sink: Pin<Box<CopyInSink<Bytes>>>,
}

#[async_trait]
impl CopyChannel for PgCopyChannel {
    async fn write(&mut self, row: Bytes) -> ApplyResult<()> {
        self.sink.send(row).await.map_err(|err| {
            apply_error!(
                ErrorKind::ChannelWriteFailed,
                "Failed to write a row to the copy channel",
                source: err
            )
        })
    }

    async fn flush(&mut self) -> ApplyResult<()> {
        self.sink.flush().await.map_err(|err| {
            apply_error!(
                ErrorKind::ChannelFlushFailed,
                "Failed to flush the copy channel",
                source: err
            )
        })
    }

    async fn complete(mut self: Box<Self>) -> ApplyResult<u64> {
        self.sink.as_mut().finish().await.map_err(|err| {
            apply_error!(
                ErrorKind::ChannelCompletionFailed,
                "Failed to complete the copy channel",
                source: err
            )
        })
    }

    async fn abort(self: Box<Self>) -> ApplyResult<()> {
        // Dropping the sink without finishing it makes the driver fail the
        // COPY on the server, which discards everything in flight.
        drop(self);

        Ok(())
    }
}

/// [`CopyChannelProvider`] over a borrowed Postgres connection.
#[derive(Clone)]
pub struct PgCopyChannelProvider {
    client: Arc<Client>,
}

impl PgCopyChannelProvider {
    pub fn new(client: Arc<Client>) -> PgCopyChannelProvider {
        Self { client }
    }
}

#[async_trait]
impl CopyChannelProvider for PgCopyChannelProvider {
    async fn open(&self, statement: &str) -> ApplyResult<Box<dyn CopyChannel>> {
        let sink: CopyInSink<Bytes> = self.client.copy_in(statement).await.map_err(|err| {
            apply_error!(
                ErrorKind::ChannelOpenFailed,
                "Failed to open a copy channel",
                source: err
            )
        })?;

        Ok(Box::new(PgCopyChannel {
            sink: Box::pin(sink),
        }))
    }
}
