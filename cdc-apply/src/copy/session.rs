use std::mem;

use bytes::Bytes;
use tracing::{debug, info};

use crate::bail;
use crate::copy::channel::{CopyChannel, CopyChannelProvider};
use crate::error::{ApplyResult, ErrorKind};
use crate::types::{DialectInfo, TableSchema};

/// State of a [`CopySession`].
///
/// The tagged variant structurally enforces that a session never holds two
/// concurrently open channel handles.
enum SessionState {
    Closed,
    Streaming {
        channel: Box<dyn CopyChannel>,
        rows_since_flush: usize,
    },
}

/// A stateful bulk-load session bound to one target table and one underlying
/// transaction.
///
/// The session owns the streaming channel handle, counts rows since the last
/// flush and forces a flush once the configured threshold is reached. It
/// starts and ends [`SessionState::Closed`]; opening transitions it to
/// [`SessionState::Streaming`] and `end`/`cancel` bring it back. A session
/// back in `Closed` holds no channel, so re-opening always issues a fresh
/// channel-open request.
pub struct CopySession {
    dialect: DialectInfo,
    max_rows_before_flush: usize,
    state: SessionState,
}

impl CopySession {
    pub fn new(dialect: DialectInfo, max_rows_before_flush: usize) -> CopySession {
        Self {
            dialect,
            max_rows_before_flush,
            state: SessionState::Closed,
        }
    }

    /// Returns whether a streaming channel is currently open.
    pub fn is_streaming(&self) -> bool {
        matches!(self.state, SessionState::Streaming { .. })
    }

    /// Returns the number of rows written since the last flush.
    pub fn rows_since_flush(&self) -> usize {
        match self.state {
            SessionState::Closed => 0,
            SessionState::Streaming {
                rows_since_flush, ..
            } => rows_since_flush,
        }
    }

    /// Opens a streaming channel for the given table.
    ///
    /// No-op when a channel is already open; the enclosing writer guarantees
    /// an open channel always belongs to the current table scope.
    pub async fn open(
        &mut self,
        provider: &dyn CopyChannelProvider,
        table: &TableSchema,
    ) -> ApplyResult<()> {
        if self.is_streaming() {
            return Ok(());
        }

        let statement = self.copy_statement(table);
        debug!(statement, "starting bulk copy");

        let channel = provider.open(&statement).await?;
        self.state = SessionState::Streaming {
            channel,
            rows_since_flush: 0,
        };

        Ok(())
    }

    /// Appends one encoded row to the open channel.
    ///
    /// Once the row counter reaches the configured threshold the channel is
    /// flushed automatically and the counter resets to zero.
    pub async fn write(&mut self, row: Bytes) -> ApplyResult<()> {
        let SessionState::Streaming {
            channel,
            rows_since_flush,
        } = &mut self.state
        else {
            bail!(
                ErrorKind::InvalidState,
                "Cannot write a row to a closed bulk session"
            );
        };

        channel.write(row).await?;
        *rows_since_flush += 1;

        if *rows_since_flush >= self.max_rows_before_flush {
            channel.flush().await?;
            *rows_since_flush = 0;
        }

        Ok(())
    }

    /// Forces buffered rows out to the channel without closing it.
    ///
    /// No-op when no channel is open.
    pub async fn flush(&mut self) -> ApplyResult<()> {
        if let SessionState::Streaming {
            channel,
            rows_since_flush,
        } = &mut self.state
        {
            channel.flush().await?;
            *rows_since_flush = 0;
        }

        Ok(())
    }

    /// Flushes outstanding rows and completes the channel normally.
    ///
    /// The channel handle is released unconditionally: whatever the outcome,
    /// the session is `Closed` afterwards. No-op when no channel is open.
    pub async fn end(&mut self) -> ApplyResult<()> {
        let state = mem::replace(&mut self.state, SessionState::Closed);
        let SessionState::Streaming {
            mut channel,
            rows_since_flush: _,
        } = state
        else {
            return Ok(());
        };

        channel.flush().await?;
        let rows_loaded = channel.complete().await?;

        info!(rows_loaded, "completed bulk copy");

        Ok(())
    }

    /// Aborts the in-flight channel, discarding everything streamed since it
    /// opened.
    ///
    /// Abort failures are swallowed so they never mask the batch error that
    /// triggered the cancellation; they surface only as a diagnostic log.
    /// No-op when no channel is open. The session is always `Closed`
    /// afterwards.
    pub async fn cancel(&mut self) {
        let state = mem::replace(&mut self.state, SessionState::Closed);
        if let SessionState::Streaming { channel, .. } = state {
            if let Err(err) = channel.abort().await {
                debug!(error = %err, "ignoring error while aborting bulk copy");
            }
        }
    }

    /// Builds the copy statement for the given table from the dialect's
    /// quoting rules.
    fn copy_statement(&self, table: &TableSchema) -> String {
        let columns = table
            .column_schemas
            .iter()
            .map(|cs| self.dialect.quote_identifier(&cs.name))
            .collect::<Vec<_>>()
            .join(",");

        format!(
            "COPY {}({}) FROM STDIN WITH DELIMITER ',' CSV QUOTE ''''",
            self.dialect.qualified_table_name(&table.name),
            columns
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::channel::{ChannelOp, MockCopyProvider};
    use crate::types::{ColumnSchema, TableName};
    use tokio_postgres::types::Type;

    fn orders_table() -> TableSchema {
        TableSchema::new(
            TableName::new("public".to_string(), "orders".to_string()),
            vec![
                ColumnSchema::new("id".to_string(), Type::INT8, 1, Some(1), false),
                ColumnSchema::new("note".to_string(), Type::TEXT, 2, None, true),
            ],
        )
    }

    fn session(max_rows_before_flush: usize) -> CopySession {
        CopySession::new(DialectInfo::postgres(), max_rows_before_flush)
    }

    #[tokio::test]
    async fn open_builds_copy_statement_from_dialect() {
        let provider = MockCopyProvider::new();
        let mut session = session(10);

        session.open(&provider, &orders_table()).await.unwrap();

        assert!(session.is_streaming());
        assert_eq!(
            provider.ops(),
            vec![ChannelOp::Open(
                "COPY \"public\".\"orders\"(\"id\",\"note\") FROM STDIN \
                 WITH DELIMITER ',' CSV QUOTE ''''"
                    .to_string()
            )]
        );
    }

    #[tokio::test]
    async fn open_is_noop_when_already_streaming() {
        let provider = MockCopyProvider::new();
        let mut session = session(10);

        session.open(&provider, &orders_table()).await.unwrap();
        session.open(&provider, &orders_table()).await.unwrap();

        assert_eq!(provider.ops().len(), 1);
    }

    #[tokio::test]
    async fn open_failure_is_fatal() {
        let provider = MockCopyProvider::new().fail_on_open();
        let mut session = session(10);

        let err = session.open(&provider, &orders_table()).await.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ChannelOpenFailed));
        assert!(!session.is_streaming());
    }

    #[tokio::test]
    async fn write_requires_open_session() {
        let mut session = session(10);

        let err = session.write(Bytes::from_static(b"1,a\n")).await.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidState));
    }

    #[tokio::test]
    async fn write_auto_flushes_at_threshold() {
        let provider = MockCopyProvider::new();
        let mut session = session(2);

        session.open(&provider, &orders_table()).await.unwrap();
        session.write(Bytes::from_static(b"1,a\n")).await.unwrap();
        assert_eq!(session.rows_since_flush(), 1);

        session.write(Bytes::from_static(b"2,b\n")).await.unwrap();
        assert_eq!(session.rows_since_flush(), 0);

        let ops = provider.ops();
        assert_eq!(
            &ops[1..],
            &[
                ChannelOp::Write("1,a\n".to_string()),
                ChannelOp::Write("2,b\n".to_string()),
                ChannelOp::Flush,
            ]
        );
    }

    #[tokio::test]
    async fn flush_is_noop_when_closed() {
        let mut session = session(10);
        session.flush().await.unwrap();
    }

    #[tokio::test]
    async fn end_is_noop_when_closed() {
        let mut session = session(10);
        session.end().await.unwrap();
    }

    #[tokio::test]
    async fn end_flushes_then_completes() {
        let provider = MockCopyProvider::new();
        let mut session = session(10);

        session.open(&provider, &orders_table()).await.unwrap();
        session.write(Bytes::from_static(b"1,a\n")).await.unwrap();
        session.end().await.unwrap();

        assert!(!session.is_streaming());
        let ops = provider.ops();
        assert_eq!(&ops[2..], &[ChannelOp::Flush, ChannelOp::Complete]);
    }

    #[tokio::test]
    async fn end_releases_channel_even_when_completion_fails() {
        let provider = MockCopyProvider::new().fail_on_complete();
        let mut session = session(10);

        session.open(&provider, &orders_table()).await.unwrap();
        let err = session.end().await.unwrap_err();

        assert!(matches!(err.kind(), ErrorKind::ChannelCompletionFailed));
        assert!(!session.is_streaming());
        // The handle was released, so a following end is a plain no-op.
        session.end().await.unwrap();
    }

    #[tokio::test]
    async fn end_propagates_flush_failure() {
        let provider = MockCopyProvider::new().fail_on_flush();
        let mut session = session(10);

        session.open(&provider, &orders_table()).await.unwrap();
        let err = session.end().await.unwrap_err();

        assert!(matches!(err.kind(), ErrorKind::ChannelFlushFailed));
        assert!(!session.is_streaming());
    }

    #[tokio::test]
    async fn cancel_swallows_abort_errors() {
        let provider = MockCopyProvider::new().fail_on_abort();
        let mut session = session(10);

        session.open(&provider, &orders_table()).await.unwrap();
        session.cancel().await;

        assert!(!session.is_streaming());
        assert_eq!(provider.ops().last(), Some(&ChannelOp::Abort));
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let mut session = session(10);
        session.cancel().await;
        session.cancel().await;
        assert!(!session.is_streaming());
    }

    #[tokio::test]
    async fn reopening_after_end_issues_a_fresh_channel() {
        let provider = MockCopyProvider::new();
        let mut session = session(10);

        session.open(&provider, &orders_table()).await.unwrap();
        session.end().await.unwrap();
        session.open(&provider, &orders_table()).await.unwrap();

        let opens = provider
            .ops()
            .iter()
            .filter(|op| matches!(op, ChannelOp::Open(_)))
            .count();
        assert_eq!(opens, 2);
    }
}
