use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::debug;

use crate::bail;
use crate::config::ApplyConfig;
use crate::copy::channel::CopyChannelProvider;
use crate::copy::encoding::encode_row;
use crate::copy::session::CopySession;
use crate::error::{ApplyResult, ErrorKind};
use crate::metrics::{
    APPLY_COPY_ROWS_TOTAL, APPLY_EVENT_DURATION_SECONDS, APPLY_FALLBACK_ROWS_TOTAL,
    APPLY_SESSIONS_CANCELLED_TOTAL, WRITER_LABEL, register_metrics,
};
use crate::types::{Batch, BatchStatistics, ChangeEvent, DialectInfo, TableSchema};
use crate::writer::base::EventWriter;

/// Event writer that streams inserts through a bulk-load channel and routes
/// everything else to a row-by-row fallback writer.
///
/// One writer instance is bound to one target transaction. It owns a
/// [`CopySession`] that is opened lazily on the first insert of a table
/// scope and closed on the table boundary, on a switch to a non-insert
/// operation, or on batch end. Ending (not cancelling) on an operation-kind
/// switch commits the already-streamed inserts before the fallback write
/// proceeds, which keeps the global event order intact; only a batch ending
/// in error discards in-flight rows via cancel.
pub struct BulkApplyWriter<W> {
    fallback: W,
    provider: Arc<dyn CopyChannelProvider>,
    supports_bulk_copy: bool,
    session: CopySession,
    batch: Option<Batch>,
    table: Option<Arc<TableSchema>>,
    statistics: BatchStatistics,
}

impl<W> BulkApplyWriter<W>
where
    W: EventWriter + Send,
{
    /// Creates a bulk-apply writer over the given channel provider, dialect
    /// and fallback writer.
    ///
    /// The provider borrows the target transaction's connection; this writer
    /// never closes the connection itself.
    pub fn new(
        provider: Arc<dyn CopyChannelProvider>,
        dialect: DialectInfo,
        config: &ApplyConfig,
        fallback: W,
    ) -> BulkApplyWriter<W> {
        register_metrics();

        let supports_bulk_copy = dialect.supports_bulk_copy;
        let session = CopySession::new(dialect, config.max_rows_before_flush);

        Self {
            fallback,
            provider,
            supports_bulk_copy,
            session,
            batch: None,
            table: None,
            statistics: BatchStatistics::default(),
        }
    }

    /// Returns the fallback writer.
    pub fn fallback(&self) -> &W {
        &self.fallback
    }

    /// Returns the statistics accumulated for the current batch.
    pub fn statistics(&self) -> &BatchStatistics {
        &self.statistics
    }

    /// Returns whether a streaming channel is currently open.
    pub fn is_streaming(&self) -> bool {
        self.session.is_streaming()
    }

    /// Ends the streaming session, resetting the batch row counters when the
    /// session cannot be completed.
    ///
    /// Counters are zeroed on failure so a caller retrying the batch does
    /// not double-count rows already attempted.
    async fn close_session(&mut self) -> ApplyResult<()> {
        if let Err(err) = self.session.end().await {
            self.statistics.reset_row_counters();
            return Err(err);
        }

        Ok(())
    }

    async fn write_streaming(
        &mut self,
        event: &ChangeEvent,
        table: &TableSchema,
        batch: &Batch,
    ) -> ApplyResult<()> {
        self.session.open(self.provider.as_ref(), table).await?;

        let row = encode_row(&event.row_data, &table.column_schemas, batch.binary_encoding)?;
        self.session.write(row).await?;

        counter!(APPLY_COPY_ROWS_TOTAL, WRITER_LABEL => W::name()).increment(1);

        Ok(())
    }

    async fn write_fallback(&mut self, event: ChangeEvent) -> ApplyResult<()> {
        // Commit already-streamed inserts before the fallback write so the
        // target observes events in capture order.
        self.close_session().await?;

        self.fallback.write(event).await?;

        counter!(APPLY_FALLBACK_ROWS_TOTAL, WRITER_LABEL => W::name()).increment(1);

        Ok(())
    }
}

impl<W> EventWriter for BulkApplyWriter<W>
where
    W: EventWriter + Send,
{
    fn name() -> &'static str {
        "bulk_apply"
    }

    async fn start_batch(&mut self, batch: &Batch) -> ApplyResult<()> {
        self.batch = Some(batch.clone());
        self.statistics = BatchStatistics::default();

        self.fallback.start_batch(batch).await
    }

    async fn start_table(&mut self, table: Arc<TableSchema>) -> ApplyResult<()> {
        // A channel left open by an unpaired table scope must not leak rows
        // into the new table.
        self.close_session().await?;

        self.table = Some(Arc::clone(&table));

        self.fallback.start_table(table).await
    }

    async fn write(&mut self, event: ChangeEvent) -> ApplyResult<()> {
        let started = Instant::now();

        let Some(table) = self.table.clone() else {
            bail!(
                ErrorKind::InvalidState,
                "Cannot apply a change event outside of a table scope"
            );
        };
        let Some(batch) = self.batch.clone() else {
            bail!(
                ErrorKind::InvalidState,
                "Cannot apply a change event outside of a batch"
            );
        };

        if event.kind.is_streamable() && self.supports_bulk_copy {
            self.write_streaming(&event, &table, &batch).await?;
        } else {
            self.write_fallback(event).await?;
        }

        let elapsed = started.elapsed();
        self.statistics.record_event(elapsed);
        histogram!(APPLY_EVENT_DURATION_SECONDS, WRITER_LABEL => W::name())
            .record(elapsed.as_secs_f64());

        Ok(())
    }

    async fn end_table(&mut self) -> ApplyResult<()> {
        // The session must end even if the delegated teardown fails, and the
        // teardown must run even if ending the session fails; the first
        // error wins.
        let ended = self.close_session().await;
        let teardown = self.fallback.end_table().await;

        self.table = None;

        ended.and(teardown)
    }

    async fn end_batch(&mut self, in_error: bool) -> ApplyResult<()> {
        if in_error && self.session.is_streaming() {
            debug!(batch = ?self.batch.as_ref().map(|b| b.id), "cancelling bulk copy for failed batch");

            self.session.cancel().await;
            self.statistics.reset_row_counters();

            counter!(APPLY_SESSIONS_CANCELLED_TOTAL, WRITER_LABEL => W::name()).increment(1);
        }

        let result = self.fallback.end_batch(in_error).await;

        self.batch = None;
        self.table = None;

        result
    }
}
