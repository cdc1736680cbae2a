use std::future::Future;
use std::sync::Arc;

use crate::error::ApplyResult;
use crate::types::{Batch, ChangeEvent, TableSchema};

/// Trait for writers that apply an ordered stream of change events.
///
/// The enclosing batch-apply framework drives implementations through a
/// strict callback sequence: `start_batch`, then for each table scope
/// `start_table`, any number of `write` calls, `end_table`, and finally
/// `end_batch` with the error flag of the batch. A writer is bound to one
/// target transaction and is never driven by more than one logical worker,
/// so the methods take `&mut self`.
///
/// Writers must apply events in the exact order they are received; any
/// returned error terminates the current batch application and the framework
/// decides whether to retry the whole batch.
pub trait EventWriter {
    /// Returns the name of the writer.
    fn name() -> &'static str
    where
        Self: Sized;

    /// Marks the beginning of a batch of change events.
    fn start_batch(&mut self, batch: &Batch) -> impl Future<Output = ApplyResult<()>> + Send;

    /// Opens a table scope; all following events target this table.
    fn start_table(
        &mut self,
        table: Arc<TableSchema>,
    ) -> impl Future<Output = ApplyResult<()>> + Send;

    /// Applies one change event to the current table.
    fn write(&mut self, event: ChangeEvent) -> impl Future<Output = ApplyResult<()>> + Send;

    /// Closes the current table scope.
    fn end_table(&mut self) -> impl Future<Output = ApplyResult<()>> + Send;

    /// Marks the end of the batch.
    ///
    /// `in_error` is true when the framework is terminating the batch because
    /// of a failure; writers must discard uncommitted work in that case
    /// instead of completing it.
    fn end_batch(&mut self, in_error: bool) -> impl Future<Output = ApplyResult<()>> + Send;
}
