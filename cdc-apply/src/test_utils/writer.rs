use std::sync::{Arc, Mutex};

use crate::bail;
use crate::error::{ApplyResult, ErrorKind};
use crate::types::{Batch, ChangeEvent, TableSchema};
use crate::writer::base::EventWriter;

#[derive(Debug, Default)]
struct Inner {
    events: Vec<ChangeEvent>,
    tables: Vec<Arc<TableSchema>>,
    fail_on_end_table: bool,
}

/// In-memory [`EventWriter`] that records every event it is asked to apply.
///
/// Clones share state, so a test can hand one clone to a writer under test
/// and inspect the other.
#[derive(Debug, Clone)]
pub struct MemoryWriter {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryWriter {
    pub fn new() -> MemoryWriter {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Makes every following `end_table` call fail.
    pub fn fail_on_end_table(self) -> Self {
        self.inner.lock().unwrap().fail_on_end_table = true;
        self
    }

    /// Returns every event recorded so far, in order.
    pub fn events(&self) -> Vec<ChangeEvent> {
        self.inner.lock().unwrap().events.clone()
    }

    /// Returns every table scope entered so far, in order.
    pub fn tables(&self) -> Vec<Arc<TableSchema>> {
        self.inner.lock().unwrap().tables.clone()
    }
}

impl Default for MemoryWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl EventWriter for MemoryWriter {
    fn name() -> &'static str {
        "memory"
    }

    async fn start_batch(&mut self, _batch: &Batch) -> ApplyResult<()> {
        Ok(())
    }

    async fn start_table(&mut self, table: Arc<TableSchema>) -> ApplyResult<()> {
        self.inner.lock().unwrap().tables.push(table);

        Ok(())
    }

    async fn write(&mut self, event: ChangeEvent) -> ApplyResult<()> {
        self.inner.lock().unwrap().events.push(event);

        Ok(())
    }

    async fn end_table(&mut self) -> ApplyResult<()> {
        if self.inner.lock().unwrap().fail_on_end_table {
            bail!(ErrorKind::InvalidState, "Memory writer end_table failure");
        }

        Ok(())
    }

    async fn end_batch(&mut self, _in_error: bool) -> ApplyResult<()> {
        Ok(())
    }
}
