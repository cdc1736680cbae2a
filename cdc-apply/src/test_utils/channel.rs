use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use crate::bail;
use crate::copy::channel::{CopyChannel, CopyChannelProvider};
use crate::error::{ApplyResult, ErrorKind};

/// One recorded operation on a [`MockCopyProvider`] or a channel it opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelOp {
    Open(String),
    Write(String),
    Flush,
    Complete,
    Abort,
}

#[derive(Debug, Default)]
struct Inner {
    ops: Vec<ChannelOp>,
    failures: Failures,
}

#[derive(Debug, Default, Clone, Copy)]
struct Failures {
    on_open: bool,
    on_write: bool,
    on_flush: bool,
    on_complete: bool,
    on_abort: bool,
}

/// In-memory [`CopyChannelProvider`] that records every operation and can be
/// told to fail at any point of the channel lifecycle.
///
/// All clones and all channels opened from the provider share one operation
/// log, so a test can assert the exact interleaving of opens, writes and
/// completions across the lifetime of a writer.
#[derive(Debug, Clone)]
pub struct MockCopyProvider {
    inner: Arc<Mutex<Inner>>,
}

impl MockCopyProvider {
    pub fn new() -> MockCopyProvider {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    pub fn fail_on_open(self) -> Self {
        self.inner.lock().unwrap().failures.on_open = true;
        self
    }

    pub fn fail_on_write(self) -> Self {
        self.inner.lock().unwrap().failures.on_write = true;
        self
    }

    pub fn fail_on_flush(self) -> Self {
        self.inner.lock().unwrap().failures.on_flush = true;
        self
    }

    pub fn fail_on_complete(self) -> Self {
        self.inner.lock().unwrap().failures.on_complete = true;
        self
    }

    pub fn fail_on_abort(self) -> Self {
        self.inner.lock().unwrap().failures.on_abort = true;
        self
    }

    /// Returns every operation recorded so far, in order.
    pub fn ops(&self) -> Vec<ChannelOp> {
        self.inner.lock().unwrap().ops.clone()
    }

    /// Returns the raw text of every row written so far, in order.
    pub fn rows(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .ops
            .iter()
            .filter_map(|op| match op {
                ChannelOp::Write(row) => Some(row.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, op: ChannelOp) -> Failures {
        let mut inner = self.inner.lock().unwrap();
        inner.ops.push(op);
        inner.failures
    }
}

impl Default for MockCopyProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CopyChannelProvider for MockCopyProvider {
    async fn open(&self, statement: &str) -> ApplyResult<Box<dyn CopyChannel>> {
        let failures = self.record(ChannelOp::Open(statement.to_string()));
        if failures.on_open {
            bail!(ErrorKind::ChannelOpenFailed, "Mock channel open failure");
        }

        Ok(Box::new(MockCopyChannel {
            provider: self.clone(),
            rows_written: 0,
        }))
    }
}

/// Channel half of [`MockCopyProvider`]; records into the provider's shared
/// log.
struct MockCopyChannel {
    provider: MockCopyProvider,
    rows_written: u64,
}

#[async_trait]
impl CopyChannel for MockCopyChannel {
    async fn write(&mut self, row: Bytes) -> ApplyResult<()> {
        let text = String::from_utf8_lossy(&row).into_owned();
        let failures = self.provider.record(ChannelOp::Write(text));
        if failures.on_write {
            bail!(ErrorKind::ChannelWriteFailed, "Mock channel write failure");
        }

        self.rows_written += 1;

        Ok(())
    }

    async fn flush(&mut self) -> ApplyResult<()> {
        let failures = self.provider.record(ChannelOp::Flush);
        if failures.on_flush {
            bail!(ErrorKind::ChannelFlushFailed, "Mock channel flush failure");
        }

        Ok(())
    }

    async fn complete(self: Box<Self>) -> ApplyResult<u64> {
        let failures = self.provider.record(ChannelOp::Complete);
        if failures.on_complete {
            bail!(
                ErrorKind::ChannelCompletionFailed,
                "Mock channel completion failure"
            );
        }

        Ok(self.rows_written)
    }

    async fn abort(self: Box<Self>) -> ApplyResult<()> {
        let failures = self.provider.record(ChannelOp::Abort);
        if failures.on_abort {
            bail!(ErrorKind::ChannelAbortFailed, "Mock channel abort failure");
        }

        Ok(())
    }
}
