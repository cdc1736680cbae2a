use std::time::Duration;

/// Text encoding used for binary column values inside a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryEncoding {
    /// Binary values travel as-is; no re-encoding happens.
    None,
    /// Binary values travel as hexadecimal text.
    Hex,
    /// Binary values travel as base64 text.
    Base64,
}

/// Immutable descriptor of a batch of change events.
///
/// The mutable per-batch counters live in [`BatchStatistics`], owned by the
/// writer applying the batch, so a retried batch starts from clean counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Identifier assigned by the capture layer.
    pub id: u64,
    /// Encoding of binary column values within this batch.
    pub binary_encoding: BinaryEncoding,
}

impl Batch {
    pub fn new(id: u64, binary_encoding: BinaryEncoding) -> Batch {
        Self {
            id,
            binary_encoding,
        }
    }
}

/// Named counters accumulated while applying one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchStatistics {
    /// Rows applied through either path since the batch started.
    pub rows_written: u64,
    /// Line number of the last processed event within the batch.
    pub line_number: u64,
    /// Time spent applying events.
    pub load_time: Duration,
}

impl BatchStatistics {
    /// Records one applied event.
    pub fn record_event(&mut self, elapsed: Duration) {
        self.rows_written += 1;
        self.line_number += 1;
        self.load_time += elapsed;
    }

    /// Resets the row-count and line-number counters to zero.
    ///
    /// Called when a streaming flush fails or the batch ends in error, so a
    /// caller retrying the batch does not double-count rows already
    /// attempted. The load-time counter is left untouched since time was
    /// genuinely spent.
    pub fn reset_row_counters(&mut self) {
        self.rows_written = 0;
        self.line_number = 0;
    }
}
