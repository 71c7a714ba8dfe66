//! Raw result shapes handed back by a driver.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_core::Stream;

use crate::error::DriverError;
use crate::row::Row;

/// A large-object value delivered as a stream of byte chunks.
///
/// Chunk boundaries carry no meaning; consumers accumulate until the stream
/// ends. A mid-stream error aborts the whole value.
pub type LobStream = Pin<Box<dyn Stream<Item = Result<Bytes, DriverError>> + Send>>;

/// Everything a single statement execution can produce.
pub enum RawOutput {
    /// The statement completed without producing output binds.
    None,
    /// One stream per LOB output bind, in bind order.
    Lobs(Vec<LobStream>),
    /// One server-side cursor per cursor bind or implicit result set.
    Cursors(Vec<Box<dyn Cursor>>),
}

impl std::fmt::Debug for RawOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawOutput::None => f.write_str("RawOutput::None"),
            RawOutput::Lobs(streams) => write!(f, "RawOutput::Lobs(n={})", streams.len()),
            RawOutput::Cursors(cursors) => write!(f, "RawOutput::Cursors(n={})", cursors.len()),
        }
    }
}

/// Incremental row fetch over a server-side result set.
#[async_trait]
pub trait Cursor: Send {
    /// Fetch up to `count` rows. A batch shorter than `count` means the
    /// cursor is exhausted.
    async fn fetch(&mut self, count: usize) -> Result<Vec<Row>, DriverError>;

    /// Release the server-side handle. Must be called on every cursor,
    /// on success and failure paths alike.
    async fn close(&mut self) -> Result<(), DriverError>;
}
