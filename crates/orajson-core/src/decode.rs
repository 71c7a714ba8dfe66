//! Result decoding: LOB accumulation, cursor pagination, error envelope.

use std::collections::BTreeMap;

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use serde_json::Value;

use orajson_driver::{Cursor, LobStream, RawOutput, Row};

use crate::error::Error;
use crate::request::OutputSpec;

/// The decoded result of one call.
#[derive(Debug)]
pub enum DecodedResult {
    /// No output was expected and none is carried.
    NoneExpected,
    /// Parsed JSON from the accumulated CLOB text.
    Json(Value),
    /// Accumulated BLOB bytes, verbatim.
    Blob(Bytes),
    /// Rows per cursor position, in fetch order.
    Rows(BTreeMap<usize, Vec<Row>>),
}

/// Decode a driver's raw output against the expected shape.
///
/// Cursors handed back by the driver are always closed before this returns,
/// on success and failure paths alike.
pub async fn decode_output(expected: OutputSpec, raw: RawOutput) -> Result<DecodedResult, Error> {
    match expected {
        OutputSpec::None => {
            // Whatever the driver produced, the caller gets the canonical
            // marker; stray cursors still need their handles released.
            if let RawOutput::Cursors(mut cursors) = raw {
                close_all(&mut cursors).await;
            }
            Ok(DecodedResult::NoneExpected)
        }
        OutputSpec::Json => {
            let text = accumulate_text(expect_lobs(raw)?).await?;
            let value: Value = serde_json::from_str(&text)
                .map_err(|e| Error::Decode(format!("payload is not valid JSON: {e}")))?;
            if status_is_error(&value) {
                return Err(Error::AppStatus { payload: value });
            }
            Ok(DecodedResult::Json(value))
        }
        OutputSpec::Blob => {
            let bytes = accumulate_bytes(expect_lobs(raw)?).await?;
            Ok(DecodedResult::Blob(bytes))
        }
        OutputSpec::Cursor { batch_size } => match raw {
            RawOutput::Cursors(cursors) if !cursors.is_empty() => {
                paginate_cursors(cursors, batch_size.max(1)).await
            }
            RawOutput::None | RawOutput::Cursors(_) => Err(Error::MissingOutput),
            RawOutput::Lobs(_) => Err(Error::Decode("expected cursors, got LOB output".into())),
        },
    }
}

fn expect_lobs(raw: RawOutput) -> Result<Vec<LobStream>, Error> {
    match raw {
        RawOutput::Lobs(streams) if !streams.is_empty() => Ok(streams),
        RawOutput::None | RawOutput::Lobs(_) => Err(Error::MissingOutput),
        RawOutput::Cursors(_) => Err(Error::Decode("expected LOB output, got cursors".into())),
    }
}

/// Accumulate every stream, in bind order, into one byte buffer.
async fn accumulate_bytes(streams: Vec<LobStream>) -> Result<Bytes, Error> {
    let mut buffer = BytesMut::new();
    for mut stream in streams {
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::Decode(format!("lob stream failed: {e}")))?;
            buffer.extend_from_slice(&chunk);
        }
    }
    Ok(buffer.freeze())
}

async fn accumulate_text(streams: Vec<LobStream>) -> Result<String, Error> {
    let bytes = accumulate_bytes(streams).await?;
    String::from_utf8(bytes.into())
        .map_err(|e| Error::Decode(format!("payload is not valid UTF-8: {e}")))
}

/// Fetch every cursor to exhaustion in fixed-size batches.
///
/// Row order within a cursor is exactly the database's emission order;
/// fetching stops at the first batch shorter than `batch_size`. Any failure
/// fails the whole call immediately, after closing every remaining handle.
async fn paginate_cursors(
    cursors: Vec<Box<dyn Cursor>>,
    batch_size: usize,
) -> Result<DecodedResult, Error> {
    let mut cursors = cursors;
    let mut results = BTreeMap::new();

    for position in 0..cursors.len() {
        match drain_cursor(&mut *cursors[position], batch_size).await {
            Ok(rows) => {
                if let Some(err) = single_row_error(&rows) {
                    close_all(&mut cursors).await;
                    return Err(err);
                }
                results.insert(position, rows);
            }
            Err(e) => {
                close_all(&mut cursors).await;
                return Err(Error::Execution(e));
            }
        }
    }

    close_all(&mut cursors).await;
    Ok(DecodedResult::Rows(results))
}

async fn drain_cursor(
    cursor: &mut dyn Cursor,
    batch_size: usize,
) -> Result<Vec<Row>, orajson_driver::DriverError> {
    let mut rows = Vec::new();
    loop {
        let batch = cursor.fetch(batch_size).await?;
        let short = batch.len() < batch_size;
        rows.extend(batch);
        if short {
            return Ok(rows);
        }
    }
}

/// A single-row result carrying the conventional error status fails the call
/// the same way a CLOB payload would.
fn single_row_error(rows: &[Row]) -> Option<Error> {
    let [row] = rows else { return None };
    let status = row.get_raw_by_name("status")?;
    if value_is_error(status) {
        return Some(Error::AppStatus {
            payload: row.to_json(),
        });
    }
    None
}

async fn close_all(cursors: &mut [Box<dyn Cursor>]) {
    for cursor in cursors {
        if let Err(e) = cursor.close().await {
            // A close failure must not mask the call's own outcome.
            tracing::warn!(error = %e, "cursor close failed");
        }
    }
}

/// Whether a decoded payload carries the conventional application-level
/// failure marker: a top-level `status` field case-insensitively equal to
/// `"ERROR"`.
#[must_use]
pub fn status_is_error(payload: &Value) -> bool {
    payload.get("status").is_some_and(value_is_error)
}

fn value_is_error(value: &Value) -> bool {
    value.as_str().is_some_and(|s| s.eq_ignore_ascii_case("ERROR"))
}
