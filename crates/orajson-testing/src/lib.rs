//! # orajson-testing
//!
//! Test infrastructure for orajson gateway development.
//!
//! The centerpiece is [`MockDriver`], a scriptable in-memory implementation of
//! the `orajson-driver` traits. Tests enqueue responses ahead of time, point a
//! pool or gateway at the driver, and afterwards inspect what was executed,
//! how many sessions were opened, and which sessions were closed.
//!
//! ```no_run
//! use orajson_testing::MockDriver;
//!
//! let driver = MockDriver::new();
//! driver.respond_json(r#"{"status":"OK","price":299}"#);
//! driver.fail_next_pings(1);
//! // hand `driver.clone()` to the pool, keep `driver` for assertions
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::Value;

use orajson_driver::{
    BindValue, ConnectSettings, Cursor, Driver, DriverError, RawOutput, Row, Session,
};

/// One recorded `execute` call, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedCall {
    /// Which session ran the statement.
    pub session: u64,
    /// The statement text as received.
    pub statement: String,
    /// The bind list as received.
    pub binds: Vec<BindValue>,
}

/// A response waiting to be served by the next `execute` call.
#[derive(Debug, Clone)]
pub enum ScriptedOutput {
    /// The call completes without output binds.
    Empty,
    /// One CLOB stream delivering the given text, split into the given
    /// chunks.
    Clob(Vec<String>),
    /// One BLOB stream delivering the given bytes in one chunk.
    Blob(Vec<u8>),
    /// One cursor per entry; each row is a JSON object.
    Rows(Vec<Vec<Value>>),
    /// The call fails with this driver error.
    Fail(DriverError),
}

#[derive(Debug, Default)]
struct MockState {
    script: VecDeque<ScriptedOutput>,
    connect_failures: u32,
    ping_failures: u32,
    latency: Duration,
    connects: u64,
    next_session_id: u64,
    executed: Vec<ExecutedCall>,
    closed: Vec<u64>,
}

/// A scriptable in-memory database driver.
///
/// Cloning is cheap and shares state, so a test can keep one handle for
/// assertions while the pool owns another. Responses are served strictly in
/// the order they were enqueued, across all sessions; an empty script serves
/// [`ScriptedOutput::Empty`].
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
}

impl MockDriver {
    /// A driver with an empty script and no failure injection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings accepted by the mock; it never opens a network connection.
    #[must_use]
    pub fn settings() -> ConnectSettings {
        ConnectSettings::new("mockhost", "mockdb", "scott", "tiger")
    }

    /// Enqueue a raw scripted response.
    pub fn respond(&self, output: ScriptedOutput) {
        self.state.lock().script.push_back(output);
    }

    /// Enqueue a single-chunk CLOB response carrying `text`.
    pub fn respond_json(&self, text: impl Into<String>) {
        self.respond(ScriptedOutput::Clob(vec![text.into()]));
    }

    /// Enqueue a BLOB response carrying `bytes`.
    pub fn respond_blob(&self, bytes: impl Into<Vec<u8>>) {
        self.respond(ScriptedOutput::Blob(bytes.into()));
    }

    /// Enqueue a cursor response, one cursor per entry of `cursors`.
    pub fn respond_rows(&self, cursors: Vec<Vec<Value>>) {
        self.respond(ScriptedOutput::Rows(cursors));
    }

    /// Enqueue a completed call with no output binds.
    pub fn respond_empty(&self) {
        self.respond(ScriptedOutput::Empty);
    }

    /// Enqueue an execution failure.
    pub fn fail_execution(&self, error: DriverError) {
        self.respond(ScriptedOutput::Fail(error));
    }

    /// Make the next `count` connect attempts fail.
    pub fn fail_next_connects(&self, count: u32) {
        self.state.lock().connect_failures = count;
    }

    /// Make the next `count` liveness probes fail, across all sessions.
    pub fn fail_next_pings(&self, count: u32) {
        self.state.lock().ping_failures = count;
    }

    /// Delay every `execute` call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().latency = latency;
    }

    /// How many sessions were successfully established.
    #[must_use]
    pub fn connect_count(&self) -> u64 {
        self.state.lock().connects
    }

    /// Every `execute` call recorded so far, in arrival order.
    #[must_use]
    pub fn executed_calls(&self) -> Vec<ExecutedCall> {
        self.state.lock().executed.clone()
    }

    /// Ids of sessions that were closed, in close order.
    #[must_use]
    pub fn closed_sessions(&self) -> Vec<u64> {
        self.state.lock().closed.clone()
    }

    /// Responses still waiting to be served.
    #[must_use]
    pub fn remaining_responses(&self) -> usize {
        self.state.lock().script.len()
    }
}

#[async_trait]
impl Driver for MockDriver {
    type Session = MockSession;

    async fn connect(&self, settings: &ConnectSettings) -> Result<MockSession, DriverError> {
        settings.validate()?;
        let mut state = self.state.lock();
        if state.connect_failures > 0 {
            state.connect_failures -= 1;
            return Err(DriverError::Connect("scripted connect failure".into()));
        }
        state.connects += 1;
        let id = state.next_session_id;
        state.next_session_id += 1;
        Ok(MockSession {
            id,
            closed: false,
            state: self.state.clone(),
        })
    }
}

/// A session produced by [`MockDriver`].
#[derive(Debug)]
pub struct MockSession {
    id: u64,
    closed: bool,
    state: Arc<Mutex<MockState>>,
}

impl MockSession {
    /// The session's identity, matching [`MockDriver::closed_sessions`] and
    /// [`ExecutedCall::session`].
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
}

#[async_trait]
impl Session for MockSession {
    async fn execute(
        &mut self,
        statement: &str,
        binds: Vec<BindValue>,
    ) -> Result<RawOutput, DriverError> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        let (latency, scripted) = {
            let mut state = self.state.lock();
            state.executed.push(ExecutedCall {
                session: self.id,
                statement: statement.to_string(),
                binds,
            });
            let scripted = state.script.pop_front().unwrap_or(ScriptedOutput::Empty);
            (state.latency, scripted)
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        match scripted {
            ScriptedOutput::Empty => Ok(RawOutput::None),
            ScriptedOutput::Clob(chunks) => Ok(RawOutput::Lobs(vec![lob_stream(
                chunks.into_iter().map(Bytes::from).collect(),
            )])),
            ScriptedOutput::Blob(bytes) => {
                Ok(RawOutput::Lobs(vec![lob_stream(vec![Bytes::from(bytes)])]))
            }
            ScriptedOutput::Rows(cursors) => Ok(RawOutput::Cursors(
                cursors
                    .into_iter()
                    .map(|rows| Box::new(MockCursor::new(rows)) as Box<dyn Cursor>)
                    .collect(),
            )),
            ScriptedOutput::Fail(error) => Err(error),
        }
    }

    async fn ping(&mut self) -> Result<(), DriverError> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        let mut state = self.state.lock();
        if state.ping_failures > 0 {
            state.ping_failures -= 1;
            return Err(DriverError::Closed);
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        self.closed = true;
        self.state.lock().closed.push(self.id);
        Ok(())
    }
}

fn lob_stream(chunks: Vec<Bytes>) -> orajson_driver::LobStream {
    Box::pin(futures_util::stream::iter(chunks.into_iter().map(Ok)))
}

/// A cursor serving a fixed row list in fetch-sized batches.
#[derive(Debug)]
pub struct MockCursor {
    rows: Vec<Row>,
    fetched: usize,
    closed: bool,
}

impl MockCursor {
    fn new(rows: Vec<Value>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| match row {
                Value::Object(object) => Row::from_object(object),
                other => Row::from_object(
                    [("value".to_string(), other)].into_iter().collect(),
                ),
            })
            .collect();
        Self {
            rows,
            fetched: 0,
            closed: false,
        }
    }
}

#[async_trait]
impl Cursor for MockCursor {
    async fn fetch(&mut self, count: usize) -> Result<Vec<Row>, DriverError> {
        if self.closed {
            return Err(DriverError::Cursor("fetch on closed cursor".into()));
        }
        let end = (self.fetched + count).min(self.rows.len());
        let batch = self.rows[self.fetched..end].to_vec();
        self.fetched = end;
        Ok(batch)
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        self.closed = true;
        Ok(())
    }
}
