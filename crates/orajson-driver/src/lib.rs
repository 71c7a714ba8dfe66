//! # orajson-driver
//!
//! Contracts between the orajson gateway and the underlying Oracle client.
//!
//! The gateway does not speak the Oracle wire protocol itself; it orchestrates
//! pooling, call construction and result decoding above a client that does.
//! This crate defines that seam: [`Driver`] creates sessions, [`Session`]
//! executes one statement at a time, and the shapes a statement can produce
//! ([`RawOutput`]) cover scalar large-object streams and server-side cursors.
//!
//! Implementations are expected from two places: a binding to a real Oracle
//! client in production, and the in-memory driver in `orajson-testing` for
//! tests.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod bind;
pub mod error;
pub mod output;
pub mod row;
pub mod settings;

pub use bind::{BindValue, OutBindKind};
pub use error::DriverError;
pub use output::{Cursor, LobStream, RawOutput};
pub use row::{Column, Row};
pub use settings::ConnectSettings;

use async_trait::async_trait;

/// The cheapest statement that proves a session is still usable.
pub const LIVENESS_PROBE: &str = "SELECT 1 FROM dual";

/// Factory for live database sessions.
///
/// A driver is shared by the whole pool and must be cheap to call into
/// concurrently; each [`connect`](Driver::connect) yields an independent
/// session.
#[async_trait]
pub trait Driver: Send + Sync + 'static {
    /// The session type this driver produces.
    type Session: Session;

    /// Establish a new authenticated session.
    async fn connect(&self, settings: &ConnectSettings) -> Result<Self::Session, DriverError>;
}

/// One live database session.
///
/// A session executes exactly one statement at a time; the pool guarantees it
/// is never shared across concurrent calls. Sessions are `Send` so they can
/// migrate between executor threads across await points.
#[async_trait]
pub trait Session: Send + 'static {
    /// Execute a statement with the given bind list.
    ///
    /// Output binds in `binds` tell the driver which result shape to
    /// register; the returned [`RawOutput`] must match them (LOB streams in
    /// bind order, or one cursor handle per cursor bind).
    async fn execute(
        &mut self,
        statement: &str,
        binds: Vec<BindValue>,
    ) -> Result<RawOutput, DriverError>;

    /// Run the liveness probe ([`LIVENESS_PROBE`]).
    async fn ping(&mut self) -> Result<(), DriverError>;

    /// Close the session. Further calls must fail with [`DriverError::Closed`].
    async fn close(&mut self) -> Result<(), DriverError>;
}
