//! # orajson-pool
//!
//! A bounded async session pool for the orajson gateway.
//!
//! [`Pool::initialize`] proves the pool is usable at startup by establishing
//! and probing one session; [`Pool::acquire`] hands out [`PooledSession`]
//! wrappers under a queue timeout, so a caller either gets a session or a
//! time-bounded failure. One call is outstanding per session at a time;
//! concurrency comes from the pool's bounds, not from sharing a session.
//!
//! Sessions that fail a probe or an execution are discarded, never returned
//! to the free set; the next acquire establishes a fresh session. All
//! counters and timing rings feed the gateway's diagnostic report.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod pool;
pub mod session;
pub mod stats;

pub use config::PoolConfig;
pub use error::PoolError;
pub use pool::Pool;
pub use session::PooledSession;
pub use stats::PoolSnapshot;
