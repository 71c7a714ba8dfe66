//! # orajson-core
//!
//! The pure half of the orajson gateway: turning a request descriptor into
//! statement text plus a bind list, and turning a driver's raw output back
//! into one decoded value.
//!
//! Nothing here touches a connection. The pool crate feeds a built
//! [`CallSpec`](call::CallSpec) to a live session and hands the raw output
//! to [`decode_output`](decode::decode_output); this crate stays deterministic
//! and unit-testable without a database.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod call;
pub mod decode;
pub mod error;
pub mod request;

pub use call::{CallSpec, MASKED, build_call, masked_input};
pub use decode::{DecodedResult, decode_output, status_is_error};
pub use error::Error;
pub use request::{
    CallRequest, DEFAULT_FETCH_ROWS, InputSource, InputSplit, OutputSpec, RequestContext,
    RequestSpec, Target,
};
