//! # orajson-gateway
//!
//! A request-to-stored-procedure gateway for Oracle: it marshals a JSON
//! request into a stored-procedure call against a pooled session, executes
//! it, and unmarshals the CLOB, BLOB or cursor result back into one decoded
//! value.
//!
//! The gateway sits inside a request-handling pipeline owned by an embedding
//! framework; routing, authentication and response formatting stay outside.
//! What lives here is the execution engine: a bounded session pool that is
//! validated at startup, a probe-retry-discard lifecycle per call, and a
//! diagnostic report for an admin endpoint.
//!
//! ```no_run
//! use orajson_core::{CallRequest, OutputSpec, RequestContext};
//! use orajson_driver::ConnectSettings;
//! use orajson_gateway::Gateway;
//! use orajson_pool::PoolConfig;
//! # async fn example<D: orajson_driver::Driver>(driver: D) -> Result<(), Box<dyn std::error::Error>> {
//! let settings = ConnectSettings::from_descriptor("scott/tiger@dbhost/orcl")?;
//! let gateway = Gateway::connect(driver, settings, PoolConfig::new().pool_max(8)).await?;
//!
//! let request = CallRequest::procedure("pkg_test.getPrice")
//!     .from_section("query")
//!     .with_output(OutputSpec::Json);
//! let ctx = RequestContext::new().with_section("query", serde_json::json!({"id": 7}));
//! let result = gateway.execute(&request, &ctx).await?;
//! # Ok(()) }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod admin;
pub mod cache;
pub mod error;
pub mod gateway;

pub use admin::{AdminReport, Health, NO_CACHE_HEADERS};
pub use cache::CacheHook;
pub use error::GatewayError;
pub use gateway::{DEFAULT_MAX_PROCEDURES, Gateway};

pub use orajson_core::{CallRequest, DecodedResult, OutputSpec, RequestContext, RequestSpec};
pub use orajson_pool::{PoolConfig, PoolError};
