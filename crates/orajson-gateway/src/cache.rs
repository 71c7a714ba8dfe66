//! The post-success cache hook.

use async_trait::async_trait;

use orajson_core::{CallRequest, DecodedResult, RequestContext};

/// Injected hook invoked after a successful call whose descriptor opted in
/// with `cache: true`.
///
/// The gateway only ever calls [`put`](CacheHook::put), only on the success
/// path, and only after the result is fully decoded; key derivation and
/// lookup belong to the embedding framework. Hook failures must be handled
/// inside the hook; `put` cannot fail the already-completed call.
#[async_trait]
pub trait CacheHook: Send + Sync {
    /// Store the decoded result of `request`, keyed however the embedder
    /// sees fit from the request and its context.
    async fn put(&self, request: &CallRequest, result: &DecodedResult, ctx: &RequestContext);
}
