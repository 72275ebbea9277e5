//! HTTP layer for the gateway.
//!
//! Four routes: the endpoint catalogue at `/`, `/health`, `/api/chat`, and
//! `/api/tools`. Chat failures are reported in the JSON body with status 200.

pub mod handlers;
pub mod router;
