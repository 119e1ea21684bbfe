//! HTTP API — axum router exposing the adherence engine to the web
//! frontend, plus the public token-addressed caretaker view.
//!
//! Routes under `/api/` require bearer-token authentication; the
//! middleware resolves the token to a `UserContext` so every handler
//! is owner-scoped. `/share/:token` and `/auth/register` are public.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::ApiServer;
pub use types::{ApiContext, UserContext};
