//! HTTP transport: dispatch table, session gate, handlers and server lifecycle.

mod auth;
mod handlers;
mod routes;
mod server;
mod state;

pub use auth::{session_gate, Identity};
pub use routes::{api_routes, Endpoint};
pub use server::{build_router, HttpServer};
pub use state::{AppState, CookieSettings};
