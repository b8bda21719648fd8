//! Web API module for drivebox.
//!
//! This module exposes the file workflows as a JSON REST API. Every route
//! under `/api` requires a verified session.

pub mod api_doc;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
