//! HTTP API
//!
//! JSON endpoints under `/api`, a `/health` probe, bearer-token
//! authentication and the mapping of domain errors onto status codes.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use extract::CurrentUser;
pub use router::create_router;
pub use state::AppState;
