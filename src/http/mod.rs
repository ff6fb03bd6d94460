//! HTTP API for driving voice composers from a UI shell
//!
//! - POST /composers - Open a composer
//! - GET /composers/:id - Snapshot for rendering
//! - POST /composers/:id/{primary,play,cancel,save,review} - Transport buttons
//! - DELETE /composers/:id - Tear down
//! - GET /store, POST /store/refresh - Marketplace cache
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
