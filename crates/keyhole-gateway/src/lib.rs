//! HTTP gateway over the shortening service.
//!
//! The router, handlers and middleware live in the library so integration
//! tests can drive the exact tower service the binary serves.

pub mod app;
pub mod cli;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod model;
pub mod state;

pub use app::App;
pub use state::AppState;
