//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod auth;
pub mod decision;
pub mod invest;
pub mod purchases;
pub mod reports;

// Re-export all handlers for use in router
pub use auth::*;
pub use decision::*;
pub use invest::*;
pub use purchases::*;
pub use reports::*;
