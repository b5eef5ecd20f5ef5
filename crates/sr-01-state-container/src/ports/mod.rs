//! Ports Layer
//!
//! Extension points of the container.

pub mod middleware;

pub use middleware::{Middleware, Next};
