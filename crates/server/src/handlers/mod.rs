//! HTTP request handlers.

pub mod detector;
pub mod form;
pub mod gateway;
pub mod health;
pub mod store;

pub use detector::*;
pub use gateway::*;
pub use health::*;
pub use store::*;
