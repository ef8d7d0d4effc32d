//! # Domain Module
//!
//! Core domain types for the alarm digest service.

pub mod entities;
pub mod errors;
pub mod messages;
pub mod state;

pub use entities::*;
pub use errors::*;
pub use messages::*;
pub use state::*;
