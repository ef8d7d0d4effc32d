//! # Alarm Digest Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── emulator.rs      # Producer traffic emulation
//! ├── harness.rs       # Service bootstrap + digest collection
//! └── integration/     # End-to-end scenarios over the in-memory broker
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p digest-tests
//!
//! # By category
//! cargo test -p digest-tests integration::
//! ```

pub mod emulator;
pub mod harness;
pub mod integration;
