//! Pinpoint firmware library.
//!
//! Exposes the command-protocol and supervision modules for integration
//! testing and external inspection. All ESP-IDF-specific code is guarded
//! by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod console;
pub mod supervisor;

mod error;
mod pins;

// Re-export the ESPidf-only modules so the crate compiles; the actual
// implementations are guarded by cfg attributes inside.
pub mod adapters;
pub mod drivers;
pub mod net;
