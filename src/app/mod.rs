//! Application core — pure domain logic, zero I/O.
//!
//! This module contains the business rules for the pin controller: command
//! parsing, pin-state bookkeeping, command execution, and response
//! rendering.  All interaction with hardware happens through **port
//! traits** defined in [`ports`], keeping this layer fully testable
//! without real peripherals.

pub mod commands;
pub mod executor;
pub mod ports;
pub mod report;
pub mod response;
pub mod store;
