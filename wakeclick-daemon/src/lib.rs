//! wakeclick daemon library
//!
//! Re-exports the daemon's modules for integration testing.

pub mod bindings;
pub mod catalog;
pub mod click;
pub mod config;
pub mod diagnostics;
pub mod display_server;
pub mod orchestrator;
pub mod trigger_gate;
pub mod window;
