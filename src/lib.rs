// NeuroSuite - lib.rs
//
// Library entry point, exposing every layer for integration testing and
// for the `neurosuite` command-line binary.

pub mod app;
pub mod core;
pub mod platform;
pub mod util;
