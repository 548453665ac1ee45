// NeuroSuite - core/mod.rs
//
// Core layer: data model, validation, wire shapes, API seams, reports.
// Dependencies: serde, regex, async-trait.
// Must NOT depend on: app, platform, or perform any I/O directly.

pub mod api;
pub mod model;
pub mod report;
pub mod validation;
pub mod wire;
