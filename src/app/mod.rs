// NeuroSuite - app/mod.rs
//
// Application layer: the session manager, the upload/classify workflow,
// and the analysis screens that bind the two together.
// Dependencies: core, and platform only through its traits, config and
// file loading.

pub mod screens;
pub mod session;
pub mod workflow;
