// NeuroSuite - platform/mod.rs
//
// Platform layer: paths and config, durable token storage, file access,
// and the HTTP transport.
// Dependencies: core, util, directories, reqwest, tokio.
// Must NOT depend on: app.

pub mod config;
pub mod fs;
pub mod http;
pub mod token_store;
