//! skillforge-core — Grading pipeline, data model, and traits.
//!
//! This crate defines the data model, collaborator traits, and the
//! grading engine that the rest of the skillforge system builds on.
//! Sandbox implementations live in `skillforge-sandbox`, the static
//! analyzer in `skillforge-analysis`.

pub mod engine;
pub mod error;
pub mod harness;
pub mod memory;
pub mod model;
pub mod parser;
pub mod recommend;
pub mod results;
pub mod state;
pub mod traits;
