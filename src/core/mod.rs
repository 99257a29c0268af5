//! Core domain models and the schema-to-canvas synchronization engine

pub mod auto_layout;
pub mod config;
mod editor;
pub mod graph;
mod schema;
#[cfg(test)]
mod tests;
pub mod validation;

pub use editor::*;
pub use schema::*;
