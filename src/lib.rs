//! Archischema canvas - schema graph synchronization engine
//!
//! Keeps a relational schema (tables, fields, name-based foreign keys) in
//! sync with the node/edge graph a canvas renderer draws, and folds drag,
//! resize and connect gestures back into the schema.

pub mod core;
