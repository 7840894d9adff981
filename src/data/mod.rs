//! Data layer module
//!
//! Handles all data persistence:
//! - Record models for users and posts
//! - Whole-collection JSON file store

mod models;
mod store;

pub use models::*;
pub use store::JsonStore;
