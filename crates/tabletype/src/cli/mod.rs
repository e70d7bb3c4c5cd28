//! CLI module for the table type catalog
//!
//! Every command works on a JSON catalog snapshot; commands that change
//! the catalog write it back when they succeed.

pub mod catalog;
pub mod config;
pub mod error;
pub mod output;

// Read-only commands
pub mod check;
pub mod show;
pub mod storage_name;
pub mod types;

// Catalog edits
pub mod argument;
pub mod reconcile;
pub mod table;
