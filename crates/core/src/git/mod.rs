//! Git operations for mergemine.

pub mod client;

pub use client::GitClient;
