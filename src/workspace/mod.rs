//! Workspace traversal and build file template restoration.

pub mod restore;
pub mod walk;

pub use restore::{restore_build_files_in_dir, restore_build_files_in_repo};
