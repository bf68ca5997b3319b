//! Converting a dep lock file into `go_repository` rules.

pub mod importer;
pub mod manifest;
pub mod proxy;
pub mod rule;

pub use importer::{ImportOptions, Importer};
pub use rule::{AttrValue, Rule};
