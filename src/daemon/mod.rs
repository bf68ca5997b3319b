//! The autogazelle daemon.
//!
//! A long-lived server keeps a set of directories changed since the last
//! gazelle run. Clients connect to ask for those directories to be brought
//! up to date and are answered by the connection closing.

pub mod client;
pub mod dirty;
pub mod server;
pub mod watcher;

pub use server::DaemonServer;
