//! Integration with the gazelle rule generator.

pub mod invoker;

pub use invoker::{CommandRunner, Invoker, Mode, ProcessRunner};
