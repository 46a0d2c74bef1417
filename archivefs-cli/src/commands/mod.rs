//! CLI subcommands.

pub mod common;
pub mod inspect;

pub use inspect::InspectCommand;
