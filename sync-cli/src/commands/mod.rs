//! CLI command implementations.

pub mod change;
pub mod edit;
pub mod init;
pub mod show;
pub mod toggle;
