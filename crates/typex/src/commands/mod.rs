//! Command handlers for the typex CLI.

pub mod extract;
pub mod policy;

pub use extract::handle_extract_command;
pub use policy::handle_policy_command;
