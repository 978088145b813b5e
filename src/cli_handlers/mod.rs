//! Handlers behind each `mcp-manager` subcommand.

mod claude_commands;
mod serve_commands;
mod server_commands;

pub use claude_commands::{handle_discover, handle_doctor, handle_restart};
pub use serve_commands::{handle_mcp_server, handle_serve};
pub use server_commands::{handle_list, handle_register, handle_set_enabled};
