//! MCP (Model Context Protocol) server implementation
//!
//! Lets an AI assistant manage servers through JSON-RPC 2.0 on stdio.

pub mod server;

pub use server::run;
