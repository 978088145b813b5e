pub mod cli;
pub mod cli_handlers;
pub mod dashboard;
pub mod error;
pub mod logging;
pub mod manager;
pub mod mcp;
pub mod models;
pub mod paths;
pub mod process;
pub mod reconcile;
pub mod registry;
pub mod store;

#[cfg(test)]
pub mod test_utils;
