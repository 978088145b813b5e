pub mod controller;
pub mod handle;
pub mod probe;

pub use controller::{
    LaunchConfig, LaunchStrategy, ProcessController, TerminateConfig,
    CLAUDE_PROCESS_PATTERNS,
};
pub use handle::{ProcessHandle, SystemProcess};
pub use probe::{CommandProbe, ProbeConfig};
