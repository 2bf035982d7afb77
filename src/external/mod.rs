//! External tool abstractions
//!
//! Trait-based seam over the external multiplexer CLI, separating the pure
//! decisions (which command to run, how to read its answer) from the impure
//! effect of spawning a process.

pub mod command;

pub use command::{
    CommandError, CommandExecutor, CommandOutput, ProcessCommandExecutor, DEFAULT_COMMAND_TIMEOUT,
};
