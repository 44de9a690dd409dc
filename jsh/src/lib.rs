//! A small interactive shell with job control: foreground and background
//! jobs, `jobs`/`fg`/`bg`/`quit`, and relay of terminal control keys to the
//! foreground process group.

pub mod config;
pub mod errors;
pub mod parser;
pub mod process;
pub mod proxy;
pub mod repl;
pub mod shell;
