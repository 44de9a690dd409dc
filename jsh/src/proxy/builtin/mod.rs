//! Builtin command handlers for the shell dispatch system.
//!
//! This module contains handlers for shell builtin commands that are executed
//! directly by the dispatch function rather than as external processes.

pub mod exit;
pub mod jobs;
pub mod registry;
