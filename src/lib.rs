//! Declarative management of volatile files and directories.
//!
//! Reads `tmpfiles.d`-style configuration lines and, depending on the
//! requested modes, creates, age-cleans or removes the paths they name.
//!
//! The public API is organised into layers:
//!
//! - **[`rules`]**: parse one configuration line into a typed [`rules::Rule`]
//! - **[`paths`]**: specifier expansion, globbing, root prefixing
//! - **[`resources`]**: idempotent `check + apply` filesystem primitives
//! - **[`cleanup`]**: the age-based cleaner and the ignore registry
//! - **[`tasks`]**: one handler per rule kind, driven by the requested modes
//! - **[`commands`]**: source discovery and the per-file line loop
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cleanup;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod paths;
pub mod resources;
pub mod rules;
pub mod tasks;
