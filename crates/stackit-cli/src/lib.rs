//! # stackit-cli
//!
//! Command-line interface for STACKIT KMS, SFS and Observability.
//!
//! Every leaf command runs the same pipeline behind a shared prologue:
//!
//! ```text
//! argv ─► clap ─► constraints ─► globals ─► printer ─► clients
//!                                                        │
//!          ┌─────────────────────────────────────────────┘
//!          ▼
//!        parse ─► validate ─► confirm ─► dispatch ─► wait ─► render
//! ```
//!
//! The command tree is declared with [`builder::CommandNode`]; leaves
//! implement [`pipeline::Operation`]. API access goes through
//! [`client::ClientFactory`], so tests can substitute an in-memory
//! transport.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod app;
pub mod auth;
pub mod builder;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod flags;
pub mod globals;
pub mod pipeline;
pub mod printer;
pub mod spinner;
pub mod table;
pub mod waiter;

pub use app::App;
pub use client::{ClientFactory, Clients, HttpClientFactory};
pub use config::{Config, EnvSnapshot};
pub use error::{CliError, ErrorKind, Result};
pub use globals::{GlobalFlags, OutputFormat, Verbosity};
pub use printer::{Printer, Streams};
