//! CLI module for ghledger - command-line interface and subcommands.

pub mod commands;

pub use commands::Cli;
