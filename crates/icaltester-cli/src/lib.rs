//! icaltester command-line client library.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
