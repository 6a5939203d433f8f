//! Library exports for authshell, shared between the binary and tests.

pub mod account;
pub mod bootstrap;
pub mod client;
pub mod config;
pub mod models;
pub mod navigation;
pub mod routes;
pub mod session;
pub mod signal;
pub mod startup;
pub mod state;
pub mod utils;
