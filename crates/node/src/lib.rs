//! Chord ring node: a daemon serving the ring protocol over TCP, its configuration,
//! and a client to drive a running node from the command line.
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod processor;
pub mod server;
#[cfg(test)]
mod tests;
pub mod util;
