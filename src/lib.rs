//! Vouch - Remote identity session reconciliation
//!
//! Binds a user name asserted by an upstream authentication layer (web server
//! module, SSO proxy) to an application session, creating and profiling the
//! local identity when allowed. The [`identity`] module is the engine; the
//! rest wires it to a config file, an in-memory directory and a demo server.

pub mod cli;
pub mod config;
pub mod directory;
pub mod identity;
pub mod logging;
pub mod metrics;
pub mod server;
