//! # CLI Module
//!
//! Command-line entry for the `brrtdispatch` binary.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! Start the HTTP and RPC listeners with the built-in echo handlers:
//!
//! ```bash
//! brrtdispatch serve --config server.yaml --http-addr 127.0.0.1:8080 --token s3cret
//! ```
//!
//! ### `routes`
//!
//! Print the route table and registered RPC functions:
//!
//! ```bash
//! brrtdispatch routes
//! ```
//!
//! Configuration precedence is defaults, then the YAML file, then `BRRTD_*`
//! variables, then flags. See [`crate::config`].

mod commands;


pub use commands::{build_application, render_routes, run_cli, Cli, Commands};
