//! # Configuration
//!
//! Server settings come from three layers, later ones winning:
//!
//! 1. built-in defaults
//! 2. an optional YAML file
//! 3. `BRRTD_*` environment variables
//!
//! CLI flags are applied on top by the binary.
//!
//! ## Environment Variables
//!
//! | Variable | Field | Format |
//! |----------|-------|--------|
//! | `BRRTD_HTTP_ADDR` | `http_addr` | `host:port` |
//! | `BRRTD_RPC_ADDR` | `rpc_addr` | `host:port` |
//! | `BRRTD_MAX_FRAME_BYTES` | `max_frame_bytes` | decimal or `0x` hex |
//! | `BRRTD_STACK_SIZE` | `stack_size` | decimal or `0x` hex |
//! | `BRRTD_AUTH_TOKEN` | `auth_token` | bearer token |
//!
//! ```yaml
//! http_addr: "127.0.0.1:8080"
//! rpc_addr: "127.0.0.1:9090"
//! stack_size: 0x8000
//! auth_token: s3cret
//! ```

use std::env;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::rpc::frame::DEFAULT_MAX_FRAME_BYTES;
use crate::server::DEFAULT_STACK_SIZE;

pub const ENV_HTTP_ADDR: &str = "BRRTD_HTTP_ADDR";
pub const ENV_RPC_ADDR: &str = "BRRTD_RPC_ADDR";
pub const ENV_MAX_FRAME_BYTES: &str = "BRRTD_MAX_FRAME_BYTES";
pub const ENV_STACK_SIZE: &str = "BRRTD_STACK_SIZE";
pub const ENV_AUTH_TOKEN: &str = "BRRTD_AUTH_TOKEN";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address of the HTTP listener
    pub http_addr: String,
    /// Bind address of the RPC listener
    pub rpc_addr: String,
    /// Largest RPC frame payload accepted, in bytes
    pub max_frame_bytes: usize,
    /// Coroutine stack size in bytes
    pub stack_size: usize,
    /// When set, HTTP routes require `Authorization: Bearer <token>`
    pub auth_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:8080".to_string(),
            rpc_addr: "0.0.0.0:9090".to_string(),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            stack_size: DEFAULT_STACK_SIZE,
            auth_token: None,
        }
    }
}

impl ServerConfig {
    /// Load defaults, then `path` if given, then environment overrides.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed, or if a numeric
    /// environment override is malformed.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a YAML file; missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not valid YAML for this type.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Apply `BRRTD_*` overrides resolved through `lookup`.
    ///
    /// # Errors
    ///
    /// Fails if a numeric override is not a decimal or `0x` hex integer.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_HTTP_ADDR) {
            self.http_addr = v;
        }
        if let Some(v) = lookup(ENV_RPC_ADDR) {
            self.rpc_addr = v;
        }
        if let Some(v) = lookup(ENV_MAX_FRAME_BYTES) {
            self.max_frame_bytes = parse_size(&v).with_context(|| format!("invalid {ENV_MAX_FRAME_BYTES}"))?;
        }
        if let Some(v) = lookup(ENV_STACK_SIZE) {
            self.stack_size = parse_size(&v).with_context(|| format!("invalid {ENV_STACK_SIZE}"))?;
        }
        if let Some(v) = lookup(ENV_AUTH_TOKEN) {
            self.auth_token = if v.is_empty() { None } else { Some(v) };
        }
        Ok(())
    }
}

/// Parse a byte size written in decimal or `0x` hexadecimal.
///
/// # Errors
///
/// Fails on anything else, including zero.
pub fn parse_size(raw: &str) -> anyhow::Result<usize> {
    let raw = raw.trim();
    let value = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16)?,
        None => raw.parse()?,
    };
    if value == 0 {
        bail!("size must be greater than zero");
    }
    Ok(value)
}
