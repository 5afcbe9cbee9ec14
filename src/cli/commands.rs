use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use crate::application::Application;
use crate::config::ServerConfig;
use crate::echo;
use crate::filter::{BearerTokenFilter, OrderedFilterChain};
use crate::hooks::LifecycleEvent;
use crate::router::{PatternRouter, Router};
use crate::server::{HttpEntry, HttpServer, RpcServer};

/// Command-line interface for the dispatch server
#[derive(Parser)]
#[command(name = "brrtdispatch")]
#[command(about = "HTTP and RPC request dispatch server", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP and RPC listeners
    Serve {
        /// YAML configuration file
        #[arg(short, long, env = "BRRTD_CONFIG")]
        config: Option<PathBuf>,

        /// HTTP bind address (overrides config)
        #[arg(long)]
        http_addr: Option<String>,

        /// RPC bind address (overrides config)
        #[arg(long)]
        rpc_addr: Option<String>,

        /// Require `Authorization: Bearer <TOKEN>` on HTTP routes
        #[arg(long)]
        token: Option<String>,
    },
    /// Print the HTTP route table and registered RPC functions
    Routes {
        /// YAML configuration file
        #[arg(short, long, env = "BRRTD_CONFIG")]
        config: Option<PathBuf>,
    },
}

/// Execute the parsed command.
///
/// # Errors
///
/// Fails if configuration cannot be loaded, a listener cannot bind, or the
/// HTTP server coroutine panics.
pub fn run_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve {
            config,
            http_addr,
            rpc_addr,
            token,
        } => {
            let mut cfg = ServerConfig::load(config.as_deref())?;
            if let Some(addr) = http_addr {
                cfg.http_addr = addr;
            }
            if let Some(addr) = rpc_addr {
                cfg.rpc_addr = addr;
            }
            if token.is_some() {
                cfg.auth_token = token;
            }
            serve(&cfg)
        }
        Commands::Routes { config } => {
            let cfg = ServerConfig::load(config.as_deref())?;
            let app = build_application(&cfg)?;
            print!("{}", render_routes(&app));
            Ok(())
        }
    }
}

/// Wire the built-in echo controller and services behind the configured filters.
///
/// # Errors
///
/// Fails if a route pattern does not compile.
pub fn build_application(cfg: &ServerConfig) -> anyhow::Result<Application> {
    let router = PatternRouter::new(echo::routes()).context("invalid route table")?;

    let mut filters = OrderedFilterChain::new();
    if let Some(token) = &cfg.auth_token {
        filters = filters.with(BearerTokenFilter::new(token));
    }

    let builder = Application::builder()
        .router(router)
        .filters(filters)
        .hook(|event, ctx| {
            if event == LifecycleEvent::AfterRequest {
                debug!(
                    trace_id = %ctx.trace_id(),
                    target = %ctx.target(),
                    latency_ms = ctx.elapsed().as_millis() as u64,
                    "Invocation finished"
                );
            }
        });
    Ok(echo::register(builder).build())
}

fn serve(cfg: &ServerConfig) -> anyhow::Result<()> {
    may::config().set_stack_size(cfg.stack_size);
    let app = Arc::new(build_application(cfg)?);

    let rpc = RpcServer::new(Arc::clone(&app))
        .max_frame_bytes(cfg.max_frame_bytes)
        .stack_size(cfg.stack_size)
        .start(cfg.rpc_addr.as_str())
        .with_context(|| format!("failed to bind rpc listener on {}", cfg.rpc_addr))?;

    let http = HttpServer(HttpEntry::new(Arc::clone(&app)))
        .start(cfg.http_addr.as_str())
        .with_context(|| format!("failed to bind http listener on {}", cfg.http_addr))?;

    info!(
        http_addr = %http.addr(),
        rpc_addr = %rpc.addr(),
        routes = app.router().routes().len(),
        functions = app.services().functions().len(),
        "Server started"
    );

    let outcome = http.join();
    rpc.stop();
    outcome.map_err(|e| anyhow!("http server terminated: {e:?}"))
}

/// Human-readable route and function listing.
#[must_use]
pub fn render_routes(app: &Application) -> String {
    let mut out = String::new();
    for route in app.router().routes() {
        let _ = writeln!(
            out,
            "{:<7} {:<24} {}#{}",
            route.method.as_str(),
            route.pattern,
            route.handler,
            route.action
        );
    }
    for func in app.services().functions() {
        let _ = writeln!(out, "{:<7} {func}", "RPC");
    }
    out
}
