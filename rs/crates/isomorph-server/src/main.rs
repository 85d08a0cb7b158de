mod config;
mod error;
mod server;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use isomorph_render_html::ServerRenderer;
use isomorph_template::{Syntax, TemplateSet};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,isomorph=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = config::Args::parse();

    let views = TemplateSet::load_dir(&args.views, Syntax::Server)
        .with_context(|| format!("failed to load views from {}", args.views.display()))?;
    info!(views = %args.views.display(), templates = views.len(), "views ready");

    let state = Arc::new(server::AppState {
        renderer: ServerRenderer::new(Arc::new(views)),
    });
    let app = server::router(state, &args.static_root);

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .with_context(|| format!("failed to bind {}", args.addr))?;
    info!(addr = %args.addr, static_root = %args.static_root.display(), "listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
