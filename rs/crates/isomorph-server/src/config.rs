use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "isomorph-server", about = "Serve the server-rendered list page and its static files")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "ISOMORPH_ADDR", default_value = "0.0.0.0:8080")]
    pub addr: SocketAddr,

    /// Views directory; templates are named by their path under it
    #[arg(long, env = "ISOMORPH_VIEWS", default_value = list_demo::VIEWS_DIR)]
    pub views: PathBuf,

    /// Directory served under /static
    #[arg(long = "static-root", env = "ISOMORPH_STATIC", default_value = list_demo::STATIC_DIR)]
    pub static_root: PathBuf,
}
