//! lexport protocol server
//!
//! Serves one session over stdin/stdout using length-prefixed frames.
//! The host process spawns this binary and owns both pipes; all logging
//! goes to stderr.

use lexport::core::config::Config;
use lexport::core::xdg::XdgDirs;
use lexport::driver::Server;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr) // Critical: stderr not stdout
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lexport=info")),
        )
        .with_ansi(false) // No color codes
        .compact() // Concise format
        .init();
}

#[tokio::main]
async fn main() {
    init_logging();

    let xdg = XdgDirs::new();
    xdg.log_paths();
    if let Err(e) = xdg.ensure_dirs_exist() {
        eprintln!("Failed to create XDG directories: {e}");
        std::process::exit(1);
    }

    // Load configuration
    let config = Config::load_with_xdg(&xdg).unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {e}");
        std::process::exit(1);
    });
    config.log_config();

    let server = Server::new(config);
    if let Err(e) = server.run_stdio().await {
        eprintln!("lexport server error: {e}");
        std::process::exit(1);
    }
}
