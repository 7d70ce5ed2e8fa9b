//! lexport CLI - serve sessions and inspect index directories
//!
//! # Examples
//!
//! ```bash
//! # Serve one session over stdio
//! lexport serve
//!
//! # Serve TCP clients, one session per connection
//! lexport serve --tcp --listen 127.0.0.1:6431
//!
//! # Summarize an index
//! lexport inspect-db products --format json
//!
//! # Show configuration
//! lexport show-config
//! ```

use clap::Parser;
use lexport::cli::output::print_error;
use lexport::cli::{run, Cli};
use tracing_subscriber::EnvFilter;

fn init_logging(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lexport=info"));
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    if let Err(e) = run(cli).await {
        print_error(&e.to_string());
        std::process::exit(1);
    }
}
