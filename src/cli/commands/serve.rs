//! Serve command - run the protocol server

use crate::core::config::Config;
use crate::driver::Server;
use clap::Args;

/// Arguments for the serve command
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Accept TCP connections instead of serving stdio
    #[arg(long)]
    pub tcp: bool,

    /// Override the TCP listen address
    #[arg(long, requires = "tcp")]
    pub listen: Option<String>,
}

/// Execute the serve command
pub async fn execute(args: ServeArgs, mut config: Config) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(listen) = args.listen {
        config.server.listen = listen;
        config.validate()?;
    }
    config.log_config();

    let server = Server::new(config);
    if args.tcp {
        server.run_tcp().await?;
    } else {
        server.run_stdio().await?;
    }
    Ok(())
}
