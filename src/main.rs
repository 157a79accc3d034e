use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use notifeed::app::AppContext;
use notifeed::cli::{commands, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let ctx = AppContext::new(cli.config.as_deref(), cli.base_url)?;

    match cli.command {
        Commands::List { pages } => {
            commands::list(&ctx, pages).await?;
        }
        Commands::Seen { id } => {
            commands::mark_seen(&ctx, &id).await?;
        }
        Commands::Delete { id } => {
            commands::delete(&ctx, &id).await?;
        }
        Commands::Clear => {
            commands::clear_all(&ctx).await?;
        }
        Commands::Watch => {
            commands::watch(&ctx).await?;
        }
    }

    Ok(())
}
