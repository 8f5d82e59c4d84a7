use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use brook::app::AppContext;
use brook::cli::{commands, Cli, Commands};
use brook::config::Config;
use brook::notify::ChannelSink;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let (sink, notifications) = ChannelSink::new();
    let printer = tokio::spawn(commands::print_notifications(notifications));
    let ctx = AppContext::new(config, cli.db, Arc::new(sink))?;

    let outcome = match cli.command {
        Commands::Sync => commands::sync(&ctx).await,
        Commands::List { articles, unread } => {
            if articles || unread {
                commands::list_articles(&ctx, unread)
            } else {
                commands::list_feeds(&ctx)
            }
        }
        Commands::Tags => commands::list_tags(&ctx),
        Commands::Watch {
            interval,
            no_initial_sync,
        } => commands::watch(&ctx, interval.as_deref(), !no_initial_sync).await,
        Commands::Read { article_id } => commands::read_article(&ctx, &article_id).await,
    };

    // Closing the sink lets the printer drain pending notifications and exit.
    drop(ctx);
    printer.await?;

    outcome?;
    Ok(())
}
