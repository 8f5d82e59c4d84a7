pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "brook")]
#[command(about = "A feed reader client for a remote sync service", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/brook/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Offline cache database (default: <data dir>/brook/brook.db)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sync feeds, tags and articles with the server
    Sync,
    /// List feeds or articles from the local cache
    List {
        /// Show articles instead of feeds
        #[arg(long)]
        articles: bool,

        /// Only unread articles (implies --articles)
        #[arg(long)]
        unread: bool,
    },
    /// List tags from the local cache
    Tags,
    /// Keep syncing in the background until interrupted
    Watch {
        /// Sync interval (e.g., "30m", "1h"); overrides the config file
        #[arg(short, long)]
        interval: Option<String>,

        /// Skip the sync that normally runs on start
        #[arg(long)]
        no_initial_sync: bool,
    },
    /// Open an article and mark it read after the dwell delay
    Read {
        /// Article ID
        article_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_watch_with_interval() {
        let cli = Cli::try_parse_from(["brook", "watch", "--interval", "15m", "--no-initial-sync"])
            .unwrap();
        match cli.command {
            Commands::Watch {
                interval,
                no_initial_sync,
            } => {
                assert_eq!(interval.as_deref(), Some("15m"));
                assert!(no_initial_sync);
            }
            _ => panic!("expected watch"),
        }
    }

    #[test]
    fn test_global_db_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["brook", "list", "--unread", "--db", "/tmp/b.db"]).unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/b.db")));
        assert!(matches!(
            cli.command,
            Commands::List {
                articles: false,
                unread: true
            }
        ));
    }

    #[test]
    fn test_read_requires_article_id() {
        assert!(Cli::try_parse_from(["brook", "read"]).is_err());
    }
}
