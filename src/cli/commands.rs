use std::time::Duration;

use tokio::sync::mpsc;

use crate::app::{AppContext, BrookError, Result};
use crate::daemon::{format_interval, parse_interval, BackgroundSync};
use crate::domain::{Article, SyncAttempt, SyncStatus};
use crate::notify::{Notification, NotificationKind};

const READ_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub async fn sync(ctx: &AppContext) -> Result<()> {
    println!("Syncing with {}...", ctx.config.sync.api_url);

    let Some(attempt) = ctx.coordinator.request_sync().await else {
        return Ok(());
    };

    // The cause was already reported as a notification.
    if attempt.status == SyncStatus::Failed {
        return Err(BrookError::SyncFailed(attempt.sync_id));
    }

    ctx.persist()?;
    print_attempt(&attempt);
    Ok(())
}

pub fn list_feeds(ctx: &AppContext) -> Result<()> {
    let feeds = ctx.cache.feeds();

    if feeds.is_empty() {
        println!("No feeds (run `brook sync` first)");
        return Ok(());
    }

    for feed in feeds {
        println!(
            "{} ({} unread)\n  {}",
            feed.display_title(),
            feed.unread_count,
            feed.url
        );
    }

    Ok(())
}

pub fn list_articles(ctx: &AppContext, unread_only: bool) -> Result<()> {
    let articles = ctx.cache.articles(unread_only);

    if articles.is_empty() {
        println!("No articles");
        return Ok(());
    }

    for article in articles {
        println!("{}", article_line(&article));
    }

    Ok(())
}

pub fn list_tags(ctx: &AppContext) -> Result<()> {
    let tags = ctx.cache.tags();

    if tags.is_empty() {
        println!("No tags");
        return Ok(());
    }

    for tag in tags {
        println!("{} ({})", tag.name, tag.article_count);
    }

    Ok(())
}

/// Runs background syncs until ctrl-c, saving the cache after each success.
pub async fn watch(ctx: &AppContext, interval: Option<&str>, initial_sync: bool) -> Result<()> {
    let every = match interval {
        Some(s) => Duration::from_secs(parse_interval(s).map_err(BrookError::Config)?),
        None => ctx.config.sync.background_interval,
    };

    let (tx, mut attempts) = mpsc::unbounded_channel::<SyncAttempt>();
    let handle = BackgroundSync::new(ctx.coordinator.clone(), every)
        .sync_on_start(initial_sync)
        .with_listener(tx)
        .spawn();

    println!(
        "Syncing every {} (ctrl-c to stop)",
        format_interval(every.as_secs())
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            attempt = attempts.recv() => {
                let Some(attempt) = attempt else { break };
                if attempt.status == SyncStatus::Failed {
                    eprintln!("Background sync {} failed", attempt.sync_id);
                    continue;
                }
                if let Err(e) = ctx.persist() {
                    tracing::warn!("Failed to save offline cache: {}", e);
                }
                print_attempt(&attempt);
            }
        }
    }

    handle.shutdown().await;
    println!("Stopped");
    Ok(())
}

/// Shows an article and keeps it "open" until it is marked read or the user
/// leaves with ctrl-c.
pub async fn read_article(ctx: &AppContext, article_id: &str) -> Result<()> {
    let article = ctx
        .cache
        .article(article_id)
        .ok_or_else(|| BrookError::ArticleNotFound(article_id.to_string()))?;

    println!("{}", article.display_title());
    if let Some(link) = &article.link {
        println!("{}", link);
    }
    if let Some(summary) = &article.summary {
        println!("\n{}\n", summary);
    }

    if article.is_read {
        return Ok(());
    }

    ctx.reader.start(article.id.clone());
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            ctx.reader.cancel();
            println!("Closed before it was marked read");
        }
        _ = wait_until_idle(ctx) => {
            match ctx.reader.last_fire() {
                Some(fire) if fire.article_id == article.id && fire.marked => {
                    println!("Marked as read")
                }
                _ => eprintln!("Could not mark the article as read"),
            }
        }
    }

    Ok(())
}

async fn wait_until_idle(ctx: &AppContext) {
    while ctx.reader.is_active() {
        tokio::time::sleep(READ_POLL_INTERVAL).await;
    }
}

/// Prints toasts until every sender is gone.
pub async fn print_notifications(mut rx: mpsc::UnboundedReceiver<Notification>) {
    while let Some(notification) = rx.recv().await {
        let retry = if notification.retry.is_some() {
            " (retry with `brook sync`)"
        } else {
            ""
        };
        match notification.kind {
            NotificationKind::Error => eprintln!("error: {}{}", notification.message, retry),
            NotificationKind::Info | NotificationKind::Success => {
                println!("{}", notification.message)
            }
        }
    }
}

fn print_attempt(attempt: &SyncAttempt) {
    let m = &attempt.metrics;
    println!(
        "Sync {} {:?}: {} new, {} deleted, {} new tags, {} failed feeds",
        attempt.sync_id, attempt.status, m.new_articles, m.deleted_articles, m.new_tags, m.failed_feeds
    );
}

fn article_line(article: &Article) -> String {
    let read_marker = if article.is_read { " " } else { "●" };
    let date = article
        .published_at
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "          ".to_string());
    format!(
        "{} {} {}  [{}]",
        read_marker,
        date,
        article.display_title(),
        article.id
    )
}
