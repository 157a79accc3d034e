use tokio::io::{AsyncBufReadExt, BufReader};

use crate::app::{AppContext, FeedSession, LoadOutcome, Result};
use crate::domain::{DeepLink, Notification};
use crate::mutation::MutationOutcome;
use crate::realtime::parse_event;
use crate::store::FeedState;

pub async fn list(ctx: &AppContext, pages: u32) -> Result<()> {
    ctx.session.load_initial().await?;
    for _ in 1..pages {
        if ctx.session.load_more().await? != LoadOutcome::Applied {
            break;
        }
    }

    print_feed(&ctx.session.state());
    if ctx.session.cursor().has_more() {
        println!("(more available, use --pages to load further)");
    }
    Ok(())
}

pub async fn mark_seen(ctx: &AppContext, id: &str) -> Result<()> {
    load_until_present(&ctx.session, id).await?;
    report(ctx.session.mark_seen(id).await, &format!("Marked {} as seen", id))
}

pub async fn delete(ctx: &AppContext, id: &str) -> Result<()> {
    load_until_present(&ctx.session, id).await?;
    report(ctx.session.delete(id).await, &format!("Deleted {}", id))
}

pub async fn clear_all(ctx: &AppContext) -> Result<()> {
    ctx.session.load_initial().await?;
    let before = ctx.session.state().len();
    report(
        ctx.session.clear_all().await,
        &format!("Cleared {} loaded notifications", before),
    )
}

pub async fn watch(ctx: &AppContext) -> Result<()> {
    ctx.session.load_initial().await?;
    let state = ctx.session.state();
    println!(
        "Watching {} notifications ({} unseen). Reading pushes from stdin...",
        state.len(),
        state.unseen_count()
    );

    let (handle, task) = ctx.session.spawn_realtime();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_event(line) {
            Ok(notification) => handle.push(notification).await,
            Err(e) => tracing::warn!("Ignoring malformed push: {}", e),
        }
    }

    handle.shutdown().await;
    match task.await {
        Ok(stats) => println!(
            "Merged pushes: {} new, {} moved, {} duplicate, {} filtered",
            stats.inserted, stats.moved, stats.duplicates, stats.filtered
        ),
        Err(e) => tracing::error!("Realtime merger task failed: {}", e),
    }

    print_feed(&ctx.session.state());
    Ok(())
}

/// Page through the feed until `id` is loaded or there is nothing left.
async fn load_until_present(session: &FeedSession, id: &str) -> Result<()> {
    session.load_initial().await?;
    while !session.state().contains(id) {
        if session.load_more().await? != LoadOutcome::Applied {
            break;
        }
    }
    Ok(())
}

fn report(result: Result<MutationOutcome>, done: &str) -> Result<()> {
    match result {
        Ok(MutationOutcome::Committed) => {
            println!("{}", done);
            Ok(())
        }
        Ok(MutationOutcome::Skipped) => {
            println!("Nothing to do: notification is not in the feed or already seen");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn print_feed(state: &FeedState) {
    if state.is_empty() {
        println!("No notifications");
        return;
    }

    println!("Unseen: {}", state.unseen_count());
    for notification in state.iter() {
        println!("{}", format_line(notification));
    }
}

fn format_line(notification: &Notification) -> String {
    let marker = if notification.seen { " " } else { "*" };
    let target = match notification.deep_link() {
        DeepLink::Post(id) => format!("post/{}", id),
        DeepLink::Profile(id) => format!("profile/{}", id),
    };
    format!(
        "{} {}  {}  {}: {}  -> {}",
        marker,
        notification.timestamp.format("%Y-%m-%d %H:%M"),
        notification.id,
        notification.sender.name,
        notification.display_text(),
        target
    )
}
