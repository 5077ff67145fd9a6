//! `parley demo` — a scripted live-view session against an in-memory feed.
//!
//! Walks the whole pipeline end to end: roster bind, chatroom bind,
//! live deltas (including obfuscated profanity), a pin, a search, an
//! edit, and a removal, printing the projected viewport after each step.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use parley_config::AppConfig;
use parley_core::{CollectionRef, EventBus, Record, RecordKey};
use parley_feed::MemoryFeed;
use parley_session::{ChatFormatter, FeedBinding, RetryPolicy, RoomRoster, SessionContext,
    UserProfile};
use parley_view::Formatter;
use tracing::info;

/// Let the delta pumps drain before reading the view back.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

async fn show(title: &str, binding: &FeedBinding, formatter: &dyn Formatter, height: i32,
    query: &str, pin: char)
{
    let projection = binding.render(formatter, height, query, pin).await;
    println!("--- {title} ---");
    for line in projection.lines() {
        println!("{line}");
    }
    println!();
}

pub async fn run(height_override: Option<i32>) -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    let height = height_override.unwrap_or_else(|| config.view.viewport_height.min(8));
    let pin = config.view.pin_glyph;

    let feed = Arc::new(MemoryFeed::new());
    let events = Arc::new(EventBus::default());

    // Remote state: one chatroom with two participants.
    let chatrooms = CollectionRef::chatrooms();
    feed.seed(
        &chatrooms,
        vec![Record::new("r1").with_field("chatroom_name", "General")],
    )
    .await;

    let mut ctx = SessionContext::log_in(UserProfile::new("u1", "alice", "Alice"));
    info!(user = %ctx.user().username, "logged in");

    let mut roster = RoomRoster::new(feed.clone(), events.clone());
    roster.start().await.context("binding chatroom roster")?;
    for (id, name) in roster.rooms().await {
        println!("chatroom {id}: {name}");
    }
    println!();

    let messages = ctx.enter_chatroom("r1".into());
    feed.create_collection(&messages).await;

    let mut binding = FeedBinding::new(feed.clone(), events.clone())
        .with_membership_source(feed.clone())
        .with_required_fields(["sender_id", "text"])
        .with_filler_glyph(config.view.filler_glyph.clone())
        .with_retry(RetryPolicy {
            attempts: config.feed.retry_attempts,
            backoff: Duration::from_millis(config.feed.retry_backoff_ms),
        });
    binding.bind(messages.clone()).await.context("binding chatroom messages")?;

    let formatter = ChatFormatter::for_session(&ctx)
        .with_participant("u1", "Alice")
        .with_participant("u2", "Bob")
        .with_censorship(config.censor.enabled);

    show("empty room", &binding, &formatter, height, "", pin).await;

    feed.add_record(&messages, Record::message("m1", "u2", "morning Alice")).await;
    feed.add_record(&messages, Record::message("m2", "u1", "morning Bob")).await;
    feed.add_record(&messages, Record::message("m3", "u2", "this deploy is bullshit")).await;
    feed.add_record(&messages, Record::message("m4", "u2", "f u c k")).await;
    settle().await;
    show("live messages (censored)", &binding, &formatter, height, "", pin).await;

    feed.set_membership(&messages, HashSet::from([RecordKey::from("m1")])).await;
    settle().await;
    show("m1 pinned", &binding, &formatter, height, "", pin).await;

    show("search: \"morning\"", &binding, &formatter, height, "morning", pin).await;

    feed.modify_record(&messages, Record::message("m3", "u2", "the deploy recovered")).await;
    feed.remove_record(&messages, &"m4".into()).await;
    settle().await;
    show("after edit and removal", &binding, &formatter, height, "", pin).await;

    binding.unbind().await;
    roster.stop().await;
    ctx.leave_chatroom();
    info!("logged out");
    Ok(())
}
