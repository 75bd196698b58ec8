//! Background refresh of the dashboard feed
//!
//! A tokio interval polls the feed; the feed itself decides whether its
//! refresh interval has elapsed.

use risk_engine::feed::SystemClock;
use risk_sources::AppContext;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

pub fn start_feed_refresh(ctx: Arc<AppContext>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = ctx.feed_interval().await;
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            if ctx.poll_feed(&SystemClock).await {
                debug!("Dashboard stats refreshed");
            }
        }
    })
}
