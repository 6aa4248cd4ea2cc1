//! Crawl queue construction from subscription and freshness state.

pub mod builder;

pub use builder::{CrawlPriority, QueueBuilder, QueueEntry, QueueMode, QueueStats};
