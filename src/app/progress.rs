use crate::history::{Chat, Principal};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::Duration;

/// Observer for archive progress. Every hook defaults to doing nothing.
pub trait Progress: Send + Sync {
    fn logged_in(&self, _principal: &Principal) {}

    fn channel_resolved(&self, _chat: &Chat, _dir: &Path) {}

    fn fetching(&self, _offset: Option<i32>) {}

    fn fetched(&self, _count: usize) {}

    fn group_saved(&self, _id: i32, _date: DateTime<Utc>, _files: usize, _elapsed: Duration) {}

    fn group_deferred(&self, _max_id: i32) {}

    /// The remote history has no more older messages.
    fn complete(&self, _archived: usize) {}

    fn cancelled(&self, _archived: usize) {}
}

/// Reports nothing.
#[cfg(test)]
pub struct Silent;

#[cfg(test)]
impl Progress for Silent {}
