//! Selection among interchangeable execution endpoints

use rand::seq::IndexedRandom;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Picks one shard endpoint for a call
pub trait ShardSelector: Send + Sync {
    fn choose(&self, urls: &[String]) -> Option<String>;
}

/// Uniformly random choice, made independently for every call
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomShardSelector;

impl ShardSelector for RandomShardSelector {
    fn choose(&self, urls: &[String]) -> Option<String> {
        urls.choose(&mut rand::rng()).cloned()
    }
}

/// Always picks the shard at `index` (wrapping)
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedShardSelector {
    pub index: usize,
}

impl ShardSelector for FixedShardSelector {
    fn choose(&self, urls: &[String]) -> Option<String> {
        if urls.is_empty() {
            return None;
        }
        urls.get(self.index % urls.len()).cloned()
    }
}

/// Cycles through shards in order
#[derive(Debug, Default)]
pub struct RoundRobinShardSelector {
    next: AtomicUsize,
}

impl ShardSelector for RoundRobinShardSelector {
    fn choose(&self, urls: &[String]) -> Option<String> {
        if urls.is_empty() {
            return None;
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % urls.len();
        urls.get(index).cloned()
    }
}
