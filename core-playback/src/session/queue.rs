//! Track list, search filter and advance rules.
//!
//! Two index spaces exist: the global index into the full item list, and
//! the view index into the filtered subset the listener sees. Advance
//! decisions are made globally and then resolved into the view.

use crate::item::MediaItem;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniformly distributed indices for shuffle.
#[cfg_attr(test, mockall::automock)]
pub trait RandomSource: Send + Sync {
    /// Returns an index in `0..upper`. `upper` is never zero.
    fn next_index(&self, upper: usize) -> usize;
}

/// Thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngSource;

impl RandomSource for ThreadRngSource {
    fn next_index(&self, upper: usize) -> usize {
        rand::thread_rng().gen_range(0..upper)
    }
}

/// Deterministic RNG for reproducible shuffles.
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_index(&self, upper: usize) -> usize {
        self.rng.lock().gen_range(0..upper)
    }
}

/// Full item list plus the filtered view.
#[derive(Debug, Clone, Default)]
pub struct TrackQueue {
    items: Vec<MediaItem>,
    filter: String,
    view: Vec<usize>,
}

impl TrackQueue {
    pub fn new(items: Vec<MediaItem>) -> Self {
        let mut queue = Self::default();
        queue.set_items(items);
        queue
    }

    /// Replaces the item list and re-applies the current filter.
    pub fn set_items(&mut self, items: Vec<MediaItem>) {
        self.items = items;
        self.rebuild_view();
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, global: usize) -> Option<&MediaItem> {
        self.items.get(global)
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Case-insensitive substring match on title or identifier. Blank
    /// queries show everything.
    pub fn set_filter(&mut self, query: impl Into<String>) {
        self.filter = query.into();
        self.rebuild_view();
    }

    fn rebuild_view(&mut self) {
        let needle = self.filter.trim().to_lowercase();
        self.view = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| {
                needle.is_empty()
                    || item.title.to_lowercase().contains(&needle)
                    || item.id.as_str().to_lowercase().contains(&needle)
            })
            .map(|(global, _)| global)
            .collect();
    }

    pub fn view_len(&self) -> usize {
        self.view.len()
    }

    /// Items of the filtered view, in order.
    pub fn view(&self) -> impl Iterator<Item = &MediaItem> + '_ {
        self.view.iter().filter_map(|&global| self.items.get(global))
    }

    pub fn view_item(&self, view_index: usize) -> Option<&MediaItem> {
        self.global_index(view_index)
            .and_then(|global| self.items.get(global))
    }

    pub fn global_index(&self, view_index: usize) -> Option<usize> {
        self.view.get(view_index).copied()
    }

    pub fn view_index_of(&self, global: usize) -> Option<usize> {
        self.view.iter().position(|&g| g == global)
    }

    /// View position of `global`, or 0 when the item is filtered out.
    pub fn resolve_in_view(&self, global: usize) -> usize {
        self.view_index_of(global).unwrap_or(0)
    }

    /// Global index of the item that follows `current`.
    ///
    /// Shuffle draws from the full list, not from the view.
    pub fn next_global(
        &self,
        current: Option<usize>,
        shuffle: bool,
        random: &dyn RandomSource,
    ) -> Option<usize> {
        let len = self.items.len();
        if len == 0 {
            return None;
        }
        if shuffle {
            return Some(random.next_index(len).min(len - 1));
        }
        Some(current.map_or(0, |c| (c + 1) % len))
    }

    pub fn previous_global(&self, current: Option<usize>) -> Option<usize> {
        let len = self.items.len();
        if len == 0 {
            return None;
        }
        Some(current.map_or(0, |c| (c % len + len - 1) % len))
    }
}
