//! Display-width measurement and the memoizing cache in front of it.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::ansi::{self, Token};

pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

static GLOBAL_CACHE: Lazy<Arc<WidthCache>> =
    Lazy::new(|| Arc::new(WidthCache::new(DEFAULT_CACHE_CAPACITY)));

/// The process-wide cache used by tables that were not handed their own.
pub fn global_cache() -> Arc<WidthCache> {
    Arc::clone(&GLOBAL_CACHE)
}

/// Number of terminal columns `text` occupies.
///
/// Escape sequences count as zero, East-Asian wide glyphs as two.
pub fn display_width(text: &str) -> usize {
    ansi::tokens(text)
        .map(|token| match token {
            Token::Escape(_) => 0,
            Token::Text(run) => run.chars().map(ansi::char_width).sum(),
        })
        .sum()
}

/// Widest physical line of `text` when split on embedded newlines.
pub fn widest_line(text: &str, cache: &WidthCache) -> usize {
    text.lines()
        .map(|line| cache.measure(line))
        .max()
        .unwrap_or(0)
}

/// Bounded LRU memo of `display_width`. Safe to share between threads.
pub struct WidthCache {
    inner: Mutex<LruState>,
}

struct LruState {
    capacity: usize,
    tick: u64,
    entries: HashMap<String, (usize, u64)>,
    order: BTreeMap<u64, String>,
}

impl LruState {
    fn touch(&mut self, key: &str) -> Option<usize> {
        self.tick += 1;
        let tick = self.tick;
        let (width, stamp) = self.entries.get_mut(key)?;
        let previous = std::mem::replace(stamp, tick);
        let width = *width;
        if let Some(owned) = self.order.remove(&previous) {
            self.order.insert(tick, owned);
        }
        Some(width)
    }

    fn evict_to(&mut self, capacity: usize) {
        while self.entries.len() > capacity {
            let Some((_, oldest)) = self.order.pop_first() else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }
}

impl WidthCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruState {
                capacity,
                tick: 0,
                entries: HashMap::with_capacity(capacity.min(DEFAULT_CACHE_CAPACITY)),
                order: BTreeMap::new(),
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<usize> {
        self.inner.lock().touch(key)
    }

    pub fn put(&self, key: impl Into<String>, width: usize) {
        let key = key.into();
        let mut state = self.inner.lock();
        if state.capacity == 0 {
            return;
        }
        state.tick += 1;
        let tick = state.tick;
        if let Some((_, stamp)) = state.entries.insert(key.clone(), (width, tick)) {
            state.order.remove(&stamp);
        }
        state.order.insert(tick, key);
        let capacity = state.capacity;
        state.evict_to(capacity);
    }

    pub fn purge(&self) {
        let mut state = self.inner.lock();
        state.entries.clear();
        state.order.clear();
    }

    /// Changes the capacity, evicting least-recently-used entries if needed.
    pub fn resize(&self, capacity: usize) {
        let mut state = self.inner.lock();
        state.capacity = capacity;
        state.evict_to(capacity);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    /// Memoized `display_width`.
    pub fn measure(&self, text: &str) -> usize {
        // Plain ASCII is cheaper to count than to look up.
        if text.is_ascii() && !ansi::has_escapes(text) {
            return text.bytes().filter(|b| !b.is_ascii_control()).count();
        }
        if let Some(width) = self.get(text) {
            return width;
        }
        let width = display_width(text);
        self.put(text, width);
        width
    }
}

impl Default for WidthCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl std::fmt::Debug for WidthCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("WidthCache")
            .field("capacity", &state.capacity)
            .field("len", &state.entries.len())
            .finish()
    }
}
