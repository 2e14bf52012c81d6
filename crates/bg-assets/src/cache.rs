//! Memoized, bounded sample cache with a background loader thread.
//!
//! The scheduler hot path never blocks on I/O: [`SampleCache::get`] is
//! a lock-and-lookup, and [`SampleCache::request`] enqueues a load on
//! the loader thread. A URL has at most one load in flight; a failed
//! load is logged and forgotten so a later request can retry. Entries
//! are evicted least-recently-used once `capacity` is exceeded.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Sender};
use log::{debug, warn};
use parking_lot::Mutex;

use crate::sample::{decode_wav, DecodedSample};
use crate::source::SampleSource;
use crate::AssetError;

/// Default maximum number of cached samples.
pub const DEFAULT_CAPACITY: usize = 64;

struct Entry {
    sample: Arc<DecodedSample>,
    last_used: u64,
}

#[derive(Default)]
struct Entries {
    map: HashMap<String, Entry>,
    in_flight: HashSet<String>,
    /// Monotonic use counter for LRU ordering.
    tick: u64,
}

struct Shared {
    source: Arc<dyn SampleSource>,
    entries: Mutex<Entries>,
    capacity: usize,
}

/// Cloneable handle to the shared sample cache.
#[derive(Clone)]
pub struct SampleCache {
    shared: Arc<Shared>,
    loader: Sender<String>,
}

impl SampleCache {
    /// Create a cache over `source`, spawning the loader thread.
    ///
    /// The thread exits when the last cache handle is dropped.
    pub fn new(source: Arc<dyn SampleSource>, capacity: usize) -> Self {
        let shared = Arc::new(Shared {
            source,
            entries: Mutex::new(Entries::default()),
            capacity: capacity.max(1),
        });

        let (tx, rx) = unbounded::<String>();
        let worker_shared = Arc::downgrade(&shared);
        std::thread::Builder::new()
            .name("sample-loader".into())
            .spawn(move || {
                for url in rx.iter() {
                    let Some(shared) = worker_shared.upgrade() else { break };
                    load_into(&shared, &url);
                }
            })
            .expect("spawn sample loader thread");

        Self { shared, loader: tx }
    }

    /// Cached sample for `url`, if already decoded. Touches LRU state.
    pub fn get(&self, url: &str) -> Option<Arc<DecodedSample>> {
        let mut entries = self.shared.entries.lock();
        entries.tick += 1;
        let tick = entries.tick;
        let entry = entries.map.get_mut(url)?;
        entry.last_used = tick;
        Some(entry.sample.clone())
    }

    /// Ask the loader thread to fetch and decode `url`.
    ///
    /// No-op when the sample is already cached or a load is in flight.
    pub fn request(&self, url: &str) {
        {
            let mut entries = self.shared.entries.lock();
            if entries.map.contains_key(url) || !entries.in_flight.insert(url.to_string()) {
                return;
            }
        }
        // Loader gone only during teardown; the in-flight mark is moot then.
        let _ = self.loader.send(url.to_string());
    }

    /// Fetch and decode synchronously (offline rendering, preloading).
    pub fn load_blocking(&self, url: &str) -> Result<Arc<DecodedSample>, AssetError> {
        if let Some(sample) = self.get(url) {
            return Ok(sample);
        }
        let result = fetch_decode(&self.shared.source, url);
        finish_load(&self.shared, url, &result);
        result
    }

    /// Number of cached (decoded) entries.
    pub fn len(&self) -> usize {
        self.shared.entries.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, url: &str) -> bool {
        self.shared.entries.lock().map.contains_key(url)
    }
}

fn fetch_decode(
    source: &Arc<dyn SampleSource>,
    url: &str,
) -> Result<Arc<DecodedSample>, AssetError> {
    let bytes = source.fetch(url)?;
    let sample = decode_wav(&bytes)?;
    debug!(
        "decoded sample {url}: {} frames @ {} Hz",
        sample.frames(),
        sample.sample_rate()
    );
    Ok(Arc::new(sample))
}

fn load_into(shared: &Arc<Shared>, url: &str) {
    let result = fetch_decode(&shared.source, url);
    finish_load(shared, url, &result);
}

fn finish_load(shared: &Shared, url: &str, result: &Result<Arc<DecodedSample>, AssetError>) {
    let mut entries = shared.entries.lock();
    entries.in_flight.remove(url);
    match result {
        Ok(sample) => {
            entries.tick += 1;
            let tick = entries.tick;
            entries.map.insert(
                url.to_string(),
                Entry {
                    sample: sample.clone(),
                    last_used: tick,
                },
            );
            while entries.map.len() > shared.capacity {
                let Some(oldest) = entries
                    .map
                    .iter()
                    .min_by_key(|(_, e)| e.last_used)
                    .map(|(k, _)| k.clone())
                else {
                    break;
                };
                debug!("evicting sample {oldest}");
                entries.map.remove(&oldest);
            }
        }
        Err(e) => {
            // Leave the URL unpopulated so a later request can retry.
            warn!("failed to load sample {url}: {e}");
        }
    }
}
