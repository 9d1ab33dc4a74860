//! Wall-clock profiling of pipeline stages

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProfileStats {
    pub count: u32,
    pub total: Duration,
    pub min: Duration,
    pub max: Duration,
}

impl ProfileStats {
    fn record(&mut self, elapsed: Duration) {
        if self.count == 0 || elapsed < self.min {
            self.min = elapsed;
        }
        if elapsed > self.max {
            self.max = elapsed;
        }
        self.count += 1;
        self.total += elapsed;
    }

    pub fn mean(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            self.total / self.count
        }
    }
}

/// Accumulates durations per label
#[derive(Debug)]
pub struct Profiler {
    name: String,
    stats: BTreeMap<String, ProfileStats>,
    running: Option<(String, Instant)>,
}

impl Profiler {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stats: BTreeMap::new(),
            running: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start timing `label`. A measurement already running is discarded.
    pub fn start(&mut self, label: &str) {
        if let Some((previous, _)) = self.running.take() {
            log::warn!("{}: '{}' was never stopped", self.name, previous);
        }
        self.running = Some((label.to_string(), Instant::now()));
    }

    /// Stop the running measurement and return its duration
    pub fn stop(&mut self) -> Option<Duration> {
        let (label, started) = self.running.take()?;
        let elapsed = started.elapsed();
        self.record(&label, elapsed);
        Some(elapsed)
    }

    /// Time a closure under `label`
    pub fn measure<T>(&mut self, label: &str, f: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let out = f();
        self.record(label, started.elapsed());
        out
    }

    pub fn record(&mut self, label: &str, elapsed: Duration) {
        self.stats.entry(label.to_string()).or_default().record(elapsed);
    }

    pub fn stats(&self, label: &str) -> Option<&ProfileStats> {
        self.stats.get(label)
    }

    /// Log a summary of every label, then clear it
    pub fn print_profiling_result(&mut self) {
        if self.stats.is_empty() {
            log::info!("{}: no profiling data", self.name);
            return;
        }
        log::info!("Profile for {}:", self.name);
        for (label, s) in &self.stats {
            log::info!(
                "  {}: count={} mean={:?} min={:?} max={:?} total={:?}",
                label,
                s.count,
                s.mean(),
                s.min,
                s.max,
                s.total
            );
        }
        self.stats.clear();
    }
}
