//! Build context for mesh generation: log records, per-phase timers and counters
//!
//! Every message recorded here is also forwarded to the `log` facade, so a
//! host that installs a logger sees generation progress without reading the
//! context back.

use std::collections::HashMap;
use std::time::Duration;
use web_time::Instant;

/// Severity of a recorded message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warning = 2,
    Error = 3,
}

impl LogLevel {
    fn as_log_level(self) -> log::Level {
        match self {
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warning => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}

/// Generation phases that get their own timer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimerCategory {
    /// Whole `generate` call
    Total,
    /// Clipping collision leaves into nodes
    HullLeaves,
    /// Building the spatial index
    Octree,
    /// Face linking and the leaf map
    Linking,
    /// Ladder and teleport nodes
    EntityLinks,
    /// Walkable anchors
    Origins,
    /// Link cost classification
    PathCosts,
    /// Clipping brush entity models
    SolidEntities,
    /// Re-splitting leaves around moved entities
    EntitySplit,
    Custom(String),
}

/// Progress of the phase currently running
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    pub current: usize,
    pub total: usize,
    pub description: String,
}

/// One recorded message
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub timestamp: Instant,
    pub message: String,
}

/// Accumulated time for one phase
#[derive(Debug, Clone)]
pub struct TimerEntry {
    pub category: TimerCategory,
    /// When the phase first ran
    pub start_time: Instant,
    pub duration: Duration,
    /// Number of completed start/stop pairs
    pub count: usize,
}

/// Collects what happened during one or more generation passes
#[derive(Debug)]
pub struct BuildContext {
    logs: Vec<LogEntry>,
    active_timers: HashMap<TimerCategory, Instant>,
    timers: HashMap<TimerCategory, TimerEntry>,
    counters: HashMap<String, usize>,
    progress: Option<ProgressInfo>,
    min_log_level: LogLevel,
    enable_timing: bool,
    max_log_entries: usize,
}

impl Default for BuildContext {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildContext {
    pub fn new() -> Self {
        Self {
            logs: Vec::new(),
            active_timers: HashMap::new(),
            timers: HashMap::new(),
            counters: HashMap::new(),
            progress: None,
            min_log_level: LogLevel::Info,
            enable_timing: true,
            max_log_entries: 1000,
        }
    }

    pub fn set_log_level(&mut self, level: LogLevel) {
        self.min_log_level = level;
    }

    pub fn set_timing_enabled(&mut self, enabled: bool) {
        self.enable_timing = enabled;
    }

    /// Oldest entries are dropped once this many are recorded
    pub fn set_max_log_entries(&mut self, max_entries: usize) {
        self.max_log_entries = max_entries;
    }

    pub fn log_debug(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    pub fn log_info(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn log_warning(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    pub fn log_error(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        log::log!(target: "leafnav_gen", level.as_log_level(), "{}", message);

        if level < self.min_log_level {
            return;
        }
        self.logs.push(LogEntry {
            level,
            timestamp: Instant::now(),
            message,
        });
        if self.logs.len() > self.max_log_entries {
            let excess = self.logs.len() - self.max_log_entries;
            self.logs.drain(..excess);
        }
    }

    pub fn start_timer(&mut self, category: TimerCategory) {
        if self.enable_timing {
            self.active_timers.insert(category, Instant::now());
        }
    }

    /// Stops a running timer and adds its elapsed time to the phase total
    pub fn stop_timer(&mut self, category: TimerCategory) {
        if !self.enable_timing {
            return;
        }
        let Some(start_time) = self.active_timers.remove(&category) else {
            return;
        };
        let elapsed = start_time.elapsed();
        let entry = self.timers.entry(category.clone()).or_insert(TimerEntry {
            category,
            start_time,
            duration: Duration::ZERO,
            count: 0,
        });
        entry.duration += elapsed;
        entry.count += 1;
    }

    pub fn get_timer_duration(&self, category: &TimerCategory) -> Option<Duration> {
        self.timers.get(category).map(|entry| entry.duration)
    }

    pub fn get_timer_count(&self, category: &TimerCategory) -> usize {
        self.timers.get(category).map_or(0, |entry| entry.count)
    }

    pub fn get_timers(&self) -> &HashMap<TimerCategory, TimerEntry> {
        &self.timers
    }

    /// Adds `amount` to a named counter
    pub fn add_count(&mut self, name: &str, amount: usize) {
        *self.counters.entry(name.to_string()).or_insert(0) += amount;
    }

    pub fn get_count(&self, name: &str) -> usize {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn set_progress(&mut self, current: usize, total: usize, description: impl Into<String>) {
        self.progress = Some(ProgressInfo {
            current,
            total,
            description: description.into(),
        });
    }

    pub fn clear_progress(&mut self) {
        self.progress = None;
    }

    pub fn get_progress(&self) -> Option<&ProgressInfo> {
        self.progress.as_ref()
    }

    pub fn get_logs(&self) -> &[LogEntry] {
        &self.logs
    }

    pub fn get_logs_by_level(&self, level: LogLevel) -> Vec<&LogEntry> {
        self.logs.iter().filter(|entry| entry.level == level).collect()
    }

    /// Clears logs, timers, counters and progress
    pub fn reset(&mut self) {
        self.logs.clear();
        self.active_timers.clear();
        self.timers.clear();
        self.counters.clear();
        self.progress = None;
    }

    /// Prints phase timings, slowest first, followed by the counters
    pub fn print_timer_summary(&self) {
        println!("=== Leaf mesh generation ===");

        let mut sorted: Vec<_> = self.timers.values().collect();
        sorted.sort_by(|a, b| b.duration.cmp(&a.duration));
        for entry in sorted {
            let ms = entry.duration.as_secs_f64() * 1000.0;
            println!(
                "{:16} {:9.2}ms ({} runs, avg {:.2}ms)",
                format!("{:?}", entry.category),
                ms,
                entry.count,
                ms / entry.count.max(1) as f64
            );
        }

        let mut counters: Vec<_> = self.counters.iter().collect();
        counters.sort();
        for (name, value) in counters {
            println!("{:16} {:>9}", name, value);
        }
    }
}
