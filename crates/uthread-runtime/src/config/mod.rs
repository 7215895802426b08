//! uthread Configuration
//!
//! Provides compile-time defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Environment variables (runtime)
//! 2. User's uthread_config.rs (compile-time, via `UTHREAD_CONFIG_RS`)
//! 3. Library defaults
//!
//! # Example
//!
//! ```rust,ignore
//! use uthread_runtime::config::SchedulerConfig;
//!
//! // Use defaults with env overrides
//! let config = SchedulerConfig::from_env();
//!
//! // Or customize programmatically
//! let config = SchedulerConfig::from_env()
//!     .max_threads(16)
//!     .quantum(Duration::from_millis(5));
//! ```

pub mod defaults;

use std::time::Duration;
use uthread_core::constants::MIN_STACK_SIZE;
use uthread_core::env::{env_get, env_get_bool, env_get_opt};
use uthread_core::SchedError;

/// Which clock drives quantum expiry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerClock {
    /// Process virtual (user CPU) time; SIGVTALRM
    Virtual,
    /// Wall-clock time; SIGALRM
    Real,
}

impl TimerClock {
    /// Parse `virtual` / `real` (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "virtual" | "virt" | "vt" => Some(TimerClock::Virtual),
            "real" | "wall" => Some(TimerClock::Real),
            _ => None,
        }
    }
}

impl std::fmt::Display for TimerClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerClock::Virtual => write!(f, "virtual"),
            TimerClock::Real => write!(f, "real"),
        }
    }
}

/// Scheduler configuration with builder pattern.
///
/// Use `from_env()` to start with compile-time defaults and apply
/// any environment variable overrides.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Size of the thread table, main thread included
    pub max_threads: usize,
    /// Usable stack size per spawned thread (guard page excluded)
    pub stack_size: usize,
    /// Quantum length
    pub quantum: Duration,
    /// Clock the interval timer counts
    pub timer_clock: TimerClock,
    /// Enable debug logging
    pub debug_logging: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl SchedulerConfig {
    /// Create config from compile-time defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `UTHREAD_MAX_THREADS` - Thread table size
    /// - `UTHREAD_STACK_SIZE` - Stack size per spawned thread
    /// - `UTHREAD_QUANTUM_USECS` - Quantum in microseconds
    /// - `UTHREAD_TIMER_CLOCK` - `virtual` or `real`
    /// - `UTHREAD_DEBUG` - Enable debug logging (0/1)
    pub fn from_env() -> Self {
        let default_clock = if defaults::VIRTUAL_CLOCK {
            TimerClock::Virtual
        } else {
            TimerClock::Real
        };

        Self {
            max_threads: env_get("UTHREAD_MAX_THREADS", defaults::MAX_THREADS),
            stack_size: env_get("UTHREAD_STACK_SIZE", defaults::STACK_SIZE),
            quantum: Duration::from_micros(env_get(
                "UTHREAD_QUANTUM_USECS",
                defaults::QUANTUM_USECS,
            )),
            timer_clock: env_get_opt::<String>("UTHREAD_TIMER_CLOCK")
                .and_then(|s| TimerClock::parse(&s))
                .unwrap_or(default_clock),
            debug_logging: env_get_bool("UTHREAD_DEBUG", defaults::DEBUG_LOGGING),
        }
    }

    /// Create config with explicit defaults (no env override).
    /// Useful for testing or when you want full control.
    pub fn new() -> Self {
        Self {
            max_threads: defaults::MAX_THREADS,
            stack_size: defaults::STACK_SIZE,
            quantum: Duration::from_micros(defaults::QUANTUM_USECS),
            timer_clock: if defaults::VIRTUAL_CLOCK {
                TimerClock::Virtual
            } else {
                TimerClock::Real
            },
            debug_logging: defaults::DEBUG_LOGGING,
        }
    }

    // Builder methods

    pub fn max_threads(mut self, n: usize) -> Self {
        self.max_threads = n;
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = size;
        self
    }

    pub fn quantum(mut self, d: Duration) -> Self {
        self.quantum = d;
        self
    }

    pub fn quantum_usecs(mut self, usecs: u64) -> Self {
        self.quantum = Duration::from_micros(usecs);
        self
    }

    pub fn timer_clock(mut self, clock: TimerClock) -> Self {
        self.timer_clock = clock;
        self
    }

    pub fn debug_logging(mut self, enable: bool) -> Self {
        self.debug_logging = enable;
        self
    }

    /// Validate configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_threads == 0 {
            return Err(ConfigError::InvalidValue("max_threads must be > 0"));
        }
        if self.max_threads > u32::MAX as usize - 1 {
            return Err(ConfigError::InvalidValue("max_threads does not fit a thread id"));
        }
        if self.stack_size < MIN_STACK_SIZE {
            return Err(ConfigError::InvalidValue("stack_size must be >= 16KB"));
        }
        if self.quantum < Duration::from_micros(1) {
            return Err(ConfigError::InvalidValue("quantum must be >= 1us"));
        }
        Ok(())
    }

    /// Print configuration (for debugging)
    pub fn print(&self) {
        eprintln!("uthread Configuration:");
        eprintln!("  max_threads:    {}", self.max_threads);
        eprintln!("  stack_size:     {}", self.stack_size);
        eprintln!("  quantum:        {:?}", self.quantum);
        eprintln!("  timer_clock:    {}", self.timer_clock);
        eprintln!("  debug_logging:  {}", self.debug_logging);
    }
}

/// Configuration error
#[derive(Debug, Clone)]
pub enum ConfigError {
    InvalidValue(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for SchedError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::InvalidValue(msg) => SchedError::InvalidInput(msg),
        }
    }
}
