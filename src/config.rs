//! Sort engine settings.
//!
//! Defaults can be overridden through the environment, which is read once per process:
//!
//! * `PARTITION_SORT_STRATEGY`: `top_down`, `bottom_up` or `parallel`.
//! * `PARTITION_SORT_PARALLEL_MIN_LEN`: below this many elements the parallel strategy sorts on
//!   the calling thread.

use std::env;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::OnceCell;

/// Number of slices the parallel strategy fans out to.
pub const PARALLEL_WORKERS: usize = 8;

const DEFAULT_PARALLEL_MIN_LEN: usize = 1 << 14;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortStrategy {
    /// Recursive halving down to pairs.
    #[default]
    TopDown,
    /// Pairs first, then merge runs of doubling length.
    BottomUp,
    /// Eight slices sorted concurrently, then a fixed merge tournament.
    Parallel,
}

impl SortStrategy {
    pub const ALL: [SortStrategy; 3] = [Self::TopDown, Self::BottomUp, Self::Parallel];

    pub fn name(self) -> &'static str {
        match self {
            Self::TopDown => "top_down",
            Self::BottomUp => "bottom_up",
            Self::Parallel => "parallel",
        }
    }
}

impl fmt::Display for SortStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SortStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top_down" | "topdown" | "recursive" => Ok(Self::TopDown),
            "bottom_up" | "bottomup" | "iterative" => Ok(Self::BottomUp),
            "parallel" | "parallel8" => Ok(Self::Parallel),
            other => Err(format!("unknown sort strategy `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortConfig {
    pub strategy: SortStrategy,
    pub parallel_min_len: usize,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            strategy: SortStrategy::default(),
            parallel_min_len: DEFAULT_PARALLEL_MIN_LEN,
        }
    }
}

impl SortConfig {
    pub fn new(strategy: SortStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: SortStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_parallel_min_len(mut self, parallel_min_len: usize) -> Self {
        self.parallel_min_len = parallel_min_len;
        self
    }

    /// Defaults with the environment overrides applied. Read once and cached.
    pub fn from_env() -> Self {
        static FROM_ENV: OnceCell<SortConfig> = OnceCell::new();

        *FROM_ENV.get_or_init(|| {
            let mut config = SortConfig::default();

            if let Ok(val) = env::var("PARTITION_SORT_STRATEGY") {
                match SortStrategy::from_str(&val) {
                    Ok(strategy) => config.strategy = strategy,
                    Err(err) => log::warn!("ignoring PARTITION_SORT_STRATEGY: {err}"),
                }
            }

            if let Ok(val) = env::var("PARTITION_SORT_PARALLEL_MIN_LEN") {
                match usize::from_str(val.trim()) {
                    Ok(min_len) => config.parallel_min_len = min_len,
                    Err(err) => {
                        log::warn!("ignoring PARTITION_SORT_PARALLEL_MIN_LEN `{val}`: {err}")
                    }
                }
            }

            log::debug!("sort config from environment: {config:?}");
            config
        })
    }
}
