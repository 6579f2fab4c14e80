use crate::{
    shape::MAX_RANK,
    tiling::{DEFAULT_MAX_PARALLEL_RANK, TILE_HINTS},
    Error, Result,
};

/// Environment variable read by [`CpuConfig::from_env`].
pub const NUM_THREADS_ENV: &str = "NDFFT_NUM_THREADS";

/// How many worker threads a host device runs kernels on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerPolicy {
    /// Share rayon's global pool (sized by `RAYON_NUM_THREADS` or the core count).
    #[default]
    Global,
    /// A dedicated pool with exactly this many threads.
    Exact(usize),
    /// A dedicated pool with one thread per logical core.
    Logical,
    /// A dedicated pool with one thread per physical core.
    Physical,
}

impl WorkerPolicy {
    /// Thread count of a dedicated pool, or `None` for the global pool.
    pub fn resolve(self) -> Result<Option<usize>> {
        match self {
            Self::Global => Ok(None),
            Self::Exact(0) => Err(Error::InvalidConfig(
                "worker policy Exact(0) requests a pool without threads".to_string(),
            )
            .bt()),
            Self::Exact(n) => Ok(Some(n)),
            Self::Logical => Ok(Some(num_cpus::get())),
            Self::Physical => Ok(Some(num_cpus::get_physical())),
        }
    }
}

/// Settings for a host execution device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuConfig {
    pub workers: WorkerPolicy,
    /// Leading axes distributed over worker threads; the rest run
    /// sequentially inside each work unit.
    pub max_parallel_rank: usize,
    /// Tile sizes, indexed by `rank - 1`.
    pub tile_hints: [[usize; MAX_RANK]; MAX_RANK],
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            workers: WorkerPolicy::Global,
            max_parallel_rank: DEFAULT_MAX_PARALLEL_RANK,
            tile_hints: TILE_HINTS,
        }
    }
}

impl CpuConfig {
    /// Default configuration, with the worker count taken from
    /// `NDFFT_NUM_THREADS` when it is set.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(value) = std::env::var(NUM_THREADS_ENV) {
            let n = value.trim().parse::<usize>().map_err(|e| {
                Error::InvalidConfig(format!("{NUM_THREADS_ENV}={value:?}: {e}")).bt()
            })?;
            config.workers = WorkerPolicy::Exact(n);
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_workers(mut self, workers: WorkerPolicy) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub fn with_num_threads(self, n: usize) -> Self {
        self.with_workers(WorkerPolicy::Exact(n))
    }

    #[must_use]
    pub fn with_max_parallel_rank(mut self, rank: usize) -> Self {
        self.max_parallel_rank = rank;
        self
    }

    /// Override the tile sizes used for arrays of `rank` axes.
    #[must_use]
    pub fn with_tile_hint(mut self, rank: usize, tiles: [usize; MAX_RANK]) -> Self {
        if (1..=MAX_RANK).contains(&rank) {
            self.tile_hints[rank - 1] = tiles;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_RANK).contains(&self.max_parallel_rank) {
            return Err(Error::InvalidConfig(format!(
                "max_parallel_rank must be in 1..={MAX_RANK}, got {}",
                self.max_parallel_rank
            ))
            .bt());
        }
        if let Some(rank) = self
            .tile_hints
            .iter()
            .position(|tiles| tiles.contains(&0))
        {
            return Err(Error::InvalidConfig(format!(
                "tile hint for rank {} contains a zero tile",
                rank + 1
            ))
            .bt());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = CpuConfig::default();
        config.validate().unwrap();
        assert_eq!(config.workers, WorkerPolicy::Global);
        assert_eq!(config.max_parallel_rank, 6);
    }

    #[test]
    fn exact_zero_workers_is_rejected() {
        let err = WorkerPolicy::Exact(0).resolve().unwrap_err();
        assert!(matches!(err.inner(), Error::InvalidConfig(_)));
    }

    #[test]
    fn logical_workers_match_core_count() {
        assert_eq!(WorkerPolicy::Logical.resolve().unwrap(), Some(num_cpus::get()));
    }

    #[test]
    fn builder_overrides() {
        let config = CpuConfig::default()
            .with_num_threads(3)
            .with_max_parallel_rank(8)
            .with_tile_hint(2, [8, 2, 1, 1, 1, 1, 1, 1]);
        config.validate().unwrap();
        assert_eq!(config.workers, WorkerPolicy::Exact(3));
        assert_eq!(config.tile_hints[1][..2], [8, 2]);
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(CpuConfig::default()
            .with_max_parallel_rank(0)
            .validate()
            .is_err());
        assert!(CpuConfig::default()
            .with_tile_hint(3, [0; MAX_RANK])
            .validate()
            .is_err());
    }
}
