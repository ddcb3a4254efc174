// src/resources/allocator.rs

//! Memory-normalized thread allocation.
//!
//! A stage that scales with threads asks for some degree of parallelism and
//! states how much memory each thread needs. The allocator grants the
//! requested parallelism when it fits in the host budget, and otherwise
//! reduces it to what does fit. Granting zero threads is an error, never a
//! silent clamp to one.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::config::model::HostSection;
use crate::errors::{PlanError, Result};

/// Above this many requested threads, I/O-heavy stages leave two cores free.
pub const RESERVE_THRESHOLD: u32 = 12;

/// Cores held back by [`ThreadPolicy::AllCoresReserved`] above the threshold.
pub const RESERVED_CORES: u32 = 2;

/// Why a stage could not be granted any threads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceShortfall {
    #[error("requested 0 threads")]
    NoThreadsRequested,

    #[error(
        "mem_host_mb_available - mem_workflow_overhead = {available_mb} MB \
         ({host_mem_mb} - {overhead_mb}) is less than the {mem_per_thread_mb} MB needed per thread"
    )]
    InsufficientMemory {
        host_mem_mb: u64,
        overhead_mb: u64,
        available_mb: u64,
        mem_per_thread_mb: u64,
    },
}

impl ResourceShortfall {
    /// Attach the stage this shortfall was computed for.
    pub fn for_stage(self, stage: impl Into<String>) -> PlanError {
        PlanError::ResourceError {
            stage: stage.into(),
            shortfall: self,
        }
    }
}

/// Compute the usable thread count for a stage.
///
/// `available = host_mem_mb - overhead_mb`. If `available / requested_threads`
/// covers `mem_per_thread_mb` the request is granted as is; otherwise the
/// result is `floor(available / mem_per_thread_mb)`. Zero is an error.
pub fn normalize_threads(
    mem_per_thread_mb: u64,
    requested_threads: u32,
    host_mem_mb: u64,
    overhead_mb: u64,
) -> std::result::Result<u32, ResourceShortfall> {
    if requested_threads == 0 {
        return Err(ResourceShortfall::NoThreadsRequested);
    }

    let available_mb = host_mem_mb.saturating_sub(overhead_mb);
    let shortfall = || ResourceShortfall::InsufficientMemory {
        host_mem_mb,
        overhead_mb,
        available_mb,
        mem_per_thread_mb,
    };

    // A stage declaring no per-thread memory always fits.
    if mem_per_thread_mb == 0 {
        return Ok(requested_threads);
    }

    let usable = if available_mb / u64::from(requested_threads) >= mem_per_thread_mb {
        requested_threads
    } else {
        u32::try_from(available_mb / mem_per_thread_mb).map_err(|_| shortfall())?
    };

    if usable == 0 {
        return Err(shortfall());
    }
    Ok(usable)
}

/// How many threads a normalized stage asks for before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadPolicy {
    /// Every addressable core.
    AllCores,
    /// Every addressable core, less [`RESERVED_CORES`] once more than
    /// [`RESERVE_THRESHOLD`] are addressable.
    AllCoresReserved,
}

impl ThreadPolicy {
    pub fn requested(self, cores: u32) -> u32 {
        match self {
            ThreadPolicy::AllCores => cores,
            ThreadPolicy::AllCoresReserved if cores > RESERVE_THRESHOLD => cores - RESERVED_CORES,
            ThreadPolicy::AllCoresReserved => cores,
        }
    }
}

impl fmt::Display for ThreadPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadPolicy::AllCores => write!(f, "all cores"),
            ThreadPolicy::AllCoresReserved => write!(f, "all cores less I/O reserve"),
        }
    }
}

/// Threads and memory granted to one task of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageResources {
    pub threads: u32,
    pub memory_mb: u64,
}

impl StageResources {
    pub fn single(memory_mb: u64) -> Self {
        Self {
            threads: 1,
            memory_mb,
        }
    }
}

/// Host budget the allocator normalizes against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceAllocator {
    cores: u32,
    host_mem_mb: u64,
    overhead_mb: u64,
}

impl ResourceAllocator {
    pub fn new(cores: u32, host_mem_mb: u64, overhead_mb: u64) -> Self {
        Self {
            cores,
            host_mem_mb,
            overhead_mb,
        }
    }

    pub fn from_host(host: &HostSection) -> Self {
        Self::new(
            host.cores_addressable,
            host.mem_host_mb_available,
            host.mem_workflow_overhead,
        )
    }

    pub fn cores(&self) -> u32 {
        self.cores
    }

    /// Usable threads for `stage`, or a `ResourceError` naming it.
    pub fn normalize(&self, stage: &str, mem_per_thread_mb: u64, requested: u32) -> Result<u32> {
        normalize_threads(mem_per_thread_mb, requested, self.host_mem_mb, self.overhead_mb)
            .map_err(|shortfall| shortfall.for_stage(stage))
    }

    /// Threads and total memory for a thread-normalized stage.
    ///
    /// The workflow overhead is amortized over the threads actually granted:
    /// `memory = per_thread + floor(overhead / threads)`.
    pub fn allocate(
        &self,
        stage: &str,
        mem_per_thread_mb: u64,
        policy: ThreadPolicy,
    ) -> Result<StageResources> {
        let requested = policy.requested(self.cores);
        let threads = self.normalize(stage, mem_per_thread_mb, requested)?;
        let memory_mb = mem_per_thread_mb + self.overhead_mb / u64::from(threads);
        Ok(StageResources { threads, memory_mb })
    }

    /// Threads for a stage that takes at most `cap` cores and no normalization.
    pub fn capped(&self, cap: u32) -> u32 {
        self.cores.min(cap).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduces_parallelism_to_fit() {
        // 28000 / 8 = 3500 < 4000, so floor(28000 / 4000) = 7.
        assert_eq!(normalize_threads(4000, 8, 32000, 4000), Ok(7));
    }

    #[test]
    fn grants_requested_parallelism_when_it_fits() {
        assert_eq!(normalize_threads(2000, 8, 32000, 4000), Ok(8));
    }

    #[test]
    fn zero_usable_threads_is_an_error() {
        let err = normalize_threads(5000, 8, 32000, 28000).unwrap_err();
        assert_eq!(
            err,
            ResourceShortfall::InsufficientMemory {
                host_mem_mb: 32000,
                overhead_mb: 28000,
                available_mb: 4000,
                mem_per_thread_mb: 5000,
            }
        );
    }

    #[test]
    fn overhead_above_host_memory_is_an_error_not_a_wrap() {
        assert!(normalize_threads(1000, 4, 2000, 8000).is_err());
    }

    #[test]
    fn zero_requested_threads_is_rejected() {
        assert_eq!(
            normalize_threads(1000, 0, 32000, 0),
            Err(ResourceShortfall::NoThreadsRequested)
        );
    }

    #[test]
    fn reserve_only_applies_above_twelve_cores() {
        assert_eq!(ThreadPolicy::AllCoresReserved.requested(12), 12);
        assert_eq!(ThreadPolicy::AllCoresReserved.requested(13), 11);
        assert_eq!(ThreadPolicy::AllCoresReserved.requested(32), 30);
        assert_eq!(ThreadPolicy::AllCores.requested(32), 32);
    }

    #[test]
    fn overhead_is_amortized_over_granted_threads() {
        let allocator = ResourceAllocator::new(8, 32000, 4000);
        let res = allocator
            .allocate("caveman_mstep", 4000, ThreadPolicy::AllCores)
            .unwrap();
        assert_eq!(res.threads, 7);
        assert_eq!(res.memory_mb, 4000 + 4000 / 7);
    }

    #[test]
    fn allocator_error_names_the_stage() {
        let allocator = ResourceAllocator::new(8, 32000, 28000);
        match allocator.allocate("brass_assemble", 5000, ThreadPolicy::AllCores) {
            Err(PlanError::ResourceError { stage, .. }) => assert_eq!(stage, "brass_assemble"),
            other => panic!("expected ResourceError, got {other:?}"),
        }
    }

    #[test]
    fn capped_never_exceeds_cores() {
        assert_eq!(ResourceAllocator::new(2, 1, 0).capped(4), 2);
        assert_eq!(ResourceAllocator::new(16, 1, 0).capped(4), 4);
    }
}
