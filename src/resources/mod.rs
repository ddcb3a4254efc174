// src/resources/mod.rs

//! Per-stage thread and memory allocation.
//!
//! - `allocator.rs` normalizes thread counts against the host memory budget.
//! - `plan.rs` resolves every catalog stage to concrete resources up front.

pub mod allocator;
pub mod plan;

pub use allocator::{
    ResourceAllocator, ResourceShortfall, StageResources, ThreadPolicy, normalize_threads,
};
pub use plan::ResourcePlan;
