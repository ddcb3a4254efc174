// src/dag/mod.rs

//! Task graph model and construction.
//!
//! - `task.rs`: tasks, ids and owners.
//! - `graph.rs`: the immutable [`PipelineGraph`] and its checks.
//! - `builder.rs`: catalog expansion ([`TaskGraphBuilder`]).

pub mod builder;
pub mod graph;
pub mod task;

pub use builder::{TaskGraphBuilder, plan_pipeline};
pub use graph::{PipelineGraph, StageSummary};
pub use task::{Task, TaskId, TaskOwner, TaskSlot};
