// src/dag/task.rs

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::commands::CommandDescriptor;
use crate::resources::StageResources;

/// Stable identifier of a task within one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TaskId(pub usize);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// The part of the graph a task was instantiated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum TaskOwner {
    Shared,
    /// Sample ordinal: 0 is the control.
    Sample(usize),
    /// 0-based pair index.
    Pair(usize),
}

impl TaskOwner {
    /// Short prefix used in task names, e.g. `pair0`.
    pub fn tag(&self) -> String {
        match self {
            TaskOwner::Shared => "shared".to_string(),
            TaskOwner::Sample(s) => format!("sample{s}"),
            TaskOwner::Pair(p) => format!("pair{p}"),
        }
    }

    pub fn pair(&self) -> Option<usize> {
        match self {
            TaskOwner::Pair(p) => Some(*p),
            _ => None,
        }
    }
}

/// A single schedulable unit of work.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: TaskId,
    /// `<owner>/<stage>.<index>`; unique within a graph.
    pub name: String,
    pub stage: String,
    pub owner: TaskOwner,
    /// 1-based instance index within the stage's fan-out.
    pub index: u32,
    pub command: CommandDescriptor,
    pub memory_mb: u64,
    pub threads: u32,
    parents: BTreeSet<TaskId>,
}

impl Task {
    pub(crate) fn new(
        id: TaskId,
        stage: &str,
        owner: TaskOwner,
        index: u32,
        command: CommandDescriptor,
        resources: StageResources,
    ) -> Self {
        Self {
            id,
            name: format!("{}/{stage}.{index}", owner.tag()),
            stage: stage.to_string(),
            owner,
            index,
            command,
            memory_mb: resources.memory_mb,
            threads: resources.threads,
            parents: BTreeSet::new(),
        }
    }

    pub fn parents(&self) -> &BTreeSet<TaskId> {
        &self.parents
    }

    pub(crate) fn add_parents(&mut self, ids: impl IntoIterator<Item = TaskId>) {
        self.parents.extend(ids);
    }
}

/// A reserved position in the graph for one task.
///
/// Handed to code outside the builder (the acquisition strategies) so it can
/// fill in a command without choosing the task's identity or resources.
#[derive(Debug)]
pub struct TaskSlot {
    id: TaskId,
    stage: String,
    owner: TaskOwner,
    resources: StageResources,
}

impl TaskSlot {
    pub(crate) fn new(id: TaskId, stage: &str, owner: TaskOwner, resources: StageResources) -> Self {
        Self {
            id,
            stage: stage.to_string(),
            owner,
            resources,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn into_task(self, command: CommandDescriptor) -> Task {
        Task::new(self.id, &self.stage, self.owner, 1, command, self.resources)
    }
}
