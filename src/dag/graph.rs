// src/dag/graph.rs

//! The finished, immutable task graph.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use blake3::Hasher;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use serde::Serialize;

use crate::dag::task::{Task, TaskId, TaskOwner};
use crate::errors::{PlanError, Result};

/// Per-stage totals for dry-run output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageSummary {
    pub stage: String,
    pub instances: usize,
    pub threads: u32,
    pub memory_mb: u64,
}

/// A directed acyclic graph of tasks with exactly one terminal task.
///
/// Built by [`crate::dag::TaskGraphBuilder`]; read-only afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineGraph {
    tasks: Vec<Task>,
    terminal: TaskId,
    /// Stages whose tasks are leaf result products.
    side_outputs: BTreeSet<String>,
    #[serde(skip)]
    children: Vec<Vec<TaskId>>,
}

impl PipelineGraph {
    /// Assemble a graph and check it. Task ids must equal their positions.
    pub(crate) fn from_tasks(
        tasks: Vec<Task>,
        terminal: TaskId,
        side_outputs: BTreeSet<String>,
    ) -> Result<Self> {
        let mut children = vec![Vec::new(); tasks.len()];
        for (pos, task) in tasks.iter().enumerate() {
            if task.id.0 != pos {
                return Err(PlanError::catalog(
                    &task.stage,
                    format!("task {} stored at position {pos}", task.id),
                ));
            }
            for parent in task.parents() {
                let Some(slot) = children.get_mut(parent.0) else {
                    return Err(PlanError::catalog(
                        &task.stage,
                        format!("task '{}' waits on unknown task {parent}", task.name),
                    ));
                };
                slot.push(task.id);
            }
        }

        let graph = Self {
            tasks,
            terminal,
            side_outputs,
            children,
        };
        graph.validate()?;
        Ok(graph)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn terminal(&self) -> &Task {
        &self.tasks[self.terminal.0]
    }

    pub fn edge_count(&self) -> usize {
        self.tasks.iter().map(|t| t.parents().len()).sum()
    }

    /// Tasks with no parents.
    pub fn roots(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| t.parents().is_empty())
    }

    /// Tasks with no children.
    pub fn leaves(&self) -> impl Iterator<Item = &Task> {
        self.tasks
            .iter()
            .filter(|t| self.children[t.id.0].is_empty())
    }

    pub fn children_of(&self, id: TaskId) -> &[TaskId] {
        self.children.get(id.0).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Instances of `stage` for one owner.
    pub fn instances(&self, stage: &str, owner: TaskOwner) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.stage == stage && t.owner == owner)
            .collect()
    }

    /// Instance count per stage.
    pub fn stage_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for task in &self.tasks {
            *counts.entry(task.stage.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// One row per stage in construction order, using the first instance's
    /// resources (all instances of a stage share them).
    pub fn stage_summary(&self) -> Vec<StageSummary> {
        let mut rows: Vec<StageSummary> = Vec::new();
        let mut position: BTreeMap<&str, usize> = BTreeMap::new();
        for task in &self.tasks {
            match position.get(task.stage.as_str()) {
                Some(&row) => rows[row].instances += 1,
                None => {
                    position.insert(task.stage.as_str(), rows.len());
                    rows.push(StageSummary {
                        stage: task.stage.clone(),
                        instances: 1,
                        threads: task.threads,
                        memory_mb: task.memory_mb,
                    });
                }
            }
        }
        rows
    }

    pub fn is_side_output(&self, task: &Task) -> bool {
        self.side_outputs.contains(&task.stage)
    }

    /// Every task `id` transitively waits on.
    pub fn ancestors(&self, id: TaskId) -> BTreeSet<TaskId> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<TaskId> = VecDeque::from([id]);
        while let Some(next) = queue.pop_front() {
            let Some(task) = self.task(next) else {
                continue;
            };
            for parent in task.parents() {
                if seen.insert(*parent) {
                    queue.push_back(*parent);
                }
            }
        }
        seen
    }

    /// Task ids in a dependency-respecting order.
    pub fn topological_order(&self) -> Result<Vec<TaskId>> {
        let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
        for task in &self.tasks {
            graph.add_node(task.id.0);
            for parent in task.parents() {
                graph.add_edge(parent.0, task.id.0, ());
            }
        }
        match toposort(&graph, None) {
            Ok(order) => Ok(order.into_iter().map(TaskId).collect()),
            Err(cycle) => {
                let name = self
                    .task(TaskId(cycle.node_id()))
                    .map(|t| t.name.clone())
                    .unwrap_or_else(|| TaskId(cycle.node_id()).to_string());
                Err(PlanError::GraphCycle(format!("cycle involving task '{name}'")))
            }
        }
    }

    /// Acyclic, one terminal task, and every task other than side outputs
    /// leads to the terminal.
    pub fn validate(&self) -> Result<()> {
        self.topological_order()?;

        let Some(terminal) = self.task(self.terminal) else {
            return Err(PlanError::catalog("", format!("terminal task {} is missing", self.terminal)));
        };
        if !self.children_of(terminal.id).is_empty() {
            return Err(PlanError::catalog(
                &terminal.stage,
                "terminal task has dependents",
            ));
        }

        let ancestors = self.ancestors(terminal.id);
        for task in &self.tasks {
            if task.id == terminal.id || self.is_side_output(task) {
                continue;
            }
            if !ancestors.contains(&task.id) {
                return Err(PlanError::catalog(
                    &task.stage,
                    format!("task '{}' does not lead to the terminal task", task.name),
                ));
            }
        }
        Ok(())
    }

    /// Hash of the graph's shape: task labels, resources, and labelled edges.
    ///
    /// Independent of task ids and command text, so two graphs built for the
    /// same samples in different acquisition modes share a fingerprint.
    pub fn topology_fingerprint(&self) -> String {
        let mut lines: Vec<String> = Vec::with_capacity(self.tasks.len() + self.edge_count());
        for task in &self.tasks {
            lines.push(format!("T {} {} {}", task.name, task.threads, task.memory_mb));
            for parent in task.parents() {
                lines.push(format!("E {} {}", self.tasks[parent.0].name, task.name));
            }
        }
        hash_lines(lines)
    }

    /// Shape of pair `pair`'s part of the graph with the pair index removed.
    ///
    /// Two pairs have equal signatures exactly when their tasks, resources
    /// and connections (to their own samples, to shared tasks and within the
    /// pair) match.
    pub fn pair_signature(&self, pair: usize) -> String {
        let relative = |task: &Task| -> String {
            let key = format!("{}.{}", task.stage, task.index);
            match task.owner {
                TaskOwner::Pair(p) if p == pair => format!("pair:{key}"),
                TaskOwner::Pair(p) => format!("pair{p}:{key}"),
                TaskOwner::Sample(0) => format!("control:{key}"),
                TaskOwner::Sample(s) if s == pair + 1 => format!("tumour:{key}"),
                TaskOwner::Sample(s) => format!("sample{s}:{key}"),
                TaskOwner::Shared => format!("shared:{key}"),
            }
        };

        let mut lines = Vec::new();
        for task in self.tasks.iter().filter(|t| t.owner == TaskOwner::Pair(pair)) {
            let me = relative(task);
            lines.push(format!("T {me} {} {}", task.threads, task.memory_mb));
            for parent in task.parents() {
                lines.push(format!("E {} {me}", relative(&self.tasks[parent.0])));
            }
            for child in self.children_of(task.id) {
                let child = &self.tasks[child.0];
                if child.owner != task.owner {
                    lines.push(format!("E {me} {}", relative(child)));
                }
            }
        }
        hash_lines(lines)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn hash_lines(mut lines: Vec<String>) -> String {
    lines.sort();
    let mut hasher = Hasher::new();
    for line in &lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandDescriptor;
    use crate::resources::StageResources;

    fn task(id: usize, stage: &str, parents: &[usize]) -> Task {
        let mut t = Task::new(
            TaskId(id),
            stage,
            TaskOwner::Shared,
            1,
            CommandDescriptor::new("true"),
            StageResources::single(100),
        );
        t.add_parents(parents.iter().copied().map(TaskId));
        t
    }

    #[test]
    fn rejects_cycles() {
        let tasks = vec![task(0, "a", &[1]), task(1, "b", &[0]), task(2, "end", &[1])];
        let err = PipelineGraph::from_tasks(tasks, TaskId(2), BTreeSet::new()).unwrap_err();
        assert!(matches!(err, PlanError::GraphCycle(_)));
    }

    #[test]
    fn rejects_dangling_task() {
        let tasks = vec![task(0, "a", &[]), task(1, "stray", &[0]), task(2, "end", &[0])];
        match PipelineGraph::from_tasks(tasks, TaskId(2), BTreeSet::new()) {
            Err(PlanError::CatalogError { stage, .. }) => assert_eq!(stage, "stray"),
            other => panic!("expected CatalogError, got {other:?}"),
        }
    }

    #[test]
    fn side_outputs_may_dangle() {
        let tasks = vec![task(0, "a", &[]), task(1, "stray", &[0]), task(2, "end", &[0])];
        let side = BTreeSet::from(["stray".to_string()]);
        let graph = PipelineGraph::from_tasks(tasks, TaskId(2), side).unwrap();
        assert_eq!(graph.roots().count(), 1);
        assert_eq!(graph.leaves().count(), 2);
        assert_eq!(graph.children_of(TaskId(0)), &[TaskId(1), TaskId(2)]);
    }

    #[test]
    fn fingerprint_ignores_task_ids() {
        let a = PipelineGraph::from_tasks(
            vec![task(0, "a", &[]), task(1, "b", &[]), task(2, "end", &[0, 1])],
            TaskId(2),
            BTreeSet::new(),
        )
        .unwrap();
        let b = PipelineGraph::from_tasks(
            vec![task(0, "b", &[]), task(1, "a", &[]), task(2, "end", &[0, 1])],
            TaskId(2),
            BTreeSet::new(),
        )
        .unwrap();
        assert_eq!(a.topology_fingerprint(), b.topology_fingerprint());
    }
}
