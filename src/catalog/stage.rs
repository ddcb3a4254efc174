// src/catalog/stage.rs

//! Declarative description of one pipeline stage.

use std::fmt;

use serde::Serialize;

use crate::catalog::genome::{GenomeLayout, Partition};
use crate::config::model::Configuration;
use crate::resources::ThreadPolicy;

/// Tool family a stage belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolFamily {
    Workflow,
    Acquisition,
    Reference,
    Qc,
    Battenberg,
    /// Copy number.
    Ascat,
    /// Indels.
    Pindel,
    /// Structural variants.
    Brass,
    /// SNVs.
    Caveman,
    Packaging,
    Upload,
}

impl fmt::Display for ToolFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ToolFamily::Workflow => "workflow",
            ToolFamily::Acquisition => "acquisition",
            ToolFamily::Reference => "reference",
            ToolFamily::Qc => "qc",
            ToolFamily::Battenberg => "battenberg",
            ToolFamily::Ascat => "ascat",
            ToolFamily::Pindel => "pindel",
            ToolFamily::Brass => "brass",
            ToolFamily::Caveman => "caveman",
            ToolFamily::Packaging => "packaging",
            ToolFamily::Upload => "upload",
        };
        f.write_str(name)
    }
}

/// Which part of the graph a stage is instantiated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Once per invocation.
    Shared,
    /// Once, for the control sample.
    Control,
    /// Once per sample, control first.
    PerSample,
    /// Once per tumour/control pair.
    Pair,
}

/// Replication rule for a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FanOut {
    Fixed(u32),
    /// One instance per addressable core.
    PerCore,
    /// One instance per partition of the reference genome.
    PerPartition(Partition),
}

impl FanOut {
    /// Number of instances this rule yields for the given genome and host.
    pub fn resolve(self, layout: &GenomeLayout, cores: u32) -> u32 {
        match self {
            FanOut::Fixed(n) => n,
            FanOut::PerCore => cores,
            FanOut::PerPartition(partition) => layout.count(partition),
        }
    }
}

impl fmt::Display for FanOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FanOut::Fixed(n) => write!(f, "fixed({n})"),
            FanOut::PerCore => write!(f, "per-core"),
            FanOut::PerPartition(p) => write!(f, "per-{p}"),
        }
    }
}

/// Whether a stage is a barrier over its predecessor's fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageRole {
    Step,
    /// Waits on the entire instance set of its first dependency, which must
    /// fan out exactly as `of`.
    Merge { of: FanOut },
}

/// How a stage's tasks are produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageKind {
    /// Rendered from a command template (see [`crate::commands`]).
    Command(String),
    /// Delegated to the configured acquisition strategy.
    Acquisition,
}

/// How instances of a stage attach to the instances of an upstream stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    /// Every instance waits on every upstream instance.
    All,
    /// Instance i waits on upstream instance i.
    Each,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub stage: String,
    pub link: Link,
    /// Dropped, rather than rejected, when the upstream stage is disabled.
    pub optional: bool,
}

/// Per-instance resource requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceSpec {
    /// Single thread, memory from `[memory].<key>`.
    Fixed { memory: String },
    /// Single thread, memory given in the catalog.
    Literal { memory_mb: u64 },
    /// `min(cores, max_threads)` threads, memory from `[memory].<key>`.
    Capped { memory: String, max_threads: u32 },
    /// Threads normalized against host memory; `per_thread` names the
    /// per-thread budget.
    Normalized {
        per_thread: String,
        policy: ThreadPolicy,
    },
}

impl ResourceSpec {
    /// The `[memory]` key this requirement reads, if any.
    pub fn memory_key(&self) -> Option<&str> {
        match self {
            ResourceSpec::Fixed { memory } | ResourceSpec::Capped { memory, .. } => Some(memory),
            ResourceSpec::Normalized { per_thread, .. } => Some(per_thread),
            ResourceSpec::Literal { .. } => None,
        }
    }
}

/// When a stage is part of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageCondition {
    Always,
    /// Only when an `[upload]` destination is configured.
    UploadConfigured,
}

/// One entry of the stage catalog.
#[derive(Debug, Clone)]
pub struct StageSpec {
    pub name: String,
    pub family: ToolFamily,
    pub scope: Scope,
    pub fan_out: FanOut,
    pub role: StageRole,
    pub kind: StageKind,
    pub resources: ResourceSpec,
    pub depends_on: Vec<Dependency>,
    /// Per-instance labels for `Fixed` fan-outs (e.g. `tumour`, `normal`).
    pub labels: Vec<String>,
    /// Wrap the command with `/usr/bin/time` output under the timings dir.
    pub timed: bool,
    /// A leaf result product that need not lead to the terminal task.
    pub side_output: bool,
    pub condition: StageCondition,
}

impl StageSpec {
    /// A single-instance command stage whose memory key is its own name.
    pub fn command(
        name: impl Into<String>,
        family: ToolFamily,
        scope: Scope,
        template: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            resources: ResourceSpec::Fixed {
                memory: name.clone(),
            },
            name,
            family,
            scope,
            fan_out: FanOut::Fixed(1),
            role: StageRole::Step,
            kind: StageKind::Command(template.into()),
            depends_on: Vec::new(),
            labels: Vec::new(),
            timed: false,
            side_output: false,
            condition: StageCondition::Always,
        }
    }

    /// The per-sample readiness stage filled in by the acquisition strategy.
    pub fn acquisition(name: impl Into<String>) -> Self {
        let mut spec = Self::command(name, ToolFamily::Acquisition, Scope::PerSample, "");
        spec.kind = StageKind::Acquisition;
        spec
    }

    pub fn fan_out(mut self, fan_out: FanOut) -> Self {
        self.fan_out = fan_out;
        self
    }

    /// Barrier over the entire fan-out of the first dependency.
    pub fn merge(mut self, of: FanOut) -> Self {
        self.role = StageRole::Merge { of };
        self
    }

    pub fn after(mut self, stage: &str) -> Self {
        self.depends_on.push(Dependency {
            stage: stage.to_string(),
            link: Link::All,
            optional: false,
        });
        self
    }

    pub fn after_if_present(mut self, stage: &str) -> Self {
        self.depends_on.push(Dependency {
            stage: stage.to_string(),
            link: Link::All,
            optional: true,
        });
        self
    }

    pub fn each(mut self, stage: &str) -> Self {
        self.depends_on.push(Dependency {
            stage: stage.to_string(),
            link: Link::Each,
            optional: false,
        });
        self
    }

    pub fn memory(mut self, key: &str) -> Self {
        self.resources = ResourceSpec::Fixed {
            memory: key.to_string(),
        };
        self
    }

    pub fn literal_memory(mut self, memory_mb: u64) -> Self {
        self.resources = ResourceSpec::Literal { memory_mb };
        self
    }

    pub fn capped(mut self, key: &str, max_threads: u32) -> Self {
        self.resources = ResourceSpec::Capped {
            memory: key.to_string(),
            max_threads,
        };
        self
    }

    pub fn normalized(mut self, per_thread_key: &str, policy: ThreadPolicy) -> Self {
        self.resources = ResourceSpec::Normalized {
            per_thread: per_thread_key.to_string(),
            policy,
        };
        self
    }

    pub fn labels(mut self, labels: &[&str]) -> Self {
        self.labels = labels.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn timed(mut self) -> Self {
        self.timed = true;
        self
    }

    pub fn side_output(mut self) -> Self {
        self.side_output = true;
        self
    }

    pub fn when(mut self, condition: StageCondition) -> Self {
        self.condition = condition;
        self
    }

    pub fn is_enabled(&self, cfg: &Configuration) -> bool {
        match self.condition {
            StageCondition::Always => true,
            StageCondition::UploadConfigured => cfg.upload.is_some(),
        }
    }

    pub fn is_merge(&self) -> bool {
        matches!(self.role, StageRole::Merge { .. })
    }

    /// Label of 1-based instance `index`.
    pub fn instance_label(&self, index: u32, layout: &GenomeLayout) -> String {
        match self.fan_out {
            FanOut::PerPartition(partition) => layout.label(partition, index),
            _ => self
                .labels
                .get(index as usize - 1)
                .cloned()
                .unwrap_or_else(|| index.to_string()),
        }
    }
}
