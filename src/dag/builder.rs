// src/dag/builder.rs

//! Expands the stage catalog into a concrete task graph.
//!
//! Stages are walked in catalog order. Each enabled stage is instantiated
//! once per owner its scope implies (the invocation, the control, every
//! sample or every pair) and once per fan-out index within that owner. Every
//! dependency names an earlier stage, so the instances a task waits on always
//! exist by the time it is created.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::acquisition::{self, Acquisition, SampleAcquisitionStrategy};
use crate::catalog::{GenomeLayout, Link, Scope, StageCatalog, StageKind, StageSpec};
use crate::commands::{Bindings, CommandRenderer};
use crate::config::model::Configuration;
use crate::dag::graph::PipelineGraph;
use crate::dag::task::{Task, TaskId, TaskOwner, TaskSlot};
use crate::errors::{PlanError, Result};
use crate::resources::{ResourceAllocator, ResourcePlan, StageResources};
use crate::samples::{SampleDescriptor, SamplePair, all_samples, resolve_sample_pairs};

/// Build the graph for a validated configuration with its own catalog,
/// allocator and acquisition strategy.
pub fn plan_pipeline(cfg: &Configuration) -> Result<PipelineGraph> {
    let pairs = resolve_sample_pairs(&cfg.samples)?;
    let catalog = StageCatalog::somatic(cfg.workflow.parallelism);
    let allocator = ResourceAllocator::from_host(&cfg.host);
    let strategy = acquisition::strategy_for(cfg)?;
    TaskGraphBuilder::new(cfg, &catalog, allocator, strategy.as_ref()).build(&pairs)
}

/// Turns a catalog, a configuration and a list of sample pairs into a
/// [`PipelineGraph`].
///
/// Construction is all-or-nothing: any configuration, resource or catalog
/// defect aborts the build and no partial graph is returned.
#[derive(Debug)]
pub struct TaskGraphBuilder<'a> {
    config: &'a Configuration,
    catalog: &'a StageCatalog,
    allocator: ResourceAllocator,
    strategy: &'a dyn SampleAcquisitionStrategy,
}

/// Inputs that stay fixed while stages are expanded.
struct Context<'c> {
    layout: GenomeLayout,
    renderer: CommandRenderer,
    plan: ResourcePlan,
    pairs: &'c [SamplePair],
    samples: Vec<SampleDescriptor>,
}

/// Graph under construction.
struct BuildState {
    tasks: Vec<Task>,
    instances: HashMap<(String, TaskOwner), Vec<TaskId>>,
    disabled: HashSet<String>,
    /// Local BAM path per sample ordinal, filled by the acquisition stage.
    paths: Vec<Option<String>>,
}

impl BuildState {
    fn new(samples: usize) -> Self {
        Self {
            tasks: Vec::new(),
            instances: HashMap::new(),
            disabled: HashSet::new(),
            paths: vec![None; samples],
        }
    }

    fn next_id(&self) -> TaskId {
        TaskId(self.tasks.len())
    }
}

/// Upstream instances one owner's tasks wait on for a single dependency.
struct ResolvedDep {
    link: Link,
    ids: Vec<TaskId>,
}

impl ResolvedDep {
    /// Parents of 1-based instance `index`.
    fn parents_of(&self, index: u32) -> Vec<TaskId> {
        match self.link {
            Link::All => self.ids.clone(),
            Link::Each => self.ids.get(index as usize - 1).copied().into_iter().collect(),
        }
    }
}

impl<'a> TaskGraphBuilder<'a> {
    pub fn new(
        config: &'a Configuration,
        catalog: &'a StageCatalog,
        allocator: ResourceAllocator,
        strategy: &'a dyn SampleAcquisitionStrategy,
    ) -> Self {
        Self {
            config,
            catalog,
            allocator,
            strategy,
        }
    }

    pub fn build(&self, pairs: &[SamplePair]) -> Result<PipelineGraph> {
        check_pairs(pairs)?;

        let cores = self.allocator.cores();
        let layout = GenomeLayout::from_reference(&self.config.reference);
        self.catalog.validate(&layout, cores)?;

        let ctx = Context {
            plan: ResourcePlan::derive(self.catalog, self.config, &self.allocator)?,
            renderer: CommandRenderer::new(self.config)?,
            samples: all_samples(pairs),
            layout,
            pairs,
        };

        if self.config.is_test_mode() {
            warn!(
                mode = ?self.strategy.mode(),
                "running in test mode: BAMs are read from static fixtures, nothing is downloaded"
            );
        }
        if self.config.upload.is_none() {
            warn!("no upload destination configured; results stay in the workspace");
        }

        let mut state = BuildState::new(ctx.samples.len());
        for stage in self.catalog.stages() {
            if !stage.is_enabled(self.config) {
                debug!(stage = %stage.name, "stage disabled by configuration");
                state.disabled.insert(stage.name.clone());
                continue;
            }
            self.expand_stage(stage, &ctx, &mut state)?;
        }

        let terminal_key = (self.catalog.terminal().to_string(), TaskOwner::Shared);
        let terminal = state
            .instances
            .get(&terminal_key)
            .and_then(|ids| ids.first().copied())
            .ok_or_else(|| {
                PlanError::catalog(self.catalog.terminal(), "terminal stage produced no task")
            })?;

        let side_outputs: BTreeSet<String> = self
            .catalog
            .stages()
            .iter()
            .filter(|s| s.side_output)
            .map(|s| s.name.clone())
            .collect();

        let graph = PipelineGraph::from_tasks(state.tasks, terminal, side_outputs)?;
        info!(
            pairs = pairs.len(),
            tasks = graph.len(),
            edges = graph.edge_count(),
            form = %self.config.workflow.parallelism,
            "task graph built"
        );
        Ok(graph)
    }

    fn expand_stage(&self, stage: &StageSpec, ctx: &Context<'_>, state: &mut BuildState) -> Result<()> {
        let resources = ctx.plan.get(&stage.name).ok_or_else(|| {
            PlanError::catalog(&stage.name, "no resources were resolved for this stage")
        })?;
        let count = stage.fan_out.resolve(&ctx.layout, self.allocator.cores());
        let owners = owners_for(stage.scope, ctx.samples.len(), ctx.pairs.len());

        let mut created = 0usize;
        for owner in owners {
            let deps = self.resolve_dependencies(stage, owner, count, ctx, state)?;
            let ids = match &stage.kind {
                StageKind::Acquisition => {
                    vec![self.acquire(stage, owner, resources, &deps, ctx, state)?]
                }
                StageKind::Command(template) => {
                    let mut ids = Vec::with_capacity(count as usize);
                    for index in 1..=count {
                        let bindings = self.bindings(stage, owner, index, resources, ctx, state);
                        let command =
                            ctx.renderer
                                .render(&stage.name, template, stage.timed, &bindings)?;
                        let id = state.next_id();
                        let mut task = Task::new(id, &stage.name, owner, index, command, resources);
                        for dep in &deps {
                            task.add_parents(dep.parents_of(index));
                        }
                        state.tasks.push(task);
                        ids.push(id);
                    }
                    ids
                }
            };
            created += ids.len();
            state.instances.insert((stage.name.clone(), owner), ids);
        }

        debug!(
            stage = %stage.name,
            family = %stage.family,
            fan_out = %stage.fan_out,
            tasks = created,
            threads = resources.threads,
            memory_mb = resources.memory_mb,
            "expanded stage"
        );
        Ok(())
    }

    fn resolve_dependencies(
        &self,
        stage: &StageSpec,
        owner: TaskOwner,
        count: u32,
        ctx: &Context<'_>,
        state: &BuildState,
    ) -> Result<Vec<ResolvedDep>> {
        let mut resolved = Vec::with_capacity(stage.depends_on.len());
        for dep in &stage.depends_on {
            if state.disabled.contains(&dep.stage) {
                if dep.optional {
                    continue;
                }
                return Err(PlanError::catalog(
                    &stage.name,
                    format!("depends on '{}', which is disabled by configuration", dep.stage),
                ));
            }
            let upstream = self.catalog.get(&dep.stage).ok_or_else(|| {
                PlanError::catalog(&stage.name, format!("depends on unknown stage '{}'", dep.stage))
            })?;

            let mut ids = Vec::new();
            for up_owner in upstream_owners(upstream.scope, owner, ctx.samples.len(), ctx.pairs.len()) {
                let key = (dep.stage.clone(), up_owner);
                let Some(found) = state.instances.get(&key) else {
                    return Err(PlanError::catalog(
                        &stage.name,
                        format!("'{}' has not been built for {}", dep.stage, up_owner.tag()),
                    ));
                };
                ids.extend(found.iter().copied());
            }

            if ids.is_empty() {
                return Err(PlanError::catalog(
                    &stage.name,
                    format!("'{}' has no instances reachable from {}", dep.stage, owner.tag()),
                ));
            }
            if dep.link == Link::Each && ids.len() != count as usize {
                return Err(PlanError::catalog(
                    &stage.name,
                    format!(
                        "one-to-one link to '{}' pairs {count} instances with {}",
                        dep.stage,
                        ids.len()
                    ),
                ));
            }
            resolved.push(ResolvedDep {
                link: dep.link,
                ids,
            });
        }
        Ok(resolved)
    }

    fn acquire(
        &self,
        stage: &StageSpec,
        owner: TaskOwner,
        resources: StageResources,
        deps: &[ResolvedDep],
        ctx: &Context<'_>,
        state: &mut BuildState,
    ) -> Result<TaskId> {
        let TaskOwner::Sample(ordinal) = owner else {
            return Err(PlanError::catalog(&stage.name, "acquisition must run per sample"));
        };
        let sample = ctx.samples.get(ordinal).ok_or_else(|| {
            PlanError::catalog(&stage.name, format!("no sample with ordinal {ordinal}"))
        })?;

        let id = state.next_id();
        let slot = TaskSlot::new(id, &stage.name, owner, resources);
        let Acquisition {
            mut ready,
            local_path,
        } = self.strategy.acquire(sample, slot)?;
        if ready.id != id || ready.stage != stage.name {
            return Err(PlanError::catalog(
                &stage.name,
                "acquisition strategy returned a task for a different slot",
            ));
        }
        for dep in deps {
            ready.add_parents(dep.parents_of(1));
        }

        debug!(
            sample = %sample.analysis_id,
            role = %sample.role,
            path = %local_path,
            mode = ?self.strategy.mode(),
            "sample acquisition planned"
        );
        state.paths[ordinal] = Some(local_path);
        state.tasks.push(ready);
        Ok(id)
    }

    fn bindings(
        &self,
        stage: &StageSpec,
        owner: TaskOwner,
        index: u32,
        resources: StageResources,
        ctx: &Context<'_>,
        state: &BuildState,
    ) -> Bindings {
        let mut b = Bindings::new();
        b.set("index", index.to_string())
            .set("label", stage.instance_label(index, &ctx.layout))
            .set("threads", resources.threads.to_string())
            .set("memory", resources.memory_mb.to_string())
            .set("owner", owner.tag());

        if let Some(Some(control)) = state.paths.first() {
            b.set("control", control.clone());
        }
        let tumours: Option<Vec<&String>> = state.paths.iter().skip(1).map(Option::as_ref).collect();
        if let Some(tumours) = tumours.filter(|t| !t.is_empty()) {
            let joined: Vec<&str> = tumours.iter().map(|t| t.as_str()).collect();
            let args: Vec<String> = joined.iter().map(|t| format!("-tb {t}")).collect();
            b.set("tumours", joined.join(" "))
                .set("tumour_bam_args", args.join(" "));
        }

        match owner {
            TaskOwner::Shared => {}
            TaskOwner::Sample(s) => {
                if let Some(Some(path)) = state.paths.get(s) {
                    b.set("sample", path.clone());
                }
                if let Some(sample) = ctx.samples.get(s) {
                    b.set("sample_id", sample.analysis_id.clone())
                        .set("sample_role", sample.role.to_string());
                }
            }
            TaskOwner::Pair(p) => {
                b.set("pair", p.to_string());
                if let Some(Some(path)) = state.paths.get(p + 1) {
                    b.set("tumour", path.clone());
                }
                if let Some(pair) = ctx.pairs.get(p) {
                    b.set("tumour_id", pair.tumour.analysis_id.clone()).set(
                        "tumour_aliquot",
                        pair.tumour.aliquot_id.clone().unwrap_or_default(),
                    );
                }
            }
        }
        b
    }
}

/// Pairs must be indexed 0..n in order and share one control.
fn check_pairs(pairs: &[SamplePair]) -> Result<()> {
    let Some(first) = pairs.first() else {
        return Err(PlanError::config(
            "samples.tumour_bams",
            "must list at least one tumour BAM",
        ));
    };
    for (pos, pair) in pairs.iter().enumerate() {
        if pair.index != pos || pair.tumour.ordinal != pos + 1 {
            return Err(PlanError::config(
                "samples",
                format!("pair {} is out of order (expected index {pos})", pair.index),
            ));
        }
        if pair.control != first.control {
            return Err(PlanError::config(
                "samples.control_bam",
                "every pair must share the same control",
            ));
        }
    }
    Ok(())
}

fn owners_for(scope: Scope, samples: usize, pairs: usize) -> Vec<TaskOwner> {
    match scope {
        Scope::Shared => vec![TaskOwner::Shared],
        Scope::Control => vec![TaskOwner::Sample(0)],
        Scope::PerSample => (0..samples).map(TaskOwner::Sample).collect(),
        Scope::Pair => (0..pairs).map(TaskOwner::Pair).collect(),
    }
}

/// Owners of `upstream`-scoped instances that a task owned by `owner` sees.
///
/// A pair sees only its own tumour and the control; shared tasks see every
/// instance.
fn upstream_owners(upstream: Scope, owner: TaskOwner, samples: usize, pairs: usize) -> Vec<TaskOwner> {
    match (upstream, owner) {
        (Scope::Shared, _) => vec![TaskOwner::Shared],
        (Scope::Control, _) => vec![TaskOwner::Sample(0)],
        (Scope::PerSample, TaskOwner::Sample(s)) => vec![TaskOwner::Sample(s)],
        (Scope::PerSample, TaskOwner::Pair(p)) => {
            vec![TaskOwner::Sample(0), TaskOwner::Sample(p + 1)]
        }
        (Scope::PerSample, TaskOwner::Shared) => (0..samples).map(TaskOwner::Sample).collect(),
        (Scope::Pair, TaskOwner::Pair(p)) => vec![TaskOwner::Pair(p)],
        (Scope::Pair, TaskOwner::Shared) => (0..pairs).map(TaskOwner::Pair).collect(),
        (Scope::Pair, TaskOwner::Sample(_)) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_sees_only_its_tumour_and_the_control() {
        assert_eq!(
            upstream_owners(Scope::PerSample, TaskOwner::Pair(2), 4, 3),
            vec![TaskOwner::Sample(0), TaskOwner::Sample(3)]
        );
    }

    #[test]
    fn shared_sees_every_pair() {
        assert_eq!(
            upstream_owners(Scope::Pair, TaskOwner::Shared, 4, 3),
            vec![TaskOwner::Pair(0), TaskOwner::Pair(1), TaskOwner::Pair(2)]
        );
    }

    #[test]
    fn each_link_picks_matching_index() {
        let dep = ResolvedDep {
            link: Link::Each,
            ids: vec![TaskId(4), TaskId(5), TaskId(6)],
        };
        assert_eq!(dep.parents_of(2), vec![TaskId(5)]);
        let all = ResolvedDep {
            link: Link::All,
            ids: vec![TaskId(4), TaskId(5)],
        };
        assert_eq!(all.parents_of(1), vec![TaskId(4), TaskId(5)]);
    }

    #[test]
    fn empty_pair_list_is_a_config_error() {
        assert!(matches!(
            check_pairs(&[]),
            Err(PlanError::ConfigError { .. })
        ));
    }
}
