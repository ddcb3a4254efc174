// src/catalog/validate.rs

use std::collections::HashSet;

use regex::Regex;

use crate::catalog::genome::GenomeLayout;
use crate::catalog::stage::{
    FanOut, Link, Scope, StageCondition, StageKind, StageRole, StageSpec,
};
use crate::catalog::StageCatalog;
use crate::commands::{is_known_placeholder, placeholder_pattern, placeholders};
use crate::errors::{PlanError, Result};

impl StageCatalog {
    /// Check the catalog against the genome layout and host it will be
    /// expanded for.
    ///
    /// Every defect is reported as a `CatalogError` naming the stage, before
    /// any task is built.
    pub fn validate(&self, layout: &GenomeLayout, cores: u32) -> Result<()> {
        let name_pattern = Regex::new(r"^[a-z][a-z0-9_]*$")
            .map_err(|e| PlanError::Other(anyhow::anyhow!("invalid stage name pattern: {e}")))?;
        let placeholder = placeholder_pattern()?;

        let mut seen: HashSet<&str> = HashSet::new();
        let mut acquisition_stages = 0usize;

        for stage in self.stages() {
            if !name_pattern.is_match(&stage.name) {
                return Err(PlanError::catalog(
                    &stage.name,
                    "stage names must match ^[a-z][a-z0-9_]*$",
                ));
            }
            if !seen.insert(stage.name.as_str()) {
                return Err(PlanError::catalog(&stage.name, "duplicate stage name"));
            }

            match &stage.kind {
                StageKind::Acquisition => {
                    acquisition_stages += 1;
                    validate_acquisition_stage(stage)?;
                }
                StageKind::Command(template) => {
                    for name in placeholders(&placeholder, template) {
                        if !is_known_placeholder(stage.scope, &name) {
                            return Err(PlanError::catalog(
                                &stage.name,
                                format!(
                                    "placeholder {{{name}}} is not available to {:?}-scoped stages",
                                    stage.scope
                                ),
                            ));
                        }
                    }
                }
            }

            validate_labels(stage)?;
            self.validate_dependencies(stage, &seen, layout, cores)?;
        }

        if acquisition_stages > 1 {
            return Err(PlanError::catalog(
                self.terminal(),
                format!("catalog declares {acquisition_stages} acquisition stages, expected at most one"),
            ));
        }

        self.validate_terminal(layout, cores)
    }

    fn validate_dependencies(
        &self,
        stage: &StageSpec,
        seen: &HashSet<&str>,
        layout: &GenomeLayout,
        cores: u32,
    ) -> Result<()> {
        for dep in &stage.depends_on {
            if dep.stage == stage.name {
                return Err(PlanError::catalog(&stage.name, "stage depends on itself"));
            }
            let Some(upstream) = self.get(&dep.stage) else {
                return Err(PlanError::catalog(
                    &stage.name,
                    format!("depends on unknown stage '{}'", dep.stage),
                ));
            };
            if !seen.contains(dep.stage.as_str()) {
                return Err(PlanError::catalog(
                    &stage.name,
                    format!(
                        "depends on '{}', which is not constructed until later in the catalog",
                        dep.stage
                    ),
                ));
            }
            if !scope_reachable(upstream.scope, stage.scope) {
                return Err(PlanError::catalog(
                    &stage.name,
                    format!(
                        "{:?}-scoped stage cannot depend on {:?}-scoped stage '{}'",
                        stage.scope, upstream.scope, upstream.name
                    ),
                ));
            }
            if dep.link == Link::Each {
                let ours = stage.fan_out.resolve(layout, cores);
                let theirs = upstream.fan_out.resolve(layout, cores);
                if upstream.scope != stage.scope || ours != theirs {
                    return Err(PlanError::catalog(
                        &stage.name,
                        format!(
                            "one-to-one link to '{}' needs the same scope and instance count \
                             ({ours} vs {theirs})",
                            upstream.name
                        ),
                    ));
                }
            }
        }

        if let StageRole::Merge { of } = stage.role {
            self.validate_merge(stage, of, layout, cores)?;
        }
        Ok(())
    }

    fn validate_merge(
        &self,
        stage: &StageSpec,
        of: FanOut,
        layout: &GenomeLayout,
        cores: u32,
    ) -> Result<()> {
        let Some(first) = stage.depends_on.first() else {
            return Err(PlanError::catalog(&stage.name, "merge stage has no predecessor"));
        };
        if first.link != Link::All || first.optional {
            return Err(PlanError::catalog(
                &stage.name,
                format!("merge must wait on the whole of '{}'", first.stage),
            ));
        }
        if stage.fan_out != FanOut::Fixed(1) {
            return Err(PlanError::catalog(
                &stage.name,
                format!("merge stages run once, not {}", stage.fan_out),
            ));
        }
        // Existence was checked by the dependency pass.
        let Some(upstream) = self.get(&first.stage) else {
            return Ok(());
        };
        let expected = of.resolve(layout, cores);
        let actual = upstream.fan_out.resolve(layout, cores);
        if upstream.fan_out != of || expected != actual {
            return Err(PlanError::catalog(
                &stage.name,
                format!(
                    "merges {of} ({expected} instances) but '{}' fans out {} ({actual} instances)",
                    upstream.name, upstream.fan_out
                ),
            ));
        }
        Ok(())
    }

    fn validate_terminal(&self, layout: &GenomeLayout, cores: u32) -> Result<()> {
        let name = self.terminal();
        let Some(terminal) = self.get(name) else {
            return Err(PlanError::catalog(name, "terminal stage is not in the catalog"));
        };
        if terminal.scope != Scope::Shared || terminal.fan_out.resolve(layout, cores) != 1 {
            return Err(PlanError::catalog(
                name,
                "terminal stage must be shared and run exactly once",
            ));
        }
        if terminal.side_output || terminal.condition != StageCondition::Always {
            return Err(PlanError::catalog(name, "terminal stage must always run"));
        }
        if self.stages().last().map(|s| s.name.as_str()) != Some(name) {
            return Err(PlanError::catalog(name, "terminal stage must be listed last"));
        }
        Ok(())
    }
}

/// Whether a stage of scope `downstream` can resolve instances of `upstream`.
fn scope_reachable(upstream: Scope, downstream: Scope) -> bool {
    !matches!(
        (upstream, downstream),
        (Scope::Pair, Scope::PerSample | Scope::Control)
    )
}

fn validate_acquisition_stage(stage: &StageSpec) -> Result<()> {
    if stage.scope != Scope::PerSample || stage.fan_out != FanOut::Fixed(1) {
        return Err(PlanError::catalog(
            &stage.name,
            "acquisition stage must run once per sample",
        ));
    }
    Ok(())
}

fn validate_labels(stage: &StageSpec) -> Result<()> {
    if stage.labels.is_empty() {
        return Ok(());
    }
    match stage.fan_out {
        FanOut::Fixed(n) if n as usize == stage.labels.len() => Ok(()),
        other => Err(PlanError::catalog(
            &stage.name,
            format!(
                "{} labels given for fan-out {other}",
                stage.labels.len()
            ),
        )),
    }
}
