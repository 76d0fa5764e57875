//! The migration ledger
//!
//! A directory of step files forming one chain from the empty schema to the
//! head. Opening the ledger verifies every step; appending checks that the
//! new step extends the head and persists it under the ledger lock.

use crate::error::{describe, LedgerError, LedgerResult};
use crate::lock::LedgerLock;
use crate::store::{read_steps, write_step, StoredStep};
use crate::target::Target;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tm_core::{DiffOptions, Differ, MigrationStep, SchemaSnapshot, StepId};

/// Options for [`Ledger::record`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordOptions {
    /// Record a step even when nothing changed
    pub allow_empty: bool,
    /// Options passed to the differ
    pub diff: DiffOptions,
}

/// Verified, ordered view of a ledger directory.
#[derive(Debug)]
pub struct Ledger {
    dir: PathBuf,
    /// Chain order, root first
    steps: Vec<MigrationStep>,
    paths: HashMap<StepId, PathBuf>,
}

impl Ledger {
    /// Create an empty ledger in `dir`.
    ///
    /// The directory is created if needed; it must not already hold steps.
    pub fn init(dir: &Path) -> LedgerResult<Self> {
        fs::create_dir_all(dir).map_err(|source| LedgerError::IoWithPath {
            path: dir.display().to_string(),
            source,
        })?;
        let existing = read_steps(dir)?;
        if !existing.is_empty() {
            return Err(LedgerError::AlreadyInitialized {
                path: dir.display().to_string(),
                count: existing.len(),
            });
        }
        log::info!("Initialized ledger at {}", dir.display());
        Ok(Self {
            dir: dir.to_path_buf(),
            steps: Vec::new(),
            paths: HashMap::new(),
        })
    }

    /// Load and verify the ledger in `dir`.
    pub fn open(dir: &Path) -> LedgerResult<Self> {
        if !dir.is_dir() {
            return Err(LedgerError::NotInitialized {
                path: dir.display().to_string(),
            });
        }

        let stored = read_steps(dir)?;
        for entry in &stored {
            verify_step(entry)?;
        }
        let (steps, paths) = order_chain(stored)?;
        log::debug!("Loaded {} step(s) from {}", steps.len(), dir.display());

        Ok(Self {
            dir: dir.to_path_buf(),
            steps,
            paths,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Take the ledger lock.
    pub fn lock(&self) -> LedgerResult<LedgerLock> {
        LedgerLock::acquire(&self.dir)
    }

    /// The newest step.
    pub fn head(&self) -> Option<&MigrationStep> {
        self.steps.last()
    }

    pub fn head_id(&self) -> Option<&StepId> {
        self.head().map(|s| &s.id)
    }

    /// Steps in chain order, root first.
    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step with exactly this id.
    pub fn get(&self, id: &str) -> Option<&MigrationStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// File a step is stored in.
    pub fn path_of(&self, id: &StepId) -> Option<&Path> {
        self.paths.get(id).map(PathBuf::as_path)
    }

    /// Look a step up by full id or unique prefix.
    pub fn find(&self, prefix: &str) -> LedgerResult<&MigrationStep> {
        if let Some(step) = self.get(prefix) {
            return Ok(step);
        }
        let matches: Vec<&MigrationStep> = self
            .steps
            .iter()
            .filter(|s| s.id.as_str().starts_with(prefix))
            .collect();
        match matches.as_slice() {
            [] => Err(LedgerError::UnknownStep {
                id: prefix.to_string(),
            }),
            [step] => Ok(*step),
            many => Err(LedgerError::AmbiguousPrefix {
                prefix: prefix.to_string(),
                matches: many
                    .iter()
                    .map(|s| s.id.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    /// Number of steps applied when the database is at `id`.
    ///
    /// `None` (base) is 0; an id outside the ledger yields `None`.
    pub fn applied_count(&self, id: Option<&StepId>) -> Option<usize> {
        match id {
            None => Some(0),
            Some(id) => self.steps.iter().position(|s| &s.id == id).map(|i| i + 1),
        }
    }

    /// Step id at a chain position; position 0 is base.
    fn id_at(&self, count: usize) -> Option<StepId> {
        count
            .checked_sub(1)
            .and_then(|i| self.steps.get(i))
            .map(|s| s.id.clone())
    }

    /// Resolve `target` to a position, `None` meaning base.
    ///
    /// Relative targets are taken from `current`.
    pub fn resolve(&self, target: &Target, current: Option<&StepId>) -> LedgerResult<Option<StepId>> {
        match target {
            Target::Head => Ok(self.head_id().cloned()),
            Target::Base => Ok(None),
            Target::Id(prefix) => Ok(Some(self.find(prefix)?.id.clone())),
            Target::Relative(offset) => {
                let from = self
                    .applied_count(current)
                    .ok_or_else(|| LedgerError::UnknownStep {
                        id: describe(current),
                    })?;
                let to = (from as i64)
                    .checked_add(*offset)
                    .and_then(|to| usize::try_from(to).ok())
                    .filter(|to| *to <= self.steps.len());
                match to {
                    Some(to) => Ok(self.id_at(to)),
                    None => Err(LedgerError::InvalidTarget {
                        target: target.to_string(),
                        reason: format!(
                            "{} is {} step(s) from base and {} from head",
                            describe(current),
                            from,
                            self.steps.len() - from
                        ),
                    }),
                }
            }
        }
    }

    /// Schema recorded at `id` (`None` for base), rebuilt by replaying
    /// forward operations from the empty schema.
    pub fn snapshot_at(&self, id: Option<&StepId>) -> LedgerResult<SchemaSnapshot> {
        let count = self
            .applied_count(id)
            .ok_or_else(|| LedgerError::UnknownStep { id: describe(id) })?;
        let mut schema = SchemaSnapshot::empty();
        for step in &self.steps[..count] {
            schema = schema
                .apply(&step.forward_ops)
                .map_err(|source| LedgerError::Replay {
                    step: step.id.clone(),
                    source,
                })?;
        }
        Ok(schema)
    }

    /// Schema recorded at the head.
    pub fn head_snapshot(&self) -> LedgerResult<SchemaSnapshot> {
        self.snapshot_at(self.head_id())
    }

    /// Append `step` after the current head and persist it.
    pub fn append(&mut self, step: MigrationStep) -> LedgerResult<PathBuf> {
        let _lock = self.lock()?;

        // Another process may have appended since this ledger was opened.
        let on_disk = order_chain(read_steps(&self.dir)?)?.0;
        let disk_head = on_disk.last().map(|s| &s.id);
        if disk_head != self.head_id() {
            return Err(LedgerError::ParentMismatch {
                step: step.id.clone(),
                parent: describe(step.parent_id.as_ref()),
                head: describe(disk_head),
            });
        }

        if step.parent_id.as_ref() != self.head_id() {
            return Err(LedgerError::ParentMismatch {
                step: step.id.clone(),
                parent: describe(step.parent_id.as_ref()),
                head: describe(self.head_id()),
            });
        }
        if let Some(path) = self.paths.get(&step.id) {
            return Err(LedgerError::DuplicateStep {
                id: step.id.clone(),
                first: path.display().to_string(),
                second: "<new step>".to_string(),
            });
        }
        let computed = step.computed_id().map_err(tm_core::DiffError::from)?;
        if computed != step.id {
            return Err(LedgerError::Tampered {
                path: "<new step>".to_string(),
                reason: format!("id {} does not match content hash {}", step.id, computed),
            });
        }
        if !step.reverse_is_inverse() {
            return Err(LedgerError::ReverseMismatch { step: step.id });
        }

        let path = write_step(&self.dir, &step)?;
        log::info!("Recorded step {} ({})", step.id, step.message);
        self.paths.insert(step.id.clone(), path.clone());
        self.steps.push(step);
        Ok(path)
    }

    /// Diff the head schema against `declared` and append the result.
    ///
    /// Returns `None` without writing anything when nothing changed, unless
    /// `options.allow_empty` is set.
    pub fn record(
        &mut self,
        declared: &SchemaSnapshot,
        message: &str,
        options: RecordOptions,
    ) -> LedgerResult<Option<MigrationStep>> {
        let recorded = self.head_snapshot()?;
        let step = Differ::new(options.diff).step(
            &recorded,
            declared,
            self.head_id().cloned(),
            message,
        )?;

        if step.is_empty() && !options.allow_empty {
            log::info!("No schema changes detected; nothing recorded");
            return Ok(None);
        }

        self.append(step.clone())?;
        Ok(Some(step))
    }
}

/// Check a stored step's id and reverse operations against its content.
fn verify_step(entry: &StoredStep) -> LedgerResult<()> {
    let step = &entry.step;
    let computed = step.computed_id().map_err(|source| LedgerError::Json {
        path: entry.path.display().to_string(),
        source,
    })?;
    if computed != step.id {
        return Err(LedgerError::Tampered {
            path: entry.path.display().to_string(),
            reason: format!("id {} does not match content hash {}", step.id, computed),
        });
    }
    if !step.reverse_is_inverse() {
        return Err(LedgerError::ReverseMismatch {
            step: step.id.clone(),
        });
    }
    Ok(())
}

fn join_ids(ids: &[&StepId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

type Chain = (Vec<MigrationStep>, HashMap<StepId, PathBuf>);

/// Arrange stored steps into a single chain from the root.
fn order_chain(stored: Vec<StoredStep>) -> LedgerResult<Chain> {
    let mut paths: HashMap<StepId, PathBuf> = HashMap::new();
    let mut by_id: HashMap<StepId, MigrationStep> = HashMap::new();
    for StoredStep { path, step } in stored {
        if let Some(first) = paths.get(&step.id) {
            return Err(LedgerError::DuplicateStep {
                id: step.id.clone(),
                first: first.display().to_string(),
                second: path.display().to_string(),
            });
        }
        paths.insert(step.id.clone(), path);
        by_id.insert(step.id.clone(), step);
    }

    // Sorted so error messages do not depend on hash order.
    let mut ids: Vec<&StepId> = by_id.keys().collect();
    ids.sort();

    let mut children: HashMap<Option<&StepId>, Vec<&StepId>> = HashMap::new();
    for id in &ids {
        let step = &by_id[*id];
        if let Some(parent) = &step.parent_id {
            if !by_id.contains_key(parent) {
                return Err(LedgerError::Orphan {
                    step: step.id.clone(),
                    parent: parent.to_string(),
                });
            }
        }
        children
            .entry(step.parent_id.as_ref())
            .or_default()
            .push(*id);
    }

    if let Some(roots) = children.get(&None) {
        if roots.len() > 1 {
            return Err(LedgerError::MultipleRoots { roots: join_ids(roots) });
        }
    }
    let mut branched: Vec<(&Option<&StepId>, &Vec<&StepId>)> =
        children.iter().filter(|(_, c)| c.len() > 1).collect();
    branched.sort();
    if let Some((parent, kids)) = branched.first() {
        return Err(LedgerError::Branched {
            parent: describe(**parent),
            children: join_ids(kids),
        });
    }

    let mut order: Vec<StepId> = Vec::with_capacity(ids.len());
    let mut cursor: Option<&StepId> = None;
    while let Some(next) = children.get(&cursor).and_then(|c| c.first()) {
        order.push((*next).clone());
        cursor = Some(*next);
    }

    // Anything left over is cut off from the root.
    if order.len() != by_id.len() {
        if let Some(stray) = ids.iter().copied().find(|id| !order.contains(*id)) {
            let step = &by_id[stray];
            return Err(LedgerError::Orphan {
                step: step.id.clone(),
                parent: describe(step.parent_id.as_ref()),
            });
        }
    }

    let steps = order
        .iter()
        .filter_map(|id| by_id.remove(id))
        .collect();
    Ok((steps, paths))
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
