//! Export and import of whole timelines.
//!
//! A [`TimelineExport`] carries a timeline header, its commits in step
//! order, and every record those commits reference. It is the unit the
//! archive persists. Import re-validates everything before writing: steps
//! must be contiguous, every delta must be minimal against the replayed
//! board, checkpoints must match the replay, and every record must hash to
//! itself under this multiverse's hasher.

use std::collections::{BTreeMap, BTreeSet};

use tracing::info;

use multiverse_store::{CommitDraft, Substrate, Transaction};
use multiverse_types::{CellHash, CellRecord, Timeline, TimelineExport};

use crate::error::MultiverseError;
use crate::timeline::Multiverse;

impl<S: Substrate> Multiverse<S> {
    /// Export a timeline with its commits and referenced records.
    ///
    /// # Errors
    ///
    /// Returns [`MultiverseError::TimelineNotFound`] for an unknown name.
    pub fn export_timeline(&self, name: &str) -> Result<TimelineExport, MultiverseError> {
        let basis = self.store.basis()?;
        let timeline = self.resolve(name, basis)?;
        let count = self.store.commit_count(timeline.id, basis)?;
        let commits = self.store.commits(timeline.id, 0..count, basis)?;

        let mut hashes: BTreeSet<CellHash> = BTreeSet::new();
        for commit in &commits {
            hashes.extend(commit.asserted.iter().copied());
            hashes.extend(commit.retracted.iter().copied());
            hashes.extend(commit.checkpoint.iter().flatten().copied());
        }
        let records = self.store.records(&hashes)?.into_values().collect();

        Ok(TimelineExport {
            timeline,
            records,
            commits,
        })
    }

    /// Recreate an exported timeline, keeping its identifiers, origin, and
    /// commit timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`MultiverseError::InvalidExport`] if the export is
    /// inconsistent, [`MultiverseError::NameCollision`] if the name is taken,
    /// and an [`IntegrityViolation`](crate::ErrorKind::IntegrityViolation)
    /// if a record collides with a stored one.
    pub fn import_timeline(&self, export: TimelineExport) -> Result<Timeline, MultiverseError> {
        let basis = self.store.basis()?;
        if self
            .store
            .timeline_by_name(&export.timeline.name, basis)?
            .is_some()
        {
            return Err(MultiverseError::NameCollision {
                name: export.timeline.name,
            });
        }
        self.validate_export(&export)?;

        let TimelineExport {
            timeline,
            records,
            commits,
        } = export;
        let commit_count = commits.len();
        let mut tx = Transaction::new()
            .create_timeline(timeline.clone())
            .intern_all(records);
        for commit in commits {
            let mut draft = CommitDraft::new(timeline.id, commit.step)
                .asserting(commit.asserted)
                .retracting(commit.retracted);
            if let Some(full) = commit.checkpoint {
                draft = draft.with_checkpoint(full);
            }
            draft.id = commit.id;
            draft.committed_at = Some(commit.committed_at);
            tx = tx.append_commit(draft);
        }

        let receipt = self.store.transact(tx)?;
        info!(
            timeline = %timeline.name,
            id = %timeline.id,
            commits = commit_count,
            records_interned = receipt.records_interned,
            "Imported timeline"
        );
        Ok(timeline)
    }

    fn validate_export(&self, export: &TimelineExport) -> Result<(), MultiverseError> {
        let invalid = |reason: String| MultiverseError::InvalidExport {
            timeline: export.timeline.name.clone(),
            reason,
        };

        let mut records: BTreeMap<CellHash, CellRecord> = BTreeMap::new();
        for record in &export.records {
            let expected = self.hasher.hash_cell(record.cell());
            if expected != record.hash {
                return Err(invalid(format!(
                    "record {} for {} should hash to {expected}",
                    record.hash,
                    record.cell()
                )));
            }
            records.insert(record.hash, *record);
        }

        let mut live: BTreeSet<CellHash> = BTreeSet::new();
        for (expected_step, commit) in (0_u64..).zip(&export.commits) {
            if commit.timeline != export.timeline.id {
                return Err(invalid(format!(
                    "commit {} belongs to timeline {}",
                    commit.step, commit.timeline
                )));
            }
            if commit.step != expected_step {
                return Err(invalid(format!(
                    "expected step {expected_step}, found {}",
                    commit.step
                )));
            }
            let referenced = commit
                .asserted
                .iter()
                .chain(&commit.retracted)
                .chain(commit.checkpoint.iter().flatten());
            for hash in referenced {
                if !records.contains_key(hash) {
                    return Err(invalid(format!(
                        "step {} references missing record {hash}",
                        commit.step
                    )));
                }
            }
            if !commit.retracted.is_subset(&live) || !commit.asserted.is_disjoint(&live) {
                return Err(invalid(format!(
                    "step {} is not a minimal delta",
                    commit.step
                )));
            }
            for hash in &commit.retracted {
                live.remove(hash);
            }
            live.extend(commit.asserted.iter().copied());
            if commit.checkpoint.as_ref().is_some_and(|full| *full != live) {
                return Err(invalid(format!(
                    "step {} checkpoint does not match its replay",
                    commit.step
                )));
            }
        }
        Ok(())
    }
}
