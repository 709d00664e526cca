//! Timeline archive operations.
//!
//! A [`TimelineExport`] is written into four tables in one transaction:
//!
//! | Table | Rows |
//! |-------|------|
//! | `timelines` | one per timeline, with its branch origin |
//! | `cell_records` | one per distinct hash, shared across timelines |
//! | `commits` | one per step |
//! | `commit_cells` | one per asserted, retracted, or checkpointed hash |
//!
//! Saving is idempotent and incremental: rows that already exist are left
//! alone, so re-archiving a timeline that has grown only inserts the new
//! commits. Hashes are stored as `BIGINT` by reinterpreting their bits.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use multiverse_types::{
    BranchOrigin, CellHash, CellRecord, CommitId, CommitRecord, Timeline, TimelineExport,
    TimelineId, TxId,
};

use crate::error::DbError;

const ROLE_ASSERTED: &str = "asserted";
const ROLE_RETRACTED: &str = "retracted";
const ROLE_CHECKPOINT: &str = "checkpoint";

/// Operations on the archive tables.
pub struct ArchiveStore<'a> {
    pool: &'a PgPool,
}

impl<'a> ArchiveStore<'a> {
    /// Create a new archive store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Archive a timeline export.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NameTaken`] if the name is archived under another
    /// id, [`DbError::HashCollision`] if a record disagrees with an archived
    /// one, and [`DbError::Postgres`] if a query fails. Nothing is written on
    /// error.
    pub async fn save_timeline(&self, export: &TimelineExport) -> Result<(), DbError> {
        let timeline = &export.timeline;
        let mut tx = self.pool.begin().await?;

        let existing: Option<Uuid> =
            sqlx::query_scalar(r"SELECT id FROM timelines WHERE name = $1")
                .bind(&timeline.name)
                .fetch_optional(&mut *tx)
                .await?;
        if existing.is_some_and(|id| id != timeline.id.into_inner()) {
            return Err(DbError::NameTaken(timeline.name.clone()));
        }

        let origin = timeline.origin.as_ref();
        sqlx::query(
            r"INSERT INTO timelines (id, name, created_at, origin_id, origin_name, origin_step)
              VALUES ($1, $2, $3, $4, $5, $6)
              ON CONFLICT (id) DO NOTHING",
        )
        .bind(timeline.id.into_inner())
        .bind(&timeline.name)
        .bind(timeline.created_at)
        .bind(origin.map(|o| o.source.into_inner()))
        .bind(origin.map(|o| o.source_name.clone()))
        .bind(origin.map(|o| i64::try_from(o.step).unwrap_or(i64::MAX)))
        .execute(&mut *tx)
        .await?;

        insert_records(&mut *tx, &export.records).await?;

        let (commit_rows, cell_rows) = flatten_commits(timeline.id, &export.commits);
        sqlx::query(
            r"INSERT INTO commits (id, timeline_id, step, tx, committed_at, is_checkpoint)
              SELECT * FROM UNNEST($1::UUID[], $2::UUID[], $3::BIGINT[], $4::BIGINT[], $5::TIMESTAMPTZ[], $6::BOOLEAN[])
              ON CONFLICT (id) DO NOTHING",
        )
        .bind(&commit_rows.ids)
        .bind(&commit_rows.timeline_ids)
        .bind(&commit_rows.steps)
        .bind(&commit_rows.txs)
        .bind(&commit_rows.committed_at)
        .bind(&commit_rows.checkpoints)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"INSERT INTO commit_cells (commit_id, hash, role)
              SELECT * FROM UNNEST($1::UUID[], $2::BIGINT[], $3::TEXT[])
              ON CONFLICT DO NOTHING",
        )
        .bind(&cell_rows.commit_ids)
        .bind(&cell_rows.hashes)
        .bind(&cell_rows.roles)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            timeline = %timeline.name,
            commits = export.commits.len(),
            records = export.records.len(),
            "Archived timeline"
        );
        Ok(())
    }

    /// Load an archived timeline by name.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if a query fails and
    /// [`DbError::Corrupt`] if the rows are inconsistent.
    pub async fn load_timeline(&self, name: &str) -> Result<Option<TimelineExport>, DbError> {
        let Some(timeline) = sqlx::query_as::<_, TimelineRow>(
            r"SELECT id, name, created_at, origin_id, origin_name, origin_step, archived_at
              FROM timelines
              WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(self.pool)
        .await?
        else {
            return Ok(None);
        };

        let commits = sqlx::query_as::<_, CommitRow>(
            r"SELECT id, step, tx, committed_at, is_checkpoint
              FROM commits
              WHERE timeline_id = $1
              ORDER BY step",
        )
        .bind(timeline.id)
        .fetch_all(self.pool)
        .await?;

        let cells = sqlx::query_as::<_, CommitCellRow>(
            r"SELECT cc.commit_id, cc.hash, cc.role
              FROM commit_cells cc
              JOIN commits c ON c.id = cc.commit_id
              WHERE c.timeline_id = $1",
        )
        .bind(timeline.id)
        .fetch_all(self.pool)
        .await?;

        let records = sqlx::query_as::<_, CellRecordRow>(
            r"SELECT DISTINCT r.hash, r.x, r.y
              FROM cell_records r
              JOIN commit_cells cc ON cc.hash = r.hash
              JOIN commits c ON c.id = cc.commit_id
              WHERE c.timeline_id = $1",
        )
        .bind(timeline.id)
        .fetch_all(self.pool)
        .await?;

        assemble_export(timeline, commits, cells, records).map(Some)
    }

    /// List archived timelines ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list_timelines(&self) -> Result<Vec<TimelineRow>, DbError> {
        let rows = sqlx::query_as::<_, TimelineRow>(
            r"SELECT id, name, created_at, origin_id, origin_name, origin_step, archived_at
              FROM timelines
              ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Number of archived commits for a timeline name.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn commit_count(&self, name: &str) -> Result<u64, DbError> {
        let count: i64 = sqlx::query_scalar(
            r"SELECT COUNT(*)
              FROM commits c
              JOIN timelines t ON t.id = c.timeline_id
              WHERE t.name = $1",
        )
        .bind(name)
        .fetch_one(self.pool)
        .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

/// A row from the `timelines` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TimelineRow {
    /// Timeline identifier.
    pub id: Uuid,
    /// Timeline name.
    pub name: String,
    /// When the timeline was created.
    pub created_at: DateTime<Utc>,
    /// Source timeline of a branch.
    pub origin_id: Option<Uuid>,
    /// Source timeline name of a branch.
    pub origin_name: Option<String>,
    /// Source step of a branch.
    pub origin_step: Option<i64>,
    /// When the timeline was first archived.
    pub archived_at: DateTime<Utc>,
}

/// A row from the `commits` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommitRow {
    /// Commit identifier.
    pub id: Uuid,
    /// Step index.
    pub step: i64,
    /// Transaction marker.
    pub tx: i64,
    /// Commit timestamp.
    pub committed_at: DateTime<Utc>,
    /// Whether `commit_cells` holds a full-board checkpoint for this commit.
    pub is_checkpoint: bool,
}

/// A row from the `commit_cells` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommitCellRow {
    /// Owning commit.
    pub commit_id: Uuid,
    /// Record hash, bit-reinterpreted as signed.
    pub hash: i64,
    /// `asserted`, `retracted`, or `checkpoint`.
    pub role: String,
}

/// A row from the `cell_records` table.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct CellRecordRow {
    /// Record hash, bit-reinterpreted as signed.
    pub hash: i64,
    /// Column coordinate.
    pub x: i32,
    /// Row coordinate.
    pub y: i32,
}

impl From<CellRecordRow> for CellRecord {
    fn from(row: CellRecordRow) -> Self {
        Self {
            hash: CellHash::from_signed(row.hash),
            x: row.x,
            y: row.y,
        }
    }
}

/// Column arrays for the `commits` UNNEST insert.
#[derive(Debug, Default)]
struct CommitColumns {
    ids: Vec<Uuid>,
    timeline_ids: Vec<Uuid>,
    steps: Vec<i64>,
    txs: Vec<i64>,
    committed_at: Vec<DateTime<Utc>>,
    checkpoints: Vec<bool>,
}

/// Column arrays for the `commit_cells` UNNEST insert.
#[derive(Debug, Default)]
struct CellColumns {
    commit_ids: Vec<Uuid>,
    hashes: Vec<i64>,
    roles: Vec<String>,
}

impl CellColumns {
    fn push_all(&mut self, commit: Uuid, hashes: &BTreeSet<CellHash>, role: &str) {
        for hash in hashes {
            self.commit_ids.push(commit);
            self.hashes.push(hash.to_signed());
            self.roles.push(role.to_owned());
        }
    }
}

fn flatten_commits(timeline: TimelineId, commits: &[CommitRecord]) -> (CommitColumns, CellColumns) {
    let mut rows = CommitColumns::default();
    let mut cells = CellColumns::default();
    for commit in commits {
        let id = commit.id.into_inner();
        rows.ids.push(id);
        rows.timeline_ids.push(timeline.into_inner());
        rows.steps.push(i64::try_from(commit.step).unwrap_or(i64::MAX));
        rows.txs.push(i64::try_from(commit.tx.into_inner()).unwrap_or(i64::MAX));
        rows.committed_at.push(commit.committed_at);
        rows.checkpoints.push(commit.checkpoint.is_some());

        cells.push_all(id, &commit.asserted, ROLE_ASSERTED);
        cells.push_all(id, &commit.retracted, ROLE_RETRACTED);
        if let Some(full) = &commit.checkpoint {
            cells.push_all(id, full, ROLE_CHECKPOINT);
        }
    }
    (rows, cells)
}

/// Insert records, then confirm the archive agrees with every one of them.
async fn insert_records(conn: &mut PgConnection, records: &[CellRecord]) -> Result<(), DbError> {
    let mut hashes = Vec::with_capacity(records.len());
    let mut xs = Vec::with_capacity(records.len());
    let mut ys = Vec::with_capacity(records.len());
    for record in records {
        hashes.push(record.hash.to_signed());
        xs.push(record.x);
        ys.push(record.y);
    }
    sqlx::query(
        r"INSERT INTO cell_records (hash, x, y)
          SELECT * FROM UNNEST($1::BIGINT[], $2::INTEGER[], $3::INTEGER[])
          ON CONFLICT DO NOTHING",
    )
    .bind(&hashes)
    .bind(&xs)
    .bind(&ys)
    .execute(&mut *conn)
    .await?;

    let archived = sqlx::query_as::<_, CellRecordRow>(
        r"SELECT hash, x, y FROM cell_records WHERE hash = ANY($1)",
    )
    .bind(&hashes)
    .fetch_all(&mut *conn)
    .await?;
    check_records(records, &archived)
}

/// Confirm every incoming record matches what the archive holds.
fn check_records(incoming: &[CellRecord], archived: &[CellRecordRow]) -> Result<(), DbError> {
    let archived: BTreeMap<CellHash, CellRecord> = archived
        .iter()
        .map(|&row| {
            let record = CellRecord::from(row);
            (record.hash, record)
        })
        .collect();
    for record in incoming {
        match archived.get(&record.hash) {
            Some(stored) if stored.cell() != record.cell() => {
                return Err(DbError::HashCollision {
                    hash: record.hash,
                    archived: stored.cell(),
                    incoming: record.cell(),
                });
            }
            Some(_) => {}
            None => {
                return Err(DbError::Corrupt(format!(
                    "record {} missing after insert",
                    record.hash
                )));
            }
        }
    }
    Ok(())
}

/// Hash sets attached to one archived commit.
#[derive(Debug, Default)]
struct Members {
    asserted: BTreeSet<CellHash>,
    retracted: BTreeSet<CellHash>,
    checkpoint: BTreeSet<CellHash>,
}

/// Rebuild an export from archive rows.
fn assemble_export(
    timeline: TimelineRow,
    commits: Vec<CommitRow>,
    cells: Vec<CommitCellRow>,
    records: Vec<CellRecordRow>,
) -> Result<TimelineExport, DbError> {
    let origin = match (timeline.origin_id, timeline.origin_name, timeline.origin_step) {
        (Some(source), Some(source_name), Some(step)) => Some(BranchOrigin {
            source: TimelineId::from(source),
            source_name,
            step: u64::try_from(step).map_err(|_conv| {
                DbError::Corrupt(format!("negative origin step {step}"))
            })?,
        }),
        (None, None, None) => None,
        _ => {
            return Err(DbError::Corrupt(format!(
                "partial branch origin on timeline {}",
                timeline.name
            )));
        }
    };
    let id = TimelineId::from(timeline.id);

    let mut members: BTreeMap<Uuid, Members> = BTreeMap::new();
    for cell in cells {
        let entry = members.entry(cell.commit_id).or_default();
        let hash = CellHash::from_signed(cell.hash);
        let set = match cell.role.as_str() {
            ROLE_ASSERTED => &mut entry.asserted,
            ROLE_RETRACTED => &mut entry.retracted,
            ROLE_CHECKPOINT => &mut entry.checkpoint,
            other => return Err(DbError::Corrupt(format!("unknown cell role {other:?}"))),
        };
        set.insert(hash);
    }

    let mut out = Vec::with_capacity(commits.len());
    for row in commits {
        let step = u64::try_from(row.step)
            .map_err(|_conv| DbError::Corrupt(format!("negative step {}", row.step)))?;
        let tx = u64::try_from(row.tx)
            .map_err(|_conv| DbError::Corrupt(format!("negative tx {}", row.tx)))?;
        let Members {
            asserted,
            retracted,
            checkpoint,
        } = members.remove(&row.id).unwrap_or_default();
        out.push(CommitRecord {
            id: CommitId::from(row.id),
            timeline: id,
            step,
            tx: TxId(tx),
            committed_at: row.committed_at,
            asserted,
            retracted,
            checkpoint: row.is_checkpoint.then_some(checkpoint),
        });
    }

    let mut records: Vec<CellRecord> = records.into_iter().map(CellRecord::from).collect();
    records.sort_by_key(|record| record.hash);

    Ok(TimelineExport {
        timeline: Timeline {
            id,
            name: timeline.name,
            created_at: timeline.created_at,
            origin,
        },
        records,
        commits: out,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn hashes(raw: &[u64]) -> BTreeSet<CellHash> {
        raw.iter().copied().map(CellHash).collect()
    }

    fn sample_export() -> TimelineExport {
        let timeline = Timeline {
            id: TimelineId::new(),
            name: "fork".to_owned(),
            created_at: Utc::now(),
            origin: Some(BranchOrigin {
                source: TimelineId::new(),
                source_name: "main".to_owned(),
                step: 3,
            }),
        };
        let commit = |step: u64, asserted: &[u64], retracted: &[u64], checkpoint: Option<&[u64]>| {
            CommitRecord {
                id: CommitId::new(),
                timeline: timeline.id,
                step,
                tx: TxId(step.saturating_add(10)),
                committed_at: Utc::now(),
                asserted: hashes(asserted),
                retracted: hashes(retracted),
                checkpoint: checkpoint.map(hashes),
            }
        };
        TimelineExport {
            commits: vec![
                commit(0, &[1, u64::MAX], &[], None),
                commit(1, &[], &[1], Some(&[u64::MAX][..])),
                commit(2, &[], &[u64::MAX], Some(&[][..])),
            ],
            records: vec![
                CellRecord {
                    hash: CellHash(1),
                    x: 0,
                    y: 0,
                },
                CellRecord {
                    hash: CellHash(u64::MAX),
                    x: -5,
                    y: 7,
                },
            ],
            timeline,
        }
    }

    /// Simulate the rows the archive would return for an export.
    fn rows_for(
        export: &TimelineExport,
    ) -> (TimelineRow, Vec<CommitRow>, Vec<CommitCellRow>, Vec<CellRecordRow>) {
        let origin = export.timeline.origin.as_ref();
        let timeline = TimelineRow {
            id: export.timeline.id.into_inner(),
            name: export.timeline.name.clone(),
            created_at: export.timeline.created_at,
            origin_id: origin.map(|o| o.source.into_inner()),
            origin_name: origin.map(|o| o.source_name.clone()),
            origin_step: origin.map(|o| i64::try_from(o.step).unwrap()),
            archived_at: Utc::now(),
        };
        let (commit_cols, cell_cols) = flatten_commits(export.timeline.id, &export.commits);
        let commits = commit_cols
            .ids
            .iter()
            .zip(&commit_cols.steps)
            .zip(&commit_cols.txs)
            .zip(&commit_cols.committed_at)
            .zip(&commit_cols.checkpoints)
            .map(|((((id, step), tx), at), cp)| CommitRow {
                id: *id,
                step: *step,
                tx: *tx,
                committed_at: *at,
                is_checkpoint: *cp,
            })
            .collect();
        let cells = cell_cols
            .commit_ids
            .iter()
            .zip(&cell_cols.hashes)
            .zip(&cell_cols.roles)
            .map(|((commit_id, hash), role)| CommitCellRow {
                commit_id: *commit_id,
                hash: *hash,
                role: role.clone(),
            })
            .rev()
            .collect();
        let records = export
            .records
            .iter()
            .rev()
            .map(|r| CellRecordRow {
                hash: r.hash.to_signed(),
                x: r.x,
                y: r.y,
            })
            .collect();
        (timeline, commits, cells, records)
    }

    #[test]
    fn rows_reassemble_into_the_same_export() {
        let export = sample_export();
        let (timeline, commits, cells, records) = rows_for(&export);
        let rebuilt = assemble_export(timeline, commits, cells, records).unwrap();
        assert_eq!(rebuilt, export);
    }

    #[test]
    fn empty_checkpoint_survives() {
        let export = sample_export();
        let (timeline, commits, cells, records) = rows_for(&export);
        let rebuilt = assemble_export(timeline, commits, cells, records).unwrap();
        assert_eq!(
            rebuilt.commits.last().and_then(|c| c.checkpoint.clone()),
            Some(BTreeSet::new())
        );
        assert_eq!(rebuilt.commits.first().map(|c| c.checkpoint.is_none()), Some(true));
    }

    #[test]
    fn flatten_counts_every_membership() {
        let export = sample_export();
        let (rows, cells) = flatten_commits(export.timeline.id, &export.commits);
        assert_eq!(rows.ids.len(), 3);
        assert_eq!(rows.checkpoints, vec![false, true, true]);
        assert_eq!(cells.hashes.len(), 5);
        assert!(cells.hashes.contains(&-1));
    }

    #[test]
    fn partial_origin_is_corrupt() {
        let export = sample_export();
        let (mut timeline, commits, cells, records) = rows_for(&export);
        timeline.origin_step = None;
        let result = assemble_export(timeline, commits, cells, records);
        assert!(matches!(result, Err(DbError::Corrupt(_))));
    }

    #[test]
    fn unknown_role_is_corrupt() {
        let export = sample_export();
        let (timeline, commits, mut cells, records) = rows_for(&export);
        if let Some(cell) = cells.first_mut() {
            cell.role = "sideways".to_owned();
        }
        let result = assemble_export(timeline, commits, cells, records);
        assert!(matches!(result, Err(DbError::Corrupt(_))));
    }

    #[test]
    fn collision_is_detected() {
        let incoming = [CellRecord {
            hash: CellHash(9),
            x: 1,
            y: 1,
        }];
        let archived = [CellRecordRow {
            hash: 9,
            x: 2,
            y: 2,
        }];
        assert!(matches!(
            check_records(&incoming, &archived),
            Err(DbError::HashCollision { .. })
        ));
        let same = [CellRecordRow {
            hash: 9,
            x: 1,
            y: 1,
        }];
        assert!(check_records(&incoming, &same).is_ok());
        assert!(matches!(
            check_records(&incoming, &[]),
            Err(DbError::Corrupt(_))
        ));
    }
}
