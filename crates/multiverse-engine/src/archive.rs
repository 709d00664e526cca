//! Archive every timeline to `PostgreSQL` after a run.

use multiverse_core::Multiverse;
use multiverse_db::PostgresPool;
use tracing::info;

use crate::error::EngineError;

/// Export each timeline in `multiverse` and save it to the archive at
/// `url`. Returns the number of timelines archived.
///
/// Timelines are saved one transaction each, so a failure part way leaves
/// the earlier timelines archived.
///
/// # Errors
///
/// Returns [`EngineError::Archive`] if the connection, a migration, or a
/// save fails, and [`EngineError::Multiverse`] if an export fails.
pub async fn archive_all(multiverse: &Multiverse, url: &str) -> Result<usize, EngineError> {
    let pool = PostgresPool::connect_url(url).await?;
    pool.run_migrations().await?;

    let archive = pool.archive();
    let timelines = multiverse.timelines()?;
    for timeline in &timelines {
        let export = multiverse.export_timeline(&timeline.name)?;
        archive.save_timeline(&export).await?;
    }

    info!(timelines = timelines.len(), "Archive complete");
    pool.close().await;
    Ok(timelines.len())
}
