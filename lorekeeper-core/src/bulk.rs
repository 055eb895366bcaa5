use crate::fixers::FixerPipeline;
use crate::models::{ArtistRecord, EvaluationResult};
use crate::rules::{ArtistContext, CheckerRegistry};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{error, info};

/// §4.6 bulk job state, guarded by a mutex the progress publisher reads
/// under the lock (§5). Grounded on the teacher's `TaskManager` job
/// bookkeeping, collapsed from a generic task envelope into the one shape
/// a curation sweep needs.
#[derive(Debug, Clone)]
pub struct BulkJobState {
    pub id: String,
    pub total: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub current_artist: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled: bool,
}

impl BulkJobState {
    fn new(id: String, total: usize, now: DateTime<Utc>) -> Self {
        Self {
            id,
            total,
            processed: 0,
            succeeded: 0,
            failed: 0,
            current_artist: None,
            started_at: now,
            completed_at: None,
            cancelled: false,
        }
    }
}

/// One artist's outcome from a bulk run: the re-evaluation taken after
/// the fixer pipeline ran, or `None` if the artist's own pipeline run
/// panicked/errored (recorded as `failed`, never aborting the job).
pub struct ArtistRunOutcome {
    pub artist_id: String,
    pub evaluation: Option<EvaluationResult>,
    pub error: Option<String>,
}

/// A caller-supplied per-artist unit of work: build the context, run the
/// rule engine, run the fixer pipeline, re-evaluate. Abstracted behind a
/// trait so `BulkExecutor` never needs to know about the scanner or
/// filesystem directly — those are external collaborators (§1).
#[async_trait::async_trait]
pub trait ArtistRunner: Send + Sync {
    async fn run(&self, artist: &ArtistRecord) -> Result<EvaluationResult, String>;
}

/// Default runner: evaluate, fix, re-evaluate, for one artist against the
/// shared registries. Crash isolation lives one level up, in
/// `BulkExecutor::run`, via `JoinSet` — a panic inside `run` here
/// surfaces as a `JoinError`, not a process crash.
pub struct PipelineArtistRunner {
    pub checkers: Arc<CheckerRegistry>,
    pub fixers: Arc<FixerPipeline>,
    pub rules: Vec<crate::models::Rule>,
    pub context_builder: Arc<dyn Fn(&ArtistRecord) -> ArtistContext + Send + Sync>,
}

#[async_trait::async_trait]
impl ArtistRunner for PipelineArtistRunner {
    async fn run(&self, artist: &ArtistRecord) -> Result<EvaluationResult, String> {
        let ctx = (self.context_builder)(artist);
        let first_pass = crate::rules::evaluate(&artist.id, &self.rules, &self.checkers, &ctx);
        if first_pass.violations.is_empty() {
            return Ok(first_pass);
        }

        let mut fix_ctx = crate::fixers::FixContext {
            dir: std::path::PathBuf::from(&artist.path),
            record: artist.clone(),
            metadata: ctx.metadata.clone(),
            kodi_numbering: false,
            use_symlinks: false,
        };
        self.fixers.run(&mut fix_ctx, &first_pass.violations).await;

        let reevaluated_ctx = (self.context_builder)(&fix_ctx.record);
        Ok(crate::rules::evaluate(&artist.id, &self.rules, &self.checkers, &reevaluated_ctx))
    }
}

/// §4.6 bulk executor. Accepts an artist selector (the caller resolves it
/// to a concrete `Vec<ArtistRecord>` — query parsing is an external
/// collaborator's job), runs `runner` for each under crash isolation, and
/// tracks cooperative cancellation at artist boundaries. Grounded on the
/// teacher's `TaskManager`: a `JoinSet` of per-artist tasks plus
/// `await_join_set`'s error-is-not-fatal idiom, generalized from one
/// import-folder task per call to N artist-pipeline tasks per job.
pub struct BulkExecutor {
    state: Mutex<BulkJobState>,
    cancel: AtomicBool,
}

impl BulkExecutor {
    pub fn new(id: String, total: usize, now: DateTime<Utc>) -> Self {
        Self {
            state: Mutex::new(BulkJobState::new(id, total, now)),
            cancel: AtomicBool::new(false),
        }
    }

    pub async fn snapshot(&self) -> BulkJobState {
        self.state.lock().await.clone()
    }

    /// Cooperative cancellation: observed at the next artist boundary,
    /// never mid-artist.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub async fn run(self: Arc<Self>, artists: Vec<ArtistRecord>, runner: Arc<dyn ArtistRunner>, now: DateTime<Utc>) -> Vec<ArtistRunOutcome> {
        let mut outcomes = Vec::with_capacity(artists.len());
        let mut join_set: JoinSet<(String, Result<EvaluationResult, String>)> = JoinSet::new();
        let mut queue = artists.into_iter();

        // One in-flight artist at a time mirrors §5's "first provider wins,
        // no interleaved racing" ordering guarantee applied to fixer writes
        // — two artists never race on a shared rate-limiter bucket burst.
        while let Some(artist) = queue.next() {
            if self.cancel.load(Ordering::SeqCst) {
                let mut state = self.state.lock().await;
                state.cancelled = true;
                break;
            }

            {
                let mut state = self.state.lock().await;
                state.current_artist = Some(artist.id.clone());
            }

            let runner = runner.clone();
            let artist_id = artist.id.clone();
            join_set.spawn(async move {
                let result = runner.run(&artist).await;
                (artist_id, result)
            });

            while let Some(joined) = join_set.join_next().await {
                let (artist_id, result) = match joined {
                    Ok(pair) => pair,
                    Err(join_err) => {
                        error!(error = %join_err, "artist pipeline task panicked");
                        ("unknown".to_string(), Err(join_err.to_string()))
                    }
                };
                self.record_outcome(&artist_id, &result).await;
                outcomes.push(ArtistRunOutcome {
                    artist_id,
                    evaluation: result.as_ref().ok().cloned(),
                    error: result.err(),
                });
            }
        }

        let mut state = self.state.lock().await;
        state.completed_at = Some(now);
        state.current_artist = None;
        info!(job = %state.id, succeeded = state.succeeded, failed = state.failed, "bulk job finished");

        outcomes
    }

    async fn record_outcome(&self, artist_id: &str, result: &Result<EvaluationResult, String>) {
        let mut state = self.state.lock().await;
        state.processed += 1;
        match result {
            Ok(_) => state.succeeded += 1,
            Err(e) => {
                state.failed += 1;
                error!(artist = artist_id, error = %e, "artist pipeline run failed");
            }
        }
    }
}
