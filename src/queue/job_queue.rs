//! Job queue: admission control, fan-out and per-job execution

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::assets::{ReferenceAssetManager, ReferenceSet};
use crate::config::QueueSettings;
use crate::error::{AppError, Result};
use crate::history::{HistoryLog, NewHistoryEntry};
use crate::ledger::{LedgerClient, Pricing};
use crate::provider::{ProviderGateway, ProviderOutput, DEFAULT_FAILURE_MESSAGE};
use crate::queue::job::{GenerationJob, JobStatus, CANCELLED_MESSAGE, NO_IMAGES_MESSAGE};
use crate::queue::payload;
use crate::registry::{ModelDescriptor, ModelRegistry};

type JobTable = RwLock<Vec<GenerationJob>>;

/// Configuration for the job queue
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Hard ceiling on pending plus running jobs
    pub max_parallel_jobs: usize,
    /// Elapsed time refresh period for running jobs
    pub elapsed_tick: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_parallel_jobs: 5,
            elapsed_tick: Duration::from_millis(50),
        }
    }
}

impl From<&QueueSettings> for QueueConfig {
    fn from(settings: &QueueSettings) -> Self {
        Self {
            max_parallel_jobs: settings.max_parallel_jobs,
            elapsed_tick: Duration::from_millis(settings.elapsed_tick_ms),
        }
    }
}

/// Collaborators a queue dispatches through
#[derive(Clone)]
pub struct QueueServices {
    pub registry: Arc<ModelRegistry>,
    pub provider: Arc<dyn ProviderGateway>,
    pub assets: Arc<ReferenceAssetManager>,
    pub ledger: Arc<LedgerClient>,
    pub history: HistoryLog,
    pub pricing: Pricing,
}

/// One submission event, fanned out to one job per model
#[derive(Debug, Clone, Default)]
pub struct SubmitRequest {
    pub prompt: String,
    pub model_ids: Vec<String>,
    pub inputs: Map<String, Value>,
    pub references: ReferenceSet,
}

/// Jobs created by an accepted submission
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub jobs: Vec<GenerationJob>,
    pub total_cost: u64,
}

/// Price of one planned invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimate {
    pub model_id: String,
    pub invocation_id: String,
    pub tokens: u64,
}

/// Clone the job, let `update` modify the copy and swap it in.
/// Nothing changes when `update` returns false.
fn replace<F>(table: &JobTable, id: &str, update: F) -> Option<GenerationJob>
where
    F: FnOnce(&mut GenerationJob) -> bool,
{
    let mut jobs = table.write();
    let slot = jobs.iter_mut().find(|job| job.id == id)?;
    let mut next = slot.clone();
    if !update(&mut next) {
        return None;
    }
    *slot = next.clone();
    Some(next)
}

/// Refresh elapsed time of running jobs. Parks on `wake` while nothing is running.
fn spawn_elapsed_ticker(table: Weak<JobTable>, every: Duration, wake: Arc<Notify>, shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every.max(Duration::from_millis(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let Some(table) = table.upgrade() else {
                break;
            };

            let running: Vec<String> = table
                .read()
                .iter()
                .filter(|job| job.status == JobStatus::Running)
                .map(|job| job.id.clone())
                .collect();

            if running.is_empty() {
                drop(table);
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = wake.notified() => {}
                }
                interval.reset();
                continue;
            }

            let now = Utc::now();
            for id in running {
                replace(&table, &id, |job| {
                    if job.status != JobStatus::Running {
                        return false;
                    }
                    job.tick(now);
                    true
                });
            }
            drop(table);

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }
        }

        debug!("Elapsed ticker stopped");
    });
}

/// Runs a single job to completion
#[derive(Clone)]
struct Executor {
    table: Arc<JobTable>,
    wake: Arc<Notify>,
    provider: Arc<dyn ProviderGateway>,
    history: HistoryLog,
    ledger: Arc<LedgerClient>,
}

impl Executor {
    async fn run(self, job_id: String, cancel: CancellationToken) {
        let started = replace(&self.table, &job_id, |job| {
            if job.status != JobStatus::Pending {
                return false;
            }
            job.start(Utc::now());
            true
        });
        let Some(job) = started else {
            debug!(job_id = %job_id, "Job left pending before dispatch");
            return;
        };

        self.wake.notify_one();
        info!(job_id = %job.id, invocation_id = %job.invocation_id, "Job started");

        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
        let provider = self.provider.clone();
        let invocation_id = job.invocation_id.clone();
        let input = job.resolved_inputs.clone();
        let mut call = tokio::spawn(async move { provider.submit(&invocation_id, input, progress_tx).await });

        // Buffered progress is drained before the result is looked at
        let joined = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break None,
                Some(update) = progress_rx.recv() => {
                    self.append_logs(&job.id, update.relevant_messages());
                }
                joined = &mut call => break Some(joined),
            }
        };

        let Some(joined) = joined else {
            let job_id = job.id.clone();
            tokio::spawn(async move {
                if let Ok(Ok(_)) = call.await {
                    warn!(job_id = %job_id, "Discarding result of cancelled job");
                }
            });
            return;
        };

        match joined {
            Ok(Ok(output)) => self.finish_success(&job, output).await,
            Ok(Err(e)) => {
                warn!(job_id = %job.id, invocation_id = %job.invocation_id, error = %e, "Provider call failed");
                self.finish_error(&job, e.user_message());
            }
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "Provider task aborted");
                self.finish_error(&job, DEFAULT_FAILURE_MESSAGE.to_string());
            }
        }
    }

    fn append_logs(&self, job_id: &str, messages: Vec<String>) {
        if messages.is_empty() {
            return;
        }
        debug!(job_id = %job_id, lines = messages.len(), "Progress received");
        replace(&self.table, job_id, |job| {
            if job.status != JobStatus::Running {
                return false;
            }
            job.logs.extend(messages);
            true
        });
    }

    async fn finish_success(&self, job: &GenerationJob, output: ProviderOutput) {
        let urls = output.image_urls();
        if urls.is_empty() {
            self.finish_error(job, NO_IMAGES_MESSAGE.to_string());
            return;
        }

        let images = urls.clone();
        let applied = replace(&self.table, &job.id, |current| {
            if current.status != JobStatus::Running {
                return false;
            }
            current.complete(images);
            true
        });
        if applied.is_none() {
            warn!(job_id = %job.id, "Discarding result of job no longer running");
            return;
        }

        info!(job_id = %job.id, images = urls.len(), "Job done");

        let entries = urls
            .into_iter()
            .map(|url| NewHistoryEntry::new(url, job.prompt.clone(), job.invocation_id.clone()))
            .collect();
        if let Err(e) = self.history.append(entries).await {
            warn!(job_id = %job.id, error = %e, "History write failed");
        }
        if let Err(e) = self.ledger.refresh().await {
            warn!(job_id = %job.id, error = %e, "Balance refresh failed");
        }
    }

    fn finish_error(&self, job: &GenerationJob, message: String) {
        let applied = replace(&self.table, &job.id, |current| {
            if current.status != JobStatus::Running {
                return false;
            }
            current.fail(message.clone());
            true
        });
        match applied {
            Some(_) => info!(job_id = %job.id, error = %message, "Job failed"),
            None => warn!(job_id = %job.id, "Discarding failure of job no longer running"),
        }
    }
}

/// Per-user set of in-flight and finished generation jobs
pub struct JobQueue {
    config: QueueConfig,
    services: QueueServices,
    executor: Executor,
    admission: Mutex<()>,
    ticker_shutdown: CancellationToken,
}

impl JobQueue {
    /// Create a queue and start its elapsed time ticker
    pub fn new(config: QueueConfig, services: QueueServices) -> Self {
        let table: Arc<JobTable> = Arc::new(RwLock::new(Vec::new()));
        let wake = Arc::new(Notify::new());
        let ticker_shutdown = CancellationToken::new();
        spawn_elapsed_ticker(
            Arc::downgrade(&table),
            config.elapsed_tick,
            wake.clone(),
            ticker_shutdown.clone(),
        );

        let executor = Executor {
            table,
            wake,
            provider: services.provider.clone(),
            history: services.history.clone(),
            ledger: services.ledger.clone(),
        };

        Self {
            config,
            services,
            executor,
            admission: Mutex::new(()),
            ticker_shutdown,
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Invocation id per model for a submission with or without references
    fn plan(models: Vec<ModelDescriptor>, has_references: bool) -> Vec<(ModelDescriptor, String)> {
        models
            .into_iter()
            .map(|model| {
                let invocation_id = model.invocation_id(has_references).to_string();
                (model, invocation_id)
            })
            .collect()
    }

    fn price(&self, plan: &[(ModelDescriptor, String)], inputs: &Map<String, Value>) -> Vec<CostEstimate> {
        plan.iter()
            .map(|(model, invocation_id)| CostEstimate {
                model_id: model.id.clone(),
                invocation_id: invocation_id.clone(),
                tokens: self
                    .services
                    .pricing
                    .estimate_cost(model, &payload::variant_inputs(model, invocation_id, inputs)),
            })
            .collect()
    }

    /// Per-model prices exactly as a submission would be charged
    pub fn estimate(
        &self,
        model_ids: &[String],
        inputs: &Map<String, Value>,
        has_references: bool,
    ) -> Result<Vec<CostEstimate>> {
        let models = self.services.registry.resolve_all(model_ids)?;
        Ok(self.price(&Self::plan(models, has_references), inputs))
    }

    /// Admit a submission and dispatch one job per model.
    ///
    /// Either every job is created or none is.
    pub async fn submit(&self, request: SubmitRequest) -> Result<Submission> {
        let prompt = request.prompt.trim().to_string();
        if prompt.is_empty() {
            return Err(AppError::InvalidRequest("Prompt cannot be empty".to_string()));
        }
        if request.model_ids.is_empty() {
            return Err(AppError::InvalidRequest("At least one model is required".to_string()));
        }
        let models = self.services.registry.resolve_all(&request.model_ids)?;

        let _admission = self.admission.lock().await;

        let active = self.active_count();
        let max = self.config.max_parallel_jobs;
        if active + models.len() > max {
            return Err(AppError::ParallelLimit {
                max,
                available: max.saturating_sub(active),
            });
        }

        let plan = Self::plan(models, !request.references.is_empty());
        let total_cost: u64 = self.price(&plan, &request.inputs).iter().map(|c| c.tokens).sum();

        if let Some(available) = self.services.ledger.cached().value {
            if available < total_cost {
                return Err(AppError::InsufficientTokens {
                    required: total_cost,
                    available,
                });
            }
        }

        let references = self.services.assets.resolve_all(&request.references).await?;

        let jobs: Vec<GenerationJob> = plan
            .into_iter()
            .map(|(model, invocation_id)| {
                let input = payload::build(&model, &invocation_id, &prompt, &request.inputs, &references);
                GenerationJob::new(prompt.clone(), model, invocation_id, input)
            })
            .collect();

        self.executor.table.write().extend(jobs.iter().cloned());

        for job in &jobs {
            info!(
                job_id = %job.id,
                invocation_id = %job.invocation_id,
                user = %self.services.ledger.user(),
                "Job created"
            );
            let cancel = job.cancel_token.clone().unwrap_or_default();
            tokio::spawn(self.executor.clone().run(job.id.clone(), cancel));
        }

        Ok(Submission { jobs, total_cost })
    }

    /// Cancel a pending or running job. Terminal jobs are returned unchanged.
    pub fn cancel(&self, id: &str) -> Result<GenerationJob> {
        let mut token = None;
        let cancelled = replace(&self.executor.table, id, |job| {
            if !job.is_active() {
                return false;
            }
            token = job.cancel_token.clone();
            job.fail(CANCELLED_MESSAGE);
            true
        });

        match cancelled {
            Some(job) => {
                if let Some(token) = token {
                    token.cancel();
                }
                info!(job_id = %id, "Job cancelled");
                Ok(job)
            }
            None => self.job(id).ok_or_else(|| AppError::JobNotFound(id.to_string())),
        }
    }

    /// Remove a job, cancelling it first when still active
    pub fn dismiss(&self, id: &str) -> Result<GenerationJob> {
        self.cancel(id)?;
        let mut jobs = self.executor.table.write();
        let position = jobs
            .iter()
            .position(|job| job.id == id)
            .ok_or_else(|| AppError::JobNotFound(id.to_string()))?;
        Ok(jobs.remove(position))
    }

    /// Remove every job, cancelling active ones. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let removed: Vec<GenerationJob> = std::mem::take(&mut *self.executor.table.write());
        for job in &removed {
            if let Some(token) = &job.cancel_token {
                token.cancel();
            }
        }
        info!(removed = removed.len(), "Queue cleared");
        removed.len()
    }

    /// All tracked jobs in creation order
    pub fn jobs(&self) -> Vec<GenerationJob> {
        self.executor.table.read().clone()
    }

    pub fn job(&self, id: &str) -> Option<GenerationJob> {
        self.executor.table.read().iter().find(|job| job.id == id).cloned()
    }

    pub fn active_count(&self) -> usize {
        self.executor.table.read().iter().filter(|job| job.is_active()).count()
    }

    pub fn active_jobs(&self) -> Vec<GenerationJob> {
        self.filtered(|job| job.is_active())
    }

    pub fn completed_jobs(&self) -> Vec<GenerationJob> {
        self.filtered(|job| !job.is_active())
    }

    fn filtered<P>(&self, predicate: P) -> Vec<GenerationJob>
    where
        P: Fn(&GenerationJob) -> bool,
    {
        self.executor
            .table
            .read()
            .iter()
            .filter(|job| predicate(job))
            .cloned()
            .collect()
    }
}

impl Drop for JobQueue {
    fn drop(&mut self) {
        self.ticker_shutdown.cancel();
    }
}
