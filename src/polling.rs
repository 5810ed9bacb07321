//! Status polling for asynchronously processed dataframes.
//!
//! After an upload or a column operation the backend appends a version in the
//! `processing` state. The client re-fetches the dataframe status on a fixed interval
//! until no version is processing, then loads the last version of the chain.

use crate::api::ApiClient;
use crate::error::CleanerError;
use crate::model::{DataFrameMeta, ProcessStatus, Version, VersionPayload};
use std::future::Future;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

#[derive(Clone, Debug, PartialEq)]
pub enum PollOutcome {
    /// At least one version is still processing.
    Pending,
    /// Nothing is processing and the last version can be loaded.
    Ready { version_id: String },
    /// Nothing is processing and the last version failed.
    Failed(String),
}

/// How a polling cycle ended.
#[derive(Clone, Debug, PartialEq)]
pub enum Settled {
    Loaded(VersionPayload),
    Failed(String),
}

pub fn evaluate(meta: &DataFrameMeta) -> Result<PollOutcome, CleanerError> {
    if meta.is_processing() {
        return Ok(PollOutcome::Pending);
    }
    let last = meta
        .latest()
        .ok_or_else(|| CleanerError::NoVersions(meta.dataframe_id.clone()))?;
    match last.status {
        ProcessStatus::Failed => Ok(PollOutcome::Failed(failure_message(last))),
        _ => Ok(PollOutcome::Ready {
            version_id: last.version_id.clone(),
        }),
    }
}

pub fn failure_message(version: &Version) -> String {
    format!(
        "failed to process operation {} with script {} on column {}",
        version.operation,
        version.script.as_deref().unwrap_or("null"),
        version.column.as_deref().unwrap_or("null"),
    )
}

/// Polls `dataframe_id` every `every` until it settles. Each fetched status is passed
/// to `on_status` before it is evaluated. The first request goes out one interval
/// after the call.
pub async fn poll_until_settled(
    client: &ApiClient,
    dataframe_id: &str,
    every: Duration,
    mut on_status: impl FnMut(DataFrameMeta),
) -> Result<Settled, CleanerError> {
    let mut ticker = time::interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let meta = client.dataframe(dataframe_id).await?;
        let outcome = evaluate(&meta);
        on_status(meta);
        match outcome? {
            PollOutcome::Pending => {
                log::debug!("dataframe {dataframe_id} still processing");
            }
            PollOutcome::Failed(message) => {
                log::warn!("dataframe {dataframe_id}: {message}");
                return Ok(Settled::Failed(message));
            }
            PollOutcome::Ready { version_id } => {
                log::info!("dataframe {dataframe_id} settled at version {version_id}");
                let payload = client.version(dataframe_id, &version_id).await?;
                return Ok(Settled::Loaded(payload));
            }
        }
    }
}

/// Owns at most one background task. Replacing or dropping the handle aborts the task,
/// which also drops any request it has in flight.
#[derive(Debug, Default)]
pub struct TaskSlot {
    task: Option<JoinHandle<()>>,
}

impl TaskSlot {
    pub fn spawn<F>(&mut self, runtime: &Handle, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.task = Some(runtime.spawn(future));
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for TaskSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}
