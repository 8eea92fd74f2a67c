//! Result handles for dispatched calls
//!
//! A [`ResponseFuture`] is returned for every call in a map. The orchestrator
//! leaves it in [`JobState::Invoked`]; every later transition comes from
//! reading the call's status key out of the blob store.

pub mod status;
pub mod wait;

pub use status::{CallOutcome, CallStatus};
pub use wait::{wait, ReturnWhen};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::{FanoutError, Result};
use crate::executor::{HostJobMetadata, InvocationArguments};
use crate::storage::BlobStore;

/// Lifecycle of one call as seen from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Created,
    Invoked,
    Success,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Cancelled)
    }
}

impl From<&CallOutcome> for JobState {
    fn from(outcome: &CallOutcome) -> Self {
        match outcome {
            CallOutcome::Success => Self::Success,
            CallOutcome::Error { .. } => Self::Failed,
            CallOutcome::Cancelled => Self::Cancelled,
        }
    }
}

/// Serializable pointer to a call's output, shipped as reduce input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FutureRef {
    pub callset_id: String,
    pub call_id: String,
    pub output_key: String,
    pub status_key: String,
}

pub struct ResponseFuture {
    call_id: String,
    callset_id: String,
    state: JobState,
    output_key: String,
    status_key: String,
    cancel_key: String,
    storage_path: (String, String),
    host_job_meta: HostJobMetadata,
    status: Option<CallStatus>,
    store: Arc<dyn BlobStore>,
    poll_interval: Duration,
}

impl std::fmt::Debug for ResponseFuture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseFuture")
            .field("callset_id", &self.callset_id)
            .field("call_id", &self.call_id)
            .field("state", &self.state)
            .field("status_key", &self.status_key)
            .finish()
    }
}

impl ResponseFuture {
    /// Handle for the call described by `args`, in state [`JobState::Created`]
    ///
    /// Keys are taken from the record actually sent to the backend, so
    /// overridden keys are the ones polled.
    pub fn new(
        args: &InvocationArguments,
        host_job_meta: HostJobMetadata,
        store: Arc<dyn BlobStore>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            call_id: args.call_id.clone(),
            callset_id: args.callset_id.clone(),
            state: JobState::Created,
            output_key: args.output_key.clone(),
            status_key: args.status_key.clone(),
            cancel_key: args.cancel_key.clone(),
            storage_path: args.storage_config.storage_path(),
            host_job_meta,
            status: None,
            store,
            poll_interval,
        }
    }

    pub(crate) fn set_state(&mut self, state: JobState) {
        self.state = state;
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn callset_id(&self) -> &str {
        &self.callset_id
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn output_key(&self) -> &str {
        &self.output_key
    }

    pub fn status_key(&self) -> &str {
        &self.status_key
    }

    pub fn cancel_key(&self) -> &str {
        &self.cancel_key
    }

    /// Bucket and prefix the call's keys live under
    pub fn storage_path(&self) -> (&str, &str) {
        (&self.storage_path.0, &self.storage_path.1)
    }

    pub fn host_job_meta(&self) -> &HostJobMetadata {
        &self.host_job_meta
    }

    /// Status document, once the remote unit has written one
    pub fn status(&self) -> Option<&CallStatus> {
        self.status.as_ref()
    }

    /// Check the status key once and update the state
    pub async fn poll_status(&mut self) -> Result<JobState> {
        if self.state.is_terminal() {
            return Ok(self.state);
        }
        if !self.store.exists(&self.status_key).await? {
            return Ok(self.state);
        }

        let bytes = self.store.get(&self.status_key).await?;
        let status: CallStatus = serde_json::from_slice(&bytes)?;
        self.state = JobState::from(&status.outcome);
        debug!(
            "call {} {} reached {:?}",
            self.callset_id, self.call_id, self.state
        );
        self.status = Some(status);
        Ok(self.state)
    }

    pub async fn done(&mut self) -> Result<bool> {
        Ok(self.poll_status().await?.is_terminal())
    }

    /// Block until the call finishes and decode its output
    pub async fn result<R: DeserializeOwned>(&mut self) -> Result<R> {
        while !self.poll_status().await?.is_terminal() {
            tokio::time::sleep(self.poll_interval).await;
        }

        match self.status.as_ref().map(|s| &s.outcome) {
            Some(CallOutcome::Success) => {
                let bytes = self.store.get(&self.output_key).await?;
                Ok(serde_json::from_slice(&bytes)?)
            }
            Some(CallOutcome::Error { message }) => Err(FanoutError::CallFailed {
                callset_id: self.callset_id.clone(),
                call_id: self.call_id.clone(),
                message: message.clone(),
            }),
            Some(CallOutcome::Cancelled) | None => Err(FanoutError::CallCancelled {
                callset_id: self.callset_id.clone(),
                call_id: self.call_id.clone(),
            }),
        }
    }

    /// Ask the remote unit not to run; honoured only if it has not started
    pub async fn cancel(&self) -> Result<()> {
        self.store.put(&self.cancel_key, Vec::new()).await?;
        Ok(())
    }

    pub fn to_ref(&self) -> FutureRef {
        FutureRef {
            callset_id: self.callset_id.clone(),
            call_id: self.call_id.clone(),
            output_key: self.output_key.clone(),
            status_key: self.status_key.clone(),
        }
    }
}
