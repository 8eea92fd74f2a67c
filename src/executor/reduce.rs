//! Reduction over completed calls

use tracing::info;

use super::{Executor, MapOptions};
use crate::error::{FanoutError, Result};
use crate::future::{wait, FutureRef, JobState, ResponseFuture, ReturnWhen};
use crate::serialize::RemoteFunction;

impl Executor {
    /// Dispatch one call applying `func` to the ordered outputs of `futures`
    ///
    /// Waits for every handle to finish first. If any of them did not
    /// succeed nothing is dispatched.
    pub async fn reduce(
        &self,
        func: &RemoteFunction,
        futures: &mut [ResponseFuture],
        opts: &MapOptions,
    ) -> Result<ResponseFuture> {
        wait(futures, ReturnWhen::AllCompleted, self.poll_interval).await?;

        if let Some(failed) = futures.iter().find(|f| f.state() != JobState::Success) {
            return Err(FanoutError::ReduceInputFailed {
                callset_id: failed.callset_id().to_string(),
                call_id: failed.call_id().to_string(),
            });
        }

        let refs: Vec<FutureRef> = futures.iter().map(ResponseFuture::to_ref).collect();
        info!(
            "reduce {} over {} results",
            func.callable.label(),
            refs.len()
        );
        self.call_async(&RemoteFunction::reduce(func), refs, opts).await
    }
}
