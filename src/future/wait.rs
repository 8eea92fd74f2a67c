//! Polling wait over many result handles

use futures::future::try_join_all;
use std::time::Duration;

use super::ResponseFuture;
use crate::error::Result;

/// Condition that ends a [`wait`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnWhen {
    /// At least one handle is terminal
    AnyCompleted,
    /// Every handle is terminal
    AllCompleted,
    /// Poll once and return
    Always,
}

/// Poll `futures` until `return_when` holds
///
/// Returns the indices of finished and still pending handles, each in
/// ascending order.
pub async fn wait(
    futures: &mut [ResponseFuture],
    return_when: ReturnWhen,
    poll_interval: Duration,
) -> Result<(Vec<usize>, Vec<usize>)> {
    loop {
        try_join_all(
            futures
                .iter_mut()
                .filter(|f| !f.state().is_terminal())
                .map(|f| f.poll_status()),
        )
        .await?;

        let (done, pending): (Vec<usize>, Vec<usize>) =
            (0..futures.len()).partition(|&i| futures[i].state().is_terminal());

        let satisfied = match return_when {
            ReturnWhen::Always => true,
            ReturnWhen::AnyCompleted => !done.is_empty() || futures.is_empty(),
            ReturnWhen::AllCompleted => pending.is_empty(),
        };
        if satisfied {
            return Ok((done, pending));
        }

        tokio::time::sleep(poll_interval).await;
    }
}
