//! Per-operation cancellation and deadlines
//!
//! Every store operation takes an [`OpContext`]. Backend calls are raced
//! against its cancellation token and deadline; whichever fires first wins
//! and the backend future is dropped.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::error::{StoreError, StoreResult};
use crate::kv::KvResult;

#[derive(Debug, Clone, Default)]
pub struct OpContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl OpContext {
    /// Context that is never cancelled and has no deadline
    pub fn background() -> Self {
        Self::default()
    }

    /// Context bound to an existing token (e.g. a shutdown token)
    pub fn with_token(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    /// Same context, expiring `timeout` from now
    pub fn timeout(self, timeout: Duration) -> Self {
        self.deadline(Instant::now() + timeout)
    }

    /// Same context, expiring at `deadline` (the earlier deadline wins)
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    /// Child context: cancelled with this one, cancellable on its own
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Check cancellation and deadline without running anything
    pub fn check(&self) -> StoreResult<()> {
        if self.cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        if let Some(deadline) = self.deadline
            && deadline <= Instant::now()
        {
            return Err(StoreError::Timeout);
        }
        Ok(())
    }

    /// Drive one backend call under this context
    pub async fn run<T, F>(&self, call: F) -> StoreResult<T>
    where
        F: Future<Output = KvResult<T>>,
    {
        self.check()?;

        let guarded = async {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(StoreError::Cancelled),
                result = call => result.map_err(StoreError::Transport),
            }
        };

        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, guarded)
                .await
                .unwrap_or(Err(StoreError::Timeout)),
            None => guarded.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::KvError;

    #[tokio::test]
    async fn test_background_runs_to_completion() {
        let ctx = OpContext::background();
        assert_eq!(ctx.run(async { Ok::<_, KvError>(7) }).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_already_cancelled() {
        let ctx = OpContext::background();
        ctx.cancel();
        let err = ctx.run(async { Ok::<_, KvError>(()) }).await.unwrap_err();
        assert!(matches!(err, StoreError::Cancelled));
    }

    #[tokio::test]
    async fn test_cancel_in_flight() {
        let ctx = OpContext::background();
        let trigger = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let err = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, KvError>(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Cancelled));
    }

    #[tokio::test]
    async fn test_deadline_expires() {
        let ctx = OpContext::background().timeout(Duration::from_millis(10));
        let err = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, KvError>(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Timeout));
    }

    #[tokio::test]
    async fn test_earlier_deadline_wins() {
        let ctx = OpContext::background()
            .timeout(Duration::from_millis(10))
            .timeout(Duration::from_secs(60));
        assert!(ctx.remaining().unwrap() <= Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_child_follows_parent() {
        let parent = OpContext::background();
        let child = parent.child();
        parent.cancel();
        assert!(child.is_cancelled());

        let other = OpContext::background();
        let other_child = other.child();
        other_child.cancel();
        assert!(!other.is_cancelled());
    }

    #[tokio::test]
    async fn test_transport_errors_pass_through() {
        let ctx = OpContext::background();
        let err = ctx
            .run(async { Err::<(), _>(KvError::Unavailable("down".into())) })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Transport(_)));
    }
}
