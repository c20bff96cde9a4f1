// Transaction Coordinator
//
// Runs a unit of work so that either all of its store effects become
// visible (commit) or none do (rollback). Nested `run` calls on the same
// TxContext join the outer transaction: they reuse its connection and
// leave commit/rollback to the outermost frame.

pub mod cancel;

pub use cancel::{cancel_channel, CancelHandle, CancelToken};

use crate::application::sequence::PendingSequence;
use crate::error::{AppError, Result};
use crate::port::{Connection, ConnectionProvider};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Future returned by a unit of work
pub type TxFuture<'c, T> = BoxFuture<'c, Result<T>>;

/// Lifecycle of the transaction owned by a TxContext
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    /// No transaction has been started yet
    Idle,
    /// Transaction open at the given nesting depth (>= 1)
    Active(u32),
    Committing,
    RollingBack,
    /// Last top-level invocation finished; the context may be reused
    Closed,
}

struct TransactionHandle {
    conn: Box<dyn Connection>,
    depth: u32,
}

/// Per-logical-call-context transaction state
///
/// Each task / request / UI action creates its own context and passes it
/// by `&mut` into the coordinator. Contexts are never shared, so two
/// contexts never see each other's connection or nesting depth.
pub struct TxContext {
    handle: Option<TransactionHandle>,
    state: TxState,
    /// Sequence numbers allocated inside the open transaction, published on commit
    pub(crate) pending_sequences: HashMap<i32, PendingSequence>,
}

impl TxContext {
    pub fn new() -> Self {
        Self {
            handle: None,
            state: TxState::Idle,
            pending_sequences: HashMap::new(),
        }
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    /// Current nesting depth (0 when no transaction is open)
    pub fn depth(&self) -> u32 {
        self.handle.as_ref().map(|h| h.depth).unwrap_or(0)
    }

    pub fn in_transaction(&self) -> bool {
        self.handle.is_some()
    }

    /// Connection of the open transaction
    pub fn connection(&mut self) -> Result<&mut dyn Connection> {
        match self.handle.as_mut() {
            Some(handle) => Ok(handle.conn.as_mut()),
            None => Err(AppError::InvalidState(
                "no transaction is active in this context".to_string(),
            )),
        }
    }
}

impl TxContext {
    /// Pending sequence positions at the start of a nested frame
    fn sequence_marks(&self) -> Vec<(i32, u32)> {
        self.pending_sequences
            .iter()
            .map(|(year, pending)| (*year, pending.last()))
            .collect()
    }

    /// Undo allocations made after `marks` were taken. Years first reserved
    /// after the marks are released entirely, unlocking their counters.
    fn rewind_sequences(&mut self, marks: &[(i32, u32)]) {
        self.pending_sequences.retain(|year, pending| {
            match marks.iter().find(|(marked, _)| marked == year) {
                Some((_, last)) => {
                    pending.rewind(*last);
                    true
                }
                None => {
                    debug!(year, last = pending.last(), "Releasing sequence reserved by failed frame");
                    false
                }
            }
        });
    }

    /// Drop the open transaction without commit. The connection's release
    /// discards the uncommitted work; reserved sequence numbers are never
    /// published.
    fn abandon(&mut self) {
        self.handle = None;
        self.pending_sequences.clear();
        self.state = TxState::Closed;
    }
}

impl Default for TxContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TxContext {
    fn drop(&mut self) {
        // The connection is closed without commit; the store discards the work.
        if let Some(handle) = &self.handle {
            warn!(
                depth = handle.depth,
                pending_sequences = self.pending_sequences.len(),
                "Transaction context dropped with an open transaction, discarding uncommitted work"
            );
        }
    }
}

/// One `run` invocation on a context
///
/// Cleans the context up if the frame's future is dropped before it
/// completes (caller-side timeout, `select!`): an outermost frame abandons
/// the transaction, a nested frame unwinds its depth and reservations.
struct Frame<'a> {
    ctx: &'a mut TxContext,
    outermost: bool,
    marks: Vec<(i32, u32)>,
    armed: bool,
}

impl<'a> Frame<'a> {
    fn new(ctx: &'a mut TxContext, outermost: bool) -> Self {
        let marks = if outermost {
            Vec::new()
        } else {
            ctx.sequence_marks()
        };
        Self {
            ctx,
            outermost,
            marks,
            armed: true,
        }
    }

    /// Leave a joined frame; a failed frame gives back its reservations
    fn leave_nested(&mut self, failed: bool) {
        if failed {
            self.ctx.rewind_sequences(&self.marks);
        }
        if let Some(handle) = self.ctx.handle.as_mut() {
            handle.depth -= 1;
            self.ctx.state = TxState::Active(handle.depth);
        }
        self.armed = false;
    }
}

impl Drop for Frame<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if self.outermost {
            warn!("Unit of work dropped before completion, abandoning transaction");
            self.ctx.abandon();
        } else {
            debug!("Nested unit of work dropped before completion");
            self.leave_nested(true);
        }
    }
}

enum Interrupt {
    None,
    Deadline(Duration),
    Token(CancelToken),
}

/// Coordinates transactions over connections from a ConnectionProvider
pub struct TransactionCoordinator {
    provider: Arc<dyn ConnectionProvider>,
}

impl TransactionCoordinator {
    pub fn new(provider: Arc<dyn ConnectionProvider>) -> Self {
        Self { provider }
    }

    /// Run `work` inside the context's transaction, starting one if needed
    ///
    /// # Example
    /// ```ignore
    /// let deleted = coordinator
    ///     .run(&mut ctx, |ctx| {
    ///         Box::pin(async move {
    ///             let conn = ctx.connection()?;
    ///             let rows = conn.execute("DELETE FROM interviews", &[]).await?;
    ///             Ok::<_, AppError>(rows)
    ///         })
    ///     })
    ///     .await?;
    /// ```
    ///
    /// Errors returned by `work` come back unchanged unless the rollback
    /// that follows them fails, in which case they are chained as the
    /// `cause` of `AppError::RollbackFailed`.
    pub async fn run<T, F>(&self, ctx: &mut TxContext, work: F) -> Result<T>
    where
        F: for<'c> FnOnce(&'c mut TxContext) -> TxFuture<'c, T> + Send,
        T: Send,
    {
        self.run_inner(ctx, work, Interrupt::None).await
    }

    /// Like `run`, but fails with `AppError::Cancelled` once `deadline` elapses
    pub async fn run_with_deadline<T, F>(
        &self,
        ctx: &mut TxContext,
        deadline: Duration,
        work: F,
    ) -> Result<T>
    where
        F: for<'c> FnOnce(&'c mut TxContext) -> TxFuture<'c, T> + Send,
        T: Send,
    {
        self.run_inner(ctx, work, Interrupt::Deadline(deadline)).await
    }

    /// Like `run`, but fails with `AppError::Cancelled` when `token` fires
    pub async fn run_cancellable<T, F>(
        &self,
        ctx: &mut TxContext,
        token: CancelToken,
        work: F,
    ) -> Result<T>
    where
        F: for<'c> FnOnce(&'c mut TxContext) -> TxFuture<'c, T> + Send,
        T: Send,
    {
        self.run_inner(ctx, work, Interrupt::Token(token)).await
    }

    async fn run_inner<T, F>(&self, ctx: &mut TxContext, work: F, interrupt: Interrupt) -> Result<T>
    where
        F: for<'c> FnOnce(&'c mut TxContext) -> TxFuture<'c, T> + Send,
        T: Send,
    {
        let outermost = self.enter(ctx).await?;
        let mut frame = Frame::new(ctx, outermost);

        let outcome = match interrupt {
            Interrupt::None => work(&mut *frame.ctx).await,
            Interrupt::Deadline(deadline) => {
                match tokio::time::timeout(deadline, work(&mut *frame.ctx)).await {
                    Ok(result) => result,
                    Err(_) => Err(AppError::Cancelled(format!(
                        "deadline of {:?} exceeded",
                        deadline
                    ))),
                }
            }
            Interrupt::Token(mut token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        Err(AppError::Cancelled("cancellation requested".to_string()))
                    }
                    result = work(&mut *frame.ctx) => result,
                }
            }
        };

        if !outermost {
            frame.leave_nested(outcome.is_err());
            return outcome;
        }

        let result = self.finish(&mut *frame.ctx, outcome).await;
        frame.armed = false;
        result
    }

    /// Join the open transaction or start a new one. Returns true if this
    /// frame started it (and therefore owns commit/rollback).
    async fn enter(&self, ctx: &mut TxContext) -> Result<bool> {
        if let Some(handle) = ctx.handle.as_mut() {
            handle.depth += 1;
            ctx.state = TxState::Active(handle.depth);
            debug!(depth = handle.depth, "Joining active transaction");
            return Ok(false);
        }

        let mut conn = self.provider.acquire().await.map_err(|e| match e {
            AppError::AcquireFailed(_) => e,
            other => AppError::AcquireFailed(other.to_string()),
        })?;

        if let Err(e) = conn.begin().await {
            if let Err(close_err) = conn.close().await {
                warn!(error = %close_err, "Failed to release connection after failed begin");
            }
            return Err(AppError::AcquireFailed(format!(
                "failed to start transaction: {}",
                e
            )));
        }

        ctx.handle = Some(TransactionHandle { conn, depth: 1 });
        ctx.state = TxState::Active(1);
        debug!("Transaction started");
        Ok(true)
    }

    /// Commit or roll back the outermost frame, then release the connection.
    async fn finish<T>(&self, ctx: &mut TxContext, outcome: Result<T>) -> Result<T> {
        // Taken out first: from here on the context is clear whatever happens.
        let Some(mut handle) = ctx.handle.take() else {
            return Err(AppError::InvalidState(
                "transaction handle vanished before completion".to_string(),
            ));
        };

        let result = match outcome {
            Ok(value) => {
                ctx.state = TxState::Committing;
                match handle.conn.commit().await {
                    Ok(()) => {
                        debug!("Transaction committed");
                        Ok(value)
                    }
                    Err(e) => {
                        let commit_err = AppError::CommitFailed(e.to_string());
                        warn!(error = %commit_err, "Commit failed, rolling back");
                        ctx.state = TxState::RollingBack;
                        rollback(handle.conn.as_mut(), commit_err).await
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, "Unit of work failed, rolling back");
                ctx.state = TxState::RollingBack;
                rollback(handle.conn.as_mut(), err).await
            }
        };

        let committed = result.is_ok();
        for (year, pending) in ctx.pending_sequences.drain() {
            if committed {
                debug!(year, last = pending.last(), "Publishing allocated sequence numbers");
                pending.publish();
            }
        }

        if let Err(e) = handle.conn.close().await {
            warn!(error = %e, "Failed to release connection");
        }
        ctx.state = TxState::Closed;

        result
    }
}

/// Roll back after `cause`; always returns an error.
async fn rollback<T>(conn: &mut dyn Connection, cause: AppError) -> Result<T> {
    match conn.rollback().await {
        Ok(()) => Err(cause),
        Err(e) => {
            tracing::error!(rollback_error = %e, cause = %cause, "Rollback failed");
            Err(AppError::RollbackFailed {
                rollback: e.to_string(),
                cause: Box::new(cause),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::sequence::SequenceAllocator;
    use crate::port::connection::mocks::{ConnectionEvent, ScriptedConnectionProvider};
    use std::error::Error as _;

    fn coordinator(provider: &ScriptedConnectionProvider) -> TransactionCoordinator {
        TransactionCoordinator::new(Arc::new(provider.clone()))
    }

    #[tokio::test]
    async fn test_commits_once_on_success() {
        let provider = ScriptedConnectionProvider::new().with_rows_affected("DELETE", 2);
        let coordinator = coordinator(&provider);
        let mut ctx = TxContext::new();

        let rows = coordinator
            .run(&mut ctx, |ctx| {
                Box::pin(async move {
                    assert_eq!(ctx.state(), TxState::Active(1));
                    let conn = ctx.connection()?;
                    let rows = conn.execute("DELETE FROM interviews", &[]).await?;
                    Ok::<_, AppError>(rows)
                })
            })
            .await
            .unwrap();

        assert_eq!(rows, 2);
        assert_eq!(
            provider.journal(),
            vec![
                ConnectionEvent::Acquire,
                ConnectionEvent::Begin,
                ConnectionEvent::Execute("DELETE FROM interviews".into()),
                ConnectionEvent::Commit,
                ConnectionEvent::Close,
            ]
        );
        assert_eq!(ctx.state(), TxState::Closed);
        assert!(!ctx.in_transaction());
    }

    #[tokio::test]
    async fn test_nested_run_joins_and_commits_at_outermost_exit() {
        let provider = ScriptedConnectionProvider::new();
        let coordinator = Arc::new(coordinator(&provider));
        let mut ctx = TxContext::new();

        let inner_coordinator = coordinator.clone();
        let observer = provider.clone();
        coordinator
            .run(&mut ctx, move |ctx| {
                Box::pin(async move {
                    ctx.connection()?.execute("DELETE FROM interviews", &[]).await?;

                    inner_coordinator
                        .run(ctx, |ctx| {
                            Box::pin(async move {
                                assert_eq!(ctx.state(), TxState::Active(2));
                                ctx.connection()?
                                    .execute("DELETE FROM applications", &[])
                                    .await?;
                                Ok::<_, AppError>(())
                            })
                        })
                        .await?;

                    // Inner exit must not commit
                    assert_eq!(observer.count(&ConnectionEvent::Commit), 0);
                    assert_eq!(ctx.depth(), 1);
                    Ok::<_, AppError>(())
                })
            })
            .await
            .unwrap();

        assert_eq!(provider.count(&ConnectionEvent::Acquire), 1);
        assert_eq!(provider.count(&ConnectionEvent::Begin), 1);
        assert_eq!(provider.count(&ConnectionEvent::Commit), 1);
        assert_eq!(provider.journal().last(), Some(&ConnectionEvent::Close));
    }

    #[tokio::test]
    async fn test_work_failure_rolls_back_and_passes_error_through() {
        let provider = ScriptedConnectionProvider::new();
        let coordinator = coordinator(&provider);
        let mut ctx = TxContext::new();

        let result: Result<()> = coordinator
            .run(&mut ctx, |ctx| {
                Box::pin(async move {
                    let conn = ctx.connection()?;
                    conn.execute("DELETE FROM interviews", &[]).await?;
                    conn.execute("DELETE FROM applications", &[]).await?;
                    Err(AppError::Validation("business rule violated".into()))
                })
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(ref m)) if m == "business rule violated"));
        assert_eq!(provider.count(&ConnectionEvent::Rollback), 1);
        assert_eq!(provider.count(&ConnectionEvent::Commit), 0);
        assert_eq!(provider.count(&ConnectionEvent::Close), 1);
        assert_eq!(ctx.state(), TxState::Closed);
    }

    #[tokio::test]
    async fn test_nested_failure_is_rolled_back_by_outermost_frame_only() {
        let provider = ScriptedConnectionProvider::new();
        let coordinator = Arc::new(coordinator(&provider));
        let mut ctx = TxContext::new();

        let inner_coordinator = coordinator.clone();
        let observer = provider.clone();
        let result: Result<()> = coordinator
            .run(&mut ctx, move |ctx| {
                Box::pin(async move {
                    let inner: Result<()> = inner_coordinator
                        .run(ctx, |_ctx| {
                            Box::pin(async move { Err(AppError::NotFound("applicant".into())) })
                        })
                        .await;

                    // Nested frame must not roll back on its own
                    assert_eq!(observer.count(&ConnectionEvent::Rollback), 0);
                    assert_eq!(ctx.state(), TxState::Active(1));
                    inner
                })
            })
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(provider.count(&ConnectionEvent::Rollback), 1);
        assert_eq!(provider.count(&ConnectionEvent::Commit), 0);
    }

    #[tokio::test]
    async fn test_outer_frame_may_recover_from_nested_failure() {
        let provider = ScriptedConnectionProvider::new();
        let coordinator = Arc::new(coordinator(&provider));
        let mut ctx = TxContext::new();

        let inner_coordinator = coordinator.clone();
        let value = coordinator
            .run(&mut ctx, move |ctx| {
                Box::pin(async move {
                    let inner: Result<u32> = inner_coordinator
                        .run(ctx, |_ctx| {
                            Box::pin(async move { Err(AppError::NotFound("x".into())) })
                        })
                        .await;
                    Ok::<_, AppError>(inner.unwrap_or(7))
                })
            })
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(provider.count(&ConnectionEvent::Commit), 1);
        assert_eq!(provider.count(&ConnectionEvent::Rollback), 0);
    }

    #[tokio::test]
    async fn test_rollback_failure_is_chained_to_original_cause() {
        let provider = ScriptedConnectionProvider::new().fail_rollback("disk I/O error");
        let coordinator = coordinator(&provider);
        let mut ctx = TxContext::new();

        let result: Result<()> = coordinator
            .run(&mut ctx, |_ctx| {
                Box::pin(async move { Err(AppError::Database("constraint failed".into())) })
            })
            .await;

        let err = result.unwrap_err();
        match &err {
            AppError::RollbackFailed { rollback, cause } => {
                assert!(rollback.contains("disk I/O error"));
                assert!(matches!(**cause, AppError::Database(_)));
            }
            other => panic!("expected RollbackFailed, got {:?}", other),
        }
        assert!(err.source().unwrap().to_string().contains("constraint failed"));
        // Connection still released
        assert_eq!(provider.count(&ConnectionEvent::Close), 1);
        assert!(!ctx.in_transaction());
    }

    #[tokio::test]
    async fn test_commit_failure_rolls_back() {
        let provider = ScriptedConnectionProvider::new().fail_commit("database is locked");
        let coordinator = coordinator(&provider);
        let mut ctx = TxContext::new();

        let result = coordinator
            .run(&mut ctx, |_ctx| Box::pin(async move { Ok::<_, AppError>(1) }))
            .await;

        assert!(matches!(result, Err(AppError::CommitFailed(ref m)) if m.contains("locked")));
        assert_eq!(provider.count(&ConnectionEvent::Rollback), 1);
        assert_eq!(provider.count(&ConnectionEvent::Close), 1);
    }

    #[tokio::test]
    async fn test_commit_and_rollback_failure() {
        let provider = ScriptedConnectionProvider::new()
            .fail_commit("database is locked")
            .fail_rollback("connection lost");
        let coordinator = coordinator(&provider);
        let mut ctx = TxContext::new();

        let result = coordinator
            .run(&mut ctx, |_ctx| Box::pin(async move { Ok::<_, AppError>(()) }))
            .await;

        match result {
            Err(AppError::RollbackFailed { cause, .. }) => {
                assert!(matches!(*cause, AppError::CommitFailed(_)))
            }
            other => panic!("expected RollbackFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_acquire_failure_skips_work() {
        let provider = ScriptedConnectionProvider::new().fail_acquire("pool timed out");
        let coordinator = coordinator(&provider);
        let mut ctx = TxContext::new();

        let ran = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = ran.clone();
        let result = coordinator
            .run(&mut ctx, move |_ctx| {
                Box::pin(async move {
                    flag.store(true, std::sync::atomic::Ordering::SeqCst);
                    Ok::<_, AppError>(())
                })
            })
            .await;

        assert!(matches!(result, Err(AppError::AcquireFailed(_))));
        assert!(!ran.load(std::sync::atomic::Ordering::SeqCst));
        assert_eq!(ctx.state(), TxState::Idle);
    }

    #[tokio::test]
    async fn test_begin_failure_releases_connection() {
        let provider = ScriptedConnectionProvider::new().fail_begin("cannot start");
        let coordinator = coordinator(&provider);
        let mut ctx = TxContext::new();

        let result = coordinator
            .run(&mut ctx, |_ctx| Box::pin(async move { Ok::<_, AppError>(()) }))
            .await;

        assert!(matches!(result, Err(AppError::AcquireFailed(ref m)) if m.contains("cannot start")));
        assert_eq!(provider.count(&ConnectionEvent::Close), 1);
        assert!(!ctx.in_transaction());
    }

    #[tokio::test]
    async fn test_deadline_expiry_rolls_back() {
        let provider = ScriptedConnectionProvider::new();
        let coordinator = coordinator(&provider);
        let mut ctx = TxContext::new();

        let result = coordinator
            .run_with_deadline(&mut ctx, Duration::from_millis(20), |ctx| {
                Box::pin(async move {
                    ctx.connection()?.execute("DELETE FROM interviews", &[]).await?;
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok::<_, AppError>(())
                })
            })
            .await;

        assert!(matches!(result, Err(AppError::Cancelled(_))));
        assert_eq!(provider.count(&ConnectionEvent::Rollback), 1);
        assert_eq!(provider.count(&ConnectionEvent::Commit), 0);
        assert_eq!(ctx.state(), TxState::Closed);
    }

    #[tokio::test]
    async fn test_cancelled_token_aborts_before_work() {
        let provider = ScriptedConnectionProvider::new();
        let coordinator = coordinator(&provider);
        let mut ctx = TxContext::new();

        let (handle, token) = cancel_channel();
        handle.cancel();

        let result = coordinator
            .run_cancellable(&mut ctx, token, |ctx| {
                Box::pin(async move {
                    ctx.connection()?.execute("DELETE FROM interviews", &[]).await?;
                    Ok::<_, AppError>(())
                })
            })
            .await;

        assert!(matches!(result, Err(AppError::Cancelled(_))));
        assert!(provider.executed().is_empty());
        assert_eq!(provider.count(&ConnectionEvent::Rollback), 1);
    }

    #[tokio::test]
    async fn test_context_is_reusable_after_close() {
        let provider = ScriptedConnectionProvider::new();
        let coordinator = coordinator(&provider);
        let mut ctx = TxContext::new();

        for _ in 0..2 {
            coordinator
                .run(&mut ctx, |_ctx| Box::pin(async move { Ok::<_, AppError>(()) }))
                .await
                .unwrap();
            assert_eq!(ctx.state(), TxState::Closed);
        }

        assert_eq!(provider.count(&ConnectionEvent::Acquire), 2);
        assert_eq!(provider.count(&ConnectionEvent::Commit), 2);
    }

    #[tokio::test]
    async fn test_independent_contexts_do_not_share_connections() {
        let provider = ScriptedConnectionProvider::new();
        let coordinator = Arc::new(coordinator(&provider));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let coordinator = coordinator.clone();
            handles.push(tokio::spawn(async move {
                let mut ctx = TxContext::new();
                coordinator
                    .run(&mut ctx, |ctx| {
                        Box::pin(async move {
                            assert_eq!(ctx.depth(), 1);
                            tokio::task::yield_now().await;
                            assert_eq!(ctx.depth(), 1);
                            Ok::<_, AppError>(())
                        })
                    })
                    .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        assert_eq!(provider.count(&ConnectionEvent::Acquire), 4);
        assert_eq!(provider.count(&ConnectionEvent::Commit), 4);
    }

    #[tokio::test]
    async fn test_dropped_outer_frame_abandons_transaction_and_reservations() {
        let provider = ScriptedConnectionProvider::new();
        let coordinator = coordinator(&provider);
        let allocator = Arc::new(SequenceAllocator::new());
        allocator.start_fresh().unwrap();
        let mut ctx = TxContext::new();

        let a = allocator.clone();
        let timed_out = tokio::time::timeout(
            Duration::from_millis(20),
            coordinator.run(&mut ctx, move |ctx| {
                Box::pin(async move {
                    a.allocate_in(ctx, 2024).await?;
                    std::future::pending::<()>().await;
                    Ok::<_, AppError>(())
                })
            }),
        )
        .await;

        assert!(timed_out.is_err());
        assert_eq!(ctx.state(), TxState::Closed);
        assert!(!ctx.in_transaction());
        assert_eq!(provider.count(&ConnectionEvent::Commit), 0);

        // Year counter unlocked and untouched
        let next = tokio::time::timeout(Duration::from_secs(1), allocator.next(2024))
            .await
            .expect("year counter still locked")
            .unwrap();
        assert_eq!(next, 1);

        // Next run on the same context starts its own transaction
        coordinator
            .run(&mut ctx, |ctx| {
                Box::pin(async move {
                    assert_eq!(ctx.depth(), 1);
                    Ok::<_, AppError>(())
                })
            })
            .await
            .unwrap();
        assert_eq!(provider.count(&ConnectionEvent::Begin), 2);
        assert_eq!(provider.count(&ConnectionEvent::Commit), 1);
    }

    #[tokio::test]
    async fn test_dropped_nested_frame_unwinds_depth() {
        let provider = ScriptedConnectionProvider::new();
        let coordinator = Arc::new(coordinator(&provider));
        let mut ctx = TxContext::new();

        let inner = coordinator.clone();
        coordinator
            .run(&mut ctx, move |ctx| {
                Box::pin(async move {
                    let timed_out = tokio::time::timeout(
                        Duration::from_millis(20),
                        inner.run(ctx, |_ctx| {
                            Box::pin(async move {
                                std::future::pending::<()>().await;
                                Ok::<_, AppError>(())
                            })
                        }),
                    )
                    .await;

                    assert!(timed_out.is_err());
                    assert_eq!(ctx.state(), TxState::Active(1));
                    assert_eq!(ctx.depth(), 1);
                    Ok::<_, AppError>(())
                })
            })
            .await
            .unwrap();

        assert_eq!(provider.count(&ConnectionEvent::Begin), 1);
        assert_eq!(provider.count(&ConnectionEvent::Commit), 1);
        assert_eq!(ctx.state(), TxState::Closed);
    }

    #[test]
    fn test_connection_outside_transaction_is_invalid_state() {
        let mut ctx = TxContext::new();
        assert!(matches!(ctx.connection(), Err(AppError::InvalidState(_))));
        assert_eq!(ctx.depth(), 0);
    }
}
