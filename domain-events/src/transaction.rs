//! 工作单元边界（UnitOfWork）
//!
//! 发布意图必须与发起分发的工作单元同生共死，监听器的真实工作则往往要等到
//! 外层事务提交后才执行。这里将两者抽象为：
//! - `enlist`：提交时、在任何结束回调之前执行的工作（例如写入发布记录），
//!   回滚时直接丢弃；任一工作失败则整个工作单元回滚；
//! - `register_synchronization`：工作单元结束（提交或回滚）后的回调。
//!
//! `TransactionScope` 为进程内实现。完成标记（`mark_completed`）从不参与
//! 调用方的工作单元，因而不会随其回滚。
//!
use crate::error::{DomainError, DomainResult as Result};
use async_trait::async_trait;
use futures_core::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::Mutex;

/// 工作单元的结束方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOutcome {
    Committed,
    RolledBack,
}

/// 工作单元结束后执行的回调
pub type AfterCompletion = Box<dyn FnOnce(TransactionOutcome) -> BoxFuture<'static, ()> + Send>;

/// 随工作单元提交的工作
pub type TransactionalWork = Box<dyn FnOnce() -> BoxFuture<'static, Result<()>> + Send>;

/// 工作单元：提交时执行登记的工作，结束后执行回调
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// 登记随提交执行的工作；工作单元已结束时返回错误
    async fn enlist(&self, work: TransactionalWork) -> Result<()>;

    /// 注册结束回调；工作单元已结束时返回错误
    async fn register_synchronization(&self, callback: AfterCompletion) -> Result<()>;
}

/// 进程内工作单元实现
#[derive(Default)]
pub struct TransactionScope {
    state: Mutex<ScopeState>,
}

#[derive(Default)]
struct ScopeState {
    finished: Option<TransactionOutcome>,
    work: Vec<TransactionalWork>,
    callbacks: Vec<AfterCompletion>,
}

impl TransactionScope {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 按登记顺序执行工作，全部成功后以提交结束；
    /// 任一工作失败时以回滚结束并返回该错误
    pub async fn commit(&self) -> Result<()> {
        let (work, callbacks) = self.take(TransactionOutcome::Committed).await?;

        for item in work {
            if let Err(err) = item().await {
                self.state.lock().await.finished = Some(TransactionOutcome::RolledBack);
                run(callbacks, TransactionOutcome::RolledBack).await;
                return Err(err);
            }
        }

        run(callbacks, TransactionOutcome::Committed).await;
        Ok(())
    }

    /// 丢弃登记的工作并以回滚结束
    pub async fn rollback(&self) -> Result<()> {
        let (_, callbacks) = self.take(TransactionOutcome::RolledBack).await?;
        run(callbacks, TransactionOutcome::RolledBack).await;
        Ok(())
    }

    pub async fn outcome(&self) -> Option<TransactionOutcome> {
        self.state.lock().await.finished
    }

    async fn take(
        &self,
        outcome: TransactionOutcome,
    ) -> Result<(Vec<TransactionalWork>, Vec<AfterCompletion>)> {
        let mut state = self.state.lock().await;
        if let Some(previous) = state.finished {
            return Err(DomainError::unit_of_work(format!(
                "unit of work already finished: {previous:?}"
            )));
        }
        state.finished = Some(outcome);
        Ok((
            std::mem::take(&mut state.work),
            std::mem::take(&mut state.callbacks),
        ))
    }
}

// 回调在锁外执行，允许其再次访问本工作单元
async fn run(callbacks: Vec<AfterCompletion>, outcome: TransactionOutcome) {
    for callback in callbacks {
        callback(outcome).await;
    }
}

#[async_trait]
impl UnitOfWork for TransactionScope {
    async fn enlist(&self, work: TransactionalWork) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(outcome) = state.finished {
            return Err(DomainError::unit_of_work(format!(
                "cannot enlist work, unit of work already finished: {outcome:?}"
            )));
        }
        state.work.push(work);
        Ok(())
    }

    async fn register_synchronization(&self, callback: AfterCompletion) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(outcome) = state.finished {
            return Err(DomainError::unit_of_work(format!(
                "cannot register synchronization, unit of work already finished: {outcome:?}"
            )));
        }
        state.callbacks.push(callback);
        Ok(())
    }
}
