//! 完成回调（PublicationCompletion）
//!
//! 持久化跟踪的监听器在真实工作落定后调用 `completed`，由登记簿标记记录完成；
//! 工作最终失败时调用 `failed`，交给可插拔的 `CompletionErrorHandler`。
//!
use crate::{
    domain_event::EventObject,
    error::DomainResult,
    publication::{EventPublication, EventPublicationRegistry, PublicationTargetId},
    transaction::{TransactionOutcome, UnitOfWork},
};
use async_trait::async_trait;
use futures_core::future::BoxFuture;
use std::sync::Arc;
use tracing::warn;

/// 异步完成失败时的处理策略（例如记录日志或安排重试）
#[async_trait]
pub trait CompletionErrorHandler: Send + Sync {
    async fn on_completion_error(
        &self,
        event: &EventObject,
        listener: &PublicationTargetId,
        error: &anyhow::Error,
    );
}

/// 默认策略：记录日志，不重试，记录保持未完成以待重放
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingCompletionErrorHandler;

#[async_trait]
impl CompletionErrorHandler for LoggingCompletionErrorHandler {
    async fn on_completion_error(
        &self,
        event: &EventObject,
        listener: &PublicationTargetId,
        error: &anyhow::Error,
    ) {
        warn!(
            event_type = %event.event_type(),
            listener = %listener,
            error = %error,
            "event publication could not be completed"
        );
    }
}

/// 单次跟踪投递的完成/错误回调
///
/// - 分发处于工作单元中时，完成标记推迟到该工作单元提交之后（此时发布记录
///   才随提交写入），回滚时不做任何事；
/// - 重放时持有具体的发布记录，按记录本身而非自然键完成。
#[derive(Clone)]
pub struct PublicationCompletion {
    event: EventObject,
    listener: PublicationTargetId,
    publication: Option<EventPublication>,
    unit_of_work: Option<Arc<dyn UnitOfWork>>,
    registry: Arc<dyn EventPublicationRegistry>,
    error_handler: Arc<dyn CompletionErrorHandler>,
}

impl PublicationCompletion {
    pub fn new(
        event: EventObject,
        listener: PublicationTargetId,
        registry: Arc<dyn EventPublicationRegistry>,
        error_handler: Arc<dyn CompletionErrorHandler>,
    ) -> Self {
        Self {
            event,
            listener,
            publication: None,
            unit_of_work: None,
            registry,
            error_handler,
        }
    }

    /// 完成时直接标记给定的发布记录
    pub fn for_publication(mut self, publication: EventPublication) -> Self {
        self.publication = Some(publication);
        self
    }

    /// 完成标记推迟到工作单元提交之后
    pub fn within(mut self, unit_of_work: Arc<dyn UnitOfWork>) -> Self {
        self.unit_of_work = Some(unit_of_work);
        self
    }

    /// 脱离工作单元，完成时立即标记（用于已在提交后运行的监听器）
    pub fn detached(mut self) -> Self {
        self.unit_of_work = None;
        self
    }

    pub fn event(&self) -> &EventObject {
        &self.event
    }

    pub fn listener(&self) -> &PublicationTargetId {
        &self.listener
    }

    /// 完成回调：在独立工作单元中标记发布完成
    pub async fn completed(&self) -> DomainResult<()> {
        let Some(unit_of_work) = &self.unit_of_work else {
            return self.mark().await;
        };

        let completion = self.clone().detached();
        unit_of_work
            .register_synchronization(Box::new(
                move |outcome: TransactionOutcome| -> BoxFuture<'static, ()> {
                    Box::pin(async move {
                        if outcome != TransactionOutcome::Committed {
                            return;
                        }
                        if let Err(err) = completion.mark().await {
                            completion.failed(&anyhow::Error::new(err)).await;
                        }
                    })
                },
            ))
            .await
    }

    /// 错误回调
    pub async fn failed(&self, error: &anyhow::Error) {
        self.error_handler
            .on_completion_error(&self.event, &self.listener, error)
            .await;
    }

    async fn mark(&self) -> DomainResult<()> {
        match &self.publication {
            Some(publication) => self.registry.mark_publication_completed(publication).await,
            None => {
                self.registry
                    .mark_completed(&self.event, &self.listener)
                    .await
            }
        }
    }
}
