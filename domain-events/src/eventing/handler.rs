//! 事件处理器（EventHandler）与监听器适配器
//!
//! 业务只需实现 `EventHandler`，再选择执行环境：
//! - `InlineEventListener`：分发时立即执行；
//! - `TransactionalEventListener`：延迟到发起分发的工作单元提交后执行，
//!   回滚时触发错误回调；没有工作单元（如启动重放）时立即执行。
//!
//! 两者在跟踪投递中都会于处理成功后调用完成回调；处于工作单元中的即时
//! 监听器，其完成标记随工作单元提交生效。
//!
use crate::domain_event::ApplicationEvent;
use crate::error::DomainError;
use crate::eventing::{EventListener, ListenerContext, ListenerDescriptor, PublicationCompletion};
use crate::transaction::TransactionOutcome;
use async_trait::async_trait;
use futures_core::future::BoxFuture;
use std::sync::Arc;
use tracing::warn;

/// 事件处理器：处理一条事件
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &ApplicationEvent) -> anyhow::Result<()>;
}

#[async_trait]
impl<T> EventHandler for Arc<T>
where
    T: EventHandler + ?Sized,
{
    async fn handle(&self, event: &ApplicationEvent) -> anyhow::Result<()> {
        (**self).handle(event).await
    }
}

async fn handle_and_complete<H>(
    handler: &H,
    event: &ApplicationEvent,
    completion: Option<&PublicationCompletion>,
) -> anyhow::Result<()>
where
    H: EventHandler + ?Sized,
{
    match handler.handle(event).await {
        Ok(()) => {
            if let Some(completion) = completion {
                completion.completed().await?;
            }
            Ok(())
        }
        Err(err) => {
            if let Some(completion) = completion {
                completion.failed(&err).await;
            }
            Err(err)
        }
    }
}

/// 立即执行的监听器
pub struct InlineEventListener<H> {
    descriptor: ListenerDescriptor,
    handler: H,
}

impl<H> InlineEventListener<H>
where
    H: EventHandler,
{
    pub fn new(descriptor: ListenerDescriptor, handler: H) -> Self {
        Self {
            descriptor,
            handler,
        }
    }
}

#[async_trait]
impl<H> EventListener for InlineEventListener<H>
where
    H: EventHandler,
{
    fn descriptor(&self) -> &ListenerDescriptor {
        &self.descriptor
    }

    async fn on_event(&self, event: &ApplicationEvent, ctx: ListenerContext) -> anyhow::Result<()> {
        handle_and_complete(&self.handler, event, ctx.completion()).await
    }
}

/// 工作单元提交后执行的监听器
pub struct TransactionalEventListener<H> {
    descriptor: ListenerDescriptor,
    handler: Arc<H>,
}

impl<H> TransactionalEventListener<H>
where
    H: EventHandler + 'static,
{
    pub fn new(descriptor: ListenerDescriptor, handler: H) -> Self {
        Self {
            descriptor,
            handler: Arc::new(handler),
        }
    }
}

#[async_trait]
impl<H> EventListener for TransactionalEventListener<H>
where
    H: EventHandler + 'static,
{
    fn descriptor(&self) -> &ListenerDescriptor {
        &self.descriptor
    }

    async fn on_event(&self, event: &ApplicationEvent, ctx: ListenerContext) -> anyhow::Result<()> {
        let Some(unit_of_work) = ctx.unit_of_work().cloned() else {
            return handle_and_complete(self.handler.as_ref(), event, ctx.completion()).await;
        };

        let handler = self.handler.clone();
        let event = event.clone();
        // 回调运行时工作单元已提交，完成标记直接写入
        let completion = ctx.completion().cloned().map(PublicationCompletion::detached);
        let listener = self.descriptor.to_string();

        unit_of_work
            .register_synchronization(Box::new(
                move |outcome: TransactionOutcome| -> BoxFuture<'static, ()> {
                    Box::pin(async move {
                        match outcome {
                            TransactionOutcome::Committed => {
                                if let Err(err) =
                                    handle_and_complete(handler.as_ref(), &event, completion.as_ref())
                                        .await
                                {
                                    warn!(
                                        listener = %listener,
                                        event_type = %event.resolved_type(),
                                        error = %err,
                                        "transactional listener failed after commit"
                                    );
                                }
                            }
                            TransactionOutcome::RolledBack => {
                                if let Some(completion) = completion {
                                    let err = anyhow::Error::new(DomainError::unit_of_work(
                                        "unit of work rolled back before listener ran",
                                    ));
                                    completion.failed(&err).await;
                                }
                            }
                        }
                    })
                },
            ))
            .await?;

        Ok(())
    }
}
