//! 持久化事件多播器（PersistentEventMulticaster）
//!
//! 拦截每条发布的事件并编排“分类 → 登记 → 调用”：
//! - 解析对事件感兴趣的监听器（保留注册顺序）；
//! - 挑出需要跟踪且确实声明了该事件类型的监听器，先登记发布意图
//!   （处于工作单元中时随其提交写入）；
//! - 依次调用所有监听器，单个监听器失败只记录日志；
//! - 为跟踪投递附上完成/错误回调。
//!
use crate::{
    domain_event::{ApplicationEvent, DomainEvent, EventObject},
    error::{DomainError, DomainResult as Result},
    eventing::{
        CompletionErrorHandler, EventListener, ListenerContext, LoggingCompletionErrorHandler,
        PublicationCompletion,
    },
    publication::{EventPublicationRegistry, PublicationTargetId},
    transaction::UnitOfWork,
};
use bon::Builder;
use dashmap::DashMap;
use futures_core::future::BoxFuture;
use std::collections::{HashMap, hash_map::Entry};
use std::sync::Arc;
use tracing::{debug, warn};

// 导入由 bon::Builder 生成的 typestate 模块与状态转换别名
use self::persistent_event_multicaster_builder::{IsUnset, SetListeners, State as BuilderState};

/// PersistentEventMulticaster：
/// - 为持久化监听器登记发布记录后再调用监听器
/// - 启动时重放未完成的发布（见 `replay_incomplete_publications`）
#[derive(Builder)]
pub struct PersistentEventMulticaster {
    registry: Arc<dyn EventPublicationRegistry>,
    #[builder(setters(vis = "pub(crate)"))]
    listeners: ListenerRegistry,
    #[builder(default = default_error_handler())]
    error_handler: Arc<dyn CompletionErrorHandler>,
    #[builder(default)]
    config: MulticasterConfig,
}

fn default_error_handler() -> Arc<dyn CompletionErrorHandler> {
    Arc::new(LoggingCompletionErrorHandler)
}

impl<S: BuilderState> PersistentEventMulticasterBuilder<S> {
    pub fn event_listeners(
        self,
        listeners: Vec<Arc<dyn EventListener>>,
    ) -> PersistentEventMulticasterBuilder<SetListeners<S>>
    where
        <S as BuilderState>::Listeners: IsUnset,
    {
        self.listeners(ListenerRegistry::new(listeners))
    }
}

impl PersistentEventMulticaster {
    /// 以载荷信封包裹领域值并分发（不处于任何工作单元中）
    pub async fn publish_event<E: DomainEvent>(&self, event: &E) -> Result<()> {
        self.dispatch(ApplicationEvent::payload(event)?, None).await
    }

    /// 以载荷信封包裹领域值，在给定工作单元中分发
    pub async fn publish_event_within<E: DomainEvent>(
        &self,
        event: &E,
        unit_of_work: Arc<dyn UnitOfWork>,
    ) -> Result<()> {
        self.dispatch(ApplicationEvent::payload(event)?, Some(unit_of_work))
            .await
    }

    pub async fn multicast_event(&self, event: ApplicationEvent) -> Result<()> {
        self.dispatch(event, None).await
    }

    /// 在给定工作单元中分发；发布意图随工作单元提交写入，
    /// 写入失败时由提交返回错误
    pub async fn multicast_event_within(
        &self,
        event: ApplicationEvent,
        unit_of_work: Arc<dyn UnitOfWork>,
    ) -> Result<()> {
        self.dispatch(event, Some(unit_of_work)).await
    }

    /// 关停钩子：报告仍未完成的发布
    pub async fn shutdown(&self) -> Result<usize> {
        self.registry.shutdown().await
    }

    pub fn registry(&self) -> &Arc<dyn EventPublicationRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &MulticasterConfig {
        &self.config
    }

    async fn dispatch(
        &self,
        event: ApplicationEvent,
        unit_of_work: Option<Arc<dyn UnitOfWork>>,
    ) -> Result<()> {
        let resolved_type = event.resolved_type();
        let listeners = self.listeners.resolve(&event);

        if listeners.is_empty() {
            return Ok(());
        }

        // 监听器解析是粗粒度的，这里再确认声明类型，避免无关事件被登记与重放
        let targets = listeners
            .iter()
            .map(|(index, listener)| {
                self.listeners
                    .tracked_target(*index, listener.as_ref(), &event, &resolved_type)
            })
            .collect::<Result<Vec<Option<PublicationTargetId>>>>()?;

        let tracked: Vec<PublicationTargetId> = targets.iter().flatten().cloned().collect();
        if !tracked.is_empty() {
            self.store(event.event_to_persist(), tracked, unit_of_work.as_ref())
                .await?;
        }

        for ((_, listener), target) in listeners.iter().zip(targets) {
            let completion = target.map(|t| {
                let completion = self.completion_for(event.event_to_persist().clone(), t);
                match &unit_of_work {
                    Some(uow) => completion.within(uow.clone()),
                    None => completion,
                }
            });
            let ctx = ListenerContext::new(unit_of_work.clone(), completion);

            if let Err(err) = listener.on_event(&event, ctx).await {
                let err = DomainError::ListenerInvocation {
                    listener: listener.descriptor().to_string(),
                    reason: format!("{err:#}"),
                };
                warn!(event_type = %resolved_type, error = %err, "listener invocation failed");
            }
        }

        Ok(())
    }

    /// 登记发布意图：处于工作单元中时随其提交写入、随其回滚丢弃
    async fn store(
        &self,
        event: &EventObject,
        targets: Vec<PublicationTargetId>,
        unit_of_work: Option<&Arc<dyn UnitOfWork>>,
    ) -> Result<()> {
        let Some(unit_of_work) = unit_of_work else {
            return self.registry.store(event, &targets).await;
        };

        let registry = self.registry.clone();
        let event = event.clone();
        unit_of_work
            .enlist(Box::new(move || -> BoxFuture<'static, Result<()>> {
                Box::pin(async move { registry.store(&event, &targets).await })
            }))
            .await
    }

    pub(crate) fn completion_for(
        &self,
        event: EventObject,
        target: PublicationTargetId,
    ) -> PublicationCompletion {
        PublicationCompletion::new(
            event,
            target,
            self.registry.clone(),
            self.error_handler.clone(),
        )
    }

    pub(crate) fn durable_listener(&self, id: &str) -> Option<&Arc<dyn EventListener>> {
        self.listeners.durable(id)
    }
}

/// 已注册的监听器
///
/// 注册时即缓存持久化监听器的 ID 索引；声明类型的精确匹配结果按
/// （监听器, 解析后的事件类型）缓存。
#[derive(Clone, Default)]
pub(crate) struct ListenerRegistry {
    all: Vec<Arc<dyn EventListener>>,
    durable_by_id: HashMap<String, usize>,
    declared: Arc<DashMap<(usize, String), bool>>,
}

impl ListenerRegistry {
    fn new(listeners: Vec<Arc<dyn EventListener>>) -> Self {
        let mut durable_by_id: HashMap<String, usize> = HashMap::new();

        for (index, listener) in listeners.iter().enumerate() {
            let descriptor = listener.descriptor();
            let Some(id) = descriptor.id().filter(|_| descriptor.is_durable()) else {
                continue;
            };

            match durable_by_id.entry(id.to_string()) {
                Entry::Occupied(_) => {
                    warn!(listener = %id, "duplicate durable listener id, keeping the first registration");
                }
                Entry::Vacant(slot) => {
                    slot.insert(index);
                }
            }
        }

        debug!(
            listeners = listeners.len(),
            durable = durable_by_id.len(),
            "registered event listeners"
        );

        Self {
            all: listeners,
            durable_by_id,
            declared: Arc::new(DashMap::new()),
        }
    }

    /// 对事件感兴趣的监听器（注册顺序）
    fn resolve(&self, event: &ApplicationEvent) -> Vec<(usize, Arc<dyn EventListener>)> {
        self.all
            .iter()
            .enumerate()
            .filter(|(_, l)| l.descriptor().supports(event))
            .map(|(index, l)| (index, l.clone()))
            .collect()
    }

    fn durable(&self, id: &str) -> Option<&Arc<dyn EventListener>> {
        self.durable_by_id.get(id).map(|index| &self.all[*index])
    }

    /// 需要为该监听器登记发布记录时返回其目标标识
    fn tracked_target(
        &self,
        index: usize,
        listener: &dyn EventListener,
        event: &ApplicationEvent,
        resolved_type: &str,
    ) -> Result<Option<PublicationTargetId>> {
        let descriptor = listener.descriptor();
        if !descriptor.is_durable() || !self.has_declared_event_type(index, listener, event, resolved_type) {
            return Ok(None);
        }

        PublicationTargetId::for_listener(descriptor).map(Some)
    }

    fn has_declared_event_type(
        &self,
        index: usize,
        listener: &dyn EventListener,
        event: &ApplicationEvent,
        resolved_type: &str,
    ) -> bool {
        *self
            .declared
            .entry((index, resolved_type.to_string()))
            .or_insert_with(|| listener.descriptor().declares(event))
    }
}

/// 多播器配置
#[derive(Clone, Copy, Debug)]
pub struct MulticasterConfig {
    /// 启动重放时同时处理的发布数（1 表示顺序重放）
    pub replay_concurrency: usize,
}

impl Default for MulticasterConfig {
    fn default() -> Self {
        Self {
            replay_concurrency: 1,
        }
    }
}
