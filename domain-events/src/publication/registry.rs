//! 发布登记簿（EventPublicationRegistry）
//!
//! 以投递为中心的接口，编排序列化器与发布记录仓储：
//! - `store`：为每个持久化监听器登记一条待完成记录（与分发决策同属一个工作单元）；
//! - `find_incomplete_publications`：列出未完成记录；
//! - `mark_completed`：按自然键定位记录并标记完成（独立工作单元，未命中时静默忽略）；
//! - `shutdown`：关停时报告仍未完成的记录（只读）。
//!
use crate::{
    domain_event::EventObject,
    error::DomainResult as Result,
    publication::{
        EventPublication, EventPublicationRepository, PublicationRecord, PublicationTargetId,
    },
    serializer::{EventSerializer, JsonEventSerializer},
};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

#[async_trait]
pub trait EventPublicationRegistry: Send + Sync {
    /// 为每个目标监听器登记一条待完成记录，任一记录写入失败即返回错误
    async fn store(&self, event: &EventObject, listeners: &[PublicationTargetId]) -> Result<()>;

    /// 所有未完成的发布
    async fn find_incomplete_publications(&self) -> Result<Vec<EventPublication>>;

    /// 按（序列化事件，监听器）定位未完成记录并标记完成；未命中时不做任何事
    async fn mark_completed(&self, event: &EventObject, listener: &PublicationTargetId)
    -> Result<()>;

    /// 直接完成已持有的发布记录
    async fn mark_publication_completed(&self, publication: &EventPublication) -> Result<()>;

    /// 关停钩子：报告仍未完成的记录，返回其数量
    async fn shutdown(&self) -> Result<usize>;
}

/// 默认登记簿实现：仓储 + 序列化器
pub struct DefaultEventPublicationRegistry<R> {
    events: R,
    serializer: Arc<dyn EventSerializer>,
}

impl<R> DefaultEventPublicationRegistry<R>
where
    R: EventPublicationRepository,
{
    /// 使用默认的 `JsonEventSerializer`
    pub fn new(events: R) -> Self {
        Self::with_serializer(events, Arc::new(JsonEventSerializer))
    }

    pub fn with_serializer(events: R, serializer: Arc<dyn EventSerializer>) -> Self {
        Self { events, serializer }
    }

    fn map(&self, event: &EventObject, listener: &PublicationTargetId) -> Result<PublicationRecord> {
        let record = PublicationRecord::pending(
            listener.as_str(),
            event.event_type(),
            self.serializer.serialize(event)?,
        );

        debug!(
            event_type = %record.event_type(),
            id = %record.id(),
            listener = %record.listener_id(),
            "registering publication"
        );

        Ok(record)
    }

    async fn complete(&self, mut record: PublicationRecord) -> Result<()> {
        debug!(
            event_type = %record.event_type(),
            id = %record.id(),
            listener = %record.listener_id(),
            "marking publication completed"
        );

        if record.mark_completed(Utc::now()) {
            self.events.save(&record).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<R> EventPublicationRegistry for DefaultEventPublicationRegistry<R>
where
    R: EventPublicationRepository,
{
    async fn store(&self, event: &EventObject, listeners: &[PublicationTargetId]) -> Result<()> {
        let records = listeners
            .iter()
            .map(|listener| self.map(event, listener))
            .collect::<Result<Vec<_>>>()?;

        self.events.save_all(&records).await?;

        info!(
            event_type = %event.event_type(),
            count = listeners.len(),
            "stored event publication successfully"
        );
        Ok(())
    }

    async fn find_incomplete_publications(&self) -> Result<Vec<EventPublication>> {
        let records = self.events.find_by_completion_date_is_null().await?;

        Ok(records
            .into_iter()
            .map(|r| EventPublication::new(r, self.serializer.clone()))
            .collect())
    }

    async fn mark_completed(
        &self,
        event: &EventObject,
        listener: &PublicationTargetId,
    ) -> Result<()> {
        let serialized = self.serializer.serialize(event)?;

        match self
            .events
            .find_by_serialized_event_and_listener_id(&serialized, listener.as_str())
            .await?
        {
            Some(record) if !record.is_completed() => self.complete(record).await,
            _ => {
                debug!(
                    event_type = %event.event_type(),
                    listener = %listener,
                    "no pending publication to complete"
                );
                Ok(())
            }
        }
    }

    async fn mark_publication_completed(&self, publication: &EventPublication) -> Result<()> {
        self.complete(publication.record().clone()).await
    }

    async fn shutdown(&self) -> Result<usize> {
        let outstanding = self.events.find_by_completion_date_is_null().await?;

        if outstanding.is_empty() {
            debug!("No publications outstanding!");
            return Ok(0);
        }

        debug!("Shutting down with the following publications left unfinished:");
        for it in &outstanding {
            debug!("\t{} - {} - {}", it.id(), it.event_type(), it.listener_id());
        }

        Ok(outstanding.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_event::DomainEvent;
    use crate::error::DomainError;
    use crate::publication::InMemoryEventPublicationRepository;
    use serde::{Deserialize, Serialize};
    use serde_json::Value;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct InvoiceIssued {
        invoice_id: String,
    }

    impl DomainEvent for InvoiceIssued {
        const EVENT_TYPE: &'static str = "billing::InvoiceIssued";
    }

    fn issued(id: &str) -> EventObject {
        EventObject::from_event(&InvoiceIssued {
            invoice_id: id.into(),
        })
        .unwrap()
    }

    fn targets(ids: &[&str]) -> Vec<PublicationTargetId> {
        ids.iter().map(|id| PublicationTargetId::from(*id)).collect()
    }

    #[tokio::test]
    async fn store_creates_one_pending_record_per_listener() {
        let repo = InMemoryEventPublicationRepository::new();
        let registry = DefaultEventPublicationRegistry::new(repo.clone());

        registry
            .store(&issued("i-1"), &targets(&["a", "b", "c"]))
            .await
            .unwrap();

        let all = repo.all();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|r| r.completion_date().is_none()));
        assert!(
            all.iter()
                .all(|r| r.event_type() == InvoiceIssued::EVENT_TYPE)
        );

        let incomplete = registry.find_incomplete_publications().await.unwrap();
        assert_eq!(incomplete.len(), 3);
        for p in &incomplete {
            assert_eq!(p.event().unwrap(), issued("i-1"));
        }
    }

    #[tokio::test]
    async fn mark_completed_is_idempotent_and_excludes_record() {
        let repo = InMemoryEventPublicationRepository::new();
        let registry = DefaultEventPublicationRegistry::new(repo.clone());
        registry
            .store(&issued("i-1"), &targets(&["a", "b"]))
            .await
            .unwrap();

        let a = PublicationTargetId::from("a");
        registry.mark_completed(&issued("i-1"), &a).await.unwrap();
        let first: Vec<_> = repo.all();

        registry.mark_completed(&issued("i-1"), &a).await.unwrap();
        assert_eq!(repo.all(), first);

        let incomplete = registry.find_incomplete_publications().await.unwrap();
        assert_eq!(incomplete.len(), 1);
        assert_eq!(incomplete[0].listener_id(), "b");
        assert_eq!(registry.shutdown().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn mark_completed_without_record_is_noop() {
        let repo = InMemoryEventPublicationRepository::new();
        let registry = DefaultEventPublicationRegistry::new(repo.clone());
        registry.store(&issued("i-1"), &targets(&["a"])).await.unwrap();

        registry
            .mark_completed(&issued("i-2"), &PublicationTargetId::from("a"))
            .await
            .unwrap();
        registry
            .mark_completed(&issued("i-1"), &PublicationTargetId::from("z"))
            .await
            .unwrap();

        assert_eq!(registry.find_incomplete_publications().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn identity_overload_completes_publication_in_hand() {
        let repo = InMemoryEventPublicationRepository::new();
        let registry = DefaultEventPublicationRegistry::new(repo.clone());
        registry.store(&issued("i-1"), &targets(&["a"])).await.unwrap();

        let publication = registry
            .find_incomplete_publications()
            .await
            .unwrap()
            .remove(0);
        registry
            .mark_publication_completed(&publication)
            .await
            .unwrap();

        let stored = repo.get(publication.id()).unwrap();
        let completed = stored.completion_date().unwrap();
        assert!(completed >= stored.publication_date());
        assert_eq!(registry.shutdown().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn undecodable_record_fails_only_itself() {
        let repo = InMemoryEventPublicationRepository::new();
        let registry = DefaultEventPublicationRegistry::new(repo.clone());
        registry.store(&issued("i-1"), &targets(&["a"])).await.unwrap();

        // 类型标识与记录的 event_type 不符
        let broken = PublicationRecord::pending(
            "a",
            InvoiceIssued::EVENT_TYPE,
            serde_json::json!({"_class": "billing::Other", "body": {}}),
        );
        repo.save(&broken).await.unwrap();

        let incomplete = registry.find_incomplete_publications().await.unwrap();
        assert_eq!(incomplete.len(), 2);
        let (ok, bad): (Vec<_>, Vec<_>) = incomplete.iter().partition(|p| p.event().is_ok());
        assert_eq!(ok.len(), 1);
        assert_eq!(bad.len(), 1);
        assert!(matches!(
            bad[0].event().unwrap_err(),
            DomainError::TypeMismatch { .. }
        ));
    }

    /// 记录每次批量写入；批中含被拒绝的监听器时整批失败
    struct BatchRepository {
        inner: InMemoryEventPublicationRepository,
        batches: Mutex<Vec<usize>>,
        reject: Option<&'static str>,
    }

    impl BatchRepository {
        fn new(reject: Option<&'static str>) -> Self {
            Self {
                inner: InMemoryEventPublicationRepository::new(),
                batches: Mutex::new(Vec::new()),
                reject,
            }
        }
    }

    #[async_trait]
    impl EventPublicationRepository for BatchRepository {
        async fn save(&self, publication: &PublicationRecord) -> Result<()> {
            self.inner.save(publication).await
        }
        async fn save_all(&self, publications: &[PublicationRecord]) -> Result<()> {
            self.batches.lock().unwrap().push(publications.len());
            if publications
                .iter()
                .any(|p| Some(p.listener_id()) == self.reject)
            {
                return Err(DomainError::repository("disk full"));
            }
            self.inner.save_all(publications).await
        }
        async fn find_by_completion_date_is_null(&self) -> Result<Vec<PublicationRecord>> {
            self.inner.find_by_completion_date_is_null().await
        }
        async fn find_by_serialized_event_and_listener_id(
            &self,
            serialized_event: &Value,
            listener_id: &str,
        ) -> Result<Option<PublicationRecord>> {
            self.inner
                .find_by_serialized_event_and_listener_id(serialized_event, listener_id)
                .await
        }
    }

    #[tokio::test]
    async fn store_writes_all_listeners_in_one_batch() {
        let repo = Arc::new(BatchRepository::new(None));
        let registry = DefaultEventPublicationRegistry::new(repo.clone());

        registry
            .store(&issued("i-1"), &targets(&["a", "b", "c"]))
            .await
            .unwrap();

        assert_eq!(*repo.batches.lock().unwrap(), vec![3]);
        assert_eq!(repo.inner.len(), 3);
    }

    #[tokio::test]
    async fn store_failure_leaves_no_partial_intents() {
        let repo = Arc::new(BatchRepository::new(Some("b")));
        let registry = DefaultEventPublicationRegistry::new(repo.clone());

        let err = registry
            .store(&issued("i-1"), &targets(&["a", "b", "c"]))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::PublicationRepository { .. }));
        assert!(repo.inner.is_empty());
        assert!(registry.find_incomplete_publications().await.unwrap().is_empty());
    }
}
