//! 发布记录仓储协议
//!
//! 存储后端只需提供追加/更新、查询未完成记录与按自然键精确查找三项能力，
//! 具体后端（内存、Postgres 等）由上层注入。
//!
use crate::{error::DomainResult as Result, publication::PublicationRecord};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

#[async_trait]
pub trait EventPublicationRepository: Send + Sync {
    /// 按 ID 插入或更新；已写入的完成时间不会被清空或覆盖
    async fn save(&self, publication: &PublicationRecord) -> Result<()>;

    /// 一次性写入一批新记录：要么全部写入，要么全部不写入
    async fn save_all(&self, publications: &[PublicationRecord]) -> Result<()>;

    /// 所有未完成的记录，按发布时间升序
    async fn find_by_completion_date_is_null(&self) -> Result<Vec<PublicationRecord>>;

    /// 按自然键精确匹配；多条记录共享同一自然键时优先返回未完成的那条
    async fn find_by_serialized_event_and_listener_id(
        &self,
        serialized_event: &Value,
        listener_id: &str,
    ) -> Result<Option<PublicationRecord>>;
}

#[async_trait]
impl<T> EventPublicationRepository for Arc<T>
where
    T: EventPublicationRepository + ?Sized,
{
    async fn save(&self, publication: &PublicationRecord) -> Result<()> {
        (**self).save(publication).await
    }

    async fn save_all(&self, publications: &[PublicationRecord]) -> Result<()> {
        (**self).save_all(publications).await
    }

    async fn find_by_completion_date_is_null(&self) -> Result<Vec<PublicationRecord>> {
        (**self).find_by_completion_date_is_null().await
    }

    async fn find_by_serialized_event_and_listener_id(
        &self,
        serialized_event: &Value,
        listener_id: &str,
    ) -> Result<Option<PublicationRecord>> {
        (**self)
            .find_by_serialized_event_and_listener_id(serialized_event, listener_id)
            .await
    }
}
