//! 内存版发布记录仓储（InMemoryEventPublicationRepository）
//!
//! 基于 `DashMap` 分片锁实现，支持并发追加与对不同记录的独立更新，
//! 典型用途：测试环境、示例与本地开发。重启即丢失，不提供真正的持久性。

use crate::{
    error::DomainResult as Result,
    publication::{EventPublicationRepository, PublicationRecord},
};
use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct InMemoryEventPublicationRepository {
    records: Arc<DashMap<Uuid, PublicationRecord>>,
}

impl InMemoryEventPublicationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前全部记录（含已完成），按发布时间升序
    pub fn all(&self) -> Vec<PublicationRecord> {
        let mut all: Vec<PublicationRecord> =
            self.records.iter().map(|r| r.value().clone()).collect();
        all.sort_by_key(|r| r.publication_date());
        all
    }

    pub fn get(&self, id: Uuid) -> Option<PublicationRecord> {
        self.records.get(&id).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl EventPublicationRepository for InMemoryEventPublicationRepository {
    async fn save(&self, publication: &PublicationRecord) -> Result<()> {
        match self.records.entry(publication.id()) {
            Entry::Occupied(mut existing) => {
                // 完成时间只允许从无到有
                if !existing.get().is_completed() {
                    existing.insert(publication.clone());
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(publication.clone());
            }
        }
        Ok(())
    }

    async fn save_all(&self, publications: &[PublicationRecord]) -> Result<()> {
        // 内存写入不会失败，逐条写入即满足全有或全无
        for publication in publications {
            self.save(publication).await?;
        }
        Ok(())
    }

    async fn find_by_completion_date_is_null(&self) -> Result<Vec<PublicationRecord>> {
        let mut pending: Vec<PublicationRecord> = self
            .records
            .iter()
            .filter(|r| !r.value().is_completed())
            .map(|r| r.value().clone())
            .collect();
        pending.sort_by_key(|r| r.publication_date());
        Ok(pending)
    }

    async fn find_by_serialized_event_and_listener_id(
        &self,
        serialized_event: &Value,
        listener_id: &str,
    ) -> Result<Option<PublicationRecord>> {
        let mut found: Option<PublicationRecord> = None;

        for r in self.records.iter() {
            let record = r.value();
            if record.listener_id() != listener_id || record.serialized_event() != serialized_event {
                continue;
            }
            if !record.is_completed() {
                return Ok(Some(record.clone()));
            }
            found.get_or_insert_with(|| record.clone());
        }

        Ok(found)
    }
}
