//! Postgres 版发布记录仓储（需启用 `infra-sqlx` 特性）
//!
//! 事件以 `jsonb` 存储，自然键查询直接依赖 `jsonb` 的值相等语义。
//!
use crate::{
    error::DomainResult as Result,
    publication::{EventPublicationRepository, PublicationRecord},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS event_publication (
    id               UUID PRIMARY KEY,
    publication_date TIMESTAMPTZ NOT NULL,
    listener_id      TEXT NOT NULL,
    serialized_event JSONB NOT NULL,
    event_type       TEXT NOT NULL,
    completion_date  TIMESTAMPTZ NULL
)
"#;

// COALESCE 保证完成时间只写一次
const UPSERT: &str = r#"
INSERT INTO event_publication
    (id, publication_date, listener_id, serialized_event, event_type, completion_date)
VALUES ($1, $2, $3, $4, $5, $6)
ON CONFLICT (id) DO UPDATE
    SET completion_date = COALESCE(event_publication.completion_date, EXCLUDED.completion_date)
"#;

const CREATE_PENDING_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS event_publication_pending_idx
    ON event_publication (listener_id, publication_date)
    WHERE completion_date IS NULL
"#;

#[derive(Clone)]
pub struct PgEventPublicationRepository {
    pool: PgPool,
}

impl PgEventPublicationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 创建表与未完成记录索引（幂等）
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_PENDING_INDEX).execute(&self.pool).await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct PublicationRow {
    id: Uuid,
    publication_date: DateTime<Utc>,
    listener_id: String,
    serialized_event: Value,
    event_type: String,
    completion_date: Option<DateTime<Utc>>,
}

impl From<PublicationRow> for PublicationRecord {
    fn from(row: PublicationRow) -> Self {
        PublicationRecord::builder()
            .id(row.id)
            .publication_date(row.publication_date)
            .listener_id(row.listener_id)
            .serialized_event(row.serialized_event)
            .event_type(row.event_type)
            .maybe_completion_date(row.completion_date)
            .build()
    }
}

fn bind_record<'q>(
    query: Query<'q, Postgres, PgArguments>,
    publication: &'q PublicationRecord,
) -> Query<'q, Postgres, PgArguments> {
    query
        .bind(publication.id())
        .bind(publication.publication_date())
        .bind(publication.listener_id())
        .bind(publication.serialized_event())
        .bind(publication.event_type())
        .bind(publication.completion_date())
}

#[async_trait]
impl EventPublicationRepository for PgEventPublicationRepository {
    async fn save(&self, publication: &PublicationRecord) -> Result<()> {
        bind_record(sqlx::query(UPSERT), publication)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn save_all(&self, publications: &[PublicationRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for publication in publications {
            bind_record(sqlx::query(UPSERT), publication)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn find_by_completion_date_is_null(&self) -> Result<Vec<PublicationRecord>> {
        let rows = sqlx::query_as::<_, PublicationRow>(
            r#"
            SELECT id, publication_date, listener_id, serialized_event, event_type, completion_date
            FROM event_publication
            WHERE completion_date IS NULL
            ORDER BY publication_date
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(PublicationRecord::from).collect())
    }

    async fn find_by_serialized_event_and_listener_id(
        &self,
        serialized_event: &Value,
        listener_id: &str,
    ) -> Result<Option<PublicationRecord>> {
        let row = sqlx::query_as::<_, PublicationRow>(
            r#"
            SELECT id, publication_date, listener_id, serialized_event, event_type, completion_date
            FROM event_publication
            WHERE serialized_event = $1 AND listener_id = $2
            ORDER BY completion_date IS NULL DESC, publication_date
            LIMIT 1
            "#,
        )
        .bind(serialized_event)
        .bind(listener_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(PublicationRecord::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    async fn repository() -> PgEventPublicationRepository {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPool::connect(&url).await.unwrap();
        let repo = PgEventPublicationRepository::new(pool);
        repo.migrate().await.unwrap();
        repo
    }

    #[tokio::test]
    #[ignore]
    async fn upsert_keeps_first_completion_date() {
        let repo = repository().await;
        let mut record = PublicationRecord::pending("pg-l1", "T", json!({"_class": "T"}));
        let stale = record.clone();
        repo.save(&record).await.unwrap();

        record.mark_completed(Utc::now());
        repo.save(&record).await.unwrap();

        let mut later = stale.clone();
        later.mark_completed(Utc::now() + chrono::Duration::hours(1));
        repo.save(&later).await.unwrap();
        repo.save(&stale).await.unwrap();

        let found = repo
            .find_by_serialized_event_and_listener_id(record.serialized_event(), "pg-l1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id(), record.id());
        // 数据库时间精度为微秒
        let stored = found.completion_date().unwrap();
        let expected = record.completion_date().unwrap();
        assert!((stored - expected).num_milliseconds().abs() < 1);
    }

    #[tokio::test]
    #[ignore]
    async fn natural_key_matches_jsonb_value_and_listener() {
        let repo = repository().await;
        let marker = uuid::Uuid::new_v4().to_string();
        let event = json!({"_class": "T", "body": {"marker": marker, "n": 1}});

        let record = PublicationRecord::pending("pg-l2", "T", event.clone());
        repo.save_all(std::slice::from_ref(&record)).await.unwrap();

        // jsonb 比较与键顺序无关
        let reordered = json!({"body": {"n": 1, "marker": marker}, "_class": "T"});
        let found = repo
            .find_by_serialized_event_and_listener_id(&reordered, "pg-l2")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id(), record.id());

        assert!(
            repo.find_by_serialized_event_and_listener_id(&event, "pg-other")
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            repo.find_by_completion_date_is_null()
                .await
                .unwrap()
                .iter()
                .any(|r| r.id() == record.id())
        );
    }
}
