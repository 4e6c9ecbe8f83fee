//! 启动重放（replay）
//!
//! 在所有监听器注册完毕、对外接收流量之前执行一次：
//! 拉取未完成的发布，按监听器 ID 找到当前注册的持久化监听器并重新投递，
//! 完成标记直接作用于被重放的记录。找不到监听器时保持记录未完成。
//!
use crate::{
    domain_event::ApplicationEvent,
    error::DomainResult as Result,
    eventing::{ListenerContext, PersistentEventMulticaster},
    publication::EventPublication,
};
use futures_util::{StreamExt, stream};
use tracing::{debug, info, warn};

/// 一次重放的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// 已重新投递给监听器
    pub replayed: usize,
    /// 监听器已不存在，记录保持未完成
    pub skipped: usize,
    /// 事件无法还原或监听器调用失败
    pub failed: usize,
}

enum ReplayOutcome {
    Replayed,
    Skipped,
    Failed,
}

impl PersistentEventMulticaster {
    /// 重放所有未完成的发布
    pub async fn replay_incomplete_publications(&self) -> Result<ReplayReport> {
        let publications = self.registry().find_incomplete_publications().await?;

        if publications.is_empty() {
            debug!("no incomplete publications to replay");
            return Ok(ReplayReport::default());
        }

        let concurrency = self.config().replay_concurrency.max(1);
        let outcomes: Vec<ReplayOutcome> = stream::iter(publications)
            .map(|publication| self.replay(publication))
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut report = ReplayReport::default();
        for outcome in outcomes {
            match outcome {
                ReplayOutcome::Replayed => report.replayed += 1,
                ReplayOutcome::Skipped => report.skipped += 1,
                ReplayOutcome::Failed => report.failed += 1,
            }
        }

        info!(
            replayed = report.replayed,
            skipped = report.skipped,
            failed = report.failed,
            "replayed incomplete publications"
        );
        Ok(report)
    }

    async fn replay(&self, publication: EventPublication) -> ReplayOutcome {
        let target = publication.target_identifier();

        let Some(listener) = self.durable_listener(target.as_str()) else {
            debug!(listener = %target, id = %publication.id(), "Listener {} not found!", target);
            return ReplayOutcome::Skipped;
        };

        let event = match publication.event() {
            Ok(event) => event,
            Err(err) => {
                warn!(
                    id = %publication.id(),
                    event_type = %publication.event_type(),
                    error = %err,
                    "cannot restore event of incomplete publication"
                );
                return ReplayOutcome::Failed;
            }
        };

        // 存储的总是载荷本身，重放时统一以载荷信封投递
        let application_event = ApplicationEvent::Payload(event.clone());

        // 按记录本身完成，避免自然键相同的另一条记录被误标
        let completion = self
            .completion_for(event, target.clone())
            .for_publication(publication.clone());
        let ctx = ListenerContext::new(None, Some(completion));

        match listener.on_event(&application_event, ctx).await {
            Ok(()) => ReplayOutcome::Replayed,
            Err(err) => {
                warn!(listener = %target, id = %publication.id(), error = %err, "replay invocation failed");
                ReplayOutcome::Failed
            }
        }
    }
}
