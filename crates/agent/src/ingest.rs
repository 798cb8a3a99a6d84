use checkin_core::{ProcessUpdateRequest, ProcessUpdateResponse};
use indexmap::IndexMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::sync::CancellationToken;

use crate::manager::ProjectManager;

/// 默认队列容量
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;
/// 默认保留的已结束状态条数
pub const DEFAULT_STATUS_RETENTION: usize = 1024;

struct IngestJob {
    id: String,
    request: ProcessUpdateRequest,
    reply: oneshot::Sender<ProcessUpdateResponse>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IngestStatus {
    Queued,
    Processed(ProcessUpdateResponse),
    /// worker 停止时仍在队列中，未处理
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    QueueFull,
    Closed,
}

/// 提交结果
#[derive(Debug)]
pub enum SubmitOutcome {
    Queued(IngestTicket),
    Rejected(RejectReason),
}

/// 提交凭证：可以等待处理结果
#[derive(Debug)]
pub struct IngestTicket {
    pub id: String,
    reply: oneshot::Receiver<ProcessUpdateResponse>,
}

impl IngestTicket {
    /// 等待处理完成；worker 在处理前退出时返回 None
    pub async fn wait(self) -> Option<ProcessUpdateResponse> {
        self.reply.await.ok()
    }
}

/// 状态表：按提交顺序保存，已结束的条数超过上限时淘汰最早的
struct StatusTable {
    entries: IndexMap<String, IngestStatus>,
    finished: usize,
    retention: usize,
}

impl StatusTable {
    fn new(retention: usize) -> Self {
        Self {
            entries: IndexMap::new(),
            finished: 0,
            retention,
        }
    }

    fn queue(&mut self, id: &str) {
        self.entries.insert(id.to_string(), IngestStatus::Queued);
    }

    fn forget(&mut self, id: &str) {
        if let Some(status) = self.entries.shift_remove(id) {
            if status != IngestStatus::Queued {
                self.finished -= 1;
            }
        }
    }

    fn finish(&mut self, id: &str, status: IngestStatus) {
        match self.entries.get_mut(id) {
            Some(slot) if *slot == IngestStatus::Queued => {
                *slot = status;
                self.finished += 1;
            }
            Some(slot) => *slot = status,
            None => {
                self.entries.insert(id.to_string(), status);
                self.finished += 1;
            }
        }

        while self.finished > self.retention {
            let Some(oldest) = self.entries.values().position(|s| *s != IngestStatus::Queued) else {
                break;
            };
            self.entries.shift_remove_index(oldest);
            self.finished -= 1;
        }
    }

    fn pending(&self) -> usize {
        self.entries.len() - self.finished
    }
}

type StatusBoard = Arc<Mutex<StatusTable>>;

/// 有界签到队列
///
/// 调用方通过 `submit` 入队后立即返回，由唯一的 [`IngestWorker`] 按提交顺序逐条处理。
pub struct IngestQueue {
    tx: mpsc::Sender<IngestJob>,
    statuses: StatusBoard,
    counter: AtomicU64,
}

impl IngestQueue {
    pub fn new(capacity: usize) -> (Self, IngestWorker) {
        Self::with_retention(capacity, DEFAULT_STATUS_RETENTION)
    }

    /// `retention`: 最多保留多少条已结束 (Processed / Dropped) 的状态
    pub fn with_retention(capacity: usize, retention: usize) -> (Self, IngestWorker) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let statuses: StatusBoard = Arc::new(Mutex::new(StatusTable::new(retention)));

        let queue = Self {
            tx,
            statuses: statuses.clone(),
            counter: AtomicU64::new(0),
        };
        (queue, IngestWorker { rx, statuses })
    }

    pub async fn submit(&self, request: ProcessUpdateRequest) -> SubmitOutcome {
        let id = format!("ingest-{}", self.counter.fetch_add(1, Ordering::Relaxed) + 1);
        let (reply_tx, reply_rx) = oneshot::channel();

        // 先登记状态，避免 worker 抢先处理后被覆盖
        self.statuses.lock().await.queue(&id);

        let job = IngestJob {
            id: id.clone(),
            request,
            reply: reply_tx,
        };
        match self.tx.try_send(job) {
            Ok(()) => {
                tracing::debug!("[INGEST] {} queued", id);
                SubmitOutcome::Queued(IngestTicket { id, reply: reply_rx })
            }
            Err(e) => {
                self.statuses.lock().await.forget(&id);
                let reason = match e {
                    mpsc::error::TrySendError::Full(_) => RejectReason::QueueFull,
                    mpsc::error::TrySendError::Closed(_) => RejectReason::Closed,
                };
                tracing::warn!("[INGEST] Submission rejected: {:?}", reason);
                SubmitOutcome::Rejected(reason)
            }
        }
    }

    pub async fn status(&self, id: &str) -> Option<IngestStatus> {
        self.statuses.lock().await.entries.get(id).cloned()
    }

    /// 当前排队中的数量
    pub async fn pending(&self) -> usize {
        self.statuses.lock().await.pending()
    }
}

/// 队列的消费端
pub struct IngestWorker {
    rx: mpsc::Receiver<IngestJob>,
    statuses: StatusBoard,
}

impl IngestWorker {
    /// 逐条处理直到取消或队列关闭，返回处理条数
    pub async fn run(mut self, manager: Arc<ProjectManager>, token: CancellationToken) -> usize {
        tracing::info!("[INGEST] Worker started");
        let mut processed = 0usize;

        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                job = self.rx.recv() => match job {
                    Some(job) => Some(job),
                    None => break,
                },
            };
            let Some(job) = next else {
                tracing::info!("[INGEST] Cancellation received, stopping worker");
                self.drop_remaining().await;
                break;
            };

            let response = manager.process_update(job.request).await;
            processed += 1;
            self.statuses
                .lock()
                .await
                .finish(&job.id, IngestStatus::Processed(response.clone()));

            if job.reply.send(response).is_err() {
                tracing::debug!("[INGEST] Ticket for {} was dropped", job.id);
            }
        }

        tracing::info!("[INGEST] Worker stopped after {} updates", processed);
        processed
    }

    /// 关闭队列，把仍在排队的任务标记为 Dropped (凭证随之收到 None)
    async fn drop_remaining(&mut self) {
        self.rx.close();
        let mut dropped = 0usize;
        let mut statuses = self.statuses.lock().await;
        while let Ok(job) = self.rx.try_recv() {
            statuses.finish(&job.id, IngestStatus::Dropped);
            dropped += 1;
        }
        if dropped > 0 {
            tracing::warn!("[INGEST] Dropped {} queued updates on shutdown", dropped);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finished_entries_are_evicted_oldest_first() {
        let mut table = StatusTable::new(2);
        for id in ["a", "b", "c", "d"] {
            table.queue(id);
        }
        table.finish("a", IngestStatus::Dropped);
        table.finish("b", IngestStatus::Dropped);
        table.finish("c", IngestStatus::Dropped);

        assert!(!table.entries.contains_key("a"));
        assert_eq!(table.entries.get("d"), Some(&IngestStatus::Queued));
        assert_eq!(table.entries.len(), 3);
        assert_eq!(table.pending(), 1);

        table.forget("d");
        assert_eq!(table.pending(), 0);
    }
}
