use anyhow::Result;
use flume::{bounded, Receiver, Sender};
use sqlx::PgPool;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::types::AuditEntry;

#[derive(Debug, Clone)]
pub struct AuditLoggerConfig {
    /// Queue capacity before entries are dropped.
    pub queue_capacity: usize,

    /// Entries per database insert.
    pub batch_size: usize,

    /// Max wait before flushing a partial batch (milliseconds).
    pub batch_timeout_ms: u64,

    /// Worker tasks draining the queue.
    pub worker_count: usize,
}

impl Default for AuditLoggerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 4_096,
            batch_size: 50,
            batch_timeout_ms: 1_000,
            worker_count: 1,
        }
    }
}

/// Fire-and-forget audit log backed by a bounded queue and batched inserts.
#[derive(Clone)]
pub struct AuditLogger {
    sender: Sender<AuditEntry>,
}

impl AuditLogger {
    pub fn new(pool: PgPool, config: AuditLoggerConfig) -> Self {
        let (sender, receiver) = bounded(config.queue_capacity);

        info!(
            "Initializing audit logger: queue={}, batch={}, timeout={}ms, workers={}",
            config.queue_capacity, config.batch_size, config.batch_timeout_ms, config.worker_count
        );

        for worker_id in 0..config.worker_count {
            let pool = pool.clone();
            let receiver = receiver.clone();
            let config = config.clone();

            tokio::spawn(async move {
                Self::worker_loop(worker_id, pool, receiver, config).await;
            });
        }

        Self { sender }
    }

    /// Enqueue an entry; a full queue drops it with a warning rather than
    /// blocking the request path.
    pub fn log(&self, entry: AuditEntry) {
        if let Err(e) = self.sender.try_send(entry) {
            warn!("Failed to enqueue audit entry (queue full?): {}", e);
        }
    }

    async fn worker_loop(
        worker_id: usize,
        pool: PgPool,
        receiver: Receiver<AuditEntry>,
        config: AuditLoggerConfig,
    ) {
        info!("Audit worker {} started", worker_id);

        let mut batch: Vec<AuditEntry> = Vec::with_capacity(config.batch_size);
        let batch_timeout = Duration::from_millis(config.batch_timeout_ms);

        loop {
            let deadline = tokio::time::Instant::now() + batch_timeout;

            while batch.len() < config.batch_size {
                match tokio::time::timeout_at(deadline, receiver.recv_async()).await {
                    Ok(Ok(entry)) => {
                        batch.push(entry);
                    }
                    Ok(Err(_)) => {
                        // Channel closed, flush and exit
                        if !batch.is_empty() {
                            Self::flush_batch(&pool, &batch, worker_id).await;
                        }
                        info!("Audit worker {} shutting down (channel closed)", worker_id);
                        return;
                    }
                    Err(_) => {
                        // Timeout, flush what we have
                        break;
                    }
                }
            }

            if !batch.is_empty() {
                Self::flush_batch(&pool, &batch, worker_id).await;
                batch.clear();
            } else {
                sleep(Duration::from_millis(100)).await;
            }
        }
    }

    async fn flush_batch(pool: &PgPool, batch: &[AuditEntry], worker_id: usize) {
        match Self::insert_batch(pool, batch).await {
            Ok(inserted) => {
                debug!("Audit worker {} inserted {} entries", worker_id, inserted);
            }
            Err(e) => {
                error!("Audit worker {} failed to insert batch: {}", worker_id, e);
            }
        }
    }

    async fn insert_batch(pool: &PgPool, entries: &[AuditEntry]) -> Result<usize> {
        let mut query_builder = sqlx::QueryBuilder::new(
            "INSERT INTO pos_activity_log (activity_type, status, subject, detail, created_at) ",
        );

        query_builder.push_values(entries, |mut b, entry| {
            b.push_bind(entry.audit_type.as_str())
                .push_bind(entry.status.as_str())
                .push_bind(&entry.subject)
                .push_bind(&entry.detail)
                .push_bind(entry.created_at);
        });

        let query = query_builder.build();
        let result = query.execute(pool).await?;

        Ok(result.rows_affected() as usize)
    }

    pub fn queue_len(&self) -> usize {
        self.sender.len()
    }
}
