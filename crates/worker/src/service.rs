use std::sync::Arc;
use std::time::Duration;

use bookshelf_domain::{
    entities::JobMessage, messaging::MessageQueue, repositories::BookRepository,
    value_objects::ProcessedCounter,
};
use bookshelf_errors::BookshelfResult;
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::enrichment;

/// 单个任务的终态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// 处理成功，已ack并计数
    Completed,
    /// 处理失败，已nack等待Broker重投
    Rejected,
    /// 毒消息，已ack丢弃（重投不可能成功）
    Poisoned,
}

/// Worker服务构建器
pub struct WorkerServiceBuilder {
    worker_id: String,
    book_repository: Arc<dyn BookRepository>,
    message_queue: Arc<dyn MessageQueue>,
    job_queue: String,
    max_concurrent_jobs: u32,
    poll_interval_ms: u64,
    counter: Arc<ProcessedCounter>,
}

impl WorkerServiceBuilder {
    /// 创建新的构建器
    pub fn new(
        book_repository: Arc<dyn BookRepository>,
        message_queue: Arc<dyn MessageQueue>,
        job_queue: String,
    ) -> Self {
        Self {
            worker_id: hostname::get()
                .map(|h| h.to_string_lossy().to_string())
                .unwrap_or_else(|_| "book-worker".to_string()),
            book_repository,
            message_queue,
            job_queue,
            max_concurrent_jobs: 5,
            poll_interval_ms: 1000,
            counter: Arc::new(ProcessedCounter::new()),
        }
    }

    /// 设置Worker标识
    pub fn worker_id<S: Into<String>>(mut self, worker_id: S) -> Self {
        self.worker_id = worker_id.into();
        self
    }

    /// 设置最大并发任务数
    pub fn max_concurrent_jobs(mut self, max_concurrent_jobs: u32) -> Self {
        self.max_concurrent_jobs = max_concurrent_jobs.max(1);
        self
    }

    /// 设置轮询间隔
    pub fn poll_interval_ms(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// 使用外部共享的处理计数（状态端点读取同一实例）
    pub fn counter(mut self, counter: Arc<ProcessedCounter>) -> Self {
        self.counter = counter;
        self
    }

    pub fn build(self) -> WorkerService {
        let (shutdown_tx, _) = broadcast::channel(1);
        WorkerService {
            worker_id: self.worker_id,
            book_repository: self.book_repository,
            message_queue: self.message_queue,
            job_queue: self.job_queue,
            max_concurrent_jobs: self.max_concurrent_jobs,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            semaphore: Arc::new(Semaphore::new(self.max_concurrent_jobs as usize)),
            counter: self.counter,
            shutdown_tx,
        }
    }
}

/// 图书富化Worker
///
/// 每个任务的状态机：
/// 收到 -> 解码 -> 取记录 -> 富化 -> 写回 -> 计数 -> ack；
/// 解码失败按毒消息ack丢弃，其余失败一律nack交给Broker重投。
/// 依赖全部通过构造注入，没有进程级单例。
pub struct WorkerService {
    worker_id: String,
    book_repository: Arc<dyn BookRepository>,
    message_queue: Arc<dyn MessageQueue>,
    job_queue: String,
    max_concurrent_jobs: u32,
    poll_interval: Duration,
    semaphore: Arc<Semaphore>,
    counter: Arc<ProcessedCounter>,
    shutdown_tx: broadcast::Sender<()>,
}

impl WorkerService {
    pub fn builder(
        book_repository: Arc<dyn BookRepository>,
        message_queue: Arc<dyn MessageQueue>,
        job_queue: String,
    ) -> WorkerServiceBuilder {
        WorkerServiceBuilder::new(book_repository, message_queue, job_queue)
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    pub fn processed_counter(&self) -> Arc<ProcessedCounter> {
        Arc::clone(&self.counter)
    }

    /// 声明队列并启动轮询循环
    pub async fn start(self: &Arc<Self>) -> BookshelfResult<JoinHandle<()>> {
        self.message_queue
            .create_queue(&self.job_queue, true)
            .await?;

        info!(
            "Worker {} 启动，队列: {}, 并发上限: {}",
            self.worker_id, self.job_queue, self.max_concurrent_jobs
        );

        let service = Arc::clone(self);
        let shutdown_rx = self.shutdown_tx.subscribe();
        Ok(tokio::spawn(async move {
            service.run_poll_loop(shutdown_rx).await;
        }))
    }

    /// 停止拉取新任务；在途任务会先完成当前步骤
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(());
    }

    async fn run_poll_loop(self: Arc<Self>, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut poll_interval = interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Worker {} 收到关闭信号，停止拉取新任务", self.worker_id);
                    break;
                }
                _ = poll_interval.tick() => {
                    if let Err(e) = self.poll_once().await {
                        warn!("拉取任务失败: {e}");
                    }
                }
            }
        }

        // 等待全部在途任务结束后再退出
        match self
            .semaphore
            .acquire_many(self.max_concurrent_jobs)
            .await
        {
            Ok(_permits) => info!("Worker {} 在途任务已全部结束", self.worker_id),
            Err(e) => error!("等待在途任务失败: {e}"),
        }
    }

    /// 轮询一次队列，把取到的消息分发给受并发上限约束的任务
    pub async fn poll_once(self: &Arc<Self>) -> BookshelfResult<usize> {
        let messages = self.message_queue.consume_messages(&self.job_queue).await?;
        let count = messages.len();

        for message in messages {
            let permit = match Arc::clone(&self.semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!("获取并发许可失败: {e}");
                    break;
                }
            };
            let service = Arc::clone(self);
            tokio::spawn(async move {
                let _permit = permit;
                service.process_message(&message).await;
            });
        }

        Ok(count)
    }

    /// 处理单条消息并对Broker做出ack/nack决定
    pub async fn process_message(&self, message: &JobMessage) -> JobOutcome {
        let book_id = match message.book_id() {
            Ok(id) => id,
            Err(e) => {
                // 毒消息：无论重投多少次都不可能解码成功，
                // ack丢弃并留下告警日志，避免无限重投
                warn!("消息 {} 无法解码，按毒消息丢弃: {e}", message.id);
                if let Err(e) = self.message_queue.ack_message(&message.id).await {
                    warn!("确认毒消息 {} 失败: {e}", message.id);
                }
                return JobOutcome::Poisoned;
            }
        };

        if message.redelivered {
            debug!("[ID {book_id}] 重投消息");
        }
        info!("[ID {book_id}] Processing");

        match self.enrich_book(book_id).await {
            Ok(changed) => {
                if let Err(e) = self.message_queue.ack_message(&message.id).await {
                    // ack没有送达，消息仍在途，留给Broker的租约重投
                    warn!("[ID {book_id}] 确认消息失败: {e}");
                    return JobOutcome::Rejected;
                }
                let processed = self.counter.increment();
                if changed {
                    info!("[ID {book_id}] ACK，累计处理 {processed} 本");
                } else {
                    info!("[ID {book_id}] 已富化过，跳过写回后ACK，累计处理 {processed} 本");
                }
                JobOutcome::Completed
            }
            Err(e) => {
                warn!("[ID {book_id}] 更新失败，等待重投: {e}");
                if let Err(e) = self.message_queue.nack_message(&message.id, true).await {
                    warn!("[ID {book_id}] 拒绝消息失败: {e}");
                }
                JobOutcome::Rejected
            }
        }
    }

    /// 取记录、富化、写回；返回记录是否发生变化
    async fn enrich_book(&self, book_id: i64) -> BookshelfResult<bool> {
        let mut book = self.book_repository.get(book_id).await?;

        if !enrichment::apply_update(&mut book) {
            return Ok(false);
        }

        self.book_repository.update(&book).await?;
        Ok(true)
    }
}
