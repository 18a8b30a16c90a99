use std::sync::Arc;

use anyhow::{Context, Result};
use bookshelf_api::{create_routes, AppState};
use bookshelf_config::AppConfig;
use bookshelf_domain::{
    messaging::MessageQueue, repositories::BookRepository, value_objects::ProcessedCounter,
};
use bookshelf_infrastructure::{database::create_book_repository, MessageQueueFactory};
use bookshelf_worker::WorkerService;
use tokio::{net::TcpListener, sync::broadcast};
use tracing::{error, info};

/// 主应用程序
///
/// 依赖在这里组装并显式注入：存储、消息队列、处理计数都由
/// Application持有，Worker与状态端点共享同一个计数实例。
pub struct Application {
    config: AppConfig,
    book_repository: Arc<dyn BookRepository>,
    counter: Arc<ProcessedCounter>,
    worker: Arc<WorkerService>,
}

impl Application {
    /// 创建新的应用实例
    ///
    /// 启动期的致命错误（Broker不可达、schema校验失败）从这里
    /// 向上传播，进程记录原因后以非零状态退出。
    pub async fn new(config: AppConfig) -> Result<Self> {
        info!("初始化应用程序, worker_id: {}", config.worker.worker_id);

        // 建立连接池并完成schema bootstrap
        let book_repository = create_book_repository(&config.database)
            .await
            .context("初始化图书存储失败")?;

        // 创建消息队列（幂等声明任务队列）
        let message_queue: Arc<dyn MessageQueue> =
            MessageQueueFactory::create(&config.message_queue)
                .await
                .context("初始化消息队列失败")?;

        let counter = Arc::new(ProcessedCounter::new());

        let worker = Arc::new(
            WorkerService::builder(
                Arc::clone(&book_repository),
                message_queue,
                config.message_queue.job_queue.clone(),
            )
            .worker_id(config.worker.worker_id.clone())
            .max_concurrent_jobs(config.worker.max_concurrent_jobs)
            .poll_interval_ms(config.worker.poll_interval_ms)
            .counter(Arc::clone(&counter))
            .build(),
        );

        Ok(Self {
            config,
            book_repository,
            counter,
            worker,
        })
    }

    /// 运行应用程序直到收到关闭信号
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let worker_handle = if self.config.worker.enabled {
            Some(self.worker.start().await.context("启动Worker失败")?)
        } else {
            info!("Worker已在配置中禁用");
            None
        };

        let api_handle = if self.config.api.enabled {
            let state = AppState {
                processed_counter: Arc::clone(&self.counter),
            };
            let router = create_routes(state);
            let addr = self.config.api.bind_address.clone();
            let listener = TcpListener::bind(&addr)
                .await
                .with_context(|| format!("绑定API地址失败: {addr}"))?;
            info!("状态端点监听于 http://{addr}");

            let mut api_shutdown_rx = shutdown_rx.resubscribe();
            Some(tokio::spawn(async move {
                let result = axum::serve(listener, router)
                    .with_graceful_shutdown(async move {
                        let _ = api_shutdown_rx.recv().await;
                    })
                    .await;
                if let Err(e) = result {
                    error!("API服务器异常退出: {e}");
                }
            }))
        } else {
            None
        };

        // 等待关闭信号
        let _ = shutdown_rx.recv().await;
        info!("开始关闭应用组件");

        // 先停止拉取新任务，让在途任务完成当前步骤
        self.worker.stop();
        if let Some(handle) = worker_handle {
            let _ = handle.await;
        }
        if let Some(handle) = api_handle {
            let _ = handle.await;
        }

        // 全部任务结束后才释放存储连接
        self.book_repository.close().await;
        info!("应用已停止");
        Ok(())
    }
}
