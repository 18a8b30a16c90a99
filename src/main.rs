use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use bookshelf::app::Application;
use bookshelf::common::{init_logging, wait_for_shutdown_signal};
use bookshelf::shutdown::ShutdownManager;
use bookshelf_config::AppConfig;
use clap::{Arg, Command};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let matches = Command::new("bookshelf")
        .version(env!("CARGO_PKG_VERSION"))
        .about("图书目录异步更新Worker")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径"),
        )
        .arg(
            Arg::new("worker-id")
                .short('w')
                .long("worker-id")
                .value_name("ID")
                .help("Worker节点唯一标识符"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别")
                .value_parser(["trace", "debug", "info", "warn", "error"])
                .default_value("info"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式")
                .value_parser(["json", "pretty"])
                .default_value("pretty"),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config");
    let worker_id = matches.get_one::<String>("worker-id");
    let log_level = matches.get_one::<String>("log-level").unwrap();
    let log_format = matches.get_one::<String>("log-format").unwrap();

    // 初始化日志系统
    init_logging(log_level, log_format)?;

    info!("启动图书更新Worker");
    if let Some(path) = config_path {
        info!("配置文件: {path}");
    }

    // 加载配置
    let mut config = AppConfig::load(config_path.map(String::as_str))
        .context("加载配置失败")?;

    // 如果指定了worker-id，覆盖配置中的worker_id
    if let Some(id) = worker_id {
        config.worker.worker_id = id.clone();
    }

    // 创建应用实例；启动失败记录原因后以非零状态退出
    let app = Application::new(config).await.inspect_err(|e| {
        error!("应用启动失败: {e:#}");
    })?;

    // 创建优雅关闭管理器
    let shutdown_manager = ShutdownManager::new();

    // 启动应用
    let app_handle = {
        let app = Arc::new(app);
        let shutdown_rx = shutdown_manager.subscribe();

        tokio::spawn(async move {
            if let Err(e) = app.run(shutdown_rx).await {
                error!("应用运行失败: {e:#}");
            }
        })
    };

    // 等待关闭信号
    wait_for_shutdown_signal().await;

    info!("收到关闭信号，开始优雅关闭...");
    shutdown_manager.shutdown().await;

    // 给在途任务一个收尾窗口
    if tokio::time::timeout(Duration::from_secs(30), app_handle)
        .await
        .is_err()
    {
        warn!("关闭超时，强制退出");
    }

    info!("进程退出");
    Ok(())
}
