use anyhow::{Context, Result};
use bookshelf::common::init_logging;
use bookshelf_config::AppConfig;
use bookshelf_domain::{entities::JobMessage, messaging::MessageQueue};
use bookshelf_infrastructure::MessageQueueFactory;
use clap::{Arg, ArgAction, Command};
use tracing::info;

/// 图书富化任务发布工具
///
/// 目录应用在线上充当生产者；本工具用于手工补发任务与排查。
#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("bookshelf-publish")
        .version(env!("CARGO_PKG_VERSION"))
        .about("图书富化任务发布工具")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径"),
        )
        .arg(
            Arg::new("book-id")
                .value_name("BOOK_ID")
                .help("要富化的图书ID")
                .value_parser(clap::value_parser!(i64))
                .required_unless_present("queue-size"),
        )
        .arg(
            Arg::new("queue-size")
                .long("queue-size")
                .help("查看队列当前积压数量")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    init_logging("info", "pretty")?;

    let config_path = matches.get_one::<String>("config");
    let config = AppConfig::load(config_path.map(String::as_str)).context("加载配置失败")?;

    let message_queue = MessageQueueFactory::create(&config.message_queue)
        .await
        .context("连接消息队列失败")?;
    let job_queue = &config.message_queue.job_queue;

    message_queue
        .create_queue(job_queue, true)
        .await
        .context("声明任务队列失败")?;

    if matches.get_flag("queue-size") {
        let size = message_queue.get_queue_size(job_queue).await?;
        println!("队列 {job_queue} 当前积压 {size} 条消息");
        return Ok(());
    }

    let book_id = *matches.get_one::<i64>("book-id").unwrap();
    let message = JobMessage::enrich_book(book_id);
    message_queue
        .publish_message(job_queue, &message)
        .await
        .with_context(|| format!("发布任务失败, book_id={book_id}"))?;

    info!("[ID {book_id}] 任务已发布到队列 {job_queue}, message_id={}", message.id);
    Ok(())
}
