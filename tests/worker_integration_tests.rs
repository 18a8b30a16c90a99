use std::sync::Arc;
use std::time::Duration;

use bookshelf_domain::entities::{JobMessage, NewBook};
use bookshelf_domain::messaging::MessageQueue;
use bookshelf_domain::repositories::BookRepository;
use bookshelf_domain::value_objects::ProcessedCounter;
use bookshelf_infrastructure::{InMemoryMessageQueue, SqliteBookRepository};
use bookshelf_worker::WorkerService;

const JOB_QUEUE: &str = "fill-book-details";

async fn start_worker(
    repository: Arc<SqliteBookRepository>,
    queue: Arc<InMemoryMessageQueue>,
) -> (Arc<WorkerService>, tokio::task::JoinHandle<()>) {
    let worker = Arc::new(
        WorkerService::builder(repository, queue, JOB_QUEUE.to_string())
        .worker_id("e2e-worker")
        .max_concurrent_jobs(4)
        .poll_interval_ms(20)
        .build(),
    );
    let handle = worker.start().await.expect("启动Worker失败");
    (worker, handle)
}

async fn wait_for_count(counter: &ProcessedCounter, expected: u64) {
    for _ in 0..250 {
        if counter.get() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("等待计数达到 {expected} 超时, 当前: {}", counter.get());
}

#[tokio::test]
async fn test_end_to_end_enrichment() {
    let repository = Arc::new(
        SqliteBookRepository::new_embedded("sqlite::memory:")
            .await
            .unwrap(),
    );
    let queue = Arc::new(InMemoryMessageQueue::new());

    // 创建记录，存储分配ID
    let id = repository.create(&NewBook::new("Go", "A")).await.unwrap();
    assert_eq!(id, 1);

    let (worker, handle) = start_worker(Arc::clone(&repository), Arc::clone(&queue)).await;
    let counter = worker.processed_counter();

    // 发布任务，消息体是图书ID的JSON编码
    queue
        .publish_message(JOB_QUEUE, &JobMessage::enrich_book(id))
        .await
        .unwrap();

    // Worker取任务、富化、写回、ack，计数0 -> 1
    wait_for_count(&counter, 1).await;
    let book = repository.get(id).await.unwrap();
    assert_eq!(book.title, "Updated Go");
    assert_eq!(book.author, "A");

    // 同一任务再次发布（模拟重投）：必须成功且不叠加前缀
    queue
        .publish_message(JOB_QUEUE, &JobMessage::enrich_book(id))
        .await
        .unwrap();
    wait_for_count(&counter, 2).await;

    let book = repository.get(id).await.unwrap();
    assert_eq!(book.title, "Updated Go");

    worker.stop();
    let _ = handle.await;
    repository.close().await;
}

#[tokio::test]
async fn test_end_to_end_poison_message_is_dropped() {
    let repository = Arc::new(
        SqliteBookRepository::new_embedded("sqlite::memory:")
            .await
            .unwrap(),
    );
    let queue = Arc::new(InMemoryMessageQueue::new());

    let (worker, handle) = start_worker(Arc::clone(&repository), Arc::clone(&queue)).await;
    let counter = worker.processed_counter();

    // 消息体不是合法的图书ID JSON
    let poison = JobMessage::from_payload("poison-1".to_string(), b"oops".to_vec(), false);
    queue.publish_message(JOB_QUEUE, &poison).await.unwrap();

    // 等待消息被取走并决定：毒消息ack丢弃，不会再出现在队列里
    for _ in 0..250 {
        if queue.get_queue_size(JOB_QUEUE).await.unwrap() == 0
            && queue.in_flight_count().await == 0
        {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(queue.get_queue_size(JOB_QUEUE).await.unwrap(), 0);
    assert_eq!(queue.in_flight_count().await, 0);
    // 毒消息不计入处理数
    assert_eq!(counter.get(), 0);

    // 后续正常任务不受影响
    let id = repository.create(&NewBook::new("Go", "A")).await.unwrap();
    queue
        .publish_message(JOB_QUEUE, &JobMessage::enrich_book(id))
        .await
        .unwrap();
    wait_for_count(&counter, 1).await;
    assert_eq!(repository.get(id).await.unwrap().title, "Updated Go");

    worker.stop();
    let _ = handle.await;
}

#[tokio::test]
async fn test_worker_stops_accepting_after_shutdown() {
    let repository = Arc::new(
        SqliteBookRepository::new_embedded("sqlite::memory:")
            .await
            .unwrap(),
    );
    let queue = Arc::new(InMemoryMessageQueue::new());

    let id = repository.create(&NewBook::new("Go", "A")).await.unwrap();

    let (worker, handle) = start_worker(Arc::clone(&repository), Arc::clone(&queue)).await;
    worker.stop();
    handle.await.unwrap();

    // 关闭后发布的任务留在队列里等下一个Worker
    queue
        .publish_message(JOB_QUEUE, &JobMessage::enrich_book(id))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(queue.get_queue_size(JOB_QUEUE).await.unwrap(), 1);
    assert_eq!(worker.processed_counter().get(), 0);
}
