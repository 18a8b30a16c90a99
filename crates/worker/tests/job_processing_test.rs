use std::sync::Arc;

use bookshelf_domain::entities::JobMessage;
use bookshelf_domain::repositories::BookRepository;
use bookshelf_testing_utils::{BookBuilder, MockBookRepository, MockMessageQueue};
use bookshelf_worker::{JobOutcome, WorkerService};

fn service_with(
    repository: &MockBookRepository,
    queue: &MockMessageQueue,
) -> Arc<WorkerService> {
    Arc::new(
        WorkerService::builder(
            Arc::new(repository.clone()),
            Arc::new(queue.clone()),
            "book-jobs".to_string(),
        )
        .worker_id("test-worker")
        .max_concurrent_jobs(4)
        .poll_interval_ms(10)
        .build(),
    )
}

#[tokio::test]
async fn test_successful_job_is_acked_and_counted() {
    let repository = MockBookRepository::with_books(vec![BookBuilder::new()
        .with_id(1)
        .with_title("Go")
        .with_author("A")
        .build()]);
    let queue = MockMessageQueue::new();
    let service = service_with(&repository, &queue);

    let message = JobMessage::enrich_book(1);
    let outcome = service.process_message(&message).await;

    assert_eq!(outcome, JobOutcome::Completed);
    assert_eq!(queue.get_acked_messages(), vec![message.id.clone()]);
    assert!(queue.get_nacked_messages().is_empty());
    assert_eq!(service.processed_counter().get(), 1);

    let book = repository.get(1).await.unwrap();
    assert_eq!(book.title, "Updated Go");
}

#[tokio::test]
async fn test_poison_message_is_acked_never_requeued() {
    let repository = MockBookRepository::new();
    let queue = MockMessageQueue::new();
    let service = service_with(&repository, &queue);

    let message = JobMessage::from_payload(
        "poison-1".to_string(),
        b"\"not-a-book-id\"".to_vec(),
        false,
    );
    let outcome = service.process_message(&message).await;

    // 毒消息必须ack丢弃，绝不能nack进入重投循环
    assert_eq!(outcome, JobOutcome::Poisoned);
    assert_eq!(queue.get_acked_messages(), vec!["poison-1".to_string()]);
    assert!(queue.get_nacked_messages().is_empty());
    // 不计入处理数，也不触达存储
    assert_eq!(service.processed_counter().get(), 0);
    assert_eq!(repository.get_call_count(), 0);
}

#[tokio::test]
async fn test_missing_book_is_nacked_for_redelivery() {
    let repository = MockBookRepository::new();
    let queue = MockMessageQueue::new();
    let service = service_with(&repository, &queue);

    let message = JobMessage::enrich_book(999);
    let outcome = service.process_message(&message).await;

    assert_eq!(outcome, JobOutcome::Rejected);
    assert!(queue.get_acked_messages().is_empty());
    assert_eq!(
        queue.get_nacked_messages(),
        vec![(message.id.clone(), true)]
    );
    assert_eq!(service.processed_counter().get(), 0);
}

#[tokio::test]
async fn test_store_unavailable_is_nacked_for_redelivery() {
    let repository = MockBookRepository::with_books(vec![BookBuilder::new().with_id(1).build()]);
    repository.set_unavailable(true);
    let queue = MockMessageQueue::new();
    let service = service_with(&repository, &queue);

    let message = JobMessage::enrich_book(1);
    let outcome = service.process_message(&message).await;

    assert_eq!(outcome, JobOutcome::Rejected);
    assert_eq!(
        queue.get_nacked_messages(),
        vec![(message.id.clone(), true)]
    );
    assert_eq!(service.processed_counter().get(), 0);
}

#[tokio::test]
async fn test_redelivered_job_does_not_double_enrich() {
    let repository = MockBookRepository::with_books(vec![BookBuilder::new()
        .with_id(1)
        .with_title("Go")
        .build()]);
    let queue = MockMessageQueue::new();
    let service = service_with(&repository, &queue);

    // 同一任务被投递两次（at-least-once）
    let first = JobMessage::enrich_book(1);
    let mut second = JobMessage::enrich_book(1);
    second.redelivered = true;

    assert_eq!(service.process_message(&first).await, JobOutcome::Completed);
    assert_eq!(service.process_message(&second).await, JobOutcome::Completed);

    // 标题只前缀一次，第二次处理不再写回
    let book = repository.get(1).await.unwrap();
    assert_eq!(book.title, "Updated Go");
    assert_eq!(repository.update_call_count(), 1);

    // 两次投递都成功ack并计数
    assert_eq!(queue.get_acked_messages().len(), 2);
    assert_eq!(service.processed_counter().get(), 2);
}

#[tokio::test]
async fn test_zero_id_is_rejected_before_store_access() {
    use bookshelf_errors::BookshelfError;

    let repository = MockBookRepository::new();
    // 存储完全不可用时零ID依然返回InvalidBookId，
    // 证明守卫在触达存储之前生效
    repository.set_unavailable(true);

    let unassigned = BookBuilder::new().with_id(0).build();
    let err = repository.update(&unassigned).await.unwrap_err();
    assert!(matches!(err, BookshelfError::InvalidBookId { id: 0 }));

    let err = repository.delete(0).await.unwrap_err();
    assert!(matches!(err, BookshelfError::InvalidBookId { id: 0 }));
}

#[tokio::test]
async fn test_counter_is_exact_under_concurrent_jobs() {
    let books = (1..=50)
        .map(|id| {
            BookBuilder::new()
                .with_id(id)
                .with_title(format!("Book {id}"))
                .build()
        })
        .collect();
    let repository = MockBookRepository::with_books(books);
    let queue = MockMessageQueue::new();
    let service = service_with(&repository, &queue);

    let mut handles = Vec::new();
    for id in 1..=50 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service.process_message(&JobMessage::enrich_book(id)).await
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap(), JobOutcome::Completed);
    }

    // N个并发成功ack后计数恰好等于N
    assert_eq!(service.processed_counter().get(), 50);
}

#[tokio::test]
async fn test_poll_once_dispatches_consumed_messages() {
    use bookshelf_domain::messaging::MessageQueue;

    let repository = MockBookRepository::with_books(vec![
        BookBuilder::new().with_id(1).with_title("Go").build(),
        BookBuilder::new().with_id(2).with_title("Rust").build(),
    ]);
    let queue = MockMessageQueue::new();
    let service = service_with(&repository, &queue);

    queue
        .publish_message("book-jobs", &JobMessage::enrich_book(1))
        .await
        .unwrap();
    queue
        .publish_message("book-jobs", &JobMessage::enrich_book(2))
        .await
        .unwrap();

    let dispatched = service.poll_once().await.unwrap();
    assert_eq!(dispatched, 2);

    // 任务在后台处理，轮询等计数收敛
    for _ in 0..100 {
        if service.processed_counter().get() == 2 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(service.processed_counter().get(), 2);
    assert_eq!(repository.get(1).await.unwrap().title, "Updated Go");
    assert_eq!(repository.get(2).await.unwrap().title, "Updated Rust");
}
