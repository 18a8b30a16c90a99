use bookshelf_domain::entities::JobMessage;
use bookshelf_domain::messaging::MessageQueue;
use bookshelf_infrastructure::InMemoryMessageQueue;

#[tokio::test]
async fn test_publish_and_consume() {
    let mq = InMemoryMessageQueue::new();
    let queue_name = "test_queue";

    let message = JobMessage::enrich_book(42);
    mq.publish_message(queue_name, &message).await.unwrap();

    let consumed = mq.consume_messages(queue_name).await.unwrap();
    assert_eq!(consumed.len(), 1);
    assert_eq!(consumed[0].id, message.id);
    assert_eq!(consumed[0].book_id().unwrap(), 42);
    assert!(!consumed[0].redelivered);
}

#[tokio::test]
async fn test_consume_unknown_queue_returns_empty() {
    let mq = InMemoryMessageQueue::new();
    let consumed = mq.consume_messages("nowhere").await.unwrap();
    assert!(consumed.is_empty());
}

#[tokio::test]
async fn test_consumed_message_is_in_flight_until_decided() {
    let mq = InMemoryMessageQueue::new();
    let message = JobMessage::enrich_book(1);
    mq.publish_message("q", &message).await.unwrap();

    let consumed = mq.consume_messages("q").await.unwrap();
    assert_eq!(consumed.len(), 1);
    assert_eq!(mq.in_flight_count().await, 1);
    // 决定之前不会再次投递
    assert!(mq.consume_messages("q").await.unwrap().is_empty());

    mq.ack_message(&message.id).await.unwrap();
    assert_eq!(mq.in_flight_count().await, 0);
    // ack后消息彻底消失
    assert!(mq.consume_messages("q").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_nack_with_requeue_redelivers() {
    let mq = InMemoryMessageQueue::new();
    let message = JobMessage::enrich_book(7);
    mq.publish_message("q", &message).await.unwrap();

    let consumed = mq.consume_messages("q").await.unwrap();
    mq.nack_message(&consumed[0].id, true).await.unwrap();

    let redelivered = mq.consume_messages("q").await.unwrap();
    assert_eq!(redelivered.len(), 1);
    assert_eq!(redelivered[0].id, message.id);
    assert!(redelivered[0].redelivered);
}

#[tokio::test]
async fn test_nack_without_requeue_drops() {
    let mq = InMemoryMessageQueue::new();
    let message = JobMessage::enrich_book(7);
    mq.publish_message("q", &message).await.unwrap();

    let consumed = mq.consume_messages("q").await.unwrap();
    mq.nack_message(&consumed[0].id, false).await.unwrap();

    assert!(mq.consume_messages("q").await.unwrap().is_empty());
    assert_eq!(mq.in_flight_count().await, 0);
}

#[tokio::test]
async fn test_ack_unknown_message_is_harmless() {
    let mq = InMemoryMessageQueue::new();
    mq.ack_message("no-such-message").await.unwrap();
    mq.nack_message("no-such-message", true).await.unwrap();
}

#[tokio::test]
async fn test_queue_size_and_purge() {
    let mq = InMemoryMessageQueue::new();
    mq.create_queue("q", true).await.unwrap();
    assert_eq!(mq.get_queue_size("q").await.unwrap(), 0);

    for book_id in 1..=5 {
        mq.publish_message("q", &JobMessage::enrich_book(book_id))
            .await
            .unwrap();
    }
    assert_eq!(mq.get_queue_size("q").await.unwrap(), 5);

    mq.purge_queue("q").await.unwrap();
    assert_eq!(mq.get_queue_size("q").await.unwrap(), 0);
}

#[tokio::test]
async fn test_create_queue_is_idempotent() {
    let mq = InMemoryMessageQueue::new();
    mq.create_queue("q", true).await.unwrap();
    mq.publish_message("q", &JobMessage::enrich_book(1))
        .await
        .unwrap();

    // 再次声明不清空已有消息
    mq.create_queue("q", true).await.unwrap();
    assert_eq!(mq.get_queue_size("q").await.unwrap(), 1);
}

#[tokio::test]
async fn test_delete_queue() {
    let mq = InMemoryMessageQueue::new();
    mq.publish_message("q", &JobMessage::enrich_book(1))
        .await
        .unwrap();
    mq.delete_queue("q").await.unwrap();
    assert_eq!(mq.get_queue_size("q").await.unwrap(), 0);
}
