//! Mock implementations for the repository and messaging traits
//!
//! This module provides in-memory mock implementations that can be used
//! for unit testing without requiring actual database connections or
//! external services.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bookshelf_domain::entities::{Book, JobMessage, NewBook};
use bookshelf_domain::messaging::MessageQueue;
use bookshelf_domain::repositories::BookRepository;
use bookshelf_errors::{BookshelfError, BookshelfResult};

/// Mock implementation of BookRepository for testing
#[derive(Debug, Clone)]
pub struct MockBookRepository {
    books: Arc<Mutex<HashMap<i64, Book>>>,
    next_id: Arc<Mutex<i64>>,
    unavailable: Arc<AtomicBool>,
    get_calls: Arc<AtomicU64>,
    update_calls: Arc<AtomicU64>,
}

impl Default for MockBookRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBookRepository {
    pub fn new() -> Self {
        Self {
            books: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(Mutex::new(1)),
            unavailable: Arc::new(AtomicBool::new(false)),
            get_calls: Arc::new(AtomicU64::new(0)),
            update_calls: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_books(books: Vec<Book>) -> Self {
        let mut book_map = HashMap::new();
        let mut max_id = 0;

        for book in books {
            if book.id > max_id {
                max_id = book.id;
            }
            book_map.insert(book.id, book);
        }

        Self {
            books: Arc::new(Mutex::new(book_map)),
            next_id: Arc::new(Mutex::new(max_id + 1)),
            unavailable: Arc::new(AtomicBool::new(false)),
            get_calls: Arc::new(AtomicU64::new(0)),
            update_calls: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Simulate the backing store being unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn get_call_count(&self) -> u64 {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn update_call_count(&self) -> u64 {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn count(&self) -> usize {
        self.books.lock().unwrap().len()
    }

    fn check_available(&self) -> BookshelfResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BookshelfError::DatabaseOperation(
                "mock: store unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl BookRepository for MockBookRepository {
    async fn list(&self) -> BookshelfResult<Vec<Book>> {
        self.check_available()?;
        let mut books: Vec<Book> = self.books.lock().unwrap().values().cloned().collect();
        books.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(books)
    }

    async fn get(&self, id: i64) -> BookshelfResult<Book> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        self.books
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(BookshelfError::BookNotFound { id })
    }

    async fn create(&self, book: &NewBook) -> BookshelfResult<i64> {
        self.check_available()?;
        let mut next_id = self.next_id.lock().unwrap();
        let id = *next_id;
        *next_id += 1;
        self.books.lock().unwrap().insert(
            id,
            Book {
                id,
                title: book.title.clone(),
                author: book.author.clone(),
                cover_url: None,
            },
        );
        Ok(id)
    }

    async fn update(&self, book: &Book) -> BookshelfResult<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if book.id == 0 {
            return Err(BookshelfError::InvalidBookId { id: book.id });
        }
        self.check_available()?;
        let mut books = self.books.lock().unwrap();
        if !books.contains_key(&book.id) {
            return Err(BookshelfError::BookNotFound { id: book.id });
        }
        books.insert(book.id, book.clone());
        Ok(())
    }

    async fn delete(&self, id: i64) -> BookshelfResult<()> {
        if id == 0 {
            return Err(BookshelfError::InvalidBookId { id });
        }
        self.check_available()?;
        self.books.lock().unwrap().remove(&id);
        Ok(())
    }

    async fn close(&self) {}
}

/// Mock implementation of MessageQueue recording every ack/nack decision
#[derive(Debug, Clone, Default)]
pub struct MockMessageQueue {
    queues: Arc<Mutex<HashMap<String, Vec<JobMessage>>>>,
    acked: Arc<Mutex<Vec<String>>>,
    nacked: Arc<Mutex<Vec<(String, bool)>>>,
}

impl MockMessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_acked_messages(&self) -> Vec<String> {
        self.acked.lock().unwrap().clone()
    }

    pub fn get_nacked_messages(&self) -> Vec<(String, bool)> {
        self.nacked.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageQueue for MockMessageQueue {
    async fn publish_message(&self, queue: &str, message: &JobMessage) -> BookshelfResult<()> {
        self.queues
            .lock()
            .unwrap()
            .entry(queue.to_string())
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn consume_messages(&self, queue: &str) -> BookshelfResult<Vec<JobMessage>> {
        Ok(self
            .queues
            .lock()
            .unwrap()
            .get_mut(queue)
            .map(std::mem::take)
            .unwrap_or_default())
    }

    async fn ack_message(&self, message_id: &str) -> BookshelfResult<()> {
        self.acked.lock().unwrap().push(message_id.to_string());
        Ok(())
    }

    async fn nack_message(&self, message_id: &str, requeue: bool) -> BookshelfResult<()> {
        self.nacked
            .lock()
            .unwrap()
            .push((message_id.to_string(), requeue));
        Ok(())
    }

    async fn create_queue(&self, queue: &str, _durable: bool) -> BookshelfResult<()> {
        self.queues
            .lock()
            .unwrap()
            .entry(queue.to_string())
            .or_default();
        Ok(())
    }

    async fn delete_queue(&self, queue: &str) -> BookshelfResult<()> {
        self.queues.lock().unwrap().remove(queue);
        Ok(())
    }

    async fn get_queue_size(&self, queue: &str) -> BookshelfResult<u32> {
        Ok(self
            .queues
            .lock()
            .unwrap()
            .get(queue)
            .map(|q| q.len() as u32)
            .unwrap_or(0))
    }

    async fn purge_queue(&self, queue: &str) -> BookshelfResult<()> {
        if let Some(q) = self.queues.lock().unwrap().get_mut(queue) {
            q.clear();
        }
        Ok(())
    }
}
