pub mod sqlite_book_repository;

pub use sqlite_book_repository::SqliteBookRepository;
