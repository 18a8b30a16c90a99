pub mod postgres_book_repository;

pub use postgres_book_repository::PostgresBookRepository;
