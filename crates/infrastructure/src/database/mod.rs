pub mod manager;
pub mod postgres;
pub mod sqlite;

pub use manager::{create_book_repository, DatabasePool, DatabaseType};
pub use postgres::PostgresBookRepository;
pub use sqlite::SqliteBookRepository;
