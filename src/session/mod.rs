pub mod backend;
pub mod cookie_jar;
pub mod file_storage;
pub mod memory_storage;
pub mod store;

// Re-export the primary session items so code outside can do
// "use crate::session::{SessionStore, SessionField};"
pub use backend::{create_storage, StorageBackend, StorageError};
pub use cookie_jar::CookieJar;
pub use store::{Session, SessionField, SessionStore};
