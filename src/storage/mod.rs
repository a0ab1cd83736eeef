pub mod memory;
pub mod redis_backend;
pub mod trait_def;

pub use memory::MemoryStorage;
pub use redis_backend::RedisStorage;
pub use trait_def::{Storage, StorageConnection, StorageError, StorageResult};
