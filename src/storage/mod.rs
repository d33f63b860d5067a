//! Storage module exports.

mod file;
mod memory;
mod models;
mod mongo;
mod store;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use models::{ChannelInfo, DEFAULT_CAPTION, Quality, UploadRecord, UserSession};
pub use mongo::MongoStore;
pub use store::{SessionStore, StoreError, StoreStats};
