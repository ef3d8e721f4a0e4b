pub mod memory;
pub mod milvus;

pub use memory::MemoryStore;
pub use milvus::{MilvusClient, MilvusStore};
