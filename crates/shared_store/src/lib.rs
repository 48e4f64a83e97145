//! # Shared Store
//!
//! 共享存储实现。
//!
//! 负责：
//! - `DirectoryStore`: 挂载卷 / 主机目录，原子写入
//! - `MemoryStore`: 进程内存储，支持故障注入（测试与模拟 worker）

pub mod directory;
pub mod memory;

pub use contracts::{SharedStore, StoreError, StoreKey};
pub use directory::DirectoryStore;
pub use memory::{MemoryStore, MemoryStoreConfig};
