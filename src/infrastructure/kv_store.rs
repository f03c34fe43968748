//! 键值存储 - 基础设施层
//!
//! 持有持久化资源，只暴露 get / set / remove 能力。
//! 不认识 UsageState，也不做任何业务判断。

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::sync::Mutex;

use crate::error::StoreError;

/// 异步键值存储
///
/// 没有事务，也不提供加锁原语；读-改-写由调用方自行保证串行。
#[async_trait]
pub trait KvStore: Send + Sync {
    /// 读取键；不存在时返回 `None`
    async fn get(&self, key: &str) -> Result<Option<JsonValue>, StoreError>;

    /// 写入键（整体覆盖）
    async fn set(&self, key: &str, value: JsonValue) -> Result<(), StoreError>;

    /// 删除键；键不存在不算错误
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// 进程内存储
///
/// 用于 dry-run 和测试，可以分别开关读 / 写故障。
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, JsonValue>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 之后的读取全部失败
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// 之后的写入 / 删除全部失败
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<JsonValue>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("读取 {} 被拒绝", key)));
        }
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: JsonValue) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("写入 {} 被拒绝", key)));
        }
        self.entries.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("删除 {} 被拒绝", key)));
        }
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
