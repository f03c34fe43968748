//! 基础设施层
//!
//! 持有稀缺资源（存储文件、浏览器、时钟），只暴露能力

pub mod clock;
pub mod json_file_store;
pub mod kv_store;
pub mod tab_opener;

pub use clock::{Clock, ManualClock, SystemClock};
pub use json_file_store::JsonFileStore;
pub use kv_store::{KvStore, MemoryStore};
pub use tab_opener::{ChromeTabOpener, DryRunTabOpener, ScriptedTabOpener, TabOpener};
