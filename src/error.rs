use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 持久化存储错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 输入（文件 / 网页）错误
    #[error("输入错误: {0}")]
    Input(#[from] InputError),
}

/// 持久化存储错误
///
/// 存储失败从不直接抛给调用方：读取失败按"无历史状态"处理，
/// 写入失败只记录日志，由调用方使用内存中计算出的值继续。
#[derive(Debug, Error)]
pub enum StoreError {
    /// 读取失败
    #[error("读取 {key} 失败: {source}")]
    ReadFailed {
        key: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入失败
    #[error("写入 {key} 失败: {source}")]
    WriteFailed {
        key: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 删除失败
    #[error("删除 {key} 失败: {source}")]
    DeleteFailed {
        key: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 存储内容无法解析
    #[error("存储内容解析失败 ({path}): {source}")]
    Corrupted {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// 模拟故障（测试用）
    #[error("存储不可用: {0}")]
    Unavailable(String),
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {source}")]
    ConnectionFailed {
        port: u16,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 启动无头浏览器失败
    #[error("启动无头浏览器失败: {0}")]
    LaunchFailed(String),
    /// 打开标签页失败
    #[error("打开标签页 {url} 失败: {source}")]
    OpenTabFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 打开标签页超时
    #[error("打开标签页 {url} 超时 ({timeout_ms}ms)")]
    OpenTabTimeout { url: String, timeout_ms: u64 },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件读取失败
    #[error("读取配置文件 {path} 失败: {source}")]
    FileReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 配置文件解析失败
    #[error("解析配置文件 {path} 失败: {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 输入错误（候选链接来源）
#[derive(Debug, Error)]
pub enum InputError {
    /// 不支持的文件类型
    #[error("不支持的文件类型: {path} (仅支持 .txt / .csv)")]
    UnsupportedFileType { path: String },
    /// 读取文件失败
    #[error("读取文件 {path} 失败: {source}")]
    FileReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 网页地址无效
    #[error("无效的网页地址 {url}: {source}")]
    InvalidPageUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    /// 抓取网页失败
    #[error("抓取网页 {url} 失败: {source}")]
    PageFetchFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

// ========== 便捷构造函数 ==========

impl StoreError {
    /// 创建读取失败错误
    pub fn read_failed(
        key: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        StoreError::ReadFailed {
            key: key.into(),
            source: Box::new(source),
        }
    }

    /// 创建写入失败错误
    pub fn write_failed(
        key: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        StoreError::WriteFailed {
            key: key.into(),
            source: Box::new(source),
        }
    }

    /// 创建删除失败错误
    pub fn delete_failed(
        key: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        StoreError::DeleteFailed {
            key: key.into(),
            source: Box::new(source),
        }
    }
}

impl BrowserError {
    /// 创建浏览器连接错误
    pub fn connection_failed(
        port: u16,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        BrowserError::ConnectionFailed {
            port,
            source: Box::new(source),
        }
    }

    /// 创建打开标签页错误
    pub fn open_tab_failed(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        BrowserError::OpenTabFailed {
            url: url.into(),
            source: Box::new(source),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
