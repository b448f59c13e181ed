use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器驱动错误
    #[error("浏览器错误: {0}")]
    Driver(#[from] DriverError),
    /// 提交流程错误
    #[error("提交错误: {0}")]
    Submit(#[from] SubmitError),
    /// 登录会话错误
    #[error("会话错误: {0}")]
    Session(#[from] SessionError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
}

/// UI 驱动错误
///
/// 对应页面交互中的瞬时故障，提交流程会在重试预算内重试。
#[derive(Debug, Error)]
pub enum DriverError {
    /// 元素不存在
    #[error("NotFound: 未找到元素 {locator}")]
    NotFound { locator: String },
    /// 元素不可交互（隐藏、禁用或无法聚焦）
    #[error("NotInteractable: 元素不可交互 {locator}")]
    NotInteractable { locator: String },
    /// 点击被遮罩层拦截
    #[error("ClickIntercepted: 点击 {locator} 被 {by} 拦截")]
    ClickIntercepted { locator: String, by: String },
    /// 注入脚本执行失败
    #[error("Script: 脚本执行失败: {0}")]
    Script(String),
    /// 浏览器协议错误
    #[error("Protocol: {0}")]
    Protocol(String),
    /// 本地 IO 错误
    #[error("Io: {0}")]
    Io(#[from] std::io::Error),
}

impl DriverError {
    /// 是否属于"可以换一种方式再试"的交互错误
    pub fn is_interaction_rejected(&self) -> bool {
        matches!(
            self,
            DriverError::NotInteractable { .. } | DriverError::ClickIntercepted { .. }
        )
    }
}

impl From<chromiumoxide::error::CdpError> for DriverError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        DriverError::Protocol(err.to_string())
    }
}

impl From<serde_json::Error> for DriverError {
    fn from(err: serde_json::Error) -> Self {
        DriverError::Script(err.to_string())
    }
}

/// 单次提交尝试中的错误
#[derive(Debug, Error)]
pub enum SubmitError {
    /// 在限定时间内没有找到可见的输入框
    #[error("NoVisibleInput: {waited_secs:.1}s 内未找到可见的输入框")]
    NoVisibleInput { waited_secs: f64 },
    /// 在限定时间内没有找到提交按钮
    #[error("SubmitControlNotFound: {waited_secs:.1}s 内未找到提交按钮")]
    SubmitControlNotFound { waited_secs: f64 },
    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// 登录会话错误，对整个运行是致命的
#[derive(Debug, Error)]
pub enum SessionError {
    /// 登录在限定时间内没有完成
    #[error("LoginTimeout: {waited_secs:.0}s 内未返回目标站点 (当前地址: {last_url})")]
    LoginTimeout { waited_secs: f64, last_url: String },
    /// 登录流程中的某一步失败
    #[error("登录步骤 '{step}' 失败: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: DriverError,
    },
    /// 已登录地址的匹配规则无效
    #[error("无效的地址匹配规则 '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// 配置错误，在触碰浏览器之前就会终止程序
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 必需的密钥环境变量不存在
    #[error("环境变量 {var_name} 不存在 (必需的登录密钥)")]
    MissingSecret { var_name: String },
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置值不合法
    #[error("配置项 {field} 不合法: {reason}")]
    Invalid { field: String, reason: String },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// CSV 解析失败
    #[error("CSV解析失败 ({path}): {source}")]
    CsvParseFailed {
        path: String,
        #[source]
        source: csv::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 便捷构造函数 ==========

impl DriverError {
    pub fn not_found(locator: impl ToString) -> Self {
        DriverError::NotFound {
            locator: locator.to_string(),
        }
    }

    pub fn not_interactable(locator: impl ToString) -> Self {
        DriverError::NotInteractable {
            locator: locator.to_string(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

/// 驱动操作结果类型
pub type DriverResult<T> = Result<T, DriverError>;
