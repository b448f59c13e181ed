use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppError, ConfigError, FileError};
use crate::infrastructure::Locator;

/// 指向配置文件的环境变量
pub const CONFIG_PATH_ENV: &str = "PROMPT_QUEUE_CONFIG";

/// 随机抖动区间（秒）
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct JitterRange {
    pub min: f64,
    pub max: f64,
}

/// 程序配置
///
/// 所有路径如果是相对路径，都相对于 `base_path` 解析。
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 工作目录
    pub base_path: PathBuf,
    /// 作品队列 CSV
    pub csv_path: PathBuf,
    /// 游标文件
    pub progress_path: PathBuf,
    /// 运行台账 CSV
    pub log_path: PathBuf,
    /// 失败截图和页面源码的存放目录
    pub artifact_dir: PathBuf,
    /// 两次成功提交之间的基础间隔
    pub base_interval_sec: f64,
    /// 在基础间隔上追加的随机抖动
    pub jitter_range: JitterRange,
    /// 单个作品的最大尝试次数
    pub max_retries: u32,
    /// 等待提交按钮空闲的上限
    pub idle_timeout_sec: f64,
    /// 等待人工处理验证码的上限
    pub challenge_timeout_sec: f64,
    /// 等待输入框、按钮出现的上限
    pub element_timeout_sec: f64,
    /// 等待登录完成的上限
    pub login_timeout_sec: f64,
    /// 清理弹窗的最大轮数
    pub dismiss_passes: usize,
    /// 提交前随机滚动页面的概率
    pub scroll_probability: f64,
    /// 台账中 message 字段的最大字符数
    pub message_max_len: usize,
    // --- 目标站点 ---
    pub landing_url: String,
    pub home_url: String,
    /// 已登录状态下地址的匹配规则（正则）
    pub authenticated_url_pattern: String,
    /// 登录完成后页面主机名应属于的域名（含子域名，不区分大小写）
    pub target_domain_marker: String,
    // --- 浏览器 ---
    /// 设置后连接已有浏览器的调试端口，否则自行启动
    pub browser_debug_port: Option<u16>,
    pub chrome_profile_dir: Option<PathBuf>,
    pub chrome_executable: Option<PathBuf>,
    pub selectors: Selectors,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("."),
            csv_path: PathBuf::from("tracks_seed.csv"),
            progress_path: PathBuf::from("progress.txt"),
            log_path: PathBuf::from("run_log.csv"),
            artifact_dir: PathBuf::from("artifacts"),
            base_interval_sec: 30.0,
            jitter_range: JitterRange { min: 0.0, max: 15.0 },
            max_retries: 3,
            idle_timeout_sec: 25.0,
            challenge_timeout_sec: 120.0,
            element_timeout_sec: 12.0,
            login_timeout_sec: 60.0,
            dismiss_passes: 3,
            scroll_probability: 0.35,
            message_max_len: 500,
            landing_url: "https://suno.com/create".to_string(),
            home_url: "https://suno.com/".to_string(),
            authenticated_url_pattern: r"(?i)suno\.com/create".to_string(),
            target_domain_marker: "suno.com".to_string(),
            browser_debug_port: None,
            chrome_profile_dir: Some(PathBuf::from("chrome_profile")),
            chrome_executable: None,
            selectors: Selectors::default(),
        }
    }
}

impl Config {
    /// 加载配置：可选的 TOML 文件 → 环境变量覆盖 → 校验
    pub fn load() -> Result<Self, AppError> {
        let config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_toml_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        let config = config.with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, FileError> {
        let content = std::fs::read_to_string(path).map_err(|source| FileError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| FileError::TomlParseFailed {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(v) = std::env::var("BASE_PATH") {
            self.base_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("CSV_PATH") {
            self.csv_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("PROGRESS_PATH") {
            self.progress_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("RUN_LOG_PATH") {
            self.log_path = PathBuf::from(v);
        }
        if let Some(v) = parse_env::<f64>("BASE_INTERVAL_SEC")? {
            self.base_interval_sec = v;
        }
        if let Some(v) = parse_env::<u32>("MAX_RETRIES")? {
            self.max_retries = v;
        }
        if let Some(v) = parse_env::<u16>("BROWSER_DEBUG_PORT")? {
            self.browser_debug_port = Some(v);
        }
        if let Ok(v) = std::env::var("CHROME_PROFILE_DIR") {
            self.chrome_profile_dir = Some(PathBuf::from(v));
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retries == 0 {
            return Err(invalid("max_retries", "至少为 1"));
        }
        let seconds = [
            ("base_interval_sec", self.base_interval_sec),
            ("jitter_range.min", self.jitter_range.min),
            ("jitter_range.max", self.jitter_range.max),
            ("idle_timeout_sec", self.idle_timeout_sec),
            ("challenge_timeout_sec", self.challenge_timeout_sec),
            ("element_timeout_sec", self.element_timeout_sec),
            ("login_timeout_sec", self.login_timeout_sec),
        ];
        for (field, value) in seconds {
            if !is_valid_seconds(value) {
                return Err(invalid(field, "需要是非负的有限秒数"));
            }
        }
        if self.jitter_range.min > self.jitter_range.max {
            return Err(invalid("jitter_range", "需要 0 <= min <= max"));
        }
        if !(0.0..=1.0).contains(&self.scroll_probability) {
            return Err(invalid("scroll_probability", "需要在 [0, 1] 之间"));
        }
        if self.dismiss_passes == 0 {
            return Err(invalid("dismiss_passes", "至少为 1"));
        }
        Ok(())
    }

    /// 相对路径按 `base_path` 解析，绝对路径原样返回
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.base_path.join(path)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.idle_timeout_sec)
    }

    pub fn challenge_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.challenge_timeout_sec)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.element_timeout_sec)
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.login_timeout_sec)
    }
}

fn parse_env<T: std::str::FromStr>(var_name: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: std::any::type_name::<T>().to_string(),
            }),
        Err(_) => Ok(None),
    }
}

/// 能安全转换成 `Duration` 的秒数
fn is_valid_seconds(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// 页面元素定位器
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Selectors {
    // --- 弹窗 ---
    pub not_now: Locator,
    pub close_button: Locator,
    pub frames: Locator,
    // --- 生成页 ---
    pub prompt_input: Locator,
    pub submit_button: Locator,
    // --- 登录 ---
    pub sign_in: Locator,
    pub sign_in_modal: Locator,
    pub federated_provider: Locator,
    pub email_input: Locator,
    pub password_input: Locator,
    pub login_submit: Locator,
    pub authorize: Locator,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            not_now: Locator::xpath(
                "//button[.//span[normalize-space()='Not now'] or normalize-space()='Not now']",
            ),
            close_button: Locator::css("button[aria-label='Close']"),
            frames: Locator::css("iframe"),
            prompt_input: Locator::css("textarea"),
            submit_button: Locator::css("button[aria-label='Create song']"),
            sign_in: Locator::xpath(
                "//span[normalize-space()='Sign In' or normalize-space()='Sign in']/ancestor::button[1]",
            ),
            sign_in_modal: Locator::css("div.cl-modalBackdrop, div[class*='cl-modalBackdrop']"),
            federated_provider: Locator::xpath(
                "//button[contains(@class,'cl-socialButtonsIconButton__discord') or .//img[contains(@alt,'Discord')]]",
            ),
            email_input: Locator::css("[name='email']"),
            password_input: Locator::css("[name='password']"),
            login_submit: Locator::xpath(
                "//button[@type='submit' and (contains(.,'로그인') or contains(.,'Log In') or contains(.,'Login'))]",
            ),
            authorize: Locator::xpath(
                "//button[(@type='button' or @type='submit') and (contains(.,'승인') or contains(.,'Authorize'))]",
            ),
        }
    }
}

/// 登录凭据，只从环境变量读取
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub const EMAIL_ENV: &'static str = "LOGIN_EMAIL";
    pub const PASSWORD_ENV: &'static str = "LOGIN_PASSWORD";

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let password = lookup(Self::PASSWORD_ENV)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingSecret {
                var_name: Self::PASSWORD_ENV.to_string(),
            })?;
        let email = lookup(Self::EMAIL_ENV).unwrap_or_default();
        Ok(Self { email, password })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}
