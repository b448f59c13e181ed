//! 登录会话 - 业务能力层
//!
//! 先检查浏览器资料目录里的会话是否仍然有效；无效时走一遍第三方账号登录。
//! 登录只在运行开始时执行一次，之后的提交共用同一个驱动。

use std::time::Duration;

use regex::Regex;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{Config, Credentials, Selectors};
use crate::error::{DriverError, SessionError};
use crate::infrastructure::{Key, Locator, UiDriver};
use crate::services::interaction::{click_when_ready, scroll_into_view, wait_for_present};
use crate::utils::{pause_between, poll_until, PollSpec};

/// 登录流程中每一步的等待上限
const LOGIN_STEP_TIMEOUT: Duration = Duration::from_secs(30);

const REDIRECT_POLL_INTERVAL: Duration = Duration::from_millis(500);
const REDIRECT_MAX_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// 已建立的会话
///
/// 借用驱动，保证会话存活期间驱动不会被替换。
#[derive(Debug)]
pub struct SessionHandle<'d, D: ?Sized> {
    pub driver: &'d D,
    /// 是否复用了已有会话（没有执行登录）
    pub reused: bool,
    pub established_at: Instant,
}

/// 会话引导器
pub struct SessionBootstrapper {
    selectors: Selectors,
    landing_url: String,
    home_url: String,
    authenticated_url_pattern: String,
    target_domain_marker: String,
    element_timeout: Duration,
    login_timeout: Duration,
}

impl SessionBootstrapper {
    pub fn new(config: &Config) -> Self {
        Self {
            selectors: config.selectors.clone(),
            landing_url: config.landing_url.clone(),
            home_url: config.home_url.clone(),
            authenticated_url_pattern: config.authenticated_url_pattern.clone(),
            target_domain_marker: config.target_domain_marker.clone(),
            element_timeout: config.element_timeout(),
            login_timeout: config.login_timeout(),
        }
    }

    /// 建立会话
    ///
    /// 已登录时不做任何登录交互直接返回；否则执行完整登录。
    /// 任何一步失败都是致命错误。
    pub async fn establish<'d, D: UiDriver>(
        &self,
        driver: &'d D,
        credentials: &Credentials,
    ) -> Result<SessionHandle<'d, D>, SessionError> {
        let pattern = Regex::new(&self.authenticated_url_pattern).map_err(|source| {
            SessionError::InvalidPattern {
                pattern: self.authenticated_url_pattern.clone(),
                source,
            }
        })?;

        info!("🔐 检查登录状态...");
        driver
            .navigate(&self.landing_url)
            .await
            .map_err(step("打开生成页"))?;
        pause_between(0.8, 1.2).await;

        let url = driver.current_url().await.map_err(step("读取当前地址"))?;
        if pattern.is_match(&url) {
            info!("✓ 复用已有会话: {}", url);
            return Ok(SessionHandle {
                driver,
                reused: true,
                established_at: Instant::now(),
            });
        }

        info!("🔑 未登录 (当前地址: {})，开始登录...", url);
        self.login(driver, credentials).await?;
        self.wait_for_redirect(driver).await?;

        info!("✅ 登录完成");
        Ok(SessionHandle {
            driver,
            reused: false,
            established_at: Instant::now(),
        })
    }

    async fn login<D: UiDriver>(&self, driver: &D, credentials: &Credentials) -> Result<(), SessionError> {
        let s = &self.selectors;

        driver
            .navigate(&self.home_url)
            .await
            .map_err(step("打开首页"))?;

        click_when_ready(driver, &s.sign_in, LOGIN_STEP_TIMEOUT)
            .await
            .map_err(step("点击登录入口"))?;

        wait_for_present(driver, &s.sign_in_modal, LOGIN_STEP_TIMEOUT)
            .await
            .ok_or_else(|| DriverError::not_found(&s.sign_in_modal))
            .map_err(step("等待登录弹窗"))?;

        click_when_ready(driver, &s.federated_provider, LOGIN_STEP_TIMEOUT)
            .await
            .map_err(step("选择第三方账号"))?;
        pause_between(1.0, 2.0).await;

        // 第三方登录可能在新窗口中打开
        let windows = driver.window_handles().await.map_err(step("枚举窗口"))?;
        if windows.len() > 1 {
            if let Some(last) = windows.last() {
                debug!("切换到登录窗口: {}", last);
                driver
                    .switch_to_window(last)
                    .await
                    .map_err(step("切换登录窗口"))?;
            }
        }

        fill_field(driver, &s.email_input, &credentials.email)
            .await
            .map_err(step("输入邮箱"))?;
        pause_between(0.3, 0.7).await;
        fill_field(driver, &s.password_input, &credentials.password)
            .await
            .map_err(step("输入密码"))?;
        pause_between(0.3, 0.7).await;

        click_when_ready(driver, &s.login_submit, LOGIN_STEP_TIMEOUT)
            .await
            .map_err(step("提交登录"))?;

        // 授权页只在首次授权时出现
        if click_when_ready(driver, &s.authorize, self.element_timeout)
            .await
            .is_ok()
        {
            debug!("已点击授权按钮");
        }

        Ok(())
    }

    /// 等待跳转回目标站点
    ///
    /// 登录弹窗关闭后当前页面会失效，因此每次轮询都会在所有窗口中
    /// 找一个已经回到目标站点的页面并切换过去。
    async fn wait_for_redirect<D: UiDriver>(&self, driver: &D) -> Result<(), SessionError> {
        let spec = PollSpec::fixed(REDIRECT_POLL_INTERVAL, self.login_timeout)
            .with_backoff(1.5, REDIRECT_MAX_POLL_INTERVAL);
        let marker = self.target_domain_marker.as_str();

        let outcome = poll_until(&spec, move || async move {
            select_target_window(driver, marker).await
        })
        .await;

        match outcome.ready() {
            Some(url) => {
                debug!("已返回目标站点: {}", url);
                Ok(())
            }
            None => {
                let last_url = driver.current_url().await.unwrap_or_default();
                warn!("⚠️ 登录后 {}s 内未返回目标站点", self.login_timeout.as_secs());
                Err(SessionError::LoginTimeout {
                    waited_secs: self.login_timeout.as_secs_f64(),
                    last_url,
                })
            }
        }
    }
}

/// 当前页面或任一窗口已回到目标站点时返回其地址，必要时切换窗口
async fn select_target_window<D: UiDriver>(driver: &D, marker: &str) -> Option<String> {
    if let Ok(url) = driver.current_url().await {
        if is_on_target_domain(&url, marker) {
            return Some(url);
        }
    }

    let windows = driver.window_handles().await.ok()?;
    for handle in windows {
        if driver.switch_to_window(&handle).await.is_err() {
            continue;
        }
        match driver.current_url().await {
            Ok(url) if is_on_target_domain(&url, marker) => {
                debug!("切换回目标站点窗口: {}", handle);
                return Some(url);
            }
            _ => {}
        }
    }
    None
}

/// 地址的主机名是否为目标域名或其子域名（不区分大小写）
fn is_on_target_domain(url: &str, marker: &str) -> bool {
    let marker = marker.trim().trim_start_matches('.').to_ascii_lowercase();
    match Url::parse(url) {
        Ok(parsed) => parsed
            .host_str()
            .map(|host| {
                let host = host.to_ascii_lowercase();
                host == marker || host.ends_with(&format!(".{}", marker))
            })
            .unwrap_or(false),
        Err(_) => false,
    }
}

/// 清空输入框后输入文本
async fn fill_field<D: UiDriver>(driver: &D, locator: &Locator, text: &str) -> Result<(), DriverError> {
    let field = wait_for_present(driver, locator, LOGIN_STEP_TIMEOUT)
        .await
        .ok_or_else(|| DriverError::not_found(locator))?;
    let _ = scroll_into_view(driver, &field.handle).await;
    driver.press_key(Some(&field.handle), Key::SelectAll).await?;
    driver.press_key(Some(&field.handle), Key::Backspace).await?;
    driver.type_text(&field.handle, text).await
}

fn step(name: &'static str) -> impl Fn(DriverError) -> SessionError {
    move |source| SessionError::Step { step: name, source }
}
