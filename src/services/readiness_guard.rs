//! 页面就绪守卫 - 业务能力层
//!
//! 在任何交互之前清理弹窗、识别验证码、等待提交按钮空闲。
//! 所有方法都可以放心地重复调用，且都不会返回错误。

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{Config, Selectors};
use crate::infrastructure::{ElementInfo, Key, UiDriver};
use crate::services::interaction::try_click;
use crate::utils::{pause_between, poll_until, PollOutcome, PollSpec};

/// 已知验证码提供方的关键字
pub const CHALLENGE_KEYWORDS: [&str; 5] =
    ["recaptcha", "hcaptcha", "turnstile", "arkoselabs", "captcha"];

/// 验证码 iframe 的最小可见尺寸，排除隐藏或占位的 iframe
const CHALLENGE_MIN_SIZE: f64 = 60.0;

/// 单个弹窗控件的等待时间
const OVERLAY_CLICK_TIMEOUT: Duration = Duration::from_millis(800);

const CHALLENGE_POLL_INTERVAL: Duration = Duration::from_secs(1);
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(300);

/// 一次清理的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DismissReport {
    /// 实际执行的轮数
    pub passes: usize,
    /// 关闭的弹窗控件数
    pub dismissed: usize,
}

/// 等待验证码的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeOutcome {
    /// 没有验证码
    Absent,
    /// 在上限内消失
    Cleared,
    /// 超过上限仍在，放弃等待继续执行
    Abandoned,
}

/// 等待空闲的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleOutcome {
    Idle,
    TimedOut,
}

/// 页面就绪守卫
pub struct ReadinessGuard {
    selectors: Selectors,
    challenge_timeout: Duration,
    idle_timeout: Duration,
    default_passes: usize,
}

impl ReadinessGuard {
    pub fn new(config: &Config) -> Self {
        Self {
            selectors: config.selectors.clone(),
            challenge_timeout: config.challenge_timeout(),
            idle_timeout: config.idle_timeout(),
            default_passes: config.dismiss_passes,
        }
    }

    /// 按配置的轮数清理弹窗
    pub async fn clear_overlays<D: UiDriver>(&self, driver: &D) -> DismissReport {
        self.dismiss_interference(driver, self.default_passes).await
    }

    /// 尽力关闭弹窗，最多 `passes` 轮
    ///
    /// 每轮尝试 "Not now" 和关闭按钮，再向焦点元素发送 Escape。
    /// 某一轮什么都没关掉就提前结束；关掉了东西则短暂停顿后再来一轮，
    /// 因为关掉一个弹窗可能露出下一个。
    pub async fn dismiss_interference<D: UiDriver>(&self, driver: &D, passes: usize) -> DismissReport {
        let mut report = DismissReport::default();

        for _ in 0..passes {
            report.passes += 1;
            let mut closed = 0;
            if try_click(driver, &self.selectors.not_now, OVERLAY_CLICK_TIMEOUT).await {
                closed += 1;
            }
            if try_click(driver, &self.selectors.close_button, OVERLAY_CLICK_TIMEOUT).await {
                closed += 1;
            }
            let _ = driver.press_key(None, Key::Escape).await;

            if closed == 0 {
                break;
            }
            report.dismissed += closed;
            debug!("本轮关闭了 {} 个弹窗", closed);
            pause_between(0.08, 0.25).await;
        }

        report
    }

    /// 是否存在可见的验证码 iframe
    pub async fn challenge_present<D: UiDriver>(&self, driver: &D) -> bool {
        match driver.find_all(&self.selectors.frames).await {
            Ok(frames) => frames.iter().any(is_challenge_frame),
            Err(e) => {
                debug!("枚举 iframe 失败: {}", e);
                false
            }
        }
    }

    /// 如有验证码，等待人工处理，最多 `challenge_timeout`
    pub async fn wait_out_challenge<D: UiDriver>(&self, driver: &D) -> ChallengeOutcome {
        if !self.challenge_present(driver).await {
            return ChallengeOutcome::Absent;
        }

        warn!(
            "🧩 检测到验证码，请手动完成 (最多等待 {}s)...",
            self.challenge_timeout.as_secs()
        );

        let spec = PollSpec::fixed(CHALLENGE_POLL_INTERVAL, self.challenge_timeout);
        let this = self;
        let outcome = poll_until(&spec, move || async move {
            this.dismiss_interference(driver, 1).await;
            (!this.challenge_present(driver).await).then_some(())
        })
        .await;

        match outcome {
            PollOutcome::Ready(()) => {
                info!("✓ 验证码已消失，继续执行");
                ChallengeOutcome::Cleared
            }
            PollOutcome::TimedOut => {
                warn!("⚠️ 等待验证码超时，放弃等待继续执行 (可能会失败)");
                ChallengeOutcome::Abandoned
            }
        }
    }

    /// 等待提交按钮空闲：可见、非 busy、未禁用
    ///
    /// 超时后照常返回，由后续填写和提交步骤快速失败并进入重试。
    pub async fn wait_until_idle<D: UiDriver>(&self, driver: &D) -> IdleOutcome {
        let spec = PollSpec::fixed(IDLE_POLL_INTERVAL, self.idle_timeout);
        let this = self;
        let outcome = poll_until(&spec, move || async move {
            this.dismiss_interference(driver, 1).await;
            if this.challenge_present(driver).await {
                this.wait_out_challenge(driver).await;
            }
            this.submit_control_idle(driver).await.then_some(())
        })
        .await;

        match outcome {
            PollOutcome::Ready(()) => IdleOutcome::Idle,
            PollOutcome::TimedOut => {
                warn!(
                    "⚠️ {}s 内提交按钮未空闲，继续尝试",
                    self.idle_timeout.as_secs()
                );
                IdleOutcome::TimedOut
            }
        }
    }

    async fn submit_control_idle<D: UiDriver>(&self, driver: &D) -> bool {
        match driver.find_all(&self.selectors.submit_button).await {
            Ok(buttons) => buttons.first().map(is_idle_control).unwrap_or(false),
            Err(_) => false,
        }
    }
}

fn is_challenge_frame(frame: &ElementInfo) -> bool {
    let src = frame.attr("src").unwrap_or_default().to_lowercase();
    let title = frame.attr("title").unwrap_or_default().to_lowercase();
    let matches_provider = CHALLENGE_KEYWORDS
        .iter()
        .any(|k| src.contains(k) || title.contains(k));

    matches_provider && frame.visible && frame.is_at_least(CHALLENGE_MIN_SIZE, CHALLENGE_MIN_SIZE)
}

fn is_idle_control(button: &ElementInfo) -> bool {
    let busy = button
        .attr("aria-busy")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    button.visible && !busy && button.attr("disabled").is_none()
}
