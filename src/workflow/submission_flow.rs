//! 作品提交流程 - 流程层
//!
//! 核心职责：定义"提交一个作品"的完整状态机
//!
//! 状态顺序：
//! 1. IdleWait：等待提交按钮空闲（超时也继续）
//! 2. Fill：定位输入框并写入提示词
//! 3. ConfirmSubmit：点击提交按钮
//! 4. Done
//!
//! 任一状态出错都会记一行 RETRY、保存现场，然后从 IdleWait 重新开始，
//! 直到用完重试次数。

use std::fmt::Display;
use std::time::Duration;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::{Config, Selectors};
use crate::error::{DriverError, SubmitError};
use crate::infrastructure::{ClickMode, ElementHandle, Key, UiDriver};
use crate::models::{AttemptStatus, WorkItem};
use crate::services::interaction::{click_with_fallback, scroll_into_view, wait_for_present};
use crate::services::{DebugArtifacts, ReadinessGuard, RunLedger};
use crate::utils::{pause_between, poll_until, PollSpec};
use crate::workflow::item_ctx::ItemCtx;

/// 输入框的最小尺寸，排除折叠或占位的 textarea
const INPUT_MIN_WIDTH: f64 = 60.0;
const INPUT_MIN_HEIGHT: f64 = 40.0;

const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// 每个状态开始前的弹窗清理轮数
const STEP_DISMISS_PASSES: usize = 2;

/// 直接输入失败时的脚本赋值：设置 value 并派发 input / change 事件
const ASSIGN_VALUE_JS: &str = r#"
    const el = arguments[0];
    const text = arguments[1];
    el.focus();
    const proto = Object.getPrototypeOf(el);
    const desc = Object.getOwnPropertyDescriptor(proto, 'value');
    if (desc && desc.set) { desc.set.call(el, text); } else { el.value = text; }
    el.dispatchEvent(new Event('input', { bubbles: true }));
    el.dispatchEvent(new Event('change', { bubbles: true }));
"#;

/// 提交状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitState {
    IdleWait,
    Fill,
    ConfirmSubmit,
    Done,
}

impl Display for SubmitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SubmitState::IdleWait => "IDLE_WAIT",
            SubmitState::Fill => "FILL",
            SubmitState::ConfirmSubmit => "CONFIRM_SUBMIT",
            SubmitState::Done => "DONE",
        };
        f.write_str(name)
    }
}

/// 作品处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// 提交成功
    Done { attempts: u32 },
    /// 用完重试次数仍失败
    Failed { attempts: u32, last_error: String },
}

/// 一次尝试失败时所处的状态和原因
#[derive(Debug)]
struct AttemptFailure {
    state: SubmitState,
    error: SubmitError,
}

impl Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.state, self.error)
    }
}

/// 作品提交流程
///
/// - 编排单个作品的完整提交状态机
/// - 决定何时重试、何时放弃
/// - 不持有驱动，只依赖业务能力（services）
pub struct SubmissionFlow {
    guard: ReadinessGuard,
    artifacts: DebugArtifacts,
    selectors: Selectors,
    max_retries: u32,
    element_timeout: Duration,
}

impl SubmissionFlow {
    pub fn new(config: &Config) -> Self {
        Self {
            guard: ReadinessGuard::new(config),
            artifacts: DebugArtifacts::new(config.resolve(&config.artifact_dir)),
            selectors: config.selectors.clone(),
            max_retries: config.max_retries,
            element_timeout: config.element_timeout(),
        }
    }

    pub fn guard(&self) -> &ReadinessGuard {
        &self.guard
    }

    /// 提交一个作品，失败的每次尝试都会写入台账
    ///
    /// 从 `ctx.attempt` 开始计数，最多到 `max_retries`。
    pub async fn run<D: UiDriver>(
        &self,
        driver: &D,
        ledger: &RunLedger,
        item: &WorkItem,
        ctx: &ItemCtx,
    ) -> ItemOutcome {
        let mut ctx = ctx.clone();
        info!("{} 🎵 开始提交", ctx);
        let mut last_error = String::from("重试次数已用完");

        while ctx.attempt <= self.max_retries {
            let attempt = ctx.attempt;
            self.guard.dismiss_interference(driver, STEP_DISMISS_PASSES).await;

            match self.attempt(driver, item).await {
                Ok(()) => {
                    pause_between(1.0, 2.0).await;
                    info!("{} ✅ 提交成功", ctx);
                    return ItemOutcome::Done { attempts: attempt };
                }
                Err(failure) => {
                    let message = failure.to_string();
                    warn!("{} ⚠️ 尝试失败 (上限 {}): {}", ctx, self.max_retries, message);
                    ledger.record(ctx.index, &ctx.title, AttemptStatus::Retry(attempt), &message);
                    self.artifacts.capture(driver, ctx.index, attempt).await;

                    self.guard.dismiss_interference(driver, STEP_DISMISS_PASSES).await;
                    self.guard.wait_out_challenge(driver).await;
                    last_error = message;

                    if attempt < self.max_retries {
                        pause_between(1.0, 2.5).await;
                    }
                }
            }

            ctx.attempt += 1;
        }

        ItemOutcome::Failed {
            attempts: self.max_retries,
            last_error,
        }
    }

    /// 从 IdleWait 走到 Done
    async fn attempt<D: UiDriver>(&self, driver: &D, item: &WorkItem) -> Result<(), AttemptFailure> {
        let mut state = SubmitState::IdleWait;

        loop {
            debug!("状态: {}", state);
            let step = match state {
                SubmitState::IdleWait => {
                    self.guard.wait_until_idle(driver).await;
                    Ok(SubmitState::Fill)
                }
                SubmitState::Fill => self
                    .fill(driver, &item.prompt_text)
                    .await
                    .map(|()| SubmitState::ConfirmSubmit),
                SubmitState::ConfirmSubmit => {
                    self.confirm_submit(driver).await.map(|()| SubmitState::Done)
                }
                SubmitState::Done => return Ok(()),
            };

            state = step.map_err(|error| AttemptFailure { state, error })?;
        }
    }

    /// 定位输入框并写入提示词
    async fn fill<D: UiDriver>(&self, driver: &D, prompt: &str) -> Result<(), SubmitError> {
        self.guard.dismiss_interference(driver, STEP_DISMISS_PASSES).await;
        self.guard.wait_out_challenge(driver).await;

        let spec = PollSpec::fixed(INPUT_POLL_INTERVAL, self.element_timeout);
        let locator = &self.selectors.prompt_input;
        let input = poll_until(&spec, move || async move {
            driver.find_all(locator).await.ok()?.into_iter().find(|e| {
                e.is_clickable() && e.is_at_least(INPUT_MIN_WIDTH, INPUT_MIN_HEIGHT)
            })
        })
        .await
        .ready()
        .ok_or(SubmitError::NoVisibleInput {
            waited_secs: self.element_timeout.as_secs_f64(),
        })?;
        let handle = &input.handle;

        let _ = scroll_into_view(driver, handle).await;
        if let Err(e) = driver.click(handle, ClickMode::Direct).await {
            debug!("点击输入框失败 ({})，改为强制点击", e);
            if let Err(e) = driver.click(handle, ClickMode::Forced).await {
                debug!("强制点击输入框也失败: {}", e);
            }
        }

        match type_prompt(driver, handle, prompt).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_interaction_rejected() => {
                warn!("⚠️ 无法直接输入 ({})，改用脚本赋值", e);
                driver
                    .execute_script(ASSIGN_VALUE_JS, &[handle.as_script_arg(), json!(prompt)])
                    .await?;
                let _ = driver.press_key(Some(handle), Key::Enter).await;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 点击提交按钮
    async fn confirm_submit<D: UiDriver>(&self, driver: &D) -> Result<(), SubmitError> {
        self.guard.dismiss_interference(driver, STEP_DISMISS_PASSES).await;
        self.guard.wait_out_challenge(driver).await;

        let button = wait_for_present(driver, &self.selectors.submit_button, self.element_timeout)
            .await
            .ok_or(SubmitError::SubmitControlNotFound {
                waited_secs: self.element_timeout.as_secs_f64(),
            })?;

        let _ = scroll_into_view(driver, &button.handle).await;
        let _ = driver.hover(&button.handle).await;
        pause_between(0.05, 0.25).await;
        click_with_fallback(driver, &button.handle).await?;
        Ok(())
    }
}

/// 全选清空后输入，再回车
async fn type_prompt<D: UiDriver>(
    driver: &D,
    handle: &ElementHandle,
    prompt: &str,
) -> Result<(), DriverError> {
    driver.press_key(Some(handle), Key::SelectAll).await?;
    driver.press_key(Some(handle), Key::Backspace).await?;
    driver.type_text(handle, prompt).await?;
    driver.press_key(Some(handle), Key::Enter).await
}
