//! 队列运行器 - 编排层
//!
//! ## 职责
//!
//! 本模块负责按顺序处理作品队列，是单次运行级别的编排器。
//!
//! ## 核心功能
//!
//! 1. **页面准备**：打开生成页、清理弹窗、等待验证码
//! 2. **顺序调度**：从游标位置起逐个交给 `SubmissionFlow`
//! 3. **节奏控制**：两次成功提交之间保持随机间隔
//! 4. **游标推进**：每次成功后写入下一个序号
//! 5. **失败即停**：某个作品用完重试次数后立即结束运行
//!
//! 失败停止时游标不动，下次启动会从同一个作品重新开始。

use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::infrastructure::UiDriver;
use crate::models::{AttemptStatus, WorkItem};
use crate::services::{Pacer, PacingState, RunLedger, WorkQueue};
use crate::workflow::{ItemCtx, ItemOutcome, SubmissionFlow};

/// 准备页面时的弹窗清理轮数
const PREPARE_DISMISS_PASSES: usize = 4;

/// 成功时写入台账的说明
const SUCCESS_MESSAGE: &str = "typed+enter+clicked create";

/// 单次运行的统计
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// 本次从哪个序号开始
    pub start_index: usize,
    /// 运行结束时的游标
    pub next_cursor: usize,
    /// 本次成功提交的数量
    pub succeeded: usize,
    /// 因重试耗尽而停止的作品序号
    pub halted_at: Option<usize>,
}

/// 队列运行器
pub struct RunController {
    flow: SubmissionFlow,
    pacer: Pacer,
    queue: WorkQueue,
    ledger: RunLedger,
    landing_url: String,
}

impl RunController {
    pub fn new(config: &Config) -> Self {
        Self::with_pacer(config, Pacer::new(config))
    }

    pub fn with_pacer(config: &Config, pacer: Pacer) -> Self {
        Self {
            flow: SubmissionFlow::new(config),
            pacer,
            queue: WorkQueue::new(
                config.resolve(&config.csv_path),
                config.resolve(&config.progress_path),
            ),
            ledger: RunLedger::new(config.resolve(&config.log_path), config.message_max_len),
            landing_url: config.landing_url.clone(),
        }
    }

    pub fn queue(&self) -> &WorkQueue {
        &self.queue
    }

    pub fn ledger(&self) -> &RunLedger {
        &self.ledger
    }

    /// 打开生成页并清理干扰
    ///
    /// 导航失败只记日志，后续的提交流程会在重试中暴露问题。
    pub async fn prepare<D: UiDriver>(&self, driver: &D) {
        info!("🌐 打开生成页: {}", self.landing_url);
        if let Err(e) = driver.navigate(&self.landing_url).await {
            warn!("⚠️ 打开生成页失败: {}", e);
        }
        sleep(Duration::from_secs(1)).await;

        let guard = self.flow.guard();
        guard.dismiss_interference(driver, PREPARE_DISMISS_PASSES).await;
        guard.wait_out_challenge(driver).await;
    }

    /// 从 `start` 开始依次处理作品
    pub async fn run<D: UiDriver>(
        &mut self,
        driver: &D,
        items: &[WorkItem],
        start: usize,
    ) -> RunSummary {
        let total = items.len();
        let mut pacing = PacingState::default();
        let mut summary = RunSummary {
            start_index: start,
            next_cursor: start,
            succeeded: 0,
            halted_at: None,
        };

        for (index, item) in items.iter().enumerate().skip(start) {
            let ctx = ItemCtx::new(index, total, item);

            self.pacer.wait_since_last(&pacing).await;
            self.pacer.incidental_scroll(driver).await;
            self.flow.guard().clear_overlays(driver).await;

            match self.flow.run(driver, &self.ledger, item, &ctx).await {
                ItemOutcome::Done { attempts } => {
                    self.ledger
                        .record(index, &item.title, AttemptStatus::Ok, SUCCESS_MESSAGE);
                    pacing.mark();
                    summary.succeeded += 1;
                    summary.next_cursor = index + 1;

                    if let Err(e) = self.queue.save_cursor(index + 1) {
                        warn!("{} ⚠️ 游标保存失败 (已提交成功): {}", ctx, e);
                    }
                    info!(
                        "{} ✓ 已完成，共尝试 {} 次，游标 → {}",
                        ctx,
                        attempts,
                        index + 1
                    );
                }
                ItemOutcome::Failed {
                    attempts,
                    last_error,
                } => {
                    self.ledger
                        .record(index, &item.title, AttemptStatus::Fail, &last_error);
                    error!(
                        "{} ❌ {} 次尝试均失败，停止运行: {}",
                        ctx, attempts, last_error
                    );
                    summary.halted_at = Some(index);
                    break;
                }
            }
        }

        summary
    }
}
