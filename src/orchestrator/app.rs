//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责资源初始化和单次运行的生命周期。
//!
//! ## 核心功能
//!
//! 1. **前置校验**：登录密钥和作品队列在触碰浏览器之前加载，缺失即退出
//! 2. **浏览器资源**：连接已有浏览器或自行启动，包装为 `ChromiumDriver`
//! 3. **会话建立**：复用或登录
//! 4. **委托运行**：交给 `RunController` 从游标处继续
//! 5. **全局统计**：输出本次运行的结果
//!
//! 运行结束后浏览器保持打开，方便人工检查。

use anyhow::{Context, Result};
use tracing::info;

use crate::browser;
use crate::config::{Config, Credentials};
use crate::infrastructure::ChromiumDriver;
use crate::models::WorkItem;
use crate::orchestrator::run_loop::{RunController, RunSummary};
use crate::services::SessionBootstrapper;
use crate::utils::logging::{log_resume, log_startup, print_final_stats};

/// 应用主结构
pub struct App {
    config: Config,
    credentials: Credentials,
    items: Vec<WorkItem>,
    driver: ChromiumDriver,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        let credentials = Credentials::from_env().context("缺少登录凭据")?;

        let runner = RunController::new(&config);
        let items = runner
            .queue()
            .load()
            .await
            .context("加载作品队列失败")?;
        info!("✓ 加载了 {} 个作品", items.len());

        log_startup(&config);

        let (browser, page) = match config.browser_debug_port {
            Some(port) => {
                browser::connect_to_browser_and_page(port, Some(&config.target_domain_marker))
                    .await?
            }
            None => browser::launch_browser(&config).await?,
        };
        let driver = ChromiumDriver::new(browser, page);

        Ok(Self {
            config,
            credentials,
            items,
            driver,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<RunSummary> {
        let session = SessionBootstrapper::new(&self.config)
            .establish(&self.driver, &self.credentials)
            .await
            .context("建立登录会话失败")?;
        if session.reused {
            info!("🔓 使用已保存的登录状态");
        }

        let mut runner = RunController::new(&self.config);
        runner.prepare(session.driver).await;

        let start = runner.queue().load_cursor();
        log_resume(start, self.items.len(), &self.config);

        let summary = runner.run(session.driver, &self.items, start).await;

        print_final_stats(
            summary.succeeded,
            self.items.len().saturating_sub(summary.next_cursor),
            summary.halted_at,
            &runner.ledger().path().display().to_string(),
        );

        Ok(summary)
    }
}
