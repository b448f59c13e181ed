//! # Prompt Queue Submit
//!
//! 一个把作品队列逐个提交到网页生成器的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（浏览器页面），只暴露能力
//! - `UiDriver` - 页面交互能力的抽象
//! - `ChromiumDriver` - 基于 chromiumoxide 的实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，不关心流程
//! - `ReadinessGuard` - 清理弹窗、等待验证码、等待空闲
//! - `Pacer` - 提交节奏控制
//! - `WorkQueue` - 作品列表和续跑游标
//! - `RunLedger` - 写运行台账
//! - `DebugArtifacts` - 保存失败现场
//! - `SessionBootstrapper` - 复用或建立登录会话
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个作品"的完整提交流程
//! - `ItemCtx` - 上下文封装（序号 + 标题）
//! - `SubmissionFlow` - 状态机（IdleWait → Fill → ConfirmSubmit → Done）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 应用入口，管理浏览器和会话
//! - `orchestrator/run_loop` - 队列运行器，失败即停
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Config, Credentials};
pub use error::{AppError, AppResult};
pub use infrastructure::{ChromiumDriver, UiDriver};
pub use models::{AttemptOutcome, AttemptStatus, WorkItem};
pub use orchestrator::{App, RunController, RunSummary};
pub use workflow::{ItemOutcome, SubmissionFlow};
