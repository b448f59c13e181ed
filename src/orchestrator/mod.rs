//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责资源管理和队列调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 管理应用生命周期（校验、启动浏览器、建立会话）
//! - 唯一持有 `ChromiumDriver` 的模块
//! - 输出全局统计信息
//!
//! ### `run_loop` - 队列运行器
//! - 从游标处顺序遍历作品（Vec<WorkItem>）
//! - 创建并复用 SubmissionFlow
//! - 控制提交节奏、推进游标
//! - 某个作品失败后停止整个队列
//!
//! ## 层次关系
//!
//! ```text
//! app (持有浏览器，建立会话)
//!     ↓
//! run_loop (处理 Vec<WorkItem>)
//!     ↓
//! workflow::SubmissionFlow (处理单个 WorkItem)
//!     ↓
//! services (能力层：guard / pacing / ledger / artifacts / queue)
//!     ↓
//! infrastructure (基础设施：UiDriver)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：app 管资源，run_loop 管队列
//! 2. **资源隔离**：只有编排层持有浏览器
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure
//! 4. **严格串行**：同一时刻只有一个作品在提交

pub mod app;
pub mod run_loop;

// 重新导出主要类型
pub use app::App;
pub use run_loop::{RunController, RunSummary};
