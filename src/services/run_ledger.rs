//! 运行台账服务 - 业务能力层
//!
//! 只负责"追加一行尝试记录"能力，不关心流程

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, warn};

use crate::models::{AttemptOutcome, AttemptStatus};
use crate::utils::logging::truncate_chars;

const HEADER: [&str; 5] = ["timestamp", "index", "title", "status", "message"];

/// 运行台账
///
/// 职责：
/// - 每次尝试（不是每个作品）追加一行
/// - 首次写入时带表头
/// - 写入失败只记日志，绝不中断运行
pub struct RunLedger {
    path: PathBuf,
    max_message_len: usize,
}

impl RunLedger {
    pub fn new(path: impl Into<PathBuf>, max_message_len: usize) -> Self {
        Self {
            path: path.into(),
            max_message_len,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加一条记录
    ///
    /// # 返回
    /// 返回是否成功写入；调用方可以忽略
    pub fn record(&self, index: usize, title: &str, status: AttemptStatus, message: &str) -> bool {
        let outcome = AttemptOutcome {
            timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            index,
            title: title.to_string(),
            status,
            message: truncate_chars(message, self.max_message_len),
        };

        debug!("写入台账: #{} {} {}", index, status, outcome.message);

        match self.append(&outcome) {
            Ok(()) => true,
            Err(e) => {
                warn!("⚠️ 写入台账失败 ({}): {}", self.path.display(), e);
                false
            }
        }
    }

    fn append(&self, outcome: &AttemptOutcome) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let is_new = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_new {
            writer.write_record(HEADER)?;
        }
        writer.serialize(outcome)?;
        writer.flush()?;
        Ok(())
    }
}

/// 读取整份台账，供运维排查和测试使用
pub fn read_outcomes(path: &Path) -> Result<Vec<AttemptOutcome>> {
    let mut reader = csv::Reader::from_path(path)?;
    let outcomes = reader.deserialize().collect::<Result<Vec<AttemptOutcome>, _>>()?;
    Ok(outcomes)
}
