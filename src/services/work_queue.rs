//! 作品队列服务 - 业务能力层
//!
//! 负责加载作品列表和持久化续跑游标。单进程单写者，不加锁。

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::FileError;
use crate::models::{load_work_items, WorkItem};

/// 作品队列存储
///
/// 职责：
/// - 按文件顺序加载作品
/// - 读取游标（损坏视为从头开始）
/// - 成功提交后覆盖写入游标
pub struct WorkQueue {
    csv_path: PathBuf,
    progress_path: PathBuf,
}

impl WorkQueue {
    pub fn new(csv_path: impl Into<PathBuf>, progress_path: impl Into<PathBuf>) -> Self {
        Self {
            csv_path: csv_path.into(),
            progress_path: progress_path.into(),
        }
    }

    pub fn progress_path(&self) -> &Path {
        &self.progress_path
    }

    /// 加载作品列表，缺失或格式错误对整个运行是致命的
    pub async fn load(&self) -> Result<Vec<WorkItem>, FileError> {
        load_work_items(&self.csv_path).await
    }

    /// 读取下一个待处理作品的序号
    ///
    /// 文件不存在、为空或无法解析时返回 0。
    pub fn load_cursor(&self) -> usize {
        match std::fs::read_to_string(&self.progress_path) {
            Ok(content) => {
                let trimmed = content.trim();
                if trimmed.is_empty() {
                    return 0;
                }
                trimmed.parse().unwrap_or_else(|_| {
                    warn!(
                        "⚠️ 游标文件内容无法解析 ({:?})，从头开始",
                        crate::utils::logging::truncate_text(trimmed, 40)
                    );
                    0
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => {
                warn!("⚠️ 读取游标文件失败: {}，从头开始", e);
                0
            }
        }
    }

    /// 覆盖写入游标
    ///
    /// 先写同目录下的临时文件再重命名，读者不会看到写了一半的内容。
    pub fn save_cursor(&self, next_index: usize) -> Result<(), FileError> {
        let tmp_path = self.progress_path.with_extension("tmp");
        let write_failed = |source| FileError::WriteFailed {
            path: self.progress_path.display().to_string(),
            source,
        };

        if let Some(parent) = self.progress_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(write_failed)?;
            }
        }
        std::fs::write(&tmp_path, next_index.to_string()).map_err(write_failed)?;
        std::fs::rename(&tmp_path, &self.progress_path).map_err(write_failed)?;

        debug!("游标已保存: {}", next_index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_in(dir: &Path) -> WorkQueue {
        WorkQueue::new(dir.join("items.csv"), dir.join("progress.txt"))
    }

    #[test]
    fn test_cursor_defaults_to_zero() {
        let dir = tempfile::tempdir().unwrap();
        let queue = queue_in(dir.path());
        assert_eq!(queue.load_cursor(), 0);

        std::fs::write(queue.progress_path(), "").unwrap();
        assert_eq!(queue.load_cursor(), 0);

        std::fs::write(queue.progress_path(), "not a number").unwrap();
        assert_eq!(queue.load_cursor(), 0);
    }

    #[test]
    fn test_cursor_roundtrip_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let queue = queue_in(dir.path());

        queue.save_cursor(7).unwrap();
        queue.save_cursor(12).unwrap();

        assert_eq!(queue.load_cursor(), 12);
        assert_eq!(std::fs::read_to_string(queue.progress_path()).unwrap(), "12");
        assert!(!dir.path().join("progress.tmp").exists());
    }

    #[test]
    fn test_cursor_tolerates_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let queue = queue_in(dir.path());
        std::fs::write(queue.progress_path(), " 4\n").unwrap();
        assert_eq!(queue.load_cursor(), 4);
    }

    #[tokio::test]
    async fn test_load_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let queue = queue_in(dir.path());
        std::fs::write(
            dir.path().join("items.csv"),
            "title,prompt_text\nfirst,p1\nsecond,p2\nthird,p3\n",
        )
        .unwrap();

        let items = queue.load().await.unwrap();
        let titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["first", "second", "third"]);
    }
}
