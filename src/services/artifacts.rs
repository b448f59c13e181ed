//! 失败现场保存
//!
//! 每次重试前保存截图和页面源码，文件名带作品序号和尝试次数。

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::infrastructure::UiDriver;

/// 各部分是否保存成功
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArtifactReport {
    pub screenshot: bool,
    pub markup: bool,
}

pub struct DebugArtifacts {
    dir: PathBuf,
}

impl DebugArtifacts {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn prefix(&self, index: usize, attempt: u32) -> PathBuf {
        self.dir.join(format!("fail_idx{}_attempt{}", index, attempt))
    }

    /// 保存现场，任何失败都只记日志
    pub async fn capture<D: UiDriver + ?Sized>(
        &self,
        driver: &D,
        index: usize,
        attempt: u32,
    ) -> ArtifactReport {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            warn!("⚠️ 无法创建现场目录 {}: {}", self.dir.display(), e);
            return ArtifactReport::default();
        }
        let prefix = self.prefix(index, attempt);

        let screenshot = match driver.screenshot().await {
            Ok(png) => write_quietly(&prefix.with_extension("png"), &png),
            Err(e) => {
                debug!("截图失败: {}", e);
                false
            }
        };
        let markup = match driver.page_source().await {
            Ok(html) => write_quietly(&prefix.with_extension("html"), html.as_bytes()),
            Err(e) => {
                debug!("获取页面源码失败: {}", e);
                false
            }
        };

        ArtifactReport { screenshot, markup }
    }
}

fn write_quietly(path: &Path, bytes: &[u8]) -> bool {
    match std::fs::write(path, bytes) {
        Ok(()) => true,
        Err(e) => {
            debug!("写入 {} 失败: {}", path.display(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::fake_driver::FakeDriver;

    #[tokio::test]
    async fn test_capture_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = DebugArtifacts::new(dir.path().join("artifacts"));
        let driver = FakeDriver::new("https://example.test/create");

        let report = artifacts.capture(&driver, 4, 2).await;

        assert_eq!(report, ArtifactReport { screenshot: true, markup: true });
        assert!(dir.path().join("artifacts/fail_idx4_attempt2.png").exists());
        assert!(dir.path().join("artifacts/fail_idx4_attempt2.html").exists());
    }

    #[tokio::test]
    async fn test_screenshot_failure_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = DebugArtifacts::new(dir.path());
        let driver = FakeDriver::new("https://example.test/create");
        driver.with_page(|p| p.fail_screenshot = true);

        let report = artifacts.capture(&driver, 0, 1).await;

        assert!(!report.screenshot);
        assert!(report.markup);
    }
}
