use anyhow::Result;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::config::Config;

/// 启动带界面的浏览器
///
/// 使用持久化的资料目录，登录状态可以跨运行保留。
pub async fn launch_browser(config: &Config) -> Result<(Browser, Page)> {
    info!("🚀 启动浏览器...");

    let mut builder = BrowserConfig::builder()
        .with_head()
        .viewport(None)
        .args(vec![
            "--disable-blink-features=AutomationControlled", // 隐藏自动化标记
            "--disable-notifications",
            "--start-maximized",
        ]);
    if let Some(dir) = &config.chrome_profile_dir {
        let dir = config.resolve(dir);
        debug!("浏览器资料目录: {}", dir.display());
        builder = builder.user_data_dir(dir);
    }
    if let Some(exe) = &config.chrome_executable {
        builder = builder.chrome_executable(exe);
    }

    let browser_config = builder.build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        anyhow::anyhow!("配置浏览器失败: {}", e)
    })?;

    let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        anyhow::anyhow!("启动浏览器失败: {}", e)
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建页面失败: {}", e);
        anyhow::anyhow!("创建页面失败: {}", e)
    })?;

    info!("✅ 浏览器已就绪");
    Ok((browser, page))
}
