use anyhow::{Context, Result};
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// 连接到已打开调试端口的浏览器并获取页面
///
/// 优先复用地址中包含 `target_marker` 的标签页，否则新建页面。
pub async fn connect_to_browser_and_page(
    port: u16,
    target_marker: Option<&str>,
) -> Result<(Browser, Page)> {
    let browser_url = format!("http://localhost:{}", port);
    info!("🔌 正在连接到浏览器: {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        e
    })?;
    debug!("浏览器连接成功");

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

    let pages = browser.pages().await?;
    debug!("获取到 {} 个页面", pages.len());

    if let Some(marker) = target_marker {
        for p in pages.iter() {
            if let Ok(Some(url)) = p.url().await {
                debug!("检查页面地址: {}", url);
                if url.contains(marker) {
                    info!("✓ 复用已打开的页面: {}", url);
                    return Ok((browser, p.clone()));
                }
            }
        }
        debug!("未找到匹配的页面，将创建新页面");
    }

    let page = match pages.into_iter().next() {
        Some(page) => page,
        None => browser
            .new_page("about:blank")
            .await
            .context("创建空白页面失败")?,
    };

    Ok((browser, page))
}
