//! 通用的元素交互动作
//!
//! 等待元素出现 / 可点击、滚动到视口中央、悬停后点击（被拦截时强制点击）。

use std::time::Duration;

use tracing::debug;

use crate::error::{DriverError, DriverResult};
use crate::infrastructure::{ClickMode, ElementHandle, ElementInfo, Locator, UiDriver};
use crate::utils::{poll_until, PollSpec};

/// 元素等待的轮询间隔
const ELEMENT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// 等待定位器匹配到至少一个元素，返回第一个
pub async fn wait_for_present<D: UiDriver>(
    driver: &D,
    locator: &Locator,
    timeout: Duration,
) -> Option<ElementInfo> {
    wait_for_match(driver, locator, timeout, |_| true).await
}

/// 等待第一个可见且可用的匹配元素
pub async fn wait_for_clickable<D: UiDriver>(
    driver: &D,
    locator: &Locator,
    timeout: Duration,
) -> Option<ElementInfo> {
    wait_for_match(driver, locator, timeout, ElementInfo::is_clickable).await
}

/// 等待第一个满足 `accept` 的匹配元素；查询出错视为暂未找到
pub async fn wait_for_match<D: UiDriver>(
    driver: &D,
    locator: &Locator,
    timeout: Duration,
    accept: impl Fn(&ElementInfo) -> bool,
) -> Option<ElementInfo> {
    let spec = PollSpec::fixed(ELEMENT_POLL_INTERVAL, timeout);
    let accept = &accept;
    poll_until(&spec, move || async move {
        match driver.find_all(locator).await {
            Ok(elements) => elements.into_iter().find(|e| accept(e)),
            Err(e) => {
                debug!("查询 {} 失败: {}", locator, e);
                None
            }
        }
    })
    .await
    .ready()
}

pub async fn scroll_into_view<D: UiDriver>(driver: &D, element: &ElementHandle) -> DriverResult<()> {
    driver
        .execute_script(
            "if (arguments[0]) arguments[0].scrollIntoView({block: 'center'});",
            &[element.as_script_arg()],
        )
        .await
        .map(|_| ())
}

/// 滚动、悬停，然后点击；被遮罩拦截时改为强制点击
pub async fn safe_click<D: UiDriver>(driver: &D, element: &ElementHandle) -> DriverResult<()> {
    let _ = scroll_into_view(driver, element).await;
    let _ = driver.hover(element).await;
    click_with_fallback(driver, element).await
}

pub async fn click_with_fallback<D: UiDriver>(
    driver: &D,
    element: &ElementHandle,
) -> DriverResult<()> {
    match driver.click(element, ClickMode::Direct).await {
        Err(DriverError::ClickIntercepted { by, .. }) => {
            debug!("点击 {} 被 {} 拦截，改为强制点击", element, by);
            driver.click(element, ClickMode::Forced).await
        }
        other => other,
    }
}

/// 等待可点击后点击，找不到时返回 `NotFound`
pub async fn click_when_ready<D: UiDriver>(
    driver: &D,
    locator: &Locator,
    timeout: Duration,
) -> DriverResult<()> {
    let element = wait_for_clickable(driver, locator, timeout)
        .await
        .ok_or_else(|| DriverError::not_found(locator))?;
    safe_click(driver, &element.handle).await
}

/// 尽力点击，任何失败都返回 false
pub async fn try_click<D: UiDriver>(driver: &D, locator: &Locator, timeout: Duration) -> bool {
    click_when_ready(driver, locator, timeout).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::fake_driver::{FakeAction, FakeDriver, FakeElement};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_wait_skips_hidden_duplicates() {
        let driver = FakeDriver::new("https://example.test/create");
        let textarea = Locator::css("textarea");
        driver.put(&textarea, FakeElement::hidden());
        driver.put(&textarea, FakeElement::visible(400.0, 120.0));

        let found = wait_for_clickable(&driver, &textarea, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(found.handle.index, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_gives_up_after_timeout() {
        let driver = FakeDriver::new("https://example.test/create");
        let started = Instant::now();

        let found = wait_for_present(&driver, &Locator::css("nothing"), Duration::from_secs(2)).await;

        assert!(found.is_none());
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_intercepted_click_falls_back_to_forced() {
        let driver = FakeDriver::new("https://example.test/create");
        let button = Locator::css("button#go");
        driver.put(
            &button,
            FakeElement {
                intercept_direct_click: true,
                ..FakeElement::visible(80.0, 30.0)
            },
        );

        click_when_ready(&driver, &button, Duration::from_secs(1))
            .await
            .unwrap();

        let clicks: Vec<_> = driver
            .actions()
            .into_iter()
            .filter(|a| matches!(a, FakeAction::Click(..)))
            .collect();
        assert_eq!(
            clicks,
            vec![FakeAction::Click(
                ElementHandle::new(button.clone(), 0),
                ClickMode::Forced
            )]
        );
    }
}
