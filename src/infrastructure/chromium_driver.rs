//! Chromium 驱动 - 基础设施层
//!
//! 持有浏览器和当前页面，把 `UiDriver` 的能力翻译成 CDP 调用。
//! 元素的定位、可见性和命中测试都通过注入 JS 完成。

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, InsertTextParams,
};
use chromiumoxide::layout::Point;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, Page};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{DriverError, DriverResult};
use crate::infrastructure::driver::{
    ClickMode, ElementHandle, ElementInfo, Key, Locator, UiDriver,
};

/// 所有脚本共用的元素解析函数
const RESOLVE_JS: &str = r#"
const __resolveAll = (loc) => {
    if (loc.xpath !== undefined) {
        const snap = document.evaluate(loc.xpath, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
        const out = [];
        for (let i = 0; i < snap.snapshotLength; i++) out.push(snap.snapshotItem(i));
        return out;
    }
    return Array.from(document.querySelectorAll(loc.css));
};
const __resolve = (handle) => __resolveAll(handle.locator)[handle.index] || null;
const __isVisible = (el) => {
    const r = el.getBoundingClientRect();
    const s = window.getComputedStyle(el);
    return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none' && s.opacity !== '0';
};
"#;

/// 元素查询脚本的原始返回
#[derive(Debug, Deserialize)]
struct RawElement {
    visible: bool,
    enabled: bool,
    width: f64,
    height: f64,
    #[serde(default)]
    attributes: HashMap<String, String>,
}

/// 交互前检查脚本的返回
#[derive(Debug, Deserialize)]
struct PointerCheck {
    status: String,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default)]
    by: Option<String>,
}

/// Chromium 驱动
///
/// - 唯一持有 Browser 和当前 Page
/// - 切换窗口时替换当前 Page
pub struct ChromiumDriver {
    browser: Browser,
    page: RwLock<Page>,
}

impl ChromiumDriver {
    pub fn new(browser: Browser, page: Page) -> Self {
        Self {
            browser,
            page: RwLock::new(page),
        }
    }

    async fn page(&self) -> Page {
        self.page.read().await.clone()
    }

    /// 执行 JS 代码并返回 JSON 结果
    async fn eval(&self, js_code: impl Into<String>) -> DriverResult<JsonValue> {
        let result = self.page().await.evaluate(js_code.into()).await?;
        Ok(script_value(result.value()))
    }

    /// 执行 JS 代码并反序列化为指定类型
    async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> DriverResult<T> {
        let json_value = self.eval(js_code).await?;
        Ok(serde_json::from_value(json_value)?)
    }

    /// 滚动到视口中央并检查元素是否可以接收真实指针事件
    async fn check_pointer_target(&self, element: &ElementHandle) -> DriverResult<PointerCheck> {
        let js_code = format!(
            r#"
            (() => {{
                {resolve}
                const el = __resolve({handle});
                if (!el) return {{ status: 'missing' }};
                el.scrollIntoView({{ block: 'center' }});
                if (!__isVisible(el) || el.disabled) return {{ status: 'not_interactable' }};
                const r = el.getBoundingClientRect();
                const x = r.left + r.width / 2;
                const y = r.top + r.height / 2;
                const hit = document.elementFromPoint(x, y);
                if (!hit || !(hit === el || el.contains(hit))) {{
                    return {{ status: 'intercepted', by: hit ? hit.tagName.toLowerCase() : 'nothing' }};
                }}
                return {{ status: 'ok', x, y }};
            }})()
            "#,
            resolve = RESOLVE_JS,
            handle = serde_json::to_string(element)?,
        );
        self.eval_as(js_code).await
    }

    fn ensure_pointer_ok(element: &ElementHandle, check: &PointerCheck) -> DriverResult<()> {
        match check.status.as_str() {
            "ok" => Ok(()),
            "missing" => Err(DriverError::not_found(element)),
            "intercepted" => Err(DriverError::ClickIntercepted {
                locator: element.to_string(),
                by: check.by.clone().unwrap_or_default(),
            }),
            _ => Err(DriverError::not_interactable(element)),
        }
    }

    /// 聚焦元素，失败说明元素不可交互
    async fn focus(&self, element: &ElementHandle) -> DriverResult<()> {
        let js_code = format!(
            r#"
            (() => {{
                {resolve}
                const el = __resolve({handle});
                if (!el) return 'missing';
                if (!__isVisible(el) || el.disabled || el.readOnly) return 'not_interactable';
                el.focus();
                return document.activeElement === el ? 'ok' : 'not_interactable';
            }})()
            "#,
            resolve = RESOLVE_JS,
            handle = serde_json::to_string(element)?,
        );
        let status: String = self.eval_as(js_code).await?;
        Self::ensure_pointer_ok(
            element,
            &PointerCheck {
                status,
                x: 0.0,
                y: 0.0,
                by: None,
            },
        )
    }

    async fn dispatch_key(&self, key: &str, code: &str, vk: i64, text: Option<&str>) -> DriverResult<()> {
        let page = self.page().await;
        for event_type in [DispatchKeyEventType::KeyDown, DispatchKeyEventType::KeyUp] {
            let mut builder = DispatchKeyEventParams::builder()
                .r#type(event_type.clone())
                .key(key)
                .code(code)
                .windows_virtual_key_code(vk)
                .native_virtual_key_code(vk);
            if let (DispatchKeyEventType::KeyDown, Some(text)) = (&event_type, text) {
                builder = builder.text(text);
            }
            let params = builder.build().map_err(DriverError::Protocol)?;
            page.execute(params).await?;
        }
        Ok(())
    }
}

/// 脚本返回 `null` 或没有返回值时，协议里不带 value 字段
fn script_value(value: Option<&JsonValue>) -> JsonValue {
    value.cloned().unwrap_or(JsonValue::Null)
}

#[async_trait]
impl UiDriver for ChromiumDriver {
    async fn navigate(&self, url: &str) -> DriverResult<()> {
        debug!("导航到: {}", url);
        self.page().await.goto(url).await?;
        Ok(())
    }

    async fn current_url(&self) -> DriverResult<String> {
        Ok(self.page().await.url().await?.unwrap_or_default())
    }

    async fn find_all(&self, locator: &Locator) -> DriverResult<Vec<ElementInfo>> {
        let js_code = format!(
            r#"
            (() => {{
                {resolve}
                return __resolveAll({loc}).map((el) => {{
                    const r = el.getBoundingClientRect();
                    const attributes = {{}};
                    for (const a of el.attributes) attributes[a.name] = a.value;
                    return {{
                        visible: __isVisible(el),
                        enabled: !el.disabled,
                        width: r.width,
                        height: r.height,
                        attributes,
                    }};
                }});
            }})()
            "#,
            resolve = RESOLVE_JS,
            loc = serde_json::to_string(locator)?,
        );
        let raw: Vec<RawElement> = self.eval_as(js_code).await?;
        Ok(raw
            .into_iter()
            .enumerate()
            .map(|(index, r)| ElementInfo {
                handle: ElementHandle::new(locator.clone(), index),
                visible: r.visible,
                enabled: r.enabled,
                width: r.width,
                height: r.height,
                attributes: r.attributes,
            })
            .collect())
    }

    async fn hover(&self, element: &ElementHandle) -> DriverResult<()> {
        let check = self.check_pointer_target(element).await?;
        if check.status == "missing" {
            return Err(DriverError::not_found(element));
        }
        self.page().await.move_mouse(Point::new(check.x, check.y)).await?;
        Ok(())
    }

    async fn click(&self, element: &ElementHandle, mode: ClickMode) -> DriverResult<()> {
        match mode {
            ClickMode::Direct => {
                let check = self.check_pointer_target(element).await?;
                Self::ensure_pointer_ok(element, &check)?;
                self.page().await.click(Point::new(check.x, check.y)).await?;
                Ok(())
            }
            ClickMode::Forced => {
                let clicked = self
                    .execute_script(
                        "if (!arguments[0]) return false; arguments[0].click(); return true;",
                        &[element.as_script_arg()],
                    )
                    .await?;
                if clicked.as_bool() == Some(true) {
                    Ok(())
                } else {
                    Err(DriverError::not_found(element))
                }
            }
        }
    }

    async fn type_text(&self, element: &ElementHandle, text: &str) -> DriverResult<()> {
        self.focus(element).await?;
        self.page().await.execute(InsertTextParams::new(text)).await?;
        Ok(())
    }

    async fn press_key(&self, element: Option<&ElementHandle>, key: Key) -> DriverResult<()> {
        if let Some(element) = element {
            self.focus(element).await?;
        }
        match key {
            Key::Enter => self.dispatch_key("Enter", "Enter", 13, Some("\r")).await,
            Key::Escape => self.dispatch_key("Escape", "Escape", 27, None).await,
            Key::Backspace => self.dispatch_key("Backspace", "Backspace", 8, None).await,
            Key::SelectAll => {
                self.eval(
                    r#"
                    (() => {
                        const el = document.activeElement;
                        if (el && typeof el.select === 'function') el.select();
                        else document.execCommand('selectAll');
                        return true;
                    })()
                    "#,
                )
                .await?;
                Ok(())
            }
        }
    }

    async fn execute_script(&self, script: &str, args: &[JsonValue]) -> DriverResult<JsonValue> {
        let js_code = format!(
            r#"
            (() => {{
                {resolve}
                const __args = {args}.map((a) => (a && a.__element) ? __resolve(a.__element) : a);
                const __result = (function () {{ {script} }}).apply(null, __args);
                return __result === undefined ? null : __result;
            }})()
            "#,
            resolve = RESOLVE_JS,
            args = serde_json::to_string(args)?,
            script = script,
        );
        self.eval(js_code).await
    }

    async fn page_source(&self) -> DriverResult<String> {
        Ok(self.page().await.content().await?)
    }

    async fn screenshot(&self) -> DriverResult<Vec<u8>> {
        let params = ScreenshotParams::builder().full_page(true).build();
        Ok(self.page().await.screenshot(params).await?)
    }

    async fn window_handles(&self) -> DriverResult<Vec<String>> {
        let pages = self.browser.pages().await?;
        Ok(pages
            .iter()
            .map(|p| p.target_id().as_ref().to_string())
            .collect())
    }

    async fn switch_to_window(&self, handle: &str) -> DriverResult<()> {
        let pages = self.browser.pages().await?;
        let target = pages
            .into_iter()
            .find(|p| p.target_id().as_ref() == handle)
            .ok_or_else(|| DriverError::NotFound {
                locator: format!("window={}", handle),
            })?;
        *self.page.write().await = target;
        debug!("已切换到窗口: {}", handle);
        Ok(())
    }
}
