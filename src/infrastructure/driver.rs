//! UI 驱动能力 - 基础设施层
//!
//! 控制器只依赖这里定义的抽象能力，不关心背后是真实浏览器还是测试替身。

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::error::DriverResult;

/// 结构化定位器
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Locator::XPath(expr.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css={}", s),
            Locator::XPath(s) => write!(f, "xpath={}", s),
        }
    }
}

/// 指向页面上某个具体元素：定位器 + 匹配结果中的序号
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    pub locator: Locator,
    pub index: usize,
}

impl ElementHandle {
    pub fn new(locator: Locator, index: usize) -> Self {
        Self { locator, index }
    }

    /// 作为 `execute_script` 的参数传入时，脚本中会拿到真实的 DOM 元素
    pub fn as_script_arg(&self) -> JsonValue {
        json!({ "__element": self })
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.locator, self.index)
    }
}

/// 查询时刻的元素快照
#[derive(Debug, Clone)]
pub struct ElementInfo {
    pub handle: ElementHandle,
    pub visible: bool,
    pub enabled: bool,
    pub width: f64,
    pub height: f64,
    pub attributes: HashMap<String, String>,
}

impl ElementInfo {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// 渲染尺寸是否达到下限，用来排除隐藏的占位元素
    pub fn is_at_least(&self, min_width: f64, min_height: f64) -> bool {
        self.width >= min_width && self.height >= min_height
    }

    pub fn is_clickable(&self) -> bool {
        self.visible && self.enabled
    }
}

/// 点击方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickMode {
    /// 真实指针点击，会经过命中测试，可能被遮罩拦截
    Direct,
    /// 直接调用元素的 click()，绕过命中测试
    Forced,
}

/// 支持的按键
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
    Backspace,
    SelectAll,
}

/// 浏览器驱动能力
///
/// 所有方法都只做一件事，重试、等待、兜底策略都由上层决定。
#[async_trait]
pub trait UiDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> DriverResult<()>;

    async fn current_url(&self) -> DriverResult<String>;

    /// 按定位器查找所有匹配元素（包括隐藏的），按文档顺序返回
    async fn find_all(&self, locator: &Locator) -> DriverResult<Vec<ElementInfo>>;

    async fn hover(&self, element: &ElementHandle) -> DriverResult<()>;

    async fn click(&self, element: &ElementHandle, mode: ClickMode) -> DriverResult<()>;

    async fn type_text(&self, element: &ElementHandle, text: &str) -> DriverResult<()>;

    /// `element` 为 `None` 时发送给当前获得焦点的元素
    async fn press_key(&self, element: Option<&ElementHandle>, key: Key) -> DriverResult<()>;

    /// 执行注入脚本，脚本体内通过 `arguments[i]` 访问参数
    async fn execute_script(&self, script: &str, args: &[JsonValue]) -> DriverResult<JsonValue>;

    async fn page_source(&self) -> DriverResult<String>;

    /// 返回 PNG 字节
    async fn screenshot(&self) -> DriverResult<Vec<u8>>;

    async fn window_handles(&self) -> DriverResult<Vec<String>>;

    async fn switch_to_window(&self, handle: &str) -> DriverResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_serde_shape() {
        let css = serde_json::to_value(Locator::css("button[aria-label='Close']")).unwrap();
        assert_eq!(css, json!({ "css": "button[aria-label='Close']" }));

        let parsed: Locator = toml::from_str::<HashMap<String, Locator>>(
            "loc = { xpath = \"//button\" }",
        )
        .unwrap()
        .remove("loc")
        .unwrap();
        assert_eq!(parsed, Locator::xpath("//button"));
    }

    #[test]
    fn test_element_handle_script_arg() {
        let handle = ElementHandle::new(Locator::css("textarea"), 2);
        assert_eq!(
            handle.as_script_arg(),
            json!({ "__element": { "locator": { "css": "textarea" }, "index": 2 } })
        );
    }
}
