//! 内存中的页面模型，只在单元测试中使用

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::{DriverError, DriverResult};
use crate::infrastructure::driver::{
    ClickMode, ElementHandle, ElementInfo, Key, Locator, UiDriver,
};

/// 测试页面上的一个元素
#[derive(Debug, Clone)]
pub struct FakeElement {
    pub visible: bool,
    pub enabled: bool,
    pub width: f64,
    pub height: f64,
    pub attributes: HashMap<String, String>,
    pub value: String,
    pub selected: bool,
    /// 直接点击时报告被遮罩拦截
    pub intercept_direct_click: bool,
    /// 直接输入时报告不可交互
    pub reject_typing: bool,
    /// 点击后从页面上移除
    pub removed_on_click: bool,
}

impl FakeElement {
    pub fn visible(width: f64, height: f64) -> Self {
        Self {
            visible: true,
            enabled: true,
            width,
            height,
            attributes: HashMap::new(),
            value: String::new(),
            selected: false,
            intercept_direct_click: false,
            reject_typing: false,
            removed_on_click: false,
        }
    }

    pub fn hidden() -> Self {
        Self {
            visible: false,
            ..Self::visible(0.0, 0.0)
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn dismissible(mut self) -> Self {
        self.removed_on_click = true;
        self
    }
}

/// 记录下来的交互
#[derive(Debug, Clone, PartialEq)]
pub enum FakeAction {
    Navigate(String),
    Hover(ElementHandle),
    Click(ElementHandle, ClickMode),
    Type(ElementHandle, String),
    Key(Option<ElementHandle>, Key),
    Script(String),
    SwitchWindow(String),
}

type ClickHook = Box<dyn FnMut(&mut FakePage) -> DriverResult<()> + Send>;
type FindHook = Box<dyn FnMut(&mut FakePage) + Send>;

/// 页面状态，钩子可以直接修改
pub struct FakePage {
    pub url: String,
    pub elements: HashMap<Locator, Vec<FakeElement>>,
    pub windows: Vec<String>,
    pub current_window: String,
    /// 切换到某个窗口后当前地址变为这里登记的地址
    pub window_urls: HashMap<String, String>,
    /// 导航到某地址后实际落地的地址（模拟重定向）
    pub redirects: HashMap<String, String>,
    pub actions: Vec<FakeAction>,
    pub fail_screenshot: bool,
}

impl FakePage {
    pub fn put(&mut self, locator: &Locator, element: FakeElement) {
        self.elements.entry(locator.clone()).or_default().push(element);
    }

    pub fn clear(&mut self, locator: &Locator) {
        self.elements.remove(locator);
    }

    pub fn element_mut(&mut self, handle: &ElementHandle) -> DriverResult<&mut FakeElement> {
        self.elements
            .get_mut(&handle.locator)
            .and_then(|els| els.get_mut(handle.index))
            .ok_or_else(|| DriverError::not_found(handle))
    }

    fn first_value(&self, locator: &Locator) -> Option<String> {
        self.elements
            .get(locator)
            .and_then(|els| els.iter().find(|e| !e.value.is_empty()))
            .map(|e| e.value.clone())
    }
}

/// 可编排的测试驱动
pub struct FakeDriver {
    page: Mutex<FakePage>,
    click_hooks: Mutex<HashMap<Locator, ClickHook>>,
    find_hooks: Mutex<HashMap<Locator, FindHook>>,
    focused: Mutex<Option<ElementHandle>>,
}

impl std::fmt::Debug for FakeDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeDriver").finish_non_exhaustive()
    }
}

impl FakeDriver {
    pub fn new(url: &str) -> Self {
        Self {
            page: Mutex::new(FakePage {
                url: url.to_string(),
                elements: HashMap::new(),
                windows: vec!["main".to_string()],
                current_window: "main".to_string(),
                window_urls: HashMap::new(),
                redirects: HashMap::new(),
                actions: Vec::new(),
                fail_screenshot: false,
            }),
            click_hooks: Mutex::new(HashMap::new()),
            find_hooks: Mutex::new(HashMap::new()),
            focused: Mutex::new(None),
        }
    }

    pub fn with_page<R>(&self, f: impl FnOnce(&mut FakePage) -> R) -> R {
        f(&mut *self.page.lock().unwrap())
    }

    pub fn put(&self, locator: &Locator, element: FakeElement) {
        self.with_page(|p| p.put(locator, element));
    }

    /// 点击该定位器下任意元素后执行
    pub fn on_click(
        &self,
        locator: &Locator,
        hook: impl FnMut(&mut FakePage) -> DriverResult<()> + Send + 'static,
    ) {
        self.click_hooks
            .lock()
            .unwrap()
            .insert(locator.clone(), Box::new(hook));
    }

    /// 每次查询该定位器之前执行
    pub fn on_find(&self, locator: &Locator, hook: impl FnMut(&mut FakePage) + Send + 'static) {
        self.find_hooks
            .lock()
            .unwrap()
            .insert(locator.clone(), Box::new(hook));
    }

    pub fn actions(&self) -> Vec<FakeAction> {
        self.with_page(|p| p.actions.clone())
    }

    pub fn clicks_on(&self, locator: &Locator) -> usize {
        self.actions()
            .iter()
            .filter(|a| matches!(a, FakeAction::Click(h, _) if &h.locator == locator))
            .count()
    }

    pub fn typed_texts(&self) -> Vec<String> {
        self.actions()
            .into_iter()
            .filter_map(|a| match a {
                FakeAction::Type(_, text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn value_of(&self, locator: &Locator) -> Option<String> {
        self.with_page(|p| p.first_value(locator))
    }

    fn record(&self, action: FakeAction) {
        self.with_page(|p| p.actions.push(action));
    }
}

#[async_trait]
impl UiDriver for FakeDriver {
    async fn navigate(&self, url: &str) -> DriverResult<()> {
        self.with_page(|p| {
            p.actions.push(FakeAction::Navigate(url.to_string()));
            p.url = p.redirects.get(url).cloned().unwrap_or_else(|| url.to_string());
        });
        Ok(())
    }

    /// 当前窗口已关闭时和真实浏览器一样报错
    async fn current_url(&self) -> DriverResult<String> {
        self.with_page(|p| {
            if p.windows.contains(&p.current_window) {
                Ok(p.url.clone())
            } else {
                Err(DriverError::Protocol(format!("窗口已关闭: {}", p.current_window)))
            }
        })
    }

    async fn find_all(&self, locator: &Locator) -> DriverResult<Vec<ElementInfo>> {
        let mut page = self.page.lock().unwrap();
        if let Some(hook) = self.find_hooks.lock().unwrap().get_mut(locator) {
            hook(&mut *page);
        }
        Ok(page
            .elements
            .get(locator)
            .map(|els| {
                els.iter()
                    .enumerate()
                    .map(|(index, e)| ElementInfo {
                        handle: ElementHandle::new(locator.clone(), index),
                        visible: e.visible,
                        enabled: e.enabled,
                        width: e.width,
                        height: e.height,
                        attributes: e.attributes.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn hover(&self, element: &ElementHandle) -> DriverResult<()> {
        self.with_page(|p| p.element_mut(element).map(|_| ()))?;
        self.record(FakeAction::Hover(element.clone()));
        Ok(())
    }

    async fn click(&self, element: &ElementHandle, mode: ClickMode) -> DriverResult<()> {
        let mut page = self.page.lock().unwrap();
        let el = page.element_mut(element)?;
        if mode == ClickMode::Direct && el.intercept_direct_click {
            return Err(DriverError::ClickIntercepted {
                locator: element.to_string(),
                by: "div".to_string(),
            });
        }
        let removed = el.removed_on_click;
        page.actions.push(FakeAction::Click(element.clone(), mode));
        if removed {
            if let Some(els) = page.elements.get_mut(&element.locator) {
                els.remove(element.index);
            }
        }
        *self.focused.lock().unwrap() = Some(element.clone());
        if let Some(hook) = self.click_hooks.lock().unwrap().get_mut(&element.locator) {
            hook(&mut *page)?;
        }
        Ok(())
    }

    async fn type_text(&self, element: &ElementHandle, text: &str) -> DriverResult<()> {
        self.with_page(|p| {
            let el = p.element_mut(element)?;
            if el.reject_typing || !el.visible {
                return Err(DriverError::not_interactable(element));
            }
            el.value.push_str(text);
            p.actions.push(FakeAction::Type(element.clone(), text.to_string()));
            Ok(())
        })?;
        *self.focused.lock().unwrap() = Some(element.clone());
        Ok(())
    }

    async fn press_key(&self, element: Option<&ElementHandle>, key: Key) -> DriverResult<()> {
        let target = match element {
            Some(el) => Some(el.clone()),
            None => self.focused.lock().unwrap().clone(),
        };
        self.with_page(|p| {
            if let Some(handle) = &target {
                if let Ok(el) = p.element_mut(handle) {
                    if element.is_some() && el.reject_typing {
                        return Err(DriverError::not_interactable(handle));
                    }
                    match key {
                        Key::SelectAll => el.selected = true,
                        Key::Backspace if el.selected => {
                            el.value.clear();
                            el.selected = false;
                        }
                        Key::Backspace => {
                            el.value.pop();
                        }
                        _ => {}
                    }
                }
            }
            p.actions.push(FakeAction::Key(element.cloned(), key));
            Ok(())
        })
    }

    async fn execute_script(&self, script: &str, args: &[JsonValue]) -> DriverResult<JsonValue> {
        self.with_page(|p| {
            p.actions.push(FakeAction::Script(script.to_string()));
            // 模拟脚本赋值：arguments[0] 是元素，arguments[1] 是文本
            if script.contains("dispatchEvent") {
                let handle: ElementHandle = args
                    .first()
                    .and_then(|a| a.get("__element"))
                    .cloned()
                    .map(serde_json::from_value)
                    .transpose()?
                    .ok_or_else(|| DriverError::Script("缺少元素参数".to_string()))?;
                let text = args.get(1).and_then(|v| v.as_str()).unwrap_or_default();
                p.element_mut(&handle)?.value = text.to_string();
            }
            Ok(JsonValue::Null)
        })
    }

    async fn page_source(&self) -> DriverResult<String> {
        Ok(self.with_page(|p| format!("<html><!-- {} --></html>", p.url)))
    }

    async fn screenshot(&self) -> DriverResult<Vec<u8>> {
        if self.with_page(|p| p.fail_screenshot) {
            return Err(DriverError::Protocol("截图失败".to_string()));
        }
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    async fn window_handles(&self) -> DriverResult<Vec<String>> {
        Ok(self.with_page(|p| p.windows.clone()))
    }

    async fn switch_to_window(&self, handle: &str) -> DriverResult<()> {
        self.with_page(|p| {
            if !p.windows.iter().any(|w| w == handle) {
                return Err(DriverError::NotFound {
                    locator: format!("window={}", handle),
                });
            }
            p.actions.push(FakeAction::SwitchWindow(handle.to_string()));
            p.current_window = handle.to_string();
            if let Some(url) = p.window_urls.get(handle) {
                p.url = url.clone();
            }
            Ok(())
        })
    }
}
