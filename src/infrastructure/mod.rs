pub mod chromium_driver;
pub mod driver;

#[cfg(test)]
pub mod fake_driver;

pub use chromium_driver::ChromiumDriver;
pub use driver::{ClickMode, ElementHandle, ElementInfo, Key, Locator, UiDriver};
