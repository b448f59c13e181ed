use serde::{Deserialize, Serialize};

/// 一个待提交的生成任务
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub title: String,
    /// 生成器历史上把提示词写在 `description` 列
    #[serde(alias = "promptText", alias = "description")]
    pub prompt_text: String,
}

impl WorkItem {
    pub fn new(title: impl Into<String>, prompt_text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            prompt_text: prompt_text.into(),
        }
    }
}
