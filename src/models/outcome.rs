use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 单次尝试的结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStatus {
    Ok,
    /// 第 n 次尝试失败，将会重试（或转为 FAIL）
    Retry(u32),
    Fail,
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptStatus::Ok => write!(f, "OK"),
            AttemptStatus::Retry(n) => write!(f, "RETRY_{}", n),
            AttemptStatus::Fail => write!(f, "FAIL"),
        }
    }
}

impl FromStr for AttemptStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OK" => Ok(AttemptStatus::Ok),
            "FAIL" => Ok(AttemptStatus::Fail),
            other => other
                .strip_prefix("RETRY_")
                .and_then(|n| n.parse().ok())
                .map(AttemptStatus::Retry)
                .ok_or_else(|| format!("未知的状态: {}", other)),
        }
    }
}

impl Serialize for AttemptStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AttemptStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// 台账中的一行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptOutcome {
    pub timestamp: String,
    pub index: usize,
    pub title: String,
    pub status: AttemptStatus,
    pub message: String,
}
