/// 日志工具模块
///
/// 提供运行横幅和统计输出的辅助函数
use tracing::info;

use crate::config::Config;

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 作品队列提交模式");
    info!("📁 工作目录: {}", config.base_path.display());
    info!("🔁 单个作品最多尝试 {} 次", config.max_retries);
    info!("{}", "=".repeat(60));
}

/// 记录续跑位置和节奏区间
///
/// # 参数
/// - `start_index`: 从第几个作品开始（0 起）
/// - `total`: 作品总数
/// - `config`: 配置
pub fn log_resume(start_index: usize, total: usize, config: &Config) {
    info!("📌 从第 {} 个作品继续 (共 {} 个)", start_index, total);
    info!(
        "⏱️ 提交间隔随机区间: {:.0}s ~ {:.0}s",
        config.base_interval_sec + config.jitter_range.min,
        config.base_interval_sec + config.jitter_range.max
    );
}

/// 打印最终统计信息
///
/// # 参数
/// - `succeeded`: 本次成功数量
/// - `remaining`: 尚未处理的数量
/// - `halted_at`: 因重试耗尽而停止的位置
/// - `ledger_path`: 台账路径
pub fn print_final_stats(
    succeeded: usize,
    remaining: usize,
    halted_at: Option<usize>,
    ledger_path: &str,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 运行结束统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 本次成功: {}", succeeded);
    info!("⏳ 剩余未处理: {}", remaining);
    if let Some(index) = halted_at {
        info!("🛑 在第 {} 个作品处停止，下次启动会从这里重试", index);
    }
    info!("{}", "=".repeat(60));
    info!("\n台账已保存至: {}", ledger_path);
}

/// 按字符截断文本（不追加省略号）
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
pub fn truncate_chars(text: &str, max_len: usize) -> String {
    text.chars().take(max_len).collect()
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        truncate_chars(text, max_len) + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        assert_eq!(truncate_chars("가나다라", 2), "가나");
        assert_eq!(truncate_text("가나다라", 2), "가나...");
        assert_eq!(truncate_text("short", 10), "short");
    }
}
