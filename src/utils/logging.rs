/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::orchestrator::BatchReport;

/// 初始化 tracing 日志
///
/// 默认级别为 `info`，`verbose` 时为 `debug`；设置了 `RUST_LOG` 时以其为准。
/// 重复调用不会报错（测试中会多次调用）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("auto_order={default_level},warn")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 自动下单模式");
    info!("🌐 浏览器端点: {}", config.browser_endpoint());
    if config.dry_run {
        info!("🧪 试运行模式：不会点击加入购物车");
    }
    info!("{}", "=".repeat(60));
}

/// 记录订单加载信息
pub fn log_orders_loaded(total: usize, source: &str) {
    info!("✓ 从 {} 加载了 {} 个订单", source, total);
    info!("💡 订单将按顺序逐个执行\n");
}

/// 打印最终统计信息
pub fn print_final_stats(report: &BatchReport, report_file: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 批处理统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", report.success_count, report.total_count);
    info!("❌ 失败: {}", report.failure_count);
    if report.skipped_count > 0 {
        info!("⏸️ 未执行: {}", report.skipped_count);
    }
    for entry in report.results.iter().filter(|r| !r.success) {
        info!(
            "  ✗ #{} {}: {}",
            entry.index + 1,
            entry.order.label(),
            truncate_text(&entry.message, 80)
        );
    }
    info!("{}", "=".repeat(60));
    info!("\n报告已保存至: {}", report_file);
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
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
