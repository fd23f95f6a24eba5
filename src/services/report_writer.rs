//! 批处理报告写入服务 - 业务能力层
//!
//! 只负责把批处理结果追加到报告文件

use anyhow::Result;
use std::fs::OpenOptions;
use std::io::Write;
use tracing::debug;

use crate::orchestrator::BatchReport;

pub struct ReportWriter {
    report_file_path: String,
}

impl ReportWriter {
    pub fn new() -> Self {
        Self {
            report_file_path: "batch_report.txt".to_string(),
        }
    }

    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            report_file_path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.report_file_path
    }

    /// 追加一次批处理的结果
    pub async fn write(&self, report: &BatchReport) -> Result<()> {
        debug!(
            "写入批处理报告: {} | 共 {} 个订单",
            self.report_file_path, report.total_count
        );

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.report_file_path)?;

        file.write_all(render(report).as_bytes())?;

        Ok(())
    }
}

impl Default for ReportWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// 报告文本
pub fn render(report: &BatchReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "==== {} | 成功 {}/{} | 失败 {} | 未执行 {}{} ====\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        report.success_count,
        report.total_count,
        report.failure_count,
        report.skipped_count,
        if report.stopped { " | 已停止" } else { "" }
    ));
    for entry in &report.results {
        out.push_str(&format!(
            "{} #{} {} | {}\n",
            if entry.success { "✓" } else { "✗" },
            entry.index + 1,
            entry.order.label(),
            entry.message
        ));
    }
    out.push('\n');
    out
}
