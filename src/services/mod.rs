//! 业务能力层
//!
//! 描述"我能做什么"：匹配选项、设置字段、推送进度、写报告。
//! 每个能力只处理单个字段或单份报告，不关心流程顺序。

pub mod matcher;
pub mod option_resolver;
pub mod report_writer;
pub mod status_sink;

pub use matcher::{is_disabled, match_candidate, MatchOutcome, MatchRule};
pub use option_resolver::{OptionResolver, Resolution, ResolverConfig};
pub use report_writer::ReportWriter;
pub use status_sink::{NullSink, StatusHub, StatusSink};
