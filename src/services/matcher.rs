//! 选项文本匹配
//!
//! 纯函数，不接触页面。规则按顺序尝试，先命中者胜出：
//! 1. 文本或值完全相同
//! 2. 去掉引号、角分符号、度数符号后忽略大小写相同
//! 3. 候选文本以期望值开头（排除自我重复的情况）
//! 4. 关键词全部包含
//! 5. 去掉末尾的 Long / Short / Standard 后关键词全部包含
//!
//! 只在可见候选项中匹配。

use crate::infrastructure::Candidate;

/// 命中的规则
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    Exact,
    Normalized,
    Prefix,
    Keywords,
    QualifierStripped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// `position` 是候选项在切片中的位置
    Matched { position: usize, rule: MatchRule },
    NoMatch,
}

/// 透明度低于此值视为不可选
pub const DISABLED_OPACITY: f64 = 0.5;

const COSMETIC_GLYPHS: &[char] = &[
    '\'', '"', '`', '´', '‘', '’', '“', '”', '′', '″', '°', 'º',
];

const SIZE_QUALIFIERS: &[&str] = &["long", "short", "standard"];

pub fn match_candidate(candidates: &[Candidate], requested: &str) -> MatchOutcome {
    let requested = requested.trim();
    if requested.is_empty() {
        return MatchOutcome::NoMatch;
    }

    let visible: Vec<(usize, &Candidate)> = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| c.visible)
        .collect();

    let first = |rule: MatchRule, hit: &dyn Fn(&Candidate) -> bool| {
        visible
            .iter()
            .find(|(_, c)| hit(c))
            .map(|(position, _)| MatchOutcome::Matched {
                position: *position,
                rule,
            })
    };

    if let Some(m) = first(MatchRule::Exact, &|c| {
        c.text.trim() == requested || c.value.as_deref().map(str::trim) == Some(requested)
    }) {
        return m;
    }

    let normalized = strip_cosmetic(requested);
    if !normalized.is_empty() {
        if let Some(m) = first(MatchRule::Normalized, &|c| {
            strip_cosmetic(&c.text) == normalized
                || c.value.as_deref().map(strip_cosmetic).as_deref() == Some(normalized.as_str())
        }) {
            return m;
        }
    }

    if let Some(m) = first(MatchRule::Prefix, &|c| is_clean_prefix(c.text.trim(), requested)) {
        return m;
    }

    let tokens = keywords(requested);
    if tokens.len() >= 2 {
        if let Some(m) = first(MatchRule::Keywords, &|c| contains_all(&c.text, &tokens)) {
            return m;
        }
    }

    if let Some(stripped) = strip_size_qualifier(&tokens) {
        if stripped.len() >= 2 {
            if let Some(m) = first(MatchRule::QualifierStripped, &|c| {
                contains_all(&c.text, &stripped)
            }) {
                return m;
            }
        }
    }

    MatchOutcome::NoMatch
}

/// 候选项是否不可选
pub fn is_disabled(candidate: &Candidate, container_disabled: bool) -> bool {
    container_disabled
        || candidate.control_disabled
        || candidate.opacity < DISABLED_OPACITY
        || candidate.pointer_events_none
        || candidate.marker_disabled
        || candidate.aria_disabled
}

/// 去掉装饰性符号、合并空白并转小写
pub fn strip_cosmetic(text: &str) -> String {
    text.chars()
        .filter(|c| !COSMETIC_GLYPHS.contains(c))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// 拆出关键词（小写，长度大于 1）
pub fn keywords(value: &str) -> Vec<String> {
    value
        .split(|c: char| {
            c.is_whitespace() || matches!(c, ',' | '.' | '-' | '(' | ')' | '/' | '_')
        })
        .map(|t| t.trim_matches(COSMETIC_GLYPHS).to_lowercase())
        .filter(|t| t.chars().count() > 1)
        .collect()
}

/// `text` 以 `requested` 开头，且剩余部分不是 `requested` 的重复
///
/// "34" 不应命中 "3434"，"OZ.1i" 不应命中 "OZ.1ii"。
fn is_clean_prefix(text: &str, requested: &str) -> bool {
    let Some(rest) = text.strip_prefix(requested) else {
        return false;
    };
    if rest.is_empty() || rest.starts_with(requested) {
        return false;
    }
    match requested.chars().last() {
        Some(last) => !rest.starts_with(last),
        None => false,
    }
}

fn contains_all(text: &str, tokens: &[String]) -> bool {
    let text = text.to_lowercase();
    tokens.iter().all(|t| text.contains(t.as_str()))
}

fn strip_size_qualifier(tokens: &[String]) -> Option<Vec<String>> {
    let (last, rest) = tokens.split_last()?;
    if SIZE_QUALIFIERS.contains(&last.as_str()) && !rest.is_empty() {
        Some(rest.to_vec())
    } else {
        None
    }
}
