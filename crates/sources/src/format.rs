//! Text helpers shared by the fetchers' record mappings.

use hrdesk_common::types::Role;

/// Announcement bodies are cut to this many characters in the feed.
pub const MESSAGE_PREVIEW_CHARS: usize = 100;

/// Trimmed `value`, or `default` when it is missing or blank.
pub fn or_default(value: Option<&str>, default: &str) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .to_string()
}

/// Cut `text` to `max_chars` characters, marking the cut with "...".
pub fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

/// Date part of a date or date-time string (`2024-03-01T09:00:00Z` -> `2024-03-01`).
pub fn short_date(raw: &str) -> &str {
    let raw = raw.trim();
    raw.split(['T', ' ']).next().unwrap_or(raw)
}

/// ` (from to to)`, ` (on day)` or nothing, depending on which ends are known.
pub fn date_range(start: Option<&str>, end: Option<&str>) -> String {
    let start = start.map(short_date).filter(|s| !s.is_empty());
    let end = end.map(short_date).filter(|s| !s.is_empty());
    match (start, end) {
        (Some(s), Some(e)) if s != e => format!(" ({} to {})", s, e),
        (Some(d), _) | (None, Some(d)) => format!(" ({})", d),
        (None, None) => String::new(),
    }
}

/// Role-scoped navigation target, e.g. `/hr/approvals/leaves`.
pub fn nav(role: Role, section: &str) -> String {
    format!("/{}/{}", role.path_prefix(), section)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_default() {
        assert_eq!(or_default(Some("  Payroll "), "x"), "Payroll");
        assert_eq!(or_default(Some("   "), "x"), "x");
        assert_eq!(or_default(None, "x"), "x");
    }

    #[test]
    fn test_preview_counts_chars_not_bytes() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("ééééé", 3), "ééé...");
    }

    #[test]
    fn test_date_range() {
        assert_eq!(
            date_range(Some("2024-03-01T00:00:00Z"), Some("2024-03-04")),
            " (2024-03-01 to 2024-03-04)"
        );
        assert_eq!(date_range(Some("2024-03-01"), Some("2024-03-01")), " (2024-03-01)");
        assert_eq!(date_range(None, Some("2024-03-04")), " (2024-03-04)");
        assert_eq!(date_range(None, None), "");
    }

    #[test]
    fn test_nav_is_role_scoped() {
        assert_eq!(nav(Role::Hr, "leaves"), "/hr/leaves");
        assert_eq!(nav(Role::Employee, "chat"), "/employee/chat");
    }
}
