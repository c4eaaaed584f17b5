//! Session identity normalization.
//!
//! Hosting environments recreate sessions under the same logical name with a
//! fresh numeric suffix (`proj-8` becomes `proj-29`). History is keyed on the
//! base name so a recreated session inherits its predecessor's records.

/// Strip one trailing `-<digits>` suffix from a session name.
///
/// Names that would become empty, or that end in a bare `-`, are returned
/// unchanged.
///
/// ```
/// use sentinel_core::identity::normalize_session_name;
///
/// assert_eq!(normalize_session_name("proj-29"), "proj");
/// assert_eq!(normalize_session_name("proj"), "proj");
/// ```
pub fn normalize_session_name(name: &str) -> &str {
    let Some((base, suffix)) = name.rsplit_once('-') else {
        return name;
    };
    if base.is_empty() || suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return name;
    }
    base
}

/// Strip a configured display prefix (e.g. `claude-`) from a session name.
pub fn display_name<'a>(name: &'a str, prefix: Option<&str>) -> &'a str {
    match prefix {
        Some(p) if !p.is_empty() => match name.strip_prefix(p) {
            Some(rest) if !rest.is_empty() => rest,
            _ => name,
        },
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_numeric_suffix() {
        assert_eq!(normalize_session_name("proj-8"), "proj");
        assert_eq!(normalize_session_name("proj-29"), "proj");
        assert_eq!(normalize_session_name("my-app-123"), "my-app");
    }

    #[test]
    fn test_keeps_non_numeric_suffix() {
        assert_eq!(normalize_session_name("my-app"), "my-app");
        assert_eq!(normalize_session_name("proj-v2"), "proj-v2");
        assert_eq!(normalize_session_name("proj-"), "proj-");
    }

    #[test]
    fn test_keeps_degenerate_names() {
        assert_eq!(normalize_session_name("42"), "42");
        assert_eq!(normalize_session_name("-42"), "-42");
        assert_eq!(normalize_session_name(""), "");
    }

    #[test]
    fn test_strips_only_one_suffix() {
        assert_eq!(normalize_session_name("build-2024-8"), "build-2024");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("claude-api-3", Some("claude-")), "api-3");
        assert_eq!(display_name("claude-", Some("claude-")), "claude-");
        assert_eq!(display_name("api", Some("claude-")), "api");
        assert_eq!(display_name("api", None), "api");
    }
}
