//! Critical-path detection.
//!
//! A path is critical when it matches any entry of [`CRITICAL_PATTERNS`],
//! case-insensitively. Directory patterns are anchored on `/` so that
//! `pkg/auth/` matches but `pkg/authoring.go` does not.

use std::sync::LazyLock;

use regex::{RegexSet, RegexSetBuilder};

/// Patterns marking security-, auth- and payment-sensitive paths.
pub static CRITICAL_PATTERNS: &[&str] = &[
    r"/auth/",
    r"/security/",
    r"/crypto/",
    r"/api/",
    r"/handler/",
    r"/controller/",
    r"/middleware/",
    r"/payment/",
    r"/billing/",
    r"/admin/",
    r"password",
    r"secret",
    r"token",
    r"credential",
];

static CRITICAL_SET: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSetBuilder::new(CRITICAL_PATTERNS)
        .case_insensitive(true)
        .build()
        .expect("critical path patterns are valid regexes")
});

/// Whether `path` lies in a critical area.
///
/// The path is matched with a leading `/` so top-level directories such as
/// `auth/login.go` count as well.
///
/// # Examples
///
/// ```
/// use stint_priority::is_critical_path;
///
/// assert!(is_critical_path("pkg/auth/handler.go"));
/// assert!(is_critical_path("pkg/store/credential_store.go"));
/// assert!(!is_critical_path("pkg/utils/helper.go"));
/// ```
pub fn is_critical_path(path: &str) -> bool {
    let anchored = format!("/{}", path.trim_start_matches('/'));
    CRITICAL_SET.is_match(&anchored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_critical_areas() {
        let critical = [
            "pkg/auth/handler.go",
            "pkg/security/validator.go",
            "pkg/crypto/encrypt.go",
            "pkg/api/routes.go",
            "pkg/handler/user.go",
            "pkg/controller/auth.go",
            "pkg/middleware/jwt.go",
            "pkg/payment/stripe.go",
            "pkg/billing/invoice.go",
            "pkg/admin/dashboard.go",
            "pkg/utils/password_helper.go",
            "pkg/config/secret_manager.go",
            "pkg/auth/token_service.go",
            "pkg/store/credential_store.go",
        ];
        for path in critical {
            assert!(is_critical_path(path), "{path} should be critical");
        }
    }

    #[test]
    fn ordinary_paths_are_not_critical() {
        let ordinary = [
            "pkg/utils/helper.go",
            "pkg/models/user.go",
            "pkg/service/email.go",
            "main.go",
            "pkg/authoring/draft.go",
        ];
        for path in ordinary {
            assert!(!is_critical_path(path), "{path} should not be critical");
        }
    }

    #[test]
    fn matching_ignores_case_and_anchors_top_level_dirs() {
        assert!(is_critical_path("src/Auth/Login.java"));
        assert!(is_critical_path("auth/login.go"));
        assert!(is_critical_path("config/API_TOKEN.txt"));
    }
}
