//! Per-ecosystem test-file naming conventions.
//!
//! Both the scorer (does this file have tests?) and the grouper (which
//! source file does this test belong to?) read the same rule table. Adding
//! an ecosystem means adding a [`NamingRule`] to [`TEST_CONVENTIONS`].
//!
//! Paths are diff-relative and `/`-separated.

/// How a test file name is derived from its source file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affix {
    /// `dir/<stem><suffix>.<ext>`, e.g. `handler_test.go`.
    Suffix(&'static str),
    /// `dir/<prefix><stem>.<ext>`, e.g. `test_auth.py`.
    Prefix(&'static str),
    /// `dir/<name>/<stem>.<ext>`, e.g. `src/__tests__/auth.js`.
    Directory(&'static str),
}

/// One test naming rule.
#[derive(Debug, Clone, Copy)]
pub struct NamingRule {
    /// Ecosystem the rule belongs to.
    pub ecosystem: &'static str,
    /// Extensions the rule applies to.
    pub extensions: &'static [&'static str],
    /// Name transform from source to test.
    pub affix: Affix,
}

const JS_EXTENSIONS: &[&str] = &["js", "ts", "jsx", "tsx", "mjs", "cjs"];

/// The rule table, checked in order.
pub static TEST_CONVENTIONS: &[NamingRule] = &[
    NamingRule {
        ecosystem: "go",
        extensions: &["go"],
        affix: Affix::Suffix("_test"),
    },
    NamingRule {
        ecosystem: "javascript",
        extensions: JS_EXTENSIONS,
        affix: Affix::Suffix(".test"),
    },
    NamingRule {
        ecosystem: "javascript",
        extensions: JS_EXTENSIONS,
        affix: Affix::Suffix(".spec"),
    },
    NamingRule {
        ecosystem: "python",
        extensions: &["py"],
        affix: Affix::Prefix("test_"),
    },
    NamingRule {
        ecosystem: "python",
        extensions: &["py"],
        affix: Affix::Suffix("_test"),
    },
    NamingRule {
        ecosystem: "jvm",
        extensions: &["java", "kt"],
        affix: Affix::Suffix("Test"),
    },
    NamingRule {
        ecosystem: "ruby",
        extensions: &["rb"],
        affix: Affix::Suffix("_spec"),
    },
    NamingRule {
        ecosystem: "javascript",
        extensions: JS_EXTENSIONS,
        affix: Affix::Directory("__tests__"),
    },
];

/// Directory names whose contents are always treated as tests.
pub static TEST_DIRECTORIES: &[&str] = &["test", "tests", "__tests__"];

/// A path split into directory, file stem, and extension.
#[derive(Debug, Clone, Copy)]
struct PathParts<'a> {
    dir: &'a str,
    stem: &'a str,
    ext: &'a str,
}

impl<'a> PathParts<'a> {
    fn split(path: &'a str) -> Option<Self> {
        let (dir, base) = match path.rfind('/') {
            Some(idx) => (&path[..idx], &path[idx + 1..]),
            None => ("", path),
        };
        let dot = base.rfind('.')?;
        if dot == 0 {
            return None;
        }
        Some(Self {
            dir,
            stem: &base[..dot],
            ext: &base[dot + 1..],
        })
    }
}

fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

fn last_component(dir: &str) -> &str {
    dir.rsplit('/').next().unwrap_or(dir)
}

fn parent(dir: &str) -> &str {
    dir.rfind('/').map_or("", |idx| &dir[..idx])
}

impl NamingRule {
    fn applies_to(&self, ext: &str) -> bool {
        self.extensions.contains(&ext)
    }

    /// Whether the name carries the rule's affix. A bare affix such as
    /// `Test.java` or `_test.go` counts, though it maps to no source file.
    fn matches(&self, parts: PathParts<'_>) -> bool {
        self.applies_to(parts.ext)
            && match self.affix {
                Affix::Suffix(suffix) => parts.stem.ends_with(suffix),
                Affix::Prefix(prefix) => parts.stem.starts_with(prefix),
                Affix::Directory(name) => last_component(parts.dir) == name,
            }
    }

    fn source_for(&self, parts: PathParts<'_>) -> Option<String> {
        if !self.applies_to(parts.ext) {
            return None;
        }
        match self.affix {
            Affix::Suffix(suffix) => {
                let stem = parts.stem.strip_suffix(suffix)?;
                (!stem.is_empty()).then(|| join(parts.dir, &format!("{stem}.{}", parts.ext)))
            }
            Affix::Prefix(prefix) => {
                let stem = parts.stem.strip_prefix(prefix)?;
                (!stem.is_empty()).then(|| join(parts.dir, &format!("{stem}.{}", parts.ext)))
            }
            Affix::Directory(name) => (last_component(parts.dir) == name).then(|| {
                join(parent(parts.dir), &format!("{}.{}", parts.stem, parts.ext))
            }),
        }
    }

    fn test_for(&self, parts: PathParts<'_>) -> Option<String> {
        if !self.applies_to(parts.ext) {
            return None;
        }
        let (stem, ext) = (parts.stem, parts.ext);
        Some(match self.affix {
            Affix::Suffix(suffix) => join(parts.dir, &format!("{stem}{suffix}.{ext}")),
            Affix::Prefix(prefix) => join(parts.dir, &format!("{prefix}{stem}.{ext}")),
            Affix::Directory(name) => join(&join(parts.dir, name), &format!("{stem}.{ext}")),
        })
    }
}

/// Whether the file name follows a test naming rule.
///
/// # Examples
///
/// ```
/// use stint_core::conventions::is_test_name;
///
/// assert!(is_test_name("pkg/auth/handler_test.go"));
/// assert!(is_test_name("src/auth.spec.ts"));
/// assert!(is_test_name("src/test/java/Test.java"));
/// assert!(!is_test_name("pkg/auth/handler.go"));
/// ```
pub fn is_test_name(path: &str) -> bool {
    PathParts::split(path)
        .is_some_and(|parts| TEST_CONVENTIONS.iter().any(|rule| rule.matches(parts)))
}

/// Whether the file is a test, by name or by living in a test directory.
///
/// # Examples
///
/// ```
/// use stint_core::conventions::is_test_file;
///
/// assert!(is_test_file("test_auth.py"));
/// assert!(is_test_file("crates/core/tests/integration.rs"));
/// assert!(!is_test_file("src/main.rs"));
/// ```
pub fn is_test_file(path: &str) -> bool {
    if is_test_name(path) {
        return true;
    }
    let dir = path.rfind('/').map_or("", |idx| &path[..idx]);
    dir.split('/')
        .any(|component| TEST_DIRECTORIES.contains(&component))
}

/// The conventional source path for a test file, or `None` when the name
/// matches no rule.
///
/// # Examples
///
/// ```
/// use stint_core::conventions::source_path;
///
/// assert_eq!(source_path("pkg/auth/handler_test.go").as_deref(), Some("pkg/auth/handler.go"));
/// assert_eq!(source_path("src/auth.test.js").as_deref(), Some("src/auth.js"));
/// assert_eq!(source_path("src/auth.js"), None);
/// ```
pub fn source_path(test_path: &str) -> Option<String> {
    let parts = PathParts::split(test_path)?;
    TEST_CONVENTIONS
        .iter()
        .find_map(|rule| rule.source_for(parts))
}

/// Every conventional test path for a source file, in rule order.
///
/// # Examples
///
/// ```
/// use stint_core::conventions::test_candidates;
///
/// let candidates = test_candidates("pkg/auth/handler.go");
/// assert_eq!(candidates, vec!["pkg/auth/handler_test.go".to_string()]);
/// ```
pub fn test_candidates(source: &str) -> Vec<String> {
    let Some(parts) = PathParts::split(source) else {
        return Vec::new();
    };
    TEST_CONVENTIONS
        .iter()
        .filter_map(|rule| rule.test_for(parts))
        .collect()
}
