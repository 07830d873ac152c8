/// Extension to language tag, matched case-insensitively.
static LANGUAGES: &[(&[&str], &str)] = &[
    (&["go"], "go"),
    (&["py"], "python"),
    (&["js"], "javascript"),
    (&["ts"], "typescript"),
    (&["jsx"], "jsx"),
    (&["tsx"], "tsx"),
    (&["rs"], "rust"),
    (&["java"], "java"),
    (&["kt", "kts"], "kotlin"),
    (&["c"], "c"),
    (&["cpp", "cc", "cxx"], "cpp"),
    (&["h", "hpp"], "c-header"),
    (&["cs"], "csharp"),
    (&["rb"], "ruby"),
    (&["php"], "php"),
    (&["swift"], "swift"),
    (&["sh", "bash"], "shell"),
    (&["sql"], "sql"),
    (&["html", "htm"], "html"),
    (&["css"], "css"),
    (&["scss", "sass"], "scss"),
    (&["json"], "json"),
    (&["yaml", "yml"], "yaml"),
    (&["xml"], "xml"),
    (&["md", "markdown"], "markdown"),
    (&["proto"], "protobuf"),
];

/// Language tag for a path, by file extension. Unknown extensions map to
/// `"text"`.
///
/// # Examples
///
/// ```
/// use stint_git::detect_language;
///
/// assert_eq!(detect_language("src/main.rs"), "rust");
/// assert_eq!(detect_language("web/App.TSX"), "tsx");
/// assert_eq!(detect_language("Makefile"), "text");
/// ```
pub fn detect_language(path: &str) -> &'static str {
    let name = path.rsplit('/').next().unwrap_or(path);
    let Some(ext) = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) else {
        return "text";
    };
    LANGUAGES
        .iter()
        .find(|(exts, _)| exts.contains(&ext.as_str()))
        .map_or("text", |&(_, lang)| lang)
}
