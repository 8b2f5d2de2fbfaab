//! Link targets for cross-references: anchors, hrefs, and detection of
//! references that point outside the project.

/// `module.html` or `module.html#anchor`.
pub fn href(module: &str, item: Option<&str>) -> String {
    match item {
        Some(item) => format!("{}.html#{}", module, anchor(item)),
        None => format!("{}.html", module),
    }
}

/// Anchor for an item name.
///
/// - keep alphanumerics, `_`, `-` and `.`
/// - method separators (`:`) become `.`
/// - spaces become `-`
/// - everything else is dropped
pub fn anchor(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            c if c.is_alphanumeric() || c == '_' || c == '-' || c == '.' => out.push(c),
            ':' => out.push('.'),
            ' ' => out.push('-'),
            _ => {}
        }
    }
    out
}

/// References that are links already and are never resolved against the
/// item index: relative paths, URLs and markdown links.
pub fn is_external(text: &str) -> bool {
    text.starts_with('/')
        || text.starts_with("./")
        || text.starts_with("../")
        || contains_markdown_link(text)
        || text.contains("://")
}

/// Check if text contains a markdown link `[...](...)`.
fn contains_markdown_link(text: &str) -> bool {
    let mut rest = text;
    while let Some(open) = rest.find('[') {
        let after_open = &rest[open + 1..];
        match after_open.find(']') {
            Some(close) if after_open[close + 1..].starts_with('(') => return true,
            Some(_) => rest = after_open,
            None => return false,
        }
    }
    false
}
