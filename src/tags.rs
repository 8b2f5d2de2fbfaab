//! Tag extraction — splits a doc comment into summary, description and
//! an ordered tag table.

use regex::Regex;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::debug;

static RE_TAG_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*@(\w+)(?:\s(.*))?$").unwrap());

static RE_SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.?]\s").unwrap());

/// Whether any line of `text` is a tag line.
pub fn has_tag_line(text: &str) -> bool {
    text.lines().any(|line| RE_TAG_LINE.is_match(line))
}

// -- Tag values ---------------------------------------------------------------

/// A tag's value: scalar until the tag repeats, then a list in source order.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(untagged)]
pub enum TagValue {
    Single(String),
    List(Vec<String>),
}

impl TagValue {
    pub fn first(&self) -> &str {
        match self {
            TagValue::Single(s) => s,
            TagValue::List(l) => l.first().map(|s| s.as_str()).unwrap_or(""),
        }
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            TagValue::Single(s) => vec![s.as_str()],
            TagValue::List(l) => l.iter().map(|s| s.as_str()).collect(),
        }
    }

    fn push(&mut self, value: String) {
        match self {
            TagValue::Single(existing) => {
                let first = std::mem::take(existing);
                *self = TagValue::List(vec![first, value]);
            }
            TagValue::List(l) => l.push(value),
        }
    }
}

/// Tag table keyed by canonical name, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags(Vec<(String, TagValue)>);

impl Tags {
    /// Add a value, promoting an existing scalar to a list.
    pub fn insert(&mut self, name: &str, value: String) {
        match self.0.iter_mut().find(|(k, _)| k == name) {
            Some((_, existing)) => existing.push(value),
            None => self.0.push((name.to_string(), TagValue::Single(value))),
        }
    }

    /// Replace any existing value.
    pub fn set(&mut self, name: &str, value: String) {
        match self.0.iter_mut().find(|(k, _)| k == name) {
            Some((_, existing)) => *existing = TagValue::Single(value),
            None => self.0.push((name.to_string(), TagValue::Single(value))),
        }
    }

    pub fn get(&self, name: &str) -> Option<&TagValue> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// First value of a tag.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).map(|v| v.first())
    }

    /// All values of a tag, empty when absent.
    pub fn values(&self, name: &str) -> Vec<&str> {
        self.get(name).map(|v| v.values()).unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<TagValue> {
        let pos = self.0.iter().position(|(k, _)| k == name)?;
        Some(self.0.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TagValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy over every tag `self` does not have yet.
    pub fn fill_missing(&mut self, other: &Tags) {
        for (name, value) in other.iter() {
            if !self.contains(name) {
                self.0.push((name.to_string(), value.clone()));
            }
        }
    }
}

impl Serialize for Tags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

// -- Registry -----------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagSpec {
    /// The tag may introduce a new module.
    pub project_level: bool,
    /// `@TYPE NAME` form: sets the item's class to the tag and its name to
    /// the value.
    pub shorthand: bool,
}

/// Known tags and aliases.
#[derive(Debug, Clone)]
pub struct TagRegistry {
    tags: BTreeMap<String, TagSpec>,
    aliases: BTreeMap<String, String>,
}

const PLAIN_TAGS: &[&str] = &[
    "param", "tparam", "return", "treturn", "see", "usage", "name", "class", "field", "tfield",
    "local", "raise", "author", "copyright", "license", "release", "within", "export",
];

impl Default for TagRegistry {
    fn default() -> Self {
        let mut registry = Self {
            tags: BTreeMap::new(),
            aliases: BTreeMap::new(),
        };
        for tag in PLAIN_TAGS {
            registry.add(tag, TagSpec::default());
        }
        for kind in ["function", "table"] {
            registry.add(kind, TagSpec { project_level: false, shorthand: true });
        }
        for kind in ["module", "script"] {
            registry.add(kind, TagSpec { project_level: true, shorthand: true });
        }
        registry.alias("returns", "return");
        registry.alias("params", "param");
        registry
    }
}

impl TagRegistry {
    /// Register a tag. Re-registering replaces the previous spec.
    pub fn add(&mut self, name: &str, spec: TagSpec) {
        self.tags.insert(name.to_string(), spec);
    }

    pub fn alias(&mut self, from: &str, to: &str) {
        self.aliases.insert(from.to_string(), to.to_string());
    }

    /// Canonical name for a tag as written.
    pub fn canonical<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map(|s| s.as_str()).unwrap_or(name)
    }

    pub fn spec(&self, name: &str) -> Option<TagSpec> {
        self.tags.get(name).copied()
    }

    pub fn is_project_level(&self, name: &str) -> bool {
        self.spec(name).is_some_and(|s| s.project_level)
    }
}

// -- Extraction ---------------------------------------------------------------

/// Result of extracting one doc comment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    pub summary: String,
    pub description: String,
    pub tags: Tags,
    /// First project-level tag in the block (`module`, `script`, ...).
    pub project: Option<String>,
}

impl Extracted {
    pub fn project_tag(&self) -> Option<&str> {
        self.project.as_deref()
    }

    /// True when the block has neither text nor tags.
    pub fn is_blank(&self) -> bool {
        self.summary.is_empty() && self.description.is_empty() && self.tags.is_empty()
    }
}

/// Split raw doc text into summary, description and tags.
pub fn extract(text: &str, registry: &TagRegistry) -> Extracted {
    let mut preamble: Vec<&str> = Vec::new();
    let mut raw_tags: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if let Some(caps) = RE_TAG_LINE.captures(line) {
            let value = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            raw_tags.push((caps[1].to_string(), value.to_string()));
        } else if let Some((_, value)) = raw_tags.last_mut() {
            value.push('\n');
            value.push_str(line);
        } else {
            preamble.push(line);
        }
    }

    let (summary, description) = split_summary(preamble.join("\n").trim());
    let mut out = Extracted {
        summary,
        description,
        ..Default::default()
    };

    for (tag, value) in raw_tags {
        let name = registry.canonical(&tag);
        let value = value.trim().to_string();
        let spec = registry.spec(name);
        if registry.is_project_level(name) && out.project.is_none() {
            out.project = Some(name.to_string());
        }
        match spec {
            // project-level tags always name the module they open
            Some(s) if s.shorthand || s.project_level => {
                out.tags.set("class", name.to_string());
                // only the first word names the entity; the rest is prose
                let (entity, rest) = match value.split_once(char::is_whitespace) {
                    Some((entity, rest)) => (entity, rest.trim()),
                    None => (value.as_str(), ""),
                };
                if !entity.is_empty() {
                    out.tags.set("name", entity.to_string());
                }
                if !rest.is_empty() {
                    if !out.description.is_empty() {
                        out.description.push('\n');
                    }
                    out.description.push_str(rest);
                }
            }
            Some(_) => out.tags.insert(name, value),
            None => {
                debug!(tag = name, "unknown tag kept as extension tag");
                out.tags.insert(name, value);
            }
        }
    }

    out
}

/// Split a preamble at the first sentence terminator followed by whitespace.
pub fn split_summary(preamble: &str) -> (String, String) {
    match RE_SENTENCE_END.find(preamble) {
        Some(m) => {
            let cut = m.start() + 1;
            (
                preamble[..cut].trim().to_string(),
                preamble[cut..].trim().to_string(),
            )
        }
        None => (preamble.to_string(), String::new()),
    }
}
