//! Project configuration, loaded from a TOML file (`ldoc.toml`).
//!
//! ```toml
//! project = "mylib"
//! package = "src"
//! all = false
//!
//! [aliases]
//! p = "param"
//!
//! [[tags]]
//! name = "since"
//!
//! [[types]]
//! id = "event"
//! title = "Events"
//! child_title = "Payload"
//!
//! [extensions]
//! rockspec = "lua"
//! ```

use crate::error::{DocError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default config file name looked up in the working directory.
pub const DEFAULT_FILE: &str = "ldoc.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project title written to the output.
    pub project: Option<String>,
    /// Package root used to derive module names from paths.
    pub package: Option<PathBuf>,
    /// Keep local functions in the output.
    pub all: bool,
    /// Output format (`json`).
    pub format: Option<String>,
    /// Tag aliases, `alias = "canonical"`.
    pub aliases: BTreeMap<String, String>,
    pub tags: Vec<TagConfig>,
    /// New item/module kinds, each also usable as a `@TYPE NAME` tag.
    pub types: Vec<TypeConfig>,
    /// Extra module sections without a shorthand tag.
    pub sections: Vec<SectionConfig>,
    /// File extension to language name.
    pub extensions: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagConfig {
    pub name: String,
    #[serde(default)]
    pub project: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeConfig {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub project: bool,
    pub child_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionConfig {
    pub id: String,
    pub title: String,
    pub child_title: Option<String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `ldoc.toml` from `dir` if present.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(DEFAULT_FILE);
        if path.is_file() {
            Self::load(&path).map(Some)
        } else {
            Ok(None)
        }
    }

    fn validate(&self) -> Result<()> {
        if let Some(format) = self.format.as_deref() {
            if format != "json" {
                return Err(DocError::Config(format!("unknown format '{}'", format)));
            }
        }
        for ty in &self.types {
            if ty.id.is_empty() || ty.title.is_empty() {
                return Err(DocError::Config("types need an id and a title".to_string()));
            }
        }
        for (from, to) in &self.aliases {
            if from == to {
                return Err(DocError::Config(format!("alias '{}' maps to itself", from)));
            }
        }
        Ok(())
    }
}
