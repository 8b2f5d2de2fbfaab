//! ldoc — extract LuaDoc-style tagged comments from Lua and C sources into
//! a module/item documentation model.
//!
//! Pipeline: [`scanner`] groups comment tokens into doc blocks, [`tags`]
//! splits each block into summary, description and tags, [`context`]
//! turns blocks into items per file, and [`resolver`] assembles modules
//! across files into a [`model::Project`].

pub mod config;
pub mod context;
pub mod error;
pub mod kinds;
pub mod links;
pub mod model;
pub mod parser;
pub mod render;
pub mod resolver;
pub mod scanner;
pub mod tags;

pub use config::Config;
pub use context::Context;
pub use error::{DocError, Result};
pub use model::{Item, Module, Project};
