use anyhow::Context;
use nioprops::{AttrDict, load_block};
use serde_json::{Map, Value as Json};

use crate::transport::Transport;

/// Keys of a block document that identify the block rather than configure it.
const IDENTITY_KEYS: [&str; 2] = ["name", "type"];

/// A block on an instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub name: String,
    pub block_type: String,
    /// Typed configuration, shaped by the block type's template.
    pub config: AttrDict,
}

impl Block {
    pub fn new(name: impl Into<String>, block_type: impl Into<String>, config: AttrDict) -> Self {
        Self {
            name: name.into(),
            block_type: block_type.into(),
            config,
        }
    }

    /// Prototype block of `block_type` holding the template defaults.
    ///
    /// The prototype is named after its type.
    pub fn from_template(block_type: &str, template: &Json) -> anyhow::Result<Self> {
        let config = load_block(template)
            .with_context(|| format!("can not load template of block type `{block_type}`"))?;
        Ok(Self::new(block_type, block_type, config))
    }

    /// Deep copy under another name.
    pub fn copy(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Write a raw block document onto the configuration.
    ///
    /// Every key goes through the typed configuration, so unknown keys and
    /// values that do not convert are rejected. Nothing is applied when one
    /// key fails.
    pub fn apply(&mut self, raw: &Map<String, Json>) -> anyhow::Result<()> {
        let settings: Map<String, Json> = raw
            .iter()
            .filter(|(key, _)| !IDENTITY_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        self.config
            .merge_json(&settings)
            .with_context(|| format!("invalid configuration for block `{}`", self.name))
    }

    /// Wire document: identity first, then the flattened configuration.
    pub fn to_json(&self) -> Json {
        let mut doc = Map::new();
        doc.insert("name".to_string(), Json::String(self.name.clone()));
        doc.insert("type".to_string(), Json::String(self.block_type.clone()));
        for (key, value) in self.config.to_map() {
            if !IDENTITY_KEYS.contains(&key.as_str()) {
                doc.insert(key, value);
            }
        }
        Json::Object(doc)
    }

    pub fn path(&self) -> String {
        format!("blocks/{}", self.name)
    }

    pub fn save(&self, transport: &dyn Transport) -> anyhow::Result<()> {
        debug!("saving block {}", self.name);
        transport.send(&self.path(), &self.to_json())?;
        Ok(())
    }

    pub fn delete(&self, transport: &dyn Transport) -> anyhow::Result<()> {
        debug!("deleting block {}", self.name);
        transport.remove(&self.path())
    }
}
