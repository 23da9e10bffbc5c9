use nioprops::{AttrDict, Shape, Value};
use serde_json::{Map, Value as Json};

use crate::transport::Transport;

/// Service type used when a document does not name one.
pub const DEFAULT_SERVICE_TYPE: &str = "Service";

/// A service on an instance.
///
/// Service configuration has no template, so it is kept in an open
/// container.
#[derive(Debug, Clone, PartialEq)]
pub struct Service {
    pub name: String,
    pub service_type: String,
    pub config: AttrDict,
}

impl Service {
    pub fn new(name: impl Into<String>, service_type: impl Into<String>, config: AttrDict) -> Self {
        Self {
            name: name.into(),
            service_type: service_type.into(),
            config,
        }
    }

    /// Build from a service document as served by the instance.
    ///
    /// `fallback_name` is used when the document carries no `name`.
    pub fn from_json(fallback_name: &str, doc: &Map<String, Json>) -> Self {
        let name = doc
            .get("name")
            .and_then(Json::as_str)
            .unwrap_or(fallback_name);
        let service_type = doc
            .get("type")
            .and_then(Json::as_str)
            .unwrap_or(DEFAULT_SERVICE_TYPE);
        let settings: Map<String, Json> = doc
            .iter()
            .filter(|(key, _)| !matches!(key.as_str(), "name" | "type"))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Self::new(name, service_type, AttrDict::from_json(Shape::Open, &settings))
    }

    /// Names of the blocks listed in the service's `execution`.
    pub fn block_names(&self) -> Vec<String> {
        let execution = match self.config.get("execution") {
            Ok(Value::Seq(items)) => items,
            _ => return Vec::new(),
        };
        execution
            .iter()
            .filter_map(|item| item.as_dict()?.get("name").ok())
            .filter_map(|name| name.as_str().map(str::to_string))
            .collect()
    }

    pub fn to_json(&self) -> Json {
        let mut doc = Map::new();
        doc.insert("name".to_string(), Json::String(self.name.clone()));
        doc.insert("type".to_string(), Json::String(self.service_type.clone()));
        doc.extend(self.config.to_map());
        Json::Object(doc)
    }

    pub fn path(&self) -> String {
        format!("services/{}", self.name)
    }

    pub fn save(&self, transport: &dyn Transport) -> anyhow::Result<()> {
        debug!("saving service {}", self.name);
        transport.send(&self.path(), &self.to_json())?;
        Ok(())
    }

    pub fn delete(&self, transport: &dyn Transport) -> anyhow::Result<()> {
        debug!("deleting service {}", self.name);
        transport.remove(&self.path())
    }

    pub fn start(&self, transport: &dyn Transport) -> anyhow::Result<()> {
        info!("starting service {}", self.name);
        transport.fetch(&format!("{}/start", self.path()))?;
        Ok(())
    }

    pub fn stop(&self, transport: &dyn Transport) -> anyhow::Result<()> {
        info!("stopping service {}", self.name);
        transport.fetch(&format!("{}/stop", self.path()))?;
        Ok(())
    }
}
