use anyhow::Context;
use indexmap::IndexMap;
use serde_json::{Map, Value as Json};

use crate::{
    block::Block,
    config::InstanceConfig,
    service::{DEFAULT_SERVICE_TYPE, Service},
    transport::{RestClient, Transport},
};

/// A running n.io instance.
///
/// All communication with the instance goes through this facade. The block
/// types, blocks and services are snapshots taken by [`Instance::reset`];
/// adding or copying through the facade keeps them current.
#[derive(Debug)]
pub struct Instance<T: Transport = RestClient> {
    transport: T,
    /// Prototype block per block type, holding the template defaults.
    pub blocks_types: IndexMap<String, Block>,
    pub blocks: IndexMap<String, Block>,
    pub services: IndexMap<String, Service>,
}

impl Instance<RestClient> {
    /// Connect over REST and load the current state.
    pub fn connect(config: &InstanceConfig) -> anyhow::Result<Self> {
        info!("connecting to n.io instance at {}", config.base_url());
        Self::new(RestClient::new(config)?)
    }
}

impl<T: Transport> Instance<T> {
    pub fn new(transport: T) -> anyhow::Result<Self> {
        let mut instance = Self {
            transport,
            blocks_types: IndexMap::new(),
            blocks: IndexMap::new(),
            services: IndexMap::new(),
        };
        instance.reset()?;
        Ok(instance)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Reload block types, blocks and services from the instance.
    ///
    /// The previous snapshot is kept if any document fails to load.
    pub fn reset(&mut self) -> anyhow::Result<()> {
        let blocks_types = self.load_blocks_types()?;
        let blocks = self.load_blocks(&blocks_types)?;
        let services = self.load_services()?;
        debug!(
            "loaded {} block types, {} blocks, {} services",
            blocks_types.len(),
            blocks.len(),
            services.len()
        );

        self.blocks_types = blocks_types;
        self.blocks = blocks;
        self.services = services;
        Ok(())
    }

    fn fetch_mapping(&self, path: &str) -> anyhow::Result<Map<String, Json>> {
        match self.transport.fetch(path)? {
            Json::Object(map) => Ok(map),
            Json::Null => Ok(Map::new()),
            other => bail!("`{path}` is not a mapping: {other}"),
        }
    }

    fn load_blocks_types(&self) -> anyhow::Result<IndexMap<String, Block>> {
        self.fetch_mapping("blocks_types")?
            .iter()
            .map(|(block_type, template)| -> anyhow::Result<(String, Block)> {
                Ok((block_type.clone(), Block::from_template(block_type, template)?))
            })
            .collect()
    }

    fn load_blocks(
        &self,
        blocks_types: &IndexMap<String, Block>,
    ) -> anyhow::Result<IndexMap<String, Block>> {
        let mut blocks = IndexMap::new();
        for (name, doc) in self.fetch_mapping("blocks")? {
            let doc = doc
                .as_object()
                .ok_or_else(|| anyhow!("block `{name}` is not a mapping"))?;
            let block_type = doc
                .get("type")
                .and_then(Json::as_str)
                .ok_or_else(|| anyhow!("block `{name}` has no type"))?;
            let prototype = blocks_types
                .get(block_type)
                .ok_or_else(|| anyhow!("block `{name}` has unknown type `{block_type}`"))?;

            let mut block = prototype.copy(name.as_str());
            block.apply(doc)?;
            blocks.insert(name, block);
        }
        Ok(blocks)
    }

    fn load_services(&self) -> anyhow::Result<IndexMap<String, Service>> {
        let mut services = IndexMap::new();
        for (key, doc) in self.fetch_mapping("services")? {
            let doc = doc
                .as_object()
                .ok_or_else(|| anyhow!("service `{key}` is not a mapping"))?;
            let service = Service::from_json(&key, doc);
            services.insert(service.name.clone(), service);
        }
        Ok(services)
    }

    /// Version information of the instance.
    pub fn nio(&self) -> anyhow::Result<Json> {
        self.transport.fetch("nio")
    }

    /// Save a block to the instance.
    pub fn add_block(&mut self, block: Block) -> anyhow::Result<&Block> {
        block.save(&self.transport)?;
        let (index, _) = self.blocks.insert_full(block.name.clone(), block);
        Ok(&self.blocks[index])
    }

    /// Save a service to the instance.
    pub fn add_service(&mut self, service: Service) -> anyhow::Result<&Service> {
        service.save(&self.transport)?;
        let (index, _) = self.services.insert_full(service.name.clone(), service);
        Ok(&self.services[index])
    }

    /// Create a block of a known type, apply `config` and save it.
    pub fn create_block(
        &mut self,
        name: &str,
        block_type: &str,
        config: &Map<String, Json>,
    ) -> anyhow::Result<&Block> {
        let prototype = self
            .blocks_types
            .get(block_type)
            .ok_or_else(|| anyhow!("unknown block type `{block_type}`"))?;
        let mut block = prototype.copy(name);
        block.apply(config)?;
        self.add_block(block)
    }

    /// Create a service and save it.
    pub fn create_service(
        &mut self,
        name: &str,
        service_type: Option<&str>,
        config: &Map<String, Json>,
    ) -> anyhow::Result<&Service> {
        let mut service = Service::from_json(name, config);
        service.name = name.to_string();
        service.service_type = service_type.unwrap_or(DEFAULT_SERVICE_TYPE).to_string();
        self.add_service(service)
    }

    /// Delete every block and service on the instance, then reload.
    ///
    /// Works from the raw listings, so documents that do not load are
    /// removed too. Services are stopped before they are deleted.
    pub fn delete_all(&mut self) -> anyhow::Result<()> {
        warn!("deleting all blocks and services");
        let blocks = self.fetch_mapping("blocks")?;
        let services = self.fetch_mapping("services")?;

        for name in blocks.keys() {
            self.transport.remove(&format!("blocks/{name}"))?;
        }
        for name in services.keys() {
            self.transport.fetch(&format!("services/{name}/stop"))?;
            self.transport.remove(&format!("services/{name}"))?;
        }
        self.reset()
    }

    /// Copy a block, typically from another instance, onto this one.
    ///
    /// An existing block of the same name is only replaced with `overwrite`.
    pub fn copy_block(&mut self, block: &Block, overwrite: bool) -> anyhow::Result<&Block> {
        if !overwrite && self.blocks.contains_key(&block.name) {
            bail!("block `{}` already exists", block.name);
        }
        self.add_block(block.clone())
    }

    /// Copy a service together with the blocks it executes.
    ///
    /// Without `overwrite` nothing is copied when the service or any of the
    /// blocks already exists here.
    pub fn copy_service(
        &mut self,
        service: &Service,
        blocks: &[Block],
        overwrite: bool,
    ) -> anyhow::Result<(Service, Vec<Block>)> {
        if !overwrite {
            if self.services.contains_key(&service.name) {
                bail!("service `{}` already exists", service.name);
            }
            let clashing: Vec<&str> = blocks
                .iter()
                .filter(|b| self.blocks.contains_key(&b.name))
                .map(|b| b.name.as_str())
                .collect();
            if !clashing.is_empty() {
                bail!(
                    "some blocks from service `{}` already exist: {}",
                    service.name,
                    clashing.join(", ")
                );
            }
        }

        let copied = blocks
            .iter()
            .map(|block| self.copy_block(block, true).cloned())
            .collect::<anyhow::Result<Vec<_>>>()
            .with_context(|| format!("can not copy blocks of service `{}`", service.name))?;
        let service = self.add_service(service.clone())?.clone();
        Ok((service, copied))
    }

    /// Blocks on this instance that `service` executes.
    pub fn service_blocks(&self, service: &Service) -> anyhow::Result<Vec<Block>> {
        service
            .block_names()
            .iter()
            .map(|name| {
                self.blocks.get(name).cloned().ok_or_else(|| {
                    anyhow!("service `{}` uses unknown block `{name}`", service.name)
                })
            })
            .collect()
    }
}
