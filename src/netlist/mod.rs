//! Logical netlist: components, modules and nets
//!
//! The netlist is immutable once loaded. Components carry a stable
//! identifier derived from their hierarchical path so that independent tools
//! agree on it.

mod json;

pub use json::{format_footprint, AttributeValue, InstanceKind};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

/// Errors raised while loading a netlist
#[derive(Debug, Error)]
pub enum NetlistError {
    #[error("failed to read netlist {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed netlist: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Stable identifier of a component, derived from its hierarchical path
pub fn component_uuid(path: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, path.as_bytes()).to_string()
}

/// A component to be placed on the board
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub reference: String,
    pub value: String,
    /// Footprint spec, `lib:name`
    pub footprint: String,
    /// Dotted hierarchical path
    pub path: String,
    pub uuid: String,
    pub properties: BTreeMap<String, String>,
}

impl Component {
    pub fn new(reference: impl Into<String>, path: impl Into<String>, footprint: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            reference: reference.into(),
            value: "?".to_string(),
            footprint: footprint.into(),
            uuid: component_uuid(&path),
            path,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Do-not-populate flag
    pub fn dnp(&self) -> bool {
        self.properties.contains_key("dnp")
    }
}

/// A sub-assembly instance, optionally backed by a layout fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub path: String,
    pub layout_path: Option<String>,
}

impl Module {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            layout_path: None,
        }
    }

    pub fn with_layout(mut self, layout_path: impl Into<String>) -> Self {
        self.layout_path = Some(layout_path.into());
        self
    }
}

/// One pin connected to a net
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetNode {
    pub reference: String,
    pub pad: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Net {
    pub name: String,
    pub nodes: Vec<NetNode>,
}

impl Net {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
        }
    }

    pub fn with_node(mut self, reference: impl Into<String>, pad: impl Into<String>) -> Self {
        self.nodes.push(NetNode {
            reference: reference.into(),
            pad: pad.into(),
        });
        self
    }
}

/// The full logical description of a design
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Netlist {
    pub components: Vec<Component>,
    pub nets: Vec<Net>,
    /// Modules keyed by hierarchical path
    pub modules: BTreeMap<String, Module>,
}

impl Netlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON netlist from disk
    pub fn from_file(path: &Path) -> Result<Self, NetlistError> {
        let content = std::fs::read_to_string(path).map_err(|source| NetlistError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Parse a JSON netlist
    pub fn from_json_str(content: &str) -> Result<Self, NetlistError> {
        Ok(json::parse(content)?)
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    pub fn with_module(mut self, module: Module) -> Self {
        self.modules.insert(module.path.clone(), module);
        self
    }

    pub fn with_net(mut self, net: Net) -> Self {
        self.nets.push(net);
        self
    }

    pub fn component(&self, uuid: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.uuid == uuid)
    }

    pub fn module(&self, path: &str) -> Option<&Module> {
        self.modules.get(path)
    }
}
