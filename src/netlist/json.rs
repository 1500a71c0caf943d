//! JSON netlist decoding
//!
//! The input is the instance graph emitted by the schematic compiler:
//! every instance is keyed by `<source file>:<root>.A.B` and tagged with its
//! kind and typed attributes.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use super::{component_uuid, Component, Module, Net, NetNode, Netlist};

/// Tagged attribute value, e.g. `{"String": "10k"}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum AttributeValue {
    String(String),
    Number(f64),
    Boolean(bool),
    Port(String),
    Array(Vec<AttributeValue>),
    Json(serde_json::Value),
}

impl AttributeValue {
    pub fn string(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn array(&self) -> Option<&[AttributeValue]> {
        match self {
            AttributeValue::Array(items) => Some(items),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum InstanceKind {
    Module,
    Component,
    Interface,
    Port,
    Pin,
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct RawInstance {
    kind: InstanceKind,
    #[serde(default)]
    attributes: BTreeMap<String, AttributeValue>,
    #[serde(default)]
    reference_designator: Option<String>,
}

impl RawInstance {
    fn string_attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(AttributeValue::string)
    }

    fn reference(&self) -> String {
        self.reference_designator
            .clone()
            .unwrap_or_else(|| "U?".to_string())
    }
}

#[derive(Debug, Deserialize)]
struct RawNet {
    #[serde(default)]
    ports: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawNetlist {
    #[serde(default)]
    instances: BTreeMap<String, RawInstance>,
    #[serde(default)]
    nets: BTreeMap<String, RawNet>,
}

/// Attributes that are never copied into component properties
const NON_PROPERTY_ATTRIBUTES: [&str; 3] = ["footprint", "value", "Value"];

/// Value attribute precedence
const VALUE_ATTRIBUTES: [&str; 4] = ["mpn", "Value", "Val", "type"];

/// Hierarchical path of an instance key, without the file prefix or `<root>`
fn instance_path(instance_ref: &str) -> String {
    let path = match instance_ref.rsplit_once(':') {
        Some((_, path)) => path,
        None => instance_ref,
    };
    let mut parts: Vec<&str> = path.split('.').collect();
    if parts.first() == Some(&"<root>") {
        parts.remove(0);
    }
    parts.join(".")
}

fn is_lib_footprint(spec: &str) -> bool {
    let Some((lib, name)) = spec.split_once(':') else {
        return false;
    };
    // drive letters such as "C:"
    if lib.len() == 1 && lib.chars().all(|c| c.is_ascii_alphabetic()) {
        return false;
    }
    let has_sep = |s: &str| s.contains('/') || s.contains('\\');
    !has_sep(lib) && !has_sep(name)
}

/// Normalize a footprint attribute into a `lib:name` spec.
///
/// A `lib:name` string is kept as-is; a file path becomes `stem:stem`.
pub fn format_footprint(spec: &str) -> String {
    if is_lib_footprint(spec) {
        return spec.to_string();
    }
    let normalized = spec.replace('\\', "/");
    match Path::new(&normalized).file_stem().and_then(|s| s.to_str()) {
        Some(stem) if !stem.is_empty() => format!("{}:{}", stem, stem),
        _ => "UNKNOWN:UNKNOWN".to_string(),
    }
}

pub(super) fn parse(content: &str) -> Result<Netlist, serde_json::Error> {
    let raw: RawNetlist = serde_json::from_str(content)?;
    let mut netlist = Netlist::new();

    for (instance_ref, instance) in &raw.instances {
        if instance.kind != InstanceKind::Module {
            continue;
        }
        let path = instance_path(instance_ref);
        if path.is_empty() {
            continue;
        }
        let layout_path = instance.string_attr("layout_path").map(str::to_string);
        tracing::info!("found module {} with layout_path {:?}", path, layout_path);
        netlist.modules.insert(path.clone(), Module { path, layout_path });
    }

    for (instance_ref, instance) in &raw.instances {
        if instance.kind != InstanceKind::Component {
            continue;
        }
        let path = instance_path(instance_ref);

        let value = VALUE_ATTRIBUTES
            .iter()
            .find_map(|name| instance.string_attr(name))
            .filter(|v| !v.is_empty())
            .unwrap_or("?")
            .to_string();

        let footprint = match instance.string_attr("footprint") {
            Some(spec) if !spec.is_empty() => format_footprint(spec),
            _ => "unknown:unknown".to_string(),
        };

        let properties = instance
            .attributes
            .iter()
            .filter(|(name, _)| !NON_PROPERTY_ATTRIBUTES.contains(&name.as_str()))
            .filter_map(|(name, value)| value.string().map(|v| (name.clone(), v.to_string())))
            .collect();

        netlist.components.push(Component {
            reference: instance.reference(),
            value,
            footprint,
            uuid: component_uuid(&path),
            path,
            properties,
        });
    }

    for (name, raw_net) in &raw.nets {
        let mut nodes = Vec::new();
        for port_ref in &raw_net.ports {
            let Some(owner) = owning_component(&raw.instances, port_ref) else {
                continue;
            };
            let pads = raw
                .instances
                .get(port_ref)
                .and_then(|port| port.attributes.get("pads"))
                .and_then(AttributeValue::array)
                .unwrap_or_default();
            for pad in pads {
                nodes.push(NetNode {
                    reference: owner.reference(),
                    pad: pad.string().unwrap_or("1").to_string(),
                });
            }
        }
        if nodes.is_empty() {
            continue;
        }
        netlist.nets.push(Net {
            name: name.clone(),
            nodes,
        });
    }

    Ok(netlist)
}

/// Nearest strict prefix of a port reference that is a component instance
fn owning_component<'a>(
    instances: &'a BTreeMap<String, RawInstance>,
    port_ref: &str,
) -> Option<&'a RawInstance> {
    port_ref
        .match_indices('.')
        .map(|(idx, _)| &port_ref[..idx])
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .filter_map(|prefix| instances.get(prefix))
        .find(|instance| instance.kind == InstanceKind::Component)
}
