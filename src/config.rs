//! Engine settings and the declarative view table
//!
//! Both live in one TOML document:
//!
//! ```toml
//! [engine]
//! z-spacing = 10
//! enter-track = "enter"
//!
//! [engine.layer-bases]
//! panel = 1000
//!
//! [[views]]
//! name = "inventory"
//! layer = "panel"
//! close = "retain"
//! animated = true
//!
//! [[views]]
//! name = "inventory_tabs"
//! layer = "panel"
//! parent = "inventory"
//! load = "external"
//! load-with-parent = true
//! ```

use crate::descriptor::{ClosePolicy, DescriptorRegistry, Layer, LoadStrategy, ParentLink, ViewDescriptor};
use crate::error::NavResult;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Z base of each layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerBases {
    pub background: i32,
    pub panel: i32,
    pub hud: i32,
    pub dialog: i32,
    pub tooltip: i32,
}

impl Default for LayerBases {
    fn default() -> Self {
        Self {
            background: Layer::Background.default_z_base(),
            panel: Layer::Panel.default_z_base(),
            hud: Layer::Hud.default_z_base(),
            dialog: Layer::Dialog.default_z_base(),
            tooltip: Layer::Tooltip.default_z_base(),
        }
    }
}

impl LayerBases {
    pub fn base(&self, layer: Layer) -> i32 {
        match layer {
            Layer::Background => self.background,
            Layer::Panel => self.panel,
            Layer::Hud => self.hud,
            Layer::Dialog => self.dialog,
            Layer::Tooltip => self.tooltip,
        }
    }
}

/// Engine-wide settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EngineConfig {
    /// Z distance between consecutive members of a stack or list
    pub z_spacing: i32,

    /// Z distance between a parent and each of its children
    pub child_z_step: i32,

    pub layer_bases: LayerBases,

    /// Track played when an animated view is enabled
    pub enter_track: String,

    /// Track played when an animated view is disabled
    pub exit_track: String,

    /// Stack layer targeted by a bare `pop()`
    pub default_stack_layer: Layer,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            z_spacing: 10,
            child_z_step: 1,
            layer_bases: LayerBases::default(),
            enter_track: "enter".to_string(),
            exit_track: "exit".to_string(),
            default_stack_layer: Layer::Panel,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadKind {
    #[default]
    Lazy,
    External,
}

/// One `[[views]]` row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ViewEntry {
    pub name: String,
    pub layer: Layer,

    /// Resource key for lazy loads; defaults to the view name
    #[serde(default)]
    pub resource: Option<String>,

    #[serde(default)]
    pub load: LoadKind,

    #[serde(default)]
    pub close: ClosePolicy,

    #[serde(default)]
    pub animated: bool,

    #[serde(default)]
    pub parent: Option<String>,

    #[serde(default)]
    pub load_with_parent: bool,

    #[serde(default)]
    pub scripted: bool,
}

impl ViewEntry {
    pub fn into_descriptor(self) -> ViewDescriptor {
        let load = match self.load {
            LoadKind::Lazy => LoadStrategy::Lazy {
                resource: self.resource.unwrap_or_else(|| self.name.clone()),
            },
            LoadKind::External => LoadStrategy::External,
        };

        ViewDescriptor {
            name: self.name,
            layer: self.layer,
            load,
            close: self.close,
            animated: self.animated,
            parent: self.parent.map(|parent| ParentLink {
                parent,
                load_with_parent: self.load_with_parent,
            }),
            scripted: self.scripted,
        }
    }
}

/// Parsed configuration document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewTable {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub views: Vec<ViewEntry>,
}

impl ViewTable {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).context("Failed to parse view table")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read view table {}", path.display()))?;
        Self::from_toml_str(&source).with_context(|| format!("Invalid view table {}", path.display()))
    }

    /// Register every row in order. Children are linked later by the manager.
    pub fn into_registry(self) -> NavResult<(EngineConfig, DescriptorRegistry)> {
        let mut registry = DescriptorRegistry::new();
        for entry in self.views {
            registry.register(entry.into_descriptor())?;
        }
        Ok((self.engine, registry))
    }
}
