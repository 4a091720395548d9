//! Static view descriptors and the registry they live in

use crate::error::{NavError, NavResult};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Category a view is displayed on. Determines its container and z base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Background,
    Panel,
    Hud,
    Dialog,
    Tooltip,
}

impl Layer {
    pub const ALL: [Layer; 5] = [
        Layer::Background,
        Layer::Panel,
        Layer::Hud,
        Layer::Dialog,
        Layer::Tooltip,
    ];

    /// Which navigation container manages this layer
    pub fn container_kind(self) -> ContainerKind {
        match self {
            Layer::Panel | Layer::Dialog => ContainerKind::Stack,
            Layer::Background | Layer::Hud | Layer::Tooltip => ContainerKind::List,
        }
    }

    pub fn default_z_base(self) -> i32 {
        match self {
            Layer::Background => 0,
            Layer::Panel => 1000,
            Layer::Hud => 2000,
            Layer::Dialog => 3000,
            Layer::Tooltip => 4000,
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Layer::Background => "background",
            Layer::Panel => "panel",
            Layer::Hud => "hud",
            Layer::Dialog => "dialog",
            Layer::Tooltip => "tooltip",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Layer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Layer::ALL
            .into_iter()
            .find(|layer| layer.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown layer '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// LIFO navigation, only the top is enabled
    Stack,
    /// Independent parallel views
    List,
}

/// How the visual node of a view is obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStrategy {
    /// Instantiate from a resource through the asset loader
    Lazy { resource: String },

    /// Node is pre-placed under the parent's node
    External,
}

/// What happens to an instance once it leaves its container
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosePolicy {
    /// Tear down and release the node
    #[default]
    Destroy,

    /// Keep the instance in the pool for reuse
    Retain,
}

/// Parent binding of a child view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentLink {
    pub parent: String,
    pub load_with_parent: bool,
}

/// Immutable configuration of one view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewDescriptor {
    pub name: String,
    pub layer: Layer,
    pub load: LoadStrategy,
    pub close: ClosePolicy,
    pub animated: bool,
    pub parent: Option<ParentLink>,
    /// Controller is supplied by the script bridge instead of a native type
    pub scripted: bool,
}

impl ViewDescriptor {
    /// Lazily loaded view whose resource key equals its name
    pub fn new(name: impl Into<String>, layer: Layer) -> Self {
        let name = name.into();
        Self {
            load: LoadStrategy::Lazy { resource: name.clone() },
            name,
            layer,
            close: ClosePolicy::Destroy,
            animated: false,
            parent: None,
            scripted: false,
        }
    }

    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.load = LoadStrategy::Lazy { resource: resource.into() };
        self
    }

    pub fn external(mut self) -> Self {
        self.load = LoadStrategy::External;
        self
    }

    pub fn close_policy(mut self, close: ClosePolicy) -> Self {
        self.close = close;
        self
    }

    pub fn retain(self) -> Self {
        self.close_policy(ClosePolicy::Retain)
    }

    pub fn animated(mut self, animated: bool) -> Self {
        self.animated = animated;
        self
    }

    pub fn child_of(mut self, parent: impl Into<String>, load_with_parent: bool) -> Self {
        self.parent = Some(ParentLink {
            parent: parent.into(),
            load_with_parent,
        });
        self
    }

    pub fn scripted(mut self, scripted: bool) -> Self {
        self.scripted = scripted;
        self
    }

    pub fn parent_name(&self) -> Option<&str> {
        self.parent.as_ref().map(|link| link.parent.as_str())
    }

    pub fn loads_with_parent(&self) -> bool {
        self.parent.as_ref().is_some_and(|link| link.load_with_parent)
    }
}

/// Name → descriptor table. Built once, read-only afterwards.
#[derive(Debug, Default)]
pub struct DescriptorRegistry {
    descriptors: HashMap<String, Arc<ViewDescriptor>>,
    /// Registration order, for stable iteration
    order: Vec<String>,
    children: HashMap<String, Vec<String>>,
}

impl DescriptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new descriptor
    ///
    /// Returns an error if a descriptor with the same name is already registered
    pub fn register(&mut self, descriptor: ViewDescriptor) -> NavResult<()> {
        if self.descriptors.contains_key(&descriptor.name) {
            return Err(NavError::DuplicateName(descriptor.name));
        }
        debug!("Registered view: {} ({})", descriptor.name, descriptor.layer);
        self.order.push(descriptor.name.clone());
        self.descriptors
            .insert(descriptor.name.clone(), Arc::new(descriptor));
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> NavResult<&ViewDescriptor> {
        self.descriptors
            .get(name)
            .map(Arc::as_ref)
            .ok_or_else(|| NavError::NotFound(name.to_string()))
    }

    /// Shared handle to a descriptor, for instances that outlive the borrow
    pub fn resolve_shared(&self, name: &str) -> NavResult<Arc<ViewDescriptor>> {
        self.descriptors
            .get(name)
            .cloned()
            .ok_or_else(|| NavError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.descriptors.contains_key(name)
    }

    pub fn count(&self) -> usize {
        self.descriptors.len()
    }

    /// Build the parent → children index. Run after all registrations.
    ///
    /// Children naming an unknown parent are logged and skipped; the rest of the
    /// table stays usable. The skipped names are returned for callers that want
    /// to report them.
    pub fn link_children(&mut self) -> Vec<NavError> {
        self.children.clear();
        let mut skipped = Vec::new();

        for name in &self.order {
            let Some(parent) = self.descriptors[name].parent_name() else {
                continue;
            };
            if !self.descriptors.contains_key(parent) {
                warn!("View '{}' declares unknown parent '{}', not linked", name, parent);
                skipped.push(NavError::UnknownParent {
                    child: name.clone(),
                    parent: parent.to_string(),
                });
                continue;
            }
            self.children
                .entry(parent.to_string())
                .or_default()
                .push(name.clone());
        }

        skipped
    }

    /// Child names declared for a parent, in registration order
    pub fn children_of(&self, parent: &str) -> &[String] {
        self.children.get(parent).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All descriptors in registration order
    pub fn iter(&self) -> impl Iterator<Item = &ViewDescriptor> {
        self.order.iter().map(|name| self.descriptors[name].as_ref())
    }
}
