//! Public navigation facade
//!
//! [`ViewManager`] routes each call to the container that owns the view:
//! the stack or list of its layer, or the child container of its parent.
//! Navigation calls never fail loudly. Unknown names, dropped re-entrant
//! calls and abandoned loads are logged and reported as `false`.

use crate::collaborators::{AnimationPlayer, AssetLoader, NoAnimation};
use crate::config::{EngineConfig, ViewTable};
use crate::container::{LayerContainer, StackContainer};
use crate::context::UiContext;
use crate::controller::{ControllerFactory, ControllerRegistry};
use crate::descriptor::{DescriptorRegistry, Layer, ViewDescriptor};
use crate::error::NavResult;
use crate::hooks::LifecycleHook;
use crate::instance::{ViewArgs, ViewInstance, ViewSnapshot};
use crate::lifecycle::ViewState;
use crate::loader;
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;

pub struct ViewManagerBuilder {
    registry: DescriptorRegistry,
    assets: Arc<dyn AssetLoader>,
    config: EngineConfig,
    animator: Arc<dyn AnimationPlayer>,
    controllers: Arc<dyn ControllerFactory>,
    hooks: Vec<Arc<dyn LifecycleHook>>,
}

impl ViewManagerBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn animator(mut self, animator: Arc<dyn AnimationPlayer>) -> Self {
        self.animator = animator;
        self
    }

    pub fn controllers(mut self, controllers: Arc<dyn ControllerFactory>) -> Self {
        self.controllers = controllers;
        self
    }

    /// Add a lifecycle hook. Hooks run in the order they were added.
    pub fn hook(mut self, hook: Arc<dyn LifecycleHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn build(mut self) -> ViewManager {
        let unlinked = self.registry.link_children();
        if !unlinked.is_empty() {
            warn!("{} child view(s) could not be linked to a parent", unlinked.len());
        }
        info!(
            "🚀 View manager ready with {} view(s)",
            self.registry.count()
        );

        let ctx = UiContext::new(
            Arc::new(self.registry),
            self.config,
            self.assets,
            self.animator,
            self.controllers,
            self.hooks,
        );
        let containers = Layer::ALL.into_iter().map(LayerContainer::for_layer).collect();

        ViewManager {
            ctx: Arc::new(ctx),
            containers: Arc::new(containers),
        }
    }
}

/// Serialisable state of one layer
#[derive(Debug, Clone, Serialize)]
pub struct LayerSnapshot {
    pub layer: Layer,
    /// Container order, bottom to top. Stacks may list a name twice.
    pub entries: Vec<String>,
    pub views: Vec<ViewSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManagerSnapshot {
    pub layers: Vec<LayerSnapshot>,
    pub pooled: Vec<String>,
    pub active: usize,
    pub input_blocked: bool,
}

/// Cheap to clone; clones drive the same engine
#[derive(Clone)]
pub struct ViewManager {
    ctx: Arc<UiContext>,
    /// One per layer, in `Layer::ALL` order
    containers: Arc<Vec<LayerContainer>>,
}

impl ViewManager {
    pub fn builder(registry: DescriptorRegistry, assets: Arc<dyn AssetLoader>) -> ViewManagerBuilder {
        ViewManagerBuilder {
            registry,
            assets,
            config: EngineConfig::default(),
            animator: Arc::new(NoAnimation),
            controllers: Arc::new(ControllerRegistry::new()),
            hooks: Vec::new(),
        }
    }

    /// Builder preloaded with a parsed view table and its engine settings
    pub fn from_table(table: ViewTable, assets: Arc<dyn AssetLoader>) -> NavResult<ViewManagerBuilder> {
        let (config, registry) = table.into_registry()?;
        Ok(Self::builder(registry, assets).config(config))
    }

    fn container(&self, layer: Layer) -> &LayerContainer {
        &self.containers[layer as usize]
    }

    fn descriptor(&self, name: &str) -> Option<Arc<ViewDescriptor>> {
        match self.ctx.registry.resolve_shared(name) {
            Ok(descriptor) => Some(descriptor),
            Err(err) => {
                warn!("{}", err);
                None
            }
        }
    }

    /// The live parent a child operation should run against.
    /// Waits for a parent that is still loading.
    async fn parent_of(&self, descriptor: &ViewDescriptor) -> Option<Arc<ViewInstance>> {
        let parent_name = descriptor.parent_name()?;
        let Some(parent) = self.ctx.find_active(parent_name) else {
            debug!("{} is not open, ignoring {}", parent_name, descriptor.name);
            return None;
        };
        if !parent.load_settled() && !parent.wait_loaded().await {
            debug!("{} never loaded, ignoring {}", parent_name, descriptor.name);
            return None;
        }
        Some(parent)
    }

    pub async fn open(&self, name: &str, args: ViewArgs) -> bool {
        let Some(descriptor) = self.descriptor(name) else {
            return false;
        };
        if descriptor.parent.is_none() {
            return self.container(descriptor.layer).open(&self.ctx, name, args).await;
        }

        let Some(parent) = self.parent_of(&descriptor).await else {
            return false;
        };
        match parent.children() {
            Some(children) => children.open(&self.ctx, &parent, name, args).await,
            None => false,
        }
    }

    /// Close per the view's close policy
    pub async fn close(&self, name: &str) -> bool {
        let Some(descriptor) = self.descriptor(name) else {
            return false;
        };
        if descriptor.parent.is_none() {
            return self.container(descriptor.layer).close(&self.ctx, name).await;
        }

        let Some(parent) = self.parent_of(&descriptor).await else {
            return false;
        };
        match parent.children() {
            Some(children) => children.close(&self.ctx, name).await,
            None => false,
        }
    }

    /// Close and destroy regardless of close policy, including a pooled instance
    pub async fn remove(&self, name: &str) -> bool {
        let Some(descriptor) = self.descriptor(name) else {
            return false;
        };

        let removed = if descriptor.parent.is_none() {
            self.container(descriptor.layer).remove(&self.ctx, name).await
        } else {
            match self.parent_of(&descriptor).await {
                Some(parent) => match parent.children() {
                    Some(children) => children.remove(&self.ctx, name).await,
                    None => false,
                },
                None => false,
            }
        };

        match self.ctx.pool.take(name) {
            Some(pooled) => {
                pooled.destroy(&self.ctx);
                true
            }
            None => removed,
        }
    }

    /// Pop the default stack layer
    pub async fn pop(&self) -> bool {
        self.pop_layer(self.ctx.config.default_stack_layer).await
    }

    pub async fn pop_layer(&self, layer: Layer) -> bool {
        match self.container(layer).as_stack() {
            Some(stack) => stack.pop(&self.ctx).await,
            None => {
                warn!("Cannot pop {}: not a stack layer", layer);
                false
            }
        }
    }

    pub async fn pop_then_open(&self, name: &str, args: ViewArgs) -> bool {
        let Some(descriptor) = self.descriptor(name) else {
            return false;
        };
        match self.top_level_stack(&descriptor) {
            Some(stack) => stack.pop_then_open(&self.ctx, name, args).await,
            None => false,
        }
    }

    pub async fn pop_all_then_open(&self, name: &str, args: ViewArgs) -> bool {
        let Some(descriptor) = self.descriptor(name) else {
            return false;
        };
        match self.top_level_stack(&descriptor) {
            Some(stack) => stack.pop_all_then_open(&self.ctx, name, args).await,
            None => false,
        }
    }

    fn top_level_stack(&self, descriptor: &ViewDescriptor) -> Option<&StackContainer> {
        if descriptor.parent.is_some() {
            warn!("{} is a child view and cannot be stacked", descriptor.name);
            return None;
        }
        let stack = self.container(descriptor.layer).as_stack();
        if stack.is_none() {
            warn!("{} lives on {}, which is not a stack layer", descriptor.name, descriptor.layer);
        }
        stack
    }

    /// Close every sibling of a child view, then open it
    pub async fn close_all_then_open(&self, name: &str, args: ViewArgs) -> bool {
        let Some(descriptor) = self.descriptor(name) else {
            return false;
        };
        if descriptor.parent.is_none() {
            warn!("{} has no parent; close-all-then-open only applies to child views", name);
            return false;
        }

        let Some(parent) = self.parent_of(&descriptor).await else {
            return false;
        };
        match parent.children() {
            Some(children) => children.close_all_then_open(&self.ctx, &parent, name, args).await,
            None => false,
        }
    }

    /// Destroy every view in every layer, anything loaded outside a
    /// container, and everything pooled
    pub async fn clear(&self) {
        for container in self.containers.iter().rev() {
            container.clear(&self.ctx).await;
        }

        // Preloaded through load_async and never opened. Loads still in flight
        // keep their slot so the loader can finish them.
        let mut stray = Vec::new();
        self.ctx.active.lock().unwrap().retain(|_, view| {
            if view.state() == ViewState::Loading {
                return true;
            }
            stray.push(view.clone());
            false
        });
        for view in stray {
            debug!("Destroying {}, which was in no container", view.name());
            view.deactivate(&self.ctx).await;
            view.destroy(&self.ctx);
        }

        for pooled in self.ctx.pool.drain() {
            pooled.destroy(&self.ctx);
        }
        info!("🧹 Cleared all layers");
    }

    /// Load through the pipeline without opening
    pub async fn load_async(&self, name: &str) -> Option<Arc<ViewInstance>> {
        loader::load(&self.ctx, name).await
    }

    pub fn find_active(&self, name: &str) -> Option<Arc<ViewInstance>> {
        self.ctx.find_active(name)
    }

    /// Broadcast to every enabled subscriber. Returns how many were reached.
    pub fn notify(&self, event: &str, args: &[Value]) -> usize {
        self.ctx.events.notify(event, args)
    }

    pub fn layer_entries(&self, layer: Layer) -> Vec<String> {
        self.container(layer).entries()
    }

    pub fn child_entries(&self, parent: &str) -> Vec<String> {
        self.ctx
            .find_active(parent)
            .map(|view| view.child_names())
            .unwrap_or_default()
    }

    pub fn is_pooled(&self, name: &str) -> bool {
        self.ctx.pool.contains(name)
    }

    pub fn pooled(&self) -> Vec<String> {
        self.ctx.pool.names()
    }

    pub fn input_blocked(&self) -> bool {
        self.ctx.input.is_blocked()
    }

    pub fn input_block_depth(&self) -> usize {
        self.ctx.input.depth()
    }

    pub fn watch_input_block(&self) -> watch::Receiver<bool> {
        self.ctx.input.subscribe()
    }

    /// Event subscriptions currently held by enabled views
    pub fn subscriptions(&self, event: &str) -> usize {
        self.ctx.events.subscriber_count(event)
    }

    pub fn registry(&self) -> &DescriptorRegistry {
        &self.ctx.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.ctx.config
    }

    pub fn snapshot(&self) -> ManagerSnapshot {
        let layers = self
            .containers
            .iter()
            .map(|container| {
                let entries = container.entries();
                let mut unique: Vec<&str> = Vec::new();
                for name in &entries {
                    if !unique.contains(&name.as_str()) {
                        unique.push(name);
                    }
                }
                let views = unique
                    .into_iter()
                    .filter_map(|name| self.ctx.find_active(name))
                    .map(|view| view.snapshot(&self.ctx))
                    .collect();
                LayerSnapshot {
                    layer: container.layer(),
                    entries,
                    views,
                }
            })
            .collect();

        ManagerSnapshot {
            layers,
            pooled: self.pooled(),
            active: self.ctx.active_count(),
            input_blocked: self.input_blocked(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessLoader;
    use serde_json::json;

    fn manager() -> ViewManager {
        let mut registry = DescriptorRegistry::new();
        registry.register(ViewDescriptor::new("lobby", Layer::Panel)).unwrap();
        registry.register(ViewDescriptor::new("confirm", Layer::Dialog)).unwrap();
        registry
            .register(ViewDescriptor::new("minimap", Layer::Hud).retain())
            .unwrap();
        registry
            .register(ViewDescriptor::new("lobby_tab", Layer::Panel).child_of("lobby", false))
            .unwrap();
        ViewManager::builder(registry, Arc::new(HeadlessLoader::new())).build()
    }

    #[tokio::test]
    async fn test_routes_by_layer() {
        let manager = manager();

        assert!(manager.open("lobby", vec![]).await);
        assert!(manager.open("confirm", vec![]).await);
        assert!(manager.open("minimap", vec![]).await);

        assert_eq!(manager.layer_entries(Layer::Panel), ["lobby"]);
        assert_eq!(manager.layer_entries(Layer::Dialog), ["confirm"]);
        assert_eq!(manager.layer_entries(Layer::Hud), ["minimap"]);
        // Different layers never disable each other
        assert_eq!(manager.find_active("lobby").unwrap().state(), ViewState::Enabled);
        assert_eq!(manager.find_active("confirm").unwrap().z_order(), 3000);
    }

    #[tokio::test]
    async fn test_unknown_name_is_abandoned() {
        let manager = manager();
        assert!(!manager.open("ghost", vec![]).await);
        assert!(!manager.close("ghost").await);
        assert_eq!(manager.snapshot().active, 0);
    }

    #[tokio::test]
    async fn test_pop_on_list_layer_is_refused() {
        let manager = manager();
        manager.open("minimap", vec![]).await;
        assert!(!manager.pop_layer(Layer::Hud).await);
        assert!(!manager.pop_then_open("minimap", vec![]).await);
        assert_eq!(manager.layer_entries(Layer::Hud), ["minimap"]);
    }

    #[tokio::test]
    async fn test_child_routes_through_parent() {
        let manager = manager();

        // Parent not open: no effect
        assert!(!manager.open("lobby_tab", vec![]).await);
        assert!(manager.find_active("lobby_tab").is_none());

        manager.open("lobby", vec![]).await;
        assert!(manager.open("lobby_tab", vec![json!("first")]).await);
        assert_eq!(manager.child_entries("lobby"), ["lobby_tab"]);
        assert_eq!(manager.find_active("lobby_tab").unwrap().z_order(), 1001);

        assert!(manager.close("lobby_tab").await);
        assert!(manager.child_entries("lobby").is_empty());
    }

    #[tokio::test]
    async fn test_remove_evicts_pool() {
        let manager = manager();
        manager.open("minimap", vec![]).await;
        manager.close("minimap").await;
        assert!(manager.is_pooled("minimap"));

        assert!(manager.remove("minimap").await);
        assert!(!manager.is_pooled("minimap"));
    }

    #[tokio::test]
    async fn test_clear_empties_everything() {
        let manager = manager();
        manager.open("lobby", vec![]).await;
        manager.open("lobby_tab", vec![]).await;
        manager.open("minimap", vec![]).await;
        manager.close("minimap").await;

        manager.clear().await;

        let snapshot = manager.snapshot();
        assert_eq!(snapshot.active, 0);
        assert!(snapshot.pooled.is_empty());
        assert!(snapshot.layers.iter().all(|layer| layer.entries.is_empty()));
    }

    /// Test that clear destroys views that were loaded but never opened
    #[tokio::test]
    async fn test_clear_destroys_preloaded() {
        let manager = manager();
        let confirm = manager.load_async("confirm").await.unwrap();
        manager.open("lobby", vec![]).await;
        let tab = manager.load_async("lobby_tab").await.unwrap();

        manager.clear().await;

        assert_eq!(confirm.state(), ViewState::Released);
        assert_eq!(tab.state(), ViewState::Released);
        assert_eq!(manager.snapshot().active, 0);
    }

    #[tokio::test]
    async fn test_snapshot_serialises_children() {
        let manager = manager();
        manager.open("lobby", vec![json!(3)]).await;
        manager.open("lobby_tab", vec![]).await;

        let value = serde_json::to_value(manager.snapshot()).unwrap();
        let panel = &value["layers"][1];
        assert_eq!(panel["layer"], "panel");
        assert_eq!(panel["views"][0]["state"], "enabled");
        assert_eq!(panel["views"][0]["args"], json!([3]));
        assert_eq!(panel["views"][0]["children"][0]["name"], "lobby_tab");
    }
}
