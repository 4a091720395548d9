use super::{Retirement, retire};
use crate::context::UiContext;
use crate::descriptor::Layer;
use crate::gate::{GateKey, GateMode};
use crate::instance::ViewArgs;
use crate::loader;
use log::{debug, info, warn};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct StackEntry {
    name: String,
    /// Replayed when this entry becomes the top again
    args: ViewArgs,
}

/// LIFO navigation. Only the top entry is enabled.
///
/// A name may appear more than once: opening a view that is already deeper in
/// the stack resets the existing instance and pushes it again.
#[derive(Debug)]
pub struct StackContainer {
    layer: Layer,
    entries: Mutex<Vec<StackEntry>>,
}

impl StackContainer {
    pub fn new(layer: Layer) -> Self {
        Self {
            layer,
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    fn key(&self) -> GateKey {
        GateKey::Layer(self.layer)
    }

    /// Names bottom to top
    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|entry| entry.name.clone())
            .collect()
    }

    pub fn top(&self) -> Option<String> {
        self.entries.lock().unwrap().last().map(|entry| entry.name.clone())
    }

    pub fn depth(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub async fn open(&self, ctx: &UiContext, name: &str, args: ViewArgs) -> bool {
        let Some(_pass) = ctx.gate.try_acquire(self.key(), GateMode::Push) else {
            return false;
        };
        self.push(ctx, name, args).await
    }

    pub async fn pop(&self, ctx: &UiContext) -> bool {
        let Some(_pass) = ctx.gate.try_acquire(self.key(), GateMode::Pop) else {
            return false;
        };
        self.pop_top(ctx, true).await
    }

    /// Replace the top without resuming the entry below it in between
    pub async fn pop_then_open(&self, ctx: &UiContext, name: &str, args: ViewArgs) -> bool {
        let Some(_pass) = ctx.gate.try_acquire(self.key(), GateMode::PopThenPush) else {
            return false;
        };
        let popped = self.pop_top(ctx, false).await;
        if self.push(ctx, name, args).await {
            return true;
        }
        if popped {
            self.resume_top(ctx).await;
        }
        false
    }

    /// Empty the stack, then open `name` as its only entry
    pub async fn pop_all_then_open(&self, ctx: &UiContext, name: &str, args: ViewArgs) -> bool {
        let Some(_pass) = ctx.gate.try_acquire(self.key(), GateMode::PopThenPush) else {
            return false;
        };
        while self.pop_top(ctx, false).await {}
        self.push(ctx, name, args).await
    }

    /// Take every occurrence of `name` out, retiring it per its close policy
    pub async fn close(&self, ctx: &UiContext, name: &str) -> bool {
        let Some(_pass) = ctx.gate.try_acquire(self.key(), GateMode::Pop) else {
            return false;
        };
        self.discard(ctx, name, Retirement::ByPolicy).await
    }

    /// Like close, but always destroys
    pub async fn remove(&self, ctx: &UiContext, name: &str) -> bool {
        let Some(_pass) = ctx.gate.try_acquire(self.key(), GateMode::Pop) else {
            return false;
        };
        self.discard(ctx, name, Retirement::Destroy).await
    }

    pub async fn clear(&self, ctx: &UiContext) {
        let Some(_pass) = ctx.gate.try_acquire(self.key(), GateMode::PopThenPush) else {
            return;
        };

        let mut names: Vec<String> = Vec::new();
        for entry in self.entries.lock().unwrap().drain(..).rev() {
            if !names.contains(&entry.name) {
                names.push(entry.name);
            }
        }
        for name in names {
            if let Some(view) = ctx.find_active(&name) {
                view.deactivate(ctx).await;
                retire(ctx, &view, Retirement::Destroy);
            }
        }
        debug!("Cleared {}", self.layer);
    }

    async fn push(&self, ctx: &UiContext, name: &str, args: ViewArgs) -> bool {
        let revisit = self.entries.lock().unwrap().iter().any(|entry| entry.name == name);
        if revisit {
            if let Some(existing) = ctx.find_active(name) {
                debug!("Revisiting {} on {}", name, self.layer);
                existing.soft_reset(ctx).await;
            }
        }

        let Some(view) = loader::load(ctx, name).await else {
            return false;
        };

        let below = self.top().and_then(|top| ctx.find_active(&top));
        if let Some(below) = below {
            if !Arc::ptr_eq(&below, &view) {
                below.deactivate(ctx).await;
            }
        }

        let depth = {
            let mut entries = self.entries.lock().unwrap();
            entries.push(StackEntry {
                name: name.to_string(),
                args: args.clone(),
            });
            entries.len() - 1
        };
        view.set_z(ctx.z_for(self.layer, depth));
        view.set_args(args);
        view.activate(ctx).await;

        info!("📂 Opened {} on {} (depth {})", name, self.layer, depth);
        true
    }

    /// Remove the top entry. Returns false if the stack was empty.
    async fn pop_top(&self, ctx: &UiContext, resume: bool) -> bool {
        let Some(top) = self.top() else {
            debug!("Nothing to pop on {}", self.layer);
            return false;
        };

        let view = ctx.find_active(&top);
        if let Some(view) = &view {
            view.deactivate(ctx).await;
        }

        let still_stacked = {
            let mut entries = self.entries.lock().unwrap();
            entries.pop();
            entries.iter().any(|entry| entry.name == top)
        };

        if let Some(view) = view {
            if still_stacked {
                // Stays dormant until its deeper entry comes back up
                view.soft_reset(ctx).await;
            } else {
                retire(ctx, &view, Retirement::ByPolicy);
            }
        }
        info!("Popped {} from {}", top, self.layer);

        if resume {
            self.resume_top(ctx).await;
        }
        true
    }

    async fn resume_top(&self, ctx: &UiContext) {
        let top = {
            let entries = self.entries.lock().unwrap();
            entries.last().cloned().map(|entry| (entries.len() - 1, entry))
        };
        let Some((depth, entry)) = top else {
            return;
        };
        let Some(view) = ctx.find_active(&entry.name) else {
            warn!("{} is stacked on {} but not active", entry.name, self.layer);
            return;
        };

        view.set_z(ctx.z_for(self.layer, depth));
        view.set_args(entry.args);
        view.activate(ctx).await;
    }

    async fn discard(&self, ctx: &UiContext, name: &str, how: Retirement) -> bool {
        let was_top = self.top().as_deref() == Some(name);
        if !self.entries().iter().any(|entry| entry == name) {
            debug!("{} is not on {}", name, self.layer);
            return false;
        }

        let view = ctx.find_active(name);
        if let Some(view) = &view {
            view.deactivate(ctx).await;
        }
        self.entries.lock().unwrap().retain(|entry| entry.name != name);
        if let Some(view) = view {
            retire(ctx, &view, how);
        }

        self.restack(ctx);
        if was_top {
            self.resume_top(ctx).await;
        }
        true
    }

    fn restack(&self, ctx: &UiContext) {
        for (depth, name) in self.entries().iter().enumerate() {
            if let Some(view) = ctx.find_active(name) {
                view.set_z(ctx.z_for(self.layer, depth));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{DescriptorRegistry, ViewDescriptor};
    use crate::lifecycle::ViewState;
    use crate::testing::test_context;
    use serde_json::json;

    fn registry() -> DescriptorRegistry {
        let mut registry = DescriptorRegistry::new();
        for name in ["a", "b", "c"] {
            registry.register(ViewDescriptor::new(name, Layer::Panel)).unwrap();
        }
        registry
            .register(ViewDescriptor::new("kept", Layer::Panel).retain())
            .unwrap();
        registry
    }

    fn state(ctx: &UiContext, name: &str) -> Option<ViewState> {
        ctx.find_active(name).map(|view| view.state())
    }

    #[tokio::test]
    async fn test_open_disables_previous_top() {
        let (ctx, _, _) = test_context(registry());
        let stack = StackContainer::new(Layer::Panel);

        assert!(stack.open(&ctx, "a", vec![]).await);
        assert!(stack.open(&ctx, "b", vec![]).await);

        assert_eq!(stack.entries(), ["a", "b"]);
        assert_eq!(state(&ctx, "a"), Some(ViewState::Disabled));
        assert_eq!(state(&ctx, "b"), Some(ViewState::Enabled));
        assert_eq!(ctx.find_active("b").unwrap().z_order(), 1010);
    }

    #[tokio::test]
    async fn test_pop_resumes_previous_with_its_args() {
        let (ctx, _, _) = test_context(registry());
        let stack = StackContainer::new(Layer::Panel);

        stack.open(&ctx, "a", vec![json!(1)]).await;
        stack.open(&ctx, "b", vec![]).await;
        assert!(stack.pop(&ctx).await);

        let a = ctx.find_active("a").unwrap();
        assert_eq!(a.state(), ViewState::Enabled);
        assert_eq!(a.z_order(), 1000);
        assert_eq!(a.args(), vec![json!(1)]);
        assert!(ctx.find_active("b").is_none());

        assert!(stack.pop(&ctx).await);
        assert!(!stack.pop(&ctx).await);
        assert_eq!(stack.depth(), 0);
    }

    #[tokio::test]
    async fn test_deeper_revisit_keeps_one_instance() {
        let (ctx, assets, _) = test_context(registry());
        let stack = StackContainer::new(Layer::Panel);

        stack.open(&ctx, "a", vec![]).await;
        let first = ctx.find_active("a").unwrap();
        stack.open(&ctx, "b", vec![]).await;
        stack.open(&ctx, "a", vec![]).await;

        assert_eq!(stack.entries(), ["a", "b", "a"]);
        assert!(Arc::ptr_eq(&first, &ctx.find_active("a").unwrap()));
        assert_eq!(first.state(), ViewState::Enabled);
        assert_eq!(first.z_order(), 1020);
        assert_eq!(assets.loads("a"), 1);

        // Popping the revisit leaves the deeper entry dormant
        stack.pop(&ctx).await;
        assert_eq!(first.state(), ViewState::Awake);
        assert_eq!(state(&ctx, "b"), Some(ViewState::Enabled));

        stack.pop(&ctx).await;
        assert_eq!(first.state(), ViewState::Enabled);
        assert_eq!(first.z_order(), 1000);
    }

    #[tokio::test]
    async fn test_pop_then_open_replaces_top() {
        let (ctx, _, _) = test_context(registry());
        let stack = StackContainer::new(Layer::Panel);

        stack.open(&ctx, "a", vec![]).await;
        stack.open(&ctx, "b", vec![]).await;
        assert!(stack.pop_then_open(&ctx, "c", vec![]).await);

        assert_eq!(stack.entries(), ["a", "c"]);
        // "a" was never resumed in between
        assert_eq!(state(&ctx, "a"), Some(ViewState::Disabled));
        assert_eq!(ctx.find_active("c").unwrap().z_order(), 1010);
    }

    #[tokio::test]
    async fn test_pop_then_open_unknown_restores_top() {
        let (ctx, _, _) = test_context(registry());
        let stack = StackContainer::new(Layer::Panel);

        stack.open(&ctx, "a", vec![]).await;
        stack.open(&ctx, "b", vec![]).await;
        assert!(!stack.pop_then_open(&ctx, "ghost", vec![]).await);

        assert_eq!(stack.entries(), ["a"]);
        assert_eq!(state(&ctx, "a"), Some(ViewState::Enabled));
    }

    #[tokio::test]
    async fn test_pop_all_then_open() {
        let (ctx, _, _) = test_context(registry());
        let stack = StackContainer::new(Layer::Panel);

        for name in ["a", "kept", "b"] {
            stack.open(&ctx, name, vec![]).await;
        }
        assert!(stack.pop_all_then_open(&ctx, "c", vec![]).await);

        assert_eq!(stack.entries(), ["c"]);
        assert_eq!(ctx.find_active("c").unwrap().z_order(), 1000);
        assert!(ctx.pool.contains("kept"));
        assert_eq!(ctx.active_count(), 1);
    }

    #[tokio::test]
    async fn test_close_deeper_entry_leaves_top_alone() {
        let (ctx, _, _) = test_context(registry());
        let stack = StackContainer::new(Layer::Panel);

        for name in ["a", "kept", "b"] {
            stack.open(&ctx, name, vec![]).await;
        }
        assert!(stack.close(&ctx, "kept").await);

        assert_eq!(stack.entries(), ["a", "b"]);
        assert!(ctx.pool.contains("kept"));
        let b = ctx.find_active("b").unwrap();
        assert_eq!(b.state(), ViewState::Enabled);
        assert_eq!(b.z_order(), 1010);

        assert!(!stack.close(&ctx, "kept").await);
    }

    #[tokio::test]
    async fn test_remove_ignores_retain() {
        let (ctx, _, _) = test_context(registry());
        let stack = StackContainer::new(Layer::Panel);

        stack.open(&ctx, "a", vec![]).await;
        stack.open(&ctx, "kept", vec![]).await;
        let kept = ctx.find_active("kept").unwrap();
        assert!(stack.remove(&ctx, "kept").await);

        assert!(!ctx.pool.contains("kept"));
        assert_eq!(kept.state(), ViewState::Released);
        assert_eq!(state(&ctx, "a"), Some(ViewState::Enabled));
    }

    #[tokio::test]
    async fn test_clear_destroys_everything() {
        let (ctx, _, _) = test_context(registry());
        let stack = StackContainer::new(Layer::Panel);

        for name in ["a", "kept", "a"] {
            stack.open(&ctx, name, vec![]).await;
        }
        stack.clear(&ctx).await;

        assert!(stack.entries().is_empty());
        assert_eq!(ctx.active_count(), 0);
        assert!(ctx.pool.is_empty());
    }
}
