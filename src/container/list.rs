use super::{Retirement, retire};
use crate::context::UiContext;
use crate::descriptor::Layer;
use crate::gate::{GateKey, GateMode};
use crate::instance::ViewArgs;
use crate::loader;
use log::{debug, info};
use std::sync::Mutex;

/// Parallel views. Opening one never disables another; order only sets z.
#[derive(Debug)]
pub struct ListContainer {
    layer: Layer,
    entries: Mutex<Vec<String>>,
}

impl ListContainer {
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

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    /// Open `name`, or bring it to the front if it is already open
    pub async fn open(&self, ctx: &UiContext, name: &str, args: ViewArgs) -> bool {
        let Some(_pass) = ctx.gate.try_acquire(self.key(), GateMode::Push) else {
            return false;
        };

        let view = match ctx.find_active(name).filter(|_| self.holds(name)) {
            Some(view) => view,
            None => match loader::load(ctx, name).await {
                Some(view) => view,
                None => return false,
            },
        };

        {
            let mut entries = self.entries.lock().unwrap();
            entries.retain(|entry| entry != name);
            entries.push(name.to_string());
        }
        self.restack(ctx);

        view.set_args(args);
        view.activate(ctx).await;
        info!("📂 Opened {} on {}", name, self.layer);
        true
    }

    pub async fn close(&self, ctx: &UiContext, name: &str) -> bool {
        let Some(_pass) = ctx.gate.try_acquire(self.key(), GateMode::Pop) else {
            return false;
        };
        self.discard(ctx, name, Retirement::ByPolicy).await
    }

    pub async fn remove(&self, ctx: &UiContext, name: &str) -> bool {
        let Some(_pass) = ctx.gate.try_acquire(self.key(), GateMode::Pop) else {
            return false;
        };
        self.discard(ctx, name, Retirement::Destroy).await
    }

    pub async fn clear(&self, ctx: &UiContext) {
        let Some(_pass) = ctx.gate.try_acquire(self.key(), GateMode::Pop) else {
            return;
        };

        let names: Vec<String> = self.entries.lock().unwrap().drain(..).collect();
        for name in names.iter().rev() {
            if let Some(view) = ctx.find_active(name) {
                view.deactivate(ctx).await;
                retire(ctx, &view, Retirement::Destroy);
            }
        }
        debug!("Cleared {}", self.layer);
    }

    fn holds(&self, name: &str) -> bool {
        self.entries.lock().unwrap().iter().any(|entry| entry == name)
    }

    async fn discard(&self, ctx: &UiContext, name: &str, how: Retirement) -> bool {
        if !self.holds(name) {
            debug!("{} is not on {}", name, self.layer);
            return false;
        }

        if let Some(view) = ctx.find_active(name) {
            view.deactivate(ctx).await;
            retire(ctx, &view, how);
        }
        self.entries.lock().unwrap().retain(|entry| entry != name);
        self.restack(ctx);
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

    fn registry() -> DescriptorRegistry {
        let mut registry = DescriptorRegistry::new();
        registry.register(ViewDescriptor::new("minimap", Layer::Hud)).unwrap();
        registry.register(ViewDescriptor::new("health", Layer::Hud)).unwrap();
        registry
            .register(ViewDescriptor::new("chat", Layer::Hud).retain())
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn test_siblings_stay_enabled() {
        let (ctx, _, _) = test_context(registry());
        let list = ListContainer::new(Layer::Hud);

        list.open(&ctx, "minimap", vec![]).await;
        list.open(&ctx, "health", vec![]).await;

        for name in ["minimap", "health"] {
            assert_eq!(ctx.find_active(name).unwrap().state(), ViewState::Enabled);
        }
        assert_eq!(ctx.find_active("minimap").unwrap().z_order(), 2000);
        assert_eq!(ctx.find_active("health").unwrap().z_order(), 2010);
    }

    #[tokio::test]
    async fn test_reopen_moves_to_front_without_reload() {
        let (ctx, assets, _) = test_context(registry());
        let list = ListContainer::new(Layer::Hud);

        list.open(&ctx, "minimap", vec![]).await;
        list.open(&ctx, "health", vec![]).await;
        list.open(&ctx, "minimap", vec![]).await;

        assert_eq!(list.entries(), ["health", "minimap"]);
        assert_eq!(ctx.find_active("minimap").unwrap().z_order(), 2010);
        assert_eq!(ctx.find_active("health").unwrap().z_order(), 2000);
        assert_eq!(assets.loads("minimap"), 1);
    }

    #[tokio::test]
    async fn test_close_pools_or_destroys() {
        let (ctx, _, _) = test_context(registry());
        let list = ListContainer::new(Layer::Hud);

        list.open(&ctx, "minimap", vec![]).await;
        list.open(&ctx, "chat", vec![]).await;

        assert!(list.close(&ctx, "chat").await);
        assert!(list.close(&ctx, "minimap").await);
        assert!(!list.close(&ctx, "minimap").await);

        assert!(ctx.pool.contains("chat"));
        assert!(!ctx.pool.contains("minimap"));
        assert_eq!(ctx.active_count(), 0);
    }

    #[tokio::test]
    async fn test_clear() {
        let (ctx, _, _) = test_context(registry());
        let list = ListContainer::new(Layer::Hud);

        list.open(&ctx, "minimap", vec![]).await;
        list.open(&ctx, "chat", vec![]).await;
        list.clear(&ctx).await;

        assert!(list.entries().is_empty());
        assert!(ctx.pool.is_empty());
        assert_eq!(ctx.active_count(), 0);
    }
}
