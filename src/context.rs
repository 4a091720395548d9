//! Shared engine state handed to every container and instance.
//!
//! One `UiContext` is built per manager. It replaces what would otherwise be
//! process-wide singletons: the descriptor table, the active-instance index,
//! the pool, the gates and the collaborators.

use crate::collaborators::{AnimationPlayer, AssetLoader};
use crate::config::EngineConfig;
use crate::controller::ControllerFactory;
use crate::descriptor::{DescriptorRegistry, Layer};
use crate::events::EventRouter;
use crate::gate::{InputBlocker, TransitionGate};
use crate::hooks::{EventSubscriptionHook, LifecycleHook};
use crate::instance::ViewInstance;
use crate::lifecycle::Transition;
use crate::pool::InstancePool;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub struct UiContext {
    pub(crate) registry: Arc<DescriptorRegistry>,
    pub(crate) config: EngineConfig,

    /// Flat index of every instance that is loading or live in a container
    pub(crate) active: Mutex<HashMap<String, Arc<ViewInstance>>>,
    pub(crate) pool: InstancePool,

    pub(crate) gate: TransitionGate,
    pub(crate) input: InputBlocker,
    pub(crate) events: Arc<EventRouter>,
    pub(crate) hooks: Vec<Arc<dyn LifecycleHook>>,

    pub(crate) assets: Arc<dyn AssetLoader>,
    pub(crate) animator: Arc<dyn AnimationPlayer>,
    pub(crate) controllers: Arc<dyn ControllerFactory>,
}

impl UiContext {
    /// Assemble a context. The event subscription hook always runs first.
    pub fn new(
        registry: Arc<DescriptorRegistry>,
        config: EngineConfig,
        assets: Arc<dyn AssetLoader>,
        animator: Arc<dyn AnimationPlayer>,
        controllers: Arc<dyn ControllerFactory>,
        extra_hooks: Vec<Arc<dyn LifecycleHook>>,
    ) -> Self {
        let events = Arc::new(EventRouter::new());
        let mut hooks: Vec<Arc<dyn LifecycleHook>> =
            vec![Arc::new(EventSubscriptionHook::new(events.clone()))];
        hooks.extend(extra_hooks);

        Self {
            registry,
            config,
            active: Mutex::new(HashMap::new()),
            pool: InstancePool::new(),
            gate: TransitionGate::new(),
            input: InputBlocker::new(),
            events,
            hooks,
            assets,
            animator,
            controllers,
        }
    }

    pub fn find_active(&self, name: &str) -> Option<Arc<ViewInstance>> {
        self.active.lock().unwrap().get(name).cloned()
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().unwrap().len()
    }

    /// Drop `view` from the active index, unless the slot now holds another instance
    pub(crate) fn evict(&self, view: &Arc<ViewInstance>) {
        let mut active = self.active.lock().unwrap();
        if active
            .get(view.name())
            .is_some_and(|current| Arc::ptr_eq(current, view))
        {
            active.remove(view.name());
        }
    }

    pub(crate) fn z_for(&self, layer: Layer, depth: usize) -> i32 {
        self.config.layer_bases.base(layer) + self.config.z_spacing * depth as i32
    }

    pub(crate) fn child_z(&self, parent_z: i32, index: usize) -> i32 {
        parent_z + self.config.child_z_step * (index as i32 + 1)
    }

    pub(crate) fn run_before(&self, view: &Arc<ViewInstance>, transition: Transition) {
        for hook in &self.hooks {
            hook.before(view, transition);
        }
    }

    pub(crate) fn run_after(&self, view: &Arc<ViewInstance>, transition: Transition) {
        for hook in &self.hooks {
            hook.after(view, transition);
        }
    }
}
