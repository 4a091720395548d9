use super::{Retirement, retire};
use crate::context::UiContext;
use crate::gate::{GateKey, GateMode};
use crate::instance::{ViewArgs, ViewInstance};
use crate::lifecycle::ViewState;
use crate::loader;
use futures::future::{BoxFuture, FutureExt};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex};

/// Views owned by one parent.
///
/// Children are visible only while the parent is enabled and are destroyed
/// with it. Navigation here is gated per parent, independent of the parent's
/// own layer.
#[derive(Debug)]
pub struct ChildContainer {
    parent: String,
    entries: Mutex<Vec<String>>,
}

impl ChildContainer {
    pub fn new(parent: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn parent(&self) -> &str {
        &self.parent
    }

    fn key(&self) -> GateKey {
        GateKey::Children(self.parent.clone())
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    fn holds(&self, name: &str) -> bool {
        self.entries.lock().unwrap().iter().any(|entry| entry == name)
    }

    pub async fn open(
        &self,
        ctx: &UiContext,
        parent: &Arc<ViewInstance>,
        name: &str,
        args: ViewArgs,
    ) -> bool {
        if !self.accepts(ctx, parent, name) {
            return false;
        }
        let Some(_pass) = ctx.gate.try_acquire(self.key(), GateMode::Push) else {
            return false;
        };
        self.admit(ctx, parent, name, args).await
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

    /// Close every sibling, then open `name`. Tab-style exclusive switching.
    pub async fn close_all_then_open(
        &self,
        ctx: &UiContext,
        parent: &Arc<ViewInstance>,
        name: &str,
        args: ViewArgs,
    ) -> bool {
        if !self.accepts(ctx, parent, name) {
            return false;
        }
        let Some(_pass) = ctx.gate.try_acquire(self.key(), GateMode::PopThenPush) else {
            return false;
        };

        let siblings: Vec<String> = self
            .entries()
            .into_iter()
            .filter(|entry| entry != name)
            .collect();
        for sibling in &siblings {
            self.discard(ctx, sibling, Retirement::ByPolicy).await;
        }
        self.admit(ctx, parent, name, args).await
    }

    pub async fn clear(&self, ctx: &UiContext) {
        let Some(_pass) = ctx.gate.try_acquire(self.key(), GateMode::Pop) else {
            return;
        };
        let names: Vec<String> = self.entries.lock().unwrap().drain(..).collect();
        for name in names {
            if let Some(view) = ctx.find_active(&name) {
                view.deactivate(ctx).await;
                retire(ctx, &view, Retirement::Destroy);
            }
        }
    }

    fn accepts(&self, ctx: &UiContext, parent: &ViewInstance, name: &str) -> bool {
        if !parent.state().is_awake() {
            debug!("{} is {}, ignoring child {}", parent.name(), parent.state(), name);
            return false;
        }
        let declared = ctx
            .registry
            .resolve(name)
            .is_ok_and(|descriptor| descriptor.parent_name() == Some(self.parent.as_str()));
        if !declared {
            warn!("{} is not a child of {}", name, self.parent);
        }
        declared
    }

    async fn admit(
        &self,
        ctx: &UiContext,
        parent: &Arc<ViewInstance>,
        name: &str,
        args: ViewArgs,
    ) -> bool {
        let existing = ctx.find_active(name).filter(|_| self.holds(name));
        let view = match existing {
            Some(view) => view,
            None => match loader::load_child(ctx, name).await {
                Some(view) => view,
                None => return false,
            },
        };

        // The parent may have been torn down while the child was loading
        if !self.parent_is_live(ctx, parent) {
            warn!("{} went away while {} was loading, dropping it", self.parent, name);
            retire(ctx, &view, Retirement::Destroy);
            return false;
        }

        self.attach(ctx, parent, &view);
        view.set_args(args);
        if parent.state() == ViewState::Enabled {
            view.activate(ctx).await;
        }
        info!("📂 Opened child {} under {}", name, self.parent);
        true
    }

    fn parent_is_live(&self, ctx: &UiContext, parent: &Arc<ViewInstance>) -> bool {
        parent.state().is_awake()
            && ctx
                .find_active(parent.name())
                .is_some_and(|current| Arc::ptr_eq(&current, parent))
    }

    /// Track a loaded child without activating it
    pub(crate) fn attach(&self, ctx: &UiContext, parent: &ViewInstance, child: &Arc<ViewInstance>) {
        let index = {
            let mut entries = self.entries.lock().unwrap();
            match entries.iter().position(|entry| entry == child.name()) {
                Some(index) => index,
                None => {
                    entries.push(child.name().to_string());
                    entries.len() - 1
                }
            }
        };
        child.set_z(ctx.child_z(parent.z_order(), index));
    }

    async fn discard(&self, ctx: &UiContext, name: &str, how: Retirement) -> bool {
        if !self.holds(name) {
            debug!("{} is not open under {}", name, self.parent);
            return false;
        }
        if let Some(view) = ctx.find_active(name) {
            view.deactivate(ctx).await;
            retire(ctx, &view, how);
        }
        self.entries.lock().unwrap().retain(|entry| entry != name);
        true
    }

    /// Parent became visible: bring every child up at the parent's new z
    pub(crate) fn activate_all<'a>(
        &'a self,
        ctx: &'a UiContext,
        parent_z: i32,
    ) -> BoxFuture<'a, ()> {
        async move {
            for (index, name) in self.entries().iter().enumerate() {
                if let Some(child) = ctx.find_active(name) {
                    child.set_z(ctx.child_z(parent_z, index));
                    child.activate(ctx).await;
                }
            }
        }
        .boxed()
    }

    pub(crate) fn deactivate_all<'a>(&'a self, ctx: &'a UiContext) -> BoxFuture<'a, ()> {
        async move {
            for name in self.entries().iter().rev() {
                if let Some(child) = ctx.find_active(name) {
                    child.deactivate(ctx).await;
                }
            }
        }
        .boxed()
    }

    /// Parent is being destroyed: destroy open and pooled children alike
    pub(crate) fn destroy_all(&self, ctx: &UiContext) {
        let names: Vec<String> = self.entries.lock().unwrap().drain(..).collect();
        for name in &names {
            if let Some(child) = ctx.find_active(name) {
                ctx.evict(&child);
                child.destroy(ctx);
            }
        }
        for name in ctx.registry.children_of(&self.parent) {
            if let Some(pooled) = ctx.pool.take(name) {
                pooled.destroy(ctx);
            }
        }
        if !names.is_empty() {
            debug!("Destroyed {} child view(s) of {}", names.len(), self.parent);
        }
    }
}
