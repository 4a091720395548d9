//! Live view instances and their lifecycle transitions

use crate::collaborators::{VisualNode, play_and_wait};
use crate::container::ChildContainer;
use crate::context::UiContext;
use crate::controller::ViewController;
use crate::descriptor::ViewDescriptor;
use crate::lifecycle::{self, Step, Transition, ViewState};
use futures::channel::oneshot;
use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Arguments passed along with a navigation call
pub type ViewArgs = Vec<Value>;

/// Resolves exactly once: `true` when the load finished, `false` when it was abandoned.
/// Every clone of the waiter sees the same outcome.
pub(crate) struct LoadSignal {
    tx: Mutex<Option<oneshot::Sender<bool>>>,
    rx: Shared<oneshot::Receiver<bool>>,
}

impl LoadSignal {
    fn new() -> Self {
        let (tx, rx) = oneshot::channel();
        Self {
            tx: Mutex::new(Some(tx)),
            rx: rx.shared(),
        }
    }

    pub(crate) fn resolve(&self, loaded: bool) {
        if let Some(tx) = self.tx.lock().unwrap().take() {
            let _ = tx.send(loaded);
        }
    }

    pub(crate) async fn wait(&self) -> bool {
        // A dropped sender means the instance went away mid-load
        self.rx.clone().await.unwrap_or(false)
    }

    fn is_resolved(&self) -> bool {
        self.tx.lock().unwrap().is_none()
    }
}

/// Serialisable view of one instance
#[derive(Debug, Clone, Serialize)]
pub struct ViewSnapshot {
    pub name: String,
    pub state: ViewState,
    pub z_order: i32,
    pub animating: bool,
    pub args: ViewArgs,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ViewSnapshot>,
}

pub struct ViewInstance {
    id: Uuid,
    descriptor: Arc<ViewDescriptor>,
    state: Mutex<ViewState>,
    loaded: LoadSignal,
    node: Mutex<Option<VisualNode>>,
    z_order: AtomicI32,
    animating: AtomicBool,
    args: Mutex<ViewArgs>,
    controller: Mutex<Option<Box<dyn ViewController>>>,
    /// Events this instance is currently subscribed to
    pub(crate) subscriptions: Mutex<Vec<String>>,
    children: Option<ChildContainer>,
}

impl ViewInstance {
    /// Fresh, unloaded instance. `has_children` decides whether it gets a child container.
    pub(crate) fn new(descriptor: Arc<ViewDescriptor>, has_children: bool) -> Self {
        let children = has_children.then(|| ChildContainer::new(descriptor.name.clone()));
        Self {
            id: Uuid::new_v4(),
            descriptor,
            state: Mutex::new(ViewState::Unloaded),
            loaded: LoadSignal::new(),
            node: Mutex::new(None),
            z_order: AtomicI32::new(0),
            animating: AtomicBool::new(false),
            args: Mutex::new(Vec::new()),
            controller: Mutex::new(None),
            subscriptions: Mutex::new(Vec::new()),
            children,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &ViewDescriptor {
        &self.descriptor
    }

    pub fn state(&self) -> ViewState {
        *self.state.lock().unwrap()
    }

    pub fn z_order(&self) -> i32 {
        self.z_order.load(Ordering::SeqCst)
    }

    pub(crate) fn set_z(&self, z: i32) {
        self.z_order.store(z, Ordering::SeqCst);
    }

    /// True while an enter or exit track is playing
    pub fn is_animating(&self) -> bool {
        self.animating.load(Ordering::SeqCst)
    }

    pub fn node(&self) -> Option<VisualNode> {
        self.node.lock().unwrap().clone()
    }

    pub fn args(&self) -> ViewArgs {
        self.args.lock().unwrap().clone()
    }

    pub(crate) fn set_args(&self, args: ViewArgs) {
        *self.args.lock().unwrap() = args;
    }

    pub(crate) fn children(&self) -> Option<&ChildContainer> {
        self.children.as_ref()
    }

    /// Names of children currently open under this view
    pub fn child_names(&self) -> Vec<String> {
        self.children
            .as_ref()
            .map(ChildContainer::entries)
            .unwrap_or_default()
    }

    /// Wait for the load to settle. False if it was abandoned.
    pub async fn wait_loaded(&self) -> bool {
        self.loaded.wait().await
    }

    pub(crate) fn resolve_loaded(&self, loaded: bool) {
        self.loaded.resolve(loaded);
    }

    pub(crate) fn load_settled(&self) -> bool {
        self.loaded.is_resolved()
    }

    /// Events the controller wants while enabled
    pub(crate) fn declared_events(&self) -> Vec<String> {
        self.with_controller(|controller| controller.events())
            .unwrap_or_default()
    }

    fn with_controller<R>(&self, f: impl FnOnce(&mut Box<dyn ViewController>) -> R) -> Option<R> {
        let mut guard = self.controller.lock().unwrap();
        guard.as_mut().map(f)
    }

    /// Deliver a broadcast event. Only enabled views receive events.
    pub(crate) fn dispatch_event(&self, event: &str, args: &[Value]) {
        if self.state() != ViewState::Enabled {
            return;
        }
        // A controller that re-broadcasts from inside a callback must not deadlock on itself
        match self.controller.try_lock() {
            Ok(mut guard) => {
                if let Some(controller) = guard.as_mut() {
                    controller.on_notify(event, args);
                }
            }
            Err(_) => debug!("{} is busy, skipping re-entrant '{}'", self.name(), event),
        }
    }

    /// Check and commit a transition in one step
    fn advance(&self, transition: Transition) -> bool {
        let mut state = self.state.lock().unwrap();
        match lifecycle::check(*state, transition) {
            Step::Proceed => {
                debug!("{}: {} -> {}", self.name(), *state, transition.target());
                *state = transition.target();
                true
            }
            Step::AlreadyThere => {
                debug!("{}: already {}, skipping {:?}", self.name(), *state, transition);
                false
            }
            Step::Illegal => {
                warn!("{}: {:?} is not allowed from {}", self.name(), transition, *state);
                false
            }
        }
    }

    pub(crate) fn begin_load(self: &Arc<Self>, ctx: &UiContext) -> bool {
        if !self.advance(Transition::Load) {
            return false;
        }
        ctx.run_before(self, Transition::Load);
        ctx.run_after(self, Transition::Load);
        true
    }

    /// Bind the node and controller. Runs once per instance.
    pub(crate) fn awake(
        self: &Arc<Self>,
        ctx: &UiContext,
        node: VisualNode,
        mut controller: Box<dyn ViewController>,
    ) -> bool {
        if !self.advance(Transition::Awake) {
            ctx.assets.release(node);
            return false;
        }
        ctx.run_before(self, Transition::Awake);
        controller.on_awake(self.name(), &node);
        *self.node.lock().unwrap() = Some(node);
        *self.controller.lock().unwrap() = Some(controller);
        ctx.run_after(self, Transition::Awake);
        true
    }

    pub(crate) fn start(self: &Arc<Self>, ctx: &UiContext) {
        if !self.advance(Transition::Start) {
            return;
        }
        ctx.run_before(self, Transition::Start);
        let args = self.args();
        self.with_controller(|controller| controller.on_start(&args));
        ctx.run_after(self, Transition::Start);
    }

    pub(crate) fn enable<'a>(self: &'a Arc<Self>, ctx: &'a UiContext) -> BoxFuture<'a, ()> {
        async move {
            if !self.advance(Transition::Enable) {
                return;
            }
            ctx.run_before(self, Transition::Enable);
            let args = self.args();
            self.with_controller(|controller| controller.on_enable(&args));

            if self.descriptor.animated {
                self.play(ctx, &ctx.config.enter_track).await;
            }
            if let Some(children) = &self.children {
                children.activate_all(ctx, self.z_order()).await;
            }
            ctx.run_after(self, Transition::Enable);
        }
        .boxed()
    }

    pub(crate) fn disable<'a>(self: &'a Arc<Self>, ctx: &'a UiContext) -> BoxFuture<'a, ()> {
        async move {
            if !self.advance(Transition::Disable) {
                return;
            }
            ctx.run_before(self, Transition::Disable);
            if let Some(children) = &self.children {
                children.deactivate_all(ctx).await;
            }

            if self.descriptor.animated {
                self.play(ctx, &ctx.config.exit_track).await;
            }
            self.with_controller(|controller| controller.on_disable());
            ctx.run_after(self, Transition::Disable);
        }
        .boxed()
    }

    /// Start if this is a new activation episode, then enable
    pub(crate) fn activate<'a>(self: &'a Arc<Self>, ctx: &'a UiContext) -> BoxFuture<'a, ()> {
        async move {
            if self.state() == ViewState::Awake {
                self.start(ctx);
            }
            self.enable(ctx).await;
        }
        .boxed()
    }

    /// Disable if currently visible
    pub(crate) fn deactivate<'a>(self: &'a Arc<Self>, ctx: &'a UiContext) -> BoxFuture<'a, ()> {
        async move {
            if self.state() == ViewState::Enabled {
                self.disable(ctx).await;
            }
        }
        .boxed()
    }

    /// Force a stacked instance back to Awake so it can be replayed from Start
    pub(crate) fn soft_reset<'a>(self: &'a Arc<Self>, ctx: &'a UiContext) -> BoxFuture<'a, ()> {
        async move {
            self.deactivate(ctx).await;
            if self.advance(Transition::Reset) {
                info!("{} reset to Awake", self.name());
                ctx.run_before(self, Transition::Reset);
                ctx.run_after(self, Transition::Reset);
            }
        }
        .boxed()
    }

    /// Tear down the controller, destroy every child and release the node
    pub(crate) fn destroy(self: &Arc<Self>, ctx: &UiContext) {
        if !self.advance(Transition::Destroy) {
            return;
        }
        ctx.run_before(self, Transition::Destroy);
        if let Some(children) = &self.children {
            children.destroy_all(ctx);
        }
        if let Some(mut controller) = self.controller.lock().unwrap().take() {
            controller.on_destroy();
        }
        ctx.run_after(self, Transition::Destroy);

        if self.advance(Transition::Release) {
            ctx.run_before(self, Transition::Release);
            if let Some(node) = self.node.lock().unwrap().take() {
                ctx.assets.release(node);
            }
            ctx.run_after(self, Transition::Release);
        }
        info!("🗑️ Destroyed {}", self.name());
    }

    /// Give up on a load that never reached Awake. Waiters see the abandonment.
    pub(crate) fn abandon(&self, ctx: &UiContext) {
        if let Some(node) = self.node.lock().unwrap().take() {
            ctx.assets.release(node);
        }
        *self.state.lock().unwrap() = ViewState::Released;
        self.loaded.resolve(false);
    }

    async fn play(&self, ctx: &UiContext, track: &str) {
        let Some(node) = self.node() else {
            return;
        };
        let _block = ctx.input.block();
        self.animating.store(true, Ordering::SeqCst);
        play_and_wait(ctx.animator.as_ref(), &node, track).await;
        self.animating.store(false, Ordering::SeqCst);
    }

    pub(crate) fn snapshot(&self, ctx: &UiContext) -> ViewSnapshot {
        let children = self
            .child_names()
            .iter()
            .filter_map(|name| ctx.find_active(name))
            .map(|child| child.snapshot(ctx))
            .collect();

        ViewSnapshot {
            name: self.name().to_string(),
            state: self.state(),
            z_order: self.z_order(),
            animating: self.is_animating(),
            args: self.args(),
            children,
        }
    }
}

impl fmt::Debug for ViewInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewInstance")
            .field("id", &self.id)
            .field("name", &self.descriptor.name)
            .field("state", &self.state())
            .field("z_order", &self.z_order())
            .finish()
    }
}
