//! Shared helpers for the navigation integration tests

#![allow(dead_code)]

use layerview::headless::{AnimationMode, HeadlessAnimator, HeadlessLoader};
use layerview::{
    ControllerFactory, DescriptorRegistry, LifecycleHook, NavResult, Transition, ViewController,
    ViewDescriptor, ViewInstance, ViewManager,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub struct Harness {
    pub manager: ViewManager,
    pub assets: Arc<HeadlessLoader>,
    pub animator: Arc<HeadlessAnimator>,
    pub controllers: Arc<CountingFactory>,
}

pub fn harness(registry: DescriptorRegistry) -> Harness {
    harness_with_hook(registry, None)
}

pub fn harness_with_hook(
    registry: DescriptorRegistry,
    hook: Option<Arc<dyn LifecycleHook>>,
) -> Harness {
    let assets = Arc::new(HeadlessLoader::new());
    let animator = Arc::new(HeadlessAnimator::new(AnimationMode::Instant));
    let controllers = Arc::new(CountingFactory::default());

    let mut builder = ViewManager::builder(registry, assets.clone())
        .animator(animator.clone())
        .controllers(controllers.clone());
    if let Some(hook) = hook {
        builder = builder.hook(hook);
    }

    Harness {
        manager: builder.build(),
        assets,
        animator,
        controllers,
    }
}

pub fn registry(descriptors: Vec<ViewDescriptor>) -> DescriptorRegistry {
    let mut registry = DescriptorRegistry::new();
    for descriptor in descriptors {
        registry.register(descriptor).unwrap();
    }
    registry
}

/// Let spawned and joined futures make progress
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// Creates listening controllers and counts how many were made per view
#[derive(Default)]
pub struct CountingFactory {
    created: Mutex<HashMap<String, usize>>,
    listens: Mutex<HashMap<String, Vec<String>>>,
    received: Arc<Mutex<Vec<(String, String)>>>,
    starts: Arc<Mutex<HashMap<String, usize>>>,
}

impl CountingFactory {
    pub fn listen(&self, view: &str, events: &[&str]) {
        self.listens.lock().unwrap().insert(
            view.to_string(),
            events.iter().map(|event| event.to_string()).collect(),
        );
    }

    pub fn created(&self, view: &str) -> usize {
        self.created.lock().unwrap().get(view).copied().unwrap_or(0)
    }

    /// Activation episodes begun across every instance of `view`
    pub fn starts(&self, view: &str) -> usize {
        self.starts.lock().unwrap().get(view).copied().unwrap_or(0)
    }

    /// `(view, event)` pairs delivered so far
    pub fn received(&self) -> Vec<(String, String)> {
        self.received.lock().unwrap().clone()
    }
}

impl ControllerFactory for CountingFactory {
    fn create_controller(&self, descriptor: &ViewDescriptor) -> NavResult<Box<dyn ViewController>> {
        *self
            .created
            .lock()
            .unwrap()
            .entry(descriptor.name.clone())
            .or_default() += 1;

        Ok(Box::new(ListeningController {
            view: descriptor.name.clone(),
            events: self
                .listens
                .lock()
                .unwrap()
                .get(&descriptor.name)
                .cloned()
                .unwrap_or_default(),
            received: self.received.clone(),
            starts: self.starts.clone(),
        }))
    }
}

struct ListeningController {
    view: String,
    events: Vec<String>,
    received: Arc<Mutex<Vec<(String, String)>>>,
    starts: Arc<Mutex<HashMap<String, usize>>>,
}

impl ViewController for ListeningController {
    fn on_start(&mut self, _args: &[Value]) {
        *self
            .starts
            .lock()
            .unwrap()
            .entry(self.view.clone())
            .or_default() += 1;
    }

    fn on_notify(&mut self, event: &str, _args: &[Value]) {
        self.received
            .lock()
            .unwrap()
            .push((self.view.clone(), event.to_string()));
    }

    fn events(&self) -> Vec<String> {
        self.events.clone()
    }
}

/// Hook that records `(view, transition, phase)` for every bracket call
#[derive(Default)]
pub struct TraceHook {
    trace: Mutex<Vec<(String, Transition, &'static str)>>,
}

impl TraceHook {
    pub fn trace_for(&self, view: &str) -> Vec<(Transition, &'static str)> {
        self.trace
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _, _)| name == view)
            .map(|(_, transition, phase)| (*transition, *phase))
            .collect()
    }
}

impl LifecycleHook for TraceHook {
    fn before(&self, view: &Arc<ViewInstance>, transition: Transition) {
        self.trace
            .lock()
            .unwrap()
            .push((view.name().to_string(), transition, "before"));
    }

    fn after(&self, view: &Arc<ViewInstance>, transition: Transition) {
        self.trace
            .lock()
            .unwrap()
            .push((view.name().to_string(), transition, "after"));
    }
}
