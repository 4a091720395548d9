//! Shared fixtures for unit tests

use crate::config::EngineConfig;
use crate::context::UiContext;
use crate::controller::{ControllerFactory, ControllerRegistry, ViewController};
use crate::collaborators::VisualNode;
use crate::descriptor::{DescriptorRegistry, ViewDescriptor};
use crate::error::NavResult;
use crate::headless::{HeadlessAnimator, HeadlessLoader};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Context on headless collaborators with instant animations
pub(crate) fn test_context(
    registry: DescriptorRegistry,
) -> (Arc<UiContext>, Arc<HeadlessLoader>, Arc<HeadlessAnimator>) {
    let assets = Arc::new(HeadlessLoader::new());
    let animator = Arc::new(HeadlessAnimator::default());
    let ctx = UiContext::new(
        Arc::new(registry),
        EngineConfig::default(),
        assets.clone(),
        animator.clone(),
        Arc::new(ControllerRegistry::new()),
        Vec::new(),
    );
    (Arc::new(ctx), assets, animator)
}

type CallLog = Arc<Mutex<HashMap<String, Vec<String>>>>;

/// Hands out controllers that log every callback by view name
#[derive(Clone, Default)]
pub(crate) struct Recorder {
    calls: CallLog,
    events: HashMap<String, Vec<String>>,
}

impl Recorder {
    pub(crate) fn listening(mut self, view: &str, events: &[&str]) -> Self {
        self.events
            .insert(view.to_string(), events.iter().map(|e| e.to_string()).collect());
        self
    }

    pub(crate) fn controller(&self, view: &str) -> Box<dyn ViewController> {
        Box::new(RecordingController {
            view: view.to_string(),
            calls: self.calls.clone(),
            events: self.events.get(view).cloned().unwrap_or_default(),
        })
    }

    pub(crate) fn calls(&self, view: &str) -> Vec<String> {
        self.calls.lock().unwrap().get(view).cloned().unwrap_or_default()
    }
}

impl ControllerFactory for Recorder {
    fn create_controller(&self, descriptor: &ViewDescriptor) -> NavResult<Box<dyn ViewController>> {
        Ok(self.controller(&descriptor.name))
    }
}

struct RecordingController {
    view: String,
    calls: CallLog,
    events: Vec<String>,
}

impl RecordingController {
    fn record(&self, call: String) {
        self.calls
            .lock()
            .unwrap()
            .entry(self.view.clone())
            .or_default()
            .push(call);
    }
}

impl ViewController for RecordingController {
    fn on_awake(&mut self, _name: &str, _node: &VisualNode) {
        self.record("awake".to_string());
    }

    fn on_start(&mut self, args: &[Value]) {
        self.record(format!("start {}", Value::Array(args.to_vec())));
    }

    fn on_enable(&mut self, _args: &[Value]) {
        self.record("enable".to_string());
    }

    fn on_disable(&mut self) {
        self.record("disable".to_string());
    }

    fn on_destroy(&mut self) {
        self.record("destroy".to_string());
    }

    fn on_notify(&mut self, event: &str, args: &[Value]) {
        self.record(format!("notify {} {}", event, Value::Array(args.to_vec())));
    }

    fn events(&self) -> Vec<String> {
        self.events.clone()
    }
}
