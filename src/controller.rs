//! View controllers and how they are created

use crate::collaborators::VisualNode;
use crate::descriptor::ViewDescriptor;
use crate::error::{NavError, NavResult};
use log::debug;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Behaviour attached to a view instance.
///
/// Every callback is optional. Callbacks run synchronously inside the
/// corresponding lifecycle transition.
pub trait ViewController: Send {
    fn on_awake(&mut self, _name: &str, _node: &VisualNode) {}
    fn on_start(&mut self, _args: &[Value]) {}
    fn on_enable(&mut self, _args: &[Value]) {}
    fn on_disable(&mut self) {}
    fn on_destroy(&mut self) {}

    /// Broadcast event delivered while the view is enabled
    fn on_notify(&mut self, _event: &str, _args: &[Value]) {}

    /// Event names to subscribe to while enabled
    fn events(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Controller for views that carry no behaviour of their own
#[derive(Debug, Default)]
pub struct InertController;

impl ViewController for InertController {}

/// Creates the controller for a freshly loaded view
pub trait ControllerFactory: Send + Sync {
    fn create_controller(&self, descriptor: &ViewDescriptor) -> NavResult<Box<dyn ViewController>>;
}

/// Scripting runtime that supplies controllers in place of native ones
pub trait ScriptBridge: Send + Sync {
    fn create_controller(&self, view_name: &str) -> Option<Box<dyn ViewController>>;
}

type Constructor = Box<dyn Fn() -> Box<dyn ViewController> + Send + Sync>;

/// Native constructors keyed by view name, plus an optional script bridge.
///
/// Descriptors flagged `scripted` go through the bridge; everything else uses
/// the native table and falls back to [`InertController`].
#[derive(Default)]
pub struct ControllerRegistry {
    natives: HashMap<String, Constructor>,
    bridge: Option<Arc<dyn ScriptBridge>>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a native constructor for a view
    pub fn register<F>(&mut self, view: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn() -> Box<dyn ViewController> + Send + Sync + 'static,
    {
        self.natives.insert(view.into(), Box::new(constructor));
        self
    }

    /// Register a controller type built with `Default`
    pub fn register_default<C>(&mut self, view: impl Into<String>) -> &mut Self
    where
        C: ViewController + Default + 'static,
    {
        self.register(view, || Box::new(C::default()))
    }

    pub fn with_bridge(mut self, bridge: Arc<dyn ScriptBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn has_native(&self, view: &str) -> bool {
        self.natives.contains_key(view)
    }
}

impl ControllerFactory for ControllerRegistry {
    fn create_controller(&self, descriptor: &ViewDescriptor) -> NavResult<Box<dyn ViewController>> {
        if descriptor.scripted {
            return self
                .bridge
                .as_ref()
                .and_then(|bridge| bridge.create_controller(&descriptor.name))
                .ok_or_else(|| NavError::NoController(descriptor.name.clone()));
        }

        match self.natives.get(&descriptor.name) {
            Some(constructor) => Ok(constructor()),
            None => {
                debug!("No controller registered for '{}', using inert controller", descriptor.name);
                Ok(Box::new(InertController))
            }
        }
    }
}
