pub mod collaborators;
pub mod config;
pub mod container;
pub mod context;
pub mod controller;
pub mod descriptor;
pub mod error;
pub mod events;
pub mod gate;
pub mod headless;
pub mod hooks;
pub mod instance;
pub mod lifecycle;
mod loader;
pub mod manager;
pub mod pool;
pub mod script;

#[cfg(test)]
mod testing;

pub use collaborators::{AnimationDone, AnimationPlayer, AssetLoader, NoAnimation, VisualNode};
pub use config::{EngineConfig, ViewTable};
pub use controller::{ControllerFactory, ControllerRegistry, InertController, ScriptBridge, ViewController};
pub use descriptor::{ClosePolicy, DescriptorRegistry, Layer, LoadStrategy, ViewDescriptor};
pub use error::{NavError, NavResult};
pub use hooks::LifecycleHook;
pub use instance::{ViewArgs, ViewInstance, ViewSnapshot};
pub use lifecycle::{Transition, ViewState};
pub use manager::{ManagerSnapshot, ViewManager, ViewManagerBuilder};
