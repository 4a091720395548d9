//! Navigation containers
//!
//! Every top-level layer is managed by either a [`StackContainer`] or a
//! [`ListContainer`]. Views that belong to a parent live in that parent's
//! [`ChildContainer`].

pub mod child;
pub mod list;
pub mod stack;

pub use child::ChildContainer;
pub use list::ListContainer;
pub use stack::StackContainer;

use crate::context::UiContext;
use crate::descriptor::{ClosePolicy, ContainerKind, Layer};
use crate::instance::{ViewArgs, ViewInstance};
use std::sync::Arc;

/// How a view leaving its container is disposed of
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Retirement {
    /// Pool it if its close policy says Retain, destroy it otherwise
    ByPolicy,
    /// Always destroy
    Destroy,
}

/// Drop a deactivated view from the active index and pool or destroy it
pub(crate) fn retire(ctx: &UiContext, view: &Arc<ViewInstance>, how: Retirement) {
    ctx.evict(view);
    if how == Retirement::ByPolicy && view.descriptor().close == ClosePolicy::Retain {
        if let Some(displaced) = ctx.pool.put(view.clone()) {
            displaced.destroy(ctx);
        }
    } else {
        view.destroy(ctx);
    }
}

/// The container serving one top-level layer
#[derive(Debug)]
pub enum LayerContainer {
    Stack(StackContainer),
    List(ListContainer),
}

impl LayerContainer {
    pub fn for_layer(layer: Layer) -> Self {
        match layer.container_kind() {
            ContainerKind::Stack => LayerContainer::Stack(StackContainer::new(layer)),
            ContainerKind::List => LayerContainer::List(ListContainer::new(layer)),
        }
    }

    pub fn layer(&self) -> Layer {
        match self {
            LayerContainer::Stack(stack) => stack.layer(),
            LayerContainer::List(list) => list.layer(),
        }
    }

    pub fn as_stack(&self) -> Option<&StackContainer> {
        match self {
            LayerContainer::Stack(stack) => Some(stack),
            LayerContainer::List(_) => None,
        }
    }

    pub async fn open(&self, ctx: &UiContext, name: &str, args: ViewArgs) -> bool {
        match self {
            LayerContainer::Stack(stack) => stack.open(ctx, name, args).await,
            LayerContainer::List(list) => list.open(ctx, name, args).await,
        }
    }

    pub async fn close(&self, ctx: &UiContext, name: &str) -> bool {
        match self {
            LayerContainer::Stack(stack) => stack.close(ctx, name).await,
            LayerContainer::List(list) => list.close(ctx, name).await,
        }
    }

    pub async fn remove(&self, ctx: &UiContext, name: &str) -> bool {
        match self {
            LayerContainer::Stack(stack) => stack.remove(ctx, name).await,
            LayerContainer::List(list) => list.remove(ctx, name).await,
        }
    }

    pub async fn clear(&self, ctx: &UiContext) {
        match self {
            LayerContainer::Stack(stack) => stack.clear(ctx).await,
            LayerContainer::List(list) => list.clear(ctx).await,
        }
    }

    pub fn entries(&self) -> Vec<String> {
        match self {
            LayerContainer::Stack(stack) => stack.entries(),
            LayerContainer::List(list) => list.entries(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries().iter().any(|entry| entry == name)
    }
}
