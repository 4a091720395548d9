//! Load pipeline: name → live instance, single-flight per name

use crate::collaborators::VisualNode;
use crate::context::UiContext;
use crate::descriptor::{LoadStrategy, ViewDescriptor};
use crate::error::{NavError, NavResult};
use crate::instance::ViewInstance;
use futures::future::{BoxFuture, FutureExt};
use log::{debug, error, info, warn};
use std::sync::Arc;

enum Slot {
    /// Already loading or loaded; share its signal
    Existing(Arc<ViewInstance>),
    /// Taken back out of the pool
    Pooled(Arc<ViewInstance>),
    /// Newly created, this caller drives the load
    Fresh(Arc<ViewInstance>),
}

/// Resolve `name` to an awake instance.
///
/// Concurrent callers for one name share the same instance and the same
/// outcome. `None` means the load was abandoned: unknown name, missing asset,
/// missing pre-placed node or missing controller. The reason is logged here.
pub(crate) async fn load(ctx: &UiContext, name: &str) -> Option<Arc<ViewInstance>> {
    load_view(ctx, name, true).await
}

/// Load a child view opened explicitly. Its own children never come along.
pub(crate) async fn load_child(ctx: &UiContext, name: &str) -> Option<Arc<ViewInstance>> {
    load_view(ctx, name, false).await
}

fn load_view<'a>(
    ctx: &'a UiContext,
    name: &'a str,
    with_children: bool,
) -> BoxFuture<'a, Option<Arc<ViewInstance>>> {
    async move {
        let descriptor = match ctx.registry.resolve_shared(name) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                warn!("{}", err);
                return None;
            }
        };

        let slot = {
            let mut active = ctx.active.lock().unwrap();
            if let Some(existing) = active.get(name) {
                Slot::Existing(existing.clone())
            } else if let Some(pooled) = ctx.pool.take(name) {
                active.insert(name.to_string(), pooled.clone());
                Slot::Pooled(pooled)
            } else {
                let has_children = !ctx.registry.children_of(name).is_empty();
                let view = Arc::new(ViewInstance::new(descriptor, has_children));
                active.insert(name.to_string(), view.clone());
                Slot::Fresh(view)
            }
        };

        match slot {
            Slot::Existing(view) => {
                debug!("{} already requested, joining its load", name);
                view.wait_loaded().await.then_some(view)
            }
            Slot::Pooled(view) => {
                info!("♻️ Reusing pooled {}", name);
                Some(view)
            }
            Slot::Fresh(view) => {
                if let Err(err) = instantiate(ctx, &view).await {
                    error!("Abandoning load of {}: {}", name, err);
                    ctx.evict(&view);
                    view.abandon(ctx);
                    return None;
                }

                if with_children {
                    load_attached_children(ctx, &view).await;
                }

                view.resolve_loaded(true);
                info!("📦 Loaded {}", name);
                Some(view)
            }
        }
    }
    .boxed()
}

async fn instantiate(ctx: &UiContext, view: &Arc<ViewInstance>) -> NavResult<()> {
    view.begin_load(ctx);
    let node = fetch_node(ctx, view.descriptor()).await?;

    let controller = match ctx.controllers.create_controller(view.descriptor()) {
        Ok(controller) => controller,
        Err(err) => {
            ctx.assets.release(node);
            return Err(err);
        }
    };

    view.awake(ctx, node, controller);
    Ok(())
}

async fn fetch_node(ctx: &UiContext, descriptor: &ViewDescriptor) -> NavResult<VisualNode> {
    match &descriptor.load {
        LoadStrategy::Lazy { resource } => {
            ctx.assets
                .load(resource)
                .await
                .ok_or_else(|| NavError::AssetUnavailable {
                    view: descriptor.name.clone(),
                    resource: resource.clone(),
                })
        }
        LoadStrategy::External => {
            let parent = descriptor.parent_name().unwrap_or_default();
            let missing = || NavError::MissingSceneNode {
                view: descriptor.name.clone(),
                parent: parent.to_string(),
            };
            let parent_node = ctx
                .find_active(parent)
                .and_then(|view| view.node())
                .ok_or_else(missing)?;
            ctx.assets
                .find_embedded(&parent_node, &descriptor.name)
                .ok_or_else(missing)
        }
    }
}

/// Load children flagged to come up with `parent`. One level only.
async fn load_attached_children(ctx: &UiContext, parent: &Arc<ViewInstance>) {
    let Some(container) = parent.children() else {
        return;
    };

    for child_name in ctx.registry.children_of(parent.name()) {
        let loads_with_parent = ctx
            .registry
            .resolve(child_name)
            .is_ok_and(ViewDescriptor::loads_with_parent);
        if !loads_with_parent {
            continue;
        }

        match load_view(ctx, child_name, false).await {
            Some(child) => container.attach(ctx, parent, &child),
            None => warn!("{} came up without child {}", parent.name(), child_name),
        }
    }
}
