//! Cross-cutting observers of lifecycle transitions

use crate::events::EventRouter;
use crate::instance::ViewInstance;
use crate::lifecycle::Transition;
use log::debug;
use serde_json::Value;
use std::sync::{Arc, Weak};

/// Bracket around every lifecycle transition.
///
/// `before` runs once the transition has been admitted, ahead of the
/// controller callback and any animation; `after` runs when the step is
/// complete. Rejected or repeated transitions call neither.
pub trait LifecycleHook: Send + Sync {
    fn before(&self, _view: &Arc<ViewInstance>, _transition: Transition) {}
    fn after(&self, _view: &Arc<ViewInstance>, _transition: Transition) {}
}

/// Subscribes a view's declared events on Enable and drops them on Disable or Destroy
pub struct EventSubscriptionHook {
    router: Arc<EventRouter>,
}

impl EventSubscriptionHook {
    pub fn new(router: Arc<EventRouter>) -> Self {
        Self { router }
    }

    fn subscribe(&self, view: &Arc<ViewInstance>) {
        let mut subscribed = view.subscriptions.lock().unwrap();
        for event in view.declared_events() {
            if subscribed.contains(&event) {
                continue;
            }
            let target: Weak<ViewInstance> = Arc::downgrade(view);
            let registered = self.router.register(
                &event,
                view.id(),
                Arc::new(move |event: &str, args: &[Value]| {
                    if let Some(view) = target.upgrade() {
                        view.dispatch_event(event, args);
                    }
                }),
            );
            if registered {
                subscribed.push(event);
            }
        }
        if !subscribed.is_empty() {
            debug!("{} listening to {:?}", view.name(), *subscribed);
        }
    }

    fn unsubscribe(&self, view: &Arc<ViewInstance>) {
        let mut subscribed = view.subscriptions.lock().unwrap();
        for event in subscribed.drain(..) {
            self.router.unregister(&event, view.id());
        }
    }
}

impl LifecycleHook for EventSubscriptionHook {
    fn before(&self, view: &Arc<ViewInstance>, transition: Transition) {
        if matches!(transition, Transition::Disable | Transition::Destroy) {
            self.unsubscribe(view);
        }
    }

    fn after(&self, view: &Arc<ViewInstance>, transition: Transition) {
        if transition == Transition::Enable {
            self.subscribe(view);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::VisualNode;
    use crate::context::UiContext;
    use crate::descriptor::{DescriptorRegistry, Layer, ViewDescriptor};
    use crate::testing::{Recorder, test_context};
    use serde_json::json;

    fn shop_registry() -> DescriptorRegistry {
        let mut registry = DescriptorRegistry::new();
        registry.register(ViewDescriptor::new("shop", Layer::Panel)).unwrap();
        registry
    }

    fn awake_shop(ctx: &UiContext, recorder: &Recorder) -> Arc<ViewInstance> {
        let descriptor = ctx.registry.resolve_shared("shop").unwrap();
        let view = Arc::new(ViewInstance::new(descriptor, false));
        view.begin_load(ctx);
        view.awake(ctx, VisualNode::new("shop"), recorder.controller("shop"));
        view
    }

    #[tokio::test]
    async fn test_subscriptions_follow_enable_and_disable() {
        let (ctx, _, _) = test_context(shop_registry());
        let recorder = Recorder::default().listening("shop", &["gold_changed", "tick"]);
        let view = awake_shop(&ctx, &recorder);

        assert_eq!(ctx.events.notify("gold_changed", &[]), 0);

        view.activate(&ctx).await;
        assert_eq!(ctx.events.registration_count(), 2);
        ctx.events.notify("gold_changed", &[json!(5)]);

        view.deactivate(&ctx).await;
        assert_eq!(ctx.events.registration_count(), 0);
        ctx.events.notify("gold_changed", &[json!(6)]);

        // Re-enable must not double register
        view.activate(&ctx).await;
        view.enable(&ctx).await;
        assert_eq!(ctx.events.subscriber_count("tick"), 1);

        view.destroy(&ctx);
        assert_eq!(ctx.events.registration_count(), 0);

        let notified: Vec<_> = recorder
            .calls("shop")
            .into_iter()
            .filter(|call| call.starts_with("notify"))
            .collect();
        assert_eq!(notified, ["notify gold_changed [5]"]);
    }
}
