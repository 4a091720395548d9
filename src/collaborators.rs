//! Narrow interfaces to the systems the engine drives but does not own:
//! asset loading, scene nodes and animation playback.

use async_trait::async_trait;
use futures::channel::oneshot;
use log::{debug, warn};
use serde::Serialize;
use uuid::Uuid;

/// Opaque handle to a node in the external scene graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct VisualNode {
    pub id: Uuid,
    /// Resource key or embedded name the node came from
    pub key: String,
}

impl VisualNode {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            key: key.into(),
        }
    }
}

/// Resolves resource keys to live scene nodes
#[async_trait]
pub trait AssetLoader: Send + Sync {
    /// Instantiate the node for a resource. `None` aborts that one load.
    async fn load(&self, resource: &str) -> Option<VisualNode>;

    /// Look up a node pre-placed under `parent` by name
    fn find_embedded(&self, _parent: &VisualNode, _name: &str) -> Option<VisualNode> {
        None
    }

    /// Hand a node back once its view is destroyed
    fn release(&self, _node: VisualNode) {}
}

/// Completion callback for an animation track
pub type AnimationDone = Box<dyn FnOnce() + Send>;

/// Plays named tracks on nodes.
///
/// Implementations must invoke `on_complete` immediately when the node has no
/// track with that name.
pub trait AnimationPlayer: Send + Sync {
    fn play_track(&self, node: &VisualNode, track: &str, on_complete: AnimationDone);
}

/// Player that has no tracks at all
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAnimation;

impl AnimationPlayer for NoAnimation {
    fn play_track(&self, _node: &VisualNode, _track: &str, on_complete: AnimationDone) {
        on_complete();
    }
}

/// Play a track and suspend until the player reports completion
pub(crate) async fn play_and_wait(player: &dyn AnimationPlayer, node: &VisualNode, track: &str) {
    let (tx, rx) = oneshot::channel::<()>();
    player.play_track(
        node,
        track,
        Box::new(move || {
            let _ = tx.send(());
        }),
    );

    match rx.await {
        Ok(()) => debug!("Track '{}' finished on {}", track, node.key),
        // Player dropped the callback without calling it; treat as finished
        Err(_) => warn!("Track '{}' on {} was dropped without completing", track, node.key),
    }
}
