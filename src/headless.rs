//! In-process collaborators with no scene graph behind them.
//!
//! Used by the command line driver and by tests. Both can be steered: loads
//! can be held, delayed or failed, and animations can complete instantly, on a
//! timer, or only when told to.

use crate::collaborators::{AnimationDone, AnimationPlayer, AssetLoader, VisualNode};
use async_trait::async_trait;
use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Default)]
struct LoaderState {
    failing: HashSet<String>,
    holds: HashMap<String, watch::Sender<bool>>,
    loads: HashMap<String, usize>,
    missing_embedded: HashSet<String>,
    released: usize,
}

/// Asset loader that mints a fresh node per request
#[derive(Default)]
pub struct HeadlessLoader {
    delay: Option<Duration>,
    state: Mutex<LoaderState>,
}

impl HeadlessLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every load sleeps this long before answering
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Make loads of `resource` yield nothing
    pub fn fail(&self, resource: &str) {
        self.state.lock().unwrap().failing.insert(resource.to_string());
    }

    pub fn recover(&self, resource: &str) {
        self.state.lock().unwrap().failing.remove(resource);
    }

    /// Park loads of `resource` until [`resume`](Self::resume) is called
    pub fn hold(&self, resource: &str) {
        let (tx, _) = watch::channel(false);
        self.state.lock().unwrap().holds.insert(resource.to_string(), tx);
    }

    pub fn resume(&self, resource: &str) {
        if let Some(tx) = self.state.lock().unwrap().holds.remove(resource) {
            tx.send_replace(true);
        }
    }

    /// Pretend the parent node has no embedded child called `name`
    pub fn exclude_embedded(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .missing_embedded
            .insert(name.to_string());
    }

    /// How many times `resource` was requested
    pub fn loads(&self, resource: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .loads
            .get(resource)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_loads(&self) -> usize {
        self.state.lock().unwrap().loads.values().sum()
    }

    /// Nodes handed back through `release`
    pub fn released(&self) -> usize {
        self.state.lock().unwrap().released
    }
}

#[async_trait]
impl AssetLoader for HeadlessLoader {
    async fn load(&self, resource: &str) -> Option<VisualNode> {
        let hold = {
            let mut state = self.state.lock().unwrap();
            *state.loads.entry(resource.to_string()).or_default() += 1;
            state.holds.get(resource).map(watch::Sender::subscribe)
        };

        if let Some(mut released) = hold {
            debug!("Holding load of {}", resource);
            loop {
                if *released.borrow_and_update() {
                    break;
                }
                if released.changed().await.is_err() {
                    break;
                }
            }
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.state.lock().unwrap().failing.contains(resource) {
            warn!("Resource {} failed to load", resource);
            return None;
        }
        Some(VisualNode::new(resource))
    }

    fn find_embedded(&self, _parent: &VisualNode, name: &str) -> Option<VisualNode> {
        if self.state.lock().unwrap().missing_embedded.contains(name) {
            return None;
        }
        Some(VisualNode::new(name))
    }

    fn release(&self, node: VisualNode) {
        debug!("Released node {} ({})", node.key, node.id);
        self.state.lock().unwrap().released += 1;
    }
}

/// How [`HeadlessAnimator`] completes the tracks it knows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationMode {
    #[default]
    Instant,
    /// Complete after a delay on the current tokio runtime
    Timed(Duration),
    /// Complete only through [`HeadlessAnimator::finish`]
    Manual,
}

#[derive(Default)]
struct AnimatorState {
    mode: AnimationMode,
    played: Vec<(String, String)>,
    pending: Vec<(String, AnimationDone)>,
}

/// Animation player with a fixed set of track names.
/// Unknown tracks complete on the spot.
pub struct HeadlessAnimator {
    tracks: HashSet<String>,
    state: Mutex<AnimatorState>,
}

impl HeadlessAnimator {
    /// Player that knows the default `enter` and `exit` tracks
    pub fn new(mode: AnimationMode) -> Self {
        Self::with_tracks(mode, ["enter", "exit"])
    }

    pub fn with_tracks<I, S>(mode: AnimationMode, tracks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tracks: tracks.into_iter().map(Into::into).collect(),
            state: Mutex::new(AnimatorState {
                mode,
                ..AnimatorState::default()
            }),
        }
    }

    pub fn set_mode(&self, mode: AnimationMode) {
        self.state.lock().unwrap().mode = mode;
    }

    /// Complete every pending track on the node with this key
    pub fn finish(&self, node_key: &str) -> usize {
        let done: Vec<AnimationDone> = {
            let mut state = self.state.lock().unwrap();
            let (matching, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut state.pending)
                .into_iter()
                .partition(|(key, _)| key == node_key);
            state.pending = rest;
            matching.into_iter().map(|(_, callback)| callback).collect()
        };
        let count = done.len();
        done.into_iter().for_each(|callback| callback());
        count
    }

    pub fn finish_all(&self) -> usize {
        let done = std::mem::take(&mut self.state.lock().unwrap().pending);
        let count = done.len();
        done.into_iter().for_each(|(_, callback)| callback());
        count
    }

    /// Tracks started and not yet finished in manual mode
    pub fn pending(&self) -> usize {
        self.state.lock().unwrap().pending.len()
    }

    /// Every `(node key, track)` started so far
    pub fn played(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().played.clone()
    }
}

impl Default for HeadlessAnimator {
    fn default() -> Self {
        Self::new(AnimationMode::Instant)
    }
}

impl AnimationPlayer for HeadlessAnimator {
    fn play_track(&self, node: &VisualNode, track: &str, on_complete: AnimationDone) {
        if !self.tracks.contains(track) {
            on_complete();
            return;
        }

        let mode = {
            let mut state = self.state.lock().unwrap();
            state.played.push((node.key.clone(), track.to_string()));
            if state.mode == AnimationMode::Manual {
                state.pending.push((node.key.clone(), on_complete));
                return;
            }
            state.mode
        };

        match (mode, tokio::runtime::Handle::try_current()) {
            (AnimationMode::Timed(delay), Ok(runtime)) => {
                runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    on_complete();
                });
            }
            _ => on_complete(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter_callback(counter: &Arc<AtomicUsize>) -> AnimationDone {
        let counter = counter.clone();
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test]
    async fn test_loader_counts_and_fails() {
        let loader = HeadlessLoader::new();
        assert!(loader.load("ui/bag").await.is_some());
        loader.fail("ui/bag");
        assert!(loader.load("ui/bag").await.is_none());
        assert_eq!(loader.loads("ui/bag"), 2);

        let parent = VisualNode::new("ui/bag");
        assert!(loader.find_embedded(&parent, "tabs").is_some());
        loader.exclude_embedded("tabs");
        assert!(loader.find_embedded(&parent, "tabs").is_none());
    }

    #[test]
    fn test_manual_tracks_wait_for_finish() {
        let animator = HeadlessAnimator::new(AnimationMode::Manual);
        let counter = Arc::new(AtomicUsize::new(0));
        let a = VisualNode::new("a");
        let b = VisualNode::new("b");

        animator.play_track(&a, "enter", counter_callback(&counter));
        animator.play_track(&b, "exit", counter_callback(&counter));
        // Not a known track, completes right away and is not recorded
        animator.play_track(&a, "wiggle", counter_callback(&counter));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(animator.pending(), 2);

        assert_eq!(animator.finish("b"), 1);
        assert_eq!(animator.finish_all(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(animator.played().len(), 2);
    }

    #[tokio::test]
    async fn test_timed_tracks_complete_later() {
        let animator = HeadlessAnimator::new(AnimationMode::Timed(Duration::from_millis(5)));
        let counter = Arc::new(AtomicUsize::new(0));

        animator.play_track(&VisualNode::new("a"), "enter", counter_callback(&counter));
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
