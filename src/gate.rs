//! Transition serialization ("busy mask")
//!
//! Two independent mechanisms:
//! - [`TransitionGate`]: per-key reentrancy guard. While a push or pop is in
//!   flight on a layer, further navigation on that layer is dropped.
//! - [`InputBlocker`]: process-wide, reference counted input block held while
//!   any enter/exit animation plays.
//!
//! Both hand out RAII passes so a transition that returns early still releases.

use crate::descriptor::Layer;
use log::{debug, info};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// What a gate guards
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GateKey {
    /// A top-level layer container
    Layer(Layer),

    /// The child container of one parent view
    Children(String),
}

impl fmt::Display for GateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateKey::Layer(layer) => write!(f, "layer:{}", layer),
            GateKey::Children(parent) => write!(f, "children:{}", parent),
        }
    }
}

/// Direction of the transition asking for the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateMode {
    Push,
    Pop,
    /// Pop and push under one acquisition
    PopThenPush,
}

#[derive(Debug, Default, Clone, Copy)]
struct GuardFlags {
    pushing: bool,
    popping: bool,
}

impl GuardFlags {
    fn busy(&self) -> bool {
        self.pushing || self.popping
    }
}

/// Per-key pushing/popping flags
#[derive(Debug, Clone, Default)]
pub struct TransitionGate {
    inner: Arc<Mutex<HashMap<GateKey, GuardFlags>>>,
}

impl TransitionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to start a transition on `key`.
    ///
    /// Returns `None` when a push or pop is already in flight there; the caller
    /// drops its operation. Keys never block each other.
    pub fn try_acquire(&self, key: GateKey, mode: GateMode) -> Option<GatePass> {
        let mut guards = self.inner.lock().unwrap();
        let flags = guards.entry(key.clone()).or_default();
        if flags.busy() {
            debug!(
                "Gate {} busy (pushing={}, popping={}), dropping {:?}",
                key, flags.pushing, flags.popping, mode
            );
            return None;
        }

        match mode {
            GateMode::Push => flags.pushing = true,
            GateMode::Pop => flags.popping = true,
            GateMode::PopThenPush => {
                flags.pushing = true;
                flags.popping = true;
            }
        }

        Some(GatePass {
            gate: self.inner.clone(),
            key,
            mode,
        })
    }

    pub fn is_busy(&self, key: &GateKey) -> bool {
        self.inner
            .lock()
            .unwrap()
            .get(key)
            .is_some_and(GuardFlags::busy)
    }

    pub fn is_pushing(&self, key: &GateKey) -> bool {
        self.inner.lock().unwrap().get(key).is_some_and(|f| f.pushing)
    }

    pub fn is_popping(&self, key: &GateKey) -> bool {
        self.inner.lock().unwrap().get(key).is_some_and(|f| f.popping)
    }
}

/// Held for the duration of one transition; releases its flags on drop
#[must_use = "the gate is released as soon as the pass is dropped"]
pub struct GatePass {
    gate: Arc<Mutex<HashMap<GateKey, GuardFlags>>>,
    key: GateKey,
    mode: GateMode,
}

impl GatePass {
    pub fn key(&self) -> &GateKey {
        &self.key
    }
}

impl fmt::Debug for GatePass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatePass")
            .field("key", &self.key)
            .field("mode", &self.mode)
            .finish()
    }
}

impl Drop for GatePass {
    fn drop(&mut self) {
        let Ok(mut guards) = self.gate.lock() else {
            return;
        };
        if let Some(flags) = guards.get_mut(&self.key) {
            match self.mode {
                GateMode::Push => flags.pushing = false,
                GateMode::Pop => flags.popping = false,
                GateMode::PopThenPush => *flags = GuardFlags::default(),
            }
        }
    }
}

struct BlockerInner {
    depth: Mutex<usize>,
    signal: watch::Sender<bool>,
}

/// Reference-counted global input block
#[derive(Clone)]
pub struct InputBlocker {
    inner: Arc<BlockerInner>,
}

impl InputBlocker {
    pub fn new() -> Self {
        let (signal, _) = watch::channel(false);
        Self {
            inner: Arc::new(BlockerInner {
                depth: Mutex::new(0),
                signal,
            }),
        }
    }

    /// Block input until the returned guard is dropped
    pub fn block(&self) -> InputBlock {
        let mut depth = self.inner.depth.lock().unwrap();
        *depth += 1;
        if *depth == 1 {
            info!("Input blocked");
            self.inner.signal.send_replace(true);
        }
        InputBlock {
            inner: self.inner.clone(),
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.depth() > 0
    }

    /// Number of transitions currently holding the block
    pub fn depth(&self) -> usize {
        *self.inner.depth.lock().unwrap()
    }

    /// Receiver that observes every blocked/unblocked change
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.signal.subscribe()
    }
}

impl Default for InputBlocker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InputBlocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputBlocker")
            .field("depth", &self.depth())
            .finish()
    }
}

#[must_use = "input is unblocked as soon as the guard is dropped"]
pub struct InputBlock {
    inner: Arc<BlockerInner>,
}

impl Drop for InputBlock {
    fn drop(&mut self) {
        let Ok(mut depth) = self.inner.depth.lock() else {
            return;
        };
        *depth = depth.saturating_sub(1);
        if *depth == 0 {
            info!("Input unblocked");
            self.inner.signal.send_replace(false);
        }
    }
}
