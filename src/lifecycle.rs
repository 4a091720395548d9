use serde::Serialize;
use std::fmt;

/// Lifecycle state of a view instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewState {
    /// Instance exists but its node has not been requested
    Unloaded,

    /// Asset load in flight
    Loading,

    /// Node bound, controller awake; dormant until started
    Awake,

    /// Started for the current activation episode, not yet visible
    Started,

    /// Visible and receiving events
    Enabled,

    /// Hidden, state preserved
    Disabled,

    /// Controller torn down
    Destroyed,

    /// Node handed back to the loader
    Released,
}

impl ViewState {
    /// Whether the instance has a live controller that completed Awake
    pub fn is_awake(self) -> bool {
        matches!(
            self,
            ViewState::Awake | ViewState::Started | ViewState::Enabled | ViewState::Disabled
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ViewState::Destroyed | ViewState::Released)
    }
}

impl fmt::Display for ViewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A lifecycle step, as seen by hooks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Load,
    Awake,
    Start,
    Enable,
    Disable,
    /// Forced return to Awake when a stacked view is revisited or goes dormant
    Reset,
    Destroy,
    Release,
}

impl Transition {
    /// State the instance is in after the step
    pub fn target(self) -> ViewState {
        match self {
            Transition::Load => ViewState::Loading,
            Transition::Awake => ViewState::Awake,
            Transition::Start => ViewState::Started,
            Transition::Enable => ViewState::Enabled,
            Transition::Disable => ViewState::Disabled,
            Transition::Reset => ViewState::Awake,
            Transition::Destroy => ViewState::Destroyed,
            Transition::Release => ViewState::Released,
        }
    }
}

/// Outcome of checking a transition against the current state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Perform the transition
    Proceed,

    /// Already in the target state; nothing to do
    AlreadyThere,

    /// Not reachable from the current state
    Illegal,
}

/// Legality table for the lifecycle.
///
/// `Unloaded → Loading → Awake → Started → Enabled ⇄ Disabled → Destroyed → Released`,
/// plus Reset back to Awake from Started or Disabled.
pub fn check(from: ViewState, transition: Transition) -> Step {
    use ViewState::*;

    if from == transition.target() && transition != Transition::Reset {
        return Step::AlreadyThere;
    }

    let legal = match transition {
        Transition::Load => from == Unloaded,
        Transition::Awake => from == Loading,
        Transition::Start => from == Awake,
        Transition::Enable => matches!(from, Started | Disabled),
        Transition::Disable => from == Enabled,
        Transition::Reset => matches!(from, Started | Disabled),
        Transition::Destroy => matches!(from, Awake | Started | Enabled | Disabled),
        Transition::Release => from == Destroyed,
    };

    if legal {
        Step::Proceed
    } else if transition == Transition::Reset && from == Awake {
        Step::AlreadyThere
    } else {
        Step::Illegal
    }
}
