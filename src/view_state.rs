use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ViewState {
    #[default]
    Upload,
    Dashboard,
    Results,
    History,
}

impl ViewState {
    pub const ALL: [ViewState; 4] = [
        ViewState::Upload,
        ViewState::Dashboard,
        ViewState::Results,
        ViewState::History,
    ];

    /// Views that stay reachable before any sequence has been uploaded.
    pub fn is_always_open(self) -> bool {
        matches!(self, Self::Upload | Self::History)
    }

    pub fn shows_scene(self) -> bool {
        matches!(self, Self::Dashboard | Self::Results)
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Upload => "Upload",
            Self::Dashboard => "Dashboard",
            Self::Results => "Results",
            Self::History => "History",
        }
    }
}

impl fmt::Display for ViewState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.title())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub from: ViewState,
    pub to: ViewState,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Please upload a sequence first")]
    SequenceRequired { target: ViewState },
}

pub type TransitionObserver = Box<dyn FnMut(&Transition)>;

#[derive(Default)]
pub struct ViewStateMachine {
    current: ViewState,
    uploaded: bool,
    observers: Vec<TransitionObserver>,
}

impl fmt::Debug for ViewStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ViewStateMachine")
            .field("current", &self.current)
            .field("uploaded", &self.uploaded)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl ViewStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> ViewState {
        self.current
    }

    pub fn uploaded(&self) -> bool {
        self.uploaded
    }

    pub fn is_reachable(&self, target: ViewState) -> bool {
        self.uploaded || target.is_always_open()
    }

    /// Set once the first upload succeeds; there is no way back.
    pub fn mark_uploaded(&mut self) {
        self.uploaded = true;
    }

    pub fn add_observer(&mut self, observer: TransitionObserver) {
        self.observers.push(observer);
    }

    /// Swaps the active view and notifies every observer. Re-entering the
    /// current view still counts as a transition.
    pub fn transition(&mut self, target: ViewState) -> Result<Transition, TransitionError> {
        if !self.is_reachable(target) {
            warn!("Rejected transition to {target}: no sequence uploaded");
            return Err(TransitionError::SequenceRequired { target });
        }
        let transition = Transition {
            from: self.current,
            to: target,
        };
        self.current = target;
        debug!("View {} -> {}", transition.from, transition.to);
        for observer in &mut self.observers {
            observer(&transition);
        }
        Ok(transition)
    }
}
