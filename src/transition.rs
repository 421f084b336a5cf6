//! Append-only log of the transitions applied to the fleet.
use crate::ranking::SwitchType;
use crate::region::RegionID;
use crate::technology::{ProductID, TechnologyID};
use serde::Serialize;

/// One transition event.
///
/// Greenfield builds have no origin technology; decommissions have no destination.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Transition {
    /// The year the transition takes effect
    pub year: u32,
    /// The kind of switch
    pub switch_type: SwitchType,
    /// The product of the asset involved
    pub product: ProductID,
    /// The region of the asset involved
    pub region: RegionID,
    /// Technology switched away from
    pub origin: Option<TechnologyID>,
    /// Technology switched to
    pub destination: Option<TechnologyID>,
}

/// The registry of transitions recorded over a run. Events are never mutated after append.
#[derive(Clone, Debug, Default)]
pub struct TransitionRegistry {
    transitions: Vec<Transition>,
}

impl TransitionRegistry {
    /// Append a transition to the log
    pub fn record(&mut self, transition: Transition) {
        self.transitions.push(transition);
    }

    /// Iterate over the recorded transitions in order
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.iter()
    }

    /// Number of recorded transitions
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Whether no transitions have been recorded
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Number of recorded transitions of the given kind
    pub fn count_of(&self, switch_type: SwitchType) -> usize {
        self.transitions
            .iter()
            .filter(|t| t.switch_type == switch_type)
            .count()
    }
}
