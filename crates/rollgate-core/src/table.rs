//! Transition table and the trigger function.
//!
//! The table is an ordered list of `(from, event, to)` rows. Lookups scan
//! in order and the first matching row wins, so a later row with the same
//! `(from, event)` pair is shadowed. Nothing is validated on construction;
//! [`TransitionTable::lint`] reports suspicious rows without rejecting them.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::types::{Event, State};

/// A single `(from, event) → to` rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: State,
    pub event: Event,
    pub to: State,
}

impl Transition {
    pub const fn new(from: State, event: Event, to: State) -> Self {
        Self { from, event, to }
    }
}

/// Return the next state for `(state, event)`, or `None` if no row matches.
pub fn lookup(transitions: &[Transition], state: State, event: Event) -> Option<State> {
    transitions
        .iter()
        .find(|t| t.from == state && t.event == event)
        .map(|t| t.to)
}

/// Apply `event` to `state`. Unmatched events leave the state unchanged.
pub fn trigger(transitions: &[Transition], state: State, event: Event) -> State {
    lookup(transitions, state, event).unwrap_or(state)
}

/// Ordered, read-only collection of transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransitionTable {
    transitions: Vec<Transition>,
}

impl TransitionTable {
    pub fn new(transitions: Vec<Transition>) -> Self {
        Self { transitions }
    }

    /// The default wiring: a generic-event loop plus the domain path
    /// `Pending → Deploying → StartupSuccess → ReadinessSuccess`.
    pub fn standard() -> Self {
        use Event::*;
        use State::*;

        Self::new(vec![
            Transition::new(Pending, Event1, Deploying),
            Transition::new(Deploying, Event2, StartupSuccess),
            Transition::new(StartupSuccess, Event3, Pending),
            Transition::new(Pending, StartupDeploy, Deploying),
            Transition::new(Deploying, StartupProbe, StartupSuccess),
            Transition::new(StartupSuccess, ReadinessProbe, ReadinessSuccess),
            Transition::new(Pending, Event2, Failure),
            Transition::new(Deploying, Event3, Revoked),
        ])
    }

    pub fn lookup(&self, state: State, event: Event) -> Option<State> {
        lookup(&self.transitions, state, event)
    }

    pub fn trigger(&self, state: State, event: Event) -> State {
        trigger(&self.transitions, state, event)
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Report rows that can never fire or that leave a terminal state.
    pub fn lint(&self) -> Vec<LintNote> {
        let mut seen = HashSet::new();
        let mut notes = Vec::new();

        for (index, t) in self.transitions.iter().enumerate() {
            if !seen.insert((t.from, t.event)) {
                notes.push(LintNote::Shadowed {
                    index,
                    transition: *t,
                });
            }
            if t.from.is_terminal() {
                notes.push(LintNote::FromTerminal {
                    index,
                    transition: *t,
                });
            }
        }

        notes
    }
}

impl Default for TransitionTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl From<Vec<Transition>> for TransitionTable {
    fn from(transitions: Vec<Transition>) -> Self {
        Self::new(transitions)
    }
}

/// Non-fatal finding about a table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LintNote {
    /// An earlier row has the same `(from, event)` pair; this one never fires.
    Shadowed { index: usize, transition: Transition },
    /// The row leaves a terminal state, which the control loop never does.
    FromTerminal { index: usize, transition: Transition },
}

impl std::fmt::Display for LintNote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LintNote::Shadowed { index, transition } => write!(
                f,
                "row {index}: ({}, {}) is shadowed by an earlier row",
                transition.from, transition.event
            ),
            LintNote::FromTerminal { index, transition } => write!(
                f,
                "row {index}: leaves terminal state {}",
                transition.from
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use State::*;

    #[test]
    fn standard_domain_path() {
        let table = TransitionTable::standard();
        assert_eq!(table.trigger(Pending, Event::StartupDeploy), Deploying);
        assert_eq!(table.trigger(Deploying, Event::StartupProbe), StartupSuccess);
        assert_eq!(
            table.trigger(StartupSuccess, Event::ReadinessProbe),
            ReadinessSuccess
        );
    }

    #[test]
    fn standard_generic_rows() {
        let table = TransitionTable::standard();
        assert_eq!(table.len(), 8);
        assert_eq!(table.trigger(Pending, Event::Event1), Deploying);
        assert_eq!(table.trigger(StartupSuccess, Event::Event3), Pending);
        assert_eq!(table.trigger(Pending, Event::Event2), Failure);
        assert_eq!(table.trigger(Deploying, Event::Event3), Revoked);
    }

    #[test]
    fn unmatched_event_is_identity() {
        let table = TransitionTable::standard();
        for state in State::ALL {
            for event in Event::ALL {
                if table.lookup(state, event).is_none() {
                    assert_eq!(table.trigger(state, event), state);
                }
            }
        }
        assert_eq!(table.trigger(ReadinessSuccess, Event::StartupDeploy), ReadinessSuccess);
    }

    #[test]
    fn every_row_is_honored_unless_shadowed() {
        let table = TransitionTable::standard();
        assert!(table.lint().is_empty());
        for t in table.transitions() {
            assert_eq!(table.trigger(t.from, t.event), t.to);
        }
    }

    #[test]
    fn first_match_wins() {
        let table = TransitionTable::new(vec![
            Transition::new(Pending, Event::StartupDeploy, Failure),
            Transition::new(Pending, Event::StartupDeploy, Deploying),
        ]);
        assert_eq!(table.trigger(Pending, Event::StartupDeploy), Failure);
        assert_eq!(
            table.lint(),
            vec![LintNote::Shadowed {
                index: 1,
                transition: Transition::new(Pending, Event::StartupDeploy, Deploying),
            }]
        );
    }

    #[test]
    fn trigger_is_idempotent() {
        let table = TransitionTable::standard();
        let before = table.clone();
        for state in State::ALL {
            for event in Event::ALL {
                assert_eq!(table.trigger(state, event), table.trigger(state, event));
            }
        }
        assert_eq!(table, before);
    }

    #[test]
    fn empty_table_never_moves() {
        let table = TransitionTable::new(Vec::new());
        assert!(table.is_empty());
        assert_eq!(trigger(table.transitions(), Deploying, Event::StartupProbe), Deploying);
    }

    #[test]
    fn lint_flags_terminal_source() {
        let table = TransitionTable::new(vec![Transition::new(
            Failure,
            Event::Event1,
            Pending,
        )]);
        let notes = table.lint();
        assert_eq!(notes.len(), 1);
        assert!(notes[0].to_string().contains("terminal state failure"));
    }

    #[test]
    fn table_serializes_as_list() {
        let table = TransitionTable::new(vec![Transition::new(
            Pending,
            Event::StartupDeploy,
            Deploying,
        )]);
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(
            json,
            r#"[{"from":"pending","event":"startup_deploy","to":"deploying"}]"#
        );
    }
}
