use std::collections::HashMap;

use rand::prelude::IteratorRandom;

use crate::error::{DeadEndError, EmptyGraphError};
use crate::smf::Event;

use super::state::StateNode;

/// Represents a first-order Markov chain over MIDI events.
///
/// The `TransitionGraph` stores one state per distinct event value and
/// allows probabilistic selection of the next event based on observed
/// sequences. Events compare by value, delta-time included, so two
/// otherwise identical notes at different time offsets are distinct states.
///
/// # Responsibilities
/// - Accumulate transition counts from observed event pairs
/// - Pick a uniformly random state to start a walk from
/// - Sample a successor for a state, weighted by occurrence counts
/// - Merge with another graph built from different sources
///
/// # Invariants
/// - Every endpoint of a recorded transition is present as a state
/// - All transition occurrence counts are >= 1
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransitionGraph {
	/// Mapping from an event to the node holding its outgoing transitions.
	states: HashMap<Event, StateNode>,
}

impl TransitionGraph {
	/// Creates a new empty graph.
	pub fn new() -> Self {
		Self { states: HashMap::new() }
	}

	/// True if the graph holds no states at all.
	pub fn is_empty(&self) -> bool {
		self.states.is_empty()
	}

	/// Number of distinct states.
	pub fn state_count(&self) -> usize {
		self.states.len()
	}

	/// Number of distinct directed edges, ignoring their weights.
	pub fn edge_count(&self) -> usize {
		self.states.values().map(StateNode::len).sum()
	}

	/// Number of times the transition `from -> to` was observed.
	///
	/// Returns 0 for unknown states as well as unobserved pairs.
	pub fn count(&self, from: &Event, to: &Event) -> usize {
		self.states.get(from).map_or(0, |node| node.count(to))
	}

	/// True if `state` is a source or destination of any recorded transition.
	pub fn contains(&self, state: &Event) -> bool {
		self.states.contains_key(state)
	}

	/// Records one observation of the transition `from -> to`.
	///
	/// Both endpoints become states of the graph: the destination is
	/// registered even when nothing has been observed leaving it yet, so a
	/// random walk may legitimately start (or end up) there.
	pub fn add_transition(&mut self, from: Event, to: Event) {
		self.states.entry(from).or_insert_with(StateNode::new).record(to);
		self.states.entry(to).or_insert_with(StateNode::new);
	}

	/// Returns a uniformly random state of the graph.
	///
	/// Every state has the same chance of being picked, regardless of how
	/// often it was observed. Useful for starting a generation walk.
	///
	/// # Errors
	/// [`EmptyGraphError`] if the graph has no states.
	pub fn random_state(&self) -> Result<Event, EmptyGraphError> {
		self.states
			.keys()
			.choose(&mut rand::rng())
			.copied()
			.ok_or(EmptyGraphError)
	}

	/// Samples a successor of `from`, weighted by occurrence counts.
	///
	/// The probability of each successor is proportional to how often the
	/// transition toward it was observed.
	///
	/// # Errors
	/// [`DeadEndError`] if `from` has no outgoing transitions, or is not a
	/// state of this graph at all.
	pub fn transition(&self, from: &Event) -> Result<Event, DeadEndError> {
		self.states
			.get(from)
			.and_then(StateNode::sample)
			.ok_or(DeadEndError)
	}

	/// Merges another graph into this one.
	///
	/// Occurrence counts for matching transitions are summed, states known
	/// to only one side are carried over unchanged. The operation is
	/// commutative: merging a set of partial graphs yields the same counts
	/// in any order.
	pub fn merge(&mut self, other: Self) {
		for (state, node) in other.states {
			if let Some(existing) = self.states.get_mut(&state) {
				existing.merge(node);
			} else {
				self.states.insert(state, node);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn event(data1: u8) -> Event {
		Event::new(0, 0x90, data1, 0x40)
	}

	#[test]
	fn add_transition_registers_both_endpoints() {
		let mut graph = TransitionGraph::new();
		graph.add_transition(event(60), event(62));

		assert!(graph.contains(&event(60)));
		assert!(graph.contains(&event(62)));
		assert_eq!(graph.state_count(), 2);
		assert_eq!(graph.edge_count(), 1);
		assert_eq!(graph.count(&event(60), &event(62)), 1);
	}

	#[test]
	fn repeated_transitions_increase_the_count_not_the_edges() {
		let mut graph = TransitionGraph::new();
		for _ in 0..3 {
			graph.add_transition(event(60), event(62));
		}
		assert_eq!(graph.edge_count(), 1);
		assert_eq!(graph.count(&event(60), &event(62)), 3);
	}

	#[test]
	fn events_differing_only_by_delta_time_are_distinct_states() {
		let mut graph = TransitionGraph::new();
		graph.add_transition(Event::new(0, 0x90, 60, 64), event(62));
		graph.add_transition(Event::new(480, 0x90, 60, 64), event(62));
		assert_eq!(graph.state_count(), 3);
	}

	#[test]
	fn transition_returns_a_recorded_successor() {
		let mut graph = TransitionGraph::new();
		graph.add_transition(event(60), event(62));
		graph.add_transition(event(60), event(64));

		for _ in 0..50 {
			let next = graph.transition(&event(60)).unwrap();
			assert!(next == event(62) || next == event(64));
		}
	}

	#[test]
	fn random_state_on_an_empty_graph_fails() {
		assert_eq!(TransitionGraph::new().random_state(), Err(EmptyGraphError));
	}

	#[test]
	fn random_state_returns_a_known_state() {
		let mut graph = TransitionGraph::new();
		graph.add_transition(event(60), event(62));
		let state = graph.random_state().unwrap();
		assert!(graph.contains(&state));
	}

	#[test]
	fn transition_from_a_terminal_state_is_a_dead_end() {
		let mut graph = TransitionGraph::new();
		graph.add_transition(event(60), event(62));
		// 62 was only ever seen as a destination
		assert_eq!(graph.transition(&event(62)), Err(DeadEndError));
	}

	#[test]
	fn a_graph_of_one_isolated_state_always_dead_ends() {
		let mut graph = TransitionGraph::new();
		graph.states.insert(event(60), StateNode::new());

		assert_eq!(graph.random_state(), Ok(event(60)));
		assert_eq!(graph.transition(&event(60)), Err(DeadEndError));
	}

	#[test]
	fn merge_is_commutative() {
		let mut left = TransitionGraph::new();
		left.add_transition(event(60), event(62));
		left.add_transition(event(60), event(62));
		left.add_transition(event(62), event(64));

		let mut right = TransitionGraph::new();
		right.add_transition(event(60), event(62));
		right.add_transition(event(64), event(60));

		let mut left_first = left.clone();
		left_first.merge(right.clone());
		let mut right_first = right;
		right_first.merge(left);

		assert_eq!(left_first, right_first);
		assert_eq!(left_first.count(&event(60), &event(62)), 3);
		assert_eq!(left_first.edge_count(), 3);
	}

	#[test]
	fn merging_an_empty_graph_changes_nothing() {
		let mut graph = TransitionGraph::new();
		graph.add_transition(event(60), event(62));
		let before = graph.clone();
		graph.merge(TransitionGraph::new());
		assert_eq!(graph, before);
	}

	#[test]
	fn sampling_follows_the_observed_weights() {
		let mut graph = TransitionGraph::new();
		for _ in 0..3 {
			graph.add_transition(event(60), event(62));
		}
		graph.add_transition(event(60), event(64));

		let runs = 4000;
		let mut heavy = 0;
		for _ in 0..runs {
			if graph.transition(&event(60)).unwrap() == event(62) {
				heavy += 1;
			}
		}

		// Expected ratio is 3:1. The tolerance is loose enough that a
		// legitimate run practically cannot fall outside it.
		assert!((2700..=3300).contains(&heavy), "heavy branch taken {heavy} times out of {runs}");
	}
}
