use std::collections::HashMap;

use rand::Rng;

use crate::smf::Event;

/// Represents a state in the transition graph.
///
/// A `StateNode` belongs to one source event (the key it is stored under in
/// the graph) and stores all observed transitions from that event to its
/// successors.
///
/// Conceptually, this is a node in a Markov chain where outgoing edges
/// are weighted by their number of observations.
///
/// ## Responsibilities:
/// - Accumulate transition occurrences during ingestion
/// - Sample the next event using weighted random sampling
/// - Merge with the node for the same event from another graph
///
/// ## Invariants
/// - Each transition occurrence count is strictly positive
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct StateNode {
	/// Outgoing transitions indexed by the successor event.
	/// The value represents how many times this transition was observed.
	transitions: HashMap<Event, usize>,
}

impl StateNode {
	/// Creates a new node with no outgoing transitions.
	pub(crate) fn new() -> Self {
		Self { transitions: HashMap::new() }
	}

	/// Records an occurrence of a transition toward `next`.
	///
	/// - If the transition already exists, its occurrence count is increased.
	/// - Otherwise, a new transition is created with an initial count of 1.
	pub(crate) fn record(&mut self, next: Event) {
		*self.transitions.entry(next).or_insert(0) += 1;
	}

	/// Samples the next event using weighted random sampling.
	///
	/// The probability of selecting a successor is proportional to its
	/// occurrence count.
	///
	/// This method performs:
	/// - an O(n) scan over the transitions
	/// - a cumulative subtraction to select a bucket
	///
	/// Returns `None` if the node has no transitions.
	pub(crate) fn sample(&self) -> Option<Event> {
		if self.transitions.is_empty() {
			return None;
		}

		// Compute the total number of occurrences
		let total: usize = self.transitions.values().sum();

		// Randomly select a successor
		let mut r = rand::rng().random_range(0..total);

		let mut fallback: Option<Event> = None;
		for (next, occurrence) in &self.transitions {
			if r < *occurrence {
				return Some(*next);
			}
			r -= occurrence;
			fallback = Some(*next);
		}

		// Unreachable while counts stay positive, kept for safety.
		fallback
	}

	/// Merges the node for the same event from another graph into this one.
	///
	/// Transition occurrence counts are summed. This method is intended for
	/// parallel ingestion, where multiple partial graphs are combined into a
	/// single one.
	pub(crate) fn merge(&mut self, other: Self) {
		for (next, occurrence) in other.transitions {
			*self.transitions.entry(next).or_insert(0) += occurrence;
		}
	}

	/// Number of times the transition toward `next` was observed.
	pub(crate) fn count(&self, next: &Event) -> usize {
		self.transitions.get(next).copied().unwrap_or(0)
	}

	/// Number of distinct successors.
	pub(crate) fn len(&self) -> usize {
		self.transitions.len()
	}
}
