use std::io::{Read, Write};
use std::sync::mpsc;
use std::thread;

use log::{debug, warn};

use crate::error::{EmptyGraphError, Error};
use crate::smf::{self, Event};

use super::graph::TransitionGraph;

/// How a generation walk ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
	/// The requested number of transitions was performed.
	Complete,
	/// A state with no outgoing transitions was reached before that.
	DeadEnd,
}

/// A generated event sequence together with how its walk ended.
///
/// The sequence always contains at least the starting state, so its length
/// is between 1 and one more than the requested transition count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Generation {
	pub events: Vec<Event>,
	pub outcome: Outcome,
}

impl Generation {
	/// True if the walk performed every requested transition.
	pub fn is_complete(&self) -> bool {
		self.outcome == Outcome::Complete
	}
}

/// Outcome of ingesting one source during [`MidiGenerator::ingest_all`].
///
/// A successful result carries the number of events the source contributed
/// to the model.
#[derive(Debug)]
pub struct SourceReport {
	pub source: String,
	pub result: Result<usize, Error>,
}

/// High-level interface over a [`TransitionGraph`].
///
/// # Responsibilities
/// - Build the graph from event sequences or whole SMF streams
/// - Ingest several sources in parallel, one thread per source
/// - Generate new sequences as bounded random walks
/// - Serialize a generated sequence back to an SMF image
#[derive(Clone, Debug, Default)]
pub struct MidiGenerator {
	graph: TransitionGraph,
}

impl MidiGenerator {
	/// Creates a generator with an empty graph.
	pub fn new() -> Self {
		Self { graph: TransitionGraph::new() }
	}

	/// Wraps an already built graph.
	pub fn from_graph(graph: TransitionGraph) -> Self {
		Self { graph }
	}

	/// Read-only access to the underlying graph.
	pub fn graph(&self) -> &TransitionGraph {
		&self.graph
	}

	/// Records every consecutive pair of `events` as a transition.
	///
	/// Sequences shorter than two events contribute nothing.
	pub fn ingest_events(&mut self, events: &[Event]) {
		for pair in events.windows(2) {
			self.graph.add_transition(pair[0], pair[1]);
		}
	}

	/// Decodes one SMF stream and ingests its event sequence.
	///
	/// Returns the number of events the stream decoded to.
	///
	/// # Errors
	/// Decoding errors are passed through. A failed source leaves the graph
	/// untouched: nothing is ingested from a stream that does not decode.
	pub fn ingest<R: Read>(&mut self, input: R) -> Result<usize, Error> {
		let events = smf::decode(input)?;
		self.ingest_events(&events);
		Ok(events.len())
	}

	/// Ingests several named sources in parallel and merges the results.
	///
	/// Each source is decoded and counted on its own thread into a private
	/// partial graph; the partial graphs are then merged here. Since merging
	/// sums occurrence counts, the combined graph is identical to what
	/// sequential ingestion would have produced.
	///
	/// A failing source is logged and skipped, it does not abort the others.
	/// The returned reports follow the input order, one per source, each
	/// carrying the source name and its event count or error.
	pub fn ingest_all<R>(&mut self, sources: Vec<(String, R)>) -> Vec<SourceReport>
	where
		R: Read + Send + 'static,
	{
		let (tx, rx) = mpsc::channel();
		for (index, (source, input)) in sources.into_iter().enumerate() {
			let tx = tx.clone();

			thread::spawn(move || {
				let mut partial = MidiGenerator::new();
				let result = partial.ingest(input);
				tx.send((index, source, result, partial.graph))
					.expect("Failed to send from thread");
			});
		}
		drop(tx);

		let mut reports = Vec::new();
		for (index, source, result, partial) in rx.iter() {
			match &result {
				Ok(count) => {
					debug!("ingested {source}: {count} events");
					self.graph.merge(partial);
				}
				Err(error) => warn!("skipping {source}: {error}"),
			}
			reports.push((index, SourceReport { source, result }));
		}

		// Channel delivery order depends on thread scheduling
		reports.sort_by_key(|(index, _)| *index);
		reports.into_iter().map(|(_, report)| report).collect()
	}

	/// Walks the graph from `start`, performing at most `iterations`
	/// weighted random transitions.
	///
	/// The walk ends early when it reaches a state with no outgoing
	/// transitions; that is a property of the generated sequence, not a
	/// failure, so the events gathered so far are still returned.
	///
	/// # Notes
	/// - `start` does not have to be a state of the graph. An unknown start
	///   dead-ends immediately, yielding a one-event sequence.
	pub fn walk_from(&self, start: Event, iterations: usize) -> Generation {
		let mut events = vec![start];
		let mut current = start;
		for _ in 0..iterations {
			match self.graph.transition(&current) {
				Ok(next) => {
					events.push(next);
					current = next;
				}
				Err(_) => return Generation { events, outcome: Outcome::DeadEnd },
			}
		}
		Generation { events, outcome: Outcome::Complete }
	}

	/// Generates a sequence of at most `iterations` transitions from a
	/// uniformly random starting state.
	///
	/// # Errors
	/// [`EmptyGraphError`] if nothing has been ingested yet. A dead end
	/// during the walk is not an error, see [`Self::walk_from`].
	pub fn generate(&self, iterations: usize) -> Result<Generation, EmptyGraphError> {
		let start = self.graph.random_state()?;
		Ok(self.walk_from(start, iterations))
	}

	/// Generates a sequence and writes it to `writer` as a complete SMF
	/// image.
	///
	/// Returns the generation itself so the caller can inspect what was
	/// written.
	///
	/// # Errors
	/// [`Error::EmptyGraph`] if nothing has been ingested, [`Error::Io`] if
	/// the writer fails. Encoding errors cannot arise from a walk, every
	/// state of the graph came out of the decoder serializable.
	pub fn write_smf<W: Write>(&self, writer: W, iterations: usize) -> Result<Generation, Error> {
		let generation = self.generate(iterations)?;
		if !generation.is_complete() {
			warn!(
				"walk dead-ended after {} of {} transitions",
				generation.events.len() - 1,
				iterations
			);
		}
		smf::encode(writer, &generation.events)?;
		Ok(generation)
	}
}
