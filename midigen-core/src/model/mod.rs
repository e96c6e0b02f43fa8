//! Top-level module for the Markov generation system.
//!
//! This module provides a first-order Markov chain over MIDI events:
//! - A weighted transition graph (`TransitionGraph`)
//! - Internal per-state bookkeeping (`StateNode`)
//! - A high-level ingestion and generation interface (`MidiGenerator`)

/// High-level interface for building a model from MIDI sources and
/// generating new sequences.
///
/// Exposes sequential and parallel ingestion, random walks, and
/// serialization of generated sequences back to a file image.
pub mod generator;

/// Weighted directed graph of MIDI events.
///
/// Handles transition counting, uniform start-state selection, and
/// probabilistic successor sampling.
pub mod graph;

/// Internal representation of a single graph state.
///
/// Tracks outgoing transitions and supports weighted random sampling.
/// This module is not exposed publicly.
mod state;
