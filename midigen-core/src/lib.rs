//! Markov-chain MIDI generation library.
//!
//! This crate learns a transition model from Standard MIDI Files (SMF) and
//! samples new event sequences from it, including:
//! - A binary SMF codec (decode into timed channel events, encode back)
//! - A weighted transition graph over observed events
//! - A generator that merges several input sources into one model and
//!   performs a bounded random walk over it
//!
//! Input and output are plain byte streams; where those bytes come from
//! (files, HTTP bodies) is the caller's concern.

/// Error kinds shared by the codec and the model.
///
/// One umbrella [`error::Error`] plus narrow per-operation errors so that
/// callers can tell a malformed source from an unusable model.
pub mod error;

/// Transition graph and sequence generation.
///
/// This module exposes the graph and the high-level generator while keeping
/// the per-state bookkeeping private.
pub mod model;

/// Standard MIDI File codec.
///
/// Decoding flattens all tracks into one ordered sequence of channel
/// events; encoding produces a single-track format 0 file.
pub mod smf;
