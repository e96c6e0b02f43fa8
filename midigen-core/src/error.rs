use std::io;

use thiserror::Error;

/// Top-level error for codec and generation operations.
///
/// I/O failures are kept apart from format failures so that callers can
/// distinguish "could not read the stream" from "the stream is not a valid
/// Standard MIDI File".
#[derive(Debug, Error)]
pub enum Error {
	/// The underlying byte stream could not be read or written.
	#[error("i/o failure: {0}")]
	Io(#[from] io::Error),

	/// The input bytes are not a well-formed Standard MIDI File.
	#[error("malformed midi input: {0}")]
	Format(#[from] FormatError),

	/// An event sequence contains values the writer cannot serialize.
	#[error("cannot encode event: {0}")]
	Encode(#[from] EncodeError),

	/// Generation was requested against a model with no states.
	#[error(transparent)]
	EmptyGraph(#[from] EmptyGraphError),
}

/// Structural problem found while parsing SMF bytes.
///
/// Decoding is all-or-nothing per input: the first structural problem wins
/// and no partial event list is returned.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum FormatError {
	/// A chunk started with the wrong four-byte tag.
	#[error("expected `{expected}` chunk tag, found `{}`", String::from_utf8_lossy(.found))]
	BadChunkTag {
		expected: &'static str,
		found: [u8; 4],
	},

	/// The input ended before a declared structure was complete.
	#[error("truncated input while reading {context}")]
	Truncated { context: &'static str },

	/// The `MThd` chunk declares fewer than the six mandatory bytes.
	#[error("header chunk length {length} is shorter than the 6 required bytes")]
	HeaderTooShort { length: u32 },

	/// The header format word is not one of the three defined formats.
	#[error("unknown smf format {format}")]
	UnsupportedFormat { format: u16 },

	/// A delta-time did not terminate within the four-byte limit.
	#[error("variable-length quantity longer than four bytes")]
	VlqOverflow,

	/// A status byte outside the channel/meta/sysex ranges was found.
	#[error("unsupported status byte 0x{status:02x} in track data")]
	UnknownStatus { status: u8 },

	/// A data byte appeared where a status was required and no running
	/// status was in effect.
	#[error("data byte 0x{byte:02x} with no preceding channel status")]
	OrphanData { byte: u8 },
}

/// An event that the single-track writer refuses to serialize.
///
/// Decoded events always pass these checks; hand-built sequences may not.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum EncodeError {
	/// Not one of the two-data-byte channel message classes.
	#[error("status 0x{status:02x} is not an encodable channel message")]
	UnsupportedStatus { status: u8 },

	/// MIDI data bytes must leave the high bit clear.
	#[error("data byte 0x{value:02x} out of range for status 0x{status:02x}")]
	DataOutOfRange { status: u8, value: u8 },

	/// Delta-times beyond 0x0FFFFFFF cannot be written as a VLQ.
	#[error("delta-time {delta_time} exceeds the variable-length quantity maximum")]
	DeltaOutOfRange { delta_time: u32 },
}

/// The transition graph holds no states, so no walk can start.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
#[error("transition graph has no states")]
pub struct EmptyGraphError;

/// The current state has no recorded successor.
///
/// Random walks treat this as an expected stopping condition, not a
/// failure; it is only surfaced by the low-level graph API.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
#[error("state has no outgoing transitions")]
pub struct DeadEndError;
