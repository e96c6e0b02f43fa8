//! Standard MIDI File codec.
//!
//! The format is chunk based: an `MThd` header chunk followed by `MTrk`
//! track chunks, each a four-byte ASCII tag, a big-endian u32 payload
//! length, and the payload. Track payloads are a stream of
//! `<variable-length delta-time><event>` pairs.
//!
//! Only channel messages carrying two data bytes survive decoding; meta
//! and system events are structural noise as far as the model is
//! concerned. Encoding goes the other way: a flat event sequence becomes
//! one format 0 track.

mod decode;
mod encode;

pub use decode::decode;
pub use encode::{encode, encode_to_vec};

/// Tick resolution written into generated files (pulses per quarter note).
///
/// Decoded delta-times are carried through verbatim, so this constant only
/// affects how players interpret the output tempo-wise.
pub const TICKS_PER_QUARTER: u16 = 960;

/// Note off, two data bytes (key, velocity).
pub const NOTE_OFF: u8 = 0x80;
/// Note on, two data bytes (key, velocity).
pub const NOTE_ON: u8 = 0x90;
/// Polyphonic key pressure, two data bytes (key, pressure).
pub const KEY_PRESSURE: u8 = 0xA0;
/// Controller change, two data bytes (controller, value).
pub const CONTROL_CHANGE: u8 = 0xB0;
/// Program change, one data byte.
pub const PROGRAM_CHANGE: u8 = 0xC0;
/// Channel pressure, one data byte.
pub const CHANNEL_PRESSURE: u8 = 0xD0;
/// Pitch bend, two data bytes (lsb, msb).
pub const PITCH_BEND: u8 = 0xE0;

pub(crate) const SYSEX_START: u8 = 0xF0;
pub(crate) const SYSEX_ESCAPE: u8 = 0xF7;
pub(crate) const META_STATUS: u8 = 0xFF;
pub(crate) const META_END_OF_TRACK: u8 = 0x2F;

/// Largest delta-time a four-byte variable-length quantity can hold.
pub(crate) const VLQ_MAX: u32 = 0x0FFF_FFFF;

/// One decoded channel message.
///
/// `status` is the message class with the channel nibble already stripped
/// (`0x90` for note on, never `0x91`): channels are not modeled, and
/// generated files play everything on channel 0.
///
/// Equality and hashing cover all four fields. The delta-time is part of a
/// state's identity on purpose: "the same note, later" is a different
/// state. The flip side is a large, sparse state space on small corpora,
/// which shows up as walks hitting dead ends early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Event {
	/// Ticks since the previous event in the track, as stored in the file.
	pub delta_time: u32,
	/// Channel message class (`0x80`, `0x90`, `0xA0`, `0xB0` or `0xE0`).
	pub status: u8,
	/// First data byte (e.g. key number).
	pub data1: u8,
	/// Second data byte (e.g. velocity).
	pub data2: u8,
}

impl Event {
	/// Creates an event from raw field values. No validation happens here;
	/// the encoder checks ranges when the event is serialized.
	pub const fn new(delta_time: u32, status: u8, data1: u8, data2: u8) -> Self {
		Self { delta_time, status, data1, data2 }
	}
}

/// Number of data bytes following a channel status class, or `None` for
/// anything that is not a channel status class.
pub(crate) fn channel_data_len(class: u8) -> Option<usize> {
	match class {
		NOTE_OFF | NOTE_ON | KEY_PRESSURE | CONTROL_CHANGE | PITCH_BEND => Some(2),
		PROGRAM_CHANGE | CHANNEL_PRESSURE => Some(1),
		_ => None,
	}
}
