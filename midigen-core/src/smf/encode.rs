use std::io::Write;

use crate::error::{EncodeError, Error};

use super::{
	channel_data_len, Event, META_END_OF_TRACK, META_STATUS, TICKS_PER_QUARTER, VLQ_MAX,
};

/// Serializes events into a complete single-track SMF image.
///
/// The output is a format 0 file at [`TICKS_PER_QUARTER`] ticks per quarter
/// note, every message on channel 0, closed with an end-of-track marker.
/// Events that decoding can produce always serialize; anything else is
/// rejected before a single byte is built.
///
/// # Errors
/// [`EncodeError`] if any event carries a status outside the five modeled
/// classes, a data byte above `0x7F`, or a delta-time that does not fit a
/// variable-length quantity.
pub fn encode_to_vec(events: &[Event]) -> Result<Vec<u8>, EncodeError> {
	for event in events {
		validate(event)?;
	}

	let mut track = Vec::with_capacity(events.len() * 4 + 4);
	for event in events {
		push_vlq(&mut track, event.delta_time);
		track.push(event.status); // base status is channel 0
		track.push(event.data1);
		track.push(event.data2);
	}
	track.extend_from_slice(&[0x00, META_STATUS, META_END_OF_TRACK, 0x00]);

	let mut data = Vec::with_capacity(track.len() + 22);
	data.extend_from_slice(b"MThd");
	data.extend_from_slice(&6u32.to_be_bytes());
	data.extend_from_slice(&0u16.to_be_bytes()); // format 0
	data.extend_from_slice(&1u16.to_be_bytes());
	data.extend_from_slice(&TICKS_PER_QUARTER.to_be_bytes());
	data.extend_from_slice(b"MTrk");
	data.extend_from_slice(&(track.len() as u32).to_be_bytes());
	data.extend_from_slice(&track);
	Ok(data)
}

/// Serializes events and writes the file image to `writer`.
///
/// Validation happens up front: an invalid event fails the call before
/// anything is written.
///
/// # Errors
/// [`Error::Encode`] for an unserializable event, [`Error::Io`] if the
/// writer fails.
pub fn encode<W: Write>(mut writer: W, events: &[Event]) -> Result<(), Error> {
	let data = encode_to_vec(events)?;
	writer.write_all(&data)?;
	Ok(())
}

fn validate(event: &Event) -> Result<(), EncodeError> {
	// Exact match against the base statuses also rejects any status that
	// still carries a channel nibble.
	if channel_data_len(event.status) != Some(2) {
		return Err(EncodeError::UnsupportedStatus { status: event.status });
	}
	for value in [event.data1, event.data2] {
		if value > 0x7F {
			return Err(EncodeError::DataOutOfRange { status: event.status, value });
		}
	}
	if event.delta_time > VLQ_MAX {
		return Err(EncodeError::DeltaOutOfRange { delta_time: event.delta_time });
	}
	Ok(())
}

/// Appends `value` as a variable-length quantity, most significant group
/// first, continuation bit set on all but the last byte. The caller has
/// already checked `value <= VLQ_MAX`.
fn push_vlq(out: &mut Vec<u8>, value: u32) {
	let mut started = false;
	for shift in [21, 14, 7] {
		let byte = ((value >> shift) & 0x7F) as u8;
		if byte != 0 || started {
			out.push(byte | 0x80);
			started = true;
		}
	}
	out.push((value & 0x7F) as u8);
}
