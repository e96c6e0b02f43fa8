use std::io::Read;

use log::debug;

use crate::error::{Error, FormatError};

use super::{
	channel_data_len, Event, META_END_OF_TRACK, META_STATUS, SYSEX_ESCAPE, SYSEX_START,
};

/// Reads a whole SMF stream and returns its channel events in file order.
///
/// All tracks are flattened into one sequence, in track order; track
/// boundaries are not preserved. Delta-times are returned exactly as
/// stored, meta and sysex events are skipped, and channel messages with a
/// single data byte (program change, channel pressure) are dropped.
///
/// # Errors
/// [`Error::Io`] if the stream cannot be read to completion,
/// [`Error::Format`] on the first structural problem in the bytes. There is
/// no partial decode: a malformed input yields no events at all.
pub fn decode<R: Read>(mut input: R) -> Result<Vec<Event>, Error> {
	let mut raw = Vec::new();
	input.read_to_end(&mut raw)?;
	Ok(decode_bytes(&raw)?)
}

fn decode_bytes(data: &[u8]) -> Result<Vec<Event>, FormatError> {
	let mut bytes = Bytes::new(data);
	let track_count = read_header(&mut bytes)?;

	let mut events = Vec::new();
	for _ in 0..track_count {
		let payload = read_track_chunk(&mut bytes)?;
		decode_track(payload, &mut events)?;
	}
	if bytes.remaining() > 0 {
		debug!("ignoring {} bytes after the last declared track", bytes.remaining());
	}
	Ok(events)
}

/// Parses the `MThd` chunk and returns the declared track count.
///
/// The division word is read (and logged) but otherwise unused: delta-times
/// pass through the model verbatim, so the tick resolution never matters to
/// decoding. Headers longer than six bytes are tolerated, the excess is
/// skipped.
fn read_header(bytes: &mut Bytes) -> Result<u16, FormatError> {
	bytes.expect_tag(b"MThd", "MThd")?;
	let length = bytes.read_u32("header length")?;
	if length < 6 {
		return Err(FormatError::HeaderTooShort { length });
	}
	let format = bytes.read_u16("header format")?;
	if format > 2 {
		return Err(FormatError::UnsupportedFormat { format });
	}
	let track_count = bytes.read_u16("header track count")?;
	let division = bytes.read_u16("header division")?;
	if length > 6 {
		bytes.take((length - 6) as usize, "header padding")?;
		debug!("skipped {} extra header bytes", length - 6);
	}
	debug!("smf format {format}, {track_count} tracks, division {division:#06x}");
	Ok(track_count)
}

fn read_track_chunk<'a>(bytes: &mut Bytes<'a>) -> Result<&'a [u8], FormatError> {
	bytes.expect_tag(b"MTrk", "MTrk")?;
	let length = bytes.read_u32("track length")?;
	bytes.take(length as usize, "track payload")
}

/// Walks one track payload, appending every channel message that carries
/// two data bytes.
///
/// Running status is honored: a data byte in status position reuses the
/// previous channel status. Meta and sysex events cancel it, as the format
/// requires.
fn decode_track(payload: &[u8], events: &mut Vec<Event>) -> Result<(), FormatError> {
	let mut bytes = Bytes::new(payload);
	let mut running: Option<u8> = None;

	while bytes.remaining() > 0 {
		let delta_time = bytes.read_vlq()?;
		let first = bytes.read_u8("event status")?;
		match first {
			0x00..=0x7F => {
				// Running status: `first` is already the first data byte.
				let class = running.ok_or(FormatError::OrphanData { byte: first })?;
				push_channel_event(&mut bytes, events, delta_time, class, first)?;
			}
			0x80..=0xEF => {
				// The channel nibble is stripped here, once and for all:
				// states are channel-blind and output plays on channel 0.
				let class = first & 0xF0;
				running = Some(class);
				let data1 = bytes.read_u8("event data")?;
				push_channel_event(&mut bytes, events, delta_time, class, data1)?;
			}
			SYSEX_START | SYSEX_ESCAPE => {
				let length = bytes.read_vlq()?;
				bytes.take(length as usize, "sysex payload")?;
				running = None;
			}
			META_STATUS => {
				let meta_type = bytes.read_u8("meta type")?;
				let length = bytes.read_vlq()?;
				bytes.take(length as usize, "meta payload")?;
				running = None;
				if meta_type == META_END_OF_TRACK && bytes.remaining() > 0 {
					debug!("track data continues after an end-of-track marker");
				}
			}
			_ => return Err(FormatError::UnknownStatus { status: first }),
		}
	}
	Ok(())
}

/// Consumes the remaining data bytes of a channel message and records it if
/// it carries two of them. One-data-byte messages are read (keeping the
/// stream in sync) and dropped.
fn push_channel_event(
	bytes: &mut Bytes,
	events: &mut Vec<Event>,
	delta_time: u32,
	class: u8,
	data1: u8,
) -> Result<(), FormatError> {
	if channel_data_len(class) == Some(2) {
		let data2 = bytes.read_u8("event data")?;
		events.push(Event::new(delta_time, class, data1, data2));
	}
	Ok(())
}

/// Cursor over the raw input with big-endian primitive reads.
///
/// Every read names what it was after, so truncation errors can say which
/// structure the input ran out in.
struct Bytes<'a> {
	data: &'a [u8],
	pos: usize,
}

impl<'a> Bytes<'a> {
	fn new(data: &'a [u8]) -> Self {
		Self { data, pos: 0 }
	}

	fn remaining(&self) -> usize {
		self.data.len() - self.pos
	}

	fn take(&mut self, n: usize, context: &'static str) -> Result<&'a [u8], FormatError> {
		if self.remaining() < n {
			return Err(FormatError::Truncated { context });
		}
		let slice = &self.data[self.pos..self.pos + n];
		self.pos += n;
		Ok(slice)
	}

	fn read_u8(&mut self, context: &'static str) -> Result<u8, FormatError> {
		Ok(self.take(1, context)?[0])
	}

	fn read_u16(&mut self, context: &'static str) -> Result<u16, FormatError> {
		let slice = self.take(2, context)?;
		Ok(u16::from_be_bytes([slice[0], slice[1]]))
	}

	fn read_u32(&mut self, context: &'static str) -> Result<u32, FormatError> {
		let slice = self.take(4, context)?;
		Ok(u32::from_be_bytes([slice[0], slice[1], slice[2], slice[3]]))
	}

	fn expect_tag(&mut self, tag: &[u8; 4], expected: &'static str) -> Result<(), FormatError> {
		let found = self.take(4, "chunk tag")?;
		if found != tag {
			return Err(FormatError::BadChunkTag {
				expected,
				found: [found[0], found[1], found[2], found[3]],
			});
		}
		Ok(())
	}

	/// Reads a variable-length quantity: 7 bits per byte, high bit set on
	/// every byte but the last, at most four bytes.
	fn read_vlq(&mut self) -> Result<u32, FormatError> {
		let mut result: u32 = 0;
		let mut size = 0;
		loop {
			if size == 4 {
				return Err(FormatError::VlqOverflow);
			}
			let byte = self.read_u8("variable-length quantity")?;
			size += 1;
			result = (result << 7) | u32::from(byte & 0x7F);
			if byte & 0x80 == 0 {
				return Ok(result);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	/// Builds a file from raw track payloads: header plus one `MTrk` chunk
	/// per payload.
	fn smf(tracks: &[&[u8]]) -> Vec<u8> {
		let format: u16 = if tracks.len() > 1 { 1 } else { 0 };
		let mut data = Vec::new();
		data.extend_from_slice(b"MThd");
		data.extend_from_slice(&6u32.to_be_bytes());
		data.extend_from_slice(&format.to_be_bytes());
		data.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
		data.extend_from_slice(&480u16.to_be_bytes());
		for track in tracks {
			data.extend_from_slice(b"MTrk");
			data.extend_from_slice(&(track.len() as u32).to_be_bytes());
			data.extend_from_slice(track);
		}
		data
	}

	fn read_vlq_bytes(input: &[u8]) -> Result<u32, FormatError> {
		Bytes::new(input).read_vlq()
	}

	#[test]
	fn vlq_reference_values() {
		assert_eq!(read_vlq_bytes(&[0x00]), Ok(0));
		assert_eq!(read_vlq_bytes(&[0x7f]), Ok(0x7f));
		assert_eq!(read_vlq_bytes(&[0x81, 0x00]), Ok(0x80));
		assert_eq!(read_vlq_bytes(&[0xff, 0x7f]), Ok(0x3fff));
		assert_eq!(read_vlq_bytes(&[0x87, 0x68]), Ok(0x3e8));
		assert_eq!(read_vlq_bytes(&[0xbd, 0x84, 0x40]), Ok(0xf4240));
		assert_eq!(read_vlq_bytes(&[0xff, 0xff, 0xff, 0x7f]), Ok(0x0fff_ffff));
	}

	#[test]
	fn vlq_longer_than_four_bytes_is_rejected() {
		assert_eq!(
			read_vlq_bytes(&[0xff, 0xff, 0xff, 0xff, 0x7f]),
			Err(FormatError::VlqOverflow)
		);
	}

	#[test]
	fn decodes_channel_events_and_strips_the_channel_nibble() {
		let track = [
			0x00, 0x93, 0x3c, 0x40, // note on, channel 3
			0x60, 0x83, 0x3c, 0x00, // note off, channel 3
		];
		let events = decode(&smf(&[&track])[..]).unwrap();
		assert_eq!(
			events,
			vec![
				Event::new(0, 0x90, 0x3c, 0x40),
				Event::new(0x60, 0x80, 0x3c, 0x00),
			]
		);
	}

	#[test]
	fn concatenates_tracks_in_order() {
		let first = [0x00u8, 0x90, 0x30, 0x50];
		let second = [0x10u8, 0x90, 0x32, 0x50];
		let events = decode(&smf(&[&first, &second])[..]).unwrap();
		assert_eq!(events.len(), 2);
		assert_eq!(events[0].data1, 0x30);
		assert_eq!(events[1].data1, 0x32);
	}

	#[test]
	fn honors_running_status() {
		let track = [
			0x00, 0x90, 0x3c, 0x40, // explicit note on
			0x20, 0x3e, 0x40, // running status reuses 0x90
			0x20, 0x40, 0x40,
		];
		let events = decode(&smf(&[&track])[..]).unwrap();
		assert_eq!(events.len(), 3);
		assert!(events.iter().all(|e| e.status == 0x90));
		assert_eq!(events[1], Event::new(0x20, 0x90, 0x3e, 0x40));
	}

	#[test]
	fn skips_meta_and_sysex_events() {
		let track = [
			0x00, 0xff, 0x51, 0x03, 0x07, 0xa1, 0x20, // tempo
			0x00, 0xf0, 0x02, 0x01, 0xf7, // sysex
			0x00, 0x90, 0x3c, 0x40, // the only modeled event
			0x00, 0xff, 0x2f, 0x00, // end of track
		];
		let events = decode(&smf(&[&track])[..]).unwrap();
		assert_eq!(events, vec![Event::new(0, 0x90, 0x3c, 0x40)]);
	}

	#[test]
	fn drops_one_data_byte_messages_but_stays_in_sync() {
		let track = [
			0x00, 0xc0, 0x05, // program change: dropped
			0x08, 0x90, 0x3c, 0x40, // still parsed correctly afterwards
		];
		let events = decode(&smf(&[&track])[..]).unwrap();
		assert_eq!(events, vec![Event::new(8, 0x90, 0x3c, 0x40)]);
	}

	#[test]
	fn meta_event_cancels_running_status() {
		let track = [
			0x00, 0x90, 0x3c, 0x40, //
			0x00, 0xff, 0x01, 0x02, b'h', b'i', // text meta
			0x00, 0x3e, 0x40, // would need running status: now orphaned
		];
		let err = decode(&smf(&[&track])[..]).unwrap_err();
		match err {
			Error::Format(FormatError::OrphanData { byte: 0x3e }) => {}
			other => panic!("unexpected error: {other:?}"),
		}
	}

	#[test]
	fn rejects_a_bad_header_tag() {
		let mut data = smf(&[]);
		data[0] = b'X';
		match decode(&data[..]).unwrap_err() {
			Error::Format(FormatError::BadChunkTag { expected: "MThd", .. }) => {}
			other => panic!("unexpected error: {other:?}"),
		}
	}

	#[test]
	fn rejects_an_unknown_format() {
		let mut data = smf(&[]);
		data[9] = 3; // format word
		match decode(&data[..]).unwrap_err() {
			Error::Format(FormatError::UnsupportedFormat { format: 3 }) => {}
			other => panic!("unexpected error: {other:?}"),
		}
	}

	#[test]
	fn rejects_a_truncated_track_payload() {
		let mut data = smf(&[&[0x00, 0x90, 0x3c, 0x40]]);
		data.truncate(data.len() - 2);
		match decode(&data[..]).unwrap_err() {
			Error::Format(FormatError::Truncated { .. }) => {}
			other => panic!("unexpected error: {other:?}"),
		}
	}

	#[test]
	fn rejects_an_event_crossing_the_payload_end() {
		// Declared length cuts the note-on in half.
		let mut data = smf(&[&[0x00, 0x90, 0x3c, 0x40]]);
		let len_at = data.len() - 8;
		data[len_at..len_at + 4].copy_from_slice(&2u32.to_be_bytes());
		data.truncate(data.len() - 2);
		match decode(&data[..]).unwrap_err() {
			Error::Format(FormatError::Truncated { .. }) => {}
			other => panic!("unexpected error: {other:?}"),
		}
	}

	#[test]
	fn accepts_an_oversized_header() {
		let mut data = Vec::new();
		data.extend_from_slice(b"MThd");
		data.extend_from_slice(&8u32.to_be_bytes());
		data.extend_from_slice(&0u16.to_be_bytes());
		data.extend_from_slice(&1u16.to_be_bytes());
		data.extend_from_slice(&480u16.to_be_bytes());
		data.extend_from_slice(&[0, 0]); // padding
		data.extend_from_slice(b"MTrk");
		data.extend_from_slice(&4u32.to_be_bytes());
		data.extend_from_slice(&[0x00, 0x90, 0x3c, 0x40]);
		let events = decode(&data[..]).unwrap();
		assert_eq!(events.len(), 1);
	}
}
