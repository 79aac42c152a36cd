use crate::chunk::stream::{ChannelState, InboundChannel};
use crate::protocol::{RtmpPacket, DEFAULT_CHUNK_SIZE, EXTENDED_TIMESTAMP};
use crate::{Error, Result};
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use log::warn;
use std::collections::HashMap;
use std::io::Cursor;

/// Result of parsing one complete chunk
#[derive(Debug)]
pub struct ChunkRead {
    /// Bytes of input the chunk occupied
    pub consumed: usize,

    /// Set when this chunk completed a message
    pub message: Option<RtmpPacket>,
}

/// Header of a chunk that has been parsed but not yet committed
struct PendingHeader {
    chunk_stream_id: u32,
    state: ChannelState,
    new_message: bool,
    extended: Option<bool>,
}

/// Sans-IO chunk stream parser. Callers feed it whatever bytes they have;
/// nothing is consumed or changed until a whole chunk is available.
pub struct ChunkReader {
    /// Per-channel state by chunk stream id
    channels: HashMap<u32, InboundChannel>,

    /// Current chunk size for reading
    chunk_size: usize,
}

impl ChunkReader {
    /// Create new chunk reader
    pub fn new() -> Self {
        ChunkReader {
            channels: HashMap::new(),
            chunk_size: DEFAULT_CHUNK_SIZE as usize,
        }
    }

    /// Set incoming chunk size
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size = size.max(1);
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Last header state seen on a channel
    pub fn channel_state(&self, chunk_stream_id: u32) -> Option<ChannelState> {
        self.channels.get(&chunk_stream_id).and_then(|c| c.last)
    }

    /// Parse one chunk from the front of `input`. `Ok(None)` means the
    /// chunk is incomplete and no state was touched.
    pub fn read_chunk(&mut self, input: &[u8]) -> Result<Option<ChunkRead>> {
        let mut cursor = Cursor::new(input);

        let Some(pending) = self.parse_header(&mut cursor)? else {
            return Ok(None);
        };

        let offset = cursor.position() as usize;
        let remaining = if pending.new_message {
            pending.state.payload_length as usize
        } else {
            self.channels
                .get(&pending.chunk_stream_id)
                .map_or(0, |c| c.remaining)
        };
        let length = remaining.min(self.chunk_size);
        if input.len() < offset + length {
            return Ok(None);
        }

        let channel = self.channels.entry(pending.chunk_stream_id).or_default();
        if pending.new_message {
            if channel.is_assembling() {
                warn!(
                    "Chunk stream {} started a new message with {} bytes still missing; dropping partial message",
                    pending.chunk_stream_id, channel.remaining
                );
            }
            if let Some(extended) = pending.extended {
                channel.extended = extended;
            }
            channel.start_message(pending.state);
        }

        let message = channel.append(&input[offset..offset + length], pending.chunk_stream_id);
        Ok(Some(ChunkRead {
            consumed: offset + length,
            message,
        }))
    }

    /// Consume chunks from the front of `input` until one message completes
    /// or the buffered bytes run out.
    pub fn read_message(&mut self, input: &mut Vec<u8>) -> Result<Option<RtmpPacket>> {
        loop {
            let Some(read) = self.read_chunk(input)? else {
                return Ok(None);
            };
            input.drain(..read.consumed);
            if read.message.is_some() {
                return Ok(read.message);
            }
        }
    }

    fn parse_header(&self, cursor: &mut Cursor<&[u8]>) -> Result<Option<PendingHeader>> {
        let Ok(first) = cursor.read_u8() else {
            return Ok(None);
        };
        let fmt = first >> 6;
        let chunk_stream_id = match first & 0x3F {
            0 => match cursor.read_u8() {
                Ok(id) => id as u32 + 64,
                Err(_) => return Ok(None),
            },
            1 => match cursor.read_u16::<LittleEndian>() {
                Ok(id) => id as u32 + 64,
                Err(_) => return Ok(None),
            },
            id => id as u32,
        };

        let channel = self.channels.get(&chunk_stream_id);
        let previous = channel.and_then(|c| c.last);
        let require_previous = || {
            previous.ok_or_else(|| {
                Error::protocol_corruption(format!(
                    "Chunk format {} on stream {} without a prior header",
                    fmt, chunk_stream_id
                ))
            })
        };

        let pending = match fmt {
            0 => {
                let Some((field, length, message_type)) = read_fields(cursor, true) else {
                    return Ok(None);
                };
                let Ok(message_stream_id) = cursor.read_u32::<LittleEndian>() else {
                    return Ok(None);
                };
                let Some(timestamp) = read_extended(cursor, field) else {
                    return Ok(None);
                };
                PendingHeader {
                    chunk_stream_id,
                    state: ChannelState {
                        message_stream_id,
                        payload_length: length,
                        message_type,
                        timestamp,
                    },
                    new_message: true,
                    extended: Some(field == EXTENDED_TIMESTAMP),
                }
            }
            1 => {
                let prev = require_previous()?;
                let Some((field, length, message_type)) = read_fields(cursor, true) else {
                    return Ok(None);
                };
                let Some(delta) = read_extended(cursor, field) else {
                    return Ok(None);
                };
                PendingHeader {
                    chunk_stream_id,
                    state: ChannelState {
                        message_stream_id: prev.message_stream_id,
                        payload_length: length,
                        message_type,
                        timestamp: prev.timestamp.wrapping_add(delta),
                    },
                    new_message: true,
                    extended: Some(field == EXTENDED_TIMESTAMP),
                }
            }
            2 => {
                let prev = require_previous()?;
                let Some((field, _, _)) = read_fields(cursor, false) else {
                    return Ok(None);
                };
                let Some(delta) = read_extended(cursor, field) else {
                    return Ok(None);
                };
                PendingHeader {
                    chunk_stream_id,
                    state: ChannelState {
                        timestamp: prev.timestamp.wrapping_add(delta),
                        ..prev
                    },
                    new_message: true,
                    extended: Some(field == EXTENDED_TIMESTAMP),
                }
            }
            _ => {
                let prev = require_previous()?;
                let extended = channel.is_some_and(|c| c.extended);
                if extended && cursor.read_u32::<BigEndian>().is_err() {
                    return Ok(None);
                }
                // A type 3 chunk outside a message repeats the previous header verbatim
                PendingHeader {
                    chunk_stream_id,
                    state: prev,
                    new_message: !channel.is_some_and(|c| c.is_assembling()),
                    extended: None,
                }
            }
        };

        Ok(Some(pending))
    }
}

impl Default for ChunkReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Timestamp field, and with `full` also the length and type fields
fn read_fields(cursor: &mut Cursor<&[u8]>, full: bool) -> Option<(u32, u32, u8)> {
    let field = cursor.read_u24::<BigEndian>().ok()?;
    if !full {
        return Some((field, 0, 0));
    }
    let length = cursor.read_u24::<BigEndian>().ok()?;
    let message_type = cursor.read_u8().ok()?;
    Some((field, length, message_type))
}

fn read_extended(cursor: &mut Cursor<&[u8]>, field: u32) -> Option<u32> {
    if field == EXTENDED_TIMESTAMP {
        cursor.read_u32::<BigEndian>().ok()
    } else {
        Some(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type0(cs: u8, ts: u32, len: u32, msg_type: u8, msid: u32) -> Vec<u8> {
        let mut bytes = vec![cs];
        bytes.extend_from_slice(&ts.to_be_bytes()[1..]);
        bytes.extend_from_slice(&len.to_be_bytes()[1..]);
        bytes.push(msg_type);
        bytes.extend_from_slice(&msid.to_le_bytes());
        bytes
    }

    #[test]
    fn test_single_chunk_message() {
        let mut reader = ChunkReader::new();
        let mut input = type0(3, 100, 3, 20, 0);
        input.extend_from_slice(&[1, 2, 3]);

        let packet = reader.read_message(&mut input).unwrap().unwrap();
        assert_eq!(packet.header.timestamp, 100);
        assert_eq!(packet.header.message_type, 20);
        assert_eq!(packet.header.chunk_stream_id, 3);
        assert_eq!(packet.payload, vec![1, 2, 3]);
        assert!(input.is_empty());
    }

    #[test]
    fn test_incomplete_chunk_leaves_state_untouched() {
        let mut reader = ChunkReader::new();
        let mut full = type0(4, 0, 4, 9, 1);
        full.extend_from_slice(&[9, 9, 9, 9]);

        for cut in 0..full.len() {
            assert!(reader.read_chunk(&full[..cut]).unwrap().is_none());
            assert!(reader.channel_state(4).is_none());
        }

        let read = reader.read_chunk(&full).unwrap().unwrap();
        assert_eq!(read.consumed, full.len());
        assert!(read.message.is_some());
    }

    #[test]
    fn test_compressed_without_prior_state_is_corruption() {
        let mut reader = ChunkReader::new();
        for first in [0x44u8, 0x84, 0xC4] {
            let result = reader.read_chunk(&[first, 0, 0, 0, 0, 0, 0, 0]);
            assert!(matches!(result, Err(Error::ProtocolCorruption(_))));
        }
    }

    #[test]
    fn test_interleaved_channels() {
        let mut reader = ChunkReader::new();
        let payload_a = vec![0xAA; 200];
        let payload_b = vec![0xBB; 10];

        let mut input = type0(4, 0, 200, 9, 1);
        input.extend_from_slice(&payload_a[..128]);
        input.extend(type0(3, 0, 10, 20, 0));
        input.extend_from_slice(&payload_b);
        input.push(0xC4);
        input.extend_from_slice(&payload_a[128..]);

        let first = reader.read_message(&mut input).unwrap().unwrap();
        assert_eq!(first.header.chunk_stream_id, 3);
        assert_eq!(first.payload, payload_b);

        let second = reader.read_message(&mut input).unwrap().unwrap();
        assert_eq!(second.header.chunk_stream_id, 4);
        assert_eq!(second.payload, payload_a);
    }

    #[test]
    fn test_extended_timestamp_and_continuation() {
        let mut reader = ChunkReader::new();
        reader.set_chunk_size(4);

        let mut input = type0(4, EXTENDED_TIMESTAMP, 6, 8, 1);
        input.extend_from_slice(&0x0100_0000u32.to_be_bytes());
        input.extend_from_slice(&[1, 2, 3, 4]);
        input.push(0xC4);
        input.extend_from_slice(&0x0100_0000u32.to_be_bytes());
        input.extend_from_slice(&[5, 6]);

        let packet = reader.read_message(&mut input).unwrap().unwrap();
        assert_eq!(packet.header.timestamp, 0x0100_0000);
        assert_eq!(packet.payload, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_delta_headers_accumulate() {
        let mut reader = ChunkReader::new();
        let mut input = type0(4, 1000, 1, 9, 1);
        input.push(0x17);
        // type 1: delta 40, new length 2
        input.extend_from_slice(&[0x44, 0, 0, 40, 0, 0, 2, 9, 0x27, 0x27]);
        // type 2: delta 40
        input.extend_from_slice(&[0x84, 0, 0, 40, 0x27, 0x27]);
        // type 3: same timestamp again
        input.extend_from_slice(&[0xC4, 0x27, 0x27]);

        let timestamps: Vec<u32> = (0..4)
            .map(|_| reader.read_message(&mut input).unwrap().unwrap().header.timestamp)
            .collect();
        assert_eq!(timestamps, vec![1000, 1040, 1080, 1080]);
    }

    #[test]
    fn test_two_byte_and_three_byte_channel_ids() {
        let mut reader = ChunkReader::new();
        let mut input = vec![0x00, 0x06];
        input.extend_from_slice(&type0(0, 0, 1, 9, 1)[1..]);
        input.push(1);
        let packet = reader.read_message(&mut input).unwrap().unwrap();
        assert_eq!(packet.header.chunk_stream_id, 70);

        let mut input = vec![0x01, 0x00, 0x01];
        input.extend_from_slice(&type0(0, 0, 1, 9, 1)[1..]);
        input.push(1);
        let packet = reader.read_message(&mut input).unwrap().unwrap();
        assert_eq!(packet.header.chunk_stream_id, 320);
    }

    #[test]
    fn test_zero_length_message() {
        let mut reader = ChunkReader::new();
        let mut input = type0(3, 0, 0, 20, 0);
        let packet = reader.read_message(&mut input).unwrap().unwrap();
        assert!(packet.payload.is_empty());
    }
}
