use crate::chunk::stream::{ChannelState, OutboundChannel};
use crate::protocol::{encode_basic_header, RtmpPacket, DEFAULT_CHUNK_SIZE, EXTENDED_TIMESTAMP};
use crate::ByteBuffer;
use std::collections::HashMap;

/// Frames messages into chunks, compressing headers against the last
/// header sent on the same channel.
pub struct ChunkWriter {
    /// Last header sent per chunk stream
    channels: HashMap<u32, OutboundChannel>,

    /// Current chunk size for writing
    chunk_size: usize,
}

impl ChunkWriter {
    /// Create new chunk writer
    pub fn new() -> Self {
        ChunkWriter {
            channels: HashMap::new(),
            chunk_size: DEFAULT_CHUNK_SIZE as usize,
        }
    }

    /// Set outgoing chunk size
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size = size.max(1);
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Last header state sent on a channel
    pub fn channel_state(&self, chunk_stream_id: u32) -> Option<ChannelState> {
        self.channels.get(&chunk_stream_id).map(|c| c.state)
    }

    /// Frame a packet as one contiguous byte sequence: the header chunk
    /// followed by every continuation chunk.
    pub fn encode(&mut self, packet: &RtmpPacket) -> Vec<u8> {
        let cs_id = packet.header.chunk_stream_id;
        let state = ChannelState {
            message_stream_id: packet.header.message_stream_id,
            payload_length: packet.payload.len() as u32,
            message_type: packet.header.message_type,
            timestamp: packet.header.timestamp,
        };
        let previous = self.channels.get(&cs_id).copied();
        let (fmt, field) = select_format(previous.map(|p| p.state), &state);

        let extended = if fmt == 3 {
            previous.and_then(|p| p.extended_field)
        } else if field >= EXTENDED_TIMESTAMP {
            Some(field)
        } else {
            None
        };

        let payload = &packet.payload;
        let fragments = payload.len().div_ceil(self.chunk_size).max(1);
        let mut buffer = ByteBuffer::with_capacity(payload.len() + 16 + fragments * 5);

        buffer.write_bytes(&encode_basic_header(fmt, cs_id));
        if fmt <= 2 {
            buffer.write_u24_be(field.min(EXTENDED_TIMESTAMP));
        }
        if fmt <= 1 {
            buffer.write_u24_be(state.payload_length);
            buffer.write_u8(state.message_type);
        }
        if fmt == 0 {
            buffer.write_u32_le(state.message_stream_id);
        }
        if let Some(value) = extended {
            buffer.write_u32_be(value);
        }

        let continuation = encode_basic_header(3, cs_id);
        for (index, fragment) in payload.chunks(self.chunk_size).enumerate() {
            if index > 0 {
                buffer.write_bytes(&continuation);
                if let Some(value) = extended {
                    buffer.write_u32_be(value);
                }
            }
            buffer.write_bytes(fragment);
        }

        self.channels.insert(cs_id, OutboundChannel { state, extended_field: extended });

        buffer.into_vec()
    }
}

impl Default for ChunkWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick the header format and the value of its timestamp field
fn select_format(previous: Option<ChannelState>, next: &ChannelState) -> (u8, u32) {
    let Some(prev) = previous else {
        return (0, next.timestamp);
    };
    if prev.message_stream_id != next.message_stream_id || next.timestamp < prev.timestamp {
        return (0, next.timestamp);
    }

    let delta = next.timestamp - prev.timestamp;
    if prev.payload_length != next.payload_length || prev.message_type != next.message_type {
        return (1, delta);
    }
    if delta == 0 {
        return (3, 0);
    }
    (2, delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkReader;
    use crate::protocol::{MSG_TYPE_AUDIO, MSG_TYPE_VIDEO};

    fn video(ts: u32, len: usize) -> RtmpPacket {
        RtmpPacket::media(MSG_TYPE_VIDEO, ts, vec![0x27; len])
    }

    fn decode_all(bytes: &[u8], chunk_size: usize) -> Vec<RtmpPacket> {
        let mut reader = ChunkReader::new();
        reader.set_chunk_size(chunk_size);
        let mut input = bytes.to_vec();
        let mut packets = Vec::new();
        while let Some(packet) = reader.read_message(&mut input).unwrap() {
            packets.push(packet);
        }
        assert!(input.is_empty());
        packets
    }

    #[test]
    fn test_header_forms() {
        let mut writer = ChunkWriter::new();

        let first = writer.encode(&video(1000, 10));
        assert_eq!(first[0] >> 6, 0);
        assert_eq!(first.len(), 12 + 10);

        let second = writer.encode(&video(1040, 12));
        assert_eq!(second[0] >> 6, 1);
        assert_eq!(second.len(), 8 + 12);

        let third = writer.encode(&video(1080, 12));
        assert_eq!(third[0] >> 6, 2);
        assert_eq!(third.len(), 4 + 12);

        let fourth = writer.encode(&video(1080, 12));
        assert_eq!(fourth[0], 0xC4);
        assert_eq!(fourth.len(), 1 + 12);

        let other_type = writer.encode(&RtmpPacket::media(MSG_TYPE_AUDIO, 1080, vec![0xAF; 12]));
        assert_eq!(other_type[0] >> 6, 1);
    }

    #[test]
    fn test_compressed_headers_decode_to_same_tuple() {
        let mut writer = ChunkWriter::new();
        let packets = vec![
            video(0, 300),
            video(33, 300),
            video(66, 300),
            video(66, 300),
            video(100, 5),
            RtmpPacket::command(20, 0, vec![2, 0, 1, b'x']),
            video(40, 5),
            video(0x0200_0000, 200),
            video(0x0200_0000, 200),
        ];

        let mut bytes = Vec::new();
        for packet in &packets {
            bytes.extend(writer.encode(packet));
        }

        assert_eq!(decode_all(&bytes, DEFAULT_CHUNK_SIZE as usize), packets);
    }

    #[test]
    fn test_timestamp_decrease_forces_full_header() {
        let mut writer = ChunkWriter::new();
        writer.encode(&video(5000, 10));
        let bytes = writer.encode(&video(4000, 10));
        assert_eq!(bytes[0] >> 6, 0);
        assert_eq!(&bytes[1..4], &[0x00, 0x0F, 0xA0]);
    }

    #[test]
    fn test_timestamp_decrease_with_extended_timestamps() {
        let mut writer = ChunkWriter::new();
        writer.set_chunk_size(64);
        let mut bytes = writer.encode(&video(0x0300_0000, 100));
        let lower = writer.encode(&video(0x0280_0000, 100));

        assert_eq!(lower[0] >> 6, 0);
        assert_eq!(&lower[1..4], &[0xFF, 0xFF, 0xFF]);
        assert_eq!(&lower[12..16], &0x0280_0000u32.to_be_bytes());

        bytes.extend(lower);
        let decoded = decode_all(&bytes, 64);
        assert_eq!(decoded[0].header.timestamp, 0x0300_0000);
        assert_eq!(decoded[1].header.timestamp, 0x0280_0000);
    }

    #[test]
    fn test_extended_timestamp_repeats_on_continuations() {
        let mut writer = ChunkWriter::new();
        writer.set_chunk_size(128);
        let bytes = writer.encode(&video(0x00FF_FFFF, 300));

        assert_eq!(&bytes[1..4], &[0xFF, 0xFF, 0xFF]);
        assert_eq!(&bytes[12..16], &[0x00, 0xFF, 0xFF, 0xFF]);

        // 16 header bytes + 128 payload, then 0xC4 + extended value
        let second = 16 + 128;
        assert_eq!(bytes[second], 0xC4);
        assert_eq!(&bytes[second + 1..second + 5], &[0x00, 0xFF, 0xFF, 0xFF]);
        let third = second + 5 + 128;
        assert_eq!(bytes[third], 0xC4);
        assert_eq!(&bytes[third + 1..third + 5], &[0x00, 0xFF, 0xFF, 0xFF]);
        assert_eq!(bytes.len(), third + 5 + 44);
    }

    #[test]
    fn test_fragment_count() {
        let mut writer = ChunkWriter::new();
        writer.set_chunk_size(100);
        let bytes = writer.encode(&video(0, 250));

        // 12 header + 100, then two continuations of 1 + 100 and 1 + 50
        assert_eq!(bytes.len(), 12 + 100 + 1 + 100 + 1 + 50);
        assert_eq!(bytes[112], 0xC4);
        assert_eq!(bytes[213], 0xC4);
    }

    #[test]
    fn test_zero_length_payload_is_single_header() {
        let mut writer = ChunkWriter::new();
        let bytes = writer.encode(&RtmpPacket::command(20, 0, Vec::new()));
        assert_eq!(bytes.len(), 12);
        assert_eq!(decode_all(&bytes, 128)[0].payload.len(), 0);
    }
}
