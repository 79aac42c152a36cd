use crate::protocol::constants::*;

/// A complete RTMP message, either reassembled from inbound chunks or
/// waiting to be framed by the chunk writer.
#[derive(Debug, Clone, PartialEq)]
pub struct RtmpPacket {
    pub header: RtmpHeader,
    pub payload: Vec<u8>,
}

impl RtmpPacket {
    pub fn new(header: RtmpHeader, payload: Vec<u8>) -> Self {
        RtmpPacket { header, payload }
    }

    /// Protocol control message on chunk stream 2, message stream 0
    pub fn control(message_type: u8, payload: Vec<u8>) -> Self {
        let header = RtmpHeader::new(0, payload.len() as u32, message_type, 0, CHUNK_STREAM_PROTOCOL);
        RtmpPacket::new(header, payload)
    }

    /// Command (or command reply) on the command chunk stream
    pub fn command(message_type: u8, message_stream_id: u32, payload: Vec<u8>) -> Self {
        let header = RtmpHeader::new(
            0,
            payload.len() as u32,
            message_type,
            message_stream_id,
            CHUNK_STREAM_COMMAND,
        );
        RtmpPacket::new(header, payload)
    }

    /// Audio, video or data message on the media chunk stream
    pub fn media(message_type: u8, timestamp: u32, payload: Vec<u8>) -> Self {
        let header = RtmpHeader::new(
            timestamp,
            payload.len() as u32,
            message_type,
            MEDIA_STREAM_ID,
            CHUNK_STREAM_MEDIA,
        );
        RtmpPacket::new(header, payload)
    }

    pub fn message_type(&self) -> u8 {
        self.header.message_type
    }

    pub fn message_stream_id(&self) -> u32 {
        self.header.message_stream_id
    }

    pub fn timestamp(&self) -> u32 {
        self.header.timestamp
    }

    pub fn is_audio(&self) -> bool {
        self.header.message_type == MSG_TYPE_AUDIO
    }

    pub fn is_video(&self) -> bool {
        self.header.message_type == MSG_TYPE_VIDEO
    }

    pub fn is_command(&self) -> bool {
        self.header.message_type == MSG_TYPE_COMMAND_AMF0
            || self.header.message_type == MSG_TYPE_COMMAND_AMF3
    }

    pub fn is_control(&self) -> bool {
        matches!(
            self.header.message_type,
            MSG_TYPE_SET_CHUNK_SIZE
                | MSG_TYPE_ABORT
                | MSG_TYPE_ACK
                | MSG_TYPE_USER_CONTROL
                | MSG_TYPE_WINDOW_ACK
                | MSG_TYPE_SET_PEER_BW
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtmpHeader {
    pub timestamp: u32,
    pub message_length: u32,
    pub message_type: u8,
    pub message_stream_id: u32,
    pub chunk_stream_id: u32,
}

impl RtmpHeader {
    pub fn new(
        timestamp: u32,
        message_length: u32,
        message_type: u8,
        message_stream_id: u32,
        chunk_stream_id: u32,
    ) -> Self {
        RtmpHeader {
            timestamp,
            message_length,
            message_type,
            message_stream_id,
            chunk_stream_id,
        }
    }
}

/// Encode a chunk basic header (1, 2 or 3 bytes depending on the channel id)
pub fn encode_basic_header(fmt: u8, chunk_stream_id: u32) -> Vec<u8> {
    let mut result = Vec::with_capacity(3);

    if chunk_stream_id <= 63 {
        result.push((fmt << 6) | (chunk_stream_id as u8));
    } else if chunk_stream_id <= 319 {
        result.push(fmt << 6);
        result.push((chunk_stream_id - 64) as u8);
    } else {
        result.push((fmt << 6) | 1);
        let id = chunk_stream_id - 64;
        result.push((id & 0xFF) as u8);
        result.push((id >> 8) as u8);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_packet_defaults() {
        let packet = RtmpPacket::media(MSG_TYPE_AUDIO, 1000, vec![0x01, 0x02, 0x03]);

        assert!(packet.is_audio());
        assert!(!packet.is_video());
        assert_eq!(packet.timestamp(), 1000);
        assert_eq!(packet.message_stream_id(), MEDIA_STREAM_ID);
        assert_eq!(packet.header.chunk_stream_id, CHUNK_STREAM_MEDIA);
        assert_eq!(packet.header.message_length, 3);
    }

    #[test]
    fn test_control_packet() {
        let packet = RtmpPacket::control(MSG_TYPE_WINDOW_ACK, vec![0, 0, 0, 1]);
        assert!(packet.is_control());
        assert_eq!(packet.header.chunk_stream_id, CHUNK_STREAM_PROTOCOL);
        assert_eq!(packet.message_stream_id(), 0);
    }

    #[test]
    fn test_basic_header_sizes() {
        assert_eq!(encode_basic_header(3, 4), vec![0xC4]);
        assert_eq!(encode_basic_header(0, 64), vec![0x00, 0x00]);
        assert_eq!(encode_basic_header(1, 319), vec![0x40, 0xFF]);
        assert_eq!(encode_basic_header(0, 320), vec![0x01, 0x00, 0x01]);
    }
}
