use crate::protocol::{RtmpHeader, RtmpPacket};

/// Last full header seen on a channel. Both directions diff against it to
/// pick (or resolve) compressed header forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelState {
    pub message_stream_id: u32,
    pub payload_length: u32,
    pub message_type: u8,
    pub timestamp: u32,
}

impl ChannelState {
    pub fn from_header(header: &RtmpHeader) -> Self {
        ChannelState {
            message_stream_id: header.message_stream_id,
            payload_length: header.message_length,
            message_type: header.message_type,
            timestamp: header.timestamp,
        }
    }

    pub fn to_header(self, chunk_stream_id: u32) -> RtmpHeader {
        RtmpHeader::new(
            self.timestamp,
            self.payload_length,
            self.message_type,
            self.message_stream_id,
            chunk_stream_id,
        )
    }
}

/// Receive side of one channel: header state plus the message being reassembled
#[derive(Debug, Clone, Default)]
pub struct InboundChannel {
    pub last: Option<ChannelState>,

    /// The last type 0/1/2 header used the extended timestamp escape, so
    /// type 3 chunks on this channel carry four extra bytes.
    pub extended: bool,

    pub payload: Vec<u8>,
    pub remaining: usize,
}

impl InboundChannel {
    pub fn is_assembling(&self) -> bool {
        self.remaining > 0
    }

    /// Begin a new message described by `state`
    pub fn start_message(&mut self, state: ChannelState) {
        self.last = Some(state);
        self.remaining = state.payload_length as usize;
        self.payload.clear();
        self.payload.reserve(self.remaining.min(1 << 20));
    }

    /// Append fragment bytes, returning the message once complete
    pub fn append(&mut self, data: &[u8], chunk_stream_id: u32) -> Option<RtmpPacket> {
        self.payload.extend_from_slice(data);
        self.remaining = self.remaining.saturating_sub(data.len());
        if self.remaining > 0 {
            return None;
        }
        let state = self.last?;
        Some(RtmpPacket::new(
            state.to_header(chunk_stream_id),
            std::mem::take(&mut self.payload),
        ))
    }
}

/// Send side of one channel
#[derive(Debug, Clone, Copy, Default)]
pub struct OutboundChannel {
    pub state: ChannelState,

    /// Timestamp field value of the last header when it was extended
    pub extended_field: Option<u32>,
}
