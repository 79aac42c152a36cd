use crate::protocol::constants::*;
use crate::protocol::RtmpPacket;
use crate::{ByteBuffer, Error, Result};

/// User control event subtypes (message type 4)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserControlEvent {
    StreamBegin,
    StreamEof,
    StreamDry,
    SetBufferLength,
    StreamIsRecorded,
    PingRequest,
    PingResponse,
    Other(u16),
}

impl UserControlEvent {
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => UserControlEvent::StreamBegin,
            1 => UserControlEvent::StreamEof,
            2 => UserControlEvent::StreamDry,
            3 => UserControlEvent::SetBufferLength,
            4 => UserControlEvent::StreamIsRecorded,
            6 => UserControlEvent::PingRequest,
            7 => UserControlEvent::PingResponse,
            other => UserControlEvent::Other(other),
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            UserControlEvent::StreamBegin => 0,
            UserControlEvent::StreamEof => 1,
            UserControlEvent::StreamDry => 2,
            UserControlEvent::SetBufferLength => 3,
            UserControlEvent::StreamIsRecorded => 4,
            UserControlEvent::PingRequest => 6,
            UserControlEvent::PingResponse => 7,
            UserControlEvent::Other(code) => *code,
        }
    }
}

/// Protocol control messages (types 1-6)
#[derive(Debug, Clone, PartialEq)]
pub enum ControlMessage {
    SetChunkSize(u32),
    Abort(u32),
    Acknowledgement(u32),
    UserControl { event: UserControlEvent, data: Vec<u8> },
    WindowAckSize(u32),
    SetPeerBandwidth { size: u32, limit: u8 },
}

impl ControlMessage {
    /// Parse a control message; callers only pass packets with `is_control()`
    pub fn parse(packet: &RtmpPacket) -> Result<Self> {
        let mut buffer = ByteBuffer::new(packet.payload.clone());
        let short = |what: &str| Error::protocol_corruption(format!("Truncated {} message", what));

        let message = match packet.message_type() {
            MSG_TYPE_SET_CHUNK_SIZE => {
                let size = buffer.read_u32_be().map_err(|_| short("set chunk size"))?;
                ControlMessage::SetChunkSize(size & 0x7FFF_FFFF)
            }
            MSG_TYPE_ABORT => {
                ControlMessage::Abort(buffer.read_u32_be().map_err(|_| short("abort"))?)
            }
            MSG_TYPE_ACK => {
                ControlMessage::Acknowledgement(buffer.read_u32_be().map_err(|_| short("acknowledgement"))?)
            }
            MSG_TYPE_USER_CONTROL => {
                let code = buffer.read_u16_be().map_err(|_| short("user control"))?;
                let rest = buffer.remaining();
                ControlMessage::UserControl {
                    event: UserControlEvent::from_code(code),
                    data: buffer.read_bytes(rest)?,
                }
            }
            MSG_TYPE_WINDOW_ACK => {
                ControlMessage::WindowAckSize(buffer.read_u32_be().map_err(|_| short("window size"))?)
            }
            MSG_TYPE_SET_PEER_BW => {
                let size = buffer.read_u32_be().map_err(|_| short("peer bandwidth"))?;
                let limit = buffer.read_u8().unwrap_or(PEER_BANDWIDTH_DYNAMIC);
                ControlMessage::SetPeerBandwidth { size, limit }
            }
            other => {
                return Err(Error::protocol_corruption(format!("Message type {} is not a control message", other)));
            }
        };
        Ok(message)
    }

    pub fn message_type(&self) -> u8 {
        match self {
            ControlMessage::SetChunkSize(_) => MSG_TYPE_SET_CHUNK_SIZE,
            ControlMessage::Abort(_) => MSG_TYPE_ABORT,
            ControlMessage::Acknowledgement(_) => MSG_TYPE_ACK,
            ControlMessage::UserControl { .. } => MSG_TYPE_USER_CONTROL,
            ControlMessage::WindowAckSize(_) => MSG_TYPE_WINDOW_ACK,
            ControlMessage::SetPeerBandwidth { .. } => MSG_TYPE_SET_PEER_BW,
        }
    }

    /// Frame as a packet on the protocol chunk stream
    pub fn to_packet(&self) -> RtmpPacket {
        let mut buffer = ByteBuffer::with_capacity(6);
        match self {
            ControlMessage::SetChunkSize(value)
            | ControlMessage::Abort(value)
            | ControlMessage::Acknowledgement(value)
            | ControlMessage::WindowAckSize(value) => buffer.write_u32_be(*value),
            ControlMessage::UserControl { event, data } => {
                buffer.write_u16_be(event.code());
                buffer.write_bytes(data);
            }
            ControlMessage::SetPeerBandwidth { size, limit } => {
                buffer.write_u32_be(*size);
                buffer.write_u8(*limit);
            }
        }
        RtmpPacket::control(self.message_type(), buffer.into_vec())
    }

    /// User control event carrying a message stream id
    pub fn stream_event(event: UserControlEvent, stream_id: u32) -> Self {
        ControlMessage::UserControl {
            event,
            data: stream_id.to_be_bytes().to_vec(),
        }
    }
}
