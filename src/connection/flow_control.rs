use crate::protocol::{ControlMessage, UserControlEvent, DEFAULT_CHUNK_SIZE, DEFAULT_WINDOW_SIZE};
use crate::{Error, Result};
use log::{debug, info};

/// Per-connection chunk sizes, byte counters and acknowledgement windows
#[derive(Debug, Clone)]
pub struct FlowControl {
    pub send_chunk_size: u32,
    pub recv_chunk_size: u32,

    bytes_received: u64,
    bytes_sent: u64,

    recv_window_size: u32,
    recv_window_at: u64,

    send_window_size: u32,
    send_window_at: u64,
}

impl FlowControl {
    /// Create flow control state with both windows at `window_size`
    pub fn new(window_size: u32) -> Self {
        FlowControl {
            send_chunk_size: DEFAULT_CHUNK_SIZE,
            recv_chunk_size: DEFAULT_CHUNK_SIZE,
            bytes_received: 0,
            bytes_sent: 0,
            recv_window_size: window_size,
            recv_window_at: 0,
            send_window_size: window_size,
            send_window_at: 0,
        }
    }

    pub fn record_received(&mut self, count: usize) {
        self.bytes_received += count as u64;
    }

    pub fn record_sent(&mut self, count: usize) {
        self.bytes_sent += count as u64;
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn recv_window_size(&self) -> u32 {
        self.recv_window_size
    }

    pub fn send_window_size(&self) -> u32 {
        self.send_window_size
    }

    pub fn send_window_at(&self) -> u64 {
        self.send_window_at
    }

    /// True once a whole receive window arrived since the last acknowledgement
    pub fn ack_due(&self) -> bool {
        self.bytes_received - self.recv_window_at > self.recv_window_size as u64
    }

    /// Acknowledgement to send, if one is due. Moves the watermark.
    pub fn take_acknowledgement(&mut self) -> Option<ControlMessage> {
        if !self.ack_due() {
            return None;
        }
        self.recv_window_at = self.bytes_received;
        Some(ControlMessage::Acknowledgement(self.bytes_received as u32))
    }

    /// Apply an inbound control message, returning any replies
    pub fn handle_control(&mut self, message: &ControlMessage) -> Result<Vec<ControlMessage>> {
        match message {
            ControlMessage::SetChunkSize(size) => {
                if *size == 0 {
                    return Err(Error::protocol_corruption("Peer set a chunk size of zero"));
                }
                info!("Peer set chunk size: {}", size);
                self.recv_chunk_size = *size;
                Ok(Vec::new())
            }
            ControlMessage::Abort(chunk_stream_id) => {
                debug!("Abort message for chunk stream {}", chunk_stream_id);
                Ok(Vec::new())
            }
            ControlMessage::Acknowledgement(sequence) => {
                debug!("Acknowledgement: {}", sequence);
                self.send_window_at = self.bytes_sent;
                Ok(Vec::new())
            }
            ControlMessage::UserControl { event, data } => {
                log_user_control(*event, data);
                Ok(Vec::new())
            }
            ControlMessage::WindowAckSize(size) => {
                debug!("Window acknowledgement size: {}", size);
                self.recv_window_size = *size;
                self.recv_window_at = self.bytes_received;
                Ok(vec![ControlMessage::Acknowledgement(self.bytes_received as u32)])
            }
            ControlMessage::SetPeerBandwidth { size, limit } => {
                debug!("Set peer bandwidth: {} (limit type {})", size, limit);
                self.send_window_size = *size;
                Ok(vec![ControlMessage::WindowAckSize(self.send_window_size)])
            }
        }
    }
}

impl Default for FlowControl {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}

fn log_user_control(event: UserControlEvent, data: &[u8]) {
    let word = |at: usize| {
        data.get(at..at + 4)
            .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
            .unwrap_or(0)
    };

    match event {
        UserControlEvent::StreamBegin => debug!("UCM StreamBegin {}", word(0)),
        UserControlEvent::StreamEof => debug!("UCM StreamEOF {}", word(0)),
        UserControlEvent::StreamDry => debug!("UCM StreamDry {}", word(0)),
        UserControlEvent::SetBufferLength => {
            debug!("UCM SetBufferLength {} {}", word(0), word(4))
        }
        UserControlEvent::StreamIsRecorded => debug!("UCM StreamIsRecorded {}", word(0)),
        UserControlEvent::PingRequest => debug!("UCM PingRequest {}", word(0)),
        UserControlEvent::PingResponse => debug!("UCM PingResponse {}", word(0)),
        UserControlEvent::Other(code) => debug!("UCM unknown ({})", code),
    }
}
