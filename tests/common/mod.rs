// Shared helpers for the integration tests: a scripted RTMP peer talking to
// a real session over an in-memory duplex pipe.
#![allow(dead_code)]

use rtmp::{
    Amf0Value, ChunkReader, ChunkWriter, ControlMessage, MemoryHost, PushPolicy, RtmpCommand, RtmpPacket, Session,
    SessionConfig, Shutdown, StreamRegistry, TcpTransport, Track, ValidationScheme, C0C1, MSG_TYPE_COMMAND_AMF0,
    MSG_TYPE_COMMAND_AMF3, MSG_TYPE_SET_CHUNK_SIZE, PushClient,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;

pub const TC_URL: &str = "rtmp://127.0.0.1/live";

/// How long a test waits for the session to say something
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

pub type SessionHandle = JoinHandle<(rtmp::Result<()>, Session<MemoryHost>)>;

/// Run a listener session with `host` on one end of a pipe; the returned
/// peer holds the other end.
pub fn spawn_listener(host: MemoryHost, config: SessionConfig) -> (TestPeer, SessionHandle) {
    let (client, server) = tokio::io::duplex(1 << 20);
    let transport = TcpTransport::from_io(server, "127.0.0.1");

    let handle = tokio::spawn(async move {
        let mut session = Session::listener(Box::new(transport), host, config, Shutdown::never());
        let result = session.run().await;
        (result, session)
    });
    (TestPeer::new(client), handle)
}

/// Run `client` against the peer, which plays the remote server
pub fn spawn_pusher(client: PushClient, host: MemoryHost) -> (TestPeer, JoinHandle<rtmp::Result<MemoryHost>>) {
    let (ours, theirs) = tokio::io::duplex(1 << 20);
    let transport = TcpTransport::from_io(theirs, "198.51.100.1");

    let handle = tokio::spawn(async move { client.push_over(Box::new(transport), host, Shutdown::never()).await });
    (TestPeer::new(ours), handle)
}

pub fn memory_host(registry: &Arc<StreamRegistry>) -> MemoryHost {
    MemoryHost::new(registry.clone(), PushPolicy::allow_all())
}

/// Stream `name` with one H.264 track holding two keyframe groups
pub fn seed_video_stream(registry: &StreamRegistry, name: &str) {
    let track = Track::video(13, "H264", 640, 360).with_init(vec![0x01, 0x64, 0x00, 0x1F, 0xFF]);
    registry.insert_stream(name, vec![track]);
    for (time, key) in [(0, true), (40, false), (80, true), (120, false)] {
        let packet = rtmp::MediaPacket::new(13, time, vec![0x00, 0x00, 0x00, 0x01, 0x65]);
        registry.push_packet(name, if key { packet.keyframe() } else { packet });
    }
}

pub trait PeerStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> PeerStream for S {}

pub struct TestPeer {
    stream: Box<dyn PeerStream>,
    reader: ChunkReader,
    writer: ChunkWriter,
    input: Vec<u8>,
}

impl TestPeer {
    pub fn new(stream: impl PeerStream + 'static) -> Self {
        TestPeer {
            stream: Box::new(stream),
            reader: ChunkReader::new(),
            writer: ChunkWriter::new(),
            input: Vec::new(),
        }
    }

    /// Signed C0C1, read S0S1S2, answer with C2. Returns the server's bytes.
    pub async fn handshake(&mut self) -> Vec<u8> {
        let c0c1 = C0C1::create_signed(ValidationScheme::Scheme1).unwrap().encode();
        self.stream.write_all(&c0c1).await.unwrap();

        let mut response = vec![0u8; 3073];
        tokio::time::timeout(RECV_TIMEOUT, self.stream.read_exact(&mut response))
            .await
            .expect("no handshake response")
            .unwrap();

        self.stream.write_all(&response[1537..]).await.unwrap();
        response
    }

    /// Server side of the pusher's fixed hello. Returns what the pusher sent.
    pub async fn answer_push_hello(&mut self) -> Vec<u8> {
        let mut hello = vec![0u8; 3073];
        tokio::time::timeout(RECV_TIMEOUT, self.stream.read_exact(&mut hello))
            .await
            .expect("no push hello")
            .unwrap();
        self.stream.write_all(&[3u8; 3073]).await.unwrap();
        hello
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
    }

    pub async fn send(&mut self, packet: &RtmpPacket) {
        let bytes = self.writer.encode(packet);
        self.send_raw(&bytes).await;
    }

    pub async fn send_command(&mut self, command: &RtmpCommand, message_stream_id: u32) {
        let payload = command.encode().unwrap();
        self.send(&RtmpPacket::command(MSG_TYPE_COMMAND_AMF0, message_stream_id, payload))
            .await;
    }

    pub async fn connect(&mut self) -> RtmpCommand {
        self.send_command(&RtmpCommand::connect("live", TC_URL, "LNX 9,0,124,2"), 0)
            .await;
        self.expect_command("_result").await
    }

    /// Next message from the session, or None once it closed the pipe.
    /// Chunk size changes are applied as they pass.
    pub async fn recv(&mut self) -> Option<RtmpPacket> {
        loop {
            if let Some(packet) = self.reader.read_message(&mut self.input).expect("session sent garbage") {
                if packet.message_type() == MSG_TYPE_SET_CHUNK_SIZE {
                    if let Ok(ControlMessage::SetChunkSize(size)) = ControlMessage::parse(&packet) {
                        self.reader.set_chunk_size(size as usize);
                    }
                }
                return Some(packet);
            }

            let mut buffer = vec![0u8; 64 * 1024];
            let read = tokio::time::timeout(RECV_TIMEOUT, self.stream.read(&mut buffer))
                .await
                .expect("session went quiet");
            match read {
                Ok(0) | Err(_) => return None,
                Ok(n) => self.input.extend_from_slice(&buffer[..n]),
            }
        }
    }

    /// Skip ahead to the next command called `name`
    pub async fn expect_command(&mut self, name: &str) -> RtmpCommand {
        loop {
            let packet = self
                .recv()
                .await
                .unwrap_or_else(|| panic!("closed while waiting for {}", name));
            if let Some(command) = decode_command(&packet) {
                if command.name == name {
                    return command;
                }
            }
        }
    }

    /// Everything the session sends until it closes the pipe
    pub async fn drain(&mut self) -> Vec<RtmpPacket> {
        let mut packets = Vec::new();
        while let Some(packet) = self.recv().await {
            packets.push(packet);
        }
        packets
    }

    /// Hang up
    pub fn close(self) {
        drop(self.stream);
    }
}

pub fn decode_command(packet: &RtmpPacket) -> Option<RtmpCommand> {
    match packet.message_type() {
        MSG_TYPE_COMMAND_AMF0 => RtmpCommand::decode(&packet.payload).ok(),
        MSG_TYPE_COMMAND_AMF3 => RtmpCommand::decode(packet.payload.get(1..)?).ok(),
        _ => None,
    }
}

/// `code` of the information object a status reply carries
pub fn status_code(command: &RtmpCommand) -> Option<String> {
    command
        .get(3)
        .and_then(|info| info.get_property("code"))
        .and_then(Amf0Value::as_string)
        .map(str::to_string)
}
