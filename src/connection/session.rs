use crate::amf::Amf0Value;
use crate::chunk::{ChunkReader, ChunkWriter};
use crate::connection::{FlowControl, Role, SessionConfig, SessionContext, SessionState, Transport};
use crate::handlers::{status_info, stream_status, Action, CommandContext, CommandHandlerRegistry};
use crate::handshake::HandshakeEngine;
use crate::processing::{MediaRelay, Pacing};
use crate::protocol::constants::*;
use crate::protocol::{ControlMessage, RtmpCommand, RtmpPacket, UserControlEvent};
use crate::stream::{MediaHost, MediaPacket};
use crate::utils::Shutdown;
use crate::{Error, Result};
use log::{debug, error, info, trace, warn};
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

/// `flashVer` announced when pushing to a remote server
pub const PUSH_FLASH_VERSION: &str = concat!(
    "FMLE/3.0 (compatible; ",
    env!("CARGO_PKG_NAME"),
    "/",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// Pause applied per read cycle while the inbound rate is over the limit
const THROTTLE_DELAY: Duration = Duration::from_millis(250);

/// Upper bound on packets forwarded per poll tick
const MAX_PACKETS_PER_TICK: usize = 256;

/// One RTMP connection, in either role. Owned by a single task; every
/// piece of protocol state lives here and is mutated through `&mut self`.
pub struct Session<H: MediaHost> {
    id: Uuid,
    state: SessionState,
    config: SessionConfig,
    context: SessionContext,

    transport: Box<dyn Transport>,
    input: Vec<u8>,

    flow: FlowControl,
    reader: ChunkReader,
    writer: ChunkWriter,
    relay: MediaRelay,
    handlers: CommandHandlerRegistry,
    host: H,

    /// Playback data is being sent
    forwarding: bool,

    /// Metadata and init messages go out before the next media packet
    header_pending: bool,

    /// Packet pulled from the host but held back by pacing
    pending: Option<MediaPacket>,

    /// Wall clock and media time at which real-time pacing started
    pace_origin: Option<(Instant, u64)>,

    connected_at: Instant,
    throttled: bool,
    shutdown: Shutdown,
}

impl<H: MediaHost> Session<H> {
    pub fn new(
        transport: Box<dyn Transport>,
        host: H,
        config: SessionConfig,
        context: SessionContext,
        shutdown: Shutdown,
    ) -> Self {
        let rewind_correction = context.is_pusher();
        Session {
            id: Uuid::new_v4(),
            state: SessionState::Handshaking,
            flow: FlowControl::new(config.window_ack_size),
            config,
            context,
            transport,
            input: Vec::new(),
            reader: ChunkReader::new(),
            writer: ChunkWriter::new(),
            relay: MediaRelay::new(rewind_correction),
            handlers: CommandHandlerRegistry::new(),
            host,
            forwarding: false,
            header_pending: false,
            pending: None,
            pace_origin: None,
            connected_at: Instant::now(),
            throttled: false,
            shutdown,
        }
    }

    /// Session for an accepted connection
    pub fn listener(transport: Box<dyn Transport>, host: H, config: SessionConfig, shutdown: Shutdown) -> Self {
        let context = SessionContext::listener(transport.peer_host());
        Self::new(transport, host, config, context, shutdown)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn flow(&self) -> &FlowControl {
        &self.flow
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    /// Handshake, then process traffic until either side ends the session.
    /// Peer disconnects, cancellation and timeouts end it without an error.
    pub async fn run(&mut self) -> Result<()> {
        debug!("[{}] {:?} session with {}", self.id, self.context.role, self.context.client_host);

        let result = match self.start().await {
            Ok(()) => self.event_loop().await,
            Err(e) => Err(e),
        };
        self.close().await;

        match result {
            Ok(()) => {
                info!("[{}] Session with {} ended", self.id, self.context.client_host);
                Ok(())
            }
            Err(e) if e.is_silent() => {
                debug!("[{}] Session with {} ended: {}", self.id, self.context.client_host, e);
                Ok(())
            }
            Err(e) => {
                error!("[{}] Session with {} aborted: {}", self.id, self.context.client_host, e);
                Err(e)
            }
        }
    }

    async fn start(&mut self) -> Result<()> {
        let engine = HandshakeEngine::new(self.config.handshake_timeout);
        match self.context.role {
            Role::Listener => {
                let outcome = engine
                    .listen(self.transport.as_mut(), &mut self.input, &mut self.flow, &mut self.shutdown)
                    .await?;
                debug!("[{}] Handshake: {:?}", self.id, outcome);
            }
            Role::Pusher => {
                engine
                    .push(self.transport.as_mut(), &mut self.input, &mut self.flow, &mut self.shutdown)
                    .await?;
            }
        }

        // Chunk data that arrived together with the handshake
        self.flow.record_received(self.input.len());
        self.transition(SessionState::Idle);

        if self.context.is_pusher() {
            let connect = RtmpCommand::connect(
                &self.context.app_name,
                &self.context.request_url,
                PUSH_FLASH_VERSION,
            );
            self.send_command(&connect, MSG_TYPE_COMMAND_AMF0, 0).await?;
            self.send_control(ControlMessage::SetChunkSize(self.config.chunk_size)).await?;
            self.transition(SessionState::Connected);
            debug!("[{}] Waiting for server to acknowledge connect request...", self.id);
        }
        Ok(())
    }

    async fn event_loop(&mut self) -> Result<()> {
        self.process_input().await?;

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !self.state.is_finished() {
            tokio::select! {
                received = self.transport.receive(&mut self.input) => {
                    let count = received?;
                    if count == 0 {
                        debug!("[{}] Peer {} disconnected", self.id, self.context.client_host);
                        break;
                    }
                    self.flow.record_received(count);
                    self.process_input().await?;
                    self.throttle().await;
                }
                _ = self.shutdown.triggered() => {
                    info!("[{}] Shutdown requested", self.id);
                    self.finish().await;
                }
                _ = ticker.tick(), if self.forwarding => {
                    self.forward().await?;
                }
            }
        }
        Ok(())
    }

    /// Parse and handle every complete message in the input buffer
    async fn process_input(&mut self) -> Result<()> {
        while !self.state.is_finished() {
            self.reader.set_chunk_size(self.flow.recv_chunk_size as usize);
            let packet = match self.reader.read_message(&mut self.input) {
                Ok(Some(packet)) => packet,
                Ok(None) => break,
                Err(e) => return self.abort(e).await,
            };

            if let Some(ack) = self.flow.take_acknowledgement() {
                self.send_control(ack).await?;
            }

            match self.handle_message(packet).await {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) if e.is_fatal() => return self.abort(e).await,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Returns false when parsing should stop until more data arrives
    async fn handle_message(&mut self, packet: RtmpPacket) -> Result<bool> {
        trace!(
            "[{}] Message type {} on chunk stream {}, {} bytes at {}",
            self.id,
            packet.message_type(),
            packet.header.chunk_stream_id,
            packet.payload.len(),
            packet.timestamp()
        );

        match packet.message_type() {
            0 => {
                warn!("[{}] Received a zero-type message. Possible data corruption? Aborting!", self.id);
                Err(Error::protocol_corruption("zero message type"))
            }
            _ if packet.is_control() => {
                let message = ControlMessage::parse(&packet)?;
                for reply in self.flow.handle_control(&message)? {
                    self.send_control(reply).await?;
                }
                Ok(true)
            }
            MSG_TYPE_AUDIO | MSG_TYPE_VIDEO | MSG_TYPE_DATA_AMF0 => {
                self.handle_media(&packet).await?;
                Ok(true)
            }
            MSG_TYPE_COMMAND_AMF0 => {
                self.dispatch(&packet, &packet.payload).await?;
                Ok(true)
            }
            MSG_TYPE_COMMAND_AMF3 => {
                match packet.payload.split_first() {
                    Some((0, amf0)) => self.dispatch(&packet, amf0).await?,
                    _ => warn!("[{}] Received AMF3 command, which is not supported", self.id),
                }
                Ok(true)
            }
            MSG_TYPE_DATA_AMF3 | MSG_TYPE_SHARED_OBJECT_AMF3 | MSG_TYPE_SHARED_OBJECT_AMF0 | MSG_TYPE_AGGREGATE => {
                debug!("[{}] Ignoring message type {}", self.id, packet.message_type());
                Ok(true)
            }
            other => {
                error!(
                    "[{}] Unknown chunk received (type {})! Probably protocol corruption, stopping parsing of incoming data.",
                    self.id, other
                );
                Ok(false)
            }
        }
    }

    async fn handle_media(&mut self, packet: &RtmpPacket) -> Result<()> {
        if self.state != SessionState::Publishing {
            warn!("[{}] Received useless media data", self.id);
            self.finish().await;
            return Ok(());
        }

        if let Some(media) = self.relay.ingest(packet, &mut self.host)? {
            trace!("[{}] Packet for track {} at {}", self.id, media.track_id, media.time);
            self.host.buffer_packet(media);
        }
        Ok(())
    }

    async fn dispatch(&mut self, packet: &RtmpPacket, payload: &[u8]) -> Result<()> {
        let command = match RtmpCommand::decode(payload) {
            Ok(command) => command,
            Err(e) => {
                warn!("[{}] Ignoring undecodable command: {}", self.id, e);
                return Ok(());
            }
        };
        debug!("[{}] Received {} (transaction {})", self.id, command.name, command.transaction_id);

        let actions = {
            let mut context = CommandContext {
                state: self.state,
                session: &mut self.context,
                config: &self.config,
                host: &mut self.host,
                relay: &mut self.relay,
            };
            self.handlers.handle(&command, &mut context)
        };

        match actions {
            Ok(actions) => {
                self.apply(actions, packet.message_type(), packet.message_stream_id())
                    .await
            }
            Err(e) if e.is_fatal() || e.is_silent() => Err(e),
            Err(e) => {
                warn!("[{}] Command {} failed: {}", self.id, command.name, e);
                Ok(())
            }
        }
    }

    /// Carry out handler actions in order. Replies go back with the
    /// request's message type and stream id.
    async fn apply(&mut self, actions: Vec<Action>, reply_type: u8, reply_stream_id: u32) -> Result<()> {
        for action in actions {
            if self.state.is_finished() {
                break;
            }
            match action {
                Action::Reply(command) => self.send_command(&command, reply_type, reply_stream_id).await?,
                Action::Command {
                    command,
                    message_stream_id,
                } => {
                    self.send_command(&command, MSG_TYPE_COMMAND_AMF0, message_stream_id)
                        .await?
                }
                Action::Control(message) => self.send_control(message).await?,
                Action::Transition(next) => self.transition(next),
                Action::Forwarding(enabled) => {
                    self.forwarding = enabled;
                    self.pace_origin = None;
                }
                Action::SendHeaders => self.header_pending = true,
                Action::Stop => {
                    info!("[{}] Stopping stream '{}'", self.id, self.context.stream_name);
                    self.close().await;
                }
                Action::Finish => self.finish().await,
            }
        }
        Ok(())
    }

    /// Send whatever playback data the host has ready
    async fn forward(&mut self) -> Result<()> {
        if self.header_pending {
            self.header_pending = false;
            let tracks = self.host.tracks();
            for packet in self.relay.header_packets(&tracks)? {
                self.send_packet(&packet).await?;
            }
        }

        for _ in 0..MAX_PACKETS_PER_TICK {
            if !self.forwarding || self.state.is_finished() {
                break;
            }

            let Some(packet) = self.pending.take().or_else(|| self.host.next_packet()) else {
                if self.host.source_ended() {
                    info!("[{}] Source of '{}' ended", self.id, self.context.stream_name);
                    self.finish().await;
                }
                break;
            };

            if !self.is_due(&packet) {
                self.pending = Some(packet);
                break;
            }

            let Some(track) = self.host.track(packet.track_id) else {
                debug!("[{}] Dropping packet of unknown track {}", self.id, packet.track_id);
                continue;
            };
            if let Some(frame) = self.relay.frame(&packet, &track) {
                self.send_packet(&frame).await?;
            }
        }
        Ok(())
    }

    /// Real-time pacing: a packet is due once the wall clock caught up with
    /// its media time scaled by the pacing rate.
    fn is_due(&mut self, packet: &MediaPacket) -> bool {
        let Pacing::RealTime(permille) = self.relay.pacing() else {
            self.pace_origin = None;
            return true;
        };

        let (started, base) = *self.pace_origin.get_or_insert_with(|| (Instant::now(), packet.time));
        let media_ms = packet.time.saturating_sub(base);
        let wall_ms = started.elapsed().as_millis() as u64;
        media_ms * 1000 / permille.max(1) as u64 <= wall_ms
    }

    /// Slow down a peer sending faster than `max_kbps`
    async fn throttle(&mut self) {
        let Some(limit) = self.config.max_bytes_per_sec() else {
            return;
        };
        let age = self.connected_at.elapsed().as_secs();
        if age == 0 {
            return;
        }

        let rate = self.flow.bytes_received() / age;
        if rate > limit {
            if !self.throttled {
                warn!(
                    "[{}] Slowing down connection from {} because rate of {}kbps > {}kbps",
                    self.id,
                    self.context.client_host,
                    rate / 128,
                    limit / 128
                );
                self.throttled = true;
            }
            tokio::time::sleep(THROTTLE_DELAY).await;
        }
    }

    async fn send_packet(&mut self, packet: &RtmpPacket) -> Result<()> {
        let bytes = self.writer.encode(packet);
        self.transport.send(&bytes).await?;
        self.flow.record_sent(bytes.len());
        Ok(())
    }

    async fn send_command(&mut self, command: &RtmpCommand, message_type: u8, message_stream_id: u32) -> Result<()> {
        let mut payload = command.encode()?;
        if message_type == MSG_TYPE_COMMAND_AMF3 {
            payload.insert(0, 0);
        }
        debug!("[{}] Sending {} (transaction {})", self.id, command.name, command.transaction_id);
        self.send_packet(&RtmpPacket::command(message_type, message_stream_id, payload))
            .await
    }

    async fn send_control(&mut self, message: ControlMessage) -> Result<()> {
        self.send_packet(&message.to_packet()).await?;
        if let ControlMessage::SetChunkSize(size) = message {
            self.writer.set_chunk_size(size as usize);
            self.flow.send_chunk_size = size;
        }
        Ok(())
    }

    fn transition(&mut self, next: SessionState) {
        if !self.state.can_transition_to(next) {
            warn!("[{}] Unexpected state change {:?} -> {:?}", self.id, self.state, next);
        }
        trace!("[{}] {:?} -> {:?}", self.id, self.state, next);
        self.state = next;
    }

    async fn abort(&mut self, error: Error) -> Result<()> {
        self.input.clear();
        self.finish().await;
        Err(error)
    }

    /// Say goodbye the way the role expects, then close
    async fn finish(&mut self) {
        if self.state.is_finished() {
            return;
        }

        let connected = self.transport.is_connected();
        info!(
            "[{}] Finishing stream '{}', {}",
            self.id,
            self.context.stream_name,
            if connected { "while connected" } else { "already disconnected" }
        );
        self.transition(SessionState::Closing);
        self.forwarding = false;

        if connected {
            if let Err(e) = self.send_farewell().await {
                debug!("[{}] Farewell not delivered: {}", self.id, e);
            }
        }
        self.close().await;
    }

    async fn send_farewell(&mut self) -> Result<()> {
        match self.context.role {
            Role::Pusher => {
                let delete = RtmpCommand::delete_stream(6.0, MEDIA_STREAM_ID);
                self.send_command(&delete, MSG_TYPE_COMMAND_AMF0, MEDIA_STREAM_ID).await
            }
            Role::Listener => {
                self.send_control(ControlMessage::stream_event(UserControlEvent::StreamEof, MEDIA_STREAM_ID))
                    .await?;

                let stopped = RtmpCommand::on_status(
                    0.0,
                    Amf0Value::Object(stream_status("NetStream.Play.Stop", "Stream stopped")),
                );
                self.send_command(&stopped, MSG_TYPE_COMMAND_AMF0, MEDIA_STREAM_ID).await?;

                let mut info = status_info("status", "NetStream.Play.UnpublishNotify", "Stream stopped");
                info.push(("clientid".to_string(), Amf0Value::Number(CLIENT_ID)));
                let unpublished = RtmpCommand::on_status(0.0, Amf0Value::Object(info));
                self.send_command(&unpublished, MSG_TYPE_COMMAND_AMF0, MEDIA_STREAM_ID).await
            }
        }
    }

    async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.forwarding = false;
        if let Err(e) = self.transport.close().await {
            debug!("[{}] Error closing transport: {}", self.id, e);
        }
        self.host.release();
        self.state = SessionState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::MemoryTransport;
    use crate::stream::{MemoryHost, PushPolicy, StreamRegistry};
    use std::sync::Arc;

    /// C0C1 that fails validation, so no S0S1S2 is sent and no C2 awaited
    fn degraded_hello() -> Vec<u8> {
        let mut hello = vec![3];
        hello.extend(vec![0u8; 1536]);
        hello
    }

    fn session(handle: &MemoryTransport) -> Session<MemoryHost> {
        let host = MemoryHost::new(Arc::new(StreamRegistry::new()), PushPolicy::allow_all());
        Session::listener(Box::new(handle.clone()), host, SessionConfig::default(), Shutdown::never())
    }

    #[tokio::test]
    async fn test_zero_type_message_aborts() {
        let handle = MemoryTransport::new("127.0.0.1");
        handle.push_inbound(degraded_hello());
        let mut writer = ChunkWriter::new();
        handle.push_inbound(writer.encode(&RtmpPacket::command(0, 0, vec![1, 2, 3])));

        let mut session = session(&handle);
        let result = session.run().await;
        assert!(matches!(result, Err(Error::ProtocolCorruption(_))));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_media_before_publish_finishes() {
        let handle = MemoryTransport::new("127.0.0.1");
        handle.push_inbound(degraded_hello());
        let mut writer = ChunkWriter::new();
        handle.push_inbound(writer.encode(&RtmpPacket::media(MSG_TYPE_AUDIO, 0, vec![0x2F, 1, 2])));

        let mut session = session(&handle);
        session.run().await.unwrap();
        assert_eq!(session.state(), SessionState::Closed);
        // The farewell went out before closing
        assert!(!handle.sent().is_empty());
    }

    #[tokio::test]
    async fn test_leftover_handshake_bytes_are_counted() {
        let handle = MemoryTransport::new("127.0.0.1");
        let mut hello = degraded_hello();
        hello.extend_from_slice(&[0x02, 0x00]);
        handle.push_inbound(hello);

        let mut session = session(&handle);
        session.run().await.unwrap();
        assert_eq!(session.flow().bytes_received(), 1539);
    }
}
