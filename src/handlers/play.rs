use crate::amf::Amf0Value;
use crate::connection::SessionState;
use crate::handlers::{status_info, stream_status, Action, CommandContext, CommandHandler};
use crate::protocol::{ControlMessage, RtmpCommand, UserControlEvent, MEDIA_STREAM_ID};
use crate::utils::names::{normalize_stream_name, split_query, url_decode};
use crate::Result;
use log::{debug, info, warn};

/// User control event players expect after `Play.Start`; its meaning is undocumented
const PLAY_READY_EVENT: u16 = 32;

/// Status replies and control messages that (re)start playback. The
/// `timecodeOffset` field is included when `with_offset` is set, and then
/// also becomes the relay's output offset.
fn start_sequence(transaction_id: f64, context: &mut CommandContext<'_>, with_offset: bool) -> Vec<Action> {
    let mut actions = vec![Action::Reply(RtmpCommand::on_status(
        transaction_id,
        Amf0Value::Object(stream_status("NetStream.Play.Reset", "Playing and resetting...")),
    ))];

    if context.host.is_vod() {
        actions.push(Action::Control(ControlMessage::stream_event(
            UserControlEvent::StreamIsRecorded,
            MEDIA_STREAM_ID,
        )));
    }
    actions.push(Action::Control(ControlMessage::stream_event(
        UserControlEvent::StreamBegin,
        MEDIA_STREAM_ID,
    )));

    let mut start = stream_status("NetStream.Play.Start", "Playing!");
    if with_offset {
        let offset = context.host.current_time();
        context.relay.set_rtmp_offset(offset as i64);
        start.push(("timecodeOffset".to_string(), Amf0Value::Number(offset as f64)));
    }
    actions.push(Action::Reply(RtmpCommand::on_status(transaction_id, Amf0Value::Object(start))));
    actions.push(Action::Control(ControlMessage::SetChunkSize(context.config.chunk_size)));
    actions.push(Action::Control(ControlMessage::stream_event(
        UserControlEvent::Other(PLAY_READY_EVENT),
        MEDIA_STREAM_ID,
    )));
    actions
}

/// `play` and `play2`
pub struct PlayHandler;

impl PlayHandler {
    pub fn new() -> Self {
        PlayHandler
    }
}

impl CommandHandler for PlayHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["play", "play2"]
    }

    fn accepts(&self, state: SessionState) -> bool {
        matches!(state, SessionState::Connected | SessionState::Playing)
    }

    fn handle(&self, command: &RtmpCommand, context: &mut CommandContext<'_>) -> Result<Vec<Action>> {
        let txn = command.transaction_id;
        let session = &mut *context.session;

        let decoded = url_decode(command.get_str(3).unwrap_or_default());
        session.request_url = format!("{}/{}", session.request_url, decoded);

        let (name, params) = split_query(&decoded);
        session.target_params.extend(params);
        session.stream_name = normalize_stream_name(&name);

        if !context.config.acceptable.allows_play() {
            let info = Amf0Value::object([
                ("code", Amf0Value::from("NetStream.Play.Rejected")),
                ("description", Amf0Value::from("Play rejected: this interface does not allow playback")),
            ]);
            info!(
                "Play of {} by {} rejected - connector configured to only allow incoming streams",
                session.stream_name, session.client_host
            );
            return Ok(vec![Action::Reply(RtmpCommand::error(txn, info)), Action::Finish]);
        }

        if !context.host.select_stream(&session.stream_name) {
            warn!("Play of unknown stream '{}' by {}", session.stream_name, session.client_host);
            let info = status_info("error", "NetStream.Play.StreamNotFound", "Stream not found");
            return Ok(vec![
                Action::Reply(RtmpCommand::error(txn, Amf0Value::Object(info))),
                Action::Finish,
            ]);
        }

        info!("Play of '{}' by {} started", session.stream_name, session.client_host);
        let mut actions = start_sequence(txn, context, true);
        actions.push(Action::Transition(SessionState::Playing));
        actions.push(Action::SendHeaders);
        actions.push(Action::Forwarding(true));
        Ok(actions)
    }
}

pub struct SeekHandler;

impl SeekHandler {
    pub fn new() -> Self {
        SeekHandler
    }
}

impl CommandHandler for SeekHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["seek"]
    }

    fn accepts(&self, state: SessionState) -> bool {
        state == SessionState::Playing
    }

    fn handle(&self, command: &RtmpCommand, context: &mut CommandContext<'_>) -> Result<Vec<Action>> {
        let txn = command.transaction_id;
        let target = command.get(3).and_then(|v| v.as_number()).unwrap_or(0.0).max(0.0) as u64;

        let mut actions = vec![Action::Reply(RtmpCommand::on_status(
            txn,
            Amf0Value::Object(stream_status("NetStream.Seek.Notify", "Seeking to the specified time")),
        ))];

        debug!("Seeking {} to {} ms", context.session.stream_name, target);
        context.host.seek(target);

        let live = context.host.is_live();
        actions.extend(start_sequence(txn, context, live));
        Ok(actions)
    }
}

/// `pause` and `pauseRaw`
pub struct PauseHandler;

impl PauseHandler {
    pub fn new() -> Self {
        PauseHandler
    }
}

impl CommandHandler for PauseHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["pause", "pauseRaw"]
    }

    fn accepts(&self, state: SessionState) -> bool {
        state == SessionState::Playing
    }

    fn handle(&self, command: &RtmpCommand, _context: &mut CommandContext<'_>) -> Result<Vec<Action>> {
        let pausing = command.get(3).is_some_and(|v| v.is_truthy());
        let (code, description) = if pausing {
            ("NetStream.Pause.Notify", "Pausing playback")
        } else {
            ("NetStream.Unpause.Notify", "Resuming playback")
        };

        Ok(vec![
            Action::Forwarding(!pausing),
            Action::Reply(RtmpCommand::on_status(
                command.transaction_id,
                Amf0Value::Object(stream_status(code, description)),
            )),
        ])
    }
}
