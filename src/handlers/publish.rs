use crate::amf::Amf0Value;
use crate::connection::SessionState;
use crate::handlers::{status_info, Action, CommandContext, CommandHandler};
use crate::protocol::{ControlMessage, RtmpCommand, UserControlEvent, CLIENT_ID, MEDIA_STREAM_ID};
use crate::utils::names::{normalize_stream_name, url_decode};
use crate::Result;
use log::{error, info};

pub struct PublishHandler;

impl PublishHandler {
    pub fn new() -> Self {
        PublishHandler
    }

    fn rejected(&self, transaction_id: f64, description: &str) -> Vec<Action> {
        let info = Amf0Value::object([
            ("code", Amf0Value::from("NetStream.Publish.Rejected")),
            ("description", Amf0Value::from(description)),
        ]);
        vec![
            Action::Reply(RtmpCommand::error(transaction_id, info)),
            Action::Finish,
        ]
    }

    fn create_publish_status(&self, transaction_id: f64) -> RtmpCommand {
        let mut info = status_info("status", "NetStream.Publish.Start", "Stream is now published!");
        info.push(("clientid".to_string(), Amf0Value::Number(CLIENT_ID)));
        RtmpCommand::on_status(transaction_id, Amf0Value::Object(info))
    }
}

impl CommandHandler for PublishHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["publish"]
    }

    fn accepts(&self, state: SessionState) -> bool {
        state == SessionState::Connected
    }

    fn handle(&self, command: &RtmpCommand, context: &mut CommandContext<'_>) -> Result<Vec<Action>> {
        let txn = command.transaction_id;
        let session = &mut *context.session;

        if !context.config.acceptable.allows_publish() {
            info!(
                "Push from {} rejected - connector configured to only allow outgoing streams",
                session.client_host
            );
            return Ok(self.rejected(txn, "Publish rejected: this interface does not allow publishing"));
        }

        let mut name = url_decode(command.get_str(3).unwrap_or_default());
        session.request_url = format!("{}/{}", session.request_url, name);

        if let Some(new_url) = context.host.rewrite_push_url(&session.request_url, &session.client_host) {
            if new_url.is_empty() {
                error!(
                    "Push from {} to URL {} rejected - push rewrite hook blanked the URL",
                    session.client_host, session.request_url
                );
                return Ok(vec![Action::Finish]);
            }
            name = match new_url.rfind('/') {
                Some(slash) => new_url[slash + 1..].to_string(),
                None => new_url.clone(),
            };
            session.request_url = new_url;
        }

        session.stream_name = normalize_stream_name(&name);

        if !context.host.allow_push(
            &session.stream_name,
            &session.client_host,
            "RTMP",
            &session.request_url,
        ) {
            return Ok(self.rejected(txn, "Publish rejected"));
        }

        info!("Publish of '{}' by {} started", session.stream_name, session.client_host);
        Ok(vec![
            Action::Reply(self.create_publish_status(txn)),
            Action::Control(ControlMessage::stream_event(UserControlEvent::StreamBegin, MEDIA_STREAM_ID)),
            Action::Transition(SessionState::Publishing),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Acceptable;
    use crate::handlers::test_support::*;
    use crate::stream::{MediaHost, MediaPacket, Track};

    fn publish(name: &str) -> RtmpCommand {
        RtmpCommand::publish(5.0, name, "live")
    }

    #[test]
    fn test_publish_start() {
        let mut fixture = Fixture::listener();
        fixture.session.request_url = "rtmp://host/live".to_string();
        let actions = fixture.run(&PublishHandler::new(), &publish("Stream1"));

        assert_eq!(reply_code(&actions[0]).as_deref(), Some("NetStream.Publish.Start"));
        assert_eq!(
            actions[1],
            Action::Control(ControlMessage::stream_event(UserControlEvent::StreamBegin, 1))
        );
        assert_eq!(actions[2], Action::Transition(SessionState::Publishing));
        assert_eq!(fixture.session.stream_name, "stream1");
        assert_eq!(fixture.session.request_url, "rtmp://host/live/Stream1");
        assert!(fixture.registry.is_publishing("stream1"));
    }

    #[test]
    fn test_name_truncated_at_slash() {
        let mut fixture = Fixture::listener();
        fixture.run(&PublishHandler::new(), &publish("cam%201/key/more"));
        assert_eq!(fixture.session.stream_name, "cam1");
    }

    #[test]
    fn test_outgoing_only_rejects() {
        let mut fixture = Fixture::listener();
        fixture.config.acceptable = Acceptable::OutgoingOnly;
        let actions = fixture.run(&PublishHandler::new(), &publish("stream1"));

        assert_eq!(reply_code(&actions[0]).as_deref(), Some("NetStream.Publish.Rejected"));
        assert_eq!(actions[1], Action::Finish);
        assert!(!fixture.registry.is_publishing("stream1"));
    }

    #[test]
    fn test_second_publisher_rejected() {
        let mut fixture = Fixture::listener();
        fixture.registry.begin_publish("stream1");
        let actions = fixture.run(&PublishHandler::new(), &publish("stream1"));
        assert_eq!(reply_code(&actions[0]).as_deref(), Some("NetStream.Publish.Rejected"));
        assert_eq!(actions.last(), Some(&Action::Finish));
    }

    /// Host whose rewrite hook returns a fixed URL
    struct RewritingHost {
        url: &'static str,
        pushed: Option<String>,
    }

    impl MediaHost for RewritingHost {
        fn track(&self, _id: u32) -> Option<Track> {
            None
        }
        fn tracks(&self) -> Vec<Track> {
            Vec::new()
        }
        fn update_track(&mut self, _track: Track) {}
        fn boot_ms_offset(&self) -> Option<i64> {
            None
        }
        fn set_boot_ms_offset(&mut self, _offset: i64) {}
        fn buffer_packet(&mut self, _packet: MediaPacket) {}
        fn allow_push(&mut self, stream_name: &str, _client_host: &str, _protocol: &str, _url: &str) -> bool {
            self.pushed = Some(stream_name.to_string());
            true
        }
        fn rewrite_push_url(&mut self, _request_url: &str, _client_host: &str) -> Option<String> {
            Some(self.url.to_string())
        }
        fn select_stream(&mut self, _stream_name: &str) -> bool {
            false
        }
        fn is_vod(&self) -> bool {
            false
        }
        fn current_time(&self) -> u64 {
            0
        }
        fn seek(&mut self, _time_ms: u64) {}
        fn next_packet(&mut self) -> Option<MediaPacket> {
            None
        }
    }

    fn run_with(host: &mut RewritingHost, name: &str) -> Vec<Action> {
        let mut fixture = Fixture::listener();
        let mut context = CommandContext {
            state: fixture.state,
            session: &mut fixture.session,
            config: &fixture.config,
            host,
            relay: &mut fixture.relay,
        };
        PublishHandler::new().handle(&publish(name), &mut context).unwrap()
    }

    #[test]
    fn test_rewrite_hook_renames_stream() {
        let mut host = RewritingHost { url: "rtmp://other/app/Renamed", pushed: None };
        let actions = run_with(&mut host, "original");
        assert_eq!(host.pushed.as_deref(), Some("renamed"));
        assert_eq!(reply_code(&actions[0]).as_deref(), Some("NetStream.Publish.Start"));
    }

    #[test]
    fn test_rewrite_hook_veto() {
        let mut host = RewritingHost { url: "", pushed: None };
        let actions = run_with(&mut host, "original");
        assert_eq!(actions, vec![Action::Finish]);
        assert!(host.pushed.is_none());
    }
}
