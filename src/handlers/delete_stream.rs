use crate::amf::Amf0Value;
use crate::handlers::{stream_status, Action, CommandContext, CommandHandler};
use crate::protocol::{ControlMessage, RtmpCommand, UserControlEvent, MEDIA_STREAM_ID};
use crate::Result;
use log::info;

pub struct CloseStreamHandler;

impl CloseStreamHandler {
    pub fn new() -> Self {
        CloseStreamHandler
    }
}

impl CommandHandler for CloseStreamHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["closeStream"]
    }

    fn handle(&self, _command: &RtmpCommand, context: &mut CommandContext<'_>) -> Result<Vec<Action>> {
        info!("closeStream for '{}' from {}", context.session.stream_name, context.session.client_host);
        let stopped = RtmpCommand::on_status(
            0.0,
            Amf0Value::Object(stream_status("NetStream.Play.Stop", "Stream stopped")),
        );
        Ok(vec![
            Action::Control(ControlMessage::stream_event(UserControlEvent::StreamEof, MEDIA_STREAM_ID)),
            Action::Command {
                command: stopped,
                message_stream_id: MEDIA_STREAM_ID,
            },
            Action::Stop,
        ])
    }
}

pub struct DeleteStreamHandler;

impl DeleteStreamHandler {
    pub fn new() -> Self {
        DeleteStreamHandler
    }
}

impl CommandHandler for DeleteStreamHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["deleteStream"]
    }

    fn handle(&self, _command: &RtmpCommand, context: &mut CommandContext<'_>) -> Result<Vec<Action>> {
        info!("deleteStream for '{}' from {}", context.session.stream_name, context.session.client_host);
        Ok(vec![Action::Stop])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::*;

    #[test]
    fn test_close_stream_says_goodbye() {
        let mut fixture = Fixture::listener();
        let actions = fixture.run(&CloseStreamHandler::new(), &RtmpCommand::new("closeStream", 0.0));
        assert_eq!(
            actions[0],
            Action::Control(ControlMessage::stream_event(UserControlEvent::StreamEof, 1))
        );
        assert_eq!(reply_code(&actions[1]).as_deref(), Some("NetStream.Play.Stop"));
        assert!(matches!(actions[1], Action::Command { message_stream_id: 1, .. }));
        assert_eq!(actions[2], Action::Stop);
    }

    #[test]
    fn test_delete_stream_stops() {
        let mut fixture = Fixture::listener();
        let actions = fixture.run(&DeleteStreamHandler::new(), &RtmpCommand::delete_stream(6.0, 1));
        assert_eq!(actions, vec![Action::Stop]);
    }
}
