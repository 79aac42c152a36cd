use crate::amf::Amf0Value;
use crate::connection::SessionState;
use crate::handlers::{Action, CommandContext, CommandHandler};
use crate::protocol::{RtmpCommand, MEDIA_STREAM_ID};
use crate::Result;
use log::debug;

/// Hands out the single media stream a connection supports
pub struct CreateStreamHandler;

impl CreateStreamHandler {
    pub fn new() -> Self {
        CreateStreamHandler
    }
}

impl CommandHandler for CreateStreamHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["createStream"]
    }

    fn accepts(&self, state: SessionState) -> bool {
        state == SessionState::Connected
    }

    fn handle(&self, command: &RtmpCommand, context: &mut CommandContext<'_>) -> Result<Vec<Action>> {
        debug!("createStream from {}", context.session.client_host);
        let reply = RtmpCommand::result(
            command.transaction_id,
            Amf0Value::Null,
            Amf0Value::Number(MEDIA_STREAM_ID as f64),
        );
        Ok(vec![Action::Reply(reply)])
    }
}
