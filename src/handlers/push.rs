use crate::connection::SessionState;
use crate::handlers::{Action, CommandContext, CommandHandler};
use crate::processing::Pacing;
use crate::protocol::{RtmpCommand, MEDIA_STREAM_ID};
use crate::Result;
use log::{debug, info, warn};

/// Transaction id of the `connect` a pusher opens with
const CONNECT_TRANSACTION: f64 = 1.0;

/// Replies from a remote server. The reply to our `connect` starts the
/// publish chain; everything else is informational.
pub struct ResultHandler;

impl ResultHandler {
    pub fn new() -> Self {
        ResultHandler
    }

    fn publish_chain(&self, stream_out: &str) -> Vec<Action> {
        let on_control_stream = |command| Action::Command {
            command,
            message_stream_id: 0,
        };
        vec![
            on_control_stream(RtmpCommand::release_stream(2.0, stream_out)),
            on_control_stream(RtmpCommand::fc_publish(3.0, stream_out)),
            on_control_stream(RtmpCommand::create_stream(4.0)),
            Action::Command {
                command: RtmpCommand::publish(5.0, stream_out, "live"),
                message_stream_id: MEDIA_STREAM_ID,
            },
        ]
    }
}

impl CommandHandler for ResultHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["_result", "onFCPublish", "onStatus"]
    }

    fn handle(&self, command: &RtmpCommand, context: &mut CommandContext<'_>) -> Result<Vec<Action>> {
        let session = &mut *context.session;

        if command.name == "_result"
            && command.transaction_id == CONNECT_TRANSACTION
            && session.is_pusher()
            && !session.push_started
        {
            session.push_started = true;
            context.relay.set_pacing(Pacing::Unconstrained);
            info!("Publish of '{}' as '{}' starting", session.stream_name, session.stream_out);

            let mut actions = self.publish_chain(&session.stream_out);
            actions.push(Action::Transition(SessionState::Playing));
            actions.push(Action::SendHeaders);
            actions.push(Action::Forwarding(true));
            return Ok(actions);
        }

        if command.name == "onStatus" {
            let info = command.get(3);
            let field = |key: &str| {
                info.and_then(|i| i.get_property(key))
                    .and_then(|v| v.as_string())
                    .unwrap_or_default()
            };
            if field("level") == "error" {
                warn!("Received error response: {}; {}", field("code"), field("description"));
                return Ok(Vec::new());
            }
        }

        debug!("Ignoring {} (transaction {})", command.name, command.transaction_id);
        Ok(Vec::new())
    }
}
