mod connect;
mod create_stream;
mod publish;
mod play;
mod delete_stream;
mod compat;
mod push;

use crate::amf::{Amf0Properties, Amf0Value};
use crate::connection::{SessionConfig, SessionContext, SessionState};
use crate::processing::MediaRelay;
use crate::protocol::{ControlMessage, RtmpCommand};
use crate::stream::MediaHost;
use crate::Result;
use log::warn;
use std::collections::HashMap;
use std::sync::Arc;

pub use compat::*;
pub use connect::ConnectHandler;
pub use create_stream::CreateStreamHandler;
pub use delete_stream::{CloseStreamHandler, DeleteStreamHandler};
pub use play::{PauseHandler, PlayHandler, SeekHandler};
pub use publish::PublishHandler;
pub use push::ResultHandler;

/// Something the session must do in response to a command, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Reply on the command channel, using the request's message type and stream
    Reply(RtmpCommand),

    /// AMF0 command on a given message stream
    Command {
        command: RtmpCommand,
        message_stream_id: u32,
    },

    Control(ControlMessage),

    Transition(SessionState),

    /// Start or stop sending playback data
    Forwarding(bool),

    /// Send metadata and codec init messages before the next media packet
    SendHeaders,

    /// Close without a farewell
    Stop,

    /// Farewell sequence, then close
    Finish,
}

/// Everything a handler may read or change while processing one command
pub struct CommandContext<'a> {
    /// State the session was in when the command arrived
    pub state: SessionState,
    pub session: &'a mut SessionContext,
    pub config: &'a SessionConfig,
    pub host: &'a mut dyn MediaHost,
    pub relay: &'a mut MediaRelay,
}

pub trait CommandHandler: Send + Sync {
    /// Command names this handler processes
    fn command_names(&self) -> &'static [&'static str];

    /// Whether the command may run in `state`. Refused commands get a
    /// `NetConnection.Call.Failed` error and change nothing.
    fn accepts(&self, _state: SessionState) -> bool {
        true
    }

    /// Handle the command
    fn handle(&self, command: &RtmpCommand, context: &mut CommandContext<'_>) -> Result<Vec<Action>>;
}

/// Command handler registry
pub struct CommandHandlerRegistry {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl CommandHandlerRegistry {
    pub fn new() -> Self {
        let mut registry = CommandHandlerRegistry {
            handlers: HashMap::new(),
        };

        // Register default handlers
        registry.register(Arc::new(ConnectHandler::new()));
        registry.register(Arc::new(CreateStreamHandler::new()));
        registry.register(Arc::new(PublishHandler::new()));
        registry.register(Arc::new(PlayHandler::new()));
        registry.register(Arc::new(SeekHandler::new()));
        registry.register(Arc::new(PauseHandler::new()));
        registry.register(Arc::new(CloseStreamHandler::new()));
        registry.register(Arc::new(DeleteStreamHandler::new()));
        registry.register(Arc::new(PingHandler::new()));
        registry.register(Arc::new(CheckBandwidthHandler::new()));
        registry.register(Arc::new(StreamLengthHandler::new()));
        registry.register(Arc::new(ReleaseStreamHandler::new()));
        registry.register(Arc::new(FcPublishHandler::new()));
        registry.register(Arc::new(FcSubscribeHandler::new()));
        registry.register(Arc::new(XsplitHandler::new()));
        registry.register(Arc::new(IgnoredHandler::new()));
        registry.register(Arc::new(ErrorResponseHandler::new()));
        registry.register(Arc::new(ResultHandler::new()));

        registry
    }

    /// Register a handler for all its names, replacing earlier ones
    pub fn register(&mut self, handler: Arc<dyn CommandHandler>) {
        for name in handler.command_names() {
            self.handlers.insert(name.to_string(), handler.clone());
        }
    }

    pub fn contains(&self, command_name: &str) -> bool {
        self.handlers.contains_key(command_name)
    }

    pub fn handle(&self, command: &RtmpCommand, context: &mut CommandContext<'_>) -> Result<Vec<Action>> {
        match self.handlers.get(&command.name) {
            Some(handler) if !handler.accepts(context.state) => {
                warn!(
                    "Refusing {} from {} while {:?}",
                    command.name, context.session.client_host, context.state
                );
                let description = format!("{} is not allowed while {:?}", command.name, context.state);
                let info = status_info("error", "NetConnection.Call.Failed", &description);
                Ok(vec![Action::Reply(RtmpCommand::error(
                    command.transaction_id,
                    Amf0Value::Object(info),
                ))])
            }
            Some(handler) => handler.handle(command, context),
            None => {
                warn!("AMF0 command not processed: {}", command.name);
                let reply = RtmpCommand::new("_error", command.transaction_id)
                    .with_object(Amf0Value::from(command.name.as_str()))
                    .with_arg(Amf0Value::from("Command not implemented or recognized"));
                Ok(vec![Action::Reply(reply)])
            }
        }
    }
}

impl Default for CommandHandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Information object with level, code and description
pub(crate) fn status_info(level: &str, code: &str, description: &str) -> Amf0Properties {
    vec![
        ("level".to_string(), Amf0Value::from(level)),
        ("code".to_string(), Amf0Value::from(code)),
        ("description".to_string(), Amf0Value::from(description)),
    ]
}

/// Status information carrying the `details` and `clientid` fields players expect
pub(crate) fn stream_status(code: &str, description: &str) -> Amf0Properties {
    let mut info = status_info("status", code, description);
    info.push(("details".to_string(), Amf0Value::from(crate::protocol::STATUS_DETAILS)));
    info.push(("clientid".to_string(), Amf0Value::Number(crate::protocol::CLIENT_ID)));
    info
}
