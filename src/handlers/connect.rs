use crate::amf::Amf0Value;
use crate::connection::SessionState;
use crate::handlers::{status_info, Action, CommandContext, CommandHandler};
use crate::protocol::constants::*;
use crate::protocol::{ControlMessage, RtmpCommand};
use crate::Result;
use log::info;

pub struct ConnectHandler;

impl ConnectHandler {
    pub fn new() -> Self {
        ConnectHandler
    }

    /// Application path of a `tcUrl`: everything after the first `/` past the scheme
    fn app_from_tc_url(tc_url: &str) -> Option<&str> {
        let slash = tc_url.get(7..)?.find('/')? + 7;
        Some(&tc_url[slash + 1..])
    }

    fn create_connect_result(&self, transaction_id: f64, object_encoding: f64) -> RtmpCommand {
        let props = Amf0Value::object([
            ("fmsVer", Amf0Value::from(FMS_VERSION)),
            ("capabilities", Amf0Value::Number(SERVER_CAPABILITIES)),
            ("mode", Amf0Value::Number(1.0)),
        ]);

        let mut info = status_info("status", "NetConnection.Connect.Success", "Connection succeeded.");
        info.push(("clientid".to_string(), Amf0Value::Number(CLIENT_ID)));
        info.push(("objectEncoding".to_string(), Amf0Value::Number(object_encoding)));

        RtmpCommand::result(transaction_id, props, Amf0Value::Object(info))
    }
}

impl CommandHandler for ConnectHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["connect"]
    }

    fn accepts(&self, state: SessionState) -> bool {
        state == SessionState::Idle
    }

    fn handle(&self, command: &RtmpCommand, context: &mut CommandContext<'_>) -> Result<Vec<Action>> {
        let session = &mut *context.session;

        session.object_encoding = command
            .property("objectEncoding")
            .and_then(|v| v.as_number())
            .unwrap_or(0.0);
        if let Some(flash_ver) = command.property("flashVer").and_then(|v| v.as_string()) {
            session.flash_version = flash_ver.to_string();
        }

        let app = command.property("app").and_then(|v| v.as_string()).unwrap_or_default();
        match command.property("tcUrl").and_then(|v| v.as_string()) {
            Some(tc_url) => {
                session.app_name = Self::app_from_tc_url(tc_url).unwrap_or(app).to_string();
                session.request_url = tc_url.to_string();
            }
            None => session.app_name = app.to_string(),
        }

        info!(
            "Connect from {}: app '{}', flashVer '{}'",
            session.client_host, session.app_name, session.flash_version
        );

        let config = context.config;
        Ok(vec![
            Action::Reply(self.create_connect_result(command.transaction_id, session.object_encoding)),
            Action::Control(ControlMessage::SetChunkSize(config.chunk_size)),
            Action::Control(ControlMessage::WindowAckSize(config.window_ack_size)),
            Action::Control(ControlMessage::SetPeerBandwidth {
                size: config.peer_bandwidth,
                limit: PEER_BANDWIDTH_DYNAMIC,
            }),
            Action::Transition(SessionState::Connected),
        ])
    }
}
