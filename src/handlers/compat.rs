//! Commands that some clients insist on sending. They change nothing about
//! the session and only get the acknowledgement those clients wait for.

use crate::amf::Amf0Value;
use crate::handlers::{status_info, Action, CommandContext, CommandHandler};
use crate::protocol::RtmpCommand;
use crate::Result;
use log::{debug, warn};

fn result(command: &RtmpCommand, value: Amf0Value) -> Result<Vec<Action>> {
    Ok(vec![Action::Reply(RtmpCommand::result(
        command.transaction_id,
        Amf0Value::Null,
        value,
    ))])
}

pub struct PingHandler;

impl PingHandler {
    pub fn new() -> Self {
        PingHandler
    }
}

impl CommandHandler for PingHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["ping"]
    }

    fn handle(&self, command: &RtmpCommand, _context: &mut CommandContext<'_>) -> Result<Vec<Action>> {
        result(command, Amf0Value::from("Pong!"))
    }
}

pub struct CheckBandwidthHandler;

impl CheckBandwidthHandler {
    pub fn new() -> Self {
        CheckBandwidthHandler
    }
}

impl CommandHandler for CheckBandwidthHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["checkBandwidth"]
    }

    fn handle(&self, command: &RtmpCommand, _context: &mut CommandContext<'_>) -> Result<Vec<Action>> {
        result(command, Amf0Value::Null)
    }
}

/// `getStreamLength` / `getMovLen`: live streams have no length
pub struct StreamLengthHandler;

impl StreamLengthHandler {
    pub fn new() -> Self {
        StreamLengthHandler
    }
}

impl CommandHandler for StreamLengthHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["getStreamLength", "getMovLen"]
    }

    fn handle(&self, command: &RtmpCommand, _context: &mut CommandContext<'_>) -> Result<Vec<Action>> {
        result(command, Amf0Value::Number(0.0))
    }
}

pub struct ReleaseStreamHandler;

impl ReleaseStreamHandler {
    pub fn new() -> Self {
        ReleaseStreamHandler
    }
}

impl CommandHandler for ReleaseStreamHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["releaseStream"]
    }

    fn handle(&self, command: &RtmpCommand, _context: &mut CommandContext<'_>) -> Result<Vec<Action>> {
        result(command, Amf0Value::Undefined)
    }
}

pub struct FcPublishHandler;

impl FcPublishHandler {
    pub fn new() -> Self {
        FcPublishHandler
    }
}

impl CommandHandler for FcPublishHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["FCPublish"]
    }

    fn handle(&self, command: &RtmpCommand, _context: &mut CommandContext<'_>) -> Result<Vec<Action>> {
        let info = Amf0Value::object([
            ("code", Amf0Value::from("NetStream.Publish.Start")),
            (
                "description",
                Amf0Value::from("Please follow up with publish command, as we ignore this command."),
            ),
        ]);
        let reply = RtmpCommand::new("onFCPublish", command.transaction_id).with_arg(info);
        Ok(vec![Action::Reply(reply)])
    }
}

pub struct FcSubscribeHandler;

impl FcSubscribeHandler {
    pub fn new() -> Self {
        FcSubscribeHandler
    }
}

impl CommandHandler for FcSubscribeHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["FCSubscribe"]
    }

    fn handle(&self, command: &RtmpCommand, _context: &mut CommandContext<'_>) -> Result<Vec<Action>> {
        let mut info = status_info(
            "status",
            "NetStream.Play.Start",
            "Please follow up with play or publish command, as we ignore this command.",
        );
        // code comes first for this reply
        info.swap(0, 1);
        let reply = RtmpCommand::new("onFCSubscribe", command.transaction_id).with_arg(Amf0Value::Object(info));
        Ok(vec![Action::Reply(reply)])
    }
}

/// XSplit probes with `xsbwtest` and expects an error back
pub struct XsplitHandler;

impl XsplitHandler {
    pub fn new() -> Self {
        XsplitHandler
    }
}

impl CommandHandler for XsplitHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["xsbwtest"]
    }

    fn handle(&self, command: &RtmpCommand, _context: &mut CommandContext<'_>) -> Result<Vec<Action>> {
        let reply = RtmpCommand::new("_error", command.transaction_id)
            .with_object(Amf0Value::from("xsbwtest"))
            .with_arg(Amf0Value::from("Hai XSplit user!"));
        Ok(vec![Action::Reply(reply)])
    }
}

pub struct IgnoredHandler;

impl IgnoredHandler {
    pub fn new() -> Self {
        IgnoredHandler
    }
}

impl CommandHandler for IgnoredHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["FCUnpublish", "onBWDone"]
    }

    fn handle(&self, command: &RtmpCommand, _context: &mut CommandContext<'_>) -> Result<Vec<Action>> {
        debug!("Ignoring {}", command.name);
        Ok(Vec::new())
    }
}

/// `_error` from the peer: logged, never fatal
pub struct ErrorResponseHandler;

impl ErrorResponseHandler {
    pub fn new() -> Self {
        ErrorResponseHandler
    }

    fn describe(info: &Amf0Value) -> Option<String> {
        if let Some(text) = info.as_string() {
            return Some(text.to_string());
        }

        let field = |key: &str| {
            info.get_property(key)
                .and_then(|v| v.as_string())
                .filter(|s| !s.is_empty())
        };
        let code = field("code").unwrap_or_default();
        let mut description = field("description").unwrap_or_default().to_string();
        if let Some(details) = field("details") {
            if !description.is_empty() {
                description.push(',');
            }
            description.push_str(details);
        }

        if code.is_empty() && description.is_empty() {
            None
        } else {
            Some(format!("{}; {}", code, description))
        }
    }
}

impl CommandHandler for ErrorResponseHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["_error"]
    }

    fn handle(&self, command: &RtmpCommand, _context: &mut CommandContext<'_>) -> Result<Vec<Action>> {
        match command.get(3).and_then(Self::describe) {
            Some(message) => warn!("Received error response: {}", message),
            None => warn!("Received generic error response (no useful content)"),
        }
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::*;

    fn reply(actions: &[Action]) -> &RtmpCommand {
        match actions {
            [Action::Reply(command)] => command,
            other => panic!("expected a single reply, got {:?}", other),
        }
    }

    #[test]
    fn test_scripted_results() {
        let mut fixture = Fixture::listener();

        let actions = fixture.dispatch(&RtmpCommand::new("ping", 3.0));
        assert_eq!(reply(&actions).get_str(3), Some("Pong!"));

        let actions = fixture.dispatch(&RtmpCommand::new("getMovLen", 3.0));
        assert_eq!(reply(&actions).get(3), Some(&Amf0Value::Number(0.0)));

        let actions = fixture.dispatch(&RtmpCommand::new("checkBandwidth", 3.0));
        assert_eq!(reply(&actions).get(3), Some(&Amf0Value::Null));

        let actions = fixture.dispatch(&RtmpCommand::release_stream(2.0, "s"));
        assert_eq!(reply(&actions).name, "_result");
        assert_eq!(reply(&actions).get(3), Some(&Amf0Value::Undefined));
    }

    #[test]
    fn test_fc_replies() {
        let mut fixture = Fixture::listener();

        let actions = fixture.dispatch(&RtmpCommand::fc_publish(3.0, "s"));
        assert_eq!(reply(&actions).name, "onFCPublish");
        assert_eq!(reply_code(&actions[0]).as_deref(), Some("NetStream.Publish.Start"));

        let actions = fixture.dispatch(&RtmpCommand::new("FCSubscribe", 3.0));
        let info = &reply(&actions).arguments[0];
        assert_eq!(info.as_object().map(|o| o[0].0.as_str()), Some("code"));
        assert_eq!(info.get_property("level"), Some(&Amf0Value::from("status")));
    }

    #[test]
    fn test_xsplit_and_ignored() {
        let mut fixture = Fixture::listener();
        let actions = fixture.dispatch(&RtmpCommand::new("xsbwtest", 9.0));
        assert_eq!(reply(&actions).name, "_error");
        assert_eq!(reply(&actions).get_str(3), Some("Hai XSplit user!"));

        assert!(fixture.dispatch(&RtmpCommand::new("FCUnpublish", 4.0)).is_empty());
        assert!(fixture.dispatch(&RtmpCommand::new("onBWDone", 0.0)).is_empty());
    }

    #[test]
    fn test_error_descriptions() {
        let info = Amf0Value::object([
            ("code", Amf0Value::from("NetStream.Publish.BadName")),
            ("description", Amf0Value::from("Stream exists")),
            ("details", Amf0Value::from("live/x")),
        ]);
        assert_eq!(
            ErrorResponseHandler::describe(&info).as_deref(),
            Some("NetStream.Publish.BadName; Stream exists,live/x")
        );
        assert_eq!(ErrorResponseHandler::describe(&Amf0Value::from("nope")).as_deref(), Some("nope"));
        assert_eq!(ErrorResponseHandler::describe(&Amf0Value::object::<&str, _>([])), None);

        let mut fixture = Fixture::listener();
        let error = RtmpCommand::error(2.0, info);
        assert!(fixture.dispatch(&error).is_empty());
    }
}
