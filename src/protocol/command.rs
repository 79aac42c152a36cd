use log::warn;
use crate::amf::{Amf0Decoder, Amf0Encoder, Amf0Value};
use crate::{ByteBuffer, Error, Result};

/// A decoded AMF command. Positions follow the wire layout: 0 is the name,
/// 1 the transaction id, 2 the command object and 3.. the arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct RtmpCommand {
    pub name: String,
    pub transaction_id: f64,
    pub command_object: Amf0Value,
    pub arguments: Vec<Amf0Value>,
}

impl RtmpCommand {
    pub fn new(name: impl Into<String>, transaction_id: f64) -> Self {
        RtmpCommand {
            name: name.into(),
            transaction_id,
            command_object: Amf0Value::Null,
            arguments: Vec::new(),
        }
    }

    pub fn with_object(mut self, object: Amf0Value) -> Self {
        self.command_object = object;
        self
    }

    pub fn with_arg(mut self, value: Amf0Value) -> Self {
        self.arguments.push(value);
        self
    }

    /// Value at a wire position (3 is the first argument)
    pub fn get(&self, position: usize) -> Option<&Amf0Value> {
        match position {
            2 => Some(&self.command_object),
            p if p >= 3 => self.arguments.get(p - 3),
            _ => None,
        }
    }

    /// String at a wire position, if present
    pub fn get_str(&self, position: usize) -> Option<&str> {
        self.get(position).and_then(|v| v.as_string())
    }

    /// Property of the command object
    pub fn property(&self, key: &str) -> Option<&Amf0Value> {
        self.command_object.get_property(key)
    }

    /// `connect` issued when pushing to a remote server
    pub fn connect(app: &str, tc_url: &str, flash_ver: &str) -> Self {
        RtmpCommand::new("connect", 1.0).with_object(Amf0Value::object([
            ("app", Amf0Value::from(app)),
            ("type", Amf0Value::from("nonprivate")),
            ("flashVer", Amf0Value::from(flash_ver)),
            ("tcUrl", Amf0Value::from(tc_url)),
        ]))
    }

    pub fn release_stream(transaction_id: f64, stream_name: &str) -> Self {
        RtmpCommand::new("releaseStream", transaction_id).with_arg(stream_name.into())
    }

    pub fn fc_publish(transaction_id: f64, stream_name: &str) -> Self {
        RtmpCommand::new("FCPublish", transaction_id).with_arg(stream_name.into())
    }

    pub fn create_stream(transaction_id: f64) -> Self {
        RtmpCommand::new("createStream", transaction_id)
    }

    pub fn publish(transaction_id: f64, stream_name: &str, publish_type: &str) -> Self {
        RtmpCommand::new("publish", transaction_id)
            .with_arg(stream_name.into())
            .with_arg(publish_type.into())
    }

    pub fn delete_stream(transaction_id: f64, stream_id: u32) -> Self {
        RtmpCommand::new("deleteStream", transaction_id).with_arg(Amf0Value::Number(stream_id as f64))
    }

    /// `_result` with a command object and one value
    pub fn result(transaction_id: f64, object: Amf0Value, value: Amf0Value) -> Self {
        RtmpCommand::new("_result", transaction_id).with_object(object).with_arg(value)
    }

    /// `_error` with a null command object and an information value
    pub fn error(transaction_id: f64, info: Amf0Value) -> Self {
        RtmpCommand::new("_error", transaction_id).with_arg(info)
    }

    /// `onStatus` with a null command object
    pub fn on_status(transaction_id: f64, info: Amf0Value) -> Self {
        RtmpCommand::new("onStatus", transaction_id).with_arg(info)
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut encoder = Amf0Encoder::new();
        encoder.encode(&Amf0Value::String(self.name.clone()))?;
        encoder.encode(&Amf0Value::Number(self.transaction_id))?;
        encoder.encode(&self.command_object)?;
        encoder.encode_all(&self.arguments)?;
        Ok(encoder.into_bytes())
    }

    /// Decode a command leniently: values after the first undecodable one are
    /// dropped, and a missing transaction id or object defaults to 0 / null.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut buffer = ByteBuffer::new(data.to_vec());
        let mut decoder = Amf0Decoder::new(&mut buffer);

        let mut values = Vec::new();
        while decoder.has_remaining() {
            match decoder.decode() {
                Ok(value) => values.push(value),
                Err(e) => {
                    warn!("Dropping undecodable command tail: {}", e);
                    break;
                }
            }
        }

        let mut values = values.into_iter();
        let name = values
            .next()
            .and_then(|v| v.as_string().map(str::to_string))
            .ok_or_else(|| Error::command("Command name must be a string"))?;
        let transaction_id = values.next().and_then(|v| v.as_number()).unwrap_or(0.0);
        let command_object = values.next().unwrap_or(Amf0Value::Null);

        Ok(RtmpCommand {
            name,
            transaction_id,
            command_object,
            arguments: values.collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_command() {
        let cmd = RtmpCommand::connect("live", "rtmp://localhost/live", "FMLE/3.0");
        assert_eq!(cmd.name, "connect");
        assert_eq!(cmd.transaction_id, 1.0);
        assert_eq!(cmd.property("app").and_then(|v| v.as_string()), Some("live"));
        assert_eq!(cmd.property("type").and_then(|v| v.as_string()), Some("nonprivate"));
    }

    #[test]
    fn test_positional_access() {
        let cmd = RtmpCommand::publish(5.0, "stream1", "live");
        assert_eq!(cmd.get(2), Some(&Amf0Value::Null));
        assert_eq!(cmd.get_str(3), Some("stream1"));
        assert_eq!(cmd.get_str(4), Some("live"));
        assert!(cmd.get(5).is_none());
        assert!(cmd.get(1).is_none());
    }

    #[test]
    fn test_decode_missing_fields_defaults() {
        let mut encoder = Amf0Encoder::new();
        encoder.encode(&Amf0Value::from("ping")).unwrap();
        let cmd = RtmpCommand::decode(&encoder.into_bytes()).unwrap();

        assert_eq!(cmd.name, "ping");
        assert_eq!(cmd.transaction_id, 0.0);
        assert!(cmd.command_object.is_null());
        assert!(cmd.arguments.is_empty());
    }

    #[test]
    fn test_decode_keeps_values_before_garbage() {
        let mut bytes = RtmpCommand::create_stream(4.0).encode().unwrap();
        bytes.push(0xEE);
        let cmd = RtmpCommand::decode(&bytes).unwrap();
        assert_eq!(cmd.name, "createStream");
        assert_eq!(cmd.transaction_id, 4.0);
    }

    #[test]
    fn test_decode_rejects_nameless() {
        let mut encoder = Amf0Encoder::new();
        encoder.encode(&Amf0Value::Number(1.0)).unwrap();
        assert!(matches!(RtmpCommand::decode(&encoder.into_bytes()), Err(Error::Command(_))));
    }

    #[test]
    fn test_decode_survives_deeply_nested_argument() {
        let mut bytes = vec![0x02, 0, 1, b'x', 0x00];
        bytes.extend_from_slice(&1.0f64.to_be_bytes());
        for _ in 0..300_000 {
            bytes.extend_from_slice(&[0x0A, 0, 0, 0, 1]);
        }
        let cmd = RtmpCommand::decode(&bytes).unwrap();
        assert_eq!(cmd.name, "x");
        assert_eq!(cmd.transaction_id, 1.0);
        assert!(cmd.command_object.is_null());
    }
}
