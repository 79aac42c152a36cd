use crate::amf::amf0::{markers, Amf0Properties, Amf0Value};
use crate::{ByteBuffer, Error, Result};

/// Deepest nesting of objects and arrays a payload may use
pub const MAX_NESTING_DEPTH: usize = 64;

pub struct Amf0Decoder<'a> {
    buffer: &'a mut ByteBuffer,
    depth: usize,
}

impl<'a> Amf0Decoder<'a> {
    pub fn new(buffer: &'a mut ByteBuffer) -> Self {
        Amf0Decoder { buffer, depth: 0 }
    }

    /// Check if decoder has remaining data to decode
    pub fn has_remaining(&self) -> bool {
        self.buffer.remaining() > 0
    }

    pub fn decode(&mut self) -> Result<Amf0Value> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(Error::amf_decode("nesting too deep"));
        }
        self.depth += 1;
        let value = self.decode_value();
        self.depth -= 1;
        value
    }

    fn decode_value(&mut self) -> Result<Amf0Value> {
        let marker = self.buffer.read_u8()?;
        match marker {
            markers::NUMBER => Ok(Amf0Value::Number(self.buffer.read_f64_be()?)),
            markers::BOOLEAN => Ok(Amf0Value::Boolean(self.buffer.read_u8()? != 0)),
            markers::STRING => Ok(Amf0Value::String(self.read_short_string()?)),
            markers::OBJECT => Ok(Amf0Value::Object(self.read_properties()?)),
            markers::NULL => Ok(Amf0Value::Null),
            markers::UNDEFINED => Ok(Amf0Value::Undefined),
            markers::ECMA_ARRAY => {
                let _count = self.buffer.read_u32_be()?;
                Ok(Amf0Value::EcmaArray(self.read_properties()?))
            }
            markers::STRICT_ARRAY => {
                let count = self.buffer.read_u32_be()? as usize;
                let mut array = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    array.push(self.decode()?);
                }
                Ok(Amf0Value::Array(array))
            }
            markers::DATE => {
                let timestamp = self.buffer.read_f64_be()?;
                let timezone = self.buffer.read_i16_be()?;
                Ok(Amf0Value::Date(timestamp, timezone))
            }
            markers::LONG_STRING => Ok(Amf0Value::LongString(self.read_long_string()?)),
            markers::UNSUPPORTED => Ok(Amf0Value::Unsupported),
            markers::XML_DOCUMENT => Ok(Amf0Value::XmlDocument(self.read_long_string()?)),
            markers::TYPED_OBJECT => {
                let class_name = self.read_short_string()?;
                Ok(Amf0Value::TypedObject(class_name, self.read_properties()?))
            }
            markers::AVMPLUS_OBJECT => {
                // Rest of the payload is AMF3; skip it
                let rest = self.buffer.remaining();
                self.buffer.read_bytes(rest)?;
                Ok(Amf0Value::AvmPlus)
            }
            _ => Err(Error::amf_decode(format!("Unknown AMF0 marker: 0x{:02x}", marker))),
        }
    }

    /// Decode values until the buffer is exhausted
    pub fn decode_all(&mut self) -> Result<Vec<Amf0Value>> {
        let mut values = Vec::new();
        while self.has_remaining() {
            values.push(self.decode()?);
        }
        Ok(values)
    }

    fn read_properties(&mut self) -> Result<Amf0Properties> {
        let mut properties = Vec::new();
        loop {
            let name = self.read_short_string()?;
            if name.is_empty() && self.buffer.peek_u8() == Some(markers::OBJECT_END) {
                self.buffer.read_u8()?;
                break;
            }
            let value = self.decode()?;
            properties.push((name, value));
        }
        Ok(properties)
    }

    fn read_short_string(&mut self) -> Result<String> {
        let len = self.buffer.read_u16_be()? as usize;
        let bytes = self.buffer.read_bytes(len)?;
        String::from_utf8(bytes)
            .map_err(|e| Error::amf_decode(format!("Invalid UTF-8 in string: {}", e)))
    }

    fn read_long_string(&mut self) -> Result<String> {
        let len = self.buffer.read_u32_be()? as usize;
        let bytes = self.buffer.read_bytes(len)?;
        String::from_utf8(bytes)
            .map_err(|e| Error::amf_decode(format!("Invalid UTF-8 in long string: {}", e)))
    }
}

/// Decode every value in `data`
pub fn decode_values(data: &[u8]) -> Result<Vec<Amf0Value>> {
    let mut buffer = ByteBuffer::new(data.to_vec());
    Amf0Decoder::new(&mut buffer).decode_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amf::Amf0Encoder;

    #[test]
    fn test_decode_ordered_object() {
        let value = Amf0Value::object([
            ("app", Amf0Value::from("live")),
            ("tcUrl", Amf0Value::from("rtmp://host/live")),
            ("objectEncoding", Amf0Value::Number(0.0)),
        ]);
        let mut encoder = Amf0Encoder::new();
        encoder.encode(&value).unwrap();

        let decoded = decode_values(&encoder.into_bytes()).unwrap();
        assert_eq!(decoded, vec![value]);
    }

    #[test]
    fn test_decode_ecma_array_metadata() {
        let bytes = [
            markers::ECMA_ARRAY, 0, 0, 0, 1,
            0, 5, b'w', b'i', b'd', b't', b'h',
            markers::NUMBER, 0x40, 0x94, 0, 0, 0, 0, 0, 0,
            0, 0, markers::OBJECT_END,
        ];
        let decoded = decode_values(&bytes).unwrap();
        assert_eq!(decoded[0].get_property("width").and_then(|v| v.as_number()), Some(1280.0));
    }

    #[test]
    fn test_decode_truncated_fails() {
        let bytes = [markers::STRING, 0, 10, b'a'];
        assert!(decode_values(&bytes).is_err());
    }

    #[test]
    fn test_decode_avmplus_swallows_rest() {
        let bytes = [markers::NULL, markers::AVMPLUS_OBJECT, 0x0A, 0x0B, 0x01];
        let decoded = decode_values(&bytes).unwrap();
        assert_eq!(decoded, vec![Amf0Value::Null, Amf0Value::AvmPlus]);
    }

    fn nested_arrays(depth: usize) -> Vec<u8> {
        let mut bytes = Vec::new();
        for _ in 0..depth {
            bytes.extend_from_slice(&[markers::STRICT_ARRAY, 0, 0, 0, 1]);
        }
        bytes.push(markers::NULL);
        bytes
    }

    #[test]
    fn test_decode_rejects_deep_nesting() {
        let mut bytes = vec![markers::STRING, 0, 1, b'x', markers::NUMBER];
        bytes.extend_from_slice(&1.0f64.to_be_bytes());
        bytes.extend(nested_arrays(300_000));
        assert!(matches!(decode_values(&bytes), Err(Error::AmfDecode(_))));

        let mut objects = Vec::new();
        for _ in 0..MAX_NESTING_DEPTH + 1 {
            objects.extend_from_slice(&[markers::OBJECT, 0, 1, b'a']);
        }
        assert!(decode_values(&objects).is_err());
    }

    #[test]
    fn test_decode_allows_moderate_nesting() {
        let decoded = decode_values(&nested_arrays(MAX_NESTING_DEPTH - 1)).unwrap();
        let mut value = &decoded[0];
        let mut levels = 0;
        while let Amf0Value::Array(items) = value {
            value = &items[0];
            levels += 1;
        }
        assert_eq!(levels, MAX_NESTING_DEPTH - 1);
        assert_eq!(value, &Amf0Value::Null);
    }
}
