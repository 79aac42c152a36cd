use crate::amf::amf0::{markers, Amf0Value};
use crate::{ByteBuffer, Error, Result};

pub struct Amf0Encoder {
    buffer: ByteBuffer,
}

impl Amf0Encoder {
    pub fn new() -> Self {
        Amf0Encoder {
            buffer: ByteBuffer::with_capacity(256),
        }
    }

    pub fn encode(&mut self, value: &Amf0Value) -> Result<()> {
        match value {
            Amf0Value::Number(n) => {
                self.buffer.write_u8(markers::NUMBER);
                self.buffer.write_f64_be(*n);
            }
            Amf0Value::Boolean(b) => {
                self.buffer.write_u8(markers::BOOLEAN);
                self.buffer.write_u8(u8::from(*b));
            }
            Amf0Value::String(s) => {
                // Long strings are promoted automatically
                if s.len() > u16::MAX as usize {
                    self.encode_long_string(s)?;
                } else {
                    self.buffer.write_u8(markers::STRING);
                    self.write_short_string(s)?;
                }
            }
            Amf0Value::Object(obj) => {
                self.buffer.write_u8(markers::OBJECT);
                self.write_properties(obj)?;
            }
            Amf0Value::Null => self.buffer.write_u8(markers::NULL),
            Amf0Value::Undefined => self.buffer.write_u8(markers::UNDEFINED),
            Amf0Value::EcmaArray(obj) => {
                self.buffer.write_u8(markers::ECMA_ARRAY);
                self.buffer.write_u32_be(obj.len() as u32);
                self.write_properties(obj)?;
            }
            Amf0Value::Array(arr) => {
                self.buffer.write_u8(markers::STRICT_ARRAY);
                self.buffer.write_u32_be(arr.len() as u32);
                for item in arr {
                    self.encode(item)?;
                }
            }
            Amf0Value::Date(timestamp, timezone) => {
                self.buffer.write_u8(markers::DATE);
                self.buffer.write_f64_be(*timestamp);
                self.buffer.write_i16_be(*timezone);
            }
            Amf0Value::LongString(s) => self.encode_long_string(s)?,
            Amf0Value::Unsupported => self.buffer.write_u8(markers::UNSUPPORTED),
            Amf0Value::XmlDocument(xml) => {
                self.buffer.write_u8(markers::XML_DOCUMENT);
                self.buffer.write_u32_be(xml.len() as u32);
                self.buffer.write_bytes(xml.as_bytes());
            }
            Amf0Value::TypedObject(class_name, obj) => {
                self.buffer.write_u8(markers::TYPED_OBJECT);
                self.write_short_string(class_name)?;
                self.write_properties(obj)?;
            }
            Amf0Value::AvmPlus => {
                return Err(Error::amf_encode("AMF3 values cannot be encoded as AMF0"));
            }
        }
        Ok(())
    }

    /// Encode a sequence of values back to back
    pub fn encode_all<'a>(&mut self, values: impl IntoIterator<Item = &'a Amf0Value>) -> Result<()> {
        for value in values {
            self.encode(value)?;
        }
        Ok(())
    }

    fn encode_long_string(&mut self, value: &str) -> Result<()> {
        self.buffer.write_u8(markers::LONG_STRING);
        self.buffer.write_u32_be(value.len() as u32);
        self.buffer.write_bytes(value.as_bytes());
        Ok(())
    }

    fn write_properties(&mut self, obj: &[(String, Amf0Value)]) -> Result<()> {
        for (key, value) in obj {
            self.write_short_string(key)?;
            self.encode(value)?;
        }
        self.buffer.write_u16_be(0);
        self.buffer.write_u8(markers::OBJECT_END);
        Ok(())
    }

    /// String without type marker (object keys, class names)
    fn write_short_string(&mut self, value: &str) -> Result<()> {
        let len = u16::try_from(value.len())
            .map_err(|_| Error::amf_encode(format!("String too long for AMF0: {} bytes", value.len())))?;
        self.buffer.write_u16_be(len);
        self.buffer.write_bytes(value.as_bytes());
        Ok(())
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer.into_vec()
    }
}

impl Default for Amf0Encoder {
    fn default() -> Self {
        Self::new()
    }
}
