/// Ordered key/value pairs. Property order is preserved on the wire, which
/// keeps scripted replies byte-for-byte stable.
pub type Amf0Properties = Vec<(String, Amf0Value)>;

/// AMF0 data types
#[derive(Debug, Clone, PartialEq)]
pub enum Amf0Value {
    Number(f64),                                  // 0x00
    Boolean(bool),                                // 0x01
    String(String),                               // 0x02
    Object(Amf0Properties),                       // 0x03
    Null,                                         // 0x05
    Undefined,                                    // 0x06
    EcmaArray(Amf0Properties),                    // 0x08 (metadata)
    Array(Vec<Amf0Value>),                        // 0x0A (strict array)
    Date(f64, i16),                               // 0x0B
    LongString(String),                           // 0x0C
    Unsupported,                                  // 0x0D
    XmlDocument(String),                          // 0x0F
    TypedObject(String, Amf0Properties),          // 0x10
    /// Switch to AMF3 (0x11); the remainder is not decoded
    AvmPlus,
}

pub mod markers {
    pub const NUMBER: u8 = 0x00;
    pub const BOOLEAN: u8 = 0x01;
    pub const STRING: u8 = 0x02;
    pub const OBJECT: u8 = 0x03;
    pub const NULL: u8 = 0x05;
    pub const UNDEFINED: u8 = 0x06;
    pub const REFERENCE: u8 = 0x07;
    pub const ECMA_ARRAY: u8 = 0x08;
    pub const OBJECT_END: u8 = 0x09;
    pub const STRICT_ARRAY: u8 = 0x0A;
    pub const DATE: u8 = 0x0B;
    pub const LONG_STRING: u8 = 0x0C;
    pub const UNSUPPORTED: u8 = 0x0D;
    pub const XML_DOCUMENT: u8 = 0x0F;
    pub const TYPED_OBJECT: u8 = 0x10;
    pub const AVMPLUS_OBJECT: u8 = 0x11;
}

impl Amf0Value {
    /// Build an object from `(key, value)` pairs, keeping their order
    pub fn object<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Amf0Value)>,
    {
        Amf0Value::Object(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Amf0Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Amf0Value::String(s) | Amf0Value::LongString(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Amf0Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Object-like values (object, ECMA array, typed object)
    pub fn as_object(&self) -> Option<&[(String, Amf0Value)]> {
        match self {
            Amf0Value::Object(obj) | Amf0Value::EcmaArray(obj) => Some(obj),
            Amf0Value::TypedObject(_, obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Amf0Value]> {
        match self {
            Amf0Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Look up a property of an object-like value by name
    pub fn get_property(&self, key: &str) -> Option<&Amf0Value> {
        self.as_object()
            .and_then(|obj| obj.iter().find(|(k, _)| k == key).map(|(_, v)| v))
    }

    /// Check if null or undefined
    pub fn is_null(&self) -> bool {
        matches!(self, Amf0Value::Null | Amf0Value::Undefined)
    }

    /// Loose truthiness: non-zero numbers, true, non-empty strings
    pub fn is_truthy(&self) -> bool {
        match self {
            Amf0Value::Boolean(b) => *b,
            Amf0Value::Number(n) => *n != 0.0,
            Amf0Value::String(s) | Amf0Value::LongString(s) => !s.is_empty(),
            Amf0Value::Null | Amf0Value::Undefined => false,
            _ => true,
        }
    }
}

impl From<f64> for Amf0Value {
    fn from(value: f64) -> Self {
        Amf0Value::Number(value)
    }
}

impl From<bool> for Amf0Value {
    fn from(value: bool) -> Self {
        Amf0Value::Boolean(value)
    }
}

impl From<&str> for Amf0Value {
    fn from(value: &str) -> Self {
        Amf0Value::String(value.to_string())
    }
}

impl From<String> for Amf0Value {
    fn from(value: String) -> Self {
        Amf0Value::String(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_keeps_order() {
        let obj = Amf0Value::object([
            ("level", "status".into()),
            ("code", "NetStream.Publish.Start".into()),
            ("clientid", 1337.0.into()),
        ]);
        let keys: Vec<&str> = obj.as_object().unwrap().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["level", "code", "clientid"]);
        assert_eq!(obj.get_property("clientid").and_then(|v| v.as_number()), Some(1337.0));
        assert!(obj.get_property("missing").is_none());
    }

    #[test]
    fn test_truthiness() {
        assert!(Amf0Value::Boolean(true).is_truthy());
        assert!(!Amf0Value::Boolean(false).is_truthy());
        assert!(Amf0Value::Number(1.0).is_truthy());
        assert!(!Amf0Value::Number(0.0).is_truthy());
        assert!(!Amf0Value::Null.is_truthy());
    }
}
