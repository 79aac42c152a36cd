use crate::amf::{decode_values, Amf0Encoder, Amf0Value};
use crate::{Error, Result};

/// AMF0 data message (type 18), e.g. `onMetaData` or `@setDataFrame`
#[derive(Debug, Clone, PartialEq)]
pub struct RtmpData {
    pub data_type: String,
    pub values: Vec<Amf0Value>,
}

impl RtmpData {
    pub fn new(data_type: impl Into<String>) -> Self {
        RtmpData {
            data_type: data_type.into(),
            values: Vec::new(),
        }
    }

    /// `onMetaData` carrying an ECMA array
    pub fn on_metadata(metadata: Vec<(String, Amf0Value)>) -> Self {
        let mut data = RtmpData::new("onMetaData");
        data.values.push(Amf0Value::EcmaArray(metadata));
        data
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut encoder = Amf0Encoder::new();
        encoder.encode(&Amf0Value::String(self.data_type.clone()))?;
        encoder.encode_all(&self.values)?;
        Ok(encoder.into_bytes())
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut values = decode_values(data)?.into_iter();
        let data_type = values
            .next()
            .and_then(|v| v.as_string().map(str::to_string))
            .ok_or_else(|| Error::amf_decode("Data type must be string"))?;

        Ok(RtmpData {
            data_type,
            values: values.collect(),
        })
    }

    /// The metadata object of `onMetaData` or `@setDataFrame onMetaData`
    pub fn metadata(&self) -> Option<&[(String, Amf0Value)]> {
        match self.data_type.as_str() {
            "onMetaData" => self.values.first().and_then(|v| v.as_object()),
            "@setDataFrame" => self.values.get(1).and_then(|v| v.as_object()),
            _ => None,
        }
    }
}
