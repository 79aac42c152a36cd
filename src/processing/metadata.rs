use crate::amf::{Amf0Properties, Amf0Value};
use crate::protocol::RtmpData;
use crate::stream::{Track, TrackKind};
use std::collections::BTreeMap;

/// Stream properties announced by a publisher in `onMetaData`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamMetadata {
    // Video properties
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub framerate: Option<f64>,

    // Audio properties
    pub audio_sample_rate: Option<f64>,
    pub audio_sample_size: Option<f64>,
    pub audio_channels: Option<f64>,
    pub stereo: Option<bool>,

    pub encoder: Option<String>,
}

impl StreamMetadata {
    pub fn from_properties(props: &[(String, Amf0Value)]) -> Self {
        let number = |key: &str| lookup(props, key).and_then(|v| v.as_number());
        StreamMetadata {
            width: number("width"),
            height: number("height"),
            framerate: number("framerate").or_else(|| number("videoframerate")),
            audio_sample_rate: number("audiosamplerate"),
            audio_sample_size: number("audiosamplesize"),
            audio_channels: number("audiochannels"),
            stereo: lookup(props, "stereo").and_then(|v| v.as_boolean()),
            encoder: lookup(props, "encoder")
                .and_then(|v| v.as_string())
                .map(String::from),
        }
    }

    /// Fill in what the tag headers cannot express: picture size and frame
    /// rate for video, exact sample parameters for audio. AAC tracks keep the
    /// values from their decoder configuration.
    pub fn apply_to(&self, track: &mut Track) {
        match track.kind {
            TrackKind::Video => {
                if let Some(width) = self.width {
                    track.width = width as u32;
                }
                if let Some(height) = self.height {
                    track.height = height as u32;
                }
                if let Some(fps) = self.framerate {
                    track.fpks = (fps * 1000.0) as u32;
                }
            }
            TrackKind::Audio if track.codec != "AAC" => {
                if let Some(rate) = self.audio_sample_rate.filter(|r| *r > 0.0) {
                    track.rate = rate as u32;
                }
                if let Some(size) = self.audio_sample_size.filter(|s| *s > 0.0) {
                    track.size = size as u32;
                }
                if let Some(channels) = self.audio_channels.filter(|c| *c > 0.0) {
                    track.channels = channels as u32;
                } else if let Some(stereo) = self.stereo {
                    track.channels = if stereo { 2 } else { 1 };
                }
            }
            _ => {}
        }
    }
}

fn lookup<'a>(props: &'a [(String, Amf0Value)], key: &str) -> Option<&'a Amf0Value> {
    props.iter().find(|(k, _)| k == key).map(|(_, v)| v)
}

/// Metadata objects received per chunk channel. Media on a channel that
/// never carried metadata borrows the first channel's object.
#[derive(Debug, Default)]
pub struct MetadataArena {
    channels: BTreeMap<u32, Amf0Properties>,
}

impl MetadataArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage used for a message on `chunk_stream_id`
    pub fn storage(&mut self, chunk_stream_id: u32, is_metadata: bool) -> &mut Amf0Properties {
        let own = is_metadata
            || self.channels.is_empty()
            || self.channels.contains_key(&chunk_stream_id);
        let key = if own {
            chunk_stream_id
        } else {
            self.channels.keys().next().copied().unwrap_or(chunk_stream_id)
        };
        self.channels.entry(key).or_default()
    }

    /// Merge the properties of a data message into its channel's storage.
    /// Returns false for data messages that carry no metadata.
    pub fn absorb(&mut self, chunk_stream_id: u32, data: &RtmpData) -> bool {
        let Some(props) = data.metadata() else {
            return false;
        };
        let storage = self.storage(chunk_stream_id, true);
        for (key, value) in props {
            match storage.iter_mut().find(|(k, _)| k == key) {
                Some(existing) => existing.1 = value.clone(),
                None => storage.push((key.clone(), value.clone())),
            }
        }
        true
    }

    pub fn metadata(&mut self, chunk_stream_id: u32) -> StreamMetadata {
        StreamMetadata::from_properties(self.storage(chunk_stream_id, false))
    }
}

/// FLV codec id announced for a video codec name
pub fn video_codec_id(codec: &str) -> Option<f64> {
    match codec {
        "H263" => Some(2.0),
        "ScreenVideo1" => Some(3.0),
        "VP6" => Some(4.0),
        "VP6Alpha" => Some(5.0),
        "ScreenVideo2" => Some(6.0),
        "H264" => Some(7.0),
        _ => None,
    }
}

/// FLV sound format announced for an audio codec name
pub fn audio_codec_id(codec: &str) -> Option<f64> {
    match codec {
        "PCM" => Some(3.0),
        "ADPCM" => Some(1.0),
        "MP3" => Some(2.0),
        "Nellymoser" => Some(6.0),
        "ALAW" => Some(7.0),
        "ULAW" => Some(8.0),
        "AAC" => Some(10.0),
        "Speex" => Some(11.0),
        _ => None,
    }
}

/// `onMetaData` describing the tracks a player is about to receive
pub fn metadata_for_tracks(tracks: &[Track]) -> RtmpData {
    let mut props: Amf0Properties = Vec::new();
    let mut put = |key: &str, value: Amf0Value| props.push((key.to_string(), value));

    if let Some(video) = tracks.iter().find(|t| t.is_video()) {
        put("hasVideo", Amf0Value::Boolean(true));
        if let Some(id) = video_codec_id(&video.codec) {
            put("videocodecid", Amf0Value::Number(id));
        }
        if video.width > 0 {
            put("width", Amf0Value::Number(video.width as f64));
        }
        if video.height > 0 {
            put("height", Amf0Value::Number(video.height as f64));
        }
        if video.fpks > 0 {
            put("framerate", Amf0Value::Number(video.fpks as f64 / 1000.0));
        }
    }

    if let Some(audio) = tracks.iter().find(|t| t.is_audio()) {
        put("hasAudio", Amf0Value::Boolean(true));
        if let Some(id) = audio_codec_id(&audio.codec) {
            put("audiocodecid", Amf0Value::Number(id));
        }
        if audio.rate > 0 {
            put("audiosamplerate", Amf0Value::Number(audio.rate as f64));
        }
        if audio.size > 0 {
            put("audiosamplesize", Amf0Value::Number(audio.size as f64));
        }
        if audio.channels > 0 {
            put("audiochannels", Amf0Value::Number(audio.channels as f64));
            put("stereo", Amf0Value::Boolean(audio.channels > 1));
        }
    }

    RtmpData::on_metadata(props)
}
