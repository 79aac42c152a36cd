use crate::protocol::{MSG_TYPE_AUDIO, MSG_TYPE_DATA_AMF0, MSG_TYPE_VIDEO};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Video,
    Audio,
    Meta,
}

impl TrackKind {
    pub fn from_message_type(message_type: u8) -> Option<Self> {
        match message_type {
            MSG_TYPE_VIDEO => Some(TrackKind::Video),
            MSG_TYPE_AUDIO => Some(TrackKind::Audio),
            MSG_TYPE_DATA_AMF0 => Some(TrackKind::Meta),
            _ => None,
        }
    }

    /// Position of the kind within a channel's block of three track ids
    pub fn ordinal(&self) -> u32 {
        match self {
            TrackKind::Video => 1,
            TrackKind::Audio => 2,
            TrackKind::Meta => 3,
        }
    }
}

/// Track id for media arriving on a chunk channel
pub fn track_id(chunk_stream_id: u32, kind: TrackKind) -> u32 {
    chunk_stream_id * 3 + kind.ordinal()
}

/// Description of one elementary stream as the host sees it
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: u32,
    pub kind: TrackKind,

    /// Codec name, e.g. "H264", "AAC", "PCM"
    pub codec: String,

    /// Audio sample rate in Hz
    pub rate: u32,

    /// Audio sample size in bits
    pub size: u32,

    pub channels: u32,

    pub width: u32,
    pub height: u32,

    /// Frames per kilosecond
    pub fpks: u32,

    /// Codec initialisation data (AVC decoder configuration, AAC config)
    pub init: Vec<u8>,
}

impl Track {
    pub fn new(id: u32, kind: TrackKind, codec: impl Into<String>) -> Self {
        Track {
            id,
            kind,
            codec: codec.into(),
            rate: 0,
            size: 0,
            channels: 0,
            width: 0,
            height: 0,
            fpks: 0,
            init: Vec::new(),
        }
    }

    /// Builder for audio tracks
    pub fn audio(id: u32, codec: impl Into<String>, rate: u32, size: u32, channels: u32) -> Self {
        Track {
            rate,
            size,
            channels,
            ..Track::new(id, TrackKind::Audio, codec)
        }
    }

    /// Builder for video tracks
    pub fn video(id: u32, codec: impl Into<String>, width: u32, height: u32) -> Self {
        Track {
            width,
            height,
            ..Track::new(id, TrackKind::Video, codec)
        }
    }

    pub fn with_init(mut self, init: Vec<u8>) -> Self {
        self.init = init;
        self
    }

    pub fn is_video(&self) -> bool {
        self.kind == TrackKind::Video
    }

    pub fn is_audio(&self) -> bool {
        self.kind == TrackKind::Audio
    }

    /// Overwrite fields that `other` actually knows about
    pub fn merge(&mut self, other: &Track) {
        if !other.codec.is_empty() {
            self.codec = other.codec.clone();
        }
        let fields = [
            (&mut self.rate, other.rate),
            (&mut self.size, other.size),
            (&mut self.channels, other.channels),
            (&mut self.width, other.width),
            (&mut self.height, other.height),
            (&mut self.fpks, other.fpks),
        ];
        for (field, value) in fields {
            if value != 0 {
                *field = value;
            }
        }
        if !other.init.is_empty() {
            self.init = other.init.clone();
        }
    }
}

/// A timestamped media frame exchanged with the host
#[derive(Debug, Clone, PartialEq)]
pub struct MediaPacket {
    pub track_id: u32,

    /// Presentation-independent time in milliseconds
    pub time: u64,

    /// Composition time offset in milliseconds
    pub offset: i64,

    pub keyframe: bool,
    pub disposable: bool,

    /// Raw frame data without the RTMP sub-header
    pub data: Vec<u8>,

    /// Boot clock offset, set on keyframes only
    pub boot_ms_offset: i64,
}

impl MediaPacket {
    pub fn new(track_id: u32, time: u64, data: Vec<u8>) -> Self {
        MediaPacket {
            track_id,
            time,
            offset: 0,
            keyframe: false,
            disposable: false,
            data,
            boot_ms_offset: 0,
        }
    }

    pub fn keyframe(mut self) -> Self {
        self.keyframe = true;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_ids_per_channel() {
        assert_eq!(track_id(4, TrackKind::Video), 13);
        assert_eq!(track_id(4, TrackKind::Audio), 14);
        assert_eq!(track_id(4, TrackKind::Meta), 15);
        assert_eq!(track_id(6, TrackKind::Video), 19);
    }

    #[test]
    fn test_merge_keeps_known_fields() {
        let mut track = Track::audio(14, "AAC", 44100, 16, 2).with_init(vec![0x12, 0x10]);
        track.merge(&Track::new(14, TrackKind::Audio, ""));
        assert_eq!(track.codec, "AAC");
        assert_eq!(track.rate, 44100);
        assert_eq!(track.init, vec![0x12, 0x10]);

        track.merge(&Track::audio(14, "", 48000, 0, 0));
        assert_eq!(track.rate, 48000);
        assert_eq!(track.channels, 2);
    }
}
