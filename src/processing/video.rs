use crate::stream::{MediaPacket, Track};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    /// Sorenson H.263
    H263,
    ScreenVideo,
    /// On2 VP6
    Vp6,
    /// On2 VP6 with alpha
    Vp6Alpha,
    ScreenVideo2,
    /// H.264 AVC
    H264,
    Unknown(u8),
}

impl VideoCodec {
    /// Parse from the codec id nibble
    pub fn from_codec_id(id: u8) -> Self {
        match id {
            2 => VideoCodec::H263,
            3 => VideoCodec::ScreenVideo,
            4 => VideoCodec::Vp6,
            5 => VideoCodec::Vp6Alpha,
            6 => VideoCodec::ScreenVideo2,
            7 => VideoCodec::H264,
            _ => VideoCodec::Unknown(id),
        }
    }

    /// Codec name used for tracks
    pub fn name(&self) -> &'static str {
        match self {
            VideoCodec::H263 => "H263",
            VideoCodec::ScreenVideo => "ScreenVideo1",
            VideoCodec::Vp6 => "VP6",
            VideoCodec::Vp6Alpha => "VP6Alpha",
            VideoCodec::ScreenVideo2 => "ScreenVideo2",
            VideoCodec::H264 => "H264",
            VideoCodec::Unknown(_) => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    /// Keyframe (I-frame)
    Keyframe,
    /// Inter-frame (P-frame)
    InterFrame,
    DisposableInterFrame,
    GeneratedKeyframe,
    /// Video info/command frame
    VideoInfo,
}

impl FrameType {
    pub fn from_bits(bits: u8) -> Self {
        match bits {
            1 => FrameType::Keyframe,
            3 => FrameType::DisposableInterFrame,
            4 => FrameType::GeneratedKeyframe,
            5 => FrameType::VideoInfo,
            _ => FrameType::InterFrame,
        }
    }

    pub fn is_keyframe(&self) -> bool {
        matches!(self, FrameType::Keyframe | FrameType::GeneratedKeyframe)
    }
}

/// Decoded video tag header of an inbound video message
#[derive(Debug, Clone, PartialEq)]
pub struct VideoTagHeader {
    pub codec: VideoCodec,
    pub frame_type: FrameType,

    /// AVC sequence header (decoder configuration follows)
    pub is_sequence_header: bool,

    /// AVC composition time offset in milliseconds
    pub composition_offset: i32,

    /// Bytes of sub-header before the raw frame
    pub header_len: usize,
}

impl VideoTagHeader {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let Some(&tag_header) = payload.first() else {
            return Err(Error::protocol_corruption("Empty video packet"));
        };

        let codec = VideoCodec::from_codec_id(tag_header & 0x0F);
        let mut header = VideoTagHeader {
            codec,
            frame_type: FrameType::from_bits(tag_header >> 4),
            is_sequence_header: false,
            composition_offset: 0,
            header_len: 1,
        };

        if codec == VideoCodec::H264 {
            if payload.len() < 5 {
                return Err(Error::protocol_corruption("Truncated AVC video header"));
            }
            header.header_len = 5;
            header.is_sequence_header = payload[1] == 0;
            // 24-bit signed, sign extended through the top byte
            let raw = i32::from_be_bytes([0, payload[2], payload[3], payload[4]]);
            header.composition_offset = (raw << 8) >> 8;
        }

        Ok(header)
    }

    pub fn is_keyframe(&self) -> bool {
        self.frame_type.is_keyframe()
    }

    /// Track description for this tag. Sequence headers carry the init data.
    pub fn to_track(&self, id: u32, payload: &[u8]) -> Track {
        let track = Track::video(id, self.codec.name(), 0, 0);
        if self.is_sequence_header {
            track.with_init(payload.get(self.header_len..).unwrap_or_default().to_vec())
        } else {
            track
        }
    }
}

/// AVCDecoderConfigurationRecord, parsed only as far as logging needs
#[derive(Debug, Clone, PartialEq)]
pub struct AvcConfig {
    pub version: u8,
    pub profile: u8,
    pub profile_compat: u8,
    pub level: u8,
    pub sps: Vec<Vec<u8>>,
    pub pps: Vec<Vec<u8>>,
}

impl AvcConfig {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 7 {
            return Err(Error::protocol_corruption("AVC config too short"));
        }

        let mut config = AvcConfig {
            version: data[0],
            profile: data[1],
            profile_compat: data[2],
            level: data[3],
            sps: Vec::new(),
            pps: Vec::new(),
        };

        let mut offset = 6;
        let sps_count = data[5] & 0x1F;
        config.sps = read_parameter_sets(data, &mut offset, sps_count);
        if let Some(&pps_count) = data.get(offset) {
            offset += 1;
            config.pps = read_parameter_sets(data, &mut offset, pps_count);
        }
        Ok(config)
    }
}

fn read_parameter_sets(data: &[u8], offset: &mut usize, count: u8) -> Vec<Vec<u8>> {
    let mut sets = Vec::new();
    for _ in 0..count {
        let Some(len) = data.get(*offset..*offset + 2) else {
            break;
        };
        let len = u16::from_be_bytes([len[0], len[1]]) as usize;
        *offset += 2;
        let Some(set) = data.get(*offset..*offset + len) else {
            break;
        };
        sets.push(set.to_vec());
        *offset += len;
    }
    sets
}

/// Video sub-header placed before a raw frame of `track`
pub fn video_sub_header(track: &Track, packet: &MediaPacket) -> Vec<u8> {
    let mut header = if track.codec == "H264" {
        let mut header = vec![7, 1, 0, 0, 0];
        if packet.offset > 0 {
            let offset = packet.offset as u32;
            header[2..5].copy_from_slice(&offset.to_be_bytes()[1..]);
        }
        header
    } else if track.codec == "H263" {
        vec![2]
    } else {
        vec![0]
    };

    header[0] |= if packet.keyframe { 0x10 } else { 0x20 };
    if packet.disposable {
        header[0] |= 0x30;
    }
    header
}

/// Tag carrying the AVC decoder configuration, if the track has one
pub fn video_init_tag(track: &Track) -> Option<Vec<u8>> {
    if track.codec != "H264" || track.init.is_empty() {
        return None;
    }
    let mut tag = vec![0x17, 0, 0, 0, 0];
    tag.extend_from_slice(&track.init);
    Some(tag)
}
