use crate::stream::Track;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCodec {
    /// Linear PCM, platform endian
    Pcm,
    Adpcm,
    Mp3,
    /// Linear PCM, little endian
    PcmLittleEndian,
    Nellymoser16kHz,
    Nellymoser8kHz,
    Nellymoser,
    G711ALaw,
    G711MuLaw,
    Aac,
    Speex,
    Mp38kHz,
    DeviceSpecific,
    Reserved,
}

impl AudioCodec {
    /// Parse from the sound format nibble
    pub fn from_sound_format(format: u8) -> Self {
        match format {
            0 => AudioCodec::Pcm,
            1 => AudioCodec::Adpcm,
            2 => AudioCodec::Mp3,
            3 => AudioCodec::PcmLittleEndian,
            4 => AudioCodec::Nellymoser16kHz,
            5 => AudioCodec::Nellymoser8kHz,
            6 => AudioCodec::Nellymoser,
            7 => AudioCodec::G711ALaw,
            8 => AudioCodec::G711MuLaw,
            10 => AudioCodec::Aac,
            11 => AudioCodec::Speex,
            14 => AudioCodec::Mp38kHz,
            15 => AudioCodec::DeviceSpecific,
            _ => AudioCodec::Reserved,
        }
    }

    /// Codec name used for tracks
    pub fn name(&self) -> &'static str {
        match self {
            AudioCodec::Pcm | AudioCodec::PcmLittleEndian => "PCM",
            AudioCodec::Adpcm => "ADPCM",
            AudioCodec::Mp3 | AudioCodec::Mp38kHz => "MP3",
            AudioCodec::Nellymoser16kHz | AudioCodec::Nellymoser8kHz | AudioCodec::Nellymoser => {
                "Nellymoser"
            }
            AudioCodec::G711ALaw => "ALAW",
            AudioCodec::G711MuLaw => "ULAW",
            AudioCodec::Aac => "AAC",
            AudioCodec::Speex => "Speex",
            AudioCodec::DeviceSpecific => "Device",
            AudioCodec::Reserved => "",
        }
    }

    /// Sample rate implied by the codec itself, ignoring the rate bits
    fn fixed_rate(&self) -> Option<u32> {
        match self {
            AudioCodec::Nellymoser16kHz | AudioCodec::Speex => Some(16000),
            AudioCodec::Nellymoser8kHz | AudioCodec::Mp38kHz => Some(8000),
            _ => None,
        }
    }
}

/// Sample rate for the two rate bits of an audio tag
pub fn rate_from_bits(bits: u8) -> u32 {
    match bits & 0x03 {
        0 => 5512,
        1 => 11025,
        2 => 22050,
        _ => 44100,
    }
}

/// AudioSpecificConfig fields (ISO 14496-3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AacConfig {
    pub object_type: u8,
    pub sampling_index: u8,
    pub channel_config: u8,
}

const AAC_SAMPLE_RATES: [u32; 13] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350,
];

impl AacConfig {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 2 {
            return Err(Error::protocol_corruption("AAC config too short"));
        }
        Ok(AacConfig {
            object_type: data[0] >> 3,
            sampling_index: ((data[0] & 0x07) << 1) | (data[1] >> 7),
            channel_config: (data[1] >> 3) & 0x0F,
        })
    }

    pub fn sample_rate(&self) -> Option<u32> {
        AAC_SAMPLE_RATES.get(self.sampling_index as usize).copied()
    }
}

/// Decoded audio tag header of an inbound audio message
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTagHeader {
    pub codec: AudioCodec,
    pub rate: u32,
    pub size: u32,
    pub channels: u32,

    /// AAC sequence header (AudioSpecificConfig follows)
    pub is_sequence_header: bool,

    /// Bytes of sub-header before the raw frame
    pub header_len: usize,
}

impl AudioTagHeader {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let Some(&tag_header) = payload.first() else {
            return Err(Error::protocol_corruption("Empty audio packet"));
        };

        let codec = AudioCodec::from_sound_format(tag_header >> 4);
        let mut header = AudioTagHeader {
            codec,
            rate: codec.fixed_rate().unwrap_or_else(|| rate_from_bits(tag_header >> 2)),
            size: if tag_header & 0x02 != 0 { 16 } else { 8 },
            channels: if tag_header & 0x01 != 0 { 2 } else { 1 },
            is_sequence_header: false,
            header_len: 1,
        };

        if codec == AudioCodec::Aac {
            header.header_len = 2;
            header.is_sequence_header = payload.get(1) == Some(&0);
            if header.is_sequence_header {
                let config = AacConfig::parse(&payload[2..])?;
                if let Some(rate) = config.sample_rate() {
                    header.rate = rate;
                }
                if config.channel_config > 0 {
                    header.channels = config.channel_config as u32;
                }
            }
        }

        Ok(header)
    }

    /// Track description for this tag. Sequence headers carry the init data.
    pub fn to_track(&self, id: u32, payload: &[u8]) -> Track {
        let track = Track::audio(id, self.codec.name(), self.rate, self.size, self.channels);
        if self.is_sequence_header {
            track.with_init(payload.get(self.header_len..).unwrap_or_default().to_vec())
        } else {
            track
        }
    }
}

/// First byte of the audio tag header for an outbound packet of `track`
pub fn audio_tag_byte(track: &Track) -> u8 {
    let mut byte: u8 = match track.codec.as_str() {
        "AAC" => 0xA0,
        "MP3" if track.rate == 8000 => 0xE0,
        "MP3" => 0x20,
        "ADPCM" => 0x10,
        "PCM" => 0x30,
        "Nellymoser" if track.rate == 8000 => 0x50,
        "Nellymoser" if track.rate == 16000 => 0x40,
        "Nellymoser" => 0x60,
        "ALAW" => 0x70,
        "ULAW" => 0x80,
        "Speex" => 0xB0,
        _ => 0x00,
    };

    if track.rate >= 44100 {
        byte |= 0x0C;
    } else if track.rate >= 22050 {
        byte |= 0x08;
    } else if track.rate >= 11025 {
        byte |= 0x04;
    }
    if track.size != 8 {
        byte |= 0x02;
    }
    if track.channels > 1 {
        byte |= 0x01;
    }
    byte
}

/// Audio sub-header placed before a raw frame
pub fn audio_sub_header(track: &Track) -> Vec<u8> {
    let byte = audio_tag_byte(track);
    if track.codec == "AAC" {
        vec![byte, 1]
    } else {
        vec![byte]
    }
}

/// Tag carrying the AAC AudioSpecificConfig, if the track has one
pub fn audio_init_tag(track: &Track) -> Option<Vec<u8>> {
    if track.codec != "AAC" || track.init.is_empty() {
        return None;
    }
    let mut tag = vec![audio_tag_byte(track), 0];
    tag.extend_from_slice(&track.init);
    Some(tag)
}

/// 16-bit PCM travels little endian in tags; swap byte pairs in place.
/// A trailing odd byte is left untouched.
pub fn swap_pcm16(data: &mut [u8]) {
    for pair in data.chunks_exact_mut(2) {
        pair.swap(0, 1);
    }
}

pub fn needs_pcm_swap(track: &Track) -> bool {
    track.codec == "PCM" && track.size == 16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aac_sequence_header() {
        // AAC LC, 44100 Hz, stereo
        let payload = [0xAF, 0x00, 0x12, 0x10];
        let header = AudioTagHeader::parse(&payload).unwrap();
        assert_eq!(header.codec, AudioCodec::Aac);
        assert!(header.is_sequence_header);
        assert_eq!(header.rate, 44100);
        assert_eq!(header.channels, 2);
        assert_eq!(header.header_len, 2);

        let track = header.to_track(14, &payload);
        assert_eq!(track.codec, "AAC");
        assert_eq!(track.init, vec![0x12, 0x10]);
    }

    #[test]
    fn test_parse_aac_48k_mono_config() {
        let config = AacConfig::parse(&[0x11, 0x88]).unwrap();
        assert_eq!(config.object_type, 2);
        assert_eq!(config.sample_rate(), Some(48000));
        assert_eq!(config.channel_config, 1);
    }

    #[test]
    fn test_parse_legacy_codecs() {
        let header = AudioTagHeader::parse(&[0x2E, 0xFF]).unwrap();
        assert_eq!(header.codec.name(), "MP3");
        assert_eq!(header.rate, 44100);
        assert_eq!(header.size, 16);
        assert_eq!(header.channels, 1);

        let header = AudioTagHeader::parse(&[0x52, 0x00]).unwrap();
        assert_eq!(header.codec.name(), "Nellymoser");
        assert_eq!(header.rate, 8000);

        assert!(AudioTagHeader::parse(&[]).is_err());
    }

    #[test]
    fn test_outbound_tag_bytes() {
        assert_eq!(audio_sub_header(&Track::audio(2, "AAC", 44100, 16, 2)), vec![0xAF, 0x01]);
        assert_eq!(audio_tag_byte(&Track::audio(2, "MP3", 8000, 16, 1)), 0xE2);
        assert_eq!(audio_tag_byte(&Track::audio(2, "MP3", 22050, 16, 2)), 0x2B);
        assert_eq!(audio_tag_byte(&Track::audio(2, "PCM", 11025, 8, 1)), 0x34);
        assert_eq!(audio_tag_byte(&Track::audio(2, "Nellymoser", 16000, 16, 1)), 0x46);
        assert_eq!(audio_tag_byte(&Track::audio(2, "Nellymoser", 5512, 16, 1)), 0x62);
        assert_eq!(audio_tag_byte(&Track::audio(2, "ULAW", 8000, 8, 1)), 0x80);
        assert_eq!(audio_tag_byte(&Track::audio(2, "Speex", 16000, 16, 1)), 0xB6);
    }

    #[test]
    fn test_init_tag_only_for_aac_with_config() {
        let track = Track::audio(2, "AAC", 44100, 16, 2).with_init(vec![0x12, 0x10]);
        assert_eq!(audio_init_tag(&track), Some(vec![0xAF, 0x00, 0x12, 0x10]));
        assert_eq!(audio_init_tag(&Track::audio(2, "AAC", 44100, 16, 2)), None);
        assert_eq!(audio_init_tag(&Track::audio(2, "MP3", 44100, 16, 2)), None);
    }

    #[test]
    fn test_pcm_swap() {
        let mut data = vec![0x01, 0x02, 0x03, 0x04];
        swap_pcm16(&mut data);
        assert_eq!(data, vec![0x02, 0x01, 0x04, 0x03]);

        let mut odd = vec![0x01, 0x02, 0x03];
        swap_pcm16(&mut odd);
        assert_eq!(odd, vec![0x02, 0x01, 0x03]);
    }
}
