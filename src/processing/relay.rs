use crate::processing::audio::{audio_init_tag, audio_sub_header, needs_pcm_swap, swap_pcm16, AudioTagHeader};
use crate::processing::metadata::{metadata_for_tracks, MetadataArena};
use crate::processing::video::{video_init_tag, video_sub_header, VideoTagHeader};
use crate::protocol::{
    RtmpData, RtmpPacket, MAX_TIMESTAMP_JUMP_MS, MSG_TYPE_AUDIO, MSG_TYPE_DATA_AMF0, MSG_TYPE_VIDEO,
    TIMESTAMP_WRAP_ALLOWANCE,
};
use crate::stream::{track_id, MediaHost, MediaPacket, Track, TrackKind};
use crate::utils::boot_ms;
use crate::{Error, Result};
use log::{debug, error, info, warn};
use std::collections::HashMap;

/// How fast playback data should be pulled from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// As fast as the host produces packets
    Unconstrained,
    /// Packet time scaled by 1000 / permille against the wall clock
    RealTime(u32),
}

/// Converts between RTMP media messages and host packets for one session
#[derive(Debug)]
pub struct MediaRelay {
    /// `onMetaData` objects per chunk channel
    metadata: MetadataArena,

    /// Track descriptors as last reported to the host
    tracks: HashMap<u32, Track>,

    /// Last accepted inbound time per track
    last_tag_time: HashMap<u32, u64>,

    boot_ms_offset: Option<i64>,

    /// Shift between host time and wire time
    rtmp_offset: i64,

    /// Last outbound wire time, for rewind correction
    last_out_time: u64,
    rewind_correction: bool,

    pacing: Pacing,
}

impl MediaRelay {
    /// `rewind_correction` is enabled when pushing to a remote server
    pub fn new(rewind_correction: bool) -> Self {
        MediaRelay {
            metadata: MetadataArena::new(),
            tracks: HashMap::new(),
            last_tag_time: HashMap::new(),
            boot_ms_offset: None,
            rtmp_offset: 0,
            last_out_time: 0,
            rewind_correction,
            pacing: Pacing::Unconstrained,
        }
    }

    pub fn rtmp_offset(&self) -> i64 {
        self.rtmp_offset
    }

    pub fn set_rtmp_offset(&mut self, offset: i64) {
        self.rtmp_offset = offset;
    }

    pub fn pacing(&self) -> Pacing {
        self.pacing
    }

    pub fn set_pacing(&mut self, pacing: Pacing) {
        self.pacing = pacing;
    }

    /// Turn an inbound audio, video or data message into a host packet
    pub fn ingest(&mut self, packet: &RtmpPacket, host: &mut dyn MediaHost) -> Result<Option<MediaPacket>> {
        self.ingest_at(packet, host, boot_ms())
    }

    /// `ingest` against an explicit boot clock reading
    pub fn ingest_at(
        &mut self,
        packet: &RtmpPacket,
        host: &mut dyn MediaHost,
        now_ms: u64,
    ) -> Result<Option<MediaPacket>> {
        let payload = &packet.payload;
        if payload.is_empty() {
            return Ok(None);
        }
        let Some(kind) = TrackKind::from_message_type(packet.message_type()) else {
            return Ok(None);
        };
        let channel = packet.header.chunk_stream_id;
        let id = track_id(channel, kind);

        let (track, header_len, keyframe, offset, is_init) = match kind {
            TrackKind::Meta => {
                self.absorb_metadata(channel, payload, host);
                return Ok(None);
            }
            TrackKind::Audio => {
                let header = AudioTagHeader::parse(payload)?;
                let track = header.to_track(id, payload);
                (track, header.header_len, false, 0, header.is_sequence_header)
            }
            TrackKind::Video => {
                let header = VideoTagHeader::parse(payload)?;
                let track = header.to_track(id, payload);
                let offset = header.composition_offset as i64;
                (track, header.header_len, header.is_keyframe(), offset, header.is_sequence_header)
            }
        };

        let data = payload.get(header_len..).unwrap_or_default();
        if data.is_empty() {
            return Ok(None);
        }

        let mut track = track;
        self.metadata.metadata(channel).apply_to(&mut track);
        self.report_track(track, host);
        if is_init {
            debug!("Init data for track {} ({} bytes)", id, data.len());
            return Ok(None);
        }

        let boot_offset = self.boot_offset(packet.timestamp(), host, now_ms);
        let tag_time = (packet.timestamp() as i64 + self.rtmp_offset).max(0) as u64;
        self.check_continuity(id, tag_time)?;

        let mut data = data.to_vec();
        if self.tracks.get(&id).is_some_and(needs_pcm_swap) {
            swap_pcm16(&mut data);
        }

        let mut media = MediaPacket::new(id, tag_time, data).with_offset(offset);
        if keyframe {
            media.keyframe = true;
            media.boot_ms_offset = boot_offset;
        }
        self.last_tag_time.insert(id, tag_time);
        Ok(Some(media))
    }

    /// Map the publisher's clock onto the boot clock on the first packet
    fn boot_offset(&mut self, tag_time: u32, host: &mut dyn MediaHost, now_ms: u64) -> i64 {
        if let Some(offset) = self.boot_ms_offset {
            return offset;
        }

        let since_boot = now_ms as i64 - tag_time as i64;
        let offset = match host.boot_ms_offset() {
            Some(known) => {
                self.rtmp_offset = since_boot - known;
                known
            }
            None => {
                host.set_boot_ms_offset(since_boot);
                self.rtmp_offset = 0;
                since_boot
            }
        };
        debug!("Boot offset {} ms, rtmp offset {} ms", offset, self.rtmp_offset);
        self.boot_ms_offset = Some(offset);
        offset
    }

    fn check_continuity(&self, id: u32, tag_time: u64) -> Result<()> {
        let Some(last) = self.last_tag_time.get(&id).copied().filter(|t| *t != 0) else {
            return Ok(());
        };

        if tag_time < last && last < TIMESTAMP_WRAP_ALLOWANCE {
            error!("Timestamps went from {} to {} (decreased): disconnecting!", last, tag_time);
            return Err(Error::timestamp_violation(format!(
                "track {} went from {} to {}",
                id, last, tag_time
            )));
        }
        if tag_time > last + MAX_TIMESTAMP_JUMP_MS {
            error!("Timestamps went from {} to {} (> 10m in future): disconnecting!", last, tag_time);
            return Err(Error::timestamp_violation(format!(
                "track {} jumped from {} to {}",
                id, last, tag_time
            )));
        }
        Ok(())
    }

    fn absorb_metadata(&mut self, channel: u32, payload: &[u8], host: &mut dyn MediaHost) {
        let data = match RtmpData::decode(payload) {
            Ok(data) => data,
            Err(e) => {
                warn!("Ignoring undecodable data message on channel {}: {}", channel, e);
                return;
            }
        };
        if !self.metadata.absorb(channel, &data) {
            debug!("Ignoring data message {}", data.data_type);
            return;
        }

        let known: Vec<Track> = self.tracks.values().cloned().collect();
        for mut track in known {
            self.metadata.metadata(channel_of(track.id)).apply_to(&mut track);
            self.report_track(track, host);
        }
    }

    /// Tell the host about a track if anything about it changed
    fn report_track(&mut self, track: Track, host: &mut dyn MediaHost) {
        match self.tracks.get_mut(&track.id) {
            Some(known) => {
                let before = known.clone();
                known.merge(&track);
                if *known != before {
                    host.update_track(known.clone());
                }
            }
            None => {
                info!("New {:?} track {} ({})", track.kind, track.id, track.codec);
                host.update_track(track.clone());
                self.tracks.insert(track.id, track);
            }
        }
    }

    /// Frame a host packet as an RTMP media message
    pub fn frame(&mut self, packet: &MediaPacket, track: &Track) -> Option<RtmpPacket> {
        let time = packet.time as i64;

        if self.rewind_correction {
            if time - self.rtmp_offset < self.last_out_time as i64 {
                let old = self.rtmp_offset;
                self.rtmp_offset -= 1 + self.last_out_time as i64 - (time - self.rtmp_offset);
                info!("Changing rtmpOffset from {} to {}", old, self.rtmp_offset);
                self.pacing = Pacing::RealTime(800);
            }
            self.last_out_time = (time - self.rtmp_offset).max(0) as u64;
        }

        let (message_type, mut payload) = match track.kind {
            TrackKind::Video => (MSG_TYPE_VIDEO, video_sub_header(track, packet)),
            TrackKind::Audio => (MSG_TYPE_AUDIO, audio_sub_header(track)),
            TrackKind::Meta => {
                debug!("Not forwarding packet of data track {}", track.id);
                return None;
            }
        };

        let data_at = payload.len();
        payload.extend_from_slice(&packet.data);
        if track.is_audio() && needs_pcm_swap(track) {
            swap_pcm16(&mut payload[data_at..]);
        }

        let timestamp = if self.rtmp_offset > time {
            self.rtmp_offset = time;
            0
        } else {
            (time - self.rtmp_offset) as u32
        };

        Some(RtmpPacket::media(message_type, timestamp, payload))
    }

    /// Metadata and codec init messages sent ahead of the first media packet
    pub fn header_packets(&self, tracks: &[Track]) -> Result<Vec<RtmpPacket>> {
        if tracks.is_empty() {
            return Ok(Vec::new());
        }

        let mut packets = vec![RtmpPacket::media(
            MSG_TYPE_DATA_AMF0,
            0,
            metadata_for_tracks(tracks).encode()?,
        )];
        for track in tracks {
            let init = match track.kind {
                TrackKind::Video => video_init_tag(track).map(|tag| (MSG_TYPE_VIDEO, tag)),
                TrackKind::Audio => audio_init_tag(track).map(|tag| (MSG_TYPE_AUDIO, tag)),
                TrackKind::Meta => None,
            };
            if let Some((message_type, tag)) = init {
                packets.push(RtmpPacket::media(message_type, 0, tag));
            }
        }
        Ok(packets)
    }
}

/// Chunk channel a derived track id came from
fn channel_of(track_id: u32) -> u32 {
    track_id.saturating_sub(1) / 3
}
