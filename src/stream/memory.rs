use crate::stream::{HostFactory, MediaHost, MediaPacket, PushPolicy, Track};
use log::{info, warn};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Packets kept per stream for players that join late
pub const PACKET_RING_SIZE: usize = 2048;

#[derive(Debug, Default)]
struct StreamEntry {
    tracks: BTreeMap<u32, Track>,
    boot_ms_offset: Option<i64>,

    /// Recent packets with their sequence numbers
    packets: VecDeque<(u64, MediaPacket)>,
    next_seq: u64,

    publishing: bool,
}

impl StreamEntry {
    /// Sequence number a new player should start from
    fn join_point(&self) -> u64 {
        self.packets
            .iter()
            .rev()
            .find(|(_, p)| p.keyframe && self.tracks.get(&p.track_id).is_some_and(|t| t.is_video()))
            .or_else(|| self.packets.front())
            .map_or(self.next_seq, |(seq, _)| *seq)
    }
}

/// Streams shared between the sessions of one server
#[derive(Debug, Default)]
pub struct StreamRegistry {
    streams: RwLock<HashMap<String, StreamEntry>>,
}

impl StreamRegistry {
    /// Create new registry
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, StreamEntry>> {
        self.streams.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, StreamEntry>> {
        self.streams.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim a stream for publishing. Fails while another publisher holds it.
    pub fn begin_publish(&self, name: &str) -> bool {
        let mut streams = self.write();
        let entry = streams.entry(name.to_string()).or_default();
        if entry.publishing {
            return false;
        }
        entry.publishing = true;
        true
    }

    pub fn end_publish(&self, name: &str) {
        if let Some(entry) = self.write().get_mut(name) {
            entry.publishing = false;
        }
    }

    pub fn is_publishing(&self, name: &str) -> bool {
        self.read().get(name).is_some_and(|e| e.publishing)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    pub fn stream_names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    /// Register a stream with a fixed set of tracks, e.g. for tests or demos
    pub fn insert_stream(&self, name: &str, tracks: Vec<Track>) {
        let mut streams = self.write();
        let entry = streams.entry(name.to_string()).or_default();
        for track in tracks {
            entry.tracks.insert(track.id, track);
        }
    }

    /// Append a packet to a stream's ring
    pub fn push_packet(&self, name: &str, packet: MediaPacket) {
        let mut streams = self.write();
        let entry = streams.entry(name.to_string()).or_default();
        let seq = entry.next_seq;
        entry.next_seq += 1;
        entry.packets.push_back((seq, packet));
        while entry.packets.len() > PACKET_RING_SIZE {
            entry.packets.pop_front();
        }
    }

    pub fn packet_count(&self, name: &str) -> usize {
        self.read().get(name).map_or(0, |e| e.packets.len())
    }
}

/// `MediaHost` backed by a shared `StreamRegistry`
pub struct MemoryHost {
    registry: Arc<StreamRegistry>,
    policy: PushPolicy,

    stream: Option<String>,
    publishing: bool,

    /// Next sequence number to play
    cursor: u64,
    position: u64,
}

impl MemoryHost {
    pub fn new(registry: Arc<StreamRegistry>, policy: PushPolicy) -> Self {
        MemoryHost {
            registry,
            policy,
            stream: None,
            publishing: false,
            cursor: 0,
            position: 0,
        }
    }

    /// Host that publishes into (or plays from) `name` without negotiation
    pub fn for_stream(registry: Arc<StreamRegistry>, name: &str) -> Self {
        let mut host = Self::new(registry, PushPolicy::allow_all());
        host.stream = Some(name.to_string());
        host
    }

    pub fn stream_name(&self) -> Option<&str> {
        self.stream.as_deref()
    }

    fn with_entry<R>(&self, f: impl FnOnce(&StreamEntry) -> R) -> Option<R> {
        let name = self.stream.as_ref()?;
        self.registry.read().get(name).map(f)
    }

    fn with_entry_mut<R>(&self, f: impl FnOnce(&mut StreamEntry) -> R) -> Option<R> {
        let name = self.stream.as_ref()?;
        let mut streams = self.registry.write();
        Some(f(streams.entry(name.clone()).or_default()))
    }
}

impl MediaHost for MemoryHost {
    fn track(&self, id: u32) -> Option<Track> {
        self.with_entry(|e| e.tracks.get(&id).cloned()).flatten()
    }

    fn tracks(&self) -> Vec<Track> {
        self.with_entry(|e| e.tracks.values().cloned().collect())
            .unwrap_or_default()
    }

    fn update_track(&mut self, track: Track) {
        self.with_entry_mut(|e| {
            e.tracks
                .entry(track.id)
                .and_modify(|existing| existing.merge(&track))
                .or_insert(track.clone());
        });
    }

    fn boot_ms_offset(&self) -> Option<i64> {
        self.with_entry(|e| e.boot_ms_offset).flatten()
    }

    fn set_boot_ms_offset(&mut self, offset: i64) {
        self.with_entry_mut(|e| e.boot_ms_offset = Some(offset));
    }

    fn buffer_packet(&mut self, packet: MediaPacket) {
        match &self.stream {
            Some(name) => self.registry.push_packet(name, packet),
            None => warn!("Dropping packet for track {}: no stream selected", packet.track_id),
        }
    }

    fn allow_push(&mut self, stream_name: &str, client_host: &str, protocol: &str, request_url: &str) -> bool {
        if stream_name.is_empty() {
            warn!("Push from {} rejected: no stream name", client_host);
            return false;
        }
        if !self.policy.allows(client_host) {
            warn!(
                "Push of {} from {} over {} rejected by address policy",
                stream_name, client_host, protocol
            );
            return false;
        }
        if !self.registry.begin_publish(stream_name) {
            warn!("Push of {} from {} rejected: stream already has a publisher", stream_name, client_host);
            return false;
        }

        info!("Accepted {} push of {} from {} ({})", protocol, stream_name, client_host, request_url);
        self.stream = Some(stream_name.to_string());
        self.publishing = true;
        true
    }

    fn select_stream(&mut self, stream_name: &str) -> bool {
        if !self.registry.contains(stream_name) {
            return false;
        }
        self.stream = Some(stream_name.to_string());
        let (cursor, position) = self
            .with_entry(|e| {
                let cursor = e.join_point();
                let position = e
                    .packets
                    .iter()
                    .find(|(seq, _)| *seq == cursor)
                    .map_or(0, |(_, p)| p.time);
                (cursor, position)
            })
            .unwrap_or((0, 0));
        self.cursor = cursor;
        self.position = position;
        true
    }

    fn is_vod(&self) -> bool {
        false
    }

    fn current_time(&self) -> u64 {
        self.position
    }

    fn seek(&mut self, time_ms: u64) {
        let cursor = self.with_entry(|e| {
            e.packets
                .iter()
                .find(|(_, p)| p.time >= time_ms)
                .map_or(e.next_seq, |(seq, _)| *seq)
        });
        if let Some(cursor) = cursor {
            self.cursor = cursor;
        }
        self.position = time_ms;
    }

    fn next_packet(&mut self) -> Option<MediaPacket> {
        let cursor = self.cursor;
        let (seq, packet) = self
            .with_entry(|e| {
                e.packets
                    .iter()
                    .find(|(seq, _)| *seq >= cursor)
                    .map(|(seq, p)| (*seq, p.clone()))
            })
            .flatten()?;
        self.cursor = seq + 1;
        self.position = packet.time;
        Some(packet)
    }

    fn source_ended(&self) -> bool {
        self.with_entry(|e| !e.publishing && self.cursor >= e.next_seq)
            .unwrap_or(true)
    }

    fn release(&mut self) {
        if self.publishing {
            if let Some(name) = &self.stream {
                info!("Publisher of {} left", name);
                self.registry.end_publish(name);
            }
            self.publishing = false;
        }
    }
}

/// Hands every connection its own `MemoryHost` on one shared registry
#[derive(Clone)]
pub struct MemoryHostFactory {
    registry: Arc<StreamRegistry>,
    policy: PushPolicy,
}

impl MemoryHostFactory {
    pub fn new(registry: Arc<StreamRegistry>, policy: PushPolicy) -> Self {
        MemoryHostFactory { registry, policy }
    }

    pub fn registry(&self) -> &Arc<StreamRegistry> {
        &self.registry
    }
}

impl HostFactory for MemoryHostFactory {
    type Host = MemoryHost;

    fn create_host(&self) -> MemoryHost {
        MemoryHost::new(self.registry.clone(), self.policy.clone())
    }
}
