use crate::stream::{MediaPacket, Track};

/// What a session needs from the media system around it: a track registry,
/// a sink for published packets and a source for playback. Implementations
/// do their own locking; a session only calls these from its own task.
pub trait MediaHost: Send {
    fn track(&self, id: u32) -> Option<Track>;

    /// All tracks of the selected stream, ordered by id
    fn tracks(&self) -> Vec<Track>;

    /// Insert a track or merge the known fields into the existing one
    fn update_track(&mut self, track: Track);

    /// Offset between the boot clock and the publisher's timestamps, once known
    fn boot_ms_offset(&self) -> Option<i64>;

    fn set_boot_ms_offset(&mut self, offset: i64);

    /// Accept a packet from a publishing peer
    fn buffer_packet(&mut self, packet: MediaPacket);

    /// Decide whether an incoming push may proceed. Selects the stream for
    /// publishing on success.
    fn allow_push(&mut self, stream_name: &str, client_host: &str, protocol: &str, request_url: &str) -> bool;

    /// Hook that may replace the URL of an incoming push. `Some("")` vetoes
    /// the push; `None` leaves it unchanged.
    fn rewrite_push_url(&mut self, _request_url: &str, _client_host: &str) -> Option<String> {
        None
    }

    /// Select a stream for playback
    fn select_stream(&mut self, stream_name: &str) -> bool;

    fn is_vod(&self) -> bool;

    fn is_live(&self) -> bool {
        !self.is_vod()
    }

    /// Playback position in milliseconds
    fn current_time(&self) -> u64;

    fn seek(&mut self, time_ms: u64);

    /// Next packet for playback, if one is ready
    fn next_packet(&mut self) -> Option<MediaPacket>;

    /// Playback source has no more data and never will
    fn source_ended(&self) -> bool {
        false
    }

    /// The session is going away
    fn release(&mut self) {}
}

/// Creates the host for each accepted connection
pub trait HostFactory: Send + Sync + 'static {
    type Host: MediaHost + 'static;

    fn create_host(&self) -> Self::Host;
}
