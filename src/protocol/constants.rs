// Message types
pub const MSG_TYPE_SET_CHUNK_SIZE: u8 = 1;
pub const MSG_TYPE_ABORT: u8 = 2;
pub const MSG_TYPE_ACK: u8 = 3;
pub const MSG_TYPE_USER_CONTROL: u8 = 4;
pub const MSG_TYPE_WINDOW_ACK: u8 = 5;
pub const MSG_TYPE_SET_PEER_BW: u8 = 6;
pub const MSG_TYPE_AUDIO: u8 = 8;
pub const MSG_TYPE_VIDEO: u8 = 9;
pub const MSG_TYPE_DATA_AMF3: u8 = 15;
pub const MSG_TYPE_SHARED_OBJECT_AMF3: u8 = 16;
pub const MSG_TYPE_COMMAND_AMF3: u8 = 17;
pub const MSG_TYPE_DATA_AMF0: u8 = 18;
pub const MSG_TYPE_SHARED_OBJECT_AMF0: u8 = 19;
pub const MSG_TYPE_COMMAND_AMF0: u8 = 20;
pub const MSG_TYPE_AGGREGATE: u8 = 22;

// Chunk stream IDs
pub const CHUNK_STREAM_PROTOCOL: u32 = 2;
pub const CHUNK_STREAM_COMMAND: u32 = 3;
pub const CHUNK_STREAM_MEDIA: u32 = 4;

/// The single message stream handed out by createStream
pub const MEDIA_STREAM_ID: u32 = 1;

// Chunking
pub const DEFAULT_CHUNK_SIZE: u32 = 128;
pub const NEGOTIATED_CHUNK_SIZE: u32 = 65536;
pub const EXTENDED_TIMESTAMP: u32 = 0x00FF_FFFF;

// Windows
pub const DEFAULT_WINDOW_SIZE: u32 = 5_000_000;
pub const PEER_BANDWIDTH_DYNAMIC: u8 = 2;

// Inbound timestamp continuity
pub const TIMESTAMP_WRAP_ALLOWANCE: u64 = 0xFF00_0000;
pub const MAX_TIMESTAMP_JUMP_MS: u64 = 600_000;

// Identity used in replies
pub const FMS_VERSION: &str = "FMS/3,5,5,2004";
pub const SERVER_CAPABILITIES: f64 = 31.0;
pub const CLIENT_ID: f64 = 1337.0;
pub const STATUS_DETAILS: &str = "DDV";

pub const DEFAULT_PORT: u16 = 1935;
