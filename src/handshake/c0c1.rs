use crate::handshake::state::ValidationScheme;
use crate::utils::{generate_random_bytes, hmac_sha256, DIGEST_LENGTH};
use crate::{Error, Result};
use log::debug;

/// RTMP version
pub const RTMP_VERSION: u8 = 3;

/// Handshake packet size (C1/S1/C2/S2)
pub const HANDSHAKE_SIZE: usize = 1536;

/// Filler for the pusher's C1+C2 body
const FILLER_DATA: &[u8] = b"rtmp-session push handshake, contents are not inspected by the peer. ";

/// "Genuine Adobe Flash Player 001" followed by the shared 32-byte suffix
pub const GENUINE_FP_KEY: [u8; 62] = [
    b'G', b'e', b'n', b'u', b'i', b'n', b'e', b' ', b'A', b'd', b'o', b'b', b'e', b' ', b'F', b'l',
    b'a', b's', b'h', b' ', b'P', b'l', b'a', b'y', b'e', b'r', b' ', b'0', b'0', b'1',
    0xF0, 0xEE, 0xC2, 0x4A, 0x80, 0x68, 0xBE, 0xE8, 0x2E, 0x00, 0xD0, 0xD1, 0x02, 0x9E, 0x7E, 0x57,
    0x6E, 0xEC, 0x5D, 0x2D, 0x29, 0x80, 0x6F, 0xAB, 0x93, 0xB8, 0xE6, 0x36, 0xCF, 0xEB, 0x31, 0xAE,
];

/// Bytes of the player key used for C1 digests
pub const FP_KEY_PARTIAL: usize = 30;

/// Client handshake (C0 + C1)
#[derive(Debug, Clone)]
pub struct C0C1 {
    /// RTMP version (C0)
    pub version: u8,

    /// The 1536-byte C1 body
    pub body: Vec<u8>,
}

impl C0C1 {
    /// Parse C0+C1 from the first 1537 bytes of `data`
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 1 + HANDSHAKE_SIZE {
            return Err(Error::handshake(format!(
                "C0+C1 too short: {} bytes, expected {}",
                data.len(),
                1 + HANDSHAKE_SIZE
            )));
        }

        Ok(C0C1 {
            version: data[0],
            body: data[1..1 + HANDSHAKE_SIZE].to_vec(),
        })
    }

    /// Find the scheme whose embedded digest checks out, trying scheme 0 first
    pub fn validate(&self) -> Option<(ValidationScheme, [u8; DIGEST_LENGTH])> {
        if self.version != RTMP_VERSION {
            debug!("Client requested RTMP version {}", self.version);
        }

        ValidationScheme::ALL.into_iter().find_map(|scheme| {
            let offset = scheme.digest_offset(&self.body);
            let digest = body_digest(&self.body, offset, &GENUINE_FP_KEY[..FP_KEY_PARTIAL]).ok()?;
            if digest[..] == self.body[offset..offset + DIGEST_LENGTH] {
                Some((scheme, digest))
            } else {
                None
            }
        })
    }

    /// Build a C0+C1 carrying a valid player digest for `scheme`
    pub fn create_signed(scheme: ValidationScheme) -> Result<Self> {
        let mut body = generate_random_bytes(HANDSHAKE_SIZE);
        body[..4].fill(0);
        body[4..8].copy_from_slice(&[0x80, 0x00, 0x07, 0x02]);

        let offset = scheme.digest_offset(&body);
        let digest = body_digest(&body, offset, &GENUINE_FP_KEY[..FP_KEY_PARTIAL])?;
        body[offset..offset + DIGEST_LENGTH].copy_from_slice(&digest);

        Ok(C0C1 {
            version: RTMP_VERSION,
            body,
        })
    }

    /// Encode to bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(1 + HANDSHAKE_SIZE);
        result.push(self.version);
        result.extend_from_slice(&self.body);
        result
    }
}

/// HMAC over a handshake body with the digest bytes at `offset` left out
pub fn body_digest(body: &[u8], offset: usize, key: &[u8]) -> Result<[u8; DIGEST_LENGTH]> {
    hmac_sha256(key, &[&body[..offset], &body[offset + DIGEST_LENGTH..]])
}

/// Pusher hello: version byte plus a fixed C1+C2 body (zero time, marker
/// 0x01020304, filler)
pub fn push_hello() -> Vec<u8> {
    let mut result = Vec::with_capacity(1 + HANDSHAKE_SIZE * 2);
    result.push(RTMP_VERSION);

    let mut body = vec![0u8; HANDSHAKE_SIZE * 2];
    body[4..8].copy_from_slice(&0x0102_0304u32.to_be_bytes());
    for (i, byte) in body.iter_mut().enumerate().skip(8) {
        *byte = FILLER_DATA[i % FILLER_DATA.len()];
    }

    result.extend_from_slice(&body);
    result
}
