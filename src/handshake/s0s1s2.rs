use crate::handshake::c0c1::{body_digest, HANDSHAKE_SIZE, RTMP_VERSION};
use crate::handshake::state::ValidationScheme;
use crate::utils::{boot_ms, generate_random_bytes, hmac_sha256, DIGEST_LENGTH};
use crate::Result;

/// FMS version advertised in S1
pub const S1_VERSION: [u8; 4] = [0x04, 0x05, 0x00, 0x01];

/// "Genuine Adobe Flash Media Server 001" followed by the shared 32-byte suffix
pub const GENUINE_FMS_KEY: [u8; 68] = [
    b'G', b'e', b'n', b'u', b'i', b'n', b'e', b' ', b'A', b'd', b'o', b'b', b'e', b' ', b'F', b'l',
    b'a', b's', b'h', b' ', b'M', b'e', b'd', b'i', b'a', b' ', b'S', b'e', b'r', b'v', b'e', b'r',
    b' ', b'0', b'0', b'1',
    0xF0, 0xEE, 0xC2, 0x4A, 0x80, 0x68, 0xBE, 0xE8, 0x2E, 0x00, 0xD0, 0xD1, 0x02, 0x9E, 0x7E, 0x57,
    0x6E, 0xEC, 0x5D, 0x2D, 0x29, 0x80, 0x6F, 0xAB, 0x93, 0xB8, 0xE6, 0x36, 0xCF, 0xEB, 0x31, 0xAE,
];

/// Bytes of the server key used for S1 digests
pub const FMS_KEY_PARTIAL: usize = 36;

/// Server handshake (S0 + S1 + S2)
#[derive(Debug, Clone)]
pub struct S0S1S2 {
    pub s1: Vec<u8>,
    pub s2: Vec<u8>,
}

impl S0S1S2 {
    /// Build the response to a validated client hello
    pub fn generate(scheme: ValidationScheme, client_digest: &[u8; DIGEST_LENGTH]) -> Result<Self> {
        let mut s1 = generate_random_bytes(HANDSHAKE_SIZE);
        s1[..4].copy_from_slice(&(boot_ms() as u32).to_be_bytes());
        s1[4..8].copy_from_slice(&S1_VERSION);

        let offset = scheme.digest_offset(&s1);
        let digest = body_digest(&s1, offset, &GENUINE_FMS_KEY[..FMS_KEY_PARTIAL])?;
        s1[offset..offset + DIGEST_LENGTH].copy_from_slice(&digest);

        let mut s2 = generate_random_bytes(HANDSHAKE_SIZE);
        let key = hmac_sha256(&GENUINE_FMS_KEY, &[client_digest])?;
        let signature_at = HANDSHAKE_SIZE - DIGEST_LENGTH;
        let signature = hmac_sha256(&key, &[&s2[..signature_at]])?;
        s2[signature_at..].copy_from_slice(&signature);

        Ok(S0S1S2 { s1, s2 })
    }

    /// Encode to bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(1 + HANDSHAKE_SIZE * 2);
        result.push(RTMP_VERSION);
        result.extend_from_slice(&self.s1);
        result.extend_from_slice(&self.s2);
        result
    }

    /// Check that S2 was signed for `client_digest`
    pub fn verify_s2(s2: &[u8], client_digest: &[u8; DIGEST_LENGTH]) -> Result<bool> {
        if s2.len() != HANDSHAKE_SIZE {
            return Ok(false);
        }
        let key = hmac_sha256(&GENUINE_FMS_KEY, &[client_digest])?;
        let signature_at = HANDSHAKE_SIZE - DIGEST_LENGTH;
        let expected = hmac_sha256(&key, &[&s2[..signature_at]])?;
        Ok(expected[..] == s2[signature_at..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handshake::c0c1::C0C1;

    #[test]
    fn test_response_layout_and_signatures() {
        let c0c1 = C0C1::create_signed(ValidationScheme::Scheme0).unwrap();
        let (scheme, digest) = c0c1.validate().unwrap();

        let response = S0S1S2::generate(scheme, &digest).unwrap();
        let bytes = response.encode();
        assert_eq!(bytes.len(), 3073);
        assert_eq!(bytes[0], RTMP_VERSION);
        assert_eq!(&bytes[5..9], &S1_VERSION);

        let s1 = &bytes[1..1537];
        let offset = scheme.digest_offset(s1);
        let expected = body_digest(s1, offset, &GENUINE_FMS_KEY[..FMS_KEY_PARTIAL]).unwrap();
        assert_eq!(&s1[offset..offset + DIGEST_LENGTH], &expected[..]);

        assert!(S0S1S2::verify_s2(&bytes[1537..], &digest).unwrap());
        assert!(!S0S1S2::verify_s2(&bytes[1537..], &[0u8; DIGEST_LENGTH]).unwrap());
    }
}
