use rand::{Rng, rng};
use hmac::{Hmac, KeyInit, Mac};
use sha2::Sha256;
use crate::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Length of an HMAC-SHA256 digest
pub const DIGEST_LENGTH: usize = 32;

/// Fill a buffer of `len` bytes from the thread-local generator
pub fn generate_random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rng().fill_bytes(&mut bytes);
    bytes
}

/// HMAC-SHA256 over the concatenation of `parts`
pub fn hmac_sha256(key: &[u8], parts: &[&[u8]]) -> Result<[u8; DIGEST_LENGTH]> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| Error::handshake(format!("Invalid HMAC key: {}", e)))?;
    for part in parts {
        mac.update(part);
    }

    let result = mac.finalize();
    let mut output = [0u8; DIGEST_LENGTH];
    output.copy_from_slice(&result.into_bytes());
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_bytes() {
        let bytes1 = generate_random_bytes(32);
        let bytes2 = generate_random_bytes(32);
        assert_eq!(bytes1.len(), 32);
        assert_ne!(bytes1, bytes2);
    }

    #[test]
    fn test_hmac_sha256_known_vector() {
        let data = b"The quick brown fox jumps over the lazy dog";
        let hmac = hmac_sha256(b"key", &[data]).unwrap();

        let expected = [
            0xf7, 0xbc, 0x83, 0xf4, 0x30, 0x53, 0x84, 0x24,
            0xb1, 0x32, 0x98, 0xe6, 0xaa, 0x6f, 0xb1, 0x43,
            0xef, 0x4d, 0x59, 0xa1, 0x49, 0x46, 0x17, 0x59,
            0x97, 0x47, 0x9d, 0xbc, 0x2d, 0x1a, 0x3c, 0xd8
        ];
        assert_eq!(hmac, expected);
    }

    #[test]
    fn test_hmac_over_split_input() {
        let whole = hmac_sha256(b"key", &[b"abcdef"]).unwrap();
        let split = hmac_sha256(b"key", &[b"abc", b"def"]).unwrap();
        assert_eq!(whole, split);
    }
}
