/// Where the Adobe digest sits inside a 1536-byte handshake body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationScheme {
    /// Offset derived from bytes 8..12, digest in the first half
    Scheme0,

    /// Offset derived from bytes 772..776, digest in the second half
    Scheme1,
}

impl ValidationScheme {
    pub const ALL: [ValidationScheme; 2] = [ValidationScheme::Scheme0, ValidationScheme::Scheme1];

    /// Digest offset within a 1536-byte handshake body
    pub fn digest_offset(&self, body: &[u8]) -> usize {
        let (start, base) = match self {
            ValidationScheme::Scheme0 => (8, 12),
            ValidationScheme::Scheme1 => (772, 776),
        };
        let sum: usize = body[start..start + 4].iter().map(|b| *b as usize).sum();
        sum % 728 + base
    }
}

/// How a listener handshake ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// Digest validated, response sent and C2 consumed
    Complete(ValidationScheme),

    /// Client hello did not validate; no response was sent
    Degraded,
}

impl HandshakeOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, HandshakeOutcome::Complete(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_offsets() {
        let mut body = vec![0u8; 1536];
        assert_eq!(ValidationScheme::Scheme0.digest_offset(&body), 12);
        assert_eq!(ValidationScheme::Scheme1.digest_offset(&body), 776);

        body[8..12].copy_from_slice(&[255, 255, 255, 255]);
        assert_eq!(ValidationScheme::Scheme0.digest_offset(&body), 1020 % 728 + 12);

        body[772..776].copy_from_slice(&[200, 200, 200, 200]);
        assert_eq!(ValidationScheme::Scheme1.digest_offset(&body), 800 % 728 + 776);
    }
}
