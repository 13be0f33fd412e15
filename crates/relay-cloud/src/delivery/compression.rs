/// Payload after optional compression.
#[derive(Debug)]
pub struct Encoded {
    pub bytes: Vec<u8>,
    pub content_encoding: Option<&'static str>,
    /// Bytes shaved off the raw payload. Zero when sent raw.
    pub saved: u64,
}

/// zstd payload compression. A payload is only sent compressed when that
/// makes it strictly smaller.
#[derive(Debug, Clone, Copy)]
pub struct Compressor {
    enabled: bool,
    level: i32,
}

impl Compressor {
    pub fn new(enabled: bool, level: i32) -> Self {
        Self {
            enabled,
            level: level.clamp(1, 22),
        }
    }

    pub fn encode(&self, payload: &[u8]) -> Encoded {
        if self.enabled && !payload.is_empty() {
            match zstd::bulk::compress(payload, self.level) {
                Ok(compressed) if compressed.len() < payload.len() => {
                    return Encoded {
                        saved: (payload.len() - compressed.len()) as u64,
                        bytes: compressed,
                        content_encoding: Some("zstd"),
                    };
                }
                Ok(_) => {}
                Err(e) => tracing::debug!(error = %e, "delivery: compression failed, sending raw"),
            }
        }
        Encoded {
            bytes: payload.to_vec(),
            content_encoding: None,
            saved: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repetitive_payload_is_compressed() {
        let c = Compressor::new(true, 3);
        let payload = br#"{"temp":21.5,"humidity":40}"#.repeat(50);
        let out = c.encode(&payload);
        assert_eq!(out.content_encoding, Some("zstd"));
        assert!(out.bytes.len() < payload.len());
        assert_eq!(zstd::bulk::decompress(&out.bytes, payload.len()).unwrap(), payload);
        assert_eq!(out.saved, (payload.len() - out.bytes.len()) as u64);
    }

    #[test]
    fn tiny_payload_is_sent_raw() {
        let c = Compressor::new(true, 3);
        let out = c.encode(b"{}");
        assert_eq!(out.content_encoding, None);
        assert_eq!(out.bytes, b"{}");
        assert_eq!(out.saved, 0);
    }

    #[test]
    fn disabled_compressor_passes_through() {
        let c = Compressor::new(false, 3);
        let payload = vec![b'a'; 4096];
        let out = c.encode(&payload);
        assert_eq!(out.content_encoding, None);
        assert_eq!(out.bytes.len(), 4096);
        assert_eq!(out.saved, 0);
    }
}
