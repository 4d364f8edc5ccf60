//! Opaque binary snapshot format (spec §4.7, §6).
//!
//! The wire format is a small fixed header (magic, format version, declared
//! body length) followed by a `bincode`-encoded [`SnapshotBody`]. The header
//! lets [`decode`] reject foreign or stale buffers before paying for a full
//! deserialize, the same layered-validation shape the source engine's
//! length-prefixed framing uses.

use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;
use crate::pool::PoolSnapshot;

const MAGIC: u32 = 0x4F43_5053; // "OCPS"
const VERSION: u16 = 1;
const HEADER_LEN: usize = 4 + 2 + 4;

/// Everything [`Engine::save_snapshot`] captures (spec §4.7, §3's `tx_ts`/`rx_ts`).
///
/// Configuration is carried alongside pool contents so a restored engine
/// resumes with the same retry/heartbeat behavior it had at capture time,
/// not the compiled-in defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotBody {
    pub tx_ts: u64,
    pub rx_ts: u64,
    pub heartbeat_interval: i64,
    pub tx_retry_interval: i64,
    pub tx_attempts: i64,
    pub pool: PoolSnapshot,
}

/// Encode `body` behind the versioned header.
pub fn encode(body: &SnapshotBody) -> Result<Vec<u8>, SnapshotError> {
    let payload = bincode::serialize(body).map_err(|e| SnapshotError::Decode(e.to_string()))?;

    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.extend_from_slice(&MAGIC.to_le_bytes());
    buf.extend_from_slice(&VERSION.to_le_bytes());
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Validate the header and decode the body.
pub fn decode(buf: &[u8]) -> Result<SnapshotBody, SnapshotError> {
    if buf.len() < HEADER_LEN {
        return Err(SnapshotError::Truncated { got: buf.len(), need: HEADER_LEN });
    }

    let magic = u32::from_le_bytes(buf[0..4].try_into().expect("4-byte slice"));
    if magic != MAGIC {
        return Err(SnapshotError::BadMagic { expected: MAGIC, got: magic });
    }

    let version = u16::from_le_bytes(buf[4..6].try_into().expect("2-byte slice"));
    if version != VERSION {
        return Err(SnapshotError::UnsupportedVersion { version });
    }

    let declared = u32::from_le_bytes(buf[6..10].try_into().expect("4-byte slice")) as usize;
    let actual = buf.len() - HEADER_LEN;
    if declared != actual {
        return Err(SnapshotError::LengthMismatch { declared, actual });
    }

    bincode::deserialize(&buf[HEADER_LEN..]).map_err(|e| SnapshotError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::PoolSnapshot;

    fn empty_body() -> SnapshotBody {
        SnapshotBody {
            tx_ts: 42,
            rx_ts: 43,
            heartbeat_interval: 30,
            tx_retry_interval: 5,
            tx_attempts: 3,
            pool: PoolSnapshot { ready: Vec::new(), wait: Vec::new(), timer: Vec::new() },
        }
    }

    #[test]
    fn round_trips_through_encode_decode() {
        let body = empty_body();
        let buf = encode(&body).unwrap();
        let decoded = decode(&buf).unwrap();
        assert_eq!(decoded.tx_ts, body.tx_ts);
        assert_eq!(decoded.rx_ts, body.rx_ts);
        assert_eq!(decoded.heartbeat_interval, body.heartbeat_interval);
    }

    #[test]
    fn decode_rejects_too_short_buffer() {
        let err = decode(&[1, 2, 3]).unwrap_err();
        assert!(matches!(err, SnapshotError::Truncated { .. }));
    }

    #[test]
    fn decode_rejects_bad_magic() {
        let mut buf = encode(&empty_body()).unwrap();
        buf[0] ^= 0xFF;
        let err = decode(&buf).unwrap_err();
        assert!(matches!(err, SnapshotError::BadMagic { .. }));
    }

    #[test]
    fn decode_rejects_unsupported_version() {
        let mut buf = encode(&empty_body()).unwrap();
        buf[4] = 0xFF;
        buf[5] = 0xFF;
        let err = decode(&buf).unwrap_err();
        assert!(matches!(err, SnapshotError::UnsupportedVersion { .. }));
    }

    #[test]
    fn decode_rejects_length_mismatch() {
        let mut buf = encode(&empty_body()).unwrap();
        buf.push(0); // trailing garbage byte not covered by the declared length
        let err = decode(&buf).unwrap_err();
        assert!(matches!(err, SnapshotError::LengthMismatch { .. }));
    }
}
