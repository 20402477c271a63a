//! The record stored per cache key, and its binary wire form.
//!
//! # Format (version 1, big endian)
//!
//! | Field         | Size        |
//! |---------------|-------------|
//! | magic `HCE`   | 3           |
//! | version       | 1           |
//! | expiration    | 8 + 4       |
//! | last access   | 8 + 4       |
//! | frequency     | 8           |
//! | value length  | 8           |
//! | value         | value length|
//!
//! Timestamps are signed seconds (`i64`) plus nanoseconds (`u32`, below one
//! billion) relative to the UNIX epoch, so `-1` seconds and `500_000_000`
//! nanoseconds is half a second before it.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::error::EnvelopeError;

const MAGIC: &[u8; 3] = b"HCE";
const VERSION: u8 = 1;
const NANOS_PER_SEC: u32 = 1_000_000_000;
// Everything between the version byte and the value bytes.
const FIXED_LEN: usize = 12 + 12 + 8 + 8;

/// A cached response body together with its expiry and access metadata.
///
/// `expiration` is fixed when the entry is created and never moves; hits only
/// touch `last_access` and `frequency`. Those two fields exist for storage
/// backends that implement an eviction policy; the middleware never reads them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    /// Body of the downstream response.
    pub value: Bytes,
    /// The entry is stale strictly after this instant.
    pub expiration: SystemTime,
    /// When the entry was last served from cache (creation time until then).
    pub last_access: SystemTime,
    /// Number of times the entry has been produced or served.
    pub frequency: u64,
}

impl CachedResponse {
    /// Creates a fresh entry: expires at `now + ttl`, frequency 1.
    ///
    /// A `ttl` that runs past the platform's latest representable instant
    /// expires at that instant instead.
    pub fn new(value: impl Into<Bytes>, now: SystemTime, ttl: Duration) -> Self {
        Self {
            value: value.into(),
            expiration: saturating_add(now, ttl),
            last_access: now,
            frequency: 1,
        }
    }

    /// Returns `true` while `expiration` is strictly after `now`.
    pub fn is_fresh(&self, now: SystemTime) -> bool {
        self.expiration > now
    }

    /// Records a cache hit served at `now`.
    pub fn touch(&mut self, now: SystemTime) {
        self.last_access = now;
        self.frequency = self.frequency.saturating_add(1);
    }

    /// Serializes the envelope.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(MAGIC.len() + 1 + FIXED_LEN + self.value.len());
        buf.put_slice(MAGIC);
        buf.put_u8(VERSION);
        put_time(&mut buf, self.expiration);
        put_time(&mut buf, self.last_access);
        buf.put_u64(self.frequency);
        buf.put_u64(self.value.len() as u64);
        buf.put_slice(&self.value);
        buf.freeze()
    }

    /// Parses an envelope produced by [`encode`](Self::encode).
    ///
    /// # Errors
    ///
    /// Fails on truncated input, a foreign or newer format, out-of-range
    /// timestamps, and trailing garbage.
    pub fn decode(mut raw: &[u8]) -> Result<Self, EnvelopeError> {
        need(raw, MAGIC.len() + 1)?;
        if &raw[..MAGIC.len()] != MAGIC {
            return Err(EnvelopeError::BadMagic);
        }
        raw.advance(MAGIC.len());

        let version = raw.get_u8();
        if version != VERSION {
            return Err(EnvelopeError::UnsupportedVersion(version));
        }

        need(raw, FIXED_LEN)?;
        let expiration = get_time(&mut raw)?;
        let last_access = get_time(&mut raw)?;
        let frequency = raw.get_u64();
        let len = usize::try_from(raw.get_u64()).unwrap_or(usize::MAX);

        need(raw, len)?;
        let value = Bytes::copy_from_slice(&raw[..len]);
        raw.advance(len);

        if raw.has_remaining() {
            return Err(EnvelopeError::TrailingBytes(raw.remaining()));
        }

        Ok(Self {
            value,
            expiration,
            last_access,
            frequency,
        })
    }
}

fn need(raw: &[u8], n: usize) -> Result<(), EnvelopeError> {
    if raw.len() < n {
        Err(EnvelopeError::Truncated {
            needed: n - raw.len(),
        })
    } else {
        Ok(())
    }
}

// Adds the largest prefix of `d` that still fits after `t`.
fn saturating_add(t: SystemTime, d: Duration) -> SystemTime {
    if let Some(sum) = t.checked_add(d) {
        return sum;
    }
    let (mut out, mut step) = (t, d);
    while !step.is_zero() {
        match out.checked_add(step) {
            Some(next) => out = next,
            None => step /= 2,
        }
    }
    out
}

fn put_time(buf: &mut BytesMut, t: SystemTime) {
    let (secs, nanos) = match t.duration_since(UNIX_EPOCH) {
        Ok(after) => (
            i64::try_from(after.as_secs()).unwrap_or(i64::MAX),
            after.subsec_nanos(),
        ),
        Err(e) => {
            let before = e.duration();
            let secs = i64::try_from(before.as_secs()).unwrap_or(i64::MAX);
            match before.subsec_nanos() {
                0 => (-secs, 0),
                n => ((-secs).saturating_sub(1), NANOS_PER_SEC - n),
            }
        }
    };
    buf.put_i64(secs);
    buf.put_u32(nanos);
}

fn get_time(raw: &mut &[u8]) -> Result<SystemTime, EnvelopeError> {
    let secs = raw.get_i64();
    let nanos = raw.get_u32();
    if nanos >= NANOS_PER_SEC {
        return Err(EnvelopeError::InvalidTimestamp);
    }
    let whole = if secs >= 0 {
        UNIX_EPOCH.checked_add(Duration::from_secs(secs.unsigned_abs()))
    } else {
        UNIX_EPOCH.checked_sub(Duration::from_secs(secs.unsigned_abs()))
    };
    whole
        .and_then(|t| t.checked_add(Duration::from_nanos(u64::from(nanos))))
        .ok_or(EnvelopeError::InvalidTimestamp)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CachedResponse {
        let created = UNIX_EPOCH + Duration::new(1_700_000_000, 123_456_789);
        let mut entry = CachedResponse::new(&b"hello"[..], created, Duration::from_secs(30));
        entry.touch(created + Duration::from_millis(1500));
        entry
    }

    #[test]
    fn new_entry_metadata() {
        let now = SystemTime::now();
        let entry = CachedResponse::new(Bytes::from_static(b"x"), now, Duration::from_secs(5));
        assert_eq!(entry.frequency, 1);
        assert_eq!(entry.last_access, now);
        assert_eq!(entry.expiration, now + Duration::from_secs(5));
    }

    #[test]
    fn freshness_is_strict() {
        let entry = sample();
        assert!(entry.is_fresh(entry.expiration - Duration::from_nanos(1)));
        assert!(!entry.is_fresh(entry.expiration));
    }

    #[test]
    fn touch_keeps_expiration() {
        let mut entry = sample();
        let expiration = entry.expiration;
        let later = entry.last_access + Duration::from_secs(1);
        entry.touch(later);
        assert_eq!(entry.frequency, 3);
        assert_eq!(entry.last_access, later);
        assert_eq!(entry.expiration, expiration);
    }

    #[test]
    fn decode_restores_every_field() {
        let entry = sample();
        assert_eq!(CachedResponse::decode(&entry.encode()), Ok(entry));
    }

    #[test]
    fn binary_payload_and_empty_payload_survive() {
        let now = SystemTime::now();
        for value in [Vec::new(), (0u8..=255).collect::<Vec<_>>()] {
            let entry = CachedResponse::new(value, now, Duration::from_secs(1));
            assert_eq!(CachedResponse::decode(&entry.encode()).unwrap(), entry);
        }
    }

    #[test]
    fn pre_epoch_times_survive_exactly() {
        let before = UNIX_EPOCH - Duration::new(10, 250_000_000);
        let entry = CachedResponse::new(Bytes::new(), before, Duration::from_millis(500));
        let decoded = CachedResponse::decode(&entry.encode()).unwrap();
        assert_eq!(decoded.last_access, before);
        assert_eq!(decoded.expiration, UNIX_EPOCH - Duration::new(9, 750_000_000));
        assert_eq!(decoded, entry);
        assert!(!decoded.is_fresh(SystemTime::now()));
    }

    #[test]
    fn whole_second_before_epoch() {
        let before = UNIX_EPOCH - Duration::from_secs(3);
        let entry = CachedResponse::new(&b"x"[..], before, Duration::from_secs(1));
        let raw = entry.encode();
        assert_eq!(&raw[4..12], &(-3i64).to_be_bytes());
        assert_eq!(CachedResponse::decode(&raw), Ok(entry));
    }

    #[test]
    fn oversized_ttl_saturates_instead_of_panicking() {
        let now = SystemTime::now();
        let entry = CachedResponse::new(&b"x"[..], now, Duration::MAX);
        assert!(entry.expiration > now + Duration::from_secs(365 * 24 * 3600));
        assert!(entry.is_fresh(now));
        assert_eq!(entry.expiration.checked_add(Duration::from_secs(1)), None);
    }

    #[test]
    fn empty_input_is_truncated() {
        assert_eq!(
            CachedResponse::decode(&[]),
            Err(EnvelopeError::Truncated { needed: 4 })
        );
    }

    #[test]
    fn every_short_prefix_is_rejected() {
        let encoded = sample().encode();
        for cut in 0..encoded.len() {
            assert!(CachedResponse::decode(&encoded[..cut]).is_err(), "cut at {cut}");
        }
    }

    #[test]
    fn foreign_bytes_are_rejected() {
        assert_eq!(
            CachedResponse::decode(b"GOB\x01rest"),
            Err(EnvelopeError::BadMagic)
        );
    }

    #[test]
    fn newer_version_is_rejected() {
        let mut raw = sample().encode().to_vec();
        raw[3] = 2;
        assert_eq!(
            CachedResponse::decode(&raw),
            Err(EnvelopeError::UnsupportedVersion(2))
        );
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut raw = sample().encode().to_vec();
        raw.extend_from_slice(b"zz");
        assert_eq!(
            CachedResponse::decode(&raw),
            Err(EnvelopeError::TrailingBytes(2))
        );
    }

    #[test]
    fn bad_nanos_are_rejected() {
        let mut raw = sample().encode().to_vec();
        // expiration nanos live right after the 8-byte seconds field
        raw[12..16].copy_from_slice(&u32::MAX.to_be_bytes());
        assert_eq!(
            CachedResponse::decode(&raw),
            Err(EnvelopeError::InvalidTimestamp)
        );
    }
}
