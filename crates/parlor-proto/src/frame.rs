//! WebSocket frame encoding and decoding (RFC 6455 §5, single-frame subset).
//!
//! Every encoded frame sets the FIN bit — fragmentation is not supported,
//! and [`decode`] never merges frames into a larger logical message.
//! Server-originated frames are never masked; client frames carry a 4-byte
//! masking key that [`decode`] strips by XOR-ing `key[i % 4]` over the
//! payload.
//!
//! [`decode`] is pure: it reports how many bytes one complete frame
//! consumed and returns `None` while the buffer is still too short, so the
//! caller can accumulate bytes across TCP reads and retry.

/// Frame opcode, low nibble of the first header byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    /// Continuation of a fragmented message (never produced here).
    Continuation = 0x0,
    /// UTF-8 text payload.
    Text = 0x1,
    /// Binary payload.
    Binary = 0x2,
    /// Connection close.
    Close = 0x8,
    /// Liveness probe; answered with a pong carrying the same payload.
    Ping = 0x9,
    /// Answer to a ping.
    Pong = 0xA,
}

impl Opcode {
    /// Map a nibble to an opcode. Reserved nibbles yield `None`.
    pub const fn from_u8(nibble: u8) -> Option<Self> {
        match nibble {
            0x0 => Some(Self::Continuation),
            0x1 => Some(Self::Text),
            0x2 => Some(Self::Binary),
            0x8 => Some(Self::Close),
            0x9 => Some(Self::Ping),
            0xA => Some(Self::Pong),
            _ => None,
        }
    }

    /// The wire nibble.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// One decoded wire frame: opcode plus raw payload bytes.
///
/// The payload of a [`Opcode::Text`] frame is interpreted as UTF-8 by the
/// layer above; the codec itself does not validate text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// What kind of frame this is.
    pub opcode: Opcode,
    /// Raw payload bytes, already unmasked.
    pub payload: Vec<u8>,
}

/// Result of decoding one frame from the front of a buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decoded {
    /// The decoded frame.
    pub frame: Frame,
    /// Total bytes the frame occupied, including header, extended length,
    /// and masking key. The caller advances its buffer by this much.
    pub consumed: usize,
}

/// Encode a single unmasked frame with the FIN bit set.
///
/// Length tiers per RFC 6455: a literal 7-bit length below 126, marker 126
/// plus a big-endian `u16` below 65536, marker 127 plus a big-endian `u64`
/// otherwise.
pub fn encode(payload: &[u8], opcode: Opcode) -> Vec<u8> {
    let len = payload.len();
    let mut out = Vec::with_capacity(len + 10);
    out.push(0x80 | opcode.as_u8());

    if len < 126 {
        out.push(len as u8);
    } else if len < 65_536 {
        out.push(126);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        out.push(127);
        out.extend_from_slice(&(len as u64).to_be_bytes());
    }

    out.extend_from_slice(payload);
    out
}

/// Decode one frame from the front of `buf`.
///
/// Returns `None` when `buf` does not yet hold a complete frame — header,
/// extended length, masking key, or payload still missing. `None` is a
/// "keep reading" signal, never an error. Nibbles outside the opcode set
/// are likewise not decodable.
pub fn decode(buf: &[u8]) -> Option<Decoded> {
    if buf.len() < 2 {
        return None;
    }

    let opcode = Opcode::from_u8(buf[0] & 0x0F)?;
    let masked = buf[1] & 0x80 != 0;
    let base_len = (buf[1] & 0x7F) as usize;

    let (payload_len, mut offset) = match base_len {
        126 => {
            if buf.len() < 4 {
                return None;
            }
            (usize::from(u16::from_be_bytes([buf[2], buf[3]])), 4)
        }
        127 => {
            if buf.len() < 10 {
                return None;
            }
            let len = u64::from_be_bytes([
                buf[2], buf[3], buf[4], buf[5], buf[6], buf[7], buf[8], buf[9],
            ]);
            (usize::try_from(len).ok()?, 10)
        }
        n => (n, 2),
    };

    let mask_key = if masked {
        if buf.len() < offset + 4 {
            return None;
        }
        let key = [buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]];
        offset += 4;
        Some(key)
    } else {
        None
    };

    if buf.len() < offset + payload_len {
        return None;
    }

    let mut payload = buf[offset..offset + payload_len].to_vec();
    if let Some(key) = mask_key {
        apply_mask(&mut payload, key);
    }

    Some(Decoded {
        frame: Frame { opcode, payload },
        consumed: offset + payload_len,
    })
}

/// XOR `key[i % 4]` over `payload` in place.
///
/// Masking is an involution: applying the same key twice restores the
/// original bytes, so this one function both masks and unmasks.
pub fn apply_mask(payload: &mut [u8], key: [u8; 4]) {
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte ^= key[i % 4];
    }
}
