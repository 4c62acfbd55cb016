use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::ObjectId;

const TOKEN_BYTES: usize = 16; // 128 bits -> 22 base64url chars, no padding
const B64_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// A URL-safe, 22-character token minted from 128 bits of entropy. Distinct
/// from a plain `String` so that handlers can't accidentally accept an
/// arbitrary path segment as a token without going through `Token::parse`.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Token(String);

impl Token {
    /// Mint a fresh token. Collision probability is bounded by the 128 bits
    /// of entropy; the caller (the link store) is responsible for detecting
    /// the astronomically unlikely collision against its own keyspace.
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        Token(base64url_no_pad(&bytes))
    }

    pub fn parse(s: &str) -> Option<Self> {
        if s.is_empty() || !s.bytes().all(is_token_byte) {
            return None;
        }
        Some(Token(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

fn base64url_no_pad(bytes: &[u8]) -> String {
    let mut out = String::with_capacity((bytes.len() * 8).div_ceil(6));
    let mut bits = 0u32;
    let mut nbits = 0u32;
    for &b in bytes {
        bits = (bits << 8) | b as u32;
        nbits += 8;
        while nbits >= 6 {
            nbits -= 6;
            out.push(B64_ALPHABET[((bits >> nbits) & 0x3f) as usize] as char);
        }
    }
    if nbits > 0 {
        out.push(B64_ALPHABET[((bits << (6 - nbits)) & 0x3f) as usize] as char);
    }
    out
}

/// Keeps two front-end domains' tokens independent even when backed by a
/// shared store: a record tagged `Web` is invisible to a `get` that requires
/// `Webx`, and vice versa.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum DomainTag {
    Web,
    Webx,
}

/// Display metadata surfaced by `/api/generate` and `/prepare`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LinkDisplay {
    pub file_name: String,
    pub file_size: u64,
    pub mime_type: String,
    pub caption: String,
}

/// The indirection from a short token to the object it addresses. Records
/// are never modified after insert and never expire.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LinkRecord {
    pub token: Token,
    pub object_id: ObjectId,
    pub display: LinkDisplay,
    pub domain_tag: Option<DomainTag>,
    pub thumbnail_url: Option<String>,
    pub created_at: i64,
}
