//! Canonical hashing and cache key derivation.
//!
//! Determinism policy:
//! - Documents are canonicalized with RFC 8785 (JCS) before hashing
//! - BLAKE3 everywhere, rendered as 64-char lowercase hex
//! - Generation cache keys are a pure function of the request fields

use serde::{Deserialize, Serialize};

use crate::document::RecipeDoc;
use crate::error::RecipeError;
use crate::request::GenerationRequest;

/// Content-addressed key identifying one resolved generation result.
///
/// Equal [`GenerationRequest`]s always map to the same key, byte for byte,
/// across processes and sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wraps an already-derived key string.
    ///
    /// Normal construction goes through [`request_cache_key`]; this exists
    /// for deserialized documents and tests.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a short prefix suitable for file names and log lines.
    ///
    /// Derived keys are lowercase hex, but deserialized documents can carry
    /// arbitrary strings, so the cut respects char boundaries.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(12) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Derives the cache key for a generation request.
///
/// The key is `hex(BLAKE3(canonical_request_string))` where the canonical
/// string lists every request field in a fixed order. No timestamps, no
/// hidden state.
pub fn request_cache_key(request: &GenerationRequest) -> CacheKey {
    let canonical = format!(
        "prompt:{},seed:{},size:{},slot_type:{}",
        request.prompt,
        request.seed,
        request.size,
        request.target_slot_type.as_str()
    );
    CacheKey(blake3::hash(canonical.as_bytes()).to_hex().to_string())
}

/// Derives a per-map seed from the request's base seed.
///
/// ```text
/// map_seed = truncate_u32(BLAKE3(base_seed || map_name))
/// ```
///
/// Used by generation backends to give each map of a set an independent
/// random stream while keeping the whole set reproducible.
pub fn derive_map_seed(base_seed: u32, map_name: &str) -> u32 {
    let mut input = Vec::with_capacity(4 + map_name.len());
    input.extend_from_slice(&base_seed.to_le_bytes());
    input.extend_from_slice(map_name.as_bytes());
    let hash = blake3::hash(&input);
    let bytes: [u8; 4] = hash.as_bytes()[0..4]
        .try_into()
        .unwrap_or([0, 0, 0, 0]);
    u32::from_le_bytes(bytes)
}

/// Computes the canonical BLAKE3 hash of a recipe document.
pub fn canonical_doc_hash(doc: &RecipeDoc) -> Result<String, RecipeError> {
    let value = doc.to_value()?;
    Ok(canonical_value_hash(&value))
}

/// Computes the canonical BLAKE3 hash of a JSON value.
pub fn canonical_value_hash(value: &serde_json::Value) -> String {
    blake3::hash(canonicalize_json(value).as_bytes())
        .to_hex()
        .to_string()
}

/// Canonicalizes a JSON value according to RFC 8785 (JCS).
///
/// Object keys sorted lexicographically, no whitespace, minimal string
/// escaping, stable number formatting.
pub fn canonicalize_json(value: &serde_json::Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &serde_json::Value, out: &mut String) {
    match value {
        serde_json::Value::Null => out.push_str("null"),
        serde_json::Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        serde_json::Value::Number(n) => write_canonical_number(n, out),
        serde_json::Value::String(s) => write_canonical_string(s, out),
        serde_json::Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical_string(key, out);
                out.push(':');
                if let Some(v) = map.get(*key) {
                    write_canonical(v, out);
                }
            }
            out.push('}');
        }
    }
}

fn write_canonical_number(n: &serde_json::Number, out: &mut String) {
    if let Some(i) = n.as_i64() {
        out.push_str(&i.to_string());
        return;
    }
    if let Some(u) = n.as_u64() {
        out.push_str(&u.to_string());
        return;
    }
    let Some(f) = n.as_f64() else {
        out.push_str("null");
        return;
    };
    // JCS treats non-finite values as null
    if f.is_nan() || f.is_infinite() {
        out.push_str("null");
        return;
    }
    if f == 0.0 {
        out.push('0');
        return;
    }
    if f.fract() == 0.0 && f.abs() < 1e15 {
        out.push_str(&(f as i64).to_string());
        return;
    }
    let rendered = format!("{}", f);
    if rendered.contains('.') && !rendered.contains('e') && !rendered.contains('E') {
        out.push_str(rendered.trim_end_matches('0').trim_end_matches('.'));
    } else {
        out.push_str(&rendered);
    }
}

fn write_canonical_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c < '\x20' => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
