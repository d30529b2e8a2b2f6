//! `data:` URI helpers for images and audio.

use base64::{engine::general_purpose::STANDARD, Engine as _};

pub fn encode(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Wrap an already base64-encoded payload.
pub fn wrap_base64(mime: &str, payload: &str) -> String {
    format!("data:{};base64,{}", mime, payload.trim())
}

/// Split a base64 `data:` URI into its mime type and decoded bytes.
pub fn decode(uri: &str) -> Option<(String, Vec<u8>)> {
    let rest = uri.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let mime = meta.strip_suffix(";base64")?;
    let bytes = STANDARD.decode(payload.trim()).ok()?;
    Some((mime.to_string(), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_decode_keeps_mime_and_bytes() {
        let uri = encode("image/png", &[0x89, 0x50, 0x4e, 0x47]);
        assert!(uri.starts_with("data:image/png;base64,"));
        let (mime, bytes) = decode(&uri).unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, vec![0x89, 0x50, 0x4e, 0x47]);
    }

    #[test]
    fn decode_rejects_plain_urls() {
        assert!(decode("https://example.com/cat.png").is_none());
        assert!(decode("data:text/plain,hello").is_none());
    }
}
