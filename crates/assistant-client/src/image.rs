use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{AssistantError, AssistantResult};

/// An uploaded image ready to be sent inline with a prompt
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl InlineImage {
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

/// Decode a `data:image/...;base64,` URL (or bare base64) from the browser.
///
/// The declared media type is ignored; the format is taken from the file signature.
pub fn decode_data_url(data_url: &str) -> AssistantResult<InlineImage> {
    let payload = match data_url.split_once(',') {
        Some((_, payload)) => payload,
        None => data_url,
    };
    let payload: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if payload.is_empty() {
        return Err(AssistantError::InvalidImage("empty image payload".to_string()));
    }

    let bytes = STANDARD
        .decode(payload.as_bytes())
        .map_err(|e| AssistantError::InvalidImage(e.to_string()))?;

    let mime_type = sniff_mime(&bytes)
        .ok_or_else(|| AssistantError::InvalidImage("unrecognised image data".to_string()))?;

    Ok(InlineImage { mime_type, bytes })
}

fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: [u8; 12] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

    #[test]
    fn test_decodes_png_data_url() {
        let url = format!("data:image/png;base64,{}", STANDARD.encode(PNG_HEADER));
        let image = decode_data_url(&url).unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.bytes, PNG_HEADER.to_vec());
        assert_eq!(image.to_base64(), STANDARD.encode(PNG_HEADER));
    }

    #[test]
    fn test_signature_wins_over_declared_type() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        let url = format!("data:image/png;base64,{}", STANDARD.encode(jpeg));
        assert_eq!(decode_data_url(&url).unwrap().mime_type, "image/jpeg");

        let mut webp = b"RIFF\x00\x00\x00\x00WEBPVP8 ".to_vec();
        webp.extend_from_slice(&[0; 4]);
        assert_eq!(decode_data_url(&STANDARD.encode(&webp)).unwrap().mime_type, "image/webp");
    }

    #[test]
    fn test_rejects_malformed_payloads() {
        for bad in ["", "data:image/png;base64,", "data:image/png;base64,@@@not-base64", "aGVsbG8gd29ybGQ="] {
            let err = decode_data_url(bad).unwrap_err();
            assert!(matches!(err, AssistantError::InvalidImage(_)), "{}", bad);
            assert!(err.is_client_error());
        }
    }
}
