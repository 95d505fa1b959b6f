//! Image references as stored on logs: `data:` URIs, http(s) URLs or local paths.

use anyhow::{anyhow, bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};

const FALLBACK_MIME: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq)]
pub struct DataUri {
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// MIME type of an encoded image, judged from its magic bytes.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or(FALLBACK_MIME)
}

pub fn to_data_uri(bytes: &[u8]) -> String {
    format!("data:{};base64,{}", sniff_mime(bytes), STANDARD.encode(bytes))
}

pub fn parse_data_uri(uri: &str) -> Result<DataUri> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| anyhow!("not a data URI"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| anyhow!("data URI has no payload separator"))?;
    let Some(mime) = header.strip_suffix(";base64") else {
        bail!("only base64 data URIs are supported");
    };

    let bytes = STANDARD
        .decode(payload.trim())
        .context("data URI payload is not valid base64")?;

    Ok(DataUri {
        mime: if mime.is_empty() {
            FALLBACK_MIME.to_string()
        } else {
            mime.to_string()
        },
        bytes,
    })
}

pub fn is_remote(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}

/// Fetch the bytes behind an image reference.
pub async fn resolve(reference: &str, client: &reqwest::Client) -> Result<Vec<u8>> {
    if reference.starts_with("data:") {
        return parse_data_uri(reference).map(|uri| uri.bytes);
    }

    if is_remote(reference) {
        let response = client
            .get(reference)
            .send()
            .await
            .with_context(|| format!("failed to fetch {reference}"))?
            .error_for_status()
            .with_context(|| format!("server refused {reference}"))?;
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("failed to read body of {reference}"))?;
        return Ok(bytes.to_vec());
    }

    tokio::fs::read(reference)
        .await
        .with_context(|| format!("failed to read image file {reference}"))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{DynamicImage, ImageFormat, RgbImage};

    use super::*;

    fn tiny_png() -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(2, 2))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn data_uri_carries_sniffed_mime() {
        let png = tiny_png();
        let uri = to_data_uri(&png);
        assert!(uri.starts_with("data:image/png;base64,"));

        let parsed = parse_data_uri(&uri).unwrap();
        assert_eq!(parsed.mime, "image/png");
        assert_eq!(parsed.bytes, png);
    }

    #[test]
    fn unknown_bytes_use_fallback_mime() {
        assert_eq!(sniff_mime(b"hello"), FALLBACK_MIME);
    }

    #[test]
    fn rejects_malformed_data_uris() {
        assert!(parse_data_uri("https://example.com/a.jpg").is_err());
        assert!(parse_data_uri("data:image/png;base64").is_err());
        assert!(parse_data_uri("data:text/plain,hello").is_err());
        assert!(parse_data_uri("data:image/png;base64,@@@").is_err());
    }

    #[tokio::test]
    async fn resolves_data_uris_and_files() {
        let client = reqwest::Client::new();
        let png = tiny_png();

        let from_uri = resolve(&to_data_uri(&png), &client).await.unwrap();
        assert_eq!(from_uri, png);

        let path = std::env::temp_dir().join(format!("carewatch-media-{}.png", uuid::Uuid::new_v4()));
        std::fs::write(&path, &png).unwrap();
        let from_file = resolve(path.to_str().unwrap(), &client).await.unwrap();
        assert_eq!(from_file, png);

        assert!(resolve("/definitely/missing.png", &client).await.is_err());
    }
}
