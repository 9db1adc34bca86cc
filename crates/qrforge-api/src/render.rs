use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use image::Luma;
use qrcode::QrCode;

/// Rendered artifacts are at least this many pixels on a side. The renderer
/// keeps the standard quiet zone, so scanners can lock on.
const MIN_SIDE: u32 = 256;

/// Encode `text` as a QR symbol and rasterize it to PNG bytes.
pub fn encode_png(text: &str) -> Result<Vec<u8>> {
    let code =
        QrCode::new(text.as_bytes()).map_err(|e| anyhow!("QR encoding failed: {:?}", e))?;

    let img = code
        .render::<Luma<u8>>()
        .min_dimensions(MIN_SIDE, MIN_SIDE)
        .build();

    let mut buf = Vec::new();
    image::DynamicImage::ImageLuma8(img)
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .context("PNG encoding failed")?;

    Ok(buf)
}

/// Base64 data URL for a rendered PNG, so clients can display the code
/// without a second fetch.
pub fn data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", B64.encode(png))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(png: &[u8]) -> String {
        let img = image::load_from_memory(png).unwrap().to_luma8();
        let mut prepared = rqrr::PreparedImage::prepare(img);
        let grids = prepared.detect_grids();
        assert_eq!(grids.len(), 1, "expected exactly one QR symbol");
        let (_meta, content) = grids[0].decode().unwrap();
        content
    }

    #[test]
    fn png_decodes_back_to_input() {
        let text = "https://example.com/some/path?x=1";
        let png = encode_png(text).unwrap();
        assert_eq!(decode(&png), text);
    }

    #[test]
    fn non_url_payload_roundtrips() {
        let text = "WIFI:T:WPA;S:MyNetwork;P:hunter2;;";
        let png = encode_png(text).unwrap();
        assert_eq!(decode(&png), text);
    }

    #[test]
    fn oversized_payload_fails() {
        // Version 40 binary capacity tops out below 3000 bytes
        let text = "x".repeat(5000);
        assert!(encode_png(&text).is_err());
    }

    #[test]
    fn data_url_wraps_png_bytes() {
        let png = encode_png("hello").unwrap();
        let url = data_url(&png);
        let encoded = url.strip_prefix("data:image/png;base64,").unwrap();
        assert_eq!(B64.decode(encoded).unwrap(), png);
    }
}
