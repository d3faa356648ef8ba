use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Raw bytes of a user-selected image plus the MIME type the browser reported.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl UploadedImage {
    pub fn new(bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        let mut mime = mime.into();
        if mime.trim().is_empty() {
            mime = sniff_mime(&bytes).unwrap_or_default().to_string();
        }
        UploadedImage { bytes, mime }
    }

    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Bare base64 of the bytes, without the `data:` prefix.
    pub fn base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// `data:<mime>;base64,<payload>`, the form the detection endpoint accepts.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.base64())
    }
}

/// Wraps a bare base64 JPEG (as returned by the detector) for display.
pub fn jpeg_data_url(payload: &str) -> String {
    if payload.starts_with("data:") {
        payload.to_string()
    } else {
        format!("data:image/jpeg;base64,{payload}")
    }
}

fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    const SIGNATURES: [(&[u8], &str); 5] = [
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"\xff\xd8\xff", "image/jpeg"),
        (b"GIF8", "image/gif"),
        (b"BM", "image/bmp"),
        (b"II*\0", "image/tiff"),
    ];
    SIGNATURES
        .iter()
        .find(|(magic, _)| bytes.starts_with(magic))
        .map(|(_, mime)| *mime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_prefix_and_payload() {
        let img = UploadedImage::new(b"hello".to_vec(), "image/png");
        assert_eq!(img.to_data_url(), "data:image/png;base64,aGVsbG8=");
        assert!(img.is_image());
    }

    #[test]
    fn missing_mime_is_sniffed() {
        let img = UploadedImage::new(vec![0xff, 0xd8, 0xff, 0xe0, 0, 0], "");
        assert_eq!(img.mime, "image/jpeg");
        let txt = UploadedImage::new(b"plain".to_vec(), "");
        assert!(!txt.is_image());
    }

    #[test]
    fn detector_payload_gets_jpeg_prefix() {
        assert_eq!(jpeg_data_url("QUJD"), "data:image/jpeg;base64,QUJD");
        assert_eq!(jpeg_data_url("data:image/png;base64,QUJD"), "data:image/png;base64,QUJD");
    }
}
