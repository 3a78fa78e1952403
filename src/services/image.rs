//! 处方图片校验
//!
//! 接受 `data:<mime>;base64,<data>` 或裸 base64，解码后按文件头判断格式。

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

use crate::errors::{MediRemindError, Result};
use crate::services::ai::InlineImage;

pub const MAX_IMAGE_SIZE_BYTES: usize = 5 * 1024 * 1024;
/// base64 文本上限（解码前）
pub const MAX_BASE64_LEN: usize = MAX_IMAGE_SIZE_BYTES * 14 / 10;
pub const ALLOWED_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/jpg", "image/webp"];

const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    WebP,
}

impl ImageFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::WebP => "image/webp",
        }
    }

    /// 按魔数识别
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageFormat::Jpeg)
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(ImageFormat::Png)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(ImageFormat::WebP)
        } else {
            None
        }
    }
}

/// 校验并解码上传的图片
pub fn decode_image_payload(payload: &str) -> Result<InlineImage> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Err(MediRemindError::invalid_image("Image data is required"));
    }

    let base64_data = match payload.strip_prefix("data:") {
        Some(rest) => {
            let (mime, data) = rest
                .split_once(";base64,")
                .filter(|(mime, data)| !mime.is_empty() && !data.is_empty())
                .ok_or_else(|| MediRemindError::invalid_image("Invalid data URI format"))?;

            if !ALLOWED_MIME_TYPES.contains(&mime.to_ascii_lowercase().as_str()) {
                return Err(MediRemindError::invalid_image(format!(
                    "Invalid image format: {}. Allowed formats: JPEG, PNG, WebP",
                    mime
                )));
            }
            data
        }
        None => payload,
    };

    if base64_data.len() > MAX_BASE64_LEN {
        return Err(too_large(None));
    }

    let compact: String = base64_data
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = LENIENT_BASE64
        .decode(compact.as_bytes())
        .map_err(|e| MediRemindError::invalid_image(format!("Invalid base64 image data: {}", e)))?;

    if bytes.len() > MAX_IMAGE_SIZE_BYTES {
        return Err(too_large(Some(bytes.len())));
    }

    let format = ImageFormat::sniff(&bytes).ok_or_else(|| {
        MediRemindError::invalid_image("Invalid image data: not a JPEG, PNG or WebP image")
    })?;

    Ok(InlineImage {
        mime_type: format.mime_type().to_string(),
        data: bytes,
    })
}

fn too_large(actual: Option<usize>) -> MediRemindError {
    let max_mb = MAX_IMAGE_SIZE_BYTES / (1024 * 1024);
    match actual {
        Some(size) => MediRemindError::invalid_image(format!(
            "Image too large ({}MB). Maximum size is {}MB",
            size / (1024 * 1024),
            max_mb
        )),
        None => MediRemindError::invalid_image(format!("Image too large. Maximum size is {}MB", max_mb)),
    }
}
