//! Vision preprocessing
//!
//! Reads every media part of a request, checks the container by its magic
//! bytes and encodes it as base64. A bad image is fatal; a bad video is
//! reported as [`PrepareOutcome::VideoUndecodable`].

use crate::message::{
    EncodedMedia, GenerationRequest, MessagePart, PrepareOutcome, PreparedMessage, PreparedPart,
    PreparedRequest,
};
use crate::LlmError;
use base64::Engine;
use std::path::Path;
use tracing::debug;

/// Image containers accepted by [`sniff_image`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageFormat {
    /// MIME type used in data URLs
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Webp => "image/webp",
        }
    }
}

/// Video containers accepted by [`sniff_video`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum VideoFormat {
    Mp4,
    QuickTime,
    Matroska,
    Webm,
    Avi,
}

impl VideoFormat {
    /// MIME type used in data URLs
    pub fn mime_type(&self) -> &'static str {
        match self {
            VideoFormat::Mp4 => "video/mp4",
            VideoFormat::QuickTime => "video/quicktime",
            VideoFormat::Matroska => "video/x-matroska",
            VideoFormat::Webm => "video/webm",
            VideoFormat::Avi => "video/x-msvideo",
        }
    }
}

/// Identify an image container from its leading bytes
pub fn sniff_image(bytes: &[u8]) -> Option<ImageFormat> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(ImageFormat::Jpeg)
    } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some(ImageFormat::Png)
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some(ImageFormat::Gif)
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some(ImageFormat::Webp)
    } else {
        None
    }
}

/// Identify a video container from its leading bytes
pub fn sniff_video(bytes: &[u8]) -> Option<VideoFormat> {
    if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
        if &bytes[8..12] == b"qt  " {
            Some(VideoFormat::QuickTime)
        } else {
            Some(VideoFormat::Mp4)
        }
    } else if bytes.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        // DocType sits in the EBML header, well inside the first 64 bytes
        let header = &bytes[..bytes.len().min(64)];
        if header.windows(4).any(|w| w == b"webm") {
            Some(VideoFormat::Webm)
        } else {
            Some(VideoFormat::Matroska)
        }
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"AVI " {
        Some(VideoFormat::Avi)
    } else {
        None
    }
}

/// Read, validate and encode every media part of `request`
pub async fn prepare_request(request: &GenerationRequest) -> Result<PrepareOutcome, LlmError> {
    let mut messages = Vec::with_capacity(request.messages.len());
    for message in &request.messages {
        let mut parts = Vec::with_capacity(message.parts.len());
        for part in &message.parts {
            let prepared = match part {
                MessagePart::Text(text) => PreparedPart::Text(text.clone()),
                MessagePart::Image(path) => PreparedPart::Image(encode_image(path).await?),
                MessagePart::Video(path) => match encode_video(path).await {
                    Ok(media) => PreparedPart::Video(media),
                    Err(error) => {
                        return Ok(PrepareOutcome::VideoUndecodable {
                            path: path.clone(),
                            error,
                        })
                    }
                },
            };
            parts.push(prepared);
        }
        messages.push(PreparedMessage {
            role: message.role,
            parts,
        });
    }
    Ok(PrepareOutcome::Ready(PreparedRequest {
        messages,
        schema: request.schema.clone(),
    }))
}

async fn encode_image(path: &Path) -> Result<EncodedMedia, LlmError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| LlmError::Media {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let format = sniff_image(&bytes).ok_or_else(|| LlmError::Media {
        path: path.display().to_string(),
        reason: "unrecognised image format".to_string(),
    })?;
    debug!("Encoded {} ({}, {} bytes)", path.display(), format.mime_type(), bytes.len());
    Ok(encode(path, format.mime_type(), &bytes))
}

async fn encode_video(path: &Path) -> Result<EncodedMedia, String> {
    let bytes = tokio::fs::read(path).await.map_err(|e| e.to_string())?;
    let format = sniff_video(&bytes).ok_or_else(|| "unrecognised video container".to_string())?;
    debug!("Encoded {} ({}, {} bytes)", path.display(), format.mime_type(), bytes.len());
    Ok(encode(path, format.mime_type(), &bytes))
}

fn encode(path: &Path, mime: &'static str, bytes: &[u8]) -> EncodedMedia {
    EncodedMedia {
        path: path.to_path_buf(),
        mime,
        data: base64::engine::general_purpose::STANDARD.encode(bytes),
    }
}
