//! Client for the external image upload service.
//!
//! The service takes an unsigned upload against a fixed account and preset
//! and answers with a `secure_url`, which is stored verbatim as the recipe's
//! image reference.

use std::time::Duration;

use base64ct::{Base64, Encoding};
use serde::Deserialize;
use tracing::debug;
use url::form_urlencoded;

use crate::api::send_within;
use crate::error::UploadError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::Transport;

pub const DEFAULT_ENDPOINT: &str = "https://api.cloudinary.com/v1_1";
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// A file picked by the user.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
}

#[derive(Debug, Clone)]
pub struct ImageUploader {
    endpoint: String,
    cloud_name: String,
    upload_preset: String,
    timeout: Duration,
}

impl ImageUploader {
    pub fn new(cloud_name: impl Into<String>, upload_preset: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            cloud_name: cloud_name.into(),
            upload_preset: upload_preset.into(),
            timeout: DEFAULT_UPLOAD_TIMEOUT,
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Rejects files the service would refuse before anything is sent.
    pub fn validate(image: &ImageFile) -> Result<(), UploadError> {
        if !image.content_type.starts_with("image/") {
            return Err(UploadError::NotAnImage);
        }
        if image.bytes.len() > MAX_IMAGE_BYTES {
            return Err(UploadError::TooLarge {
                size: image.bytes.len(),
            });
        }
        Ok(())
    }

    pub fn build_upload(&self, image: &ImageFile) -> Result<HttpRequest, UploadError> {
        Self::validate(image)?;
        let data_uri = format!(
            "data:{};base64,{}",
            image.content_type,
            Base64::encode_string(&image.bytes)
        );
        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("file", &data_uri)
            .append_pair("upload_preset", &self.upload_preset)
            .finish();
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: format!("{}/{}/image/upload", self.endpoint, self.cloud_name),
            headers: vec![(
                "content-type".to_string(),
                "application/x-www-form-urlencoded".to_string(),
            )],
            body: Some(body),
        })
    }

    pub fn parse_upload(&self, response: HttpResponse) -> Result<String, UploadError> {
        if !response.is_success() {
            return Err(UploadError::Rejected {
                status: response.status,
            });
        }
        let parsed: UploadResponse = serde_json::from_str(&response.body)
            .map_err(|e| UploadError::Decode(e.to_string()))?;
        Ok(parsed.secure_url)
    }

    /// Upload `image` and return the URL the service assigned.
    pub async fn upload<T: Transport>(
        &self,
        transport: &T,
        image: &ImageFile,
    ) -> Result<String, UploadError> {
        let request = self.build_upload(image)?;
        debug!(file = %image.file_name, size = image.bytes.len(), "uploading image");
        let response = send_within(transport, request, self.timeout).await?;
        self.parse_upload(response)
    }
}
