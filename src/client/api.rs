use anyhow::{anyhow, bail, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;
use uuid::Uuid;

use crate::domain::conversion::{Conversion, TargetFormat};

/// HTTP client for the converter API.
#[derive(Clone, Debug)]
pub struct ConverterClient {
    http: reqwest::Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertReply {
    pub success: bool,
    pub converted_image: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteReply {
    pub success: bool,
    pub message: Option<String>,
}

#[derive(Deserialize)]
struct ErrorReply {
    error: String,
}

impl ConverterClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|err| anyhow!("invalid server url {}: {}", base_url, err))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for a server-relative path such as `/uploads/converted-1.png`.
    pub fn asset_url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|err| anyhow!("invalid asset path {}: {}", path, err))
    }

    /// Uploads an image and returns the server path of the converted asset.
    pub async fn convert(
        &self,
        file_name: &str,
        mime: &str,
        data: Vec<u8>,
        format: TargetFormat,
    ) -> Result<String> {
        let part = Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str(mime)?;
        let form = Form::new()
            .part("image", part)
            .text("targetFormat", format.as_str());

        let response = self
            .http
            .post(self.asset_url("/api/convert")?)
            .multipart(form)
            .send()
            .await?;

        let reply: ConvertReply = read_reply(response).await?;
        match reply.converted_image {
            Some(path) if reply.success => Ok(path),
            _ => bail!("Conversion failed"),
        }
    }

    pub async fn history(&self) -> Result<Vec<Conversion>> {
        let response = self
            .http
            .get(self.asset_url("/api/history")?)
            .send()
            .await?;
        read_reply(response).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let response = self
            .http
            .delete(self.asset_url(&format!("/api/images/{}", id))?)
            .send()
            .await?;

        let reply: DeleteReply = read_reply(response).await?;
        if !reply.success {
            bail!(reply.message.unwrap_or_else(|| "Deletion failed".to_string()));
        }
        Ok(())
    }

    /// Downloads a converted asset by its server path.
    pub async fn fetch_asset(&self, path: &str) -> Result<Vec<u8>> {
        let response = self.http.get(self.asset_url(path)?).send().await?;
        if !response.status().is_success() {
            bail!("failed to fetch {}: {}", path, response.status());
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Decodes a success body, or surfaces the server's `error` message.
async fn read_reply<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.bytes().await.unwrap_or_default();
    match serde_json::from_slice::<ErrorReply>(&body) {
        Ok(reply) => bail!(reply.error),
        Err(_) => bail!("request failed with status {}", status),
    }
}
