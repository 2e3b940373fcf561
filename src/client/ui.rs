use anyhow::Result;
use tracing::{error, warn};
use uuid::Uuid;

use crate::client::api::ConverterClient;
use crate::client::session::{HistoryView, Phase, UploadSession};
use crate::domain::conversion::TargetFormat;

/// Drives the converter API the way the web front end does: one upload
/// session, a history list refreshed after every change.
pub struct ConverterUi {
    api: ConverterClient,
    session: UploadSession,
    history: HistoryView,
}

impl ConverterUi {
    pub fn new(api: ConverterClient) -> Self {
        Self {
            api,
            session: UploadSession::new(),
            history: HistoryView::default(),
        }
    }

    pub fn api(&self) -> &ConverterClient {
        &self.api
    }

    pub fn session(&self) -> &UploadSession {
        &self.session
    }

    pub fn history(&self) -> &HistoryView {
        &self.history
    }

    /// Initial load; equivalent to [`refresh_history`](Self::refresh_history).
    pub async fn load(&mut self) {
        self.refresh_history().await;
    }

    /// A failed fetch is logged and keeps the previous list.
    pub async fn refresh_history(&mut self) {
        if let Err(err) = self.fetch_history().await {
            error!(error = ?err, "failed to fetch history");
        }
    }

    /// Like [`refresh_history`](Self::refresh_history), but hands the error
    /// back to the caller. The previous list is kept on failure.
    pub async fn fetch_history(&mut self) -> Result<()> {
        let entries = self.api.history().await?;
        self.history.replace(entries);
        Ok(())
    }

    pub fn select_file(&mut self, name: &str, data: Vec<u8>) -> Result<()> {
        self.session.select_file(name, data)
    }

    pub fn set_target_format(&mut self, format: TargetFormat) {
        self.session.set_target_format(format);
    }

    /// Converts the selected file; returns the absolute URL of the result.
    pub async fn convert(&mut self) -> Result<String> {
        let request = self.session.begin_convert()?;

        let result = self
            .api
            .convert(&request.file_name, &request.mime, request.data, request.format)
            .await
            .and_then(|path| Ok(self.api.asset_url(&path)?.to_string()));

        if self.session.finish_convert(&result) == Phase::Failed {
            if let Err(err) = &result {
                warn!(error = ?err, "failed to convert image");
            }
            return result;
        }

        self.refresh_history().await;
        result
    }

    pub async fn delete(&mut self, id: Uuid) -> Result<()> {
        if let Err(err) = self.api.delete(id).await {
            warn!(error = ?err, conversion_id = %id, "failed to delete image");
            return Err(err);
        }

        self.refresh_history().await;
        Ok(())
    }
}
