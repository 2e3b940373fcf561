use anyhow::{anyhow, Result};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::conversion::{now_millis, Conversion, NewConversion, TargetFormat};
use crate::infra::{codec, store::ConversionStore, uploads::UploadsDir};

pub const HISTORY_LIMIT: i64 = 10;

#[derive(Clone)]
pub struct ConversionService {
    store: Arc<dyn ConversionStore>,
    uploads: UploadsDir,
}

#[derive(Debug)]
pub struct ConvertedImage {
    pub record: Conversion,
    /// Path under which the asset is served, e.g. `/uploads/converted-1.png`.
    pub asset_path: String,
}

impl ConversionService {
    pub fn new(store: Arc<dyn ConversionStore>, uploads: UploadsDir) -> Self {
        Self { store, uploads }
    }

    /// Converts an already validated upload, writes the result to the uploads
    /// directory and records it.
    ///
    /// The asset name comes from the time the request started; when another
    /// conversion already holds that millisecond the next free one is used.
    /// There is no rollback: a failed insert leaves the written file behind.
    pub async fn convert(
        &self,
        original_name: String,
        data: Bytes,
        format: TargetFormat,
    ) -> Result<ConvertedImage> {
        let started_ms = now_millis();

        let encoded = tokio::task::spawn_blocking(move || codec::convert(&data, format))
            .await
            .map_err(|err| anyhow!("codec task panicked: {}", err))??;

        let (converted_name, size) = self
            .uploads
            .write_converted(started_ms, format, &encoded)
            .await?;

        let record = self
            .store
            .insert(NewConversion {
                original_name,
                converted_name: converted_name.clone(),
                format,
                size: i64::try_from(size)?,
            })
            .await?;

        info!(
            conversion_id = %record.id,
            converted_name = %record.converted_name,
            format = %format,
            size = record.size,
            "image converted"
        );

        Ok(ConvertedImage {
            asset_path: format!("/uploads/{}", converted_name),
            record,
        })
    }

    pub async fn history(&self) -> Result<Vec<Conversion>> {
        self.store.recent(HISTORY_LIMIT).await
    }

    /// Returns `false` when no record has this id.
    ///
    /// Removing the backing file is best-effort: a missing or undeletable file
    /// is logged and the record is removed anyway.
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let record = match self.store.find(id).await? {
            Some(record) => record,
            None => return Ok(false),
        };

        if let Err(err) = self.uploads.remove(&record.converted_name).await {
            warn!(
                error = %err,
                conversion_id = %id,
                converted_name = %record.converted_name,
                "converted file already deleted"
            );
        }

        self.store.delete(id).await?;
        info!(conversion_id = %id, "conversion deleted");
        Ok(true)
    }
}
