//! Client-side state for one upload cycle and for the history list.

use anyhow::{bail, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::ImageFormat;
use std::path::Path;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::domain::conversion::{Conversion, TargetFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    FileSelected,
    Converting,
    Converted,
    /// Reported by [`UploadSession::finish_convert`]; the session itself
    /// goes back to `FileSelected` so the user can retry.
    Failed,
}

#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub mime: String,
    pub data: Vec<u8>,
    /// `data:` URL built from the raw bytes, usable as a local preview.
    pub preview_url: String,
}

/// What gets sent to the convert endpoint.
#[derive(Debug, Clone)]
pub struct ConvertRequest {
    pub file_name: String,
    pub mime: String,
    pub data: Vec<u8>,
    pub format: TargetFormat,
}

#[derive(Debug)]
pub struct UploadSession {
    phase: Phase,
    selected: Option<SelectedFile>,
    target_format: TargetFormat,
    converted_url: Option<String>,
    last_error: Option<String>,
}

impl Default for UploadSession {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadSession {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            selected: None,
            target_format: TargetFormat::Jpeg,
            converted_url: None,
            last_error: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn selected(&self) -> Option<&SelectedFile> {
        self.selected.as_ref()
    }

    pub fn target_format(&self) -> TargetFormat {
        self.target_format
    }

    pub fn set_target_format(&mut self, format: TargetFormat) {
        self.target_format = format;
    }

    pub fn converted_url(&self) -> Option<&str> {
        self.converted_url.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Only the convert action is locked while a request is outstanding.
    pub fn can_convert(&self) -> bool {
        matches!(self.phase, Phase::FileSelected | Phase::Converted)
    }

    /// Selects a file if it is an image; anything else leaves the session untouched.
    pub fn select_file(&mut self, name: &str, data: Vec<u8>) -> Result<()> {
        if self.phase == Phase::Converting {
            bail!("a conversion is already in progress");
        }

        let mime = sniff_mime(name, &data);
        if !mime.starts_with("image/") {
            bail!("{} is not an image", name);
        }

        let preview_url = format!("data:{};base64,{}", mime, STANDARD.encode(&data));
        self.selected = Some(SelectedFile {
            name: name.to_string(),
            mime,
            data,
            preview_url,
        });
        self.converted_url = None;
        self.last_error = None;
        self.phase = Phase::FileSelected;
        Ok(())
    }

    pub fn begin_convert(&mut self) -> Result<ConvertRequest> {
        if !self.can_convert() {
            bail!("nothing to convert");
        }
        let selected = match &self.selected {
            Some(selected) => selected,
            None => bail!("no file selected"),
        };

        let request = ConvertRequest {
            file_name: selected.name.clone(),
            mime: selected.mime.clone(),
            data: selected.data.clone(),
            format: self.target_format,
        };
        self.phase = Phase::Converting;
        Ok(request)
    }

    /// Applies the outcome of the request started by [`begin_convert`].
    ///
    /// [`begin_convert`]: UploadSession::begin_convert
    pub fn finish_convert(&mut self, result: &Result<String>) -> Phase {
        match result {
            Ok(url) => {
                self.converted_url = Some(url.clone());
                self.last_error = None;
                self.phase = Phase::Converted;
                Phase::Converted
            }
            Err(err) => {
                self.last_error = Some(err.to_string());
                self.phase = Phase::FileSelected;
                Phase::Failed
            }
        }
    }
}

/// MIME type from the file contents, falling back to the extension.
fn sniff_mime(name: &str, data: &[u8]) -> String {
    image::guess_format(data)
        .or_else(|_| ImageFormat::from_path(Path::new(name)))
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|_| "application/octet-stream".to_string())
}

/// Last fetched history list.
#[derive(Debug, Default)]
pub struct HistoryView {
    entries: Vec<Conversion>,
}

impl HistoryView {
    pub fn replace(&mut self, entries: Vec<Conversion>) {
        self.entries = entries;
    }

    pub fn entries(&self) -> &[Conversion] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn render(&self) -> Vec<String> {
        if self.entries.is_empty() {
            return vec!["No conversion history yet".to_string()];
        }

        self.entries
            .iter()
            .map(|entry| {
                format!(
                    "{}  {}  Converted to {} • {}  {}",
                    entry.id,
                    entry.original_name,
                    entry.format.as_str().to_uppercase(),
                    format_size(entry.size),
                    format_date(entry.created_at),
                )
            })
            .collect()
    }
}

pub fn format_size(bytes: i64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}

pub fn format_date(at: OffsetDateTime) -> String {
    let description =
        format_description!("[month repr:short] [day padding:none], [year], [hour]:[minute]");
    at.format(&description).unwrap_or_else(|_| at.to_string())
}
