//! Client side of the converter: HTTP calls, upload session state and the
//! history list, driven together by [`ConverterUi`].

pub mod api;
pub mod session;
pub mod ui;

pub use api::ConverterClient;
pub use session::{HistoryView, Phase, UploadSession};
pub use ui::ConverterUi;
