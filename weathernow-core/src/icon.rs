//! Condition icon download and decode.
//!
//! Failures here never reach the user: the snapshot is shown without an icon.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::{model::IconAsset, provider::WeatherProvider};

#[derive(Debug, Clone)]
pub struct IconLoader {
    provider: Arc<dyn WeatherProvider>,
}

impl IconLoader {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self { provider }
    }

    /// Fetch and decode the icon for `code`. `None` on any failure or absent code.
    pub async fn load(&self, code: Option<&str>) -> Option<IconAsset> {
        let code = code.filter(|c| !c.is_empty())?;

        let bytes = match self.provider.icon_bytes(code).await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(code, error = %err, "icon download failed");
                return None;
            }
        };

        match decode(code, &bytes) {
            Ok(asset) => {
                debug!(code, width = asset.width, height = asset.height, "icon decoded");
                Some(asset)
            }
            Err(err) => {
                warn!(code, error = %err, "icon decode failed");
                None
            }
        }
    }
}

fn decode(code: &str, bytes: &[u8]) -> Result<IconAsset, image::ImageError> {
    let rgba = image::load_from_memory(bytes)?.into_rgba8();
    Ok(IconAsset {
        code: code.to_string(),
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    })
}
