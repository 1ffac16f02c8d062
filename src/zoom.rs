use serde::{Deserialize, Serialize};

/// Options handed to the image-zoom widget as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoomConfig {
    /// Animation duration in milliseconds.
    pub time: u32,
    pub padding: u32,
    pub offset: u32,
    pub keyboard: bool,
    pub cubic_bezier: String,
    pub background: String,
    pub z_index: u32,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            time: 300,
            padding: 40,
            offset: 40,
            keyboard: true,
            cubic_bezier: "cubic-bezier(.2, 0, .1, 1)".to_string(),
            background: "var(--bg-color)".to_string(),
            z_index: 2_147_483_647,
        }
    }
}

/// Something that can make a set of images zoomable.
pub trait ZoomBehavior<I> {
    fn attach(&mut self, images: &[I], config: &ZoomConfig);
}
