use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::html::PageSelectors;
use crate::timestamp::ViewerZone;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ToggleState {
    /// Check the theme toggle (dark).
    On,
    /// Uncheck the theme toggle (light).
    Off,
}

impl ToggleState {
    pub fn checked(self) -> bool {
        matches!(self, ToggleState::On)
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Rendered post page: a local HTML file or an `http(s)://` URL.
    #[arg(long)]
    pub input: String,

    /// Where to write the enhanced HTML.
    #[arg(long, default_value = "enhanced.html")]
    pub out: PathBuf,

    /// JSON file standing in for the browser's local storage.
    ///
    /// A stored theme is applied before page-ready; a toggle change is written back.
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Viewer timezone: `local`, `utc` or a fixed offset such as `+02:00`.
    #[arg(long, default_value = "local")]
    pub zone: ViewerZone,

    /// Simulate the reader flipping the theme toggle after the page is ready.
    #[arg(long, value_enum)]
    pub toggle: Option<ToggleState>,

    /// CSS selector of the theme toggle checkbox.
    #[arg(long, default_value = "#theme-checkbox")]
    pub toggle_selector: String,

    /// CSS selector of the elements whose timestamps get localized.
    #[arg(long, default_value = ".comment-timestamp")]
    pub timestamp_selector: String,

    /// Attribute holding the ISO 8601 source timestamp.
    #[arg(long, default_value = "data-timestamp")]
    pub timestamp_attr: String,

    /// CSS selector of the images that get zoom.
    #[arg(long, default_value = ".post__content img")]
    pub zoom_selector: String,

    /// HTTP User-Agent used when `--input` is a URL.
    #[arg(long, default_value = "page-enhancer/0.1")]
    pub user_agent: String,
}

impl Args {
    pub fn selectors(&self) -> PageSelectors {
        PageSelectors {
            toggle: self.toggle_selector.clone(),
            timestamps: self.timestamp_selector.clone(),
            timestamp_attr: self.timestamp_attr.clone(),
            zoom_images: self.zoom_selector.clone(),
        }
    }
}
