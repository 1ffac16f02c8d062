mod cli;
pub mod events;
mod fetcher;
pub mod html;
pub mod page;
pub mod store;
pub mod theme;
pub mod timestamp;
pub mod zoom;

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use anyhow::Context as _;
use events::{Event, EventBus};
use fetcher::{PageFetcher, RetryPolicy};
use html::HtmlPage;
use page::{Page as _, ReadyReport, on_page_ready};
use store::{JsonFileStore, KeyValueStore, MemoryStore};
use theme::{RootElement as _, THEME_ATTR, Theme, restore_theme};
use timestamp::ViewerZone;
use url::Url;

pub use cli::{Args as CliArgs, ToggleState};

/// What happened to one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enhanced {
    /// Theme read back from the store and applied before page-ready.
    pub restored: Option<Theme>,
    pub ready: ReadyReport,
    /// Theme left on the root after a simulated toggle change; `None` when the
    /// toggle already had the requested state and no change fired.
    pub toggled: Option<Theme>,
}

pub async fn run(args: CliArgs) -> anyhow::Result<Enhanced> {
    let html = load_input(&args.input, &args.user_agent).await?;
    let page = HtmlPage::parse(&html, args.selectors())?;

    let enhanced = match &args.store {
        Some(path) => {
            let store = Rc::new(RefCell::new(JsonFileStore::open(path)?));
            let enhanced = enhance(&page, store.clone(), &args.zone, args.toggle);
            store.borrow_mut().save()?;
            enhanced
        }
        None => {
            let store = Rc::new(RefCell::new(MemoryStore::default()));
            enhance(&page, store, &args.zone, args.toggle)
        }
    };

    write_output(&args.out, &page.to_html()?)?;

    tracing::info!(
        out = %args.out.display(),
        restored = ?enhanced.restored,
        toggle = ?enhanced.ready.toggle,
        timestamps = enhanced.ready.timestamps_converted,
        images = enhanced.ready.images_zoomed,
        toggled = ?enhanced.toggled,
        "page enhanced"
    );
    Ok(enhanced)
}

/// Restores the stored theme, runs page-ready, then replays the optional toggle change.
pub fn enhance<S>(
    page: &HtmlPage,
    store: Rc<RefCell<S>>,
    zone: &ViewerZone,
    toggle: Option<ToggleState>,
) -> Enhanced
where
    S: KeyValueStore + 'static,
{
    let restored = restore_theme(&store);
    if let Some(theme) = restored {
        page.restore_theme(theme);
    }

    let mut events = EventBus::new();
    let mut zoom = page.zoom();
    let ready = on_page_ready(page, &mut events, store, &mut zoom, zone);

    let mut toggled = None;
    if let Some(state) = toggle {
        match ready.toggle.as_deref() {
            Some(_) if page.toggle_checked() == Some(state.checked()) => {
                tracing::debug!(?state, "toggle already in that state; no change event");
            }
            Some(target) => {
                page.set_toggle_checked(state.checked());
                events.dispatch(&Event::change(target, state.checked()));
                toggled = page
                    .root()
                    .attribute(THEME_ATTR)
                    .and_then(|v| v.parse::<Theme>().ok());
            }
            None => tracing::warn!("page has no theme toggle; ignoring --toggle"),
        }
    }

    Enhanced {
        restored,
        ready,
        toggled,
    }
}

async fn load_input(input: &str, user_agent: &str) -> anyhow::Result<String> {
    let lowered = input.trim().to_ascii_lowercase();
    if lowered.starts_with("http://") || lowered.starts_with("https://") {
        let url = Url::parse(input.trim()).with_context(|| format!("parse url {input}"))?;
        let fetcher = PageFetcher::new(user_agent, RetryPolicy::default())?;
        return fetcher
            .fetch_page(&url)
            .await
            .with_context(|| format!("download {input}"));
    }
    std::fs::read_to_string(input).with_context(|| format!("read {input}"))
}

fn write_output(path: &Path, html: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
    }
    std::fs::write(path, html).with_context(|| format!("write {}", path.display()))
}
