use crate::events::{CHANGE, EventSource};
use crate::store::KeyValueStore;
use crate::theme::{RootElement, ThemeSwitch};
use crate::timestamp::{TimestampSlot, ViewerZone, convert_all_timestamps};
use crate::zoom::{ZoomBehavior, ZoomConfig};

/// What page-ready needs to find on a page.
pub trait Page {
    type Root: RootElement + 'static;
    type Timestamp: TimestampSlot;
    type Image;

    fn root(&self) -> Self::Root;

    /// Event target of the theme toggle control, if the page has one.
    fn theme_toggle(&self) -> Option<String>;

    fn timestamps(&self) -> Vec<Self::Timestamp>;

    fn zoom_images(&self) -> Vec<Self::Image>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadyReport {
    pub toggle: Option<String>,
    pub timestamps_converted: usize,
    pub images_zoomed: usize,
}

/// Wires the theme pipeline to `change` on `target`.
pub fn register_theme_toggle<E, R, S>(events: &mut E, target: &str, mut switch: ThemeSwitch<R, S>)
where
    E: EventSource + ?Sized,
    R: RootElement + 'static,
    S: KeyValueStore + 'static,
{
    events.on(
        target,
        CHANGE,
        Box::new(move |event| {
            if let Some(checked) = event.checked {
                switch.toggle(checked);
            }
        }),
    );
}

/// Everything that runs once the document is ready.
pub fn on_page_ready<P, E, S, Z>(
    page: &P,
    events: &mut E,
    store: S,
    zoom: &mut Z,
    zone: &ViewerZone,
) -> ReadyReport
where
    P: Page,
    E: EventSource + ?Sized,
    S: KeyValueStore + 'static,
    Z: ZoomBehavior<P::Image> + ?Sized,
{
    let toggle = page.theme_toggle();
    if let Some(target) = &toggle {
        register_theme_toggle(events, target, ThemeSwitch::new(page.root(), store));
    }

    let mut stamps = page.timestamps();
    let timestamps_converted = convert_all_timestamps(&mut stamps, zone);

    let images = page.zoom_images();
    zoom.attach(&images, &ZoomConfig::default());

    ReadyReport {
        toggle,
        timestamps_converted,
        images_zoomed: images.len(),
    }
}
