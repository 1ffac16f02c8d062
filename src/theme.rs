use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::store::KeyValueStore;

/// Root element attribute and store key holding the active theme.
pub const THEME_ATTR: &str = "theme";
pub const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Whether the toggle control should be checked for this theme.
    pub fn is_checked(self) -> bool {
        matches!(self, Theme::Dark)
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTheme(pub String);

impl fmt::Display for UnknownTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown theme {:?}", self.0)
    }
}

impl std::error::Error for UnknownTheme {}

impl FromStr for Theme {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(UnknownTheme(other.to_string())),
        }
    }
}

/// The page's root element, as far as theming is concerned.
pub trait RootElement {
    fn attribute(&self, name: &str) -> Option<String>;
    fn set_attribute(&mut self, name: &str, value: &str);
}

pub fn compute_theme(checked: bool) -> Theme {
    if checked { Theme::Dark } else { Theme::Light }
}

pub fn apply_theme<R: RootElement + ?Sized>(root: &mut R, theme: Theme) {
    if root.attribute(THEME_ATTR).as_deref() == Some(theme.as_str()) {
        return;
    }
    root.set_attribute(THEME_ATTR, theme.as_str());
}

pub fn persist_theme<S: KeyValueStore + ?Sized>(store: &mut S, theme: Theme) {
    store.set(THEME_KEY, theme.as_str());
}

/// Reads the persisted theme back. Anything but `light`/`dark` counts as unset.
pub fn restore_theme<S: KeyValueStore + ?Sized>(store: &S) -> Option<Theme> {
    let raw = store.get(THEME_KEY)?;
    match raw.parse() {
        Ok(theme) => Some(theme),
        Err(err) => {
            tracing::debug!(%err, "ignoring stored theme");
            None
        }
    }
}

/// Owns the root element and the store for the toggle pipeline.
pub struct ThemeSwitch<R, S> {
    root: R,
    store: S,
}

impl<R: RootElement, S: KeyValueStore> ThemeSwitch<R, S> {
    pub fn new(root: R, store: S) -> Self {
        Self { root, store }
    }

    /// Runs compute, apply and persist, in that order.
    pub fn toggle(&mut self, checked: bool) -> Theme {
        let theme = compute_theme(checked);
        apply_theme(&mut self.root, theme);
        persist_theme(&mut self.store, theme);
        tracing::debug!(%theme, "theme switched");
        theme
    }

    pub fn root(&self) -> &R {
        &self.root
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::store::MemoryStore;

    #[derive(Default)]
    struct FakeRoot {
        attrs: HashMap<String, String>,
        writes: usize,
    }

    impl RootElement for FakeRoot {
        fn attribute(&self, name: &str) -> Option<String> {
            self.attrs.get(name).cloned()
        }

        fn set_attribute(&mut self, name: &str, value: &str) {
            self.writes += 1;
            self.attrs.insert(name.to_string(), value.to_string());
        }
    }

    #[test]
    fn checked_means_dark() {
        assert_eq!(compute_theme(true), Theme::Dark);
        assert_eq!(compute_theme(false), Theme::Light);
    }

    #[test]
    fn apply_twice_is_a_single_write() {
        let mut root = FakeRoot::default();
        apply_theme(&mut root, Theme::Dark);
        apply_theme(&mut root, Theme::Dark);
        assert_eq!(root.attribute("theme").as_deref(), Some("dark"));
        assert_eq!(root.writes, 1);

        apply_theme(&mut root, Theme::Light);
        assert_eq!(root.attribute("theme").as_deref(), Some("light"));
        assert_eq!(root.writes, 2);
    }

    #[test]
    fn persisted_theme_reads_back() {
        for theme in [Theme::Light, Theme::Dark] {
            let mut store = MemoryStore::default();
            persist_theme(&mut store, theme);
            persist_theme(&mut store, theme);
            assert_eq!(store.get("theme").as_deref(), Some(theme.as_str()));
            assert_eq!(restore_theme(&store), Some(theme));
        }
    }

    #[test]
    fn restore_ignores_garbage() {
        let mut store = MemoryStore::default();
        assert_eq!(restore_theme(&store), None);
        store.set("theme", "sepia");
        assert_eq!(restore_theme(&store), None);
    }

    #[test]
    fn toggle_runs_the_whole_pipeline() {
        let mut switch = ThemeSwitch::new(FakeRoot::default(), MemoryStore::default());

        assert_eq!(switch.toggle(true), Theme::Dark);
        assert_eq!(switch.root().attribute("theme").as_deref(), Some("dark"));
        assert_eq!(switch.store().get("theme").as_deref(), Some("dark"));

        assert_eq!(switch.toggle(false), Theme::Light);
        assert_eq!(switch.root().attribute("theme").as_deref(), Some("light"));
        assert_eq!(switch.store().get("theme").as_deref(), Some("light"));
    }

    #[test]
    fn theme_strings_are_exact() {
        assert_eq!("dark".parse::<Theme>(), Ok(Theme::Dark));
        assert!("Dark".parse::<Theme>().is_err());
        assert_eq!(Theme::Light.to_string(), "light");
        assert_eq!(serde_json::to_string(&Theme::Dark).unwrap(), "\"dark\"");
    }
}
