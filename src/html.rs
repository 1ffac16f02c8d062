use anyhow::{Context as _, anyhow};
use kuchiki::traits::TendrilSink as _;
use kuchiki::{ElementData, NodeDataRef, NodeRef};
use maud::{PreEscaped, html};

use crate::page::Page;
use crate::theme::{RootElement, Theme, apply_theme};
use crate::timestamp::TimestampSlot;
use crate::zoom::{ZoomBehavior, ZoomConfig};

pub const ZOOM_CONFIG_ID: &str = "zoom-config";
pub const ZOOMABLE_ATTR: &str = "data-zoomable";

/// Where the page-ready pieces live in a rendered post page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelectors {
    pub toggle: String,
    pub timestamps: String,
    pub timestamp_attr: String,
    pub zoom_images: String,
}

impl Default for PageSelectors {
    fn default() -> Self {
        Self {
            toggle: "#theme-checkbox".to_string(),
            timestamps: ".comment-timestamp".to_string(),
            timestamp_attr: "data-timestamp".to_string(),
            zoom_images: ".post__content img".to_string(),
        }
    }
}

impl PageSelectors {
    fn validate(&self) -> anyhow::Result<()> {
        for selector in [&self.toggle, &self.timestamps, &self.zoom_images] {
            kuchiki::Selectors::compile(selector)
                .map_err(|()| anyhow!("invalid css selector {selector:?}"))?;
        }
        if self.timestamp_attr.trim().is_empty() {
            anyhow::bail!("timestamp attribute name must not be empty");
        }
        Ok(())
    }
}

/// A parsed HTML document acting as the page host.
pub struct HtmlPage {
    document: NodeRef,
    selectors: PageSelectors,
}

impl HtmlPage {
    pub fn parse(html: &str, selectors: PageSelectors) -> anyhow::Result<Self> {
        selectors.validate()?;
        Ok(Self {
            document: kuchiki::parse_html().one(html),
            selectors,
        })
    }

    pub fn document(&self) -> &NodeRef {
        &self.document
    }

    pub fn to_html(&self) -> anyhow::Result<String> {
        let mut out = Vec::new();
        self.document
            .serialize(&mut out)
            .context("serialize document")?;
        String::from_utf8(out).context("document html not utf-8")
    }

    fn toggle_element(&self) -> Option<NodeDataRef<ElementData>> {
        self.document.select_first(&self.selectors.toggle).ok()
    }

    pub fn toggle_checked(&self) -> Option<bool> {
        self.toggle_element()
            .map(|el| el.attributes.borrow().contains("checked"))
    }

    /// Returns `false` when the page has no toggle.
    pub fn set_toggle_checked(&self, checked: bool) -> bool {
        let Some(el) = self.toggle_element() else {
            return false;
        };
        let mut attrs = el.attributes.borrow_mut();
        if checked {
            attrs.insert("checked", String::new());
        } else {
            attrs.remove("checked");
        }
        true
    }

    /// Brings the page in line with a previously stored theme.
    pub fn restore_theme(&self, theme: Theme) {
        apply_theme(&mut self.root(), theme);
        self.set_toggle_checked(theme.is_checked());
    }

    pub fn zoom(&self) -> HtmlZoom {
        HtmlZoom {
            document: self.document.clone(),
        }
    }
}

impl Page for HtmlPage {
    type Root = HtmlRoot;
    type Timestamp = HtmlTimestamp;
    type Image = NodeDataRef<ElementData>;

    fn root(&self) -> HtmlRoot {
        let node = self
            .document
            .select_first("html")
            .map(|n| n.as_node().clone())
            .unwrap_or_else(|()| self.document.clone());
        HtmlRoot(node)
    }

    fn theme_toggle(&self) -> Option<String> {
        let el = self.toggle_element()?;
        let id = el
            .attributes
            .borrow()
            .get("id")
            .filter(|id| !id.is_empty())
            .map(|id| id.to_string());
        Some(id.unwrap_or_else(|| self.selectors.toggle.clone()))
    }

    fn timestamps(&self) -> Vec<HtmlTimestamp> {
        let mut out = Vec::new();
        if let Ok(nodes) = self.document.select(&self.selectors.timestamps) {
            for element in nodes {
                out.push(HtmlTimestamp {
                    element,
                    attr: self.selectors.timestamp_attr.clone(),
                });
            }
        }
        out
    }

    fn zoom_images(&self) -> Vec<NodeDataRef<ElementData>> {
        match self.document.select(&self.selectors.zoom_images) {
            Ok(nodes) => nodes.collect(),
            Err(()) => Vec::new(),
        }
    }
}

/// The `<html>` element.
#[derive(Clone)]
pub struct HtmlRoot(NodeRef);

impl RootElement for HtmlRoot {
    fn attribute(&self, name: &str) -> Option<String> {
        let el = self.0.as_element()?;
        el.attributes.borrow().get(name).map(|v| v.to_string())
    }

    fn set_attribute(&mut self, name: &str, value: &str) {
        if let Some(el) = self.0.as_element() {
            el.attributes.borrow_mut().insert(name, value.to_string());
        }
    }
}

pub struct HtmlTimestamp {
    element: NodeDataRef<ElementData>,
    attr: String,
}

impl HtmlTimestamp {
    pub fn text(&self) -> String {
        self.element.as_node().text_contents()
    }
}

impl TimestampSlot for HtmlTimestamp {
    fn source(&self) -> Option<String> {
        self.element
            .attributes
            .borrow()
            .get(self.attr.as_str())
            .map(|v| v.to_string())
    }

    fn set_text(&mut self, text: &str) {
        let node = self.element.as_node();
        for child in node.children().collect::<Vec<_>>() {
            child.detach();
        }
        node.append(NodeRef::new_text(text));
    }
}

/// Marks images as zoomable and embeds the widget options as JSON for the page's script.
pub struct HtmlZoom {
    document: NodeRef,
}

impl HtmlZoom {
    fn config_node(config: &ZoomConfig) -> anyhow::Result<NodeRef> {
        let json = serde_json::to_string(config).context("serialize zoom config")?;
        let markup = html! {
            script type="application/json" id=(ZOOM_CONFIG_ID) {
                (PreEscaped(json.replace("</", "<\\/")))
            }
        };
        let fragment = kuchiki::parse_html().one(markup.into_string());
        let script = fragment
            .select_first("script")
            .map_err(|()| anyhow!("zoom config markup has no <script>"))?;
        Ok(script.as_node().clone())
    }
}

impl ZoomBehavior<NodeDataRef<ElementData>> for HtmlZoom {
    fn attach(&mut self, images: &[NodeDataRef<ElementData>], config: &ZoomConfig) {
        if images.is_empty() {
            return;
        }
        for image in images {
            image
                .attributes
                .borrow_mut()
                .insert(ZOOMABLE_ATTR, String::new());
        }

        let script = match Self::config_node(config) {
            Ok(node) => node,
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "zoom config not embedded");
                return;
            }
        };

        if let Ok(stale) = self.document.select(&format!("script#{ZOOM_CONFIG_ID}")) {
            for node in stale.collect::<Vec<_>>() {
                node.as_node().detach();
            }
        }
        match self.document.select_first("body") {
            Ok(body) => body.as_node().append(script),
            Err(()) => self.document.append(script),
        }
    }
}
