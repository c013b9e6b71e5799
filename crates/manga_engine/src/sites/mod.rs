//! Site identifier and the per-site scrapers behind it.
//!
//! Every supported site is one [`SiteKind`] variant backed by a stateless
//! [`SiteScraper`]. Scrapers only look at parsed markup; fetching, pacing and
//! pagination are driven by [`crate::Adapter`].
mod imgbox;
mod manganelo;
mod mangapanda;
mod mangareader;

use std::fmt;

use url::Url;

use crate::html::{HtmlPage, MarkupError};

/// How a site arranges its pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// The landing page lists chapters; each chapter lists pages.
    Chapters,
    /// The landing page lists the pages directly.
    Flat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitLink {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    pub page_url: String,
    /// Present when the listing already carries the final image URL.
    pub image_url: Option<String>,
}

pub trait SiteScraper: Send + Sync {
    fn layout(&self) -> Layout;

    fn parse_title(&self, page: &HtmlPage) -> Option<String>;

    /// Chapters listed on one landing page, in document order.
    fn parse_units(&self, page: &HtmlPage) -> Result<Vec<UnitLink>, MarkupError>;

    /// Whether chapter listings put the newest chapter first.
    fn units_newest_first(&self) -> bool {
        false
    }

    fn next_listing_page(&self, _page: &HtmlPage) -> Option<Url> {
        None
    }

    /// Pages on one chapter page (or the landing page of a flat site), in reading order.
    fn parse_pages(&self, page: &HtmlPage) -> Result<Vec<PageLink>, MarkupError>;

    fn next_unit_page(&self, _page: &HtmlPage) -> Option<Url> {
        None
    }

    /// Extracts the image URL from a page's navigation document.
    fn parse_image_url(&self, _page: &HtmlPage) -> Result<Url, MarkupError> {
        Err(MarkupError(
            "this site lists image URLs directly; no page document to parse".into(),
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiteKind {
    Manganelo,
    MangaPanda,
    MangaReader,
    Imgbox,
}

static MANGANELO: manganelo::Manganelo = manganelo::Manganelo;
static MANGAPANDA: mangapanda::MangaPanda = mangapanda::MangaPanda;
static MANGAREADER: mangareader::MangaReader = mangareader::MangaReader;
static IMGBOX: imgbox::Imgbox = imgbox::Imgbox;

impl SiteKind {
    pub fn scraper(self) -> &'static dyn SiteScraper {
        match self {
            SiteKind::Manganelo => &MANGANELO,
            SiteKind::MangaPanda => &MANGAPANDA,
            SiteKind::MangaReader => &MANGAREADER,
            SiteKind::Imgbox => &IMGBOX,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SiteKind::Manganelo => "manganelo",
            SiteKind::MangaPanda => "mangapanda",
            SiteKind::MangaReader => "mangareader",
            SiteKind::Imgbox => "imgbox",
        }
    }
}

impl fmt::Display for SiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported site {url}: {reason}")]
pub struct UnsupportedSite {
    pub url: String,
    pub reason: String,
}

/// Host pattern lookup table. A pattern matches its exact host and any subdomain of it.
#[derive(Debug, Clone)]
pub struct SiteRegistry {
    entries: Vec<(String, SiteKind)>,
}

impl Default for SiteRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("manganelo.com", SiteKind::Manganelo);
        registry.register("manganato.com", SiteKind::Manganelo);
        registry.register("chapmanganato.com", SiteKind::Manganelo);
        registry.register("manga-panda.xyz", SiteKind::MangaPanda);
        registry.register("mangareader.net", SiteKind::MangaReader);
        registry.register("imgbox.com", SiteKind::Imgbox);
        registry
    }
}

impl SiteRegistry {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn register(&mut self, host_pattern: impl Into<String>, kind: SiteKind) {
        let pattern = host_pattern.into().trim().trim_matches('.').to_ascii_lowercase();
        self.entries.retain(|(existing, _)| *existing != pattern);
        self.entries.push((pattern, kind));
    }

    pub fn identify(&self, url: &str) -> Result<SiteKind, UnsupportedSite> {
        let unsupported = |reason: &str| UnsupportedSite {
            url: url.to_string(),
            reason: reason.to_string(),
        };
        let parsed = Url::parse(url.trim()).map_err(|_| unsupported("not a valid url"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(unsupported("scheme must be http or https"));
        }
        let host = parsed
            .host_str()
            .ok_or_else(|| unsupported("url has no host"))?
            .to_ascii_lowercase();

        self.entries
            .iter()
            .find(|(pattern, _)| host_matches(&host, pattern))
            .map(|(_, kind)| *kind)
            .ok_or_else(|| unsupported("no adapter registered for this host"))
    }
}

fn host_matches(host: &str, pattern: &str) -> bool {
    host == pattern
        || host
            .strip_suffix(pattern)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Turns listing links into owned page links with resolved image URLs.
pub(crate) fn resolved_pages(page_url: &Url, images: Vec<Url>) -> Vec<PageLink> {
    images
        .into_iter()
        .map(|image| PageLink {
            page_url: page_url.to_string(),
            image_url: Some(image.to_string()),
        })
        .collect()
}

/// The full-size image on a one-image page document.
pub(crate) fn image_by_id(page: &HtmlPage) -> Result<Url, MarkupError> {
    page.first_link("img#img", "src")
        .ok_or_else(|| MarkupError::missing("img#img"))
}

pub(crate) fn unit_links(links: Vec<(String, Url)>) -> Vec<UnitLink> {
    links
        .into_iter()
        .map(|(name, url)| UnitLink {
            name,
            url: url.to_string(),
        })
        .collect()
}
