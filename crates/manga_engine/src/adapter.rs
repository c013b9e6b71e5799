use std::collections::HashSet;
use std::sync::Arc;

use manga_core::{placeholder_title, ErrorKind, Page, Source, WorkUnit};
use manga_logging::{manga_debug, manga_info, manga_warn};

use crate::cache::SourceCache;
use crate::fetch::Fetcher;
use crate::html::{decode_document, looks_like_challenge, HtmlPage, MarkupError};
use crate::pacing::HostPacer;
use crate::sites::{Layout, PageLink, SiteKind, SiteScraper, UnitLink};
use crate::{FetchOutput, ScrapeError};

/// Upper bound on listing pages followed through "next" links.
const MAX_PAGINATION: usize = 64;

/// A discovered source plus the units whose page listing could not be read.
///
/// Failed units stay in the source with zero pages.
#[derive(Debug, Clone)]
pub struct Discovery {
    pub source: Source,
    pub unit_failures: Vec<ScrapeError>,
}

/// Drives one site's scraper over the network: discovery and image resolution.
#[derive(Clone)]
pub struct Adapter {
    kind: SiteKind,
    fetcher: Arc<dyn Fetcher>,
    pacer: Arc<HostPacer>,
}

/// Decoded body of a fetched document and the URL it ended up at.
struct Document {
    url: String,
    body: String,
}

impl Document {
    fn parse(&self) -> Result<HtmlPage, ScrapeError> {
        HtmlPage::parse(&self.url, &self.body).map_err(|err| ScrapeError::parse(&self.url, err.0))
    }

    /// Missing markup on a challenge interstitial means we were blocked, not that the site changed.
    fn markup_error(&self, err: MarkupError) -> ScrapeError {
        if looks_like_challenge(&self.body) {
            ScrapeError::new(
                ErrorKind::Blocked,
                &self.url,
                "bot challenge served instead of content",
            )
        } else {
            ScrapeError::parse(&self.url, err.0)
        }
    }
}

impl Adapter {
    pub fn new(kind: SiteKind, fetcher: Arc<dyn Fetcher>, pacer: Arc<HostPacer>) -> Self {
        Self {
            kind,
            fetcher,
            pacer,
        }
    }

    pub fn kind(&self) -> SiteKind {
        self.kind
    }

    pub async fn discover(&self, url: &str) -> Result<Discovery, ScrapeError> {
        self.discover_with(url, None).await
    }

    /// Lists the source's units and pages. Units whose pages are already known in
    /// `cache` are not fetched again.
    pub async fn discover_with(
        &self,
        url: &str,
        cache: Option<&SourceCache>,
    ) -> Result<Discovery, ScrapeError> {
        let scraper = self.kind.scraper();
        let landing = self.fetch_document(url).await?;
        let title = {
            let page = landing.parse()?;
            scraper.parse_title(&page)
        };
        let title = title.unwrap_or_else(|| {
            let fallback = placeholder_title(url);
            manga_warn!("No title found at {}; using {:?}", url, fallback);
            fallback
        });

        let discovery = match scraper.layout() {
            Layout::Flat => {
                let pages = self.collect_pages(scraper, landing).await?;
                Discovery {
                    source: Source::flat(url, title, pages),
                    unit_failures: Vec::new(),
                }
            }
            Layout::Chapters => {
                let cached = cache.and_then(|cache| cache.load(&title, url));
                self.discover_chapters(scraper, url, title, landing, cached.as_ref())
                    .await?
            }
        };

        manga_info!(
            "[{}] {:?}: {} unit(s), {} page(s)",
            self.kind,
            discovery.source.title,
            discovery.source.units.len(),
            discovery.source.page_count()
        );
        Ok(discovery)
    }

    async fn discover_chapters(
        &self,
        scraper: &dyn SiteScraper,
        url: &str,
        title: String,
        landing: Document,
        cached: Option<&Source>,
    ) -> Result<Discovery, ScrapeError> {
        let mut links = self.collect_units(scraper, landing).await?;
        if scraper.units_newest_first() {
            links.reverse();
        }

        let mut units = Vec::with_capacity(links.len());
        let mut unit_failures = Vec::new();
        for (pos, link) in links.into_iter().enumerate() {
            let mut unit = WorkUnit::chapter(pos as u32 + 1, link.name, link.url);
            let known = cached
                .and_then(|source| source.unit_by_url(&unit.url))
                .filter(|known| known.has_pages());
            if let Some(known) = known {
                manga_debug!("Reusing {} cached page(s) for {}", known.pages.len(), unit.url);
                unit.pages = known.pages.clone();
            } else {
                match self.list_unit_pages(scraper, &unit.url).await {
                    Ok(pages) => unit.pages = pages,
                    Err(err) => {
                        manga_warn!("Chapter {:?} has no pages: {}", unit.name, err);
                        unit_failures.push(err);
                    }
                }
            }
            units.push(unit);
        }

        let mut source = Source::new(url, title, units);
        if let Some(cached) = cached {
            source.retain_missing_units(cached);
        }
        Ok(Discovery {
            source,
            unit_failures,
        })
    }

    async fn collect_units(
        &self,
        scraper: &dyn SiteScraper,
        first: Document,
    ) -> Result<Vec<UnitLink>, ScrapeError> {
        let mut links = Vec::new();
        let mut seen = HashSet::new();
        let mut visited = HashSet::new();
        let mut doc = first;
        loop {
            visited.insert(doc.url.clone());
            let (found, next) = {
                let page = doc.parse()?;
                let found = scraper
                    .parse_units(&page)
                    .map_err(|err| doc.markup_error(err))?;
                (found, scraper.next_listing_page(&page))
            };
            links.extend(found.into_iter().filter(|link| seen.insert(link.url.clone())));

            let Some(next) = next.map(String::from).filter(|next| !visited.contains(next)) else {
                break;
            };
            if visited.len() >= MAX_PAGINATION {
                manga_warn!("Stopped following chapter listing pages at {}", next);
                break;
            }
            doc = self.fetch_document(&next).await?;
        }
        Ok(links)
    }

    async fn list_unit_pages(
        &self,
        scraper: &dyn SiteScraper,
        url: &str,
    ) -> Result<Vec<Page>, ScrapeError> {
        let doc = self.fetch_document(url).await?;
        self.collect_pages(scraper, doc).await
    }

    async fn collect_pages(
        &self,
        scraper: &dyn SiteScraper,
        first: Document,
    ) -> Result<Vec<Page>, ScrapeError> {
        let start_url = first.url.clone();
        let mut links: Vec<PageLink> = Vec::new();
        let mut visited = HashSet::new();
        let mut doc = first;
        loop {
            visited.insert(doc.url.clone());
            let (found, next) = {
                let page = doc.parse()?;
                let found = scraper
                    .parse_pages(&page)
                    .map_err(|err| doc.markup_error(err))?;
                (found, scraper.next_unit_page(&page))
            };
            links.extend(found);

            let Some(next) = next.map(String::from).filter(|next| !visited.contains(next)) else {
                break;
            };
            if visited.len() >= MAX_PAGINATION {
                manga_warn!("Stopped following page listing at {}", next);
                break;
            }
            doc = self.fetch_document(&next).await?;
        }

        if links.is_empty() {
            return Err(ScrapeError::parse(start_url, "no pages listed"));
        }
        Ok(links
            .into_iter()
            .enumerate()
            .map(|(pos, link)| Page {
                index: pos as u32 + 1,
                page_url: link.page_url,
                image_url: link.image_url,
            })
            .collect())
    }

    /// Final image URL for `page`, fetching its navigation document when the
    /// listing did not carry it.
    pub async fn resolve_image_url(&self, page: &Page) -> Result<String, ScrapeError> {
        if let Some(image_url) = &page.image_url {
            return Ok(image_url.clone());
        }
        let doc = self.fetch_document(&page.page_url).await?;
        let html = doc.parse()?;
        self.kind
            .scraper()
            .parse_image_url(&html)
            .map(String::from)
            .map_err(|err| doc.markup_error(err))
    }

    pub async fn fetch_image(&self, url: &str) -> Result<FetchOutput, ScrapeError> {
        self.pacer.wait(url).await;
        let output = self
            .fetcher
            .fetch(url)
            .await
            .map_err(|err| ScrapeError::from_fetch(url, err))?;

        if output.bytes.is_empty() {
            return Err(ScrapeError::new(
                ErrorKind::TransientNetwork,
                url,
                "empty image body",
            ));
        }
        let is_html = output
            .metadata
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.trim_start().to_ascii_lowercase().starts_with("text/html"));
        if is_html {
            let kind = if looks_like_challenge(&String::from_utf8_lossy(&output.bytes)) {
                ErrorKind::Blocked
            } else {
                ErrorKind::Parse
            };
            return Err(ScrapeError::new(kind, url, "expected an image, got html"));
        }
        Ok(output)
    }

    async fn fetch_document(&self, url: &str) -> Result<Document, ScrapeError> {
        self.pacer.wait(url).await;
        let output = self
            .fetcher
            .fetch(url)
            .await
            .map_err(|err| ScrapeError::from_fetch(url, err))?;
        let body = decode_document(&output.bytes, output.metadata.content_type.as_deref());
        let final_url = if output.metadata.final_url.is_empty() {
            url.to_string()
        } else {
            output.metadata.final_url
        };
        Ok(Document {
            url: final_url,
            body,
        })
    }
}
