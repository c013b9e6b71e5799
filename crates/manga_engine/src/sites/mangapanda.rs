use super::{resolved_pages, unit_links, Layout, PageLink, SiteScraper, UnitLink};
use crate::html::{HtmlPage, MarkupError};

/// manga-panda.xyz. Chapter pages carry the image list as comma separated text in `#arraydata`.
#[derive(Debug, Default)]
pub struct MangaPanda;

impl SiteScraper for MangaPanda {
    fn layout(&self) -> Layout {
        Layout::Chapters
    }

    fn parse_title(&self, page: &HtmlPage) -> Option<String> {
        page.first_text("ul.manga-info-text h1")
    }

    fn parse_units(&self, page: &HtmlPage) -> Result<Vec<UnitLink>, MarkupError> {
        let links = page.require_links("div.chapter-list div.row a", "href")?;
        Ok(unit_links(links))
    }

    fn units_newest_first(&self) -> bool {
        true
    }

    fn parse_pages(&self, page: &HtmlPage) -> Result<Vec<PageLink>, MarkupError> {
        let data = page
            .raw_text("#arraydata")
            .ok_or_else(|| MarkupError::missing("#arraydata"))?;
        let images: Vec<_> = data
            .split(',')
            .filter_map(|raw| page.resolve(raw))
            .collect();
        if images.is_empty() {
            return Err(MarkupError("#arraydata lists no images".into()));
        }
        Ok(resolved_pages(page.url(), images))
    }
}
