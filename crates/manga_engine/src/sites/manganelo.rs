use super::{resolved_pages, unit_links, Layout, PageLink, SiteScraper, UnitLink};
use crate::html::{HtmlPage, MarkupError};

/// manganelo.com and its manganato mirrors. Chapter pages embed every image.
#[derive(Debug, Default)]
pub struct Manganelo;

impl SiteScraper for Manganelo {
    fn layout(&self) -> Layout {
        Layout::Chapters
    }

    fn parse_title(&self, page: &HtmlPage) -> Option<String> {
        page.first_text("div.story-info-right h1")
    }

    fn parse_units(&self, page: &HtmlPage) -> Result<Vec<UnitLink>, MarkupError> {
        let links = page.require_links("ul.row-content-chapter li.a-h a", "href")?;
        Ok(unit_links(links))
    }

    fn units_newest_first(&self) -> bool {
        true
    }

    fn parse_pages(&self, page: &HtmlPage) -> Result<Vec<PageLink>, MarkupError> {
        let images = page
            .require_links("div.container-chapter-reader img", "src")?
            .into_iter()
            .map(|(_, url)| url)
            .collect();
        Ok(resolved_pages(page.url(), images))
    }
}
