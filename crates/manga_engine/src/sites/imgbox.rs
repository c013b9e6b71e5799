use url::Url;

use super::{image_by_id, Layout, PageLink, SiteScraper, UnitLink};
use crate::html::{HtmlPage, MarkupError};

/// imgbox.com galleries: a flat list of thumbnails, each linking to a page with the full image.
#[derive(Debug, Default)]
pub struct Imgbox;

impl SiteScraper for Imgbox {
    fn layout(&self) -> Layout {
        Layout::Flat
    }

    fn parse_title(&self, page: &HtmlPage) -> Option<String> {
        page.first_text("#gallery-view h1")
    }

    fn parse_units(&self, _page: &HtmlPage) -> Result<Vec<UnitLink>, MarkupError> {
        Ok(Vec::new())
    }

    fn parse_pages(&self, page: &HtmlPage) -> Result<Vec<PageLink>, MarkupError> {
        let links = page.require_links("div#gallery-view-content a", "href")?;
        Ok(links
            .into_iter()
            .map(|(_, url)| PageLink {
                page_url: url.to_string(),
                image_url: None,
            })
            .collect())
    }

    fn next_unit_page(&self, page: &HtmlPage) -> Option<Url> {
        page.first_link("a[rel=\"next\"]", "href")
    }

    fn parse_image_url(&self, page: &HtmlPage) -> Result<Url, MarkupError> {
        image_by_id(page)
    }
}
