use url::Url;

use super::{image_by_id, unit_links, Layout, PageLink, SiteScraper, UnitLink};
use crate::html::{HtmlPage, MarkupError};

/// mangareader.net. One image per page document; the chapter page only offers a page menu.
#[derive(Debug, Default)]
pub struct MangaReader;

impl SiteScraper for MangaReader {
    fn layout(&self) -> Layout {
        Layout::Chapters
    }

    fn parse_title(&self, page: &HtmlPage) -> Option<String> {
        page.first_text("h2.aname")
    }

    fn parse_units(&self, page: &HtmlPage) -> Result<Vec<UnitLink>, MarkupError> {
        let links = page.require_links("table#listing td a", "href")?;
        Ok(unit_links(links))
    }

    fn parse_pages(&self, page: &HtmlPage) -> Result<Vec<PageLink>, MarkupError> {
        let options = page.require_links("select#pageMenu option", "value")?;
        Ok(options
            .into_iter()
            .map(|(_, url)| PageLink {
                page_url: url.to_string(),
                image_url: None,
            })
            .collect())
    }

    fn parse_image_url(&self, page: &HtmlPage) -> Result<Url, MarkupError> {
        image_by_id(page)
    }
}
