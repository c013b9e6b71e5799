use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Markup that bot-protection interstitials carry instead of the real page.
const CHALLENGE_MARKERS: &[&str] = &[
    "cf-chl-",
    "challenge-platform",
    "cf-browser-verification",
    "just a moment...",
    "attention required! | cloudflare",
    "g-recaptcha",
    "h-captcha",
    "ddos-guard",
];

/// Expected markup was missing from a page.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct MarkupError(pub String);

impl MarkupError {
    pub fn missing(what: &str) -> Self {
        Self(format!("expected markup not found: {what}"))
    }
}

/// Decode raw bytes into UTF-8 using: BOM -> Content-Type charset -> chardetng guess.
/// Undecodable sequences become U+FFFD rather than failing the page.
pub fn decode_document(bytes: &[u8], content_type: Option<&str>) -> String {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    if let Some(label) = content_type.and_then(extract_charset) {
        if let Some(enc) = Encoding::for_label(label.as_bytes()) {
            return decode_with(bytes, enc);
        }
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    decode_with(bytes, detector.guess(None, true))
}

fn extract_charset(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let (key, value) = part.trim().split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim_matches([' ', '"', '\''].as_ref()).to_string())
    })
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> String {
    let (text, _, _) = enc.decode(bytes);
    text.into_owned()
}

pub fn looks_like_challenge(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    CHALLENGE_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// A parsed HTML page and the URL it was fetched from.
///
/// `Html` is not `Send`; keep values of this type out of `.await` spans.
pub struct HtmlPage {
    url: Url,
    doc: Html,
}

impl HtmlPage {
    pub fn parse(url: &str, html: &str) -> Result<Self, MarkupError> {
        let url = Url::parse(url).map_err(|err| MarkupError(format!("invalid page url: {err}")))?;
        Ok(Self {
            url,
            doc: Html::parse_document(html),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Text of the first element matching `css`, whitespace collapsed. `None` if absent or blank.
    pub fn first_text(&self, css: &str) -> Option<String> {
        let selector = selector(css).ok()?;
        self.doc
            .select(&selector)
            .map(element_text)
            .find(|text| !text.is_empty())
    }

    /// `attr` of the first matching element, resolved against the page URL.
    pub fn first_link(&self, css: &str, attr: &str) -> Option<Url> {
        let selector = selector(css).ok()?;
        self.doc
            .select(&selector)
            .filter_map(|el| el.value().attr(attr))
            .find_map(|raw| resolve_url(raw, &self.url))
    }

    /// Every matching element as `(text, resolved attr)`, in document order.
    /// Elements without a usable `attr` are skipped.
    pub fn links(&self, css: &str, attr: &str) -> Result<Vec<(String, Url)>, MarkupError> {
        let selector = selector(css)?;
        Ok(self
            .doc
            .select(&selector)
            .filter_map(|el| {
                let url = resolve_url(el.value().attr(attr)?, &self.url)?;
                Some((element_text(el), url))
            })
            .collect())
    }

    /// Like [`HtmlPage::links`] but an empty result is a markup error.
    pub fn require_links(&self, css: &str, attr: &str) -> Result<Vec<(String, Url)>, MarkupError> {
        let links = self.links(css, attr)?;
        if links.is_empty() {
            return Err(MarkupError::missing(css));
        }
        Ok(links)
    }

    /// Raw (unjoined) text content of the first match, for script-like data blobs.
    pub fn raw_text(&self, css: &str) -> Option<String> {
        let selector = selector(css).ok()?;
        self.doc
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>())
    }

    pub fn resolve(&self, reference: &str) -> Option<Url> {
        resolve_url(reference, &self.url)
    }
}

fn selector(css: &str) -> Result<Selector, MarkupError> {
    Selector::parse(css).map_err(|err| MarkupError(format!("bad selector {css}: {err:?}")))
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn resolve_url(reference: &str, base: &Url) -> Option<Url> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with('#') || lower.starts_with("javascript:") || lower.starts_with("data:") {
        return None;
    }
    let url = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(_) => base.join(trimmed).ok()?,
    };
    matches!(url.scheme(), "http" | "https").then_some(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_with_header_charset() {
        let bytes = [0x63, 0x61, 0x66, 0xE9]; // "café" in latin1
        let text = decode_document(&bytes, Some("text/html; Charset=\"ISO-8859-1\""));
        assert_eq!(text, "café");
    }

    #[test]
    fn bom_wins_over_header() {
        let bytes = b"\xEF\xBB\xBFok";
        assert_eq!(decode_document(bytes, Some("text/html; charset=windows-1252")), "ok");
    }

    #[test]
    fn links_resolve_relative_and_skip_junk() {
        let page = HtmlPage::parse(
            "https://example.com/manga/a/",
            r##"<ul>
                <li><a href="ch-1"> Chapter
                    1 </a></li>
                <li><a href="#top">Top</a></li>
                <li><a href="javascript:void(0)">Js</a></li>
                <li><a>No href</a></li>
                <li><a href="https://cdn.example.com/x">Abs</a></li>
            </ul>"##,
        )
        .unwrap();
        let links = page.links("li a", "href").unwrap();
        let pairs: Vec<_> = links
            .iter()
            .map(|(text, url)| (text.as_str(), url.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("Chapter 1", "https://example.com/manga/a/ch-1"),
                ("Abs", "https://cdn.example.com/x"),
            ]
        );
    }

    #[test]
    fn require_links_reports_missing_markup() {
        let page = HtmlPage::parse("https://example.com/", "<p>nothing</p>").unwrap();
        let err = page.require_links("div.chapter-list a", "href").unwrap_err();
        assert!(err.0.contains("div.chapter-list a"));
    }

    #[test]
    fn challenge_markers_are_case_insensitive() {
        assert!(looks_like_challenge("<title>Just a moment...</title>"));
        assert!(!looks_like_challenge("<title>Chapter 3</title>"));
    }
}
