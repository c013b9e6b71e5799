use url::Url;

/// A line of the input list that was not a usable URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedLine {
    /// 1-based line number in the input.
    pub line: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UrlList {
    pub urls: Vec<String>,
    pub rejected: Vec<RejectedLine>,
}

/// Parses the URL list: one URL per line, blank lines and `#` comments ignored,
/// a trailing `,` tolerated, anything that is not an http(s) URL rejected.
pub fn parse_url_list(raw: &str) -> UrlList {
    let mut list = UrlList::default();
    for (idx, line) in raw.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let candidate = trimmed.strip_suffix(',').unwrap_or(trimmed).trim();
        match Url::parse(candidate) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {
                list.urls.push(candidate.to_string());
            }
            _ => list.rejected.push(RejectedLine {
                line: idx + 1,
                text: trimmed.to_string(),
            }),
        }
    }
    list
}
