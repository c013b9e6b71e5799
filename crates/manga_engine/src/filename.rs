use url::Url;

const DEFAULT_EXTENSION: &str = "jpg";

/// File stem for a page: its index zero-padded to at least three digits,
/// wider when the unit holds 1000 pages or more.
pub fn page_stem(index: u32, pages_in_unit: usize) -> String {
    let width = pages_in_unit.to_string().len().max(3);
    format!("{index:0width$}")
}

/// Extension from the image URL path, else from the content type, else `jpg`.
pub fn image_extension(image_url: &str, content_type: Option<&str>) -> String {
    extension_from_url(image_url)
        .or_else(|| content_type.and_then(extension_from_content_type))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

fn extension_from_url(image_url: &str) -> Option<String> {
    let url = Url::parse(image_url).ok()?;
    let last = url.path_segments()?.last()?;
    let (_, ext) = last.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    let valid = !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| if ext == "jpeg" { "jpg".to_string() } else { ext })
}

fn extension_from_content_type(content_type: &str) -> Option<String> {
    let mime = content_type.split(';').next()?.trim().to_ascii_lowercase();
    let ext = match mime.as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/avif" => "avif",
        "image/bmp" => "bmp",
        _ => return None,
    };
    Some(ext.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_stems_are_zero_padded() {
        assert_eq!(page_stem(1, 3), "001");
        assert_eq!(page_stem(42, 999), "042");
        assert_eq!(page_stem(7, 1200), "0007");
    }

    #[test]
    fn extension_prefers_url_then_content_type() {
        assert_eq!(image_extension("https://x/a/01.PNG?token=1", None), "png");
        assert_eq!(image_extension("https://x/a/01.jpeg", None), "jpg");
        assert_eq!(image_extension("https://x/a/img", Some("image/webp")), "webp");
        assert_eq!(image_extension("https://x/a/img.php-x", Some("text/html")), "jpg");
        assert_eq!(image_extension("https://x/a/", None), "jpg");
    }
}
