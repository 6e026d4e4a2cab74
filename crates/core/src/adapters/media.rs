use url::Url;

/// Rewrite a known video share link into its embeddable form.
///
/// Recognizes `https://www.youtube.com/watch?v=<id>` and
/// `https://youtu.be/<id>`; both become `https://www.youtube.com/embed/<id>`.
/// Any other link is returned unchanged. A missing or blank link yields `None`.
#[must_use]
pub fn to_embeddable(url: Option<&str>) -> Option<String> {
    let raw = url.map(str::trim).filter(|s| !s.is_empty())?;
    let Ok(parsed) = Url::parse(raw) else {
        return Some(raw.to_string());
    };

    let video_id = match parsed.host_str() {
        Some("youtu.be") => parsed
            .path_segments()
            .and_then(|mut segments| segments.next())
            .map(str::to_string),
        Some("youtube.com" | "www.youtube.com" | "m.youtube.com") if parsed.path() == "/watch" => {
            parsed
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned())
        }
        _ => None,
    };

    match video_id.filter(|id| !id.is_empty()) {
        Some(id) => Some(format!("https://www.youtube.com/embed/{id}")),
        None => Some(raw.to_string()),
    }
}
