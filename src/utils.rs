use url::Url;

/// File extension a PAC script url path must end with.
pub const PAC_EXTENSION: &str = ".pac";

/// Checks a user supplied PAC url: `http`/`https`, a host, and a path ending
/// in `.pac`.
pub fn validate_pac_url(url: &str) -> bool {
    let url = url.trim();
    if url.is_empty() {
        return false;
    }
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return false;
    }
    parsed.path().ends_with(PAC_EXTENSION)
}

/// `(index, byte)` pairs, for tracing record contents.
pub fn hex_dump(data: &[u8]) -> Vec<(usize, String)> {
    data.iter()
        .enumerate()
        .map(|(i, b)| (i, format!("{b:#04x}")))
        .collect()
}
