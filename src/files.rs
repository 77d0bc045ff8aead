//! Static file fallback for `GET`/`HEAD` requests no route matched.

use std::fmt::Write as _;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::response::Response;

pub(crate) struct FileServer {
    root: PathBuf,
    listing: bool,
}

impl FileServer {
    pub(crate) fn new(root: PathBuf, listing: bool) -> Self {
        Self { root, listing }
    }

    /// Joins the percent-decoded segments of `url_path` onto the root.
    ///
    /// Each segment must decode to a single plain name (or `.`). Parent
    /// references, separators smuggled in as `%2F`/`%5C` and invalid UTF-8
    /// are refused.
    fn map_path(&self, url_path: &str) -> Option<PathBuf> {
        let mut path = self.root.clone();
        for raw in url_path.split('/').filter(|s| !s.is_empty()) {
            let name = urlencoding::decode(raw).ok()?;
            if name.contains(['/', '\\']) {
                return None;
            }
            match Path::new(&*name).components().next() {
                Some(Component::Normal(name)) => path.push(name),
                Some(Component::CurDir) => {}
                _ => return None,
            }
        }
        Some(path)
    }

    /// `None` means "not here": the caller falls through to not-found.
    pub(crate) async fn serve(&self, url_path: &str) -> Option<Response> {
        let Some(path) = self.map_path(url_path) else {
            debug!(path = url_path, "refusing file path outside the root");
            return None;
        };
        let meta = tokio::fs::metadata(&path).await.ok()?;

        if !meta.is_dir() {
            return read(&path).await;
        }
        let index = path.join("index.html");
        if let Some(res) = read(&index).await {
            return Some(res);
        }
        if self.listing {
            return list(&path, url_path).await;
        }
        None
    }
}

async fn read(path: &Path) -> Option<Response> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Some(Response::builder().bytes(content_type(path), bytes)),
        Err(e) => {
            debug!(path = %path.display(), "file not served: {e}");
            None
        }
    }
}

async fn list(dir: &Path, url_path: &str) -> Option<Response> {
    let mut entries = tokio::fs::read_dir(dir).await.ok()?;
    let mut names = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type().await.is_ok_and(|t| t.is_dir()) {
            name.push('/');
        }
        names.push(name);
    }
    names.sort();

    let base = url_path.trim_end_matches('/');
    let mut html = String::from("<!doctype html>\n<pre>\n");
    for name in &names {
        let href = urlencoding::encode(name.trim_end_matches('/'));
        let slash = if name.ends_with('/') { "/" } else { "" };
        let _ = writeln!(html, "<a href=\"{}/{href}{slash}\">{}</a>", escape(base), escape(name));
    }
    html.push_str("</pre>\n");
    Some(Response::builder().html(html))
}

fn content_type(path: &Path) -> &'static str {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css",
        "js" | "mjs" => "application/javascript",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(listing: bool) -> FileServer {
        FileServer::new(PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/static")), listing)
    }

    fn body(res: &Response) -> String {
        String::from_utf8_lossy(res.body()).into_owned()
    }

    #[test]
    fn map_path_prevents_traversal() {
        let fs = files(false);
        assert!(fs.map_path("/../Cargo.toml").is_none());
        assert!(fs.map_path("/docs/../../Cargo.toml").is_none());
        assert!(fs.map_path("/./hello.txt").is_some());
        assert!(fs.map_path("/%2E%2E/Cargo.toml").is_none());
        assert!(fs.map_path("/docs/..%2F..%2FCargo.toml").is_none());
        assert!(fs.map_path("/docs/%5C..").is_none());
        assert!(fs.map_path("/%FF").is_none());
    }

    #[test]
    fn map_path_decodes_segments() {
        let fs = files(false);
        assert_eq!(fs.map_path("/docs/a%26b.txt"), Some(fs.root.join("docs").join("a&b.txt")));
        assert_eq!(fs.map_path("/a%20b"), Some(fs.root.join("a b")));
    }

    #[tokio::test]
    async fn serves_names_that_need_escaping() {
        let res = files(false).serve("/docs/a%26b.txt").await.expect("decoded name exists");
        assert_eq!(body(&res), "a & b\n");
    }

    #[tokio::test]
    async fn serves_plain_file() {
        let res = files(false).serve("/hello.txt").await.expect("file exists");
        assert_eq!(res.header("content-type"), Some("text/plain; charset=utf-8"));
        assert_eq!(body(&res), "Hello\n");
    }

    #[tokio::test]
    async fn directory_serves_index() {
        let res = files(false).serve("/site/").await.expect("index exists");
        assert_eq!(body(&res), "<h1>site</h1>\n");
    }

    #[tokio::test]
    async fn listing_only_when_enabled() {
        assert!(files(false).serve("/docs").await.is_none());

        let res = files(true).serve("/docs").await.expect("listing enabled");
        let html = body(&res);
        assert!(html.contains(r#"<a href="/docs/a%26b.txt">a&amp;b.txt</a>"#), "{html}");
        assert!(html.contains(r#"<a href="/docs/style.css">style.css</a>"#), "{html}");
    }

    #[tokio::test]
    async fn missing_file_falls_through() {
        assert!(files(true).serve("/nope.txt").await.is_none());
        assert!(files(true).serve("/../Cargo.toml").await.is_none());
    }
}
