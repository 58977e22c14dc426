// ── Location matching ──
//
// A `path?query` location as a navigation layer would hold it, plus the
// prefix tests used to decide which links and tabs are active. Only the
// `nid`, `tab` and `main-tab` query parameters carry meaning here.

use std::fmt;

use url::form_urlencoded;

/// Query parameter holding the selected node key.
pub const NID_PARAM: &str = "nid";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    path: String,
    query: Vec<(String, String)>,
}

impl Location {
    /// Parse `path?query`; a leading `#` is ignored.
    pub fn parse(text: &str) -> Self {
        let text = text.strip_prefix('#').unwrap_or(text);
        let (path, query) = text.split_once('?').unwrap_or((text, ""));
        Self {
            path: path.to_string(),
            query: form_urlencoded::parse(query.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path without its leading `/`.
    pub fn stripped_path(&self) -> &str {
        self.path.strip_prefix('/').unwrap_or(&self.path)
    }

    pub fn query(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set (or replace) a query parameter.
    pub fn set_query(&mut self, key: &str, value: &str) {
        match self.query.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.query.push((key.to_string(), value.to_string())),
        }
    }

    /// Selected node key, if the location carries one.
    pub fn nid(&self) -> Option<&str> {
        self.query(NID_PARAM).filter(|nid| !nid.is_empty())
    }

    /// True when the current path starts with `href`. An empty current
    /// path only matches an empty link.
    pub fn is_link_active(&self, href: &str) -> bool {
        let path = self.stripped_path();
        let link = normalize_link(href);
        if path.is_empty() {
            link == path
        } else {
            path.starts_with(link)
        }
    }

    /// True when the current path starts with `href`, even when empty.
    pub fn is_link_prefix_active(&self, href: &str) -> bool {
        self.stripped_path().starts_with(normalize_link(href))
    }

    /// The `tab` parameter wins when present; otherwise falls back to the path.
    pub fn is_top_tab_active(&self, path: &str) -> bool {
        match self.query("tab") {
            Some(tab) => tab.starts_with(path),
            None => self.is_link_active(path),
        }
    }

    pub fn is_main_tab_active(&self, path: &str) -> bool {
        self.query("main-tab") == Some(path)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        if !self.query.is_empty() {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&self.query)
                .finish();
            write!(f, "?{query}")?;
        }
        Ok(())
    }
}

/// Drop one leading `#`, one leading `/` and any query string.
fn normalize_link(href: &str) -> &str {
    let link = href.strip_prefix('#').unwrap_or(href);
    let link = link.strip_prefix('/').unwrap_or(link);
    link.split_once('?').map_or(link, |(path, _)| path)
}
