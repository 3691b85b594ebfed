use std::fmt;

use url::form_urlencoded;

/// [Location] is the addressable position of the client, a path plus query parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    path: String,
    query: Vec<(String, String)>,
}

impl Default for Location {
    fn default() -> Self {
        Location {
            path: "/".into(),
            query: Vec::new(),
        }
    }
}

impl Location {
    pub fn new(path: &str, query: &[(&str, &str)]) -> Self {
        Location {
            path: normalize_path(path),
            query: query
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        }
    }

    /// Parses `path?name=value&...`, the query part is optional.
    pub fn parse(raw: &str) -> Self {
        let (path, query) = raw.split_once('?').unwrap_or((raw, ""));

        Location {
            path: normalize_path(path),
            query: form_urlencoded::parse(query.as_bytes())
                .map(|(name, value)| (name.into_owned(), value.into_owned()))
                .collect(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// The first value of the query parameter `name`
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.query.is_empty() {
            return f.write_str(&self.path);
        }

        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish();

        write!(f, "{}?{}", self.path, query)
    }
}

fn normalize_path(path: &str) -> String {
    let path = path.trim();

    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}
