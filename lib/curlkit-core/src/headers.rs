//! Multi-valued, order-preserving header container.

use serde::{Deserialize, Serialize};

/// Ordered list of header name/value pairs.
///
/// Names compare case-insensitively. Repeated names are kept as separate
/// entries, so `-H 'X: 1' -H 'X: 2'` sends both values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value, keeping existing values for the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Replaces every value for `name` with a single value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.remove(&name);
        self.entries.push((name, value.into()));
    }

    /// Removes every value for `name`, returning how many were removed.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        before - self.entries.len()
    }

    /// First value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Every value for `name`, in insertion order.
    pub fn get_all<'a, 'n>(
        &'a self,
        name: &'n str,
    ) -> impl Iterator<Item = &'a str> + use<'a, 'n> {
        self.entries
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns `true` if at least one value exists for `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of entries (not distinct names).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K, V> Extend<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.entries
            .extend(iter.into_iter().map(|(k, v)| (k.into(), v.into())));
    }
}

impl From<&http::HeaderMap> for Headers {
    /// Non-UTF-8 values are skipped.
    fn from(map: &http::HeaderMap) -> Self {
        map.iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_keeps_every_value() {
        let mut headers = Headers::new();
        headers.append("Accept", "text/html");
        headers.append("accept", "application/json");

        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("ACCEPT"), Some("text/html"));
        let all: Vec<_> = headers.get_all("Accept").collect();
        assert_eq!(all, ["text/html", "application/json"]);
    }

    #[test]
    fn set_replaces_all_values() {
        let mut headers: Headers = [("X-A", "1"), ("x-a", "2"), ("X-B", "3")]
            .into_iter()
            .collect();
        headers.set("X-A", "9");

        assert_eq!(headers.get_all("x-a").collect::<Vec<_>>(), ["9"]);
        assert_eq!(headers.get("X-B"), Some("3"));
    }

    #[test]
    fn remove_counts() {
        let mut headers: Headers = [("A", "1"), ("a", "2")].into_iter().collect();
        assert_eq!(headers.remove("A"), 2);
        assert!(headers.is_empty());
        assert_eq!(headers.remove("A"), 0);
    }

    #[test]
    fn values_outlive_the_name() {
        let headers: Headers = [("X-Id", "7"), ("x-id", "8")].into_iter().collect();
        let (first, all) = {
            let name = String::from("X-ID");
            (headers.get(&name), headers.get_all(&name).collect::<Vec<_>>())
        };
        assert_eq!(first, Some("7"));
        assert_eq!(all, ["7", "8"]);
    }

    #[test]
    fn from_header_map() {
        let mut map = http::HeaderMap::new();
        map.append("set-cookie", http::HeaderValue::from_static("a=1"));
        map.append("set-cookie", http::HeaderValue::from_static("b=2"));

        let headers = Headers::from(&map);
        assert_eq!(headers.get_all("Set-Cookie").count(), 2);
    }
}
