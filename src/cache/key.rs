//! Canonical cache-key derivation.
//!
//! Two requests that differ only in the order of their query parameters, or in
//! the order of the values of a repeated parameter, map to the same key. Keys
//! are 64-bit FNV-1a hashes and are not collision-proof.

use std::{collections::BTreeMap, hash::Hasher};

use fnv::FnvHasher;
use url::{Url, form_urlencoded};

/// 64-bit FNV-1a over `bytes`.
pub fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(bytes);
    hasher.finish()
}

/// Re-encodes query pairs in canonical form.
///
/// Names are sorted, the values of each name are sorted, and everything is
/// written back as `application/x-www-form-urlencoded`. An empty input yields
/// an empty string.
///
/// # Examples
///
/// ```
/// use rttp_cache::cache::key::canonical_query;
///
/// let q = canonical_query([("b", "2"), ("a", "z"), ("a", "y")]);
/// assert_eq!(q, "a=y&a=z&b=2");
/// ```
pub fn canonical_query<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (name, value) in pairs {
        grouped.entry(name).or_default().push(value);
    }

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (name, values) in &mut grouped {
        values.sort_unstable();
        for value in values.iter() {
            serializer.append_pair(name, value);
        }
    }
    serializer.finish()
}

/// Rewrites an absolute URL with its query in canonical form and the fragment
/// removed. Input that does not parse as a URL is returned trimmed, as is.
///
/// Parsing also normalizes the rest of the URL the way a browser would: the
/// scheme and host are lowercased, a default port is dropped, and `.`/`..`
/// path segments are resolved. `/a/../b` and `/b` therefore share a key,
/// while the wrapped handler still sees the path as it was received.
pub fn canonical_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw.trim()) else {
        return raw.trim().to_owned();
    };

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let query = canonical_query(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));

    url.set_query((!query.is_empty()).then_some(query.as_str()));
    url.set_fragment(None);
    url.into()
}

/// Derives the storage key for an absolute request URL.
///
/// # Examples
///
/// ```
/// use rttp_cache::cache::key::canonical_key;
///
/// assert_eq!(
///     canonical_key("http://example.com/a?x=1&y=2"),
///     canonical_key("http://example.com/a?y=2&x=1"),
/// );
/// ```
pub fn canonical_key(url: &str) -> u64 {
    fnv1a_64(canonical_url(url).as_bytes())
}
