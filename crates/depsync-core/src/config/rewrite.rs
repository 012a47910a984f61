//! URL rewrites for mirrors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Prefix replacements applied to locator URLs.
///
/// The longest matching prefix wins, so a specific mapping can override a
/// general one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rewrites(BTreeMap<String, String>);

impl Rewrites {
    pub fn new(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Later entries replace earlier ones with the same prefix.
    pub fn extend(&mut self, other: &Rewrites) {
        self.0
            .extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    pub fn apply(&self, url: &str) -> String {
        let best = self
            .0
            .iter()
            .filter(|(prefix, _)| url.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len());

        match best {
            Some((prefix, replacement)) => {
                let rewritten = format!("{}{}", replacement, &url[prefix.len()..]);
                tracing::debug!(%url, %rewritten, "Rewrote locator");
                rewritten
            }
            None => url.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_prefix_wins() {
        let rewrites = Rewrites::new(BTreeMap::from([
            ("https://github.com/".to_string(), "https://mirror/gh/".to_string()),
            (
                "https://github.com/madler/".to_string(),
                "file:///srv/madler/".to_string(),
            ),
        ]));
        assert_eq!(
            rewrites.apply("https://github.com/madler/zlib.git"),
            "file:///srv/madler/zlib.git"
        );
        assert_eq!(
            rewrites.apply("https://github.com/nlohmann/json.git"),
            "https://mirror/gh/nlohmann/json.git"
        );
        assert_eq!(rewrites.apply("https://gitlab.com/x"), "https://gitlab.com/x");
    }
}
