use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

pub const DEFAULT_API_HOST: &str = "https://api.mixpanel.com";

/// The well-known Mixpanel ingestion endpoints.
///
/// Consumers route by the string name (`as_str`), so callers are free to
/// register additional names in an [`EndpointMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    Events,
    People,
    Import,
}

impl Endpoint {
    pub const ALL: [Endpoint; 3] = [Endpoint::Events, Endpoint::People, Endpoint::Import];

    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Events => "events",
            Endpoint::People => "people",
            Endpoint::Import => "import",
        }
    }

    /// Path of the endpoint relative to the API host.
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Events => "track",
            Endpoint::People => "engage",
            Endpoint::Import => "import",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed mapping from endpoint name to transport target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointMap {
    targets: BTreeMap<String, Url>,
}

impl EndpointMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `events`, `people` and `import` under `api_host`.
    ///
    /// `api_key`, when given, is attached to the import target as the
    /// `api_key` query parameter.
    pub fn mixpanel(api_host: &Url, api_key: Option<&str>) -> Self {
        let mut map = Self::new();
        for endpoint in Endpoint::ALL {
            let mut target = api_host.clone();
            let base = api_host.path().trim_end_matches('/');
            target.set_path(&format!("{base}/{}", endpoint.path()));

            if endpoint == Endpoint::Import
                && let Some(key) = api_key
            {
                target.query_pairs_mut().append_pair("api_key", key);
            }

            map.insert(endpoint.as_str(), target);
        }
        map
    }

    pub fn with_endpoint(mut self, name: impl Into<String>, target: Url) -> Self {
        self.insert(name, target);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, target: Url) {
        self.targets.insert(name.into(), target);
    }

    pub fn get(&self, name: &str) -> Option<&Url> {
        self.targets.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.targets.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.targets.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Url)> {
        self.targets.iter().map(|(name, url)| (name.as_str(), url))
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
