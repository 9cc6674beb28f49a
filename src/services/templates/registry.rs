//! Client for the public UI component registry.

use std::collections::{BTreeMap, HashMap};

use futures_util::future::join_all;
use serde::Deserialize;

/// Component names the registry is known to serve.
pub const KNOWN_COMPONENTS: &[&str] = &[
    "button",
    "card",
    "input",
    "badge",
    "avatar",
    "dialog",
    "dropdown-menu",
    "select",
    "textarea",
    "checkbox",
    "radio-group",
    "switch",
    "label",
    "toast",
    "tooltip",
    "popover",
    "command",
    "accordion",
    "alert",
    "alert-dialog",
    "aspect-ratio",
    "calendar",
    "collapsible",
    "context-menu",
    "form",
    "hover-card",
    "menubar",
    "navigation-menu",
    "pagination",
    "progress",
    "scroll-area",
    "separator",
    "sheet",
    "skeleton",
    "slider",
    "sonner",
    "tabs",
    "table",
    "toggle",
    "toggle-group",
];

pub fn is_known_component(name: &str) -> bool {
    KNOWN_COMPONENTS.contains(&name)
}

/// One file of a registry component.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryFile {
    pub name: Option<String>,
    pub path: Option<String>,
    pub content: Option<String>,
    pub source: Option<String>,
}

/// Registry component descriptor.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryComponent {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub files: Vec<RegistryFile>,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl RegistryComponent {
    /// Files keyed by their place in the exported tree.
    ///
    /// Paths already under `components/` are kept; anything else lands in
    /// `components/ui/` under its file name. Entries without a path or
    /// content are skipped.
    pub fn to_files(&self) -> BTreeMap<String, String> {
        let mut files = BTreeMap::new();
        for file in &self.files {
            let path = file
                .path
                .as_deref()
                .or(file.name.as_deref())
                .unwrap_or_default();
            let content = file
                .content
                .as_deref()
                .or(file.source.as_deref())
                .unwrap_or_default();

            if path.is_empty() || content.is_empty() {
                tracing::warn!(component = %self.name, "Skipping invalid registry file entry");
                continue;
            }

            let target = if path.starts_with("components/") {
                path.to_string()
            } else {
                let file_name = path.rsplit('/').next().unwrap_or(path);
                format!("components/ui/{}", file_name)
            };
            files.insert(target, content.to_string());
        }
        files
    }
}

/// HTTP client for the component registry.
#[derive(Clone)]
pub struct RegistryClient {
    http: reqwest::Client,
    base_url: String,
}

impl RegistryClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        RegistryClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn candidate_urls(&self, name: &str) -> [String; 2] {
        [
            format!("{}/styles/default/{}.json", self.base_url, name),
            format!("{}/{}.json", self.base_url, name),
        ]
    }

    /// Fetch one component, trying each URL pattern in turn.
    ///
    /// Unknown names, network errors and non-success responses all yield `None`.
    pub async fn fetch_component(&self, name: &str) -> Option<RegistryComponent> {
        if !is_known_component(name) {
            tracing::warn!(component = %name, "Component not in registry catalogue");
            return None;
        }

        for url in self.candidate_urls(name) {
            let response = match self.http.get(&url).send().await {
                Ok(r) if r.status().is_success() => r,
                Ok(r) => {
                    tracing::debug!(url = %url, status = %r.status(), "Registry miss");
                    continue;
                }
                Err(e) => {
                    tracing::debug!(url = %url, error = %e, "Registry request failed");
                    continue;
                }
            };

            match response.json::<RegistryComponent>().await {
                Ok(mut component) => {
                    if component.name.is_empty() {
                        component.name = name.to_string();
                    }
                    tracing::debug!(component = %name, files = component.files.len(), "Fetched registry component");
                    return Some(component);
                }
                Err(e) => {
                    tracing::debug!(url = %url, error = %e, "Invalid registry payload");
                }
            }
        }

        tracing::warn!(component = %name, "Component unavailable from registry");
        None
    }

    /// Fetch several components concurrently. Missing ones are absent from the map.
    pub async fn fetch_components(&self, names: &[String]) -> HashMap<String, RegistryComponent> {
        let fetches = names.iter().map(|name| async move {
            (name.clone(), self.fetch_component(name).await)
        });

        join_all(fetches)
            .await
            .into_iter()
            .filter_map(|(name, component)| component.map(|c| (name, c)))
            .collect()
    }
}
