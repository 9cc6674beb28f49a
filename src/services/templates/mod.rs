//! Completion of generated file sets into a buildable project.

pub mod fallback;
pub mod registry;
pub mod scaffold;

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::models::GeneratedFile;
use crate::services::paths::normalize_path;

pub use registry::RegistryClient;

static UI_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:from|import)\s+['"]@/components/ui/([\w-]+)['"]"#).unwrap()
});

/// Component names imported from `@/components/ui/*`, in first-seen order.
pub fn detect_ui_components(files: &[GeneratedFile]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for file in files {
        for cap in UI_IMPORT.captures_iter(&file.content) {
            let name = cap[1].to_string();
            if seen.insert(name.clone()) {
                names.push(name);
            }
        }
    }
    names
}

/// Supplies the scaffold and UI primitives a generated file set is missing.
#[derive(Clone)]
pub struct TemplateFiller {
    registry: RegistryClient,
}

impl TemplateFiller {
    pub fn new(registry: RegistryClient) -> Self {
        TemplateFiller { registry }
    }

    /// Files to add so the project builds, keyed by path.
    ///
    /// Nothing in `existing_paths` is returned except a generated
    /// `package.json`, rewritten when it lacks dependencies the added files
    /// need. Components come from the registry first, then the built-in
    /// fallbacks; a component with neither is left out.
    pub async fn fill_missing(
        &self,
        project_name: &str,
        existing_paths: &[String],
        files: &[GeneratedFile],
    ) -> BTreeMap<String, String> {
        let existing: BTreeSet<String> = existing_paths.iter().map(|p| normalize_path(p)).collect();

        let missing: Vec<String> = detect_ui_components(files)
            .into_iter()
            .filter(|name| !existing.contains(&format!("components/ui/{}.tsx", name)))
            .collect();

        let mut added: BTreeMap<String, String> = BTreeMap::new();
        let mut extra_dependencies: Vec<String> = Vec::new();

        if !missing.is_empty() {
            tracing::info!(components = ?missing, "Completing missing UI components");
            let fetched = self.registry.fetch_components(&missing).await;

            for name in &missing {
                let registry_files = fetched
                    .get(name)
                    .map(|component| {
                        extra_dependencies.extend(component.dependencies.iter().cloned());
                        component.to_files()
                    })
                    .unwrap_or_default();

                if !registry_files.is_empty() {
                    added.extend(registry_files);
                    continue;
                }

                match fallback::fallback_component(name) {
                    Some(source) => {
                        tracing::warn!(component = %name, "Using built-in fallback component");
                        added.insert(format!("components/ui/{}.tsx", name), source.to_string());
                    }
                    None => {
                        tracing::warn!(component = %name, "No source for UI component, omitting");
                    }
                }
            }
        }

        for (path, content) in scaffold::scaffold_files(project_name, &extra_dependencies) {
            added.entry(path).or_insert(content);
        }

        added.retain(|path, _| !existing.contains(&normalize_path(path)));

        let merged = files
            .iter()
            .find(|f| normalize_path(&f.path) == "package.json")
            .and_then(|manifest| {
                scaffold::merge_package_json(&manifest.content, &extra_dependencies)
            });
        if let Some(merged) = merged {
            added.insert("package.json".to_string(), merged);
        }
        added
    }
}
