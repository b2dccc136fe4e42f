pub mod config;
pub mod dictionary;
pub mod engine;
pub mod highlight;
pub mod html;
pub mod layout;
pub mod measure;
pub mod metadata;
pub mod presentation;
pub mod rules;

use wasm_bindgen::prelude::*;

use config::RenderConfig;
use dictionary::NameDictionary;
use engine::InferenceEngine;
use metadata::InMemoryMetadata;
use presentation::GroupFilter;

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Render table metadata (JSON) to a standalone HTML page.
///
/// `groups` is a comma-separated list of group names; all groups are shown
/// when it is absent or blank.
#[wasm_bindgen(js_name = "schemaToHtml")]
pub fn render_schema(
    metadata: &str,
    dictionary: Option<String>,
    groups: Option<String>,
) -> Result<String, String> {
    let metadata = InMemoryMetadata::from_json(metadata).map_err(|e| e.to_string())?;
    let dictionary = match dictionary.as_deref().map(str::trim) {
        Some(json) if !json.is_empty() => {
            NameDictionary::from_json(json).map_err(|e| e.to_string())?
        }
        _ => NameDictionary::new(),
    };
    let filter = match groups.as_deref().map(str::trim) {
        Some(list) if !list.is_empty() => {
            let names: Vec<&str> = list.split(',').collect();
            let (filter, unknown) = GroupFilter::from_names(&names);
            if !unknown.is_empty() {
                return Err(format!("Unknown groups: {}", unknown.join(", ")));
            }
            filter
        }
        _ => GroupFilter::all(),
    };

    let graph = InferenceEngine::new().infer(&metadata, &dictionary);
    html::render_page(&graph, &filter, &RenderConfig::default()).map_err(|e| e.to_string())
}

/// Visual state of one edge as JSON `{emphasis, color, width, label}`.
#[wasm_bindgen(js_name = "edgeStyle")]
pub fn edge_style(
    link_key: &str,
    selected: Option<String>,
    show_all_labels: bool,
) -> Result<String, String> {
    let selected = selected.filter(|s| !s.is_empty());
    let style = highlight::edge_style(link_key, selected.as_deref(), show_all_labels);
    serde_json::to_string(&style).map_err(|e| e.to_string())
}
