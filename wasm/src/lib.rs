use serde::Deserialize;
use vdi_topology::{Config, RenderDump, Theme, import_diagram, parse_response};
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NormalizeOptions {
    theme: Option<String>,
    highlight: Option<String>,
}

fn normalize(document: &str, options: NormalizeOptions) -> Result<String, String> {
    let mut config = Config::default();
    if let Some(name) = options.theme.as_deref() {
        config.theme = Theme::from_name(name).ok_or_else(|| format!("Unknown theme `{name}`"))?;
    }
    let wire = parse_response(document).map_err(|error| error.to_string())?;
    let (diagram, _) = import_diagram(wire, &config);
    let dump = RenderDump::from_diagram(&diagram, &config.theme, options.highlight.as_deref());
    serde_json::to_string(&dump).map_err(|error| error.to_string())
}

/// Routes a diagram document and returns the render dump as JSON.
#[wasm_bindgen]
pub fn normalize_diagram(document: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let options = if let Some(raw_options) = options_json {
        serde_json::from_str::<NormalizeOptions>(&raw_options)
            .map_err(|error| JsValue::from_str(&error.to_string()))?
    } else {
        NormalizeOptions::default()
    };

    normalize(document, options).map_err(|error| JsValue::from_str(&error))
}
