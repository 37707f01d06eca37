//! Browser asset fetching

use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::Response;

use super::shaders::{ShaderBundle, ShaderLoader};
use crate::error::{GameError, Result};

fn js_reason(value: wasm_bindgen::JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

/// GET `path` and return the body as text
pub async fn fetch_text(path: &str) -> Result<String> {
    let asset_error = |reason: String| GameError::AssetLoad {
        path: path.to_string(),
        reason,
    };
    let window = web_sys::window().ok_or_else(|| asset_error("no window".into()))?;

    let response = JsFuture::from(window.fetch_with_str(path))
        .await
        .map_err(|e| asset_error(js_reason(e)))?;
    let response: Response = response
        .dyn_into()
        .map_err(|_| asset_error("fetch did not return a Response".into()))?;
    if !response.ok() {
        return Err(asset_error(format!("HTTP {}", response.status())));
    }

    let text = response.text().map_err(|e| asset_error(js_reason(e)))?;
    let text = JsFuture::from(text).await.map_err(|e| asset_error(js_reason(e)))?;
    text.as_string()
        .ok_or_else(|| asset_error("body is not text".into()))
}

/// Fetch every shader source, stopping at the first failure
pub async fn load_shaders() -> Result<ShaderBundle> {
    let mut loader = ShaderLoader::new();
    while let Some(asset) = loader.next_request() {
        let source = fetch_text(asset.path()).await;
        loader.supply(asset, source);
    }
    loader.finish()
}
