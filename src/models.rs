//! Supported Gemini models
//!
//! The catalog the host lists in its model picker. Model ids carry a
//! `gemini/` prefix there; the API wants the bare name.

use serde::Serialize;

/// Prefix the host puts in front of model names.
pub const MODEL_ID_PREFIX: &str = "gemini/";

/// One entry of the model catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub context_length: u32,
    pub supports_vision: bool,
    pub description: String,
}

const ONE_MILLION_TOKENS: u32 = 1_048_576;

const CATALOG: &[(&str, &str)] = &[
    (
        "gemini-2.5-flash",
        "Fast multimodal model with native video understanding",
    ),
    (
        "gemini-2.5-flash-preview-05-20",
        "Gemini 2.5 preview model with enhanced capabilities",
    ),
    (
        "gemini-2.0-flash-exp",
        "Experimental version with enhanced capabilities",
    ),
    (
        "gemini-2.0-flash-thinking-exp",
        "Experimental model with enhanced reasoning capabilities",
    ),
    (
        "gemini-1.5-flash",
        "Fast and versatile performance for diverse tasks",
    ),
    (
        "gemini-1.5-flash-8b",
        "8B parameter model for high volume tasks",
    ),
    (
        "gemini-1.5-pro",
        "Complex reasoning tasks requiring more intelligence",
    ),
];

/// All supported models, in display order.
pub fn list_models() -> Vec<ModelInfo> {
    CATALOG
        .iter()
        .map(|(name, description)| ModelInfo {
            id: format!("{MODEL_ID_PREFIX}{name}"),
            name: (*name).to_string(),
            context_length: ONE_MILLION_TOKENS,
            supports_vision: true,
            description: (*description).to_string(),
        })
        .collect()
}

/// Bare API model name for a host model id (`"gemini/x"` -> `"x"`).
///
/// Anything up to the last `/` is dropped, so `"models/x"` also resolves.
pub fn resolve_model_name(model_id: &str) -> &str {
    model_id.rsplit('/').next().unwrap_or(model_id).trim()
}

pub fn is_known_model(name: &str) -> bool {
    let name = resolve_model_name(name);
    CATALOG.iter().any(|(known, _)| *known == name)
}
