//! Cross-provider settings reconciliation for compare mode
//!
//! Providers name the same setting differently (`"16:9"` vs `"landscape_16_9"`).
//! Every native value is mapped into a canonical vocabulary before sets are
//! intersected, and mapped back per provider when a shared selection is dispatched.

pub mod aspect;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::registry::{ModelDescriptor, ModelRegistry, ParameterSpec};

/// A semantic setting that may be spelled differently by each provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterRole {
    AspectRatio,
    OutputCount,
}

impl ParameterRole {
    /// Provider parameter names that carry this role
    pub fn parameter_names(self) -> &'static [&'static str] {
        match self {
            ParameterRole::AspectRatio => &["aspect_ratio", "image_size"],
            ParameterRole::OutputCount => &["num_images"],
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "aspect_ratio" | "aspect-ratio" => Some(ParameterRole::AspectRatio),
            "output_count" | "num_images" => Some(ParameterRole::OutputCount),
            _ => None,
        }
    }
}

/// Native value → canonical value
const NATIVE_TO_CANONICAL: &[(&str, &str)] = &[
    ("1:1", "1:1"),
    ("16:9", "16:9"),
    ("9:16", "9:16"),
    ("4:3", "4:3"),
    ("3:4", "3:4"),
    ("3:2", "3:2"),
    ("2:3", "2:3"),
    ("5:4", "5:4"),
    ("4:5", "4:5"),
    ("21:9", "21:9"),
    ("square_hd", "1:1"),
    ("square", "1:1"),
    ("landscape_16_9", "16:9"),
    ("portrait_16_9", "9:16"),
    ("landscape_4_3", "4:3"),
    ("portrait_4_3", "3:4"),
    ("auto_2K", "auto_2K"),
    ("auto_4K", "auto_4K"),
];

/// (canonical, parameter name, native value)
const CANONICAL_TO_NATIVE: &[(&str, &str, &str)] = &[
    ("1:1", "aspect_ratio", "1:1"),
    ("1:1", "image_size", "square_hd"),
    ("16:9", "aspect_ratio", "16:9"),
    ("16:9", "image_size", "landscape_16_9"),
    ("9:16", "aspect_ratio", "9:16"),
    ("9:16", "image_size", "portrait_16_9"),
    ("4:3", "aspect_ratio", "4:3"),
    ("4:3", "image_size", "landscape_4_3"),
    ("3:4", "aspect_ratio", "3:4"),
    ("3:4", "image_size", "portrait_4_3"),
];

/// Canonical form of a provider value, `None` when the table has no entry
pub fn canonicalize(native: &str) -> Option<&'static str> {
    NATIVE_TO_CANONICAL
        .iter()
        .find(|(n, _)| *n == native)
        .map(|(_, c)| *c)
}

/// Provider-native encoding of a canonical value for `parameter_name`.
/// Unmapped values pass through unchanged.
pub fn to_provider_value(canonical: &str, parameter_name: &str) -> String {
    CANONICAL_TO_NATIVE
        .iter()
        .find(|(c, p, _)| *c == canonical && *p == parameter_name)
        .map(|(_, _, native)| native.to_string())
        .unwrap_or_else(|| canonical.to_string())
}

/// The native value `param` should receive for `canonical`: the first declared
/// option that canonicalizes to it, else the table encoding.
pub fn native_option(param: &ParameterSpec, canonical: &str) -> String {
    param
        .options()
        .iter()
        .find(|option| canonicalize(option) == Some(canonical))
        .cloned()
        .unwrap_or_else(|| to_provider_value(canonical, &param.name))
}

/// Canonical option set one model offers for `role`, in declaration order
fn canonical_options(model: &ModelDescriptor, role: ParameterRole) -> Vec<&'static str> {
    let Some(param) = model.first_parameter(role.parameter_names()) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    param
        .options()
        .iter()
        .filter_map(|option| canonicalize(option))
        .filter(|canonical| seen.insert(*canonical))
        .collect()
}

fn selected<'a>(registry: &'a ModelRegistry, ids: &[String]) -> Vec<&'a ModelDescriptor> {
    ids.iter().filter_map(|id| registry.find_by_id(id)).collect()
}

/// Canonical values valid for every selected model.
///
/// Unknown ids are ignored; no selected models yields an empty list.
pub fn common_options(registry: &ModelRegistry, ids: &[String], role: ParameterRole) -> Vec<String> {
    let models = selected(registry, ids);
    let Some((first, rest)) = models.split_first() else {
        return Vec::new();
    };

    let others: Vec<HashSet<&'static str>> = rest
        .iter()
        .map(|model| canonical_options(model, role).into_iter().collect())
        .collect();

    canonical_options(first, role)
        .into_iter()
        .filter(|value| others.iter().all(|set| set.contains(value)))
        .map(str::to_string)
        .collect()
}

/// Whether every selected model accepts a parameter for `role`.
/// Vacuously true when nothing is selected.
pub fn all_support(registry: &ModelRegistry, ids: &[String], role: ParameterRole) -> bool {
    selected(registry, ids)
        .iter()
        .all(|model| model.first_parameter(role.parameter_names()).is_some())
}
