//! Per-model dispatch payloads

use serde_json::{Map, Value};

use crate::assets::{ResolvedReferences, MULTI_REFERENCE_PARAM, SINGLE_REFERENCE_PARAM};
use crate::ledger::pricing::OUTPUT_COUNT_PARAM;
use crate::reconcile::{native_option, ParameterRole};
use crate::registry::ModelDescriptor;

const RESOLUTION_PARAM: &str = "resolution";
const PROMPT_PARAM: &str = "prompt";

/// Inputs as a given invocation of `model` accepts them: the canonical aspect
/// ratio rewritten into the model's own parameter, and the parameters the
/// invocation variant does not take removed.
///
/// Pricing runs over this same map so the estimate matches the debit.
pub fn variant_inputs(
    model: &ModelDescriptor,
    invocation_id: &str,
    inputs: &Map<String, Value>,
) -> Map<String, Value> {
    let mut prepared = inputs.clone();
    let aspect_names = ParameterRole::AspectRatio.parameter_names();

    if let Some(param) = model.first_parameter(aspect_names) {
        let canonical = aspect_names
            .iter()
            .filter_map(|name| prepared.get(*name).and_then(Value::as_str))
            .find(|value| !value.is_empty())
            .map(str::to_string);

        if let Some(canonical) = canonical {
            for name in aspect_names {
                prepared.remove(*name);
            }
            prepared.insert(
                param.name.clone(),
                Value::String(native_option(param, &canonical)),
            );
        }
    }

    if model.is_edit_invocation(invocation_id) {
        prepared.remove(OUTPUT_COUNT_PARAM);
        prepared.remove(RESOLUTION_PARAM);
    } else {
        prepared.remove(SINGLE_REFERENCE_PARAM);
        prepared.remove(MULTI_REFERENCE_PARAM);
    }

    prepared
}

/// The exact input sent to the provider for one job
pub fn build(
    model: &ModelDescriptor,
    invocation_id: &str,
    prompt: &str,
    inputs: &Map<String, Value>,
    references: &ResolvedReferences,
) -> Value {
    let mut merged = inputs.clone();
    merged.insert(PROMPT_PARAM.to_string(), Value::String(prompt.to_string()));

    if let Some(url) = &references.image_url {
        merged.insert(SINGLE_REFERENCE_PARAM.to_string(), Value::String(url.clone()));
    }
    if !references.image_urls.is_empty() {
        merged.insert(
            MULTI_REFERENCE_PARAM.to_string(),
            Value::Array(references.image_urls.iter().cloned().map(Value::String).collect()),
        );
    }

    Value::Object(variant_inputs(model, invocation_id, &merged))
}
