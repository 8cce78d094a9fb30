//! Model descriptors and their typed parameter schemas

use serde::{Deserialize, Serialize};

/// What a model is primarily used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    TextToImage,
    ImageToImage,
    Edit,
}

/// Immutable description of one generation provider model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Primary invocation identifier
    pub id: String,

    /// Alternate invocation identifier used when reference images are present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_id: Option<String>,

    pub name: String,

    pub kind: ModelKind,

    #[serde(default)]
    pub description: String,

    /// Base price in USD per output image; `None` means the cost is unknown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_price_cost: Option<f64>,

    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
}

impl ModelDescriptor {
    /// Look up a parameter by name
    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// The first parameter whose name is one of `names`
    pub fn first_parameter<'a>(&'a self, names: &[&str]) -> Option<&'a ParameterSpec> {
        self.parameters.iter().find(|p| names.contains(&p.name.as_str()))
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameter(name).is_some()
    }

    /// The identifier sent to the provider: the edit variant when references are attached
    pub fn invocation_id(&self, has_references: bool) -> &str {
        match (&self.edit_id, has_references) {
            (Some(edit_id), true) => edit_id,
            _ => &self.id,
        }
    }

    /// Whether `invocation_id` addresses this model's edit variant
    pub fn is_edit_invocation(&self, invocation_id: &str) -> bool {
        self.edit_id.as_deref() == Some(invocation_id)
    }

    /// Whether `invocation_id` addresses this model at all
    pub fn answers_to(&self, invocation_id: &str) -> bool {
        self.id == invocation_id || self.is_edit_invocation(invocation_id)
    }
}

/// Schema of one provider input parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,

    #[serde(default)]
    pub label: String,

    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(flatten)]
    pub kind: ParameterKind,
}

/// The value domain of a parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ParameterKind {
    Text {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<String>,
        #[serde(default)]
        multiple: bool,
    },
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<f64>,
    },
    Select {
        options: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<String>,
    },
    Boolean {
        #[serde(default)]
        default: bool,
    },
}

impl ParameterSpec {
    pub fn text(name: &str, label: &str) -> Self {
        Self::new(name, label, ParameterKind::Text { default: None, multiple: false })
    }

    pub fn multi_text(name: &str, label: &str) -> Self {
        Self::new(name, label, ParameterKind::Text { default: None, multiple: true })
    }

    pub fn number(name: &str, label: &str, default: f64) -> Self {
        Self::new(name, label, ParameterKind::Number { default: Some(default) })
    }

    pub fn select(name: &str, label: &str, options: &[&str], default: &str) -> Self {
        Self::new(
            name,
            label,
            ParameterKind::Select {
                options: options.iter().map(|o| o.to_string()).collect(),
                default: Some(default.to_string()),
            },
        )
    }

    pub fn boolean(name: &str, label: &str, default: bool) -> Self {
        Self::new(name, label, ParameterKind::Boolean { default })
    }

    fn new(name: &str, label: &str, kind: ParameterKind) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            required: false,
            description: None,
            kind,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Select options; empty for every other kind
    pub fn options(&self) -> &[String] {
        match &self.kind {
            ParameterKind::Select { options, .. } => options,
            _ => &[],
        }
    }

    pub fn allows_multiple_values(&self) -> bool {
        matches!(self.kind, ParameterKind::Text { multiple: true, .. })
    }

    /// The default as a JSON value, if the schema declares one
    pub fn default_value(&self) -> Option<serde_json::Value> {
        match &self.kind {
            ParameterKind::Text { default, .. } => default.clone().map(serde_json::Value::String),
            ParameterKind::Number { default } => default
                .and_then(serde_json::Number::from_f64)
                .map(serde_json::Value::Number),
            ParameterKind::Select { default, .. } => default.clone().map(serde_json::Value::String),
            ParameterKind::Boolean { default } => Some(serde_json::Value::Bool(*default)),
        }
    }
}
