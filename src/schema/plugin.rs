use std::cell::OnceCell;

use crate::{
    foundation::{
        core::ParamId,
        error::{ArkError, ArkResult},
    },
    params::parameter::ParameterType,
    schema::decl::{
        self, DEFAULT_KEY, DeclValue, MAX_KEY, MIN_KEY, bool_default, float_field, int_field,
    },
};

const MASK_OUTPUT: &str = "output_mask";
const IMAGE_TOKEN: &str = "Image";

/// Raw `name -> declaration` pair, kept in backend order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputDecl {
    pub name: String,
    pub decl: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EndpointTag {
    #[default]
    Normal,
    Hidden,
    Deprecated,
    Ignore,
}

impl EndpointTag {
    pub fn parse(tag: &str) -> Self {
        match tag {
            "hidden" => Self::Hidden,
            "deprecated" => Self::Deprecated,
            "ignore" => Self::Ignore,
            _ => Self::Normal,
        }
    }

    /// Whether the endpoint appears in the endpoint menu.
    pub fn is_listed(self) -> bool {
        self == Self::Normal
    }
}

/// Typed view of one declared endpoint input.
#[derive(Clone, Debug, PartialEq)]
pub struct EndpointParam {
    pub name: String,
    pub param_type: ParameterType,
    /// Host handle, assigned when the control is built.
    pub id: Option<ParamId>,
    pub optional: bool,
    pub default: Option<DeclValue>,
    pub min: Option<DeclValue>,
    pub max: Option<DeclValue>,
    pub help: String,
    /// Uploaded backend image ids, filled in right before dispatch.
    pub image_ids: Vec<String>,
}

impl EndpointParam {
    pub fn from_decl(input: &InputDecl) -> Self {
        let param_type = decl::classify(&input.decl);
        let d = input.decl.as_str();
        let (default, min, max) = match param_type {
            ParameterType::IntSlider => (
                int_field(d, DEFAULT_KEY).map(DeclValue::Int),
                int_field(d, MIN_KEY).map(DeclValue::Int),
                int_field(d, MAX_KEY).map(DeclValue::Int),
            ),
            ParameterType::FloatSlider => (
                float_field(d, DEFAULT_KEY).map(DeclValue::Float),
                float_field(d, MIN_KEY).map(DeclValue::Float),
                float_field(d, MAX_KEY).map(DeclValue::Float),
            ),
            ParameterType::Boolean => (bool_default(d).map(DeclValue::Bool), None, None),
            _ => (None, None, None),
        };
        let numeric = matches!(
            param_type,
            ParameterType::IntSlider | ParameterType::FloatSlider | ParameterType::Boolean
        );

        Self {
            name: input.name.clone(),
            param_type,
            id: None,
            optional: numeric && decl::optional_flag(d),
            default,
            min,
            max,
            help: if numeric {
                decl::help_string(d)
            } else {
                String::new()
            },
            image_ids: Vec::new(),
        }
    }

    pub fn default_int(&self) -> Option<i32> {
        match self.default {
            Some(DeclValue::Int(v)) => Some(v),
            _ => None,
        }
    }

    pub fn min_int(&self) -> Option<i32> {
        match self.min {
            Some(DeclValue::Int(v)) => Some(v),
            _ => None,
        }
    }

    pub fn max_int(&self) -> Option<i32> {
        match self.max {
            Some(DeclValue::Int(v)) => Some(v),
            _ => None,
        }
    }

    pub fn default_float(&self) -> Option<f32> {
        match self.default {
            Some(DeclValue::Float(v)) => Some(v),
            _ => None,
        }
    }

    pub fn min_float(&self) -> Option<f32> {
        match self.min {
            Some(DeclValue::Float(v)) => Some(v),
            _ => None,
        }
    }

    pub fn max_float(&self) -> Option<f32> {
        match self.max {
            Some(DeclValue::Float(v)) => Some(v),
            _ => None,
        }
    }

    pub fn default_bool(&self) -> Option<bool> {
        match self.default {
            Some(DeclValue::Bool(v)) => Some(v),
            _ => None,
        }
    }
}

/// One backend operation of a plugin.
#[derive(Clone, Debug, Default)]
pub struct Endpoint {
    pub name: String,
    pub plugin_name: String,
    pub call: String,
    pub tag: EndpointTag,
    pub inputs: Vec<InputDecl>,
    pub outputs: Vec<InputDecl>,
    params: OnceCell<Vec<EndpointParam>>,
}

impl Endpoint {
    pub fn new(
        name: impl Into<String>,
        plugin_name: impl Into<String>,
        inputs: Vec<InputDecl>,
        outputs: Vec<InputDecl>,
    ) -> Self {
        Self {
            name: name.into(),
            plugin_name: plugin_name.into(),
            inputs,
            outputs,
            ..Self::default()
        }
    }

    fn derive_params(inputs: &[InputDecl]) -> Vec<EndpointParam> {
        inputs.iter().map(EndpointParam::from_decl).collect()
    }

    /// Typed inputs, derived once and index-aligned with `inputs`.
    pub fn input_params(&self) -> &[EndpointParam] {
        self.params.get_or_init(|| Self::derive_params(&self.inputs))
    }

    pub fn input_params_mut(&mut self) -> &mut [EndpointParam] {
        if self.params.get().is_none() {
            let _ = self.params.set(Self::derive_params(&self.inputs));
        }
        self.params
            .get_mut()
            .map(Vec::as_mut_slice)
            .unwrap_or_default()
    }

    pub fn has_prompt(&self) -> bool {
        self.input_params()
            .iter()
            .any(|p| p.param_type == ParameterType::Text)
    }

    pub fn output_is_mask(&self) -> bool {
        self.outputs.iter().any(|o| o.name.contains(MASK_OUTPUT))
    }

    /// First single-image input.
    pub fn input_image_param(&self) -> Option<&str> {
        self.input_params()
            .iter()
            .find(|p| p.param_type == ParameterType::Image)
            .map(|p| p.name.as_str())
    }

    pub fn input_image_list_params(&self) -> Vec<String> {
        self.input_params()
            .iter()
            .filter(|p| p.param_type == ParameterType::ImageList)
            .map(|p| p.name.clone())
            .collect()
    }

    /// Number of frames an image-list input wants, from the `Image` tokens in its declaration.
    pub fn image_list_len(&self, input: &str) -> usize {
        self.inputs
            .iter()
            .find(|d| d.name == input)
            .map(|d| decl::count_occurrences(&d.decl, IMAGE_TOKEN))
            .unwrap_or(0)
    }

    pub fn set_input_images(&mut self, input: &str, image_ids: Vec<String>) -> bool {
        match self.input_params_mut().iter_mut().find(|p| p.name == input) {
            Some(param) => {
                param.image_ids = image_ids;
                true
            }
            None => false,
        }
    }
}

/// Model settings reported in the `config` section of plugin info.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub model_name: String,
    pub model_dtype: String,
    pub save_output: bool,
}

/// A backend plugin and its endpoints.
#[derive(Clone, Debug, Default)]
pub struct ArkPlugin {
    /// UI name.
    pub name: String,
    /// Name used in backend URLs.
    pub plugin_name: String,
    pub version: String,
    pub author: String,
    pub description: String,
    pub env: String,
    pub license_level: i32,
    pub config: ModelConfig,
    pub endpoints: Vec<Endpoint>,
}

#[derive(serde::Deserialize)]
struct InfoDoc {
    plugin: PluginSection,
    #[serde(default)]
    config: ModelConfig,
    #[serde(default)]
    endpoints: serde_json::Map<String, serde_json::Value>,
}

#[derive(serde::Deserialize)]
struct PluginSection {
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Version", default)]
    version: String,
    #[serde(rename = "Author", default)]
    author: String,
    #[serde(rename = "Description", default)]
    description: String,
    #[serde(default)]
    env: String,
    #[serde(default)]
    license: i32,
}

#[derive(serde::Deserialize)]
struct EndpointSection {
    #[serde(default)]
    call: String,
    #[serde(default)]
    tag: String,
    #[serde(default)]
    inputs: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    outputs: serde_json::Map<String, serde_json::Value>,
}

fn decls(
    endpoint: &str,
    map: serde_json::Map<String, serde_json::Value>,
) -> ArkResult<Vec<InputDecl>> {
    map.into_iter()
        .map(|(name, value)| match value {
            serde_json::Value::String(decl) => Ok(InputDecl { name, decl }),
            other => Err(ArkError::schema(format!(
                "endpoint '{endpoint}' declares '{name}' as {other}, expected a string"
            ))),
        })
        .collect()
}

impl ArkPlugin {
    /// Decodes a `plugins/get_info/<name>` response.
    pub fn from_info_json(plugin_name: &str, text: &str) -> ArkResult<Self> {
        let doc: InfoDoc = serde_json::from_str(text)?;

        let mut endpoints = Vec::with_capacity(doc.endpoints.len());
        for (name, value) in doc.endpoints {
            let section: EndpointSection = serde_json::from_value(value)
                .map_err(|e| ArkError::schema(format!("endpoint '{name}': {e}")))?;
            let mut endpoint = Endpoint::new(
                name.clone(),
                plugin_name,
                decls(&name, section.inputs)?,
                decls(&name, section.outputs)?,
            );
            endpoint.call = section.call;
            endpoint.tag = EndpointTag::parse(&section.tag);
            endpoints.push(endpoint);
        }

        Ok(Self {
            name: doc.plugin.name,
            plugin_name: plugin_name.to_string(),
            version: doc.plugin.version,
            author: doc.plugin.author,
            description: doc.plugin.description,
            env: doc.plugin.env,
            license_level: doc.plugin.license,
            config: doc.config,
            endpoints,
        })
    }

    /// Endpoints shown in the endpoint menu, in menu order.
    pub fn listed_endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.iter().filter(|e| e.tag.is_listed())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/schema/plugin.rs"]
mod tests;
