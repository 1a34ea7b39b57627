use crate::foundation::{
    core::{Color, ParamId, Point2D},
    error::ArkResult,
    logging::report_contract_violation,
};

pub const MISSING_SUFFIX: &str = "(missing)";

/// Closed set of parameter kinds, without payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParameterType {
    IntSlider,
    FloatSlider,
    Boolean,
    Text,
    Point2D,
    Color,
    Menu,
    GroupStart,
    GroupEnd,
    Button,
    Image,
    ImageList,
    Unknown,
}

impl ParameterType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IntSlider => "IntSlider",
            Self::FloatSlider => "FloatSlider",
            Self::Boolean => "Boolean",
            Self::Text => "Text",
            Self::Point2D => "Point2D",
            Self::Color => "Color",
            Self::Menu => "Menu",
            Self::GroupStart => "GroupStart",
            Self::GroupEnd => "GroupEnd",
            Self::Button => "Button",
            Self::Image => "Image",
            Self::ImageList => "ImageList",
            Self::Unknown => "Unknown",
        }
    }
}

/// Kind-specific payload. The serde tag doubles as the persisted `type` string.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ParamKind {
    #[serde(rename_all = "camelCase")]
    IntSlider {
        default_value: i32,
        min_value: i32,
        max_value: i32,
    },
    #[serde(rename_all = "camelCase")]
    FloatSlider {
        default_value: f32,
        min_value: f32,
        max_value: f32,
    },
    #[serde(rename_all = "camelCase")]
    Boolean { default_value: bool },
    #[serde(rename_all = "camelCase")]
    Text {
        #[serde(default)]
        default_value: String,
    },
    Point2D { x: f32, y: f32 },
    Color { r: f32, g: f32, b: f32, a: f32 },
    #[serde(rename_all = "camelCase")]
    Menu {
        default_index: i32,
        menu_items: Vec<String>,
    },
    GroupStart,
    GroupEnd,
    Button,
    Image,
    ImageList,
    #[serde(other)]
    Unknown,
}

impl ParamKind {
    pub fn param_type(&self) -> ParameterType {
        match self {
            Self::IntSlider { .. } => ParameterType::IntSlider,
            Self::FloatSlider { .. } => ParameterType::FloatSlider,
            Self::Boolean { .. } => ParameterType::Boolean,
            Self::Text { .. } => ParameterType::Text,
            Self::Point2D { .. } => ParameterType::Point2D,
            Self::Color { .. } => ParameterType::Color,
            Self::Menu { .. } => ParameterType::Menu,
            Self::GroupStart => ParameterType::GroupStart,
            Self::GroupEnd => ParameterType::GroupEnd,
            Self::Button => ParameterType::Button,
            Self::Image => ParameterType::Image,
            Self::ImageList => ParameterType::ImageList,
            Self::Unknown => ParameterType::Unknown,
        }
    }
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// One host-agnostic configurable value.
///
/// `string_id` is the cross-session identity; `id` is the host handle the cache assigned to it.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub id: ParamId,
    pub string_id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub starts_hidden: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub custom_display_name: bool,
    #[serde(flatten)]
    pub kind: ParamKind,
}

impl Parameter {
    pub fn new(
        id: ParamId,
        string_id: impl Into<String>,
        display_name: impl Into<String>,
        kind: ParamKind,
    ) -> Self {
        Self {
            id,
            string_id: string_id.into(),
            display_name: display_name.into(),
            starts_hidden: false,
            custom_display_name: false,
            kind,
        }
    }

    pub fn int_slider(
        id: ParamId,
        string_id: impl Into<String>,
        display_name: impl Into<String>,
        default_value: i32,
        min_value: i32,
        max_value: i32,
    ) -> Self {
        Self::new(
            id,
            string_id,
            display_name,
            ParamKind::IntSlider {
                default_value,
                min_value,
                max_value,
            },
        )
    }

    pub fn float_slider(
        id: ParamId,
        string_id: impl Into<String>,
        display_name: impl Into<String>,
        default_value: f32,
        min_value: f32,
        max_value: f32,
    ) -> Self {
        Self::new(
            id,
            string_id,
            display_name,
            ParamKind::FloatSlider {
                default_value,
                min_value,
                max_value,
            },
        )
    }

    pub fn boolean(
        id: ParamId,
        string_id: impl Into<String>,
        display_name: impl Into<String>,
        default_value: bool,
    ) -> Self {
        Self::new(
            id,
            string_id,
            display_name,
            ParamKind::Boolean { default_value },
        )
    }

    pub fn text(
        id: ParamId,
        string_id: impl Into<String>,
        display_name: impl Into<String>,
        default_value: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            string_id,
            display_name,
            ParamKind::Text {
                default_value: default_value.into(),
            },
        )
    }

    pub fn point(
        id: ParamId,
        string_id: impl Into<String>,
        display_name: impl Into<String>,
        default_value: Point2D,
    ) -> Self {
        Self::new(
            id,
            string_id,
            display_name,
            ParamKind::Point2D {
                x: default_value.x,
                y: default_value.y,
            },
        )
    }

    pub fn color(
        id: ParamId,
        string_id: impl Into<String>,
        display_name: impl Into<String>,
        default_value: Color,
    ) -> Self {
        Self::new(
            id,
            string_id,
            display_name,
            ParamKind::Color {
                r: default_value.r,
                g: default_value.g,
                b: default_value.b,
                a: default_value.a,
            },
        )
    }

    pub fn menu(
        id: ParamId,
        string_id: impl Into<String>,
        display_name: impl Into<String>,
        menu_items: Vec<String>,
        default_index: i32,
    ) -> Self {
        Self::new(
            id,
            string_id,
            display_name,
            ParamKind::Menu {
                default_index,
                menu_items,
            },
        )
    }

    pub fn group_start(
        id: ParamId,
        string_id: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self::new(id, string_id, display_name, ParamKind::GroupStart)
    }

    pub fn group_end(
        id: ParamId,
        string_id: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self::new(id, string_id, display_name, ParamKind::GroupEnd)
    }

    /// Buttons carry their label in `display_name` and may start hidden.
    pub fn button(
        id: ParamId,
        string_id: impl Into<String>,
        display_name: impl Into<String>,
        custom_display_name: bool,
        starts_hidden: bool,
    ) -> Self {
        let mut p = Self::new(id, string_id, display_name, ParamKind::Button);
        p.custom_display_name = custom_display_name;
        p.starts_hidden = starts_hidden;
        p
    }

    pub fn param_type(&self) -> ParameterType {
        self.kind.param_type()
    }

    pub fn menu_items(&self) -> Option<&[String]> {
        match &self.kind {
            ParamKind::Menu { menu_items, .. } => Some(menu_items),
            _ => None,
        }
    }

    pub fn to_json(&self) -> ArkResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> ArkResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_value(value: serde_json::Value) -> ArkResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Reconciles a freshly built parameter with its previously cached copy.
    ///
    /// Only menus migrate state: cached options that vanished are kept, suffixed with
    /// `(missing)`, so an index saved against the old list still resolves to the same entry.
    pub fn sync_with_cached(&mut self, cached: &Parameter) {
        if self.id != cached.id || self.string_id != cached.string_id {
            report_contract_violation(&format!(
                "cached param mismatch for '{}': id {} vs cached {} ('{}')",
                self.string_id, self.id, cached.id, cached.string_id
            ));
        }

        let (ParamKind::Menu { menu_items, .. }, Some(cached_items)) =
            (&mut self.kind, cached.menu_items())
        else {
            return;
        };
        reconcile_menu_items(menu_items, cached_items);
    }
}

fn reconcile_menu_items(items: &mut Vec<String>, cached_items: &[String]) {
    for cached in cached_items {
        if items.len() >= cached_items.len() {
            return;
        }
        let stale = if cached.ends_with(MISSING_SUFFIX) {
            cached.clone()
        } else {
            format!("{cached}{MISSING_SUFFIX}")
        };
        if items.contains(cached) || items.contains(&stale) {
            continue;
        }
        tracing::warn!(item = %cached, "menu item missing from backend");
        items.push(stale);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/params/parameter.rs"]
mod tests;
