use crate::{
    backend::client::Backend,
    foundation::{core::ParamId, error::ArkResult},
    schema::plugin::{ArkPlugin, Endpoint},
};

/// Menu label of the "no plugin selected" entry at index 0.
pub const SELECT_PLUGIN: &str = "Select A Plugin";
/// Only plugin-menu item when the backend lists no plugins.
pub const NO_PLUGINS: &str = "None";
pub const PLUGIN_MENU_ID: &str = "plugin.menu";
/// String id of the persistent "configure selected plugin" button.
pub const PLUGIN_CONFIG_ID: &str = "Plugin Configuration";

pub fn endpoint_id(plugin_name: &str, endpoint_name: &str) -> String {
    format!("{plugin_name}.{endpoint_name}")
}

pub fn plugin_start_group_id(plugin_name: &str) -> String {
    format!("{plugin_name}.filter.start.group")
}

pub fn plugin_end_group_id(plugin_name: &str) -> String {
    format!("{plugin_name}.filter.end.group")
}

pub fn endpoint_menu_id(plugin_name: &str) -> String {
    format!("{plugin_name}.endpoint.menu")
}

pub fn endpoint_group_start_id(plugin_name: &str, endpoint_name: &str) -> String {
    format!("{}.endpoint.group.start", endpoint_id(plugin_name, endpoint_name))
}

pub fn endpoint_group_end_id(plugin_name: &str, endpoint_name: &str) -> String {
    format!("{}.endpoint.group.end", endpoint_id(plugin_name, endpoint_name))
}

pub fn endpoint_input_id(plugin_name: &str, endpoint_name: &str, input: &str) -> String {
    format!("{}.{input}", endpoint_id(plugin_name, endpoint_name))
}

/// One plugin-menu entry.
#[derive(Clone, Debug, Default)]
pub struct FilterConfig {
    /// Plugin list entry; also the name used to dispatch jobs.
    pub name: String,
    pub plugin: ArkPlugin,
    pub endpoint_param_id: Option<ParamId>,
    pub required_license: i32,
    /// String ids of the parameters this plugin contributed, in UI order.
    pub param_string_ids: Vec<String>,
}

impl FilterConfig {
    pub fn new(name: impl Into<String>, plugin: ArkPlugin) -> Self {
        Self {
            name: name.into(),
            required_license: plugin.license_level,
            plugin,
            ..Self::default()
        }
    }

    pub fn sentinel() -> Self {
        Self {
            name: SELECT_PLUGIN.to_string(),
            ..Self::default()
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.name == SELECT_PLUGIN
    }

    pub fn plugin_name(&self) -> &str {
        &self.plugin.plugin_name
    }

    pub fn contains(&self, string_id: &str) -> bool {
        self.param_string_ids.iter().any(|s| s == string_id)
    }

    /// Position in `plugin.endpoints` of the endpoint-menu entry `menu_index`.
    pub fn endpoint_index(&self, menu_index: i32) -> Option<usize> {
        let menu_index = usize::try_from(menu_index).ok()?;
        self.plugin
            .endpoints
            .iter()
            .enumerate()
            .filter(|(_, e)| e.tag.is_listed())
            .nth(menu_index)
            .map(|(i, _)| i)
    }

    pub fn endpoint(&self, menu_index: i32) -> Option<&Endpoint> {
        self.endpoint_index(menu_index)
            .and_then(|i| self.plugin.endpoints.get(i))
    }
}

/// Builds the plugin-menu list: the sentinel, then one entry per plugin whose info decodes.
///
/// An empty plugin list yields an empty vector (no sentinel).
#[tracing::instrument(skip_all)]
pub fn fetch_filter_configs(backend: &dyn Backend) -> ArkResult<Vec<FilterConfig>> {
    let names = backend.plugin_list()?;
    let mut configs = Vec::with_capacity(names.len() + 1);
    for name in names {
        match backend.plugin_info(&name) {
            Ok(plugin) => configs.push(FilterConfig::new(name, plugin)),
            Err(err) => tracing::warn!(plugin = %name, error = %err, "skipping plugin without info"),
        }
    }
    if !configs.is_empty() {
        configs.insert(0, FilterConfig::sentinel());
    }
    tracing::info!(plugins = configs.len().saturating_sub(1), "filter configs fetched");
    Ok(configs)
}

#[cfg(test)]
#[path = "../../tests/unit/filter/config.rs"]
mod tests;
