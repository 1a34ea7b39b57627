use std::collections::HashSet;

use crate::{
    backend::client::UiPage,
    filter::{config::PLUGIN_CONFIG_ID, context::RendererContext, renderer::AiRendererFilter},
    foundation::core::{Color, ParamId, Point2D},
    host::{delegate::HostDelegate, login::run_login_flow},
    params::parameter::{ParamKind, Parameter},
};

pub const PLUGIN_MANAGER_BUTTON: ParamId = ParamId(100_000);
pub const LOGIN_BUTTON: ParamId = ParamId(100_200);
pub const LOGOUT_BUTTON: ParamId = ParamId(100_300);
pub const PLUGIN_CONFIG_BUTTON: ParamId = ParamId(100_500);
pub const REPORT_ISSUE_BUTTON: ParamId = ParamId(100_700);

struct PersistentButtons {
    logout: Parameter,
    login: Parameter,
    manager: Parameter,
    configure: Parameter,
    report: Parameter,
}

impl PersistentButtons {
    fn new(logged_in: bool, selected_filter_name: &str) -> Self {
        Self {
            logout: Parameter::button(LOGOUT_BUTTON, "Logout", "Logout", true, !logged_in),
            login: Parameter::button(LOGIN_BUTTON, "Please Login", "Login", true, logged_in),
            manager: Parameter::button(PLUGIN_MANAGER_BUTTON, "Plugin Manager", "Manage", true, false),
            configure: Parameter::button(
                PLUGIN_CONFIG_BUTTON,
                PLUGIN_CONFIG_ID,
                format!("Configure {selected_filter_name}"),
                true,
                false,
            ),
            report: Parameter::button(REPORT_ISSUE_BUTTON, "Report Issue", "Report Now", true, false),
        }
    }

    fn iter(&self) -> impl Iterator<Item = &Parameter> {
        [
            &self.logout,
            &self.login,
            &self.manager,
            &self.configure,
            &self.report,
        ]
        .into_iter()
    }

    /// Host order: account and manager buttons on top, configuration right under the plugin
    /// menu, issue reporting last.
    fn around(self, params: Vec<Parameter>) -> Vec<Parameter> {
        let mut rest = params.into_iter();
        let mut ordered = vec![self.logout, self.login, self.manager];
        ordered.extend(rest.by_ref().take(1));
        ordered.push(self.configure);
        ordered.extend(rest);
        ordered.push(self.report);
        ordered
    }
}

/// Registers the filter's parameters with the host, persistent buttons first.
///
/// Buttons only exist while the backend is up. With `add_to_host` the controls are created and
/// the parameter cache is saved.
#[tracing::instrument(skip(filter, ctx, host))]
pub fn register_params(
    filter: &mut AiRendererFilter,
    ctx: &mut RendererContext,
    host: &mut dyn HostDelegate,
    add_to_host: bool,
) -> bool {
    filter.clear_persistent_params();
    let mut params: Vec<Parameter> = filter.params().to_vec();

    if ctx.refresh_backend_started() {
        if !ctx.is_logged_in() {
            match ctx.backend().login_status() {
                Ok(logged_in) => ctx.set_logged_in(logged_in),
                Err(err) => tracing::warn!(error = %err, "login status unavailable"),
            }
        }
        tracing::info!(logged_in = ctx.is_logged_in(), "registering persistent buttons");

        let buttons = PersistentButtons::new(ctx.is_logged_in(), filter.selected_filter_name());
        for p in buttons.iter() {
            filter.add_persistent_param(p.clone());
        }
        params = buttons.around(params);
    }

    let mut on_host: HashSet<String> = HashSet::new();
    for p in &params {
        host.register_param(p);
        if add_to_host {
            add_parameter_to_host(host, p);
            on_host.insert(p.string_id.clone());
            tracing::debug!(name = %p.display_name, id = %p.id, "registered param");
        }
    }

    if add_to_host {
        let cached: Vec<Parameter> = ctx
            .param_cache()
            .param_map()
            .iter()
            .filter(|(sid, _)| !on_host.contains(*sid))
            .filter_map(|(_, raw)| Parameter::from_value(raw.clone()).ok())
            .collect();
        for p in &cached {
            add_parameter_to_host(host, p);
        }
        if let Err(err) = ctx.param_cache().save(ctx.backend()) {
            tracing::warn!(error = %err, "parameter cache not saved");
        }
    }
    true
}

/// Creates the host control for one parameter. Text parameters become buttons that open the
/// prompt editor.
pub fn add_parameter_to_host(host: &mut dyn HostDelegate, p: &Parameter) -> bool {
    let name = p.display_name.as_str();
    let added = match &p.kind {
        ParamKind::IntSlider {
            default_value,
            min_value,
            max_value,
        } => host.add_int_slider(p.id, name, *default_value, *min_value, *max_value),
        ParamKind::FloatSlider {
            default_value,
            min_value,
            max_value,
        } => host.add_float_slider(p.id, name, *default_value, *min_value, *max_value),
        ParamKind::Boolean { default_value } => host.add_checkbox(p.id, name, *default_value),
        ParamKind::Button | ParamKind::Text { .. } => {
            let row = if p.custom_display_name {
                p.string_id.as_str()
            } else {
                name
            };
            host.add_button(p.id, row, name, p.custom_display_name, p.starts_hidden)
        }
        ParamKind::Point2D { x, y } => host.add_point(p.id, name, Point2D::new(*x, *y)),
        ParamKind::Color { r, g, b, a } => host.add_color(
            p.id,
            name,
            Color {
                r: *r,
                g: *g,
                b: *b,
                a: *a,
            },
        ),
        ParamKind::Menu {
            default_index,
            menu_items,
        } => host.add_menu(p.id, name, menu_items, *default_index),
        ParamKind::GroupStart => host.start_group(p.id, name),
        ParamKind::GroupEnd => host.end_group(p.id, name),
        ParamKind::Image | ParamKind::ImageList | ParamKind::Unknown => {
            tracing::error!(%name, kind = p.param_type().as_str(), "no host control for param");
            return false;
        }
    };

    if !added {
        tracing::error!(%name, kind = p.param_type().as_str(), "host refused param");
    } else if p.starts_hidden {
        host.set_hidden(p.id, true);
    }
    added
}

/// Routes a host parameter change: persistent buttons are handled here, the rest goes to the
/// filter. `None` is a full refresh.
#[tracing::instrument(skip(filter, ctx, host))]
pub fn update_params(
    filter: &mut AiRendererFilter,
    ctx: &mut RendererContext,
    host: &mut dyn HostDelegate,
    host_index: Option<i32>,
) -> bool {
    register_params(filter, ctx, host, false);
    let param_id = host_index.and_then(|i| host.param_id_from_host_index(i));

    if ctx.backend_started() {
        let page = match param_id {
            Some(PLUGIN_MANAGER_BUTTON) => Some(UiPage::PluginManager),
            Some(PLUGIN_CONFIG_BUTTON) => Some(UiPage::Configure(filter.selected_filter_name().to_string())),
            Some(REPORT_ISSUE_BUTTON) => Some(UiPage::ReportIssue),
            Some(LOGIN_BUTTON) => {
                handle_login_pressed(filter, ctx, host);
                return true;
            }
            Some(LOGOUT_BUTTON) => {
                handle_logout_pressed(filter, ctx, host);
                return true;
            }
            _ => None,
        };
        if let Some(page) = page {
            if let Err(err) = ctx.backend().open_ui(&page) {
                tracing::warn!(page = %page.path(), error = %err, "could not open backend page");
            }
            return true;
        }
    }

    filter.update_params(ctx, host, param_id)
}

fn handle_login_pressed(
    filter: &mut AiRendererFilter,
    ctx: &mut RendererContext,
    host: &mut dyn HostDelegate,
) {
    let (timeout, poll) = (ctx.opts().login_timeout(), ctx.opts().login_poll());
    match run_login_flow(ctx.backend_handle(), timeout, poll) {
        Ok(true) => {
            ctx.set_logged_in(true);
            filter.update_params(ctx, host, None);
            host.set_hidden(LOGIN_BUTTON, true);
            host.set_hidden(LOGOUT_BUTTON, false);
            match ctx.backend().username() {
                Ok(user) => tracing::info!(%user, "logged in"),
                Err(err) => tracing::info!(error = %err, "logged in, username unavailable"),
            }
        }
        Ok(false) => tracing::warn!("login not completed"),
        Err(err) => tracing::error!(error = %err, "login flow failed"),
    }
}

fn handle_logout_pressed(
    filter: &mut AiRendererFilter,
    ctx: &mut RendererContext,
    host: &mut dyn HostDelegate,
) {
    if let Err(err) = ctx.backend().logout() {
        tracing::error!(error = %err, "logout failed");
        return;
    }
    ctx.set_logged_in(false);
    filter.update_params(ctx, host, None);
    host.set_hidden(LOGOUT_BUTTON, true);
    host.set_hidden(LOGIN_BUTTON, false);
    tracing::info!("logged out");
}

#[cfg(test)]
#[path = "../../tests/unit/host/bridge.rs"]
mod tests;
