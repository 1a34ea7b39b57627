use std::{collections::HashMap, time::Instant};

use crate::{
    backend::{
        client::Backend,
        protocol::{FAILED_UPLOAD_ID, JobStatus, JobStatusResponse},
    },
    filter::{
        config::{
            self, FilterConfig, NO_PLUGINS, PLUGIN_CONFIG_ID, PLUGIN_MENU_ID, fetch_filter_configs,
        },
        context::RendererContext,
    },
    foundation::{
        config::RendererOpts,
        core::{ParamId, ParamValue},
        error::{ArkError, ArkResult},
        logging::report_contract_violation,
    },
    host::{
        delegate::HostDelegate,
        prompt::{ExternalPromptDialog, NoPromptDialog, PromptDialog},
    },
    imaging::{
        buffer::{ChannelOrder, ImageBuffer},
        codec::{decode_png, encode_png},
        ops::{copy_alpha_to_image, copy_image, resize_up},
    },
    params::{
        cache::ParamCache,
        parameter::{Parameter, ParameterType},
    },
    schema::plugin::Endpoint,
};

/// Image-list inputs with this prefix take frames before the current one.
const IMAGE_BEFORE_PREFIX: &str = "img_before";
/// Slider max when the declaration gives none.
const DEFAULT_SLIDER_MAX: i32 = 10_000;
/// Body key of the text prompt, whatever the input is called.
const PROMPT_KEY: &str = "prompt";

/// Per-instance render filter: owns the instance's parameters and runs the job pipeline.
pub struct AiRendererFilter {
    params: Vec<Parameter>,
    persistent: Vec<Parameter>,
    uploaded: HashMap<String, String>,
    selected_filter_name: String,
    prompt: Box<dyn PromptDialog>,
}

impl AiRendererFilter {
    pub fn new(prompt: Box<dyn PromptDialog>) -> Self {
        Self {
            params: Vec::new(),
            persistent: Vec::new(),
            uploaded: HashMap::new(),
            selected_filter_name: String::new(),
            prompt,
        }
    }

    /// Uses the configured prompt app, if any.
    pub fn from_opts(opts: &RendererOpts) -> Self {
        let prompt: Box<dyn PromptDialog> = match &opts.prompt_program {
            Some(program) => Box::new(ExternalPromptDialog::new(program)),
            None => Box::new(NoPromptDialog),
        };
        Self::new(prompt)
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn param(&self, id: ParamId) -> Option<&Parameter> {
        self.params.iter().find(|p| p.id == id)
    }

    pub fn param_with_string_id(&self, string_id: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.string_id == string_id)
    }

    pub fn persistent_params(&self) -> &[Parameter] {
        &self.persistent
    }

    pub fn clear_persistent_params(&mut self) {
        self.persistent.clear();
    }

    pub fn add_persistent_param(&mut self, param: Parameter) {
        self.persistent.push(param);
    }

    /// Name of the plugin picked at the last selection, `Select A Plugin` included.
    pub fn selected_filter_name(&self) -> &str {
        &self.selected_filter_name
    }

    /// Uploads of the render in flight, keyed by input name (plus frame index for lists).
    pub fn uploaded_images(&self) -> &HashMap<String, String> {
        &self.uploaded
    }

    /// Makes sure the backend runs, checks for a previous crash, then builds the parameters.
    #[tracing::instrument(skip_all)]
    pub fn initialize(&mut self, ctx: &mut RendererContext) -> bool {
        tracing::info!("initializing AI renderer filter");
        if !ctx.refresh_backend_started() && !ctx.startup_timed_out() {
            if let Err(err) = ctx.launch_backend() {
                tracing::error!(error = %err, "error starting backend");
            }
            if !ctx.refresh_backend_started() {
                tracing::error!("backend is not running");
            }
        }
        if !ctx.backend_started() {
            return false;
        }

        ctx.handle_crash_check();
        match self.init_parameters(ctx) {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(error = %err, "parameter construction failed");
                false
            }
        }
    }

    pub fn shutdown(&mut self, ctx: &mut RendererContext) {
        if ctx.refresh_backend_started()
            && let Err(err) = ctx.backend().shutdown()
        {
            tracing::warn!(error = %err, "backend shutdown failed");
        }
    }

    /// Rebuilds the parameter list from the filter configs and the cache.
    ///
    /// Backend failures return early and leave the current parameters in place.
    #[tracing::instrument(skip_all)]
    pub fn init_parameters(&mut self, ctx: &mut RendererContext) -> ArkResult<()> {
        let backend = ctx.backend_handle();
        if !ctx.param_cache.initialized() {
            ctx.param_cache.init(backend.as_ref());
        }
        if ctx.filter_configs.is_empty() {
            ctx.filter_configs = fetch_filter_configs(backend.as_ref())?;
        }

        let mut params = Vec::new();
        let mut sink = ParamSink {
            cache: &mut ctx.param_cache,
            params: &mut params,
        };
        sink.add_plugin_menu(&ctx.filter_configs);
        for filter_config in ctx.filter_configs.iter_mut() {
            if filter_config.is_sentinel() {
                continue;
            }
            sink.add_filter_params(filter_config);
        }
        sink.add_missing_params();

        tracing::info!(count = params.len(), "parameters built");
        self.params = params;
        self.persistent.clear();
        Ok(())
    }

    /// Renders one frame into the host's destination. `false` leaves the destination as it was.
    #[tracing::instrument(skip_all)]
    pub fn render(&mut self, ctx: &mut RendererContext, host: &mut dyn HostDelegate) -> bool {
        if !ctx.refresh_backend_started() {
            tracing::warn!("backend not running; nothing rendered");
            return false;
        }
        let result = self.try_render(ctx, host);
        if !self.uploaded.is_empty() {
            self.uploaded.clear();
            tracing::debug!("upload map cleared");
        }
        match result {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(error = %err, "render failed");
                false
            }
        }
    }

    fn try_render(&mut self, ctx: &mut RendererContext, host: &mut dyn HostDelegate) -> ArkResult<()> {
        let filter_config = self.selected_config(ctx, &*host)?;
        if filter_config.is_sentinel() {
            return passthrough(host);
        }
        let mut endpoint = selected_endpoint(&filter_config, &*host)?;
        tracing::info!(plugin = %filter_config.name, endpoint = %endpoint.name, "rendering");

        if endpoint.has_prompt() && host.text_prompt().is_empty() {
            tracing::info!("prompt not set, passing source through");
            return passthrough(host);
        }

        let fingerprint = endpoint_params_json(&endpoint, &*host);
        if fingerprint != host.cached_params() {
            tracing::info!("endpoint params changed, invalidating rendered image");
            host.set_rendered_image_id("");
        }

        let backend = ctx.backend_handle();
        let rendered = host.rendered_image_id();
        if !rendered.is_empty() {
            match backend.fetch_image(&rendered).and_then(|bytes| decode_png(&bytes)) {
                Ok(img) => {
                    composite(host, endpoint.output_is_mask(), img)?;
                    tracing::info!(image_id = %rendered, "using cached image");
                    return Ok(());
                }
                Err(err) => {
                    tracing::warn!(image_id = %rendered, error = %err, "cached image unavailable");
                    host.set_rendered_image_id("");
                }
            }
        }

        let body = if self.upload_inputs(backend.as_ref(), &*host, &mut endpoint)? {
            endpoint_params_json(&endpoint, &*host)
        } else {
            fingerprint.clone()
        };
        tracing::debug!(%body, "dispatching job");

        let job_id = backend.call_endpoint(&filter_config.name, &endpoint.name, &body)?;
        if job_id.is_empty() {
            return Err(ArkError::schema("backend returned an empty job id"));
        }

        let started = Instant::now();
        let response = poll_job(backend.as_ref(), &job_id, ctx)?;
        if response.status != JobStatus::Success {
            return Err(ArkError::resource(format!(
                "job {job_id} failed: {}",
                response.status.as_str()
            )));
        }
        let image_id = response
            .image_id
            .ok_or_else(|| ArkError::schema(format!("job {job_id} succeeded without an image")))?;
        // Only a result that decodes is remembered.
        let img = decode_png(&backend.fetch_image(&image_id)?)?;
        host.set_cached_params(&fingerprint);
        host.set_rendered_image_id(&image_id);
        composite(host, endpoint.output_is_mask(), img)?;

        let elapsed = started.elapsed();
        ctx.adapt_poll_interval(elapsed);
        tracing::info!(%job_id, elapsed_ms = elapsed.as_millis(), "job finished");
        Ok(())
    }

    /// Uploads the endpoint's image inputs and substitutes their ids. `true` if anything was
    /// substituted.
    fn upload_inputs(
        &mut self,
        backend: &dyn Backend,
        host: &dyn HostDelegate,
        endpoint: &mut Endpoint,
    ) -> ArkResult<bool> {
        let lists = endpoint.input_image_list_params();
        if !lists.is_empty() {
            let current = host.current_frame();
            for input in lists {
                let count = endpoint.image_list_len(&input);
                let direction: i64 = if input.starts_with(IMAGE_BEFORE_PREFIX) { -1 } else { 1 };
                let frames: Vec<Option<Vec<u8>>> = (1..=count)
                    .map(|i| {
                        let frame = current + direction * i as i64;
                        tracing::debug!(%input, frame, current, "requesting frame");
                        host.image_at_frame(frame).and_then(|img| {
                            encode_png(&img)
                                .inspect_err(|err| tracing::warn!(frame, error = %err, "frame did not encode"))
                                .ok()
                        })
                    })
                    .collect();
                let ids = backend.upload_images(&frames);
                for (i, id) in ids.iter().enumerate() {
                    self.uploaded.insert(format!("{input}{i}"), id.clone());
                }
                endpoint.set_input_images(&input, ids);
            }
            return Ok(true);
        }

        let Some(input) = endpoint.input_image_param().map(str::to_string) else {
            return Ok(false);
        };
        let source = host
            .source_image()
            .ok_or_else(|| ArkError::resource("host has no source frame"))?;
        let id = backend.upload_image(&encode_png(&source)?).unwrap_or_else(|err| {
            tracing::warn!(%input, error = %err, "source upload failed");
            FAILED_UPLOAD_ID.to_string()
        });
        self.uploaded.insert(input.clone(), id.clone());
        endpoint.set_input_images(&input, vec![id]);
        Ok(true)
    }

    /// Applies visibility and licensing after a parameter change. `None` is a full pass.
    #[tracing::instrument(skip(self, ctx, host))]
    pub fn update_params(
        &mut self,
        ctx: &mut RendererContext,
        host: &mut dyn HostDelegate,
        changed: Option<ParamId>,
    ) -> bool {
        if !ctx.refresh_backend_started() {
            return false;
        }
        let filter_config = match self.selected_config(ctx, &*host) {
            Ok(c) => c,
            Err(err) => {
                tracing::error!(error = %err, "no plugin selection");
                self.hide_all_params(host);
                return false;
            }
        };

        if changed.is_none() {
            for p in &self.persistent {
                let hidden = if filter_config.is_sentinel() && p.string_id == PLUGIN_CONFIG_ID {
                    true
                } else {
                    p.starts_hidden
                };
                host.set_hidden(p.id, hidden);
            }
        }

        if let Some(id) = changed
            && self.is_prompt_param(id)
        {
            return self.show_prompt_ui(host);
        }

        host.set_rendered_image_id("");

        if filter_config.is_sentinel() {
            self.hide_all_params(host);
            if let Some(button) = self.persistent.iter().find(|p| p.string_id == PLUGIN_CONFIG_ID) {
                host.set_hidden(button.id, true);
            }
            return true;
        }

        let endpoint = match selected_endpoint(&filter_config, &*host) {
            Ok(e) => e,
            Err(err) => {
                tracing::error!(error = %err, "no endpoint selection");
                self.hide_all_params(host);
                return false;
            }
        };

        let licensed = match ctx.backend().subscription_level() {
            Ok(level) => filter_config.required_license <= level,
            Err(err) => {
                tracing::warn!(error = %err, "subscription level unavailable");
                filter_config.required_license <= 0
            }
        };

        let plugin = filter_config.plugin_name();
        let endpoint_prefix = format!("{}.", config::endpoint_id(plugin, &endpoint.name));
        let start_group = config::plugin_start_group_id(plugin);
        let end_group = config::plugin_end_group_id(plugin);
        let endpoint_menu = config::endpoint_menu_id(plugin);

        for param in &self.params {
            let sid = param.string_id.as_str();
            let is_effect = sid.starts_with(&endpoint_prefix) || sid == endpoint_menu;
            let show = (sid == PLUGIN_MENU_ID || sid == start_group || sid == end_group || is_effect)
                && !param.starts_hidden;
            host.set_hidden(param.id, !show);
            if is_effect {
                host.set_enabled(param.id, licensed);
            }
        }
        tracing::debug!(plugin, endpoint = %endpoint.name, licensed, "visibility updated");
        true
    }

    fn selected_config(
        &mut self,
        ctx: &mut RendererContext,
        host: &dyn HostDelegate,
    ) -> ArkResult<FilterConfig> {
        let menu_id = ctx.param_cache.id_for_string_id(PLUGIN_MENU_ID);
        let index = host
            .param_value(menu_id)
            .and_then(ParamValue::as_int)
            .ok_or_else(|| ArkError::validation("plugin menu has no value"))?;
        let filter_config = usize::try_from(index)
            .ok()
            .and_then(|i| ctx.filter_configs.get(i))
            .ok_or_else(|| ArkError::validation(format!("plugin menu index {index} out of range")))?;
        self.selected_filter_name = filter_config.name.clone();
        Ok(filter_config.clone())
    }

    fn is_prompt_param(&self, id: ParamId) -> bool {
        self.param(id)
            .is_some_and(|p| p.param_type() == ParameterType::Text)
    }

    /// Opens the prompt editor; a changed prompt invalidates the rendered image.
    fn show_prompt_ui(&self, host: &mut dyn HostDelegate) -> bool {
        let current = host.text_prompt();
        let next = match self.prompt.show(&current) {
            Ok(next) => next,
            Err(err) => {
                tracing::warn!(error = %err, "prompt dialog failed");
                return false;
            }
        };
        if next == current {
            return false;
        }
        host.set_text_prompt(&next);
        host.set_rendered_image_id("");
        true
    }

    fn hide_all_params(&self, host: &mut dyn HostDelegate) {
        for param in &self.params {
            host.set_hidden(param.id, param.string_id != PLUGIN_MENU_ID);
        }
    }
}

fn selected_endpoint(filter_config: &FilterConfig, host: &dyn HostDelegate) -> ArkResult<Endpoint> {
    let menu_id = filter_config.endpoint_param_id.ok_or_else(|| {
        ArkError::validation(format!("plugin '{}' has no endpoint menu", filter_config.name))
    })?;
    let index = host
        .param_value(menu_id)
        .and_then(ParamValue::as_int)
        .ok_or_else(|| ArkError::validation("endpoint menu has no value"))?;
    filter_config
        .endpoint(index)
        .cloned()
        .ok_or_else(|| ArkError::validation(format!("endpoint menu index {index} out of range")))
}

/// Widens through the shortest decimal form, so a host value of 0.7 is sent as 0.7.
fn float_json(v: f32) -> serde_json::Value {
    let wide = v.to_string().parse::<f64>().unwrap_or(f64::from(v));
    serde_json::Number::from_f64(wide).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

/// Current endpoint-parameter values as a JSON object, in declaration order.
///
/// Doubles as the render fingerprint before image ids are substituted.
pub fn endpoint_params_json(endpoint: &Endpoint, host: &dyn HostDelegate) -> String {
    let mut body = serde_json::Map::new();
    let value = |id: Option<ParamId>| id.and_then(|id| host.param_value(id));
    for p in endpoint.input_params() {
        match p.param_type {
            ParameterType::IntSlider => {
                let v = value(p.id)
                    .and_then(ParamValue::as_int)
                    .or(p.default_int())
                    .unwrap_or(0);
                body.insert(p.name.clone(), serde_json::Value::from(v));
            }
            ParameterType::FloatSlider => {
                let v = value(p.id)
                    .and_then(ParamValue::as_float)
                    .or(p.default_float())
                    .unwrap_or(0.0);
                body.insert(p.name.clone(), float_json(v));
            }
            ParameterType::Boolean => {
                let v = value(p.id)
                    .and_then(ParamValue::as_bool)
                    .or(p.default_bool())
                    .unwrap_or(false);
                body.insert(p.name.clone(), serde_json::Value::Bool(v));
            }
            ParameterType::Text => {
                body.insert(PROMPT_KEY.to_string(), host.text_prompt().into());
            }
            ParameterType::ImageList => {
                let ids = p.image_ids.iter().cloned().map(serde_json::Value::String);
                body.insert(p.name.clone(), serde_json::Value::Array(ids.collect()));
            }
            ParameterType::Image => {
                let id = p.image_ids.first().cloned().unwrap_or_default();
                body.insert(p.name.clone(), serde_json::Value::String(id));
            }
            other => report_contract_violation(&format!(
                "endpoint '{}' input '{}' has unsupported type {}",
                endpoint.name,
                p.name,
                other.as_str()
            )),
        }
    }
    serde_json::Value::Object(body).to_string()
}

fn poll_job(
    backend: &dyn Backend,
    job_id: &str,
    ctx: &RendererContext,
) -> ArkResult<JobStatusResponse> {
    let interval = ctx.poll_interval();
    let max_attempts = ctx.opts().max_poll_attempts;
    let mut response = backend.job_status(job_id)?;
    let mut attempts = 0;
    while response.status == JobStatus::InProgress {
        if attempts >= max_attempts {
            return Err(ArkError::timeout(format!(
                "job {job_id} still running after {attempts} polls"
            )));
        }
        std::thread::sleep(interval);
        response = backend.job_status(job_id)?;
        attempts += 1;
        tracing::debug!(job_id, attempt = attempts, status = response.status.as_str(), "job polled");
    }
    Ok(response)
}

fn passthrough(host: &mut dyn HostDelegate) -> ArkResult<()> {
    let downsample = host.downsample();
    let source = host
        .source_image()
        .ok_or_else(|| ArkError::resource("host has no source frame"))?;
    let dest = host
        .dest_image_mut()
        .ok_or_else(|| ArkError::resource("host has no destination frame"))?;
    copy_image(&source, dest, downsample)
}

/// Writes a fetched result into the destination. Masks keep the source colors and replace alpha.
fn composite(host: &mut dyn HostDelegate, output_is_mask: bool, img: ImageBuffer) -> ArkResult<()> {
    let downsample = host.downsample();
    let source = if output_is_mask {
        Some(
            host.source_image()
                .ok_or_else(|| ArkError::resource("host has no source frame"))?,
        )
    } else {
        None
    };
    let dest = host
        .dest_image_mut()
        .ok_or_else(|| ArkError::resource("host has no destination frame"))?;

    let Some(source) = source else {
        return copy_image(&img, dest, downsample);
    };
    copy_image(&source, dest, downsample)?;
    let mut mask = if img.width != dest.width || img.height != dest.height {
        resize_up(&img, dest.width, dest.height)?
    } else {
        img
    };
    mask.order = ChannelOrder::Aaa;
    copy_alpha_to_image(&mask, dest)
}

/// Collects freshly built parameters, syncing each with its cached copy.
struct ParamSink<'a> {
    cache: &'a mut ParamCache,
    params: &'a mut Vec<Parameter>,
}

impl ParamSink<'_> {
    fn id(&mut self, string_id: &str) -> ParamId {
        self.cache.id_for_string_id(string_id)
    }

    fn add(&mut self, mut param: Parameter) {
        if let Some(cached) = self.cache.get_param(&param.string_id) {
            param.sync_with_cached(&cached);
        }
        self.cache.add_param(&param);
        self.params.push(param);
    }

    fn add_to(&mut self, owner: &mut Vec<String>, param: Parameter) {
        owner.push(param.string_id.clone());
        self.add(param);
    }

    fn add_plugin_menu(&mut self, filter_configs: &[FilterConfig]) {
        let items: Vec<String> = if filter_configs.is_empty() {
            vec![NO_PLUGINS.to_string()]
        } else {
            filter_configs.iter().map(|c| c.name.clone()).collect()
        };
        let id = self.id(PLUGIN_MENU_ID);
        self.add(Parameter::menu(id, PLUGIN_MENU_ID, "Plugins", items, 0));
    }

    fn add_filter_params(&mut self, filter_config: &mut FilterConfig) {
        filter_config.param_string_ids.clear();
        let plugin = filter_config.plugin.plugin_name.clone();
        let owner = &mut filter_config.param_string_ids;

        let start_id = config::plugin_start_group_id(&plugin);
        let id = self.id(&start_id);
        self.add_to(owner, Parameter::group_start(id, start_id, &filter_config.name));

        let listed: Vec<String> = filter_config
            .plugin
            .listed_endpoints()
            .map(|e| e.name.clone())
            .collect();
        filter_config.endpoint_param_id = None;
        if !listed.is_empty() {
            let menu_id = config::endpoint_menu_id(&plugin);
            let id = self.id(&menu_id);
            filter_config.endpoint_param_id = Some(id);
            self.add_to(owner, Parameter::menu(id, menu_id, "Endpoint", listed, 0));

            for endpoint in filter_config.plugin.endpoints.iter_mut() {
                self.add_endpoint_params(owner, &plugin, endpoint);
            }
        }

        let end_id = config::plugin_end_group_id(&plugin);
        let id = self.id(&end_id);
        self.add_to(owner, Parameter::group_end(id, end_id, &filter_config.name));
    }

    fn add_endpoint_params(&mut self, owner: &mut Vec<String>, plugin: &str, endpoint: &mut Endpoint) {
        let name = endpoint.name.clone();
        let listed = endpoint.tag.is_listed();

        let start_id = config::endpoint_group_start_id(plugin, &name);
        let id = self.id(&start_id);
        self.add_to(owner, Parameter::group_start(id, start_id, &name));

        for input in endpoint.input_params_mut() {
            let string_id = config::endpoint_input_id(plugin, &name, &input.name);
            let kind = input.param_type;
            if matches!(kind, ParameterType::Image | ParameterType::ImageList) {
                continue;
            }
            if !matches!(
                kind,
                ParameterType::Text
                    | ParameterType::IntSlider
                    | ParameterType::FloatSlider
                    | ParameterType::Boolean
            ) {
                if listed {
                    report_contract_violation(&format!(
                        "unknown parameter type for '{}' in {plugin}.{name}",
                        input.name
                    ));
                }
                continue;
            }

            let id = self.id(&string_id);
            input.id = Some(id);
            let param = match kind {
                ParameterType::Text => Parameter::text(id, string_id, &input.name, ""),
                ParameterType::IntSlider => Parameter::int_slider(
                    id,
                    string_id,
                    &input.name,
                    input.default_int().unwrap_or(0),
                    input.min_int().unwrap_or(0),
                    input.max_int().unwrap_or(DEFAULT_SLIDER_MAX),
                ),
                ParameterType::FloatSlider => Parameter::float_slider(
                    id,
                    string_id,
                    &input.name,
                    input.default_float().unwrap_or(0.0),
                    input.min_float().unwrap_or(0.0),
                    input.max_float().unwrap_or(DEFAULT_SLIDER_MAX as f32),
                ),
                _ => Parameter::boolean(
                    id,
                    string_id,
                    &input.name,
                    input.default_bool().unwrap_or(false),
                ),
            };
            self.add_to(owner, param);
        }

        let end_id = config::endpoint_group_end_id(plugin, &name);
        let id = self.id(&end_id);
        self.add_to(owner, Parameter::group_end(id, end_id, &name));
    }

    /// Re-adds cached parameters nothing built this pass, hidden, so they survive the next save.
    fn add_missing_params(&mut self) {
        let missing: Vec<Parameter> = self
            .cache
            .param_map()
            .iter()
            .filter(|(sid, _)| !self.params.iter().any(|p| &p.string_id == *sid))
            .filter_map(|(sid, raw)| match Parameter::from_value(raw.clone()) {
                Ok(p) => Some(p),
                Err(err) => {
                    tracing::warn!(string_id = %sid, error = %err, "orphaned param does not decode");
                    None
                }
            })
            .collect();
        for mut param in missing {
            tracing::debug!(string_id = %param.string_id, "re-adding orphaned param hidden");
            param.starts_hidden = true;
            self.cache.add_param(&param);
            self.params.push(param);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/filter/renderer.rs"]
mod tests;
