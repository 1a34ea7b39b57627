use crate::{
    foundation::core::{Color, ParamId, ParamValue, Point2D},
    imaging::buffer::ImageBuffer,
    params::parameter::Parameter,
};

/// What the orchestrator needs from a video host (an effect-plugin SDK adapter).
///
/// Control registration mirrors the host's UI vocabulary; the `add_*` calls return `false` when
/// the host refused the control. Per-instance strings (prompt, rendered image id, fingerprint)
/// are saved by the host with the project.
pub trait HostDelegate {
    fn host_name(&self) -> String;
    fn current_frame(&self) -> i64;
    /// Proxy-resolution factors per axis; `(1, 1)` at full resolution.
    fn downsample(&self) -> (u32, u32);

    /// Makes a parameter known to the host without creating its control.
    fn register_param(&mut self, param: &Parameter);
    fn param_value(&self, id: ParamId) -> Option<ParamValue>;
    fn param_id_from_host_index(&self, host_index: i32) -> Option<ParamId>;

    fn text_prompt(&self) -> String;
    fn set_text_prompt(&mut self, prompt: &str);
    fn rendered_image_id(&self) -> String;
    fn set_rendered_image_id(&mut self, image_id: &str);
    fn cached_params(&self) -> String;
    fn set_cached_params(&mut self, params: &str);

    fn source_image(&self) -> Option<ImageBuffer>;
    fn dest_image_mut(&mut self) -> Option<&mut ImageBuffer>;
    /// Source layer at an absolute frame; `None` outside the clip.
    fn image_at_frame(&self, frame: i64) -> Option<ImageBuffer>;

    fn add_int_slider(&mut self, id: ParamId, name: &str, default: i32, min: i32, max: i32)
    -> bool;
    fn add_float_slider(&mut self, id: ParamId, name: &str, default: f32, min: f32, max: f32)
    -> bool;
    fn add_checkbox(&mut self, id: ParamId, name: &str, default: bool) -> bool;
    fn add_button(
        &mut self,
        id: ParamId,
        name: &str,
        label: &str,
        custom_display_name: bool,
        starts_hidden: bool,
    ) -> bool;
    fn add_point(&mut self, id: ParamId, name: &str, default: Point2D) -> bool;
    fn add_color(&mut self, id: ParamId, name: &str, default: Color) -> bool;
    fn add_menu(&mut self, id: ParamId, name: &str, items: &[String], default_index: i32) -> bool;
    fn start_group(&mut self, id: ParamId, name: &str) -> bool;
    fn end_group(&mut self, id: ParamId, name: &str) -> bool;

    fn set_hidden(&mut self, id: ParamId, hidden: bool);
    fn set_enabled(&mut self, id: ParamId, enabled: bool);
}
