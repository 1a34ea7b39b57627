use std::collections::{BTreeMap, HashMap};

use crate::{
    foundation::core::{Color, ParamId, ParamValue, Point2D},
    host::delegate::HostDelegate,
    imaging::buffer::ImageBuffer,
    params::parameter::Parameter,
};

#[derive(Clone, Debug, PartialEq)]
pub enum Control {
    IntSlider { min: i32, max: i32 },
    FloatSlider { min: f32, max: f32 },
    Checkbox,
    Button { label: String, custom_display_name: bool },
    Point,
    Color,
    Menu { items: Vec<String> },
    GroupStart,
    GroupEnd,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ControlState {
    pub name: String,
    pub control: Control,
    pub hidden: bool,
    pub enabled: bool,
}

/// Headless [`HostDelegate`] that keeps controls, values and frames in memory.
///
/// Host indices are assigned in control creation order.
#[derive(Clone, Debug)]
pub struct MemoryHost {
    name: String,
    controls: BTreeMap<ParamId, ControlState>,
    order: Vec<ParamId>,
    values: HashMap<ParamId, ParamValue>,
    registered: Vec<ParamId>,
    prompt: String,
    rendered_image_id: String,
    cached_params: String,
    source: Option<ImageBuffer>,
    dest: Option<ImageBuffer>,
    frames: BTreeMap<i64, ImageBuffer>,
    current_frame: i64,
    downsample: (u32, u32),
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self {
            name: "memory".to_string(),
            controls: BTreeMap::new(),
            order: Vec::new(),
            values: HashMap::new(),
            registered: Vec::new(),
            prompt: String::new(),
            rendered_image_id: String::new(),
            cached_params: String::new(),
            source: None,
            dest: None,
            frames: BTreeMap::new(),
            current_frame: 0,
            downsample: (1, 1),
        }
    }
}

impl MemoryHost {
    pub fn new(source: ImageBuffer, dest: ImageBuffer) -> Self {
        Self {
            source: Some(source),
            dest: Some(dest),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn set_value(&mut self, id: ParamId, value: ParamValue) {
        self.values.insert(id, value);
    }

    pub fn set_source(&mut self, img: ImageBuffer) {
        self.source = Some(img);
    }

    pub fn set_dest(&mut self, img: ImageBuffer) {
        self.dest = Some(img);
    }

    pub fn dest(&self) -> Option<&ImageBuffer> {
        self.dest.as_ref()
    }

    pub fn insert_frame(&mut self, frame: i64, img: ImageBuffer) {
        self.frames.insert(frame, img);
    }

    pub fn set_current_frame(&mut self, frame: i64) {
        self.current_frame = frame;
    }

    pub fn set_downsample(&mut self, dx: u32, dy: u32) {
        self.downsample = (dx, dy);
    }

    pub fn control(&self, id: ParamId) -> Option<&ControlState> {
        self.controls.get(&id)
    }

    /// Controls in host-index order.
    pub fn controls(&self) -> impl Iterator<Item = (ParamId, &ControlState)> {
        self.order
            .iter()
            .filter_map(|id| self.controls.get(id).map(|c| (*id, c)))
    }

    pub fn is_hidden(&self, id: ParamId) -> bool {
        self.controls.get(&id).is_some_and(|c| c.hidden)
    }

    pub fn is_enabled(&self, id: ParamId) -> bool {
        self.controls.get(&id).is_some_and(|c| c.enabled)
    }

    pub fn host_index_of(&self, id: ParamId) -> Option<i32> {
        self.order
            .iter()
            .position(|x| *x == id)
            .and_then(|i| i32::try_from(i).ok())
    }

    pub fn registered(&self) -> &[ParamId] {
        &self.registered
    }

    fn add(&mut self, id: ParamId, name: &str, control: Control, hidden: bool) -> bool {
        if !self.controls.contains_key(&id) {
            self.order.push(id);
        }
        self.controls.insert(
            id,
            ControlState {
                name: name.to_string(),
                control,
                hidden,
                enabled: true,
            },
        );
        true
    }

    fn default_value(&mut self, id: ParamId, value: ParamValue) {
        self.values.entry(id).or_insert(value);
    }
}

impl HostDelegate for MemoryHost {
    fn host_name(&self) -> String {
        self.name.clone()
    }

    fn current_frame(&self) -> i64 {
        self.current_frame
    }

    fn downsample(&self) -> (u32, u32) {
        self.downsample
    }

    fn register_param(&mut self, param: &Parameter) {
        if !self.registered.contains(&param.id) {
            self.registered.push(param.id);
        }
    }

    fn param_value(&self, id: ParamId) -> Option<ParamValue> {
        self.values.get(&id).copied()
    }

    fn param_id_from_host_index(&self, host_index: i32) -> Option<ParamId> {
        usize::try_from(host_index)
            .ok()
            .and_then(|i| self.order.get(i).copied())
    }

    fn text_prompt(&self) -> String {
        self.prompt.clone()
    }

    fn set_text_prompt(&mut self, prompt: &str) {
        self.prompt = prompt.to_string();
    }

    fn rendered_image_id(&self) -> String {
        self.rendered_image_id.clone()
    }

    fn set_rendered_image_id(&mut self, image_id: &str) {
        self.rendered_image_id = image_id.to_string();
    }

    fn cached_params(&self) -> String {
        self.cached_params.clone()
    }

    fn set_cached_params(&mut self, params: &str) {
        self.cached_params = params.to_string();
    }

    fn source_image(&self) -> Option<ImageBuffer> {
        self.source.clone()
    }

    fn dest_image_mut(&mut self) -> Option<&mut ImageBuffer> {
        self.dest.as_mut()
    }

    fn image_at_frame(&self, frame: i64) -> Option<ImageBuffer> {
        if frame == self.current_frame && !self.frames.contains_key(&frame) {
            return self.source.clone();
        }
        self.frames.get(&frame).cloned()
    }

    fn add_int_slider(&mut self, id: ParamId, name: &str, default: i32, min: i32, max: i32) -> bool {
        self.default_value(id, ParamValue::Int(default));
        self.add(id, name, Control::IntSlider { min, max }, false)
    }

    fn add_float_slider(
        &mut self,
        id: ParamId,
        name: &str,
        default: f32,
        min: f32,
        max: f32,
    ) -> bool {
        self.default_value(id, ParamValue::Float(default));
        self.add(id, name, Control::FloatSlider { min, max }, false)
    }

    fn add_checkbox(&mut self, id: ParamId, name: &str, default: bool) -> bool {
        self.default_value(id, ParamValue::Bool(default));
        self.add(id, name, Control::Checkbox, false)
    }

    fn add_button(
        &mut self,
        id: ParamId,
        name: &str,
        label: &str,
        custom_display_name: bool,
        starts_hidden: bool,
    ) -> bool {
        let control = Control::Button {
            label: label.to_string(),
            custom_display_name,
        };
        self.add(id, name, control, starts_hidden)
    }

    fn add_point(&mut self, id: ParamId, name: &str, default: Point2D) -> bool {
        self.default_value(id, ParamValue::Point(default));
        self.add(id, name, Control::Point, false)
    }

    fn add_color(&mut self, id: ParamId, name: &str, default: Color) -> bool {
        self.default_value(id, ParamValue::Color(default));
        self.add(id, name, Control::Color, false)
    }

    fn add_menu(&mut self, id: ParamId, name: &str, items: &[String], default_index: i32) -> bool {
        self.default_value(id, ParamValue::Int(default_index));
        let control = Control::Menu {
            items: items.to_vec(),
        };
        self.add(id, name, control, false)
    }

    fn start_group(&mut self, id: ParamId, name: &str) -> bool {
        self.add(id, name, Control::GroupStart, false)
    }

    fn end_group(&mut self, id: ParamId, name: &str) -> bool {
        self.add(id, name, Control::GroupEnd, false)
    }

    fn set_hidden(&mut self, id: ParamId, hidden: bool) {
        if let Some(c) = self.controls.get_mut(&id) {
            c.hidden = hidden;
        }
    }

    fn set_enabled(&mut self, id: ParamId, enabled: bool) {
        if let Some(c) = self.controls.get_mut(&id) {
            c.enabled = enabled;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/host/memory.rs"]
mod tests;
