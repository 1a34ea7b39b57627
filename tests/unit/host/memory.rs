use super::*;
use crate::imaging::buffer::{ChannelOrder, PixelFormat};

fn frame(fill: u8) -> ImageBuffer {
    let mut img = ImageBuffer::new(2, 2, PixelFormat::Rgba8, ChannelOrder::Rgba);
    img.data.fill(fill);
    img
}

#[test]
fn host_indices_follow_creation_order() {
    let mut host = MemoryHost::default();
    assert!(host.start_group(ParamId(10), "group"));
    assert!(host.add_int_slider(ParamId(11), "steps", 20, 1, 100));
    assert!(host.end_group(ParamId(12), "group"));
    // Re-adding keeps the original slot.
    host.add_int_slider(ParamId(11), "steps", 30, 1, 100);

    assert_eq!(host.param_id_from_host_index(1), Some(ParamId(11)));
    assert_eq!(host.host_index_of(ParamId(12)), Some(2));
    assert_eq!(host.param_id_from_host_index(3), None);
    assert_eq!(host.param_id_from_host_index(-1), None);
}

#[test]
fn defaults_do_not_overwrite_set_values() {
    let mut host = MemoryHost::default();
    host.set_value(ParamId(1), ParamValue::Int(7));
    host.add_int_slider(ParamId(1), "n", 3, 0, 10);
    host.add_checkbox(ParamId(2), "b", true);
    host.add_menu(ParamId(3), "m", &["a".to_string(), "b".to_string()], 1);

    assert_eq!(host.param_value(ParamId(1)), Some(ParamValue::Int(7)));
    assert_eq!(host.param_value(ParamId(2)), Some(ParamValue::Bool(true)));
    assert_eq!(host.param_value(ParamId(3)), Some(ParamValue::Int(1)));
    assert_eq!(host.param_value(ParamId(4)), None);
}

#[test]
fn visibility_flags_track_calls() {
    let mut host = MemoryHost::default();
    host.add_button(ParamId(5), "Please Login", "Login", true, true);
    assert!(host.is_hidden(ParamId(5)));
    assert!(host.is_enabled(ParamId(5)));

    host.set_hidden(ParamId(5), false);
    host.set_enabled(ParamId(5), false);
    assert!(!host.is_hidden(ParamId(5)));
    assert!(!host.is_enabled(ParamId(5)));

    match &host.control(ParamId(5)).map(|c| c.control.clone()) {
        Some(Control::Button { label, .. }) => assert_eq!(label, "Login"),
        other => panic!("unexpected control: {other:?}"),
    }
}

#[test]
fn frames_fall_back_to_source_at_current_frame() {
    let mut host = MemoryHost::new(frame(9), frame(0));
    host.set_current_frame(4);
    host.insert_frame(5, frame(50));

    assert_eq!(host.image_at_frame(4).map(|f| f.data[0]), Some(9));
    assert_eq!(host.image_at_frame(5).map(|f| f.data[0]), Some(50));
    assert!(host.image_at_frame(6).is_none());
}

#[test]
fn per_instance_strings_round_trip() {
    let mut host = MemoryHost::default();
    host.set_text_prompt("a cat");
    host.set_rendered_image_id("img-1");
    host.set_cached_params("{\"prompt\":\"a cat\"}");
    assert_eq!(host.text_prompt(), "a cat");
    assert_eq!(host.rendered_image_id(), "img-1");
    assert_eq!(host.cached_params(), "{\"prompt\":\"a cat\"}");
}
