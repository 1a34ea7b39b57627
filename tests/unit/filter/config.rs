use super::*;
use crate::test_support::{BISENET_INFO, SD_INFO, StubBackend};

fn bisenet() -> FilterConfig {
    let plugin = ArkPlugin::from_info_json("bisenet", BISENET_INFO).unwrap();
    FilterConfig::new("bisenet", plugin)
}

#[test]
fn string_ids_are_dotted_paths() {
    assert_eq!(plugin_start_group_id("sd"), "sd.filter.start.group");
    assert_eq!(plugin_end_group_id("sd"), "sd.filter.end.group");
    assert_eq!(endpoint_menu_id("sd"), "sd.endpoint.menu");
    assert_eq!(
        endpoint_group_start_id("sd", "generate_image"),
        "sd.generate_image.endpoint.group.start"
    );
    assert_eq!(
        endpoint_group_end_id("sd", "generate_image"),
        "sd.generate_image.endpoint.group.end"
    );
    assert_eq!(
        endpoint_input_id("sd", "generate_image", "seed"),
        "sd.generate_image.seed"
    );
}

#[test]
fn endpoint_menu_index_skips_unlisted_endpoints() {
    let config = bisenet();
    assert_eq!(config.required_license, 1);
    assert_eq!(config.endpoint(0).map(|e| e.name.as_str()), Some("segment_face"));
    assert!(config.endpoint(1).is_none());
    assert!(config.endpoint(-1).is_none());
}

#[test]
fn fetch_prepends_sentinel_and_skips_broken_plugins() {
    let backend = StubBackend::running()
        .with_plugin("sd", SD_INFO)
        .with_plugin("broken", "{not json")
        .with_plugin("bisenet", BISENET_INFO);

    let configs = fetch_filter_configs(&backend).unwrap();
    let names: Vec<&str> = configs.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec![SELECT_PLUGIN, "sd", "bisenet"]);
    assert!(configs[0].is_sentinel());
    assert_eq!(configs[1].plugin_name(), "sd");
}

#[test]
fn fetch_without_plugins_yields_no_sentinel() {
    let backend = StubBackend::running();
    let configs = fetch_filter_configs(&backend).unwrap();
    assert!(configs.is_empty());
}
