use super::*;

const SD_INFO: &str = include_str!("../../fixtures/sd_info.json");
const BISENET_INFO: &str = include_str!("../../fixtures/bisenet_info.json");

#[test]
fn decodes_sd_info_in_declaration_order() {
    let plugin = ArkPlugin::from_info_json("sd", SD_INFO).unwrap();
    assert_eq!(plugin.name, "Stable Diffusion (diffusers)");
    assert_eq!(plugin.plugin_name, "sd");
    assert_eq!(plugin.env, "sd");
    assert_eq!(plugin.license_level, 0);
    assert_eq!(plugin.config.model_name, "runwayml/stable-diffusion-v1-5");
    assert!(plugin.config.save_output);

    let names: Vec<&str> = plugin.endpoints.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["generate_image", "refine_image"]);

    let generate = &plugin.endpoints[0];
    assert_eq!(generate.call, "execute");
    assert_eq!(generate.plugin_name, "sd");
    let inputs: Vec<&str> = generate.inputs.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(
        inputs,
        ["prompt", "seed", "iterations", "height", "width", "guidance_scale", "skin", "l_brow"]
    );
    assert_eq!(generate.inputs[1].decl, "Int(default=None, optional=true)");
    assert_eq!(generate.outputs[0].name, "output_img");
}

#[test]
fn derives_typed_params() {
    let plugin = ArkPlugin::from_info_json("sd", SD_INFO).unwrap();
    let generate = &plugin.endpoints[0];
    let params = generate.input_params();

    assert_eq!(params[0].param_type, ParameterType::Text);
    assert!(generate.has_prompt());

    let seed = &params[1];
    assert_eq!(seed.param_type, ParameterType::IntSlider);
    assert_eq!(seed.default_int(), None);
    assert!(seed.optional);

    let iterations = &params[2];
    assert_eq!(iterations.default_int(), Some(20));
    assert_eq!(iterations.min_int(), Some(1));
    assert_eq!(iterations.max_int(), None);

    assert_eq!(params[3].default_int(), Some(512));
    assert_eq!(params[3].min_int(), Some(16));

    let guidance = &params[5];
    assert_eq!(guidance.param_type, ParameterType::FloatSlider);
    assert_eq!(guidance.default_float(), Some(7.5));
    assert_eq!(guidance.min_float(), Some(0.0));

    let skin = &params[6];
    assert_eq!(skin.param_type, ParameterType::Boolean);
    assert_eq!(skin.default_bool(), Some(true));
    assert_eq!(skin.help, "");

    assert!(!generate.output_is_mask());
    assert_eq!(plugin.endpoints[1].input_image_param(), Some("img"));
}

#[test]
fn bisenet_is_a_mask_endpoint_without_prompt() {
    let plugin = ArkPlugin::from_info_json("bisenet", BISENET_INFO).unwrap();
    assert_eq!(plugin.license_level, 1);
    let segment = &plugin.endpoints[0];
    assert!(segment.output_is_mask());
    assert!(!segment.has_prompt());
    assert_eq!(
        segment.input_params()[1].help,
        "whether to include skin in mask"
    );

    let listed: Vec<&str> = plugin.listed_endpoints().map(|e| e.name.as_str()).collect();
    assert_eq!(listed, ["segment_face"]);
    assert_eq!(plugin.endpoints[1].tag, EndpointTag::Deprecated);
}

#[test]
fn derived_params_are_memoized() {
    let mut plugin = ArkPlugin::from_info_json("sd", SD_INFO).unwrap();
    let endpoint = &mut plugin.endpoints[1];
    endpoint.input_params_mut()[0].id = Some(ParamId(10042));
    assert!(endpoint.set_input_images("img", vec!["abc".to_string()]));
    assert_eq!(endpoint.input_params()[0].id, Some(ParamId(10042)));
    assert_eq!(endpoint.input_params()[1].image_ids, ["abc"]);
    assert!(!endpoint.set_input_images("nope", vec![]));
}

#[test]
fn image_list_len_counts_tokens() {
    let endpoint = Endpoint::new(
        "interp",
        "frames",
        vec![
            InputDecl {
                name: "img_before".to_string(),
                decl: "List[Image, Image]".to_string(),
            },
            InputDecl {
                name: "img_after".to_string(),
                decl: "List[Image, Image, Image]".to_string(),
            },
        ],
        vec![],
    );
    assert_eq!(
        endpoint.input_image_list_params(),
        ["img_before".to_string(), "img_after".to_string()]
    );
    assert_eq!(endpoint.image_list_len("img_before"), 2);
    assert_eq!(endpoint.image_list_len("img_after"), 3);
    assert_eq!(endpoint.image_list_len("missing"), 0);
}

#[test]
fn non_string_declaration_is_a_schema_error() {
    let text = r#"{"plugin": {"Name": "x"}, "endpoints": {"e": {"inputs": {"a": 3}, "outputs": {}}}}"#;
    assert!(matches!(
        ArkPlugin::from_info_json("x", text),
        Err(ArkError::Schema(_))
    ));
}

#[test]
fn malformed_info_is_a_serde_error() {
    assert!(matches!(
        ArkPlugin::from_info_json("x", "{}"),
        Err(ArkError::Serde(_))
    ));
}
