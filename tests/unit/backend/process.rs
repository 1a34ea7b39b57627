use std::sync::atomic::{AtomicU32, Ordering};

use super::*;
use crate::{
    backend::protocol::JobStatusResponse, params::cache::DataStore, schema::plugin::ArkPlugin,
};

/// Reports running after a fixed number of checks.
struct SlowStart {
    checks: AtomicU32,
    up_after: u32,
}

impl DataStore for SlowStart {
    fn get_data(&self, _key: &str) -> ArkResult<String> {
        Err(ArkError::connectivity("unused"))
    }
    fn set_data(&self, _key: &str, _value: &str) -> ArkResult<()> {
        Ok(())
    }
    fn delete_data(&self, _key: &str) -> ArkResult<()> {
        Ok(())
    }
}

impl Backend for SlowStart {
    fn is_running(&self) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst) + 1 >= self.up_after
    }
    fn login_status(&self) -> ArkResult<bool> {
        Ok(false)
    }
    fn username(&self) -> ArkResult<String> {
        Ok(String::new())
    }
    fn subscription_level(&self) -> ArkResult<i32> {
        Ok(0)
    }
    fn logout(&self) -> ArkResult<()> {
        Ok(())
    }
    fn plugin_list(&self) -> ArkResult<Vec<String>> {
        Ok(Vec::new())
    }
    fn plugin_info(&self, _plugin_name: &str) -> ArkResult<ArkPlugin> {
        Err(ArkError::connectivity("unused"))
    }
    fn plugin_config(&self, _plugin_name: &str) -> ArkResult<serde_json::Value> {
        Ok(serde_json::Value::Null)
    }
    fn set_plugin_config(&self, _plugin_name: &str, _config: &serde_json::Value) -> ArkResult<()> {
        Ok(())
    }
    fn start_plugin(&self, _plugin_name: &str) -> ArkResult<()> {
        Ok(())
    }
    fn stop_plugin(&self, _plugin_name: &str) -> ArkResult<()> {
        Ok(())
    }
    fn upload_image(&self, _png: &[u8]) -> ArkResult<String> {
        Err(ArkError::connectivity("unused"))
    }
    fn call_endpoint(&self, _p: &str, _e: &str, _body: &str) -> ArkResult<String> {
        Err(ArkError::connectivity("unused"))
    }
    fn job_status(&self, _job_id: &str) -> ArkResult<JobStatusResponse> {
        Err(ArkError::connectivity("unused"))
    }
    fn fetch_image(&self, _image_id: &str) -> ArkResult<Vec<u8>> {
        Err(ArkError::connectivity("unused"))
    }
    fn open_ui(&self, _page: &crate::backend::client::UiPage) -> ArkResult<()> {
        Ok(())
    }
    fn request_shutdown(&self) -> ArkResult<()> {
        Ok(())
    }
}

fn slow(up_after: u32) -> SlowStart {
    SlowStart {
        checks: AtomicU32::new(0),
        up_after,
    }
}

#[test]
fn reads_installer_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Config.json");
    std::fs::write(
        &path,
        r#"{"Py_Environment": "/opt/conda/envs/ark/bin/", "Directory": "/opt/ark", "Startup_CMD": "python startup.py"}"#,
    )
    .unwrap();

    let cfg = BackendLaunchConfig::from_path(&path).unwrap();
    assert_eq!(cfg.directory, PathBuf::from("/opt/ark"));
    assert_eq!(cfg.command_line(), "/opt/conda/envs/ark/bin/python startup.py");

    let cmd = cfg.command().unwrap();
    assert_eq!(cmd.get_program(), "/opt/conda/envs/ark/bin/python");
    let args: Vec<_> = cmd.get_args().collect();
    assert_eq!(args, ["startup.py"]);
    assert_eq!(cmd.get_current_dir(), Some(Path::new("/opt/ark")));
}

#[test]
fn missing_key_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Config.json");
    std::fs::write(&path, r#"{"Directory": "/opt/ark", "Startup_CMD": "x"}"#).unwrap();
    assert!(matches!(
        BackendLaunchConfig::from_path(&path),
        Err(ArkError::Serde(_))
    ));
}

#[test]
fn default_path_ends_in_config_json() {
    if let Some(path) = BackendLaunchConfig::default_path() {
        assert!(path.ends_with("DeepMake/Config.json"));
    }
}

#[test]
fn config_locations_are_absolute_and_user_first() {
    let candidates = platform_config_dirs();
    assert!(candidates.iter().all(|dir| dir.is_absolute()), "{candidates:?}");
    if let Some(user) = dirs::config_dir() {
        assert_eq!(candidates.first(), Some(&user));
    }
    #[cfg(target_os = "linux")]
    assert_eq!(candidates.last(), Some(&PathBuf::from("/etc")));
}

#[test]
fn wait_until_running_is_bounded() {
    let b = slow(3);
    assert!(wait_until_running(&b, Duration::ZERO, 5));

    let b = slow(100);
    assert!(!wait_until_running(&b, Duration::ZERO, 5));
    assert_eq!(b.checks.load(Ordering::SeqCst), 6);
}

#[test]
fn start_is_a_noop_when_already_running() {
    let b = slow(1);
    start_backend(&b, &RendererOpts::default()).unwrap();
}

#[test]
fn start_without_config_is_a_resource_error() {
    let dir = tempfile::tempdir().unwrap();
    let opts = RendererOpts {
        backend_config_path: Some(dir.path().join("absent.json")),
        ..RendererOpts::default()
    };
    match start_backend(&slow(100), &opts) {
        Err(ArkError::Resource(msg)) => assert!(msg.contains("not found")),
        other => panic!("unexpected result: {other:?}"),
    }
}
