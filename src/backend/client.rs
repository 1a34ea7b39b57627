use reqwest::{
    blocking::{Client, Response, multipart},
    header::CONTENT_TYPE,
};

use crate::{
    backend::protocol::{
        self, FAILED_UPLOAD_ID, JobStatusResponse, SHUTDOWN_KEY, parse_shutdown_flag,
        shutdown_flag_json,
    },
    foundation::{
        config::RendererOpts,
        error::{ArkError, ArkResult},
    },
    params::cache::DataStore,
    schema::plugin::ArkPlugin,
};

const UPLOAD_FILE_NAME: &str = "temp_data_file.png";

/// Backend web pages the user can be sent to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UiPage {
    Login,
    PluginManager,
    ReportIssue,
    Configure(String),
}

impl UiPage {
    pub fn path(&self) -> String {
        match self {
            Self::Login => "ui/login".to_string(),
            Self::PluginManager => "ui/plugin_manager".to_string(),
            Self::ReportIssue => "ui/report_issue".to_string(),
            Self::Configure(plugin) => format!("ui/configure/{plugin}"),
        }
    }
}

/// Every operation the orchestrator needs from the AI backend.
///
/// All calls block. Implementations must be shareable with the login thread.
pub trait Backend: DataStore + Send + Sync {
    fn is_running(&self) -> bool;

    fn login_status(&self) -> ArkResult<bool>;
    fn username(&self) -> ArkResult<String>;
    fn subscription_level(&self) -> ArkResult<i32>;
    fn logout(&self) -> ArkResult<()>;

    fn plugin_list(&self) -> ArkResult<Vec<String>>;
    fn plugin_info(&self, plugin_name: &str) -> ArkResult<ArkPlugin>;
    fn plugin_config(&self, plugin_name: &str) -> ArkResult<serde_json::Value>;
    fn set_plugin_config(&self, plugin_name: &str, config: &serde_json::Value) -> ArkResult<()>;
    fn start_plugin(&self, plugin_name: &str) -> ArkResult<()>;
    fn stop_plugin(&self, plugin_name: &str) -> ArkResult<()>;

    /// Uploads one PNG and returns its backend image id.
    fn upload_image(&self, png: &[u8]) -> ArkResult<String>;
    /// Dispatches a job and returns its id.
    fn call_endpoint(&self, plugin_name: &str, endpoint: &str, body: &str) -> ArkResult<String>;
    fn job_status(&self, job_id: &str) -> ArkResult<JobStatusResponse>;
    /// Raw encoded bytes of a stored image.
    fn fetch_image(&self, image_id: &str) -> ArkResult<Vec<u8>>;

    fn open_ui(&self, page: &UiPage) -> ArkResult<()>;
    /// Asks the backend process to exit.
    fn request_shutdown(&self) -> ArkResult<()>;

    /// Sequential uploads. A missing frame or a failed upload yields `-1` in its slot.
    fn upload_images(&self, images: &[Option<Vec<u8>>]) -> Vec<String> {
        images
            .iter()
            .enumerate()
            .map(|(i, png)| {
                let Some(png) = png else {
                    tracing::warn!(index = i, "no frame to upload");
                    return FAILED_UPLOAD_ID.to_string();
                };
                self.upload_image(png).unwrap_or_else(|err| {
                    tracing::warn!(index = i, error = %err, "image upload failed");
                    FAILED_UPLOAD_ID.to_string()
                })
            })
            .collect()
    }

    /// Whether the previous session stored a graceful-shutdown flag.
    fn has_shutdown_gracefully(&self) -> bool {
        match self.get_data(SHUTDOWN_KEY) {
            Ok(text) => parse_shutdown_flag(&text),
            Err(err) => {
                tracing::warn!(error = %err, "shutdown flag unavailable");
                false
            }
        }
    }

    fn mark_shutdown(&self, graceful: bool) -> ArkResult<()> {
        self.set_data(SHUTDOWN_KEY, &shutdown_flag_json(graceful))
    }

    /// Records a graceful shutdown, then stops the backend.
    fn shutdown(&self) -> ArkResult<()> {
        if let Err(err) = self.mark_shutdown(true) {
            tracing::warn!(error = %err, "could not record graceful shutdown");
        }
        self.request_shutdown()
    }
}

/// [`Backend`] over the backend's local HTTP API.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    base_url: String,
    http: Client,
}

impl HttpBackend {
    pub fn new(opts: &RendererOpts) -> ArkResult<Self> {
        opts.validate()?;
        let http = Client::builder().timeout(opts.request_timeout()).build()?;
        Ok(Self {
            base_url: opts.base_url.clone(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn check(path: &str, resp: Response) -> ArkResult<Response> {
        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            Err(ArkError::connectivity(format!(
                "{path}: backend answered {status}"
            )))
        }
    }

    fn get(&self, path: &str) -> ArkResult<Response> {
        let resp = self.http.get(self.url(path)).send()?;
        Self::check(path, resp)
    }

    fn get_text(&self, path: &str) -> ArkResult<String> {
        Ok(self.get(path)?.text()?)
    }

    fn put_json(&self, path: &str, body: String) -> ArkResult<String> {
        let resp = self
            .http
            .put(self.url(path))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()?;
        Ok(Self::check(path, resp)?.text()?)
    }
}

impl DataStore for HttpBackend {
    fn get_data(&self, key: &str) -> ArkResult<String> {
        self.get_text(&format!("data/retrieve/{key}"))
    }

    fn set_data(&self, key: &str, value: &str) -> ArkResult<()> {
        self.put_json(&format!("data/store/{key}"), value.to_string())?;
        Ok(())
    }

    fn delete_data(&self, key: &str) -> ArkResult<()> {
        let path = format!("data/delete/{key}");
        let resp = self.http.delete(self.url(&path)).send()?;
        Self::check(&path, resp)?;
        Ok(())
    }
}

impl Backend for HttpBackend {
    fn is_running(&self) -> bool {
        self.get("plugin/status/").is_ok()
    }

    fn login_status(&self) -> ArkResult<bool> {
        protocol::parse_login_status(&self.get_text("login/status")?)
    }

    fn username(&self) -> ArkResult<String> {
        protocol::parse_username(&self.get_text("login/username")?)
    }

    fn subscription_level(&self) -> ArkResult<i32> {
        protocol::parse_subscription_level(&self.get_text("login/subscription_level")?)
    }

    fn logout(&self) -> ArkResult<()> {
        self.get("login/logout")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    fn plugin_list(&self) -> ArkResult<Vec<String>> {
        protocol::parse_plugin_list(&self.get_text("plugins/get_list")?)
    }

    #[tracing::instrument(skip(self))]
    fn plugin_info(&self, plugin_name: &str) -> ArkResult<ArkPlugin> {
        let text = self.get_text(&format!("plugins/get_info/{plugin_name}"))?;
        ArkPlugin::from_info_json(plugin_name, &text)
    }

    fn plugin_config(&self, plugin_name: &str) -> ArkResult<serde_json::Value> {
        let text = self.get_text(&format!("plugins/get_config/{plugin_name}"))?;
        Ok(serde_json::from_str(&text)?)
    }

    fn set_plugin_config(&self, plugin_name: &str, config: &serde_json::Value) -> ArkResult<()> {
        self.put_json(&format!("plugins/set_config/{plugin_name}"), config.to_string())?;
        Ok(())
    }

    fn start_plugin(&self, plugin_name: &str) -> ArkResult<()> {
        self.get(&format!("plugins/start_plugin/{plugin_name}"))?;
        Ok(())
    }

    fn stop_plugin(&self, plugin_name: &str) -> ArkResult<()> {
        self.get(&format!("plugins/stop_plugin/{plugin_name}"))?;
        Ok(())
    }

    #[tracing::instrument(skip(self, png), fields(bytes = png.len()))]
    fn upload_image(&self, png: &[u8]) -> ArkResult<String> {
        let part = multipart::Part::bytes(png.to_vec())
            .file_name(UPLOAD_FILE_NAME)
            .mime_str("image/png")?;
        let form = multipart::Form::new().part("file", part);
        let path = "image/upload";
        let resp = self.http.post(self.url(path)).multipart(form).send()?;
        protocol::parse_upload(&Self::check(path, resp)?.text()?)
    }

    #[tracing::instrument(skip(self, body))]
    fn call_endpoint(&self, plugin_name: &str, endpoint: &str, body: &str) -> ArkResult<String> {
        let text = self.put_json(
            &format!("plugins/call_endpoint/{plugin_name}/{endpoint}"),
            body.to_string(),
        )?;
        protocol::parse_job_id(&text)
    }

    fn job_status(&self, job_id: &str) -> ArkResult<JobStatusResponse> {
        let text = self.get_text(&format!("job/{job_id}"))?;
        tracing::debug!(job_id, response = %text, "job status");
        protocol::parse_job_status(&text)
    }

    fn fetch_image(&self, image_id: &str) -> ArkResult<Vec<u8>> {
        let bytes = self.get(&format!("image/get/{image_id}"))?.bytes()?;
        if bytes.is_empty() {
            return Err(ArkError::resource(format!("image '{image_id}' is empty")));
        }
        Ok(bytes.to_vec())
    }

    fn open_ui(&self, page: &UiPage) -> ArkResult<()> {
        self.get(&page.path())?;
        Ok(())
    }

    fn request_shutdown(&self) -> ArkResult<()> {
        self.get("backend/shutdown")?;
        tracing::info!("backend shutdown requested");
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/backend/client.rs"]
mod tests;
