//! Render-filter orchestration for driving a locally running AI image backend from a video host.
//!
//! The host registers the filter's parameters, reports changes, and asks for frames:
//!
//! - [`filter::renderer::AiRendererFilter::initialize`] discovers backend plugins and builds a
//!   host-agnostic parameter set, reconciled against the persisted [`params::cache::ParamCache`]
//! - [`host::bridge::register_params`] / [`host::bridge::update_params`] keep host controls and
//!   visibility in step with the selected plugin and endpoint
//! - [`filter::renderer::AiRendererFilter::render`] fingerprints the current values, reuses the
//!   cached result when nothing changed, and otherwise uploads inputs, dispatches a job, polls it
//!   and composites the result
//!
//! Process-wide state lives in [`filter::context::RendererContext`], which the caller owns.
#![forbid(unsafe_code)]

pub mod backend;
pub mod filter;
pub mod foundation;
pub mod host;
pub mod imaging;
pub mod params;
pub mod schema;

pub use backend::client::{Backend, HttpBackend, UiPage};
pub use filter::{context::RendererContext, renderer::AiRendererFilter};
pub use foundation::config::RendererOpts;
pub use foundation::error::{ArkError, ArkResult};
pub use host::{delegate::HostDelegate, memory::MemoryHost};
pub use imaging::buffer::{ChannelOrder, ImageBuffer, PixelFormat};
pub use params::parameter::{ParamKind, Parameter, ParameterType};

#[cfg(test)]
#[path = "../tests/unit/support.rs"]
pub(crate) mod test_support;
