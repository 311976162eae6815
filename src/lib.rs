//! Orshot Plugin for elizaOS
//!
//! Renders Orshot library and studio templates from workflow items and
//! fills the template and modification pickers of the host's forms.
//!
//! # Example
//!
//! ```rust,no_run
//! use elizaos_plugin_orshot::{get_orshot_plugin, RenderParams, ResponseType};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let plugin = get_orshot_plugin()?;
//! let params = RenderParams::library("open-graph-image-1")
//!     .modification("title", "Hello from elizaOS")
//!     .response_type(ResponseType::Url);
//! let item = plugin.render(&params).await?;
//! println!("{}", item.json["data"]);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod options;
pub mod render;
pub mod transport;
pub mod types;

#[cfg(test)]
mod mock_transport;

pub use config::OrshotConfig;
pub use error::{ExecutionError, OrshotError, Result};
pub use options::OptionLoader;
pub use render::{build_modifications, RenderDispatcher};
pub use transport::{
    derive_error_message, HttpRequest, HttpResponse, OrshotTransport, ReqwestTransport,
    ResponseBody, ResponseEncoding,
};
pub use types::*;

use anyhow::Result as AnyhowResult;
use serde_json::Value;
use std::sync::Arc;

/// The name identifier for the Orshot plugin.
pub const PLUGIN_NAME: &str = "orshot";

/// A human-readable description of the plugin.
pub const PLUGIN_DESCRIPTION: &str = "Automated image generation from Orshot templates";

/// The current version of the plugin, derived from Cargo.toml.
pub const PLUGIN_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default Orshot API base URL.
pub const DEFAULT_DOMAIN: &str = "https://api.orshot.com";

/// Default `source` tag sent with render requests.
pub const DEFAULT_SOURCE: &str = "n8n-integration";

/// Orshot plugin for elizaOS.
///
/// Bundles the option loader and render dispatcher over one transport.
#[derive(Clone)]
pub struct OrshotPlugin {
    transport: Arc<dyn OrshotTransport>,
    options: OptionLoader,
    dispatcher: RenderDispatcher,
}

impl OrshotPlugin {
    /// Create a plugin talking to the API through reqwest.
    pub fn new(config: OrshotConfig) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(&config)?);
        Ok(Self::with_transport(transport, config.source))
    }

    /// Create a plugin over a host-provided transport.
    pub fn with_transport(transport: Arc<dyn OrshotTransport>, source: impl Into<String>) -> Self {
        Self {
            options: OptionLoader::new(transport.clone()),
            dispatcher: RenderDispatcher::new(transport.clone()).with_source(source),
            transport,
        }
    }

    /// Check the credentials against `/v1/me/user_id`.
    pub async fn verify_credentials(&self) -> Result<Value> {
        let url = self.transport.credentials().endpoint("/v1/me/user_id");
        transport::get_json(self.transport.as_ref(), &url).await
    }

    /// Templates of the given kind.
    pub async fn list_templates(&self, kind: EndpointKind) -> Result<Vec<OptionItem>> {
        self.options.list_templates(kind).await
    }

    /// Modification keys of a template. Never fails; see [`OptionLoader`].
    pub async fn list_modifications(&self, kind: EndpointKind, template_id: &str) -> Vec<OptionItem> {
        self.options.list_modifications(kind, template_id).await
    }

    /// Render a single item.
    pub async fn render(&self, params: &RenderParams) -> Result<OutputItem> {
        self.dispatcher.render(params, 0).await
    }

    /// Render a batch of items in order.
    pub async fn execute(
        &self,
        items: &[RenderParams],
        continue_on_fail: bool,
    ) -> std::result::Result<Vec<OutputItem>, ExecutionError> {
        self.dispatcher.execute(items, continue_on_fail).await
    }

    /// The option loader.
    pub fn options(&self) -> &OptionLoader {
        &self.options
    }

    /// The render dispatcher.
    pub fn dispatcher(&self) -> &RenderDispatcher {
        &self.dispatcher
    }
}

/// Create an Orshot plugin from environment variables.
///
/// Required environment variables:
/// - `ORSHOT_API_TOKEN`: Orshot API key
///
/// Optional environment variables:
/// - `ORSHOT_DOMAIN`: API base URL (default: https://api.orshot.com)
/// - `ORSHOT_SOURCE`: integration tag sent with renders (default: n8n-integration)
/// - `ORSHOT_TIMEOUT_SECS`: request timeout (default: 120)
pub fn get_orshot_plugin() -> AnyhowResult<OrshotPlugin> {
    let config = OrshotConfig::from_env()
        .map_err(|e| anyhow::anyhow!("Failed to read Orshot configuration: {}", e))?;

    OrshotPlugin::new(config).map_err(|e| anyhow::anyhow!("Failed to create Orshot plugin: {}", e))
}
