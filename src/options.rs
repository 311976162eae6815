//! Dropdown options for template and modification pickers.
//!
//! Template listing failures propagate because the form cannot be filled
//! without them. Modification listing never fails: errors collapse into a
//! single `Error: ...` option so the form stays usable.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::error::{OrshotError, Result};
use crate::transport::{get_json, OrshotTransport};
use crate::types::{EndpointKind, OptionItem, Template, TemplateModification};

/// Loads selectable options through the injected transport.
#[derive(Clone)]
pub struct OptionLoader {
    transport: Arc<dyn OrshotTransport>,
}

impl OptionLoader {
    /// Create a loader.
    pub fn new(transport: Arc<dyn OrshotTransport>) -> Self {
        Self { transport }
    }

    /// Templates of the given kind as options.
    pub async fn list_templates(&self, kind: EndpointKind) -> Result<Vec<OptionItem>> {
        let templates = self.fetch_templates(kind).await.map_err(|e| {
            let what = match kind {
                EndpointKind::Library => "templates",
                EndpointKind::Studio => "studio templates",
            };
            OrshotError::OptionLoad(format!("Failed to load {}: {}", what, e))
        })?;

        Ok(templates
            .into_iter()
            .map(|template| template_option(kind, template))
            .collect())
    }

    /// Modification keys of `template_id` as options.
    ///
    /// An empty id yields no options and no request.
    pub async fn list_modifications(&self, kind: EndpointKind, template_id: &str) -> Vec<OptionItem> {
        if template_id.is_empty() {
            return Vec::new();
        }

        let result = match kind {
            EndpointKind::Library => self.library_modifications(template_id).await,
            EndpointKind::Studio => self.studio_modifications(template_id).await,
        };

        result.unwrap_or_else(|e| {
            warn!("Failed to load {} modifications for {}: {}", kind, template_id, e);
            vec![OptionItem::error(e)]
        })
    }

    /// Raw template listing. Non-array bodies yield an empty list.
    pub async fn fetch_templates(&self, kind: EndpointKind) -> Result<Vec<Template>> {
        let url = self.transport.credentials().endpoint(kind.templates_path());
        let body = get_json(self.transport.as_ref(), &url).await?;
        Ok(parse_entries(body))
    }

    async fn library_modifications(&self, template_id: &str) -> Result<Vec<OptionItem>> {
        let embedded = self
            .fetch_templates(EndpointKind::Library)
            .await?
            .into_iter()
            .find(|t| t.id == template_id)
            .and_then(|t| t.modifications)
            .filter(Value::is_array);

        let modifications: Vec<TemplateModification> = match embedded {
            Some(entries) => parse_entries(entries),
            None => {
                debug!("Template {} has no embedded modifications, querying endpoint", template_id);
                let url = Url::parse_with_params(
                    &self
                        .transport
                        .credentials()
                        .endpoint("/v1/templates/modifications"),
                    &[("template_id", template_id)],
                )?;
                parse_entries(get_json(self.transport.as_ref(), url.as_str()).await?)
            }
        };

        Ok(modifications
            .into_iter()
            .filter_map(|m| keyed_option(m.key, m.description))
            .collect())
    }

    async fn studio_modifications(&self, template_id: &str) -> Result<Vec<OptionItem>> {
        let url = Url::parse_with_params(
            &self
                .transport
                .credentials()
                .endpoint("/v1/studio/template/modifications"),
            &[("templateId", template_id)],
        )?;
        let modifications: Vec<TemplateModification> =
            parse_entries(get_json(self.transport.as_ref(), url.as_str()).await?);

        Ok(modifications
            .into_iter()
            .filter_map(|m| keyed_option(m.id, m.description))
            .collect())
    }
}

fn template_option(kind: EndpointKind, template: Template) -> OptionItem {
    match kind {
        EndpointKind::Library => {
            let label = template.title.unwrap_or_else(|| template.id.clone());
            OptionItem::new(label, template.id)
        }
        EndpointKind::Studio => {
            let label = template.name.unwrap_or_else(|| template.id.clone());
            OptionItem {
                label,
                value: template.id,
                description: Some(template.description.unwrap_or_default()),
            }
        }
    }
}

fn keyed_option(key: Option<String>, description: Option<String>) -> Option<OptionItem> {
    let key = key.filter(|k| !k.is_empty())?;
    let label = description
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| key.clone());
    Some(OptionItem::new(label, key))
}

/// Deserialize each element of a JSON array, skipping malformed entries.
fn parse_entries<T: serde::de::DeserializeOwned>(body: Value) -> Vec<T> {
    let Value::Array(entries) = body else {
        return Vec::new();
    };

    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                debug!("Skipping malformed listing entry: {}", e);
                None
            }
        })
        .collect()
}
