//! Orshot Plugin Types
//!
//! Strong types for render parameters, request bodies, template listings and
//! the items handed back to the host.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{OrshotError, Result};

// ============================================================================
// Enums
// ============================================================================

/// Which family of Orshot templates a call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    /// Public template library.
    Library,
    /// Templates designed in Orshot Studio.
    Studio,
}

impl EndpointKind {
    /// Path listing the templates of this kind.
    pub fn templates_path(&self) -> &'static str {
        match self {
            Self::Library => "/v1/templates",
            Self::Studio => "/v1/studio/templates",
        }
    }

    /// Path accepting render requests for this kind.
    pub fn render_path(&self) -> &'static str {
        match self {
            Self::Library => "/v1/generate/images",
            Self::Studio => "/v1/studio/render",
        }
    }

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Library => "library",
            Self::Studio => "studio",
        }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EndpointKind {
    type Err = OrshotError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "library" => Ok(Self::Library),
            "studio" => Ok(Self::Studio),
            other => Err(OrshotError::invalid_parameter(
                "kind",
                format!("unknown endpoint kind '{}'", other),
            )),
        }
    }
}

/// Encoding of the rendered output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// PNG image (default).
    #[default]
    Png,
    /// JPEG image, `.jpg` extension.
    Jpg,
    /// JPEG image, `.jpeg` extension.
    Jpeg,
    /// WebP image.
    Webp,
    /// PDF document.
    Pdf,
}

impl ResponseFormat {
    /// Wire name, also used as file extension.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Jpeg => "jpeg",
            Self::Webp => "webp",
            Self::Pdf => "pdf",
        }
    }

    /// MIME type of rendered output in this format.
    pub fn mime_type(&self) -> &'static str {
        mime_type_for_format(self.as_str())
    }
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseFormat {
    type Err = OrshotError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "png" => Ok(Self::Png),
            "jpg" => Ok(Self::Jpg),
            "jpeg" => Ok(Self::Jpeg),
            "webp" => Ok(Self::Webp),
            "pdf" => Ok(Self::Pdf),
            other => Err(OrshotError::invalid_parameter(
                "responseFormat",
                format!("unsupported format '{}'", other),
            )),
        }
    }
}

/// Transport form of the rendered output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Base64 text embedded in the item (default).
    #[default]
    Base64,
    /// Raw bytes stored as a binary attachment.
    Binary,
    /// Hosted URL reference.
    Url,
}

impl ResponseType {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Base64 => "base64",
            Self::Binary => "binary",
            Self::Url => "url",
        }
    }

    /// Whether a custom output file name is honored for this type.
    pub fn accepts_file_name(&self) -> bool {
        matches!(self, Self::Url | Self::Binary)
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseType {
    type Err = OrshotError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "base64" => Ok(Self::Base64),
            "binary" => Ok(Self::Binary),
            "url" => Ok(Self::Url),
            other => Err(OrshotError::invalid_parameter(
                "responseType",
                format!("unsupported response type '{}'", other),
            )),
        }
    }
}

/// MIME type for a format name. Unknown names map to `application/octet-stream`.
pub fn mime_type_for_format(format: &str) -> &'static str {
    match format {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Token and base URL used for every call.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Bearer token.
    pub token: String,
    /// Base URL, e.g. `https://api.orshot.com`.
    pub domain: String,
}

impl Credentials {
    /// Create credentials.
    pub fn new(token: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            domain: domain.into(),
        }
    }

    /// `Authorization` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Absolute URL for an API path.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.domain.trim_end_matches('/'), path)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"***")
            .field("domain", &self.domain)
            .finish()
    }
}

// ============================================================================
// Render parameters
// ============================================================================

/// Template selection, carrying only the fields its endpoint understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RenderTarget {
    /// Library template.
    Library {
        /// Template id.
        #[serde(rename = "templateId")]
        template_id: String,
    },
    /// Studio template.
    Studio {
        /// Template id.
        #[serde(rename = "templateId")]
        template_id: String,
        /// Output file name without extension.
        #[serde(rename = "fileName", default, skip_serializing_if = "Option::is_none")]
        file_name: Option<String>,
        /// Scale factor, 0.1 to 10.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scale: Option<f64>,
    },
}

impl RenderTarget {
    /// Endpoint family of this target.
    pub fn kind(&self) -> EndpointKind {
        match self {
            Self::Library { .. } => EndpointKind::Library,
            Self::Studio { .. } => EndpointKind::Studio,
        }
    }

    /// Selected template id.
    pub fn template_id(&self) -> &str {
        match self {
            Self::Library { template_id } | Self::Studio { template_id, .. } => template_id,
        }
    }
}

/// One row of the host's modification form. Either side may be blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModificationRow {
    /// Placeholder key.
    #[serde(default)]
    pub key: String,
    /// Replacement value.
    #[serde(default)]
    pub value: Option<String>,
}

impl ModificationRow {
    /// Create a complete row.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    /// Whether this row should be sent upstream.
    pub fn is_complete(&self) -> bool {
        !self.key.is_empty() && self.value.as_deref().is_some_and(|v| !v.is_empty())
    }
}

/// Parameters of one input item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderParams {
    /// Template to render.
    pub target: RenderTarget,
    /// How the output is returned.
    #[serde(default)]
    pub response_type: ResponseType,
    /// Output encoding.
    #[serde(default)]
    pub response_format: ResponseFormat,
    /// Raw modification rows as entered by the user.
    #[serde(default)]
    pub modifications: Vec<ModificationRow>,
}

impl RenderParams {
    /// Parameters for a library template.
    pub fn library(template_id: impl Into<String>) -> Self {
        Self::new(RenderTarget::Library {
            template_id: template_id.into(),
        })
    }

    /// Parameters for a studio template.
    pub fn studio(template_id: impl Into<String>) -> Self {
        Self::new(RenderTarget::Studio {
            template_id: template_id.into(),
            file_name: None,
            scale: None,
        })
    }

    /// Parameters for an arbitrary target.
    pub fn new(target: RenderTarget) -> Self {
        Self {
            target,
            response_type: ResponseType::default(),
            response_format: ResponseFormat::default(),
            modifications: Vec::new(),
        }
    }

    /// Set the response type.
    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    /// Set the response format.
    pub fn response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = format;
        self
    }

    /// Append a modification row.
    pub fn modification(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.modifications.push(ModificationRow::new(key, value));
        self
    }

    /// Append a raw row, complete or not.
    pub fn row(mut self, row: ModificationRow) -> Self {
        self.modifications.push(row);
        self
    }

    /// Set the custom file name. Ignored for library targets.
    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        if let RenderTarget::Studio { file_name, .. } = &mut self.target {
            *file_name = Some(name.into());
        }
        self
    }

    /// Set the scale factor. Ignored for library targets.
    pub fn scale(mut self, value: f64) -> Self {
        if let RenderTarget::Studio { scale, .. } = &mut self.target {
            *scale = Some(value);
        }
        self
    }
}

// ============================================================================
// Request body
// ============================================================================

/// `response` object of a render request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseOptions {
    /// Output encoding.
    pub format: ResponseFormat,
    /// Transport form.
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    /// Custom output name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Scale factor, only when not 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
}

/// Body POSTed to a render endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    /// Template id.
    pub template_id: String,
    /// Complete modification rows only.
    pub modifications: BTreeMap<String, String>,
    /// Integration tag.
    pub source: String,
    /// Output options.
    pub response: ResponseOptions,
}

// ============================================================================
// Option loading
// ============================================================================

/// A template as returned by the listing endpoints.
///
/// Only `id` is required. Text fields of an unexpected type read as absent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Template {
    /// Template id; numeric ids are stringified.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Library display title.
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: Option<String>,
    /// Studio display name.
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    /// Optional description.
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,
    /// Embedded modification metadata, kept raw and decoded per entry.
    #[serde(default)]
    pub modifications: Option<Value>,
}

/// A modification key exposed by a template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TemplateModification {
    /// Key used by library templates.
    #[serde(default, deserialize_with = "lenient_text")]
    pub key: Option<String>,
    /// Key used by studio templates.
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: Option<String>,
    /// Human description.
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,
}

/// A selectable entry for the host's dropdowns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionItem {
    /// Displayed text.
    pub label: String,
    /// Submitted value.
    pub value: String,
    /// Optional hint text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl OptionItem {
    /// Create an option without description.
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            description: None,
        }
    }

    /// Sentinel returned when modification discovery fails.
    pub fn error(message: impl fmt::Display) -> Self {
        Self::new(format!("Error: {}", message), "error")
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

// ============================================================================
// Output
// ============================================================================

/// Rendered bytes handed to the host's attachment storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryAttachment {
    /// Raw file content.
    pub data: Bytes,
    /// File name, `orshot-image.<format>`.
    pub file_name: String,
    /// MIME type derived from the format.
    pub mime_type: String,
}

/// One item returned to the host.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputItem {
    /// JSON payload.
    pub json: Value,
    /// Attachment, for binary renders.
    pub binary: Option<BinaryAttachment>,
    /// Index of the input item this output answers.
    pub paired_item: usize,
}

impl OutputItem {
    /// Whether this item reports a failure.
    pub fn is_error(&self) -> bool {
        self.json.get("error").is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mime_type_for_format() {
        assert_eq!(mime_type_for_format("png"), "image/png");
        assert_eq!(mime_type_for_format("jpg"), "image/jpeg");
        assert_eq!(mime_type_for_format("jpeg"), "image/jpeg");
        assert_eq!(mime_type_for_format("webp"), "image/webp");
        assert_eq!(mime_type_for_format("pdf"), "application/pdf");
        assert_eq!(mime_type_for_format("gif"), "application/octet-stream");
        assert_eq!(mime_type_for_format(""), "application/octet-stream");
        assert_eq!(ResponseFormat::Jpeg.mime_type(), "image/jpeg");
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("webp".parse::<ResponseFormat>().unwrap(), ResponseFormat::Webp);
        assert_eq!("url".parse::<ResponseType>().unwrap(), ResponseType::Url);
        assert_eq!("studio".parse::<EndpointKind>().unwrap(), EndpointKind::Studio);
        assert!("tiff".parse::<ResponseFormat>().is_err());
        assert!("stream".parse::<ResponseType>().is_err());
    }

    #[test]
    fn test_modification_row_completeness() {
        assert!(ModificationRow::new("title", "Hi").is_complete());
        assert!(!ModificationRow::new("", "x").is_complete());
        assert!(!ModificationRow::new("title", "").is_complete());
        assert!(!ModificationRow {
            key: "sub".to_string(),
            value: None
        }
        .is_complete());
    }

    #[test]
    fn test_library_params_ignore_studio_fields() {
        let params = RenderParams::library("tpl").file_name("out").scale(2.0);
        assert_eq!(
            params.target,
            RenderTarget::Library {
                template_id: "tpl".to_string()
            }
        );
    }

    #[test]
    fn test_render_params_from_host_json() {
        let params: RenderParams = serde_json::from_value(json!({
            "target": { "kind": "studio", "templateId": "42", "fileName": "banner", "scale": 2 },
            "responseType": "binary",
            "responseFormat": "jpg",
            "modifications": [{ "key": "title", "value": "Hi" }, { "key": "sub" }]
        }))
        .unwrap();

        assert_eq!(params.target.kind(), EndpointKind::Studio);
        assert_eq!(params.target.template_id(), "42");
        assert_eq!(params.response_type, ResponseType::Binary);
        assert_eq!(params.response_format, ResponseFormat::Jpg);
        assert_eq!(params.modifications[1].value, None);
    }

    #[test]
    fn test_template_accepts_numeric_id() {
        let template: Template =
            serde_json::from_value(json!({ "id": 17, "title": "Quote card" })).unwrap();
        assert_eq!(template.id, "17");
        assert_eq!(template.title.as_deref(), Some("Quote card"));
        assert!(template.modifications.is_none());
    }

    #[test]
    fn test_template_tolerates_odd_fields() {
        let template: Template = serde_json::from_value(json!({
            "id": "t1",
            "title": { "en": "Quote" },
            "description": null,
            "modifications": { "count": 2 }
        }))
        .unwrap();
        assert_eq!(template.id, "t1");
        assert_eq!(template.title, None);
        assert_eq!(template.modifications, Some(json!({ "count": 2 })));

        let modification: TemplateModification =
            serde_json::from_value(json!({ "key": "n", "description": 7 })).unwrap();
        assert_eq!(modification.key.as_deref(), Some("n"));
        assert_eq!(modification.description.as_deref(), Some("7"));
    }

    #[test]
    fn test_credentials_debug_hides_token() {
        let creds = Credentials::new("secret-token", "https://api.orshot.com/");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("secret-token"));
        assert_eq!(
            creds.endpoint("/v1/templates"),
            "https://api.orshot.com/v1/templates"
        );
        assert_eq!(creds.bearer(), "Bearer secret-token");
    }
}
