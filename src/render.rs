//! Render dispatch: one POST per input item, normalized into host items.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::error::{ExecutionError, OrshotError, Result};
use crate::transport::{HttpRequest, HttpResponse, OrshotTransport, ResponseEncoding};
use crate::types::{
    BinaryAttachment, ModificationRow, OutputItem, RenderParams, RenderRequest, RenderTarget,
    ResponseOptions, ResponseType,
};
use crate::DEFAULT_SOURCE;

const MIN_SCALE: f64 = 0.1;
const MAX_SCALE: f64 = 10.0;

/// Sends render requests and shapes the responses.
#[derive(Clone)]
pub struct RenderDispatcher {
    transport: Arc<dyn OrshotTransport>,
    source: String,
}

impl RenderDispatcher {
    /// Create a dispatcher tagging requests with the default source.
    pub fn new(transport: Arc<dyn OrshotTransport>) -> Self {
        Self {
            transport,
            source: DEFAULT_SOURCE.to_string(),
        }
    }

    /// Override the `source` integration tag.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Build the request body for one item.
    pub fn build_request(&self, params: &RenderParams) -> Result<RenderRequest> {
        let template_id = params.target.template_id();
        if template_id.is_empty() {
            return Err(OrshotError::invalid_parameter("templateId", "is required"));
        }

        let mut response = ResponseOptions {
            format: params.response_format,
            response_type: params.response_type,
            file_name: None,
            scale: None,
        };

        if let RenderTarget::Studio {
            file_name, scale, ..
        } = &params.target
        {
            if params.response_type.accepts_file_name() {
                response.file_name = file_name.clone().filter(|name| !name.is_empty());
            }

            if let Some(scale) = *scale {
                if !(MIN_SCALE..=MAX_SCALE).contains(&scale) {
                    return Err(OrshotError::invalid_parameter(
                        "scale",
                        format!("must be between {} and {}, got {}", MIN_SCALE, MAX_SCALE, scale),
                    ));
                }
                if scale != 1.0 {
                    response.scale = Some(scale);
                }
            }
        }

        Ok(RenderRequest {
            template_id: template_id.to_string(),
            modifications: build_modifications(&params.modifications),
            source: self.source.clone(),
            response,
        })
    }

    /// Render one item. `index` becomes the output's `paired_item`.
    pub async fn render(&self, params: &RenderParams, index: usize) -> Result<OutputItem> {
        let request = self.build_request(params)?;
        let credentials = self.transport.credentials();
        let url = credentials.endpoint(params.target.kind().render_path());

        let encoding = match params.response_type {
            ResponseType::Binary => ResponseEncoding::Binary,
            _ => ResponseEncoding::Text,
        };

        debug!(
            "Rendering {} template {} as {}/{}",
            params.target.kind(),
            request.template_id,
            params.response_type,
            params.response_format
        );

        let http_request = HttpRequest::authenticated(
            credentials,
            Method::POST,
            url,
            Some(serde_json::to_value(&request)?),
            encoding,
        )?;
        let response = self
            .transport
            .request(http_request)
            .await?
            .error_for_status()?;

        Ok(normalize_response(params, request.modifications, response, index))
    }

    /// Render every item in order.
    ///
    /// With `continue_on_fail`, a failed item yields an error item and the
    /// batch goes on. Otherwise the batch stops at the first failure and the
    /// items rendered so far are returned inside the error.
    pub async fn execute(
        &self,
        items: &[RenderParams],
        continue_on_fail: bool,
    ) -> std::result::Result<Vec<OutputItem>, ExecutionError> {
        let mut output = Vec::with_capacity(items.len());

        for (index, params) in items.iter().enumerate() {
            match self.render(params, index).await {
                Ok(item) => output.push(item),
                Err(e) if continue_on_fail => {
                    warn!("Item {} failed, continuing: {}", index, e);
                    output.push(error_item(params, &e, &self.transport, index));
                }
                Err(e) => {
                    return Err(ExecutionError {
                        item_index: index,
                        source: e,
                        completed: output,
                    });
                }
            }
        }

        info!("Rendered {} item(s)", output.len());
        Ok(output)
    }
}

/// Keep rows with a non-empty key and a non-empty value. Later rows win.
pub fn build_modifications(rows: &[ModificationRow]) -> BTreeMap<String, String> {
    rows.iter()
        .filter_map(|row| {
            if !row.is_complete() {
                debug!("Dropping incomplete modification row {:?}", row.key);
                return None;
            }
            let value = row.value.clone()?;
            Some((row.key.clone(), value))
        })
        .collect()
}

/// Shape a successful response into an output item.
pub fn normalize_response(
    params: &RenderParams,
    modifications: BTreeMap<String, String>,
    response: HttpResponse,
    index: usize,
) -> OutputItem {
    let format = params.response_format;
    let mut json = Map::new();
    json.insert("templateId".into(), params.target.template_id().into());
    json.insert("responseType".into(), params.response_type.as_str().into());
    json.insert("responseFormat".into(), format.as_str().into());
    json.insert("statusCode".into(), response.status.into());
    json.insert("modifications".into(), json!(modifications));

    let binary = match params.response_type {
        ResponseType::Base64 => {
            json.insert("data".into(), response.text().into_owned().into());
            json.insert("mimeType".into(), format.mime_type().into());
            None
        }
        ResponseType::Binary => Some(BinaryAttachment {
            data: response.bytes(),
            file_name: format!("orshot-image.{}", format),
            mime_type: format.mime_type().to_string(),
        }),
        ResponseType::Url => {
            let text = response.text();
            let data = serde_json::from_str::<Value>(&text)
                .unwrap_or_else(|_| Value::String(text.into_owned()));
            json.insert("data".into(), data);
            None
        }
    };

    OutputItem {
        json: Value::Object(json),
        binary,
        paired_item: index,
    }
}

fn error_item(
    params: &RenderParams,
    error: &OrshotError,
    transport: &Arc<dyn OrshotTransport>,
    index: usize,
) -> OutputItem {
    let kind = params.target.kind();
    let mut details = Map::new();
    details.insert("templateId".into(), params.target.template_id().into());
    details.insert("operation".into(), kind.as_str().into());
    details.insert(
        "endpoint".into(),
        transport.credentials().endpoint(kind.render_path()).into(),
    );
    details.insert(
        "timestamp".into(),
        Utc::now()
            .to_rfc3339_opts(SecondsFormat::Millis, true)
            .into(),
    );

    if let OrshotError::Api {
        status,
        status_text,
        body,
        ..
    } = error
    {
        details.insert("httpStatus".into(), (*status).into());
        details.insert("httpStatusText".into(), status_text.as_str().into());
        match serde_json::from_str::<Value>(body) {
            Ok(api_error) => {
                details.insert("apiError".into(), api_error);
            }
            Err(_) if !body.is_empty() => {
                details.insert("rawResponse".into(), body.as_str().into());
            }
            Err(_) => {}
        }
    }

    OutputItem {
        json: json!({
            "error": error.to_string(),
            "errorDetails": Value::Object(details),
        }),
        binary: None,
        paired_item: index,
    }
}
