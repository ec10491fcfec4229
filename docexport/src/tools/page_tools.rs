//! Page content tools.
//!
//! Each entry point takes camelCase JSON arguments, runs one
//! [`PageContentService`] operation and reports the outcome in a
//! [`ToolOutput`]. Failures never escape as errors.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use super::{ToolDefinition, ToolOutput};
use crate::cancellation::CancellationToken;
use crate::core::{ExportFormat, PageRef};
use crate::errors::{ErrorKind, PageContentError};
use crate::export::PageContentService;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageArgs {
    doc_id: String,
    page_id_or_name: String,
}

impl PageArgs {
    fn page_ref(&self) -> PageRef {
        PageRef::new(&self.doc_id, &self.page_id_or_name)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PeekArgs {
    #[serde(flatten)]
    page: PageArgs,
    num_lines: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DuplicateArgs {
    #[serde(flatten)]
    page: PageArgs,
    new_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateArgs {
    #[serde(flatten)]
    page: PageArgs,
    content: String,
    #[serde(default)]
    format: ExportFormat,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateArgs {
    doc_id: String,
    name: String,
    #[serde(default)]
    content: Option<String>,
}

/// Tool entry points over a shared [`PageContentService`].
#[derive(Debug, Clone)]
pub struct PageTools {
    service: Arc<PageContentService>,
}

impl PageTools {
    /// Creates the tool set.
    #[must_use]
    pub fn new(service: Arc<PageContentService>) -> Self {
        Self { service }
    }

    /// Definitions of every tool in this set.
    #[must_use]
    pub fn definitions() -> Vec<ToolDefinition> {
        let page = json!({
            "docId": {"type": "string", "description": "Document ID"},
            "pageIdOrName": {"type": "string", "description": "Page ID or name"},
        });
        let with = |extra: Value, required: &[&str]| {
            let mut properties = page.clone();
            if let (Some(target), Some(extra)) = (properties.as_object_mut(), extra.as_object()) {
                target.extend(extra.clone());
            }
            json!({"type": "object", "properties": properties, "required": required})
        };

        vec![
            ToolDefinition::new("get_page_content", "Read the full text of a page")
                .with_input_schema(with(json!({}), &["docId", "pageIdOrName"])),
            ToolDefinition::new("peek_page", "Read the first lines of a page").with_input_schema(
                with(
                    json!({"numLines": {"type": "integer", "minimum": 1}}),
                    &["docId", "pageIdOrName", "numLines"],
                ),
            ),
            ToolDefinition::new("duplicate_page", "Copy a page into a new page")
                .with_input_schema(with(
                    json!({"newName": {"type": "string"}}),
                    &["docId", "pageIdOrName", "newName"],
                )),
            ToolDefinition::new("replace_page_content", "Replace the body of a page")
                .with_input_schema(with(
                    json!({"content": {"type": "string"}}),
                    &["docId", "pageIdOrName", "content"],
                )),
            ToolDefinition::new("append_page_content", "Append to the body of a page")
                .with_input_schema(with(
                    json!({"content": {"type": "string"}}),
                    &["docId", "pageIdOrName", "content"],
                )),
            ToolDefinition::new("create_page", "Create a page").with_input_schema(json!({
                "type": "object",
                "properties": {
                    "docId": {"type": "string", "description": "Document ID"},
                    "name": {"type": "string"},
                    "content": {"type": "string"},
                },
                "required": ["docId", "name"],
            })),
        ]
    }

    /// Returns the full text of a page, or `content: null` for an empty page.
    pub async fn get_page_content(&self, args: Value, cancel: &CancellationToken) -> ToolOutput {
        invoke("get_page_content", args, |a: PageArgs| async move {
            let page = a.page_ref();
            let content = self.service.get_full_content(&page, cancel).await?;
            Ok(match content {
                Some(content) => json!({
                    "page": page.to_string(),
                    "content": content.text(),
                    "format": content.format(),
                    "lineCount": content.line_count(),
                    "fingerprint": content.fingerprint(),
                    "exportedAt": content.exported_at().to_rfc3339(),
                }),
                None => json!({"page": page.to_string(), "content": null}),
            })
        })
        .await
    }

    /// Returns the first `numLines` lines of a page.
    pub async fn peek_page(&self, args: Value, cancel: &CancellationToken) -> ToolOutput {
        invoke("peek_page", args, |a: PeekArgs| async move {
            let page = a.page.page_ref();
            let preview = self.service.peek(&page, a.num_lines, cancel).await?;
            Ok(json!({"page": page.to_string(), "content": preview, "numLines": a.num_lines}))
        })
        .await
    }

    /// Copies a page into a new page in the same document.
    pub async fn duplicate_page(&self, args: Value, cancel: &CancellationToken) -> ToolOutput {
        invoke("duplicate_page", args, |a: DuplicateArgs| async move {
            let page = a.page.page_ref();
            let created = self.service.duplicate(&page, &a.new_name, cancel).await?;
            Ok(json!({
                "source": page.to_string(),
                "pageId": created.id,
                "name": a.new_name,
                "requestId": created.request_id,
                "browserLink": created.browser_link,
            }))
        })
        .await
    }

    /// Replaces the body of a page.
    pub async fn replace_page_content(&self, args: Value) -> ToolOutput {
        invoke("replace_page_content", args, |a: UpdateArgs| async move {
            let page = a.page.page_ref();
            let receipt = self.service.replace(&page, &a.content, a.format).await?;
            Ok(json!({"pageId": receipt.id, "requestId": receipt.request_id}))
        })
        .await
    }

    /// Appends to the body of a page.
    pub async fn append_page_content(&self, args: Value) -> ToolOutput {
        invoke("append_page_content", args, |a: UpdateArgs| async move {
            let page = a.page.page_ref();
            let receipt = self.service.append(&page, &a.content, a.format).await?;
            Ok(json!({"pageId": receipt.id, "requestId": receipt.request_id}))
        })
        .await
    }

    /// Creates a page, optionally with a markdown body.
    pub async fn create_page(&self, args: Value) -> ToolOutput {
        invoke("create_page", args, |a: CreateArgs| async move {
            let created = self
                .service
                .create_page(&a.doc_id, &a.name, a.content.as_deref())
                .await?;
            Ok(json!({
                "pageId": created.id,
                "name": a.name,
                "requestId": created.request_id,
                "browserLink": created.browser_link,
            }))
        })
        .await
    }
}

async fn invoke<A, F, Fut>(tool: &'static str, args: Value, run: F) -> ToolOutput
where
    A: DeserializeOwned,
    F: FnOnce(A) -> Fut,
    Fut: Future<Output = Result<Value, PageContentError>>,
{
    let invocation_id = Uuid::new_v4();
    let span = info_span!("tool", tool, invocation_id = %invocation_id);

    async move {
        let parsed = match serde_json::from_value::<A>(args) {
            Ok(parsed) => parsed,
            Err(e) => {
                info!(error = %e, "Tool arguments rejected");
                return ToolOutput::fail(
                    ErrorKind::InvalidArgument,
                    format!("invalid arguments for {tool}: {e}"),
                );
            }
        };

        match run(parsed).await {
            Ok(data) => {
                info!("Tool call succeeded");
                ToolOutput::ok(data)
            }
            Err(e) => ToolOutput::from(&e),
        }
    }
    .instrument(span)
    .await
}
