//! Document loading and HTML-to-text transformation.

use std::path::{Path, PathBuf};

use ragdemo_common::{Metadata, RagError, Result};
use scraper::{ElementRef, Html};
use tracing::{debug, info, instrument};

/// Raw document content plus metadata describing where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub text: String,
    pub metadata: Metadata,
}

impl Document {
    pub fn from(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(text: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }
}

/// Loads a document from a `file:` URL, an `http(s)://` URL, or a plain path.
#[instrument]
pub async fn load_document(source: &str) -> Result<Document> {
    if source.starts_with("http://") || source.starts_with("https://") {
        return load_url(source).await;
    }
    let path = source
        .strip_prefix("file://")
        .or_else(|| source.strip_prefix("file:"))
        .unwrap_or(source);
    load_file(Path::new(path)).await
}

pub async fn load_file(path: &Path) -> Result<Document> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| RagError::Document(format!("Failed to read {}: {e}", path.display())))?;

    let absolute = std::path::absolute(path).unwrap_or_else(|_| PathBuf::from(path));
    let mut metadata = Metadata::new();
    if let Some(name) = absolute.file_name() {
        metadata.insert("file_name".into(), name.to_string_lossy().into_owned());
    }
    if let Some(dir) = absolute.parent() {
        metadata.insert(
            "absolute_directory_path".into(),
            dir.to_string_lossy().into_owned(),
        );
    }

    info!(path = %path.display(), bytes = text.len(), "Loaded document");
    Ok(Document::with_metadata(text, metadata))
}

pub async fn load_url(url: &str) -> Result<Document> {
    let response = reqwest::get(url)
        .await
        .map_err(|e| RagError::Document(format!("Failed to fetch {url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(RagError::Document(format!("Fetching {url} returned {status}")));
    }

    let text = response
        .text()
        .await
        .map_err(|e| RagError::Document(format!("Failed to read body of {url}: {e}")))?;

    let mut metadata = Metadata::new();
    metadata.insert("url".into(), url.to_string());

    info!(url = %url, bytes = text.len(), "Loaded document");
    Ok(Document::with_metadata(text, metadata))
}

const SKIPPED: &[&str] = &["script", "style", "noscript", "head", "template"];

const BLOCKS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr",
    "li", "main", "nav", "ol", "p", "pre", "section", "table", "tbody", "td", "th", "thead", "tr",
    "ul",
];

/// Strips markup from HTML documents, keeping paragraph structure as line breaks.
#[derive(Debug, Clone, Default)]
pub struct HtmlToTextTransformer;

impl HtmlToTextTransformer {
    pub fn transform(&self, document: Document) -> Document {
        let text = html_to_text(&document.text);
        debug!(before = document.text.len(), after = text.len(), "Transformed HTML");
        Document::with_metadata(text, document.metadata)
    }
}

pub fn html_to_text(html: &str) -> String {
    let parsed = Html::parse_document(html);
    let mut raw = String::new();
    collect_text(parsed.root_element(), &mut raw);
    normalize_whitespace(&raw)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            let name = child_element.value().name();
            if SKIPPED.contains(&name) {
                continue;
            }
            let block = BLOCKS.contains(&name);
            if block {
                out.push('\n');
            }
            collect_text(child_element, out);
            if block {
                out.push('\n');
            }
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
        }
    }
}

/// Collapses runs of spaces within lines and runs of blank lines to one.
fn normalize_whitespace(raw: &str) -> String {
    let mut paragraphs: Vec<Vec<String>> = vec![Vec::new()];
    for line in raw.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            if paragraphs.last().is_some_and(|p| !p.is_empty()) {
                paragraphs.push(Vec::new());
            }
        } else if let Some(current) = paragraphs.last_mut() {
            current.push(collapsed);
        }
    }

    paragraphs
        .into_iter()
        .filter(|p| !p.is_empty())
        .map(|p| p.join("\n"))
        .collect::<Vec<_>>()
        .join("\n\n")
}
