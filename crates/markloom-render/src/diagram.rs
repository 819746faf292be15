// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mermaid diagram rendering
//!
//! Placeholders carry the diagram source as text. A batch collects every
//! placeholder, renders them concurrently through a lazily built
//! [`DiagramEngine`], and writes the results back:
//! - empty source: placeholder cleared, engine not called
//! - rendered: placeholder content replaced by the SVG
//! - failed: placeholder left as is, so the source stays readable

use async_trait::async_trait;
use futures::future::join_all;
use regex::Regex;
use std::future::Future;
use std::ops::Range;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::config::DiagramSettings;
use crate::error::{RenderError, Result};
use crate::escape::unescape_html;
use crate::lazy::LazyEngine;

/// Single diagram rendering error
#[derive(Debug, thiserror::Error)]
pub enum DiagramError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("render failed: {0}")]
    Render(String),
}

/// Renders one diagram source to SVG
#[async_trait]
pub trait DiagramEngine: Send + Sync {
    async fn render(&self, id: &str, source: &str) -> std::result::Result<String, DiagramError>;
}

/// Mermaid rendering through a Kroki server
pub struct KrokiEngine {
    client: reqwest::Client,
    server_url: String,
}

impl KrokiEngine {
    pub fn new(server_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RenderError::EngineInit(e.to_string()))?;
        Ok(Self {
            client,
            server_url: server_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }
}

#[async_trait]
impl DiagramEngine for KrokiEngine {
    async fn render(&self, id: &str, source: &str) -> std::result::Result<String, DiagramError> {
        let url = format!("{}/mermaid/svg", self.server_url);
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(source.to_owned())
            .send()
            .await
            .map_err(|e| DiagramError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("(unable to read error body)"));
            return Err(DiagramError::Render(format!("HTTP {}: {body}", status.as_u16())));
        }

        let svg = response
            .text()
            .await
            .map_err(|e| DiagramError::Http(e.to_string()))?;
        Ok(with_svg_id(&svg, id))
    }
}

/// Give the root `<svg>` the render id unless it already has one
fn with_svg_id(svg: &str, id: &str) -> String {
    let Some(start) = svg.find("<svg") else {
        return svg.to_string();
    };
    let open_end = svg[start..].find('>').map_or(svg.len(), |i| start + i);
    if svg[start..open_end].contains(" id=") {
        return svg.to_string();
    }
    let at = start + "<svg".len();
    format!(r#"{} id="{id}"{}"#, &svg[..at], &svg[at..])
}

/// Outcome of rendering one placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagramArtifact {
    Empty,
    Rendered(String),
    Failed,
}

/// Something holding diagram placeholders, addressed by discovery order
pub trait PlaceholderSink {
    /// Source text of every placeholder, in order
    fn sources(&self) -> Vec<String>;
    fn clear(&mut self, index: usize);
    fn replace(&mut self, index: usize, svg: &str);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub rendered: usize,
    pub cleared: usize,
    pub failed: usize,
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

pub struct DiagramService {
    engine: LazyEngine<dyn DiagramEngine>,
}

impl DiagramService {
    pub fn new<F, Fut>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<dyn DiagramEngine>>> + Send + 'static,
    {
        Self {
            engine: LazyEngine::new("diagrams", factory),
        }
    }

    /// Service rendering through the Kroki server at `server_url`
    pub fn kroki(server_url: impl Into<String>, timeout: Duration) -> Self {
        let server_url = server_url.into();
        Self::new(move || {
            let server_url = server_url.clone();
            async move {
                let engine = KrokiEngine::new(&server_url, timeout)?;
                Ok(Arc::new(engine) as Arc<dyn DiagramEngine>)
            }
        })
    }

    pub fn from_settings(settings: &DiagramSettings) -> Self {
        Self::kroki(&settings.endpoint, Duration::from_secs(settings.timeout_secs))
    }

    /// Build the engine if needed; concurrent callers share one construction
    pub async fn ensure_ready(&self) -> Result<Arc<dyn DiagramEngine>> {
        self.engine.get_or_init().await
    }

    pub fn is_ready(&self) -> bool {
        self.engine.is_ready()
    }

    pub fn init_count(&self) -> usize {
        self.engine.init_count()
    }

    /// Render every source concurrently; failures stay local to their source
    pub async fn render<S: AsRef<str>>(&self, sources: &[S]) -> Vec<DiagramArtifact> {
        let trimmed: Vec<&str> = sources.iter().map(|s| s.as_ref().trim()).collect();
        if trimmed.iter().all(|s| s.is_empty()) {
            return vec![DiagramArtifact::Empty; trimmed.len()];
        }

        let engine = match self.ensure_ready().await {
            Ok(engine) => engine,
            Err(err) => {
                tracing::warn!(error = %err, "diagram engine unavailable, leaving sources in place");
                return trimmed
                    .iter()
                    .map(|s| {
                        if s.is_empty() {
                            DiagramArtifact::Empty
                        } else {
                            DiagramArtifact::Failed
                        }
                    })
                    .collect();
            }
        };

        let stamp = unix_millis();
        let renders = trimmed.iter().enumerate().map(|(index, source)| {
            let engine = Arc::clone(&engine);
            async move {
                if source.is_empty() {
                    return DiagramArtifact::Empty;
                }
                let id = format!("mermaid-preview-{index}-{stamp}");
                match engine.render(&id, source).await {
                    Ok(svg) => DiagramArtifact::Rendered(svg),
                    Err(err) => {
                        tracing::debug!(index, error = %err, "diagram render failed");
                        DiagramArtifact::Failed
                    }
                }
            }
        });
        join_all(renders).await
    }

    /// Write artifacts back into their placeholders
    pub fn apply<S: PlaceholderSink + ?Sized>(artifacts: &[DiagramArtifact], sink: &mut S) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for (index, artifact) in artifacts.iter().enumerate() {
            match artifact {
                DiagramArtifact::Empty => {
                    sink.clear(index);
                    summary.cleared += 1;
                }
                DiagramArtifact::Rendered(svg) => {
                    sink.replace(index, svg);
                    summary.rendered += 1;
                }
                DiagramArtifact::Failed => summary.failed += 1,
            }
        }
        summary
    }

    /// Discover, render and apply every placeholder in `sink`
    pub async fn render_batch<S: PlaceholderSink + ?Sized>(&self, sink: &mut S) -> BatchSummary {
        let sources = sink.sources();
        if sources.is_empty() {
            return BatchSummary::default();
        }
        let artifacts = self.render(&sources).await;
        let summary = Self::apply(&artifacts, sink);
        tracing::debug!(
            rendered = summary.rendered,
            cleared = summary.cleared,
            failed = summary.failed,
            "diagram batch finished"
        );
        summary
    }

    /// Render the placeholders of an HTML fragment
    pub async fn hydrate_html(&self, html: String) -> (String, BatchSummary) {
        let mut placeholders = HtmlPlaceholders::new(html);
        let summary = self.render_batch(&mut placeholders).await;
        (placeholders.into_html(), summary)
    }
}

static DIV_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<div\b(?P<attrs>[^>]*)>").unwrap());

static CLASS_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bclass\s*=\s*"(?P<class>[^"]*)""#).unwrap());

const PROCESSED_ATTR: &str = r#" data-processed="true""#;

fn is_pending_diagram(attrs: &str) -> bool {
    if attrs.contains("data-processed") {
        return false;
    }
    CLASS_ATTR_RE
        .captures(attrs)
        .and_then(|caps| caps.name("class"))
        .is_some_and(|class| {
            class
                .as_str()
                .split_whitespace()
                .any(|c| c == markloom_core::DIAGRAM_LANGUAGE)
        })
}

#[derive(Debug)]
enum Patch {
    Clear,
    Replace(String),
}

#[derive(Debug)]
struct Placeholder {
    /// Position of the `>` closing the opening tag
    tag_end: usize,
    body: Range<usize>,
    source: String,
    patch: Option<Patch>,
}

/// `<div class="mermaid">` placeholders in an HTML fragment
///
/// Patches are recorded by index and applied by [`HtmlPlaceholders::into_html`].
/// Rendered containers gain `data-processed="true"` and are skipped by later
/// discovery.
#[derive(Debug)]
pub struct HtmlPlaceholders {
    html: String,
    placeholders: Vec<Placeholder>,
}

impl HtmlPlaceholders {
    pub fn new(html: impl Into<String>) -> Self {
        let html = html.into();
        let mut placeholders = Vec::new();
        for caps in DIV_OPEN_RE.captures_iter(&html) {
            let (Some(open), Some(attrs)) = (caps.get(0), caps.name("attrs")) else {
                continue;
            };
            if !is_pending_diagram(attrs.as_str()) {
                continue;
            }
            let Some(len) = html[open.end()..].find("</div>") else {
                continue;
            };
            let body = open.end()..open.end() + len;
            placeholders.push(Placeholder {
                tag_end: open.end() - 1,
                source: unescape_html(&html[body.clone()]).into_owned(),
                body,
                patch: None,
            });
        }
        Self { html, placeholders }
    }

    pub fn len(&self) -> usize {
        self.placeholders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placeholders.is_empty()
    }

    pub fn into_html(self) -> String {
        let html = self.html;
        let mut out = String::with_capacity(html.len());
        let mut cursor = 0;
        for placeholder in &self.placeholders {
            match &placeholder.patch {
                None => {}
                Some(Patch::Clear) => {
                    out.push_str(&html[cursor..placeholder.body.start]);
                    cursor = placeholder.body.end;
                }
                Some(Patch::Replace(svg)) => {
                    out.push_str(&html[cursor..placeholder.tag_end]);
                    out.push_str(PROCESSED_ATTR);
                    out.push_str(&html[placeholder.tag_end..placeholder.body.start]);
                    out.push_str(svg);
                    cursor = placeholder.body.end;
                }
            }
        }
        out.push_str(&html[cursor..]);
        out
    }
}

impl PlaceholderSink for HtmlPlaceholders {
    fn sources(&self) -> Vec<String> {
        self.placeholders.iter().map(|p| p.source.clone()).collect()
    }

    fn clear(&mut self, index: usize) {
        if let Some(placeholder) = self.placeholders.get_mut(index) {
            placeholder.patch = Some(Patch::Clear);
        }
    }

    fn replace(&mut self, index: usize, svg: &str) {
        if let Some(placeholder) = self.placeholders.get_mut(index) {
            placeholder.patch = Some(Patch::Replace(svg.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Echoes the source into an SVG, fails on sources containing `fail`
    struct FakeEngine {
        calls: Arc<AtomicUsize>,
        ids: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl DiagramEngine for FakeEngine {
        async fn render(&self, id: &str, source: &str) -> std::result::Result<String, DiagramError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.ids.lock().unwrap().push(id.to_string());
            tokio::task::yield_now().await;
            if source.contains("fail") {
                return Err(DiagramError::Render(format!("cannot parse {source}")));
            }
            Ok(format!("<svg>{source}</svg>"))
        }
    }

    struct Harness {
        service: DiagramService,
        calls: Arc<AtomicUsize>,
        ids: Arc<Mutex<Vec<String>>>,
    }

    fn harness() -> Harness {
        let calls = Arc::new(AtomicUsize::new(0));
        let ids = Arc::new(Mutex::new(Vec::new()));
        let (c, i) = (Arc::clone(&calls), Arc::clone(&ids));
        let service = DiagramService::new(move || {
            let engine = FakeEngine {
                calls: Arc::clone(&c),
                ids: Arc::clone(&i),
            };
            async move { Ok(Arc::new(engine) as Arc<dyn DiagramEngine>) }
        });
        Harness { service, calls, ids }
    }

    #[tokio::test]
    async fn test_empty_sources_skip_engine() {
        let h = harness();
        let artifacts = h.service.render(&["", "   ", "\n\t"]).await;
        assert_eq!(artifacts, vec![DiagramArtifact::Empty; 3]);
        assert_eq!(h.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.service.init_count(), 0);
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let h = harness();
        let artifacts = h.service.render(&["graph A", "fail here", "", "graph B"]).await;
        assert_eq!(
            artifacts,
            vec![
                DiagramArtifact::Rendered("<svg>graph A</svg>".to_string()),
                DiagramArtifact::Failed,
                DiagramArtifact::Empty,
                DiagramArtifact::Rendered("<svg>graph B</svg>".to_string()),
            ]
        );
        assert_eq!(h.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_render_ids_are_indexed_and_stamped() {
        let h = harness();
        h.service.render(&["a", "b"]).await;
        let mut ids = h.ids.lock().unwrap().clone();
        ids.sort();
        assert_eq!(ids.len(), 2);
        for (index, id) in ids.iter().enumerate() {
            let prefix = format!("mermaid-preview-{index}-");
            let stamp = id.strip_prefix(&prefix).unwrap();
            assert!(stamp.parse::<u128>().is_ok(), "{id}");
        }
    }

    #[tokio::test]
    async fn test_sources_are_trimmed() {
        let h = harness();
        let artifacts = h.service.render(&["\n  graph A  \n"]).await;
        assert_eq!(artifacts, vec![DiagramArtifact::Rendered("<svg>graph A</svg>".to_string())]);
    }

    #[tokio::test]
    async fn test_engine_initialized_once_across_batches() {
        let h = harness();
        let (a, b) = tokio::join!(h.service.render(&["x"]), h.service.render(&["y"]));
        assert_eq!(a.len() + b.len(), 2);
        h.service.render(&["z"]).await;
        assert_eq!(h.service.init_count(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_engine_keeps_sources() {
        let service = DiagramService::new(|| async {
            Err::<Arc<dyn DiagramEngine>, _>(RenderError::EngineInit("offline".to_string()))
        });
        let artifacts = service.render(&["graph A", ""]).await;
        assert_eq!(artifacts, vec![DiagramArtifact::Failed, DiagramArtifact::Empty]);
    }

    #[tokio::test]
    async fn test_hydrate_html_patches_in_place() {
        let h = harness();
        let html = concat!(
            "<h1>T</h1>\n",
            "<div class=\"mermaid\">graph TD; A--&gt;B;</div>\n",
            "<div class=\"mermaid\">  </div>\n",
            "<div class=\"mermaid\">fail &amp; stay</div>\n",
        );
        let (out, summary) = h.service.hydrate_html(html.to_string()).await;
        assert_eq!(
            summary,
            BatchSummary {
                rendered: 1,
                cleared: 1,
                failed: 1
            }
        );
        assert_eq!(
            out,
            concat!(
                "<h1>T</h1>\n",
                "<div class=\"mermaid\" data-processed=\"true\"><svg>graph TD; A-->B;</svg></div>\n",
                "<div class=\"mermaid\"></div>\n",
                "<div class=\"mermaid\">fail &amp; stay</div>\n",
            )
        );
    }

    #[tokio::test]
    async fn test_processed_placeholders_are_skipped() {
        let h = harness();
        let (once, _) = h.service.hydrate_html("<div class=\"mermaid\">graph A</div>".to_string()).await;
        let (twice, summary) = h.service.hydrate_html(once.clone()).await;
        assert_eq!(twice, once);
        assert_eq!(summary, BatchSummary::default());
        assert_eq!(h.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_discovery_ignores_other_divs() {
        let placeholders = HtmlPlaceholders::new(
            "<div class=\"note\"><div class=\"diagram mermaid\">a</div></div><div class=\"mermaidish\">b</div>",
        );
        assert_eq!(placeholders.sources(), vec!["a".to_string()]);
    }

    #[test]
    fn test_untouched_html_is_preserved() {
        let html = "<p>x</p><div class=\"mermaid\">a</div>";
        assert_eq!(HtmlPlaceholders::new(html).into_html(), html);
    }

    #[test]
    fn test_with_svg_id() {
        assert_eq!(with_svg_id("<svg viewBox=\"0 0 1 1\"></svg>", "m-1"), "<svg id=\"m-1\" viewBox=\"0 0 1 1\"></svg>");
        assert_eq!(with_svg_id("<svg id=\"own\"></svg>", "m-1"), "<svg id=\"own\"></svg>");
        assert_eq!(with_svg_id("not svg", "m-1"), "not svg");
    }
}
