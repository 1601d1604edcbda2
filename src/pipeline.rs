//! Streaming session: accumulated model text to graph snapshot.
//!
//! Every text delta is appended to the session buffer and the whole buffer is
//! re-derived: reasoning split, table extraction, then graph construction.
//! The graph is only rebuilt when the extracted table actually changed.

use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Serialize;
use tracing::Instrument;

use crate::artifact::{ArtifactExtractor, Extraction, ParsedArtifact};
use crate::config::Config;
use crate::error::AppError;
use crate::graph::GraphBuilder;
use crate::models::{Diagnostic, Graph};
use crate::reasoning::{ReasoningSplit, ReasoningSplitter};
use crate::stream::{decode_events, text_deltas};

/// Whether a table has been found in the output yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    /// No header line seen.
    Missing,
    /// Header seen, no rows yet.
    Pending,
    /// Header and at least one row.
    Ready,
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub session_id: String,
    pub complete: bool,
    pub status: ArtifactStatus,
    #[serde(flatten)]
    pub split: ReasoningSplit,
    pub artifact: Option<ParsedArtifact>,
    pub graph: Option<Graph>,
    /// Extraction diagnostics followed by graph diagnostics.
    pub diagnostics: Vec<Diagnostic>,
}

/// One model response being turned into a graph.
pub struct Session {
    id: String,
    span: tracing::Span,
    config: Config,
    splitter: ReasoningSplitter,
    extractor: ArtifactExtractor,
    builder: GraphBuilder,
    text: String,
    complete: bool,
    split: ReasoningSplit,
    extraction: Option<Extraction>,
    graph: Option<Graph>,
}

impl Session {
    pub fn new(config: &Config) -> Self {
        let id = ulid::Ulid::new().to_string();
        let span = tracing::info_span!("session", id = %id);
        Self {
            id,
            span,
            config: config.clone(),
            splitter: ReasoningSplitter::from_config(&config.reasoning),
            extractor: ArtifactExtractor::from_config(&config.table),
            builder: GraphBuilder::from_config(&config.table),
            text: String::new(),
            complete: false,
            split: ReasoningSplit::default(),
            extraction: None,
            graph: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Everything received so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn split(&self) -> &ReasoningSplit {
        &self.split
    }

    pub fn extraction(&self) -> Option<&Extraction> {
        self.extraction.as_ref()
    }

    pub fn graph(&self) -> Option<&Graph> {
        self.graph.as_ref()
    }

    pub fn status(&self) -> ArtifactStatus {
        match &self.extraction {
            None => ArtifactStatus::Missing,
            Some(e) if e.artifact.is_pending() => ArtifactStatus::Pending,
            Some(_) => ArtifactStatus::Ready,
        }
    }

    /// Appends a text delta and re-derives. Returns `true` if the table changed.
    pub fn ingest(&mut self, delta: &str) -> bool {
        self.text.push_str(delta);
        self.refresh()
    }

    /// Marks the stream finished and re-derives with final-answer rules.
    pub fn mark_complete(&mut self) -> bool {
        self.complete = true;
        self.refresh()
    }

    pub fn snapshot(&self) -> Snapshot {
        let mut diagnostics: Vec<Diagnostic> = self
            .extraction
            .as_ref()
            .map(|e| e.diagnostics.clone())
            .unwrap_or_default();
        if let Some(graph) = &self.graph {
            diagnostics.extend(graph.diagnostics.iter().cloned());
        }

        Snapshot {
            session_id: self.id.clone(),
            complete: self.complete,
            status: self.status(),
            split: self.split.clone(),
            artifact: self.extraction.as_ref().map(|e| e.artifact.clone()),
            graph: self.graph.clone(),
            diagnostics,
        }
    }

    /// Decodes an event stream into this session until it ends.
    ///
    /// `on_update` runs after every delta and once more after completion.
    /// Honors `stream.timeout_secs` as a deadline for the whole read.
    ///
    /// # Errors
    ///
    /// Transport, protocol and timeout errors end the read. The session is
    /// then left incomplete, holding the last snapshot derived before the
    /// failure.
    pub async fn run<S, F>(&mut self, chunks: S, on_update: F) -> Result<(), AppError>
    where
        S: Stream<Item = std::io::Result<Bytes>>,
        F: FnMut(&Session),
    {
        let Some(secs) = self.config.stream.timeout_secs else {
            return self.consume(chunks, on_update).await;
        };

        let deadline = Duration::from_secs(secs);
        match tokio::time::timeout(deadline, self.consume(chunks, on_update)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(parent: &self.span, secs, "Stream deadline exceeded");
                Err(AppError::Timeout(secs))
            }
        }
    }

    async fn consume<S, F>(&mut self, chunks: S, mut on_update: F) -> Result<(), AppError>
    where
        S: Stream<Item = std::io::Result<Bytes>>,
        F: FnMut(&Session),
    {
        let span = self.span.clone();
        let stream_config = self.config.stream.clone();

        async move {
            tracing::info!("Stream started");
            let deltas = text_deltas(decode_events(chunks, &stream_config));
            futures::pin_mut!(deltas);

            while let Some(delta) = deltas.next().await {
                match delta {
                    Ok(text) => {
                        self.ingest(&text);
                        on_update(&*self);
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, received = self.text.len(), "Stream aborted");
                        return Err(err);
                    }
                }
            }

            self.mark_complete();
            on_update(&*self);
            tracing::info!(
                received = self.text.len(),
                status = ?self.status(),
                nodes = self.graph.as_ref().map_or(0, |g| g.nodes.len()),
                "Stream finished"
            );
            Ok(())
        }
        .instrument(span)
        .await
    }

    fn refresh(&mut self) -> bool {
        let assume_reasoning = !self.complete
            && (self.config.reasoning.assume_unmarked || self.splitter.has_open_marker(&self.text));
        self.split = self.splitter.split(&self.text, assume_reasoning);

        let source = if self.split.final_text.is_empty() && self.complete {
            // The table may have been written inside the reasoning block
            self.split.reasoning.as_str()
        } else {
            self.split.final_text.as_str()
        };

        let extraction = self.extractor.extract(source);
        if extraction == self.extraction {
            return false;
        }

        self.graph = extraction.as_ref().and_then(|e| self.build_graph(&e.artifact));
        self.extraction = extraction;
        tracing::debug!(parent: &self.span, status = ?self.status(), "Artifact changed");
        true
    }

    fn build_graph(&self, artifact: &ParsedArtifact) -> Option<Graph> {
        match self.builder.build(artifact) {
            Ok(graph) => {
                tracing::info!(
                    parent: &self.span,
                    nodes = graph.stats.node_count,
                    edges = graph.stats.edge_count,
                    "Graph rebuilt"
                );
                Some(graph)
            }
            Err(err) => {
                tracing::debug!(parent: &self.span, error = %err, "No graph yet");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROSTER: &str = "agent_id,connections,system_prompt\na1,a2,Hello\na2,a1|a3,Hi\na3,,Hey";

    #[test]
    fn test_reasoning_hidden_until_closed() {
        let mut session = Session::new(&Config::default());
        session.ingest("Let me think about the roster.\n");
        session.ingest(ROSTER);
        assert_eq!(session.status(), ArtifactStatus::Missing);
        assert!(session.split().final_text.is_empty());

        session.ingest("\n</think>\n");
        session.ingest(ROSTER);
        assert_eq!(session.status(), ArtifactStatus::Ready);
        assert_eq!(session.graph().unwrap().nodes.len(), 3);
    }

    #[test]
    fn test_unmarked_text_without_assumption() {
        let mut config = Config::default();
        config.reasoning.assume_unmarked = false;
        let mut session = Session::new(&config);
        session.ingest(ROSTER);
        assert_eq!(session.status(), ArtifactStatus::Ready);

        session.ingest("<think>");
        assert_eq!(session.status(), ArtifactStatus::Missing);
    }

    #[test]
    fn test_pending_header() {
        let mut session = Session::new(&Config::default());
        session.ingest("</think>agent_id,connections\n");
        assert_eq!(session.status(), ArtifactStatus::Pending);
        assert!(session.graph().unwrap().is_empty());
    }

    #[test]
    fn test_complete_falls_back_to_reasoning() {
        let mut session = Session::new(&Config::default());
        session.ingest("<think>\n");
        session.ingest(ROSTER);
        session.ingest("\n</think>");
        assert_eq!(session.status(), ArtifactStatus::Missing);

        assert!(session.mark_complete());
        assert!(session.is_complete());
        assert_eq!(session.graph().unwrap().stats.edge_count, 2);
    }

    #[test]
    fn test_unchanged_table_not_rebuilt() {
        let mut session = Session::new(&Config::default());
        assert!(session.ingest(&format!("</think>{ROSTER}")));
        assert!(!session.ingest("\n\nThat is the roster."));
        let first = session.snapshot();
        assert!(!session.mark_complete());
        assert_eq!(session.snapshot().graph, first.graph);
    }

    #[test]
    fn test_missing_id_column_leaves_no_graph() {
        let mut session = Session::new(&Config::default());
        session.ingest("</think>connections,system_prompt\nx,hello");
        assert_eq!(session.status(), ArtifactStatus::Ready);
        assert!(session.graph().is_none());
    }

    #[test]
    fn test_snapshot_collects_diagnostics() {
        let mut session = Session::new(&Config::default());
        session.ingest("</think>id,connections\n1,1|9\n2,1,extra");
        let snapshot = session.snapshot();
        assert_eq!(snapshot.session_id.len(), 26);
        assert!(snapshot
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::RaggedRow { .. })));
        assert!(snapshot
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::SelfReference { .. })));
        assert!(snapshot
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::UnresolvedReference { .. })));
    }
}
