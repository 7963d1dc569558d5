//! Event types and sinks for observing analysis passes.
//!
//! This module defines [`AnalysisEvent`] and a set of sinks and adapters to emit,
//! collect, or forward events while running [`crate::analysis::runner::run_analysis`]
//! or driving an [`crate::orchestrator::Orchestrator`].
use std::time::Duration;

use crate::analysis::AnalysisMode;
use crate::geometry::MeshId;

/// Describes events emitted by analysis passes.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum AnalysisEvent {
    /// Emitted when a pass starts.
    PassStarted {
        /// Mode being analyzed.
        mode: AnalysisMode,
        /// Number of meshes in the snapshot.
        mesh_count: usize,
        /// Triangles in the occluder set.
        occluder_triangles: usize,
        /// Whether a certification threshold context applies.
        has_thresholds: bool,
    },

    /// Emitted when a mesh could not be analyzed.
    MeshSkipped {
        /// Id of the skipped mesh.
        mesh_id: MeshId,
        /// Human-readable reason.
        reason: String,
    },

    /// Emitted after all samples of a mesh were classified.
    MeshAnalyzed {
        /// Id of the analyzed mesh.
        mesh_id: MeshId,
        /// Number of vertices that produced a result.
        samples: usize,
        /// Vertices without a usable position or normal.
        dropped: usize,
    },

    /// Emitted when the pass finishes.
    PassFinished {
        /// Mode that was analyzed.
        mode: AnalysisMode,
        /// Meshes that produced results.
        meshes: usize,
        /// Total samples evaluated.
        samples: usize,
        /// Wall time of the pass.
        elapsed: Duration,
    },

    /// Non-fatal warning generated during a pass.
    Warning {
        /// Context string (e.g. mesh id).
        context: String,
        /// Human-readable message.
        message: String,
    },
}

/// Discriminant of [`AnalysisEvent`], used for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisEventKind {
    PassStarted,
    MeshSkipped,
    MeshAnalyzed,
    PassFinished,
    Warning,
}

impl AnalysisEvent {
    pub fn kind(&self) -> AnalysisEventKind {
        match self {
            AnalysisEvent::PassStarted { .. } => AnalysisEventKind::PassStarted,
            AnalysisEvent::MeshSkipped { .. } => AnalysisEventKind::MeshSkipped,
            AnalysisEvent::MeshAnalyzed { .. } => AnalysisEventKind::MeshAnalyzed,
            AnalysisEvent::PassFinished { .. } => AnalysisEventKind::PassFinished,
            AnalysisEvent::Warning { .. } => AnalysisEventKind::Warning,
        }
    }
}

/// A generic event sink that accepts [`AnalysisEvent`]s.
pub trait EventSink {
    fn send(&mut self, event: AnalysisEvent);

    /// Whether events of `kind` should be built at all.
    #[inline]
    fn wants(&self, _kind: AnalysisEventKind) -> bool {
        true
    }
}

/// A no-op event sink.
impl EventSink for () {
    #[inline]
    fn send(&mut self, _event: AnalysisEvent) {}

    #[inline]
    fn wants(&self, _kind: AnalysisEventKind) -> bool {
        false
    }
}

/// An event sink that forwards to a user-provided closure.
pub struct FnSink<F>
where
    F: FnMut(AnalysisEvent),
{
    f: F,
}

impl<F> FnSink<F>
where
    F: FnMut(AnalysisEvent),
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> EventSink for FnSink<F>
where
    F: FnMut(AnalysisEvent),
{
    #[inline]
    fn send(&mut self, event: AnalysisEvent) {
        (self.f)(event);
    }
}

/// An event sink that collects all events in a `Vec`.
#[derive(Default)]
pub struct VecSink {
    events: Vec<AnalysisEvent>,
}

impl VecSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            events: Vec::with_capacity(cap),
        }
    }

    pub fn as_slice(&self) -> &[AnalysisEvent] {
        &self.events
    }

    /// Number of collected events of `kind`.
    pub fn count(&self, kind: AnalysisEventKind) -> usize {
        self.events.iter().filter(|e| e.kind() == kind).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSink for VecSink {
    #[inline]
    fn send(&mut self, event: AnalysisEvent) {
        self.events.push(event);
    }
}

/// Fan-out sink that forwards each event to all contained sinks.
pub struct MultiSink<S: EventSink> {
    pub(crate) sinks: Vec<S>,
}

impl<S: EventSink> MultiSink<S> {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn with_sinks(sinks: Vec<S>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: S) {
        self.sinks.push(sink);
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }
}

impl<S: EventSink> Default for MultiSink<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: EventSink> EventSink for MultiSink<S> {
    fn send(&mut self, event: AnalysisEvent) {
        let kind = event.kind();
        let targets: Vec<usize> = (0..self.sinks.len())
            .filter(|&i| self.sinks[i].wants(kind))
            .collect();
        let Some((&last, rest)) = targets.split_last() else {
            return;
        };
        for &i in rest {
            self.sinks[i].send(event.clone());
        }
        self.sinks[last].send(event);
    }

    fn wants(&self, kind: AnalysisEventKind) -> bool {
        self.sinks.iter().any(|s| s.wants(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warning(context: &str) -> AnalysisEvent {
        AnalysisEvent::Warning {
            context: context.into(),
            message: "msg".into(),
        }
    }

    /// Accepts only one kind of event.
    struct OnlyKind(AnalysisEventKind, VecSink);

    impl EventSink for OnlyKind {
        fn send(&mut self, event: AnalysisEvent) {
            self.1.send(event);
        }

        fn wants(&self, kind: AnalysisEventKind) -> bool {
            kind == self.0
        }
    }

    #[test]
    fn vec_sink_collects_events() {
        let mut sink = VecSink::with_capacity(2);
        assert!(sink.is_empty());
        sink.send(warning("a"));
        sink.send(AnalysisEvent::MeshSkipped {
            mesh_id: "roof".into(),
            reason: "no normals".into(),
        });
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.count(AnalysisEventKind::MeshSkipped), 1);
        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn unit_sink_wants_nothing() {
        let sink = ();
        assert!(!sink.wants(AnalysisEventKind::Warning));
    }

    #[test]
    fn multi_sink_fans_out_events() {
        let mut multi = MultiSink::with_sinks(vec![VecSink::new(), VecSink::new()]);
        multi.send(warning("ctx"));
        assert_eq!(multi.len(), 2);
        assert_eq!(multi.sinks[0].len(), 1);
        assert_eq!(multi.sinks[1].len(), 1);
        assert!(matches!(
            multi.sinks[0].as_slice()[0],
            AnalysisEvent::Warning { .. }
        ));
    }

    #[test]
    fn multi_sink_respects_filters() {
        let mut multi = MultiSink::with_sinks(vec![
            OnlyKind(AnalysisEventKind::Warning, VecSink::new()),
            OnlyKind(AnalysisEventKind::MeshSkipped, VecSink::new()),
        ]);
        multi.send(warning("ctx"));
        assert_eq!(multi.sinks[0].1.len(), 1);
        assert!(multi.sinks[1].1.is_empty());
        assert!(!multi.wants(AnalysisEventKind::PassStarted));
    }

    #[test]
    fn fn_sink_invokes_callback() {
        let mut count = 0;
        let mut sink = FnSink::new(|_event| {
            count += 1;
        });
        sink.send(warning("ctx"));
        assert_eq!(count, 1);
    }
}
