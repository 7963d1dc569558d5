//! Mode-transition state machine driving analysis passes.
//!
//! The orchestrator does no I/O and owns no clock or thread: the host passes in the
//! current [`Instant`] with every call and decides where a pass runs. A typical host
//! frame looks like this:
//!
//! ```ignore
//! orchestrator.set_reference_time(slider_time, now);
//! if let Some(pass) = orchestrator.begin_pass(now) {
//!     let output = pass.run(&mut ()); // or on a worker thread
//!     orchestrator.complete_pass(output);
//! }
//! for update in orchestrator.drain_updates() { /* mirror in the scene */ }
//! ```
//!
//! Every input change bumps a generation counter. Results of passes that started before
//! the most recent switch to [`AnalysisMode::Off`] are discarded; results superseded by
//! a newer input change are still applied, and the newer recompute stays scheduled.
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::analysis::events::EventSink;
use crate::analysis::overlay::{OverlayStore, OverlayUpdate};
use crate::analysis::runner::{run_validated, AnalysisConfig, AnalysisOutcome, AnalysisRequest};
use crate::analysis::AnalysisMode;
use crate::error::Result;
use crate::geometry::SceneSnapshot;
use crate::thresholds::{RegulationDocument, ThresholdCache};

/// Where the orchestrator is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    /// Mode is off; no overlays exist.
    Idle,
    /// Inputs changed; a pass starts once `due` has passed without further changes.
    PendingRecompute { mode: AnalysisMode, due: Instant },
    /// The latest pass for `mode` has started or finished.
    Active(AnalysisMode),
}

/// What happened to a completed pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassStatus {
    Applied,
    /// Started before a switch to off, or older than an already applied pass.
    Discarded,
}

/// A self-contained analysis pass that can run on any thread.
#[derive(Debug, Clone)]
pub struct AnalysisPass {
    generation: u64,
    scene: Arc<SceneSnapshot>,
    request: AnalysisRequest,
    config: AnalysisConfig,
}

impl AnalysisPass {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn request(&self) -> &AnalysisRequest {
        &self.request
    }

    /// Runs sampling, classification, and coloring.
    pub fn run(&self, sink: &mut dyn EventSink) -> PassOutput {
        PassOutput {
            generation: self.generation,
            outcome: run_validated(&self.scene, &self.request, &self.config, sink),
        }
    }
}

/// Result of [`AnalysisPass::run`], handed back to [`Orchestrator::complete_pass`].
#[derive(Debug, Clone)]
pub struct PassOutput {
    pub generation: u64,
    pub outcome: AnalysisOutcome,
}

/// Sequences analysis passes and owns the resulting overlays.
pub struct Orchestrator {
    config: AnalysisConfig,
    mode: AnalysisMode,
    reference_time: DateTime<Utc>,
    regulations: Vec<RegulationDocument>,
    scene: Arc<SceneSnapshot>,
    thresholds: ThresholdCache,
    state: OrchestratorState,
    /// Bumped on every input change.
    generation: u64,
    /// Generation of the most recent switch to off.
    idle_epoch: u64,
    /// Generation of the most recently applied pass.
    applied: Option<u64>,
    overlays: OverlayStore,
}

impl Orchestrator {
    pub fn try_new(config: AnalysisConfig, reference_time: DateTime<Utc>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            mode: AnalysisMode::Off,
            reference_time,
            regulations: Vec::new(),
            scene: Arc::new(SceneSnapshot::default()),
            thresholds: ThresholdCache::new(),
            state: OrchestratorState::Idle,
            generation: 0,
            idle_epoch: 0,
            applied: None,
            overlays: OverlayStore::new(),
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn mode(&self) -> AnalysisMode {
        self.mode
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn overlays(&self) -> &OverlayStore {
        &self.overlays
    }

    /// Overlay changes since the last call, oldest first.
    pub fn drain_updates(&mut self) -> Vec<OverlayUpdate> {
        self.overlays.drain_updates()
    }

    /// When the host should call [`Self::begin_pass`] or [`Self::tick`] next.
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            OrchestratorState::PendingRecompute { due, .. } => Some(due),
            _ => None,
        }
    }

    /// Switches the analysis mode. Switching to off removes every overlay immediately.
    pub fn set_mode(&mut self, mode: AnalysisMode, now: Instant) {
        if mode == AnalysisMode::Off {
            self.generation += 1;
            self.idle_epoch = self.generation;
            self.mode = mode;
            self.state = OrchestratorState::Idle;
            let removed = self.overlays.clear();
            debug!("Analysis off; removed {} overlays.", removed);
            return;
        }
        if mode == self.mode {
            return;
        }
        self.mode = mode;
        self.invalidate(now);
    }

    /// Changes the analyzed day.
    pub fn set_reference_time(&mut self, reference_time: DateTime<Utc>, now: Instant) {
        if reference_time == self.reference_time {
            return;
        }
        self.reference_time = reference_time;
        self.invalidate(now);
    }

    /// Replaces the active regulation documents.
    pub fn set_regulations(&mut self, regulations: Vec<RegulationDocument>, now: Instant) {
        if regulations == self.regulations {
            return;
        }
        self.regulations = regulations;
        self.invalidate(now);
    }

    /// Replaces the scene snapshot.
    pub fn set_scene(&mut self, scene: SceneSnapshot, now: Instant) {
        self.scene = Arc::new(scene);
        self.invalidate(now);
    }

    fn invalidate(&mut self, now: Instant) {
        self.generation += 1;
        if self.mode.is_active() {
            let due = now + self.config.debounce;
            self.state = OrchestratorState::PendingRecompute {
                mode: self.mode,
                due,
            };
            debug!(
                "Recompute of {:?} scheduled (generation {}).",
                self.mode, self.generation
            );
        }
    }

    /// Starts a pass if the debounce has elapsed.
    pub fn begin_pass(&mut self, now: Instant) -> Option<AnalysisPass> {
        let OrchestratorState::PendingRecompute { mode, due } = self.state else {
            return None;
        };
        if now < due {
            return None;
        }
        self.state = OrchestratorState::Active(mode);

        let thresholds = self.thresholds.get_or_resolve(&self.regulations);
        debug!("Starting {:?} pass, generation {}.", mode, self.generation);
        Some(AnalysisPass {
            generation: self.generation,
            scene: Arc::clone(&self.scene),
            request: AnalysisRequest::new(mode, self.reference_time).with_thresholds(thresholds),
            config: self.config.clone(),
        })
    }

    /// Applies the output of a pass unless it is stale.
    pub fn complete_pass(&mut self, output: PassOutput) -> PassStatus {
        let generation = output.generation;
        if generation < self.idle_epoch || self.applied.is_some_and(|g| g > generation) {
            debug!("Discarding stale pass, generation {}.", generation);
            return PassStatus::Discarded;
        }

        let outcome = output.outcome;
        self.overlays
            .retain_meshes(outcome.meshes.iter().map(|m| m.mesh_id.as_str()));
        for mesh in &outcome.meshes {
            self.overlays
                .apply(mesh.to_overlay().with_generation(generation));
        }
        self.applied = Some(generation);
        PassStatus::Applied
    }

    /// Starts, runs, and completes a due pass on the calling thread.
    pub fn tick(&mut self, now: Instant, sink: &mut dyn EventSink) -> Option<PassStatus> {
        let pass = self.begin_pass(now)?;
        let output = pass.run(sink);
        Some(self.complete_pass(output))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::TimeZone;
    use glam::Vec3;

    use super::*;
    use crate::analysis::events::{AnalysisEventKind, VecSink};
    use crate::analysis::overlay::OverlayState;
    use crate::geometry::primitives::{cuboid, grid_plane};
    use crate::thresholds::Credit;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, d, 12, 0, 0).unwrap()
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn scene() -> SceneSnapshot {
        SceneSnapshot::new()
            .with_mesh(grid_plane("roof", Vec3::ZERO, (4.0, 4.0), (2, 2)))
            .with_mesh(cuboid("block", Vec3::new(10.0, 0.0, 1.0), Vec3::splat(2.0)))
    }

    fn active(t0: Instant) -> Orchestrator {
        let mut o = Orchestrator::try_new(AnalysisConfig::default(), day(21)).unwrap();
        o.set_scene(scene(), t0);
        o.set_mode(AnalysisMode::SunHours, t0);
        o
    }

    #[test]
    fn recompute_waits_for_debounce() {
        let t0 = Instant::now();
        let mut o = active(t0);
        assert_eq!(
            o.state(),
            OrchestratorState::PendingRecompute {
                mode: AnalysisMode::SunHours,
                due: t0 + ms(150)
            }
        );
        assert_eq!(o.tick(t0 + ms(100), &mut ()), None);
        assert!(o.overlays().is_empty());

        assert_eq!(o.tick(t0 + ms(150), &mut ()), Some(PassStatus::Applied));
        assert_eq!(o.state(), OrchestratorState::Active(AnalysisMode::SunHours));
        assert_eq!(o.overlays().state("roof"), OverlayState::Active);
        assert_eq!(o.overlays().state("block"), OverlayState::Active);
        assert_eq!(o.next_deadline(), None);
    }

    #[test]
    fn rapid_changes_coalesce_into_one_pass() {
        let t0 = Instant::now();
        let mut o = active(t0);
        let mut sink = VecSink::new();
        for (i, d) in [22, 23, 24, 25].into_iter().enumerate() {
            let now = t0 + ms(100 * i as u64);
            o.set_reference_time(day(d), now);
            assert_eq!(o.tick(now, &mut sink), None);
        }
        assert_eq!(o.next_deadline(), Some(t0 + ms(450)));
        let pass = o.begin_pass(t0 + ms(450)).unwrap();
        assert_eq!(pass.request().reference_time, day(25));
        o.complete_pass(pass.run(&mut sink));
        assert_eq!(sink.count(AnalysisEventKind::PassStarted), 1);
    }

    #[test]
    fn switching_off_removes_overlays_immediately() {
        let t0 = Instant::now();
        let mut o = active(t0);
        o.tick(t0 + ms(150), &mut ());
        o.drain_updates();

        // A pending recompute must not delay the removal.
        o.set_reference_time(day(22), t0 + ms(200));
        o.set_mode(AnalysisMode::Off, t0 + ms(210));
        assert!(o.overlays().is_empty());
        assert_eq!(o.state(), OrchestratorState::Idle);
        let updates = o.drain_updates();
        assert_eq!(updates.len(), 2);
        assert!(updates
            .iter()
            .all(|u| matches!(u, OverlayUpdate::Removed(_))));
        assert_eq!(o.tick(t0 + ms(1000), &mut ()), None);
    }

    #[test]
    fn in_flight_pass_is_discarded_after_off() {
        let t0 = Instant::now();
        let mut o = active(t0);
        let pass = o.begin_pass(t0 + ms(150)).unwrap();
        let output = pass.run(&mut ());
        o.set_mode(AnalysisMode::Off, t0 + ms(160));
        assert_eq!(o.complete_pass(output), PassStatus::Discarded);
        assert!(o.overlays().is_empty());
    }

    #[test]
    fn superseded_pass_still_applies_and_reschedules() {
        let t0 = Instant::now();
        let mut o = active(t0);
        let pass = o.begin_pass(t0 + ms(150)).unwrap();
        o.set_mode(AnalysisMode::Wind, t0 + ms(160));

        assert_eq!(o.complete_pass(pass.run(&mut ())), PassStatus::Applied);
        assert_eq!(o.overlays().len(), 2);
        assert_eq!(o.next_deadline(), Some(t0 + ms(310)));

        assert_eq!(o.tick(t0 + ms(310), &mut ()), Some(PassStatus::Applied));
        assert_eq!(o.state(), OrchestratorState::Active(AnalysisMode::Wind));
    }

    #[test]
    fn older_pass_never_overwrites_newer() {
        let t0 = Instant::now();
        let mut o = active(t0);
        let first = o.begin_pass(t0 + ms(150)).unwrap();
        o.set_reference_time(day(22), t0 + ms(160));
        let second = o.begin_pass(t0 + ms(310)).unwrap();
        assert!(second.generation() > first.generation());

        assert_eq!(o.complete_pass(second.run(&mut ())), PassStatus::Applied);
        assert_eq!(o.complete_pass(first.run(&mut ())), PassStatus::Discarded);
        let gen = o.overlays().get("roof").unwrap().generation;
        assert_eq!(gen, second.generation());
    }

    #[test]
    fn removed_meshes_lose_their_overlay() {
        let t0 = Instant::now();
        let mut o = active(t0);
        o.tick(t0 + ms(150), &mut ());
        o.drain_updates();

        let only_roof =
            SceneSnapshot::new().with_mesh(grid_plane("roof", Vec3::ZERO, (4.0, 4.0), (2, 2)));
        o.set_scene(only_roof, t0 + ms(200));
        o.tick(t0 + ms(350), &mut ());
        assert_eq!(o.overlays().state("block"), OverlayState::Absent);
        assert!(o
            .drain_updates()
            .contains(&OverlayUpdate::Removed("block".into())));
    }

    #[test]
    fn empty_scene_is_a_quiet_no_op() {
        let t0 = Instant::now();
        let mut o = Orchestrator::try_new(AnalysisConfig::default(), day(21)).unwrap();
        o.set_mode(AnalysisMode::Daylight, t0);
        let mut sink = VecSink::new();
        assert_eq!(o.tick(t0 + ms(150), &mut sink), Some(PassStatus::Applied));
        assert!(o.overlays().is_empty());
        assert!(sink.is_empty());
    }

    #[test]
    fn regulations_feed_thresholds() {
        let t0 = Instant::now();
        let mut o = active(t0);
        let doc = RegulationDocument::new("Scheme").with_credit(Credit::new(
            "Sunlight",
            ["Minimum 5 hours direct sunlight"],
        ));
        o.set_regulations(vec![doc], t0 + ms(10));
        let pass = o.begin_pass(t0 + ms(160)).unwrap();
        let sun = pass.request().thresholds.unwrap().sun_hours.unwrap();
        assert_eq!((sun.minimum, sun.target), (5.0, 7.5));
    }

    #[test]
    fn unchanged_inputs_do_not_reschedule() {
        let t0 = Instant::now();
        let mut o = active(t0);
        o.tick(t0 + ms(150), &mut ());
        let generation = o.generation();
        o.set_mode(AnalysisMode::SunHours, t0 + ms(200));
        o.set_reference_time(day(21), t0 + ms(200));
        assert_eq!(o.generation(), generation);
        assert_eq!(o.next_deadline(), None);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = AnalysisConfig::default().with_ray_epsilon(-1.0);
        assert!(Orchestrator::try_new(config, day(21)).is_err());
    }
}
