//! Reference-counted artifacts with a bounded cooldown cache.
//!
//! [`SheetLifecycle`] decides when a materialized style is created, reused,
//! kept warm, or torn down. It owns two disjoint maps keyed by
//! [`Fingerprint`]:
//!
//! - `active`: artifacts with at least one outstanding reference;
//! - `cooldown`: artifacts with no references, kept for instant reuse, in
//!   least-recently-released order and bounded by the configured capacity.
//!
//! ## State Machine
//!
//! ```text
//!            resolve (create + attach)
//!   Absent ───────────────────────────▶ Active ◀──┐
//!                                        │        │ resolve (promote,
//!                      release, refs = 0 │        │ no re-attach)
//!                                        ▼        │
//!                                      Cooling ───┘
//!                                        │
//!                     evicted as LRU     │
//!                   (detach + remove)    ▼
//!                                     Destroyed
//! ```
//!
//! A cooling artifact's sheet stays attached: detaching happens only on
//! eviction. Promotion therefore never re-creates or re-attaches anything.
//!
//! With a capacity of `0` there is no cooling: the last release destroys the
//! artifact immediately.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::{EngineError, LifecycleError};
use crate::fingerprint::Fingerprint;
use crate::sheet::{ClassNames, Sheet, SheetEngine, SheetOptions};
use crate::style::CanonicalStyle;

/// Where a fingerprint currently sits in a [`SheetLifecycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactState {
    /// Not present in either map (never seen, or destroyed).
    Absent,
    /// Referenced by at least one consumer.
    Active,
    /// Unreferenced but kept warm in the cooldown cache.
    Cooling,
}

/// Counters describing what a lifecycle has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleStats {
    /// Sheets created through the engine.
    pub created: u64,
    /// Resolves served from the active map.
    pub reused: u64,
    /// Resolves served by promoting a cooling artifact.
    pub promoted: u64,
    /// Accepted releases.
    pub released: u64,
    /// Artifacts destroyed.
    pub destroyed: u64,
}

/// The materialized result for one fingerprint.
///
/// Artifacts are shared through `Rc`; every consumer that resolves the same
/// fingerprint while the artifact is active or cooling gets the same
/// instance.
///
/// Besides the engine's class names, an artifact keeps the canonical body of
/// every class. Those style tokens are independent of the engine and can be
/// merged into another descriptor with
/// [`Fragment::merge_style`](crate::Fragment::merge_style).
pub struct Artifact {
    fingerprint: Fingerprint,
    classes: Rc<ClassNames>,
    styles: Map<String, Value>,
    refs: Cell<usize>,
    sheet: RefCell<Option<Box<dyn Sheet>>>,
}

impl Artifact {
    fn new(fingerprint: Fingerprint, style: &CanonicalStyle, sheet: Box<dyn Sheet>) -> Self {
        let styles = style
            .class_names()
            .filter_map(|class| {
                style
                    .get(class)
                    .map(|body| (class.to_string(), Value::Object(body.clone())))
            })
            .collect();
        Self {
            fingerprint,
            classes: Rc::new(sheet.classes().clone()),
            styles,
            refs: Cell::new(0),
            sheet: RefCell::new(Some(sheet)),
        }
    }

    /// The fingerprint this artifact materializes.
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// Generated class names.
    pub fn classes(&self) -> &Rc<ClassNames> {
        &self.classes
    }

    /// Canonical style body of a declared class.
    pub fn style(&self, class: &str) -> Option<&Map<String, Value>> {
        self.styles.get(class).and_then(Value::as_object)
    }

    /// Number of outstanding references.
    pub fn ref_count(&self) -> usize {
        self.refs.get()
    }

    /// Returns true once the sheet has been handed back to the engine.
    pub fn is_destroyed(&self) -> bool {
        self.sheet.borrow().is_none()
    }

    /// Returns true while the sheet's rules apply.
    pub fn is_attached(&self) -> bool {
        self.sheet
            .borrow()
            .as_ref()
            .map(|sheet| sheet.is_attached())
            .unwrap_or(false)
    }

    fn retain(&self) {
        self.refs.set(self.refs.get() + 1);
    }

    /// Detaches and removes the sheet.
    ///
    /// # Panics
    ///
    /// Panics if the artifact was already destroyed.
    fn destroy(&self) {
        let sheet = self.sheet.borrow_mut().take();
        match sheet {
            Some(mut sheet) => {
                sheet.detach();
                sheet.remove();
            }
            None => panic!("artifact {} destroyed twice", self.fingerprint),
        }
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("fingerprint", &self.fingerprint)
            .field("refs", &self.refs.get())
            .field("classes", &self.classes)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

/// Registry of artifacts for one style site.
///
/// Not thread-safe: a lifecycle belongs to one site, and a site to one
/// thread. Resolve and release calls are expected in invocation order.
pub struct SheetLifecycle {
    engine: Rc<dyn SheetEngine>,
    options: SheetOptions,
    capacity: usize,
    active: HashMap<Fingerprint, Rc<Artifact>>,
    cooldown: IndexMap<Fingerprint, Rc<Artifact>>,
    stats: LifecycleStats,
}

impl SheetLifecycle {
    /// Creates an empty lifecycle.
    ///
    /// `options` are passed to every [`SheetEngine::create`] call;
    /// `capacity` bounds the cooldown cache.
    pub fn new(engine: Rc<dyn SheetEngine>, options: SheetOptions, capacity: usize) -> Self {
        Self {
            engine,
            options,
            capacity,
            active: HashMap::new(),
            cooldown: IndexMap::new(),
            stats: LifecycleStats::default(),
        }
    }

    /// Takes a reference on the artifact for `fingerprint`.
    ///
    /// Reuses an active artifact, promotes a cooling one, or creates (and
    /// attaches) a new one from `style`. The sheet is attached before this
    /// returns, so the class names are usable immediately.
    ///
    /// # Errors
    ///
    /// Engine failures are returned unchanged; no state is modified.
    pub fn resolve(
        &mut self,
        fingerprint: Fingerprint,
        style: &CanonicalStyle,
    ) -> Result<Rc<Artifact>, EngineError> {
        if let Some(artifact) = self.active.get(&fingerprint) {
            artifact.retain();
            self.stats.reused += 1;
            tracing::trace!(%fingerprint, refs = artifact.ref_count(), "reused artifact");
            return Ok(Rc::clone(artifact));
        }

        if let Some(artifact) = self.cooldown.shift_remove(&fingerprint) {
            assert_eq!(artifact.ref_count(), 0, "cooling artifact {} has references", fingerprint);
            artifact.retain();
            self.active.insert(fingerprint, Rc::clone(&artifact));
            self.stats.promoted += 1;
            tracing::debug!(%fingerprint, index = self.options.index, "promoted artifact from cooldown");
            return Ok(artifact);
        }

        let mut sheet = self.engine.create(style, &self.options)?;
        sheet.attach();
        let artifact = Rc::new(Artifact::new(fingerprint, style, sheet));
        artifact.retain();
        self.active.insert(fingerprint, Rc::clone(&artifact));
        self.stats.created += 1;
        tracing::debug!(
            %fingerprint,
            index = self.options.index,
            classes = artifact.classes.len(),
            "created artifact"
        );
        Ok(artifact)
    }

    /// Drops one reference on `fingerprint`.
    ///
    /// When the count reaches zero the artifact moves to the most recently
    /// used end of the cooldown cache, which may evict and destroy the least
    /// recently used cooling artifact.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotActive`] if the fingerprint has no
    /// outstanding reference. Counts never go negative.
    pub fn release(&mut self, fingerprint: Fingerprint) -> Result<(), LifecycleError> {
        let artifact = self
            .active
            .get(&fingerprint)
            .ok_or(LifecycleError::NotActive { fingerprint })?;

        let remaining = artifact.ref_count() - 1;
        artifact.refs.set(remaining);
        self.stats.released += 1;
        if remaining > 0 {
            tracing::trace!(%fingerprint, refs = remaining, "released reference");
            return Ok(());
        }

        if let Some(artifact) = self.active.remove(&fingerprint) {
            self.cool(artifact);
        }
        Ok(())
    }

    fn cool(&mut self, artifact: Rc<Artifact>) {
        let fingerprint = artifact.fingerprint;
        if self.capacity == 0 {
            self.destroy(&artifact);
            return;
        }

        let previous = self.cooldown.insert(fingerprint, artifact);
        assert!(previous.is_none(), "fingerprint {} was already cooling", fingerprint);
        tracing::trace!(%fingerprint, cooling = self.cooldown.len(), "artifact cooling");

        while self.cooldown.len() > self.capacity {
            let Some((evicted, artifact)) = self.cooldown.shift_remove_index(0) else {
                break;
            };
            if self.active.contains_key(&evicted) {
                continue;
            }
            tracing::debug!(fingerprint = %evicted, "evicted artifact from cooldown");
            self.destroy(&artifact);
        }
    }

    fn destroy(&mut self, artifact: &Artifact) {
        artifact.destroy();
        self.stats.destroyed += 1;
        tracing::debug!(fingerprint = %artifact.fingerprint, "destroyed artifact");
    }

    /// Destroys every cooling artifact. Active artifacts are untouched.
    pub fn clear(&mut self) {
        let cooling: Vec<_> = self.cooldown.drain(..).collect();
        for (_, artifact) in cooling {
            self.destroy(&artifact);
        }
    }

    /// Returns where `fingerprint` currently sits.
    pub fn state_of(&self, fingerprint: Fingerprint) -> ArtifactState {
        let active = self.active.contains_key(&fingerprint);
        let cooling = self.cooldown.contains_key(&fingerprint);
        assert!(!(active && cooling), "fingerprint {} is both active and cooling", fingerprint);
        if active {
            ArtifactState::Active
        } else if cooling {
            ArtifactState::Cooling
        } else {
            ArtifactState::Absent
        }
    }

    /// Returns the artifact for `fingerprint` if it is active or cooling,
    /// without taking a reference.
    pub fn peek(&self, fingerprint: Fingerprint) -> Option<&Rc<Artifact>> {
        self.active
            .get(&fingerprint)
            .or_else(|| self.cooldown.get(&fingerprint))
    }

    /// Cooling fingerprints, least recently released first.
    pub fn cooling(&self) -> impl Iterator<Item = Fingerprint> + '_ {
        self.cooldown.keys().copied()
    }

    /// Number of active artifacts.
    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Number of cooling artifacts.
    pub fn cooling_len(&self) -> usize {
        self.cooldown.len()
    }

    /// Capacity of the cooldown cache.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Options passed to the engine.
    pub fn options(&self) -> &SheetOptions {
        &self.options
    }

    /// Counters so far.
    pub fn stats(&self) -> LifecycleStats {
        self.stats
    }
}

impl Drop for SheetLifecycle {
    fn drop(&mut self) {
        self.clear();
        let active: Vec<_> = self.active.drain().collect();
        for (_, artifact) in active {
            self.destroy(&artifact);
        }
    }
}

impl fmt::Debug for SheetLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SheetLifecycle")
            .field("options", &self.options)
            .field("capacity", &self.capacity)
            .field("active", &self.active.len())
            .field("cooling", &self.cooldown.len())
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingEngine, SheetEvent};
    use serde_json::json;

    fn style(color: &str) -> CanonicalStyle {
        let mut style = CanonicalStyle::new();
        style.insert("root", json!({ "color": color }).as_object().cloned().unwrap());
        style
    }

    fn lifecycle(engine: &RecordingEngine, capacity: usize) -> SheetLifecycle {
        SheetLifecycle::new(Rc::new(engine.clone()), SheetOptions::default(), capacity)
    }

    fn resolve(lc: &mut SheetLifecycle, color: &str) -> Rc<Artifact> {
        let style = style(color);
        lc.resolve(Fingerprint::of(&style), &style).unwrap()
    }

    #[test]
    fn test_resolve_creates_and_attaches_once() {
        let engine = RecordingEngine::new();
        let mut lc = lifecycle(&engine, 20);

        let a = resolve(&mut lc, "red");
        let b = resolve(&mut lc, "red");

        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(a.ref_count(), 2);
        assert!(a.is_attached());
        assert_eq!(engine.created(), 1);
        assert_eq!(
            engine.events(),
            vec![
                SheetEvent::Created(a.fingerprint()),
                SheetEvent::Attached(a.fingerprint())
            ]
        );
        assert_eq!(lc.stats().reused, 1);
    }

    #[test]
    fn test_artifact_keeps_class_style_tokens() {
        let engine = RecordingEngine::new();
        let mut lc = lifecycle(&engine, 20);
        let mut style = style("red");
        style.insert("@global", json!({"body": {"margin": 0}}).as_object().cloned().unwrap());
        let artifact = lc.resolve(Fingerprint::of(&style), &style).unwrap();

        assert_eq!(
            Value::Object(artifact.style("root").unwrap().clone()),
            json!({"color": "red"})
        );
        assert!(artifact.style("@global").is_none());
        assert!(artifact.style("missing").is_none());
    }

    #[test]
    fn test_release_to_zero_moves_to_cooldown_once() {
        let engine = RecordingEngine::new();
        let mut lc = lifecycle(&engine, 20);
        let artifact = resolve(&mut lc, "red");
        let fp = artifact.fingerprint();
        resolve(&mut lc, "red");
        resolve(&mut lc, "red");

        lc.release(fp).unwrap();
        lc.release(fp).unwrap();
        assert_eq!(lc.state_of(fp), ArtifactState::Active);
        lc.release(fp).unwrap();
        assert_eq!(lc.state_of(fp), ArtifactState::Cooling);
        assert_eq!(lc.cooling_len(), 1);

        // Still attached while cooling.
        assert!(artifact.is_attached());
        assert_eq!(engine.count(&SheetEvent::Detached(fp)), 0);
    }

    #[test]
    fn test_over_release_is_rejected() {
        let engine = RecordingEngine::new();
        let mut lc = lifecycle(&engine, 20);
        let artifact = resolve(&mut lc, "red");
        let fp = artifact.fingerprint();

        lc.release(fp).unwrap();
        assert_eq!(lc.release(fp), Err(LifecycleError::NotActive { fingerprint: fp }));
        assert_eq!(lc.release(fp), Err(LifecycleError::NotActive { fingerprint: fp }));
        assert_eq!(artifact.ref_count(), 0);
        assert_eq!(lc.stats().released, 1);
    }

    #[test]
    fn test_release_of_unknown_fingerprint_is_rejected() {
        let engine = RecordingEngine::new();
        let mut lc = lifecycle(&engine, 20);
        let fp = Fingerprint::from(7);
        assert_eq!(lc.release(fp), Err(LifecycleError::NotActive { fingerprint: fp }));
    }

    #[test]
    fn test_promotion_preserves_identity() {
        let engine = RecordingEngine::new();
        let mut lc = lifecycle(&engine, 20);
        let first = resolve(&mut lc, "red");
        lc.release(first.fingerprint()).unwrap();

        let again = resolve(&mut lc, "red");
        assert!(Rc::ptr_eq(&first, &again));
        assert_eq!(again.ref_count(), 1);
        assert_eq!(lc.state_of(first.fingerprint()), ArtifactState::Active);
        assert_eq!(lc.cooling_len(), 0);
        assert_eq!(engine.created(), 1);
        assert_eq!(engine.count(&SheetEvent::Attached(first.fingerprint())), 1);
        assert_eq!(lc.stats().promoted, 1);
    }

    #[test]
    fn test_cooldown_evicts_least_recently_released() {
        let engine = RecordingEngine::new();
        let mut lc = lifecycle(&engine, 2);
        let colors = ["red", "green", "blue"];
        let artifacts: Vec<_> = colors.iter().map(|c| resolve(&mut lc, c)).collect();
        for artifact in &artifacts {
            lc.release(artifact.fingerprint()).unwrap();
        }

        let oldest = artifacts[0].fingerprint();
        assert_eq!(lc.state_of(oldest), ArtifactState::Absent);
        assert!(artifacts[0].is_destroyed());
        assert_eq!(engine.count(&SheetEvent::Detached(oldest)), 1);
        assert_eq!(engine.count(&SheetEvent::Removed(oldest)), 1);
        assert_eq!(
            lc.cooling().collect::<Vec<_>>(),
            vec![artifacts[1].fingerprint(), artifacts[2].fingerprint()]
        );

        // A fresh resolve builds a brand-new artifact.
        let rebuilt = resolve(&mut lc, "red");
        assert!(!Rc::ptr_eq(&rebuilt, &artifacts[0]));
        assert_eq!(engine.count(&SheetEvent::Created(oldest)), 2);
    }

    #[test]
    fn test_zero_capacity_destroys_on_release() {
        let engine = RecordingEngine::new();
        let mut lc = lifecycle(&engine, 0);
        let artifact = resolve(&mut lc, "red");
        lc.release(artifact.fingerprint()).unwrap();

        assert!(artifact.is_destroyed());
        assert_eq!(lc.state_of(artifact.fingerprint()), ArtifactState::Absent);
        assert_eq!(lc.cooling_len(), 0);
        assert_eq!(lc.stats().destroyed, 1);
    }

    #[test]
    fn test_engine_failure_leaves_state_untouched() {
        let engine = RecordingEngine::new();
        let mut lc = lifecycle(&engine, 20);
        engine.fail_next(EngineError::Other("boom".to_string()));

        let style = style("red");
        let fp = Fingerprint::of(&style);
        let err = lc.resolve(fp, &style).unwrap_err();
        assert_eq!(err, EngineError::Other("boom".to_string()));
        assert_eq!(lc.state_of(fp), ArtifactState::Absent);
        assert_eq!(lc.stats(), LifecycleStats::default());

        // The next attempt goes through.
        assert!(lc.resolve(fp, &style).is_ok());
    }

    #[test]
    fn test_clear_destroys_only_cooling() {
        let engine = RecordingEngine::new();
        let mut lc = lifecycle(&engine, 20);
        let kept = resolve(&mut lc, "red");
        let dropped = resolve(&mut lc, "blue");
        lc.release(dropped.fingerprint()).unwrap();

        lc.clear();
        assert!(dropped.is_destroyed());
        assert!(!kept.is_destroyed());
        assert_eq!(lc.active_len(), 1);
        assert_eq!(lc.cooling_len(), 0);
    }

    #[test]
    fn test_drop_destroys_everything() {
        let engine = RecordingEngine::new();
        let mut lc = lifecycle(&engine, 20);
        let active = resolve(&mut lc, "red");
        let cooling = resolve(&mut lc, "blue");
        lc.release(cooling.fingerprint()).unwrap();

        drop(lc);
        assert!(active.is_destroyed());
        assert!(cooling.is_destroyed());
        assert_eq!(engine.attached(), 0);
    }

    #[test]
    #[should_panic(expected = "destroyed twice")]
    fn test_double_destroy_panics() {
        let engine = RecordingEngine::new();
        let mut lc = lifecycle(&engine, 0);
        let artifact = resolve(&mut lc, "red");
        lc.release(artifact.fingerprint()).unwrap();
        artifact.destroy();
    }
}
