//! Test support: a sheet engine that records what the core asks of it.
//!
//! [`RecordingEngine`] keys every event by the [`Fingerprint`] of the style it
//! was created from, so tests can assert exactly how often each variant was
//! created, attached, detached and removed.
//!
//! ```rust
//! use sharestyle::testing::{RecordingEngine, SheetEvent};
//! use sharestyle::{Fragment, StyleContext, StyleDefs, StyleOptions};
//!
//! let engine = RecordingEngine::new();
//! let context = StyleContext::with_engine(engine.clone());
//! let site = context.define(
//!     StyleDefs::<(), ()>::new().class("root", Fragment::new().set("color", "red")),
//!     StyleOptions::new(),
//! );
//!
//! let lease = site.acquire(&()).unwrap();
//! assert_eq!(engine.created(), 1);
//! assert_eq!(engine.count(&SheetEvent::Attached(lease.fingerprint())), 1);
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use crate::error::EngineError;
use crate::fingerprint::Fingerprint;
use crate::sheet::{ClassNames, Sheet, SheetEngine, SheetOptions};
use crate::style::CanonicalStyle;

/// One call made against a [`RecordingEngine`] or one of its sheets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetEvent {
    /// [`SheetEngine::create`] succeeded.
    Created(Fingerprint),
    /// [`Sheet::attach`] was called.
    Attached(Fingerprint),
    /// [`Sheet::detach`] was called.
    Detached(Fingerprint),
    /// [`Sheet::remove`] was called.
    Removed(Fingerprint),
}

#[derive(Debug, Default)]
struct Journal {
    events: Vec<SheetEvent>,
    options: Vec<SheetOptions>,
    next_id: u64,
    attached: usize,
    fail_next: Option<EngineError>,
}

/// Sheet engine that journals every call.
///
/// Clones share the same journal. Generated class names are
/// `{prefix}{class}-{n}` where `n` counts creations.
#[derive(Debug, Clone, Default)]
pub struct RecordingEngine {
    journal: Rc<RefCell<Journal>>,
}

impl RecordingEngine {
    /// Creates an engine with an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next [`SheetEngine::create`] call fail with `error`.
    pub fn fail_next(&self, error: EngineError) {
        self.journal.borrow_mut().fail_next = Some(error);
    }

    /// All events so far, oldest first.
    pub fn events(&self) -> Vec<SheetEvent> {
        self.journal.borrow().events.clone()
    }

    /// Number of occurrences of `event`.
    pub fn count(&self, event: &SheetEvent) -> usize {
        self.journal
            .borrow()
            .events
            .iter()
            .filter(|e| *e == event)
            .count()
    }

    /// Number of successful creations.
    pub fn created(&self) -> usize {
        self.journal
            .borrow()
            .events
            .iter()
            .filter(|e| matches!(e, SheetEvent::Created(_)))
            .count()
    }

    /// Number of sheets currently attached.
    pub fn attached(&self) -> usize {
        self.journal.borrow().attached
    }

    /// Options received by each successful creation, in order.
    pub fn options(&self) -> Vec<SheetOptions> {
        self.journal.borrow().options.clone()
    }

    /// Forgets recorded events. Attachment tracking is kept.
    pub fn reset(&self) {
        let mut journal = self.journal.borrow_mut();
        journal.events.clear();
        journal.options.clear();
    }
}

impl SheetEngine for RecordingEngine {
    fn create(
        &self,
        style: &CanonicalStyle,
        options: &SheetOptions,
    ) -> Result<Box<dyn Sheet>, EngineError> {
        let mut journal = self.journal.borrow_mut();
        if let Some(error) = journal.fail_next.take() {
            return Err(error);
        }

        journal.next_id += 1;
        let id = journal.next_id;
        let prefix = options.prefix.as_deref().unwrap_or("");
        let mut classes = ClassNames::new();
        for class in style.class_names() {
            let source = style
                .get(class)
                .map(|body| Value::Object(body.clone()).to_string())
                .unwrap_or_default();
            classes.insert(class, format!("{}{}-{}", prefix, class, id), source);
        }

        let fingerprint = Fingerprint::of(style);
        journal.events.push(SheetEvent::Created(fingerprint));
        journal.options.push(options.clone());

        Ok(Box::new(RecordingSheet {
            fingerprint,
            classes,
            attached: false,
            journal: Rc::clone(&self.journal),
        }))
    }
}

struct RecordingSheet {
    fingerprint: Fingerprint,
    classes: ClassNames,
    attached: bool,
    journal: Rc<RefCell<Journal>>,
}

impl Sheet for RecordingSheet {
    fn classes(&self) -> &ClassNames {
        &self.classes
    }

    fn attach(&mut self) {
        let mut journal = self.journal.borrow_mut();
        journal.events.push(SheetEvent::Attached(self.fingerprint));
        if !self.attached {
            self.attached = true;
            journal.attached += 1;
        }
    }

    fn detach(&mut self) {
        let mut journal = self.journal.borrow_mut();
        journal.events.push(SheetEvent::Detached(self.fingerprint));
        if self.attached {
            self.attached = false;
            journal.attached -= 1;
        }
    }

    fn is_attached(&self) -> bool {
        self.attached
    }

    fn remove(self: Box<Self>) {
        self.journal
            .borrow_mut()
            .events
            .push(SheetEvent::Removed(self.fingerprint));
    }
}
