//! Reconciliation controller: one per open document view. External changes
//! to the authoritative markdown text come in as parse → diff → apply with
//! change notification suppressed; local edits go out as a debounced
//! serialize-and-publish. The controller is the only thing allowed to
//! decide when either direction runs.

use std::time::{Duration, Instant};

use thiserror::Error;

use rich_doc::{ApplyError, Document, Editor, Point, Selection, Transaction, diff};

use crate::autoformat::autoformat;
use crate::cache::BoundedCache;
use crate::parse::parse_markdown_cached;
use crate::registry::ElementRegistry;
use crate::serialize::serialize_nodes;

const PARSE_CACHE_CAPACITY: usize = 512;
const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// The authoritative text lives outside the core; collaborators hand us
/// the current text and accept what we publish.
pub trait SyncSource {
    fn current_text(&self) -> String;
    fn publish(&mut self, text: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    ApplyingExternal,
    PendingLocalSave,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Apply(#[from] ApplyError),
}

pub struct SyncController<S: SyncSource> {
    editor: Editor,
    registry: ElementRegistry,
    source: S,
    state: SyncState,
    /// The markdown this view last saw or produced. Publishing and
    /// external application both compare against it, which is what breaks
    /// the feedback loop.
    markdown_value: Option<String>,
    queued_external: Option<String>,
    save_deadline: Option<Instant>,
    debounce: Duration,
    current: bool,
    cache: BoundedCache<String, Vec<rich_doc::Node>>,
}

impl<S: SyncSource> SyncController<S> {
    pub fn new(source: S, registry: ElementRegistry) -> Self {
        let text = source.current_text();
        let mut cache = BoundedCache::new(PARSE_CACHE_CAPACITY);
        let children = parse_markdown_cached(&text, &registry, &mut cache);
        let selection = Selection::collapsed(Point::new(vec![0, 0], 0));
        let mut editor = Editor::new(Document { children }, selection, registry.schema().clone());
        editor.clear_dirty();

        Self {
            editor,
            registry,
            source,
            state: SyncState::Idle,
            markdown_value: Some(text),
            queued_external: None,
            save_deadline: None,
            debounce: DEFAULT_DEBOUNCE,
            current: true,
            cache,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut Editor {
        &mut self.editor
    }

    pub fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn markdown_value(&self) -> Option<&str> {
        self.markdown_value.as_deref()
    }

    /// Whether this view is the focused one. A view that is not current
    /// never publishes, so two views of the same text cannot fight.
    pub fn set_current(&mut self, current: bool) {
        self.current = current;
    }

    /// The authoritative text changed for a reason other than our own last
    /// save. Mid-apply arrivals queue; they are replayed once the current
    /// apply finishes, never interleaved.
    pub fn on_external_change(&mut self) {
        let text = self.source.current_text();
        if self.state == SyncState::ApplyingExternal {
            self.queued_external = Some(text);
            return;
        }
        self.apply_external(text);
        while let Some(queued) = self.queued_external.take() {
            self.apply_external(queued);
        }
    }

    fn apply_external(&mut self, text: String) {
        if self.markdown_value.as_deref() == Some(text.as_str()) {
            return;
        }
        self.state = SyncState::ApplyingExternal;

        let new_children = parse_markdown_cached(&text, &self.registry, &mut self.cache);
        let ops = diff(&self.editor.doc().children, &new_children);
        if !ops.is_empty() {
            let tx = Transaction::new(ops).source("external");
            if let Err(err) = self.editor.apply(tx) {
                // Abandon and wait for the next natural re-sync.
                tracing::warn!(%err, "external patch abandoned");
            }
        }
        // The tree change came from outside; it must not look like a local
        // edit or we would save it straight back.
        self.editor.clear_dirty();

        self.markdown_value = Some(text);
        self.state = SyncState::Idle;
    }

    /// Call after any local transaction. (Re)arms the debounce window; a
    /// new edit supersedes the pending deadline rather than adding one.
    pub fn note_local_edit(&mut self, now: Instant) {
        if self.state == SyncState::ApplyingExternal {
            return;
        }
        if !self.editor.is_dirty() {
            return;
        }
        self.state = SyncState::PendingLocalSave;
        self.save_deadline = Some(now + self.debounce);
    }

    /// Drive the debounce clock. Only the final deadline after quiescence
    /// fires.
    pub fn tick(&mut self, now: Instant) {
        if self.state == SyncState::PendingLocalSave
            && self.save_deadline.is_some_and(|deadline| deadline <= now)
        {
            self.save();
        }
    }

    /// Serialize and publish immediately, skipping the debounce.
    pub fn flush(&mut self) {
        if self.editor.is_dirty() || self.state == SyncState::PendingLocalSave {
            self.save();
        }
    }

    /// Force-save, then run the auto-format transform so it lands as a
    /// single undoable step on top of a clean snapshot.
    pub fn run_autoformat(&mut self, now: Instant) -> Result<bool, SyncError> {
        self.flush();
        let changed = autoformat(&mut self.editor, &self.registry)?;
        if changed {
            self.note_local_edit(now);
        }
        Ok(changed)
    }

    fn save(&mut self) {
        self.save_deadline = None;
        if !self.current {
            // Stay pending; an eventual focus + flush publishes it.
            self.state = SyncState::PendingLocalSave;
            return;
        }

        let markdown = serialize_nodes(&self.editor.doc().children, &self.registry);
        self.editor.clear_dirty();
        self.state = SyncState::Idle;
        if self.markdown_value.as_deref() == Some(markdown.as_str()) {
            return;
        }
        self.markdown_value = Some(markdown.clone());
        self.source.publish(&markdown);
    }
}
