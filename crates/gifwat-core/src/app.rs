//! Top-level controller: owns the collection, the query, the selection, the
//! copy indicator and the per-card transient state, and re-derives the
//! filtered view whenever any of them change.
//!
//! The controller is host-agnostic. Inputs arrive as method calls; outputs
//! are queued as [`Effect`]s that the host drains and carries out (backend
//! commands, image fetches, window actions). Time is always passed in, so
//! every timer is driven by the host's clock.

use crate::confirm::{ConfirmOutcome, DeleteConfirmation};
use crate::copy_feedback::CopyFeedback;
use crate::filter::{filter_gifs, parse_tags};
use crate::image_load::{ImageLoadController, LoadAttempt, LoadStatus};
use crate::nav::{KeyOutcome, KeyboardNavigator, NavAction, NavKey};
use crate::ports::WindowPort;
use crate::store::{Applied, GifCollectionStore, Reply, Request};
use crate::{Gif, GifId, InteractionConfig};
use std::collections::{HashMap, HashSet};
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Backend(Request),
    LoadImage { id: GifId, attempt: LoadAttempt },
    /// Check the url typed into the add modal
    LoadPreview(LoadAttempt),
    HideWindow,
    FocusSearch,
    ScrollIntoView(usize),
}

/// Routes window effects to a host port. Returns false for non-window effects.
pub fn route_window_effect(effect: &Effect, window: &mut dyn WindowPort) -> crate::Result<bool> {
    match effect {
        Effect::HideWindow => window.hide().map(|_| true),
        Effect::FocusSearch => window.focus_search().map(|_| true),
        _ => Ok(false),
    }
}

/// Transient state for one card; lives exactly as long as the card is in the view.
#[derive(Debug, Clone)]
pub struct ItemState {
    pub image: ImageLoadController,
    pub delete: DeleteConfirmation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardTarget {
    Preview,
    DeleteButton,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalKind {
    Add,
    EditTags(GifId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormField {
    #[default]
    Url,
    Tags,
}

/// Live preview of the url in the add modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreviewStatus {
    /// Blank url; nothing to show
    #[default]
    Empty,
    Loading,
    Loaded,
    Failed,
}

#[derive(Debug, Clone)]
pub struct Modal {
    pub kind: ModalKind,
    pub url: String,
    pub tags_input: String,
    pub field: FormField,
    pending: Option<u64>,
    preview: PreviewStatus,
    preview_seq: u32,
}

impl Modal {
    fn new(kind: ModalKind) -> Self {
        Self {
            kind,
            url: String::new(),
            tags_input: String::new(),
            field: FormField::Url,
            pending: None,
            preview: PreviewStatus::Empty,
            preview_seq: 0,
        }
    }

    pub fn preview(&self) -> PreviewStatus {
        self.preview
    }

    /// Drop the old preview; a non-blank url in the add form gets attempt `seq`.
    fn restart_preview(&mut self, seq: u32) -> Option<LoadAttempt> {
        self.preview_seq = seq;
        let url = self.url.trim();
        if self.kind != ModalKind::Add || url.is_empty() {
            self.preview = PreviewStatus::Empty;
            return None;
        }
        self.preview = PreviewStatus::Loading;
        Some(LoadAttempt {
            url: url.to_string(),
            seq,
        })
    }

    fn settle_preview(&mut self, seq: u32, loaded: bool) {
        if self.preview != PreviewStatus::Loading || seq != self.preview_seq {
            return;
        }
        self.preview = if loaded {
            PreviewStatus::Loaded
        } else {
            PreviewStatus::Failed
        };
    }

    pub fn tags(&self) -> Vec<String> {
        parse_tags(&self.tags_input)
    }

    pub fn is_submitting(&self) -> bool {
        self.pending.is_some()
    }

    pub fn can_submit(&self) -> bool {
        if self.is_submitting() {
            return false;
        }
        match self.kind {
            ModalKind::Add => !self.url.trim().is_empty(),
            ModalKind::EditTags(_) => true,
        }
    }

    pub fn remove_tag(&mut self, index: usize) {
        let mut tags = self.tags();
        if index < tags.len() {
            tags.remove(index);
            self.tags_input = tags.join(" ");
        }
    }

    pub fn next_field(&mut self) {
        if self.kind != ModalKind::Add {
            return;
        }
        self.field = match self.field {
            FormField::Url => FormField::Tags,
            FormField::Tags => FormField::Url,
        };
    }

    /// The text field keystrokes go to. The url is read-only when editing tags.
    pub fn active_input(&mut self) -> &mut String {
        match (&self.kind, self.field) {
            (ModalKind::Add, FormField::Url) => &mut self.url,
            _ => &mut self.tags_input,
        }
    }
}

pub struct App {
    config: InteractionConfig,
    store: GifCollectionStore,
    query: String,
    nav: KeyboardNavigator,
    copy: CopyFeedback,
    view: Vec<GifId>,
    items: HashMap<GifId, ItemState>,
    modal: Option<Modal>,
    preview_seq: u32,
    effects: Vec<Effect>,
}

impl App {
    pub fn new(config: InteractionConfig) -> Self {
        Self {
            nav: KeyboardNavigator::new(config.columns),
            copy: CopyFeedback::new(config.copied_hold()),
            config,
            store: GifCollectionStore::new(),
            query: String::new(),
            view: Vec::new(),
            items: HashMap::new(),
            modal: None,
            preview_seq: 0,
            effects: Vec::new(),
        }
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    /// Initial load.
    pub fn start(&mut self) {
        self.reload();
    }

    pub fn reload(&mut self) {
        let req = self.store.load();
        self.effects.push(Effect::Backend(req));
    }

    pub fn drain_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    pub fn has_effects(&self) -> bool {
        !self.effects.is_empty()
    }

    // ---- read side -------------------------------------------------------

    pub fn gifs(&self) -> &[Gif] {
        self.store.gifs()
    }

    pub fn is_loading(&self) -> bool {
        self.store.is_loading()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// The filtered sequence.
    pub fn visible(&self) -> Vec<&Gif> {
        filter_gifs(self.store.gifs(), &self.query)
    }

    pub fn columns(&self) -> usize {
        self.nav.columns()
    }

    pub fn selected(&self) -> Option<usize> {
        self.nav.selected()
    }

    pub fn selected_gif(&self) -> Option<&Gif> {
        let id = self.view.get(self.nav.selected()?)?;
        self.store.get(id)
    }

    pub fn item(&self, id: &str) -> Option<&ItemState> {
        self.items.get(id)
    }

    pub fn load_status(&self, id: &str) -> Option<LoadStatus> {
        self.items.get(id).map(|i| i.image.status())
    }

    pub fn is_confirming_delete(&self, id: &str) -> bool {
        self.items.get(id).is_some_and(|i| i.delete.is_confirming())
    }

    pub fn is_copied(&self, id: &str) -> bool {
        self.copy.is_copied(id)
    }

    pub fn copied_id(&self) -> Option<&str> {
        self.copy.copied_id()
    }

    pub fn card_label(&self, index: usize) -> &'static str {
        match self.view.get(index) {
            Some(id) if self.copy.is_copied(id) => "Copied!",
            Some(_) if self.nav.selected() == Some(index) => "Enter to copy",
            _ => "Click to copy",
        }
    }

    pub fn empty_message(&self) -> Option<&'static str> {
        if !self.view.is_empty() {
            return None;
        }
        Some(if self.store.gifs().is_empty() {
            "No GIFs yet!"
        } else {
            "No GIFs match your search."
        })
    }

    pub fn modal(&self) -> Option<&Modal> {
        self.modal.as_ref()
    }

    pub fn modal_mut(&mut self) -> Option<&mut Modal> {
        self.modal.as_mut()
    }

    // ---- search + keyboard ----------------------------------------------

    pub fn set_query(&mut self, query: impl Into<String>) {
        let query = query.into();
        if query == self.query {
            return;
        }
        self.query = query;
        self.nav.reset();
        self.sync_view();
    }

    pub fn key(&mut self, key: NavKey) -> KeyOutcome {
        let out = self.nav.handle(key, self.view.len(), self.modal.is_some());
        match out.action {
            NavAction::Moved(Some(i)) => self.effects.push(Effect::ScrollIntoView(i)),
            NavAction::Copy(i) => {
                if let Some(id) = self.view.get(i).cloned() {
                    self.copy(&id);
                }
            }
            NavAction::HideWindow => self.effects.push(Effect::HideWindow),
            NavAction::Moved(None) | NavAction::Ignored => {}
        }
        out
    }

    pub fn focus_changed(&mut self, focused: bool) {
        if focused && self.modal.is_none() {
            self.effects.push(Effect::FocusSearch);
        }
    }

    // ---- card actions ----------------------------------------------------

    /// A click on a card. The delete control consumes its click; it never
    /// reaches the preview's copy handler.
    pub fn click(&mut self, id: &str, target: CardTarget, now: Instant) {
        match target {
            CardTarget::DeleteButton => self.delete_pressed(id, now),
            CardTarget::Preview => self.copy(id),
        }
    }

    pub fn copy(&mut self, id: &str) {
        let Some(gif) = self.store.get(id).cloned() else {
            return;
        };
        let req = self.store.copy(&gif);
        self.effects.push(Effect::Backend(req));
    }

    pub fn delete_pressed(&mut self, id: &str, now: Instant) {
        let Some(item) = self.items.get_mut(id) else {
            return;
        };
        if item.delete.invoke(now) == ConfirmOutcome::Confirmed {
            let req = self.store.remove(id);
            self.effects.push(Effect::Backend(req));
        }
    }

    pub fn delete_selected(&mut self, now: Instant) {
        if let Some(id) = self.nav.selected().and_then(|i| self.view.get(i)).cloned() {
            self.delete_pressed(&id, now);
        }
    }

    // ---- modal -----------------------------------------------------------

    pub fn open_add(&mut self) {
        self.modal = Some(Modal::new(ModalKind::Add));
    }

    pub fn open_edit_tags(&mut self, id: &str) {
        let Some(gif) = self.store.get(id) else {
            return;
        };
        let mut modal = Modal::new(ModalKind::EditTags(gif.id.clone()));
        modal.url = gif.url.clone();
        modal.tags_input = gif.tags.join(" ");
        modal.field = FormField::Tags;
        self.modal = Some(modal);
    }

    /// Apply an edit to the open modal. A changed url resets the preview and
    /// asks the host to check the new one.
    pub fn edit_modal(&mut self, edit: impl FnOnce(&mut Modal)) {
        let Some(modal) = self.modal.as_mut() else {
            return;
        };
        let before = modal.url.clone();
        edit(modal);
        if modal.url == before {
            return;
        }
        self.preview_seq = self.preview_seq.wrapping_add(1);
        if let Some(attempt) = modal.restart_preview(self.preview_seq) {
            self.effects.push(Effect::LoadPreview(attempt));
        }
    }

    pub fn preview_loaded(&mut self, seq: u32) {
        if let Some(m) = self.modal.as_mut() {
            m.settle_preview(seq, true);
        }
    }

    pub fn preview_failed(&mut self, seq: u32) {
        if let Some(m) = self.modal.as_mut() {
            m.settle_preview(seq, false);
        }
    }

    pub fn close_modal(&mut self) {
        self.modal = None;
    }

    /// Returns false when submission is disabled (blank url, already submitting).
    pub fn submit_modal(&mut self) -> bool {
        let Some(modal) = self.modal.as_mut() else {
            return false;
        };
        if !modal.can_submit() {
            return false;
        }
        let tags = modal.tags();
        let req = match &modal.kind {
            ModalKind::Add => match self.store.add(&modal.url, tags) {
                Some(req) => req,
                None => return false,
            },
            ModalKind::EditTags(id) => self.store.update_tags(id, tags),
        };
        modal.pending = Some(req.ticket);
        self.effects.push(Effect::Backend(req));
        true
    }

    // ---- viewport + images ------------------------------------------------

    /// Report which grid rows are on screen. Cards within the proximity
    /// margin are observed; the rest are released.
    pub fn set_viewport(&mut self, first_row: usize, rows: usize) {
        let cols = self.nav.columns();
        let margin = self.config.proximity_rows;
        let start = first_row.saturating_sub(margin) * cols;
        let end = (first_row + rows + margin) * cols;
        for (i, id) in self.view.clone().iter().enumerate() {
            self.set_item_visible(id, i >= start && i < end);
        }
    }

    pub fn set_item_visible(&mut self, id: &str, visible: bool) {
        let Some(item) = self.items.get_mut(id) else {
            return;
        };
        if let Some(attempt) = item.image.set_visible(visible) {
            self.effects.push(Effect::LoadImage {
                id: id.to_string(),
                attempt,
            });
        }
    }

    pub fn image_loaded(&mut self, id: &str, seq: u32) {
        if let Some(item) = self.items.get_mut(id) {
            item.image.on_loaded(seq);
        }
    }

    pub fn image_failed(&mut self, id: &str, seq: u32, now: Instant) {
        if let Some(item) = self.items.get_mut(id) {
            item.image.on_failed(seq, now);
        }
    }

    // ---- backend replies + timers ------------------------------------------

    pub fn apply_reply(&mut self, reply: Reply, now: Instant) {
        match self.store.apply(reply) {
            Applied::Reloaded => self.sync_view(),
            Applied::Stale => {}
            Applied::Mutated { ticket, resync, .. } => {
                if self.modal.as_ref().is_some_and(|m| m.pending == Some(ticket)) {
                    self.modal = None;
                }
                self.effects.push(Effect::Backend(resync));
            }
            Applied::Copied { id, ticket } => {
                self.copy.mark(&id, ticket, now);
            }
            Applied::Failed { ticket, .. } => {
                if let Some(m) = self.modal.as_mut().filter(|m| m.pending == Some(ticket)) {
                    m.pending = None;
                }
            }
        }
    }

    pub fn tick(&mut self, now: Instant) {
        self.copy.poll(now);
        for (id, item) in self.items.iter_mut() {
            item.delete.poll(now);
            if let Some(attempt) = item.image.poll(now) {
                self.effects.push(Effect::LoadImage {
                    id: id.clone(),
                    attempt,
                });
            }
        }
    }

    /// Earliest pending timer, for the host's poll timeout.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.items
            .values()
            .flat_map(|i| [i.delete.next_deadline(), i.image.next_deadline()])
            .chain([self.copy.next_deadline()])
            .flatten()
            .min()
    }

    /// Re-derive the filtered view, keep per-card state for cards that are
    /// still shown, create it for newcomers, drop it (and its timers) for the rest.
    fn sync_view(&mut self) {
        let shown = filter_gifs(self.store.gifs(), &self.query);
        self.view = shown.iter().map(|g| g.id.clone()).collect();
        let policy = self.config.retry_policy();
        let window = self.config.confirm_window();
        let keep: HashSet<&str> = shown.iter().map(|g| g.id.as_str()).collect();
        self.items.retain(|id, _| keep.contains(id.as_str()));
        for gif in shown {
            self.items.entry(gif.id.clone()).or_insert_with(|| ItemState {
                image: ImageLoadController::new(&gif.url, policy),
                delete: DeleteConfirmation::new(window),
            });
        }
        self.nav.clamp(self.view.len());
    }
}
