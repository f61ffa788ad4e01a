use gifwat_core::app::{CardTarget, ModalKind, PreviewStatus};
use gifwat_core::backend::Backend;
use gifwat_core::clipboard::MemoryClipboard;
use gifwat_core::image_load::LoadStatus;
use gifwat_core::store::{execute, Command};
use gifwat_core::{App, Effect, Error, Gif, InteractionConfig, MemBackend, NavKey, Request};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn gif(id: &str, url: &str, tags: &[&str]) -> Gif {
    Gif {
        id: id.into(),
        url: url.into(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        created_at: 0,
    }
}

/// Records every add_gif call and can be told to fail.
#[derive(Default)]
struct Recording {
    inner: MemBackend,
    adds: Mutex<Vec<(String, Vec<String>)>>,
    fail: AtomicBool,
    calls: AtomicUsize,
}

impl Recording {
    fn seeded(gifs: Vec<Gif>) -> Self {
        Self {
            inner: MemBackend::seeded(gifs),
            ..Default::default()
        }
    }

    fn check(&self) -> gifwat_core::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Backend("offline".into()));
        }
        Ok(())
    }
}

impl Backend for Recording {
    fn get_gifs(&self) -> gifwat_core::Result<Vec<Gif>> {
        self.check()?;
        self.inner.get_gifs()
    }
    fn add_gif(&self, url: &str, tags: &[String]) -> gifwat_core::Result<()> {
        self.check()?;
        self.adds.lock().unwrap().push((url.to_string(), tags.to_vec()));
        self.inner.add_gif(url, tags)
    }
    fn update_gif_tags(&self, id: &str, tags: &[String]) -> gifwat_core::Result<()> {
        self.check()?;
        self.inner.update_gif_tags(id, tags)
    }
    fn delete_gif(&self, id: &str) -> gifwat_core::Result<()> {
        self.check()?;
        self.inner.delete_gif(id)
    }
    fn copy_to_clipboard(&self, text: &str) -> gifwat_core::Result<()> {
        self.check()?;
        self.inner.copy_to_clipboard(text)
    }
}

/// Runs backend effects to completion; returns the non-backend effects.
fn settle(app: &mut App, backend: &dyn Backend, now: Instant) -> Vec<Effect> {
    let mut rest = Vec::new();
    loop {
        let effects = app.drain_effects();
        if effects.is_empty() {
            return rest;
        }
        for e in effects {
            match e {
                Effect::Backend(req) => app.apply_reply(execute(backend, req), now),
                other => rest.push(other),
            }
        }
    }
}

fn started(backend: &dyn Backend, columns: usize) -> App {
    let mut app = App::new(InteractionConfig {
        columns,
        ..Default::default()
    });
    app.start();
    settle(&mut app, backend, Instant::now());
    app
}

fn five() -> Vec<Gif> {
    (0..5)
        .map(|i| gif(&format!("g{i}"), &format!("https://x.example/{i}.gif"), &["x"]))
        .collect()
}

#[test]
fn start_loads_collection_in_backend_order() {
    let b = Recording::seeded(vec![gif("b", "https://b/1.gif", &[]), gif("a", "https://a/1.gif", &[])]);
    let app = started(&b, 2);
    let ids: Vec<&str> = app.visible().iter().map(|g| g.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "a"]);
    assert!(!app.is_loading());
}

#[test]
fn arrow_down_on_last_row_stays_put() {
    let b = Recording::seeded(five());
    let mut app = started(&b, 2);
    for _ in 0..4 {
        app.key(NavKey::Right);
    }
    assert_eq!(app.selected(), Some(3));
    app.key(NavKey::Right);
    assert_eq!(app.selected(), Some(4));
    let out = app.key(NavKey::Down);
    assert!(out.prevent_default);
    assert_eq!(app.selected(), Some(4));
}

#[test]
fn query_change_resets_selection() {
    let b = Recording::seeded(five());
    let mut app = started(&b, 2);
    app.key(NavKey::Down);
    app.key(NavKey::Down);
    assert_eq!(app.selected(), Some(2));
    app.set_query("x");
    assert_eq!(app.selected(), None);
    app.key(NavKey::Right);
    app.set_query("x ");
    assert_eq!(app.selected(), None);
}

#[test]
fn shrinking_collection_clamps_selection() {
    let b = Recording::seeded(five());
    let mut app = started(&b, 2);
    for _ in 0..5 {
        app.key(NavKey::Right);
    }
    assert_eq!(app.selected(), Some(4));
    for id in ["g3", "g4"] {
        b.inner.delete_gif(id).unwrap();
    }
    app.reload();
    settle(&mut app, &b, Instant::now());
    assert_eq!(app.selected(), Some(2));
    for id in ["g0", "g1", "g2"] {
        b.inner.delete_gif(id).unwrap();
    }
    app.reload();
    settle(&mut app, &b, Instant::now());
    assert_eq!(app.selected(), None);
    assert_eq!(app.empty_message(), Some("No GIFs yet!"));
}

#[test]
fn enter_copies_selected_url_and_escape_hides() {
    let clip = Arc::new(MemoryClipboard::new());
    let b = MemBackend::with_clipboard(Box::new(clip.clone()));
    b.add_gif("https://x.example/only.gif", &[]).unwrap();
    let mut app = started(&b, 2);
    let t0 = Instant::now();

    app.key(NavKey::Enter);
    assert!(settle(&mut app, &b, t0).is_empty());
    assert_eq!(clip.last_text(), None);

    app.key(NavKey::Down);
    app.key(NavKey::Enter);
    settle(&mut app, &b, t0);
    assert_eq!(clip.last_text().as_deref(), Some("https://x.example/only.gif"));
    let id = app.visible()[0].id.clone();
    assert!(app.is_copied(&id));
    assert_eq!(app.card_label(0), "Copied!");

    app.key(NavKey::Escape);
    assert!(app.drain_effects().contains(&Effect::HideWindow));
}

#[test]
fn modal_blocks_navigation_and_escape() {
    let b = Recording::seeded(five());
    let mut app = started(&b, 2);
    app.open_add();
    for key in [NavKey::Down, NavKey::Enter, NavKey::Escape] {
        let out = app.key(key);
        assert!(!out.prevent_default);
    }
    assert_eq!(app.selected(), None);
    assert!(app.drain_effects().is_empty());
    app.focus_changed(true);
    assert!(app.drain_effects().is_empty());
    app.close_modal();
    app.focus_changed(true);
    assert_eq!(app.drain_effects(), vec![Effect::FocusSearch]);
}

#[test]
fn add_sends_tokenized_tags_and_resyncs() {
    let b = Recording::default();
    let mut app = started(&b, 2);
    app.open_add();
    assert!(!app.submit_modal(), "blank url must not submit");
    {
        let m = app.modal_mut().unwrap();
        m.url = "  https://x.example/cat.gif ".into();
        m.tags_input = "  funny    cat  ".into();
    }
    assert!(app.submit_modal());
    assert!(app.modal().unwrap().is_submitting());
    settle(&mut app, &b, Instant::now());
    assert_eq!(
        b.adds.lock().unwrap().clone(),
        vec![(
            "https://x.example/cat.gif".to_string(),
            vec!["funny".to_string(), "cat".to_string()]
        )]
    );
    assert!(app.modal().is_none());
    assert_eq!(app.visible().len(), 1);
}

#[test]
fn failed_add_keeps_modal_and_state() {
    let b = Recording::seeded(five());
    let mut app = started(&b, 2);
    b.fail.store(true, Ordering::SeqCst);
    app.open_add();
    app.modal_mut().unwrap().url = "https://x.example/new.gif".into();
    assert!(app.submit_modal());
    settle(&mut app, &b, Instant::now());
    let m = app.modal().expect("modal stays open");
    assert!(!m.is_submitting());
    assert!(m.can_submit());
    assert_eq!(app.visible().len(), 5);
}

fn preview_attempt(app: &mut App) -> gifwat_core::image_load::LoadAttempt {
    let mut found = None;
    for e in app.drain_effects() {
        if let Effect::LoadPreview(a) = e {
            found = Some(a);
        }
    }
    found.expect("preview effect")
}

#[test]
fn add_preview_resets_on_every_url_edit() {
    let b = Recording::default();
    let mut app = started(&b, 2);
    app.open_add();
    assert_eq!(app.modal().unwrap().preview(), PreviewStatus::Empty);

    app.edit_modal(|m| m.url.push_str(" https://x.example/broken.gif"));
    let first = preview_attempt(&mut app);
    assert_eq!(first.url, "https://x.example/broken.gif");
    assert_eq!(app.modal().unwrap().preview(), PreviewStatus::Loading);
    app.preview_failed(first.seq);
    assert_eq!(app.modal().unwrap().preview(), PreviewStatus::Failed);

    // editing the url clears the error and checks again
    app.edit_modal(|m| m.url = "https://x.example/ok.gif".into());
    let second = preview_attempt(&mut app);
    assert_eq!(app.modal().unwrap().preview(), PreviewStatus::Loading);
    app.preview_failed(first.seq);
    assert_eq!(app.modal().unwrap().preview(), PreviewStatus::Loading);
    app.preview_loaded(second.seq);
    assert_eq!(app.modal().unwrap().preview(), PreviewStatus::Loaded);

    // tag edits leave the preview alone; clearing the url empties it
    app.edit_modal(|m| m.tags_input.push_str("cat"));
    assert!(app.drain_effects().is_empty());
    assert_eq!(app.modal().unwrap().preview(), PreviewStatus::Loaded);
    app.edit_modal(|m| m.url.clear());
    assert!(app.drain_effects().is_empty());
    assert_eq!(app.modal().unwrap().preview(), PreviewStatus::Empty);
}

#[test]
fn preview_reply_for_a_closed_modal_is_ignored() {
    let b = Recording::default();
    let mut app = started(&b, 2);
    app.open_add();
    app.edit_modal(|m| m.url = "https://x.example/a.gif".into());
    let old = preview_attempt(&mut app);
    app.close_modal();
    app.open_add();
    app.edit_modal(|m| m.url = "https://x.example/b.gif".into());
    let current = preview_attempt(&mut app);
    assert_ne!(old.seq, current.seq);
    app.preview_failed(old.seq);
    assert_eq!(app.modal().unwrap().preview(), PreviewStatus::Loading);
}

#[test]
fn failed_reload_keeps_previous_list() {
    let b = Recording::seeded(five());
    let mut app = started(&b, 2);
    b.fail.store(true, Ordering::SeqCst);
    app.reload();
    settle(&mut app, &b, Instant::now());
    assert_eq!(app.visible().len(), 5);
}

#[test]
fn delete_needs_two_presses_within_window() {
    let b = Recording::seeded(five());
    let mut app = started(&b, 2);
    let t0 = Instant::now();

    app.click("g1", CardTarget::DeleteButton, t0);
    assert!(app.is_confirming_delete("g1"));
    assert!(settle(&mut app, &b, t0).is_empty());
    assert_eq!(app.visible().len(), 5);

    // a fresh press after the window lapsed only re-arms
    app.click("g1", CardTarget::DeleteButton, t0 + ms(3001));
    settle(&mut app, &b, t0 + ms(3001));
    assert_eq!(app.visible().len(), 5);

    app.click("g1", CardTarget::DeleteButton, t0 + ms(4000));
    settle(&mut app, &b, t0 + ms(4000));
    assert!(app.visible().iter().all(|g| g.id != "g1"));
    assert!(app.item("g1").is_none());
}

#[test]
fn delete_click_never_copies() {
    let b = Recording::seeded(five());
    let mut app = started(&b, 2);
    let t0 = Instant::now();
    app.click("g0", CardTarget::DeleteButton, t0);
    let effects = app.drain_effects();
    assert!(effects.iter().all(|e| !matches!(
        e,
        Effect::Backend(Request {
            command: Command::CopyToClipboard { .. },
            ..
        })
    )));
}

#[test]
fn confirmation_reverts_on_tick() {
    let b = Recording::seeded(five());
    let mut app = started(&b, 2);
    let t0 = Instant::now();
    app.delete_pressed("g2", t0);
    assert_eq!(app.next_deadline(), Some(t0 + ms(3000)));
    app.tick(t0 + ms(3000));
    assert!(!app.is_confirming_delete("g2"));
    assert_eq!(app.next_deadline(), None);
}

#[test]
fn copy_indicator_moves_to_latest_item() {
    let b = Recording::seeded(five());
    let mut app = started(&b, 2);
    let t0 = Instant::now();
    app.click("g0", CardTarget::Preview, t0);
    settle(&mut app, &b, t0);
    assert!(app.is_copied("g0"));
    app.click("g1", CardTarget::Preview, t0 + ms(500));
    settle(&mut app, &b, t0 + ms(500));
    assert!(!app.is_copied("g0"));
    assert!(app.is_copied("g1"));
    app.tick(t0 + ms(2000));
    assert_eq!(app.copied_id(), None);
}

#[test]
fn failed_copy_marks_nothing() {
    let b = Recording::seeded(five());
    let mut app = started(&b, 2);
    b.fail.store(true, Ordering::SeqCst);
    app.copy("g0");
    settle(&mut app, &b, Instant::now());
    assert_eq!(app.copied_id(), None);
}

#[test]
fn stale_load_does_not_overwrite_newer_snapshot() {
    let b = Recording::seeded(five());
    let mut app = started(&b, 2);
    app.reload();
    app.reload();
    let mut reqs: Vec<Request> = app
        .drain_effects()
        .into_iter()
        .filter_map(|e| match e {
            Effect::Backend(r) => Some(r),
            _ => None,
        })
        .collect();
    let older = reqs.remove(0);
    let newer = reqs.remove(0);
    let now = Instant::now();
    b.inner.delete_gif("g0").unwrap();
    app.apply_reply(execute(&b, newer), now);
    assert_eq!(app.visible().len(), 4);
    b.inner.add_gif("https://x.example/late.gif", &[]).unwrap();
    app.apply_reply(execute(&b, older), now);
    assert_eq!(app.visible().len(), 4);
}

#[test]
fn viewport_gates_image_loads() {
    let gifs: Vec<Gif> = (0..12)
        .map(|i| gif(&format!("g{i}"), &format!("http://x.example/{i}.gif"), &[]))
        .collect();
    let b = Recording::seeded(gifs);
    let mut app = started(&b, 2);
    assert_eq!(app.load_status("g0"), Some(LoadStatus::Unobserved));

    // rows 0..2 on screen plus one row of margin => cards 0..6
    app.set_viewport(0, 2);
    let loads: Vec<(String, String)> = app
        .drain_effects()
        .into_iter()
        .filter_map(|e| match e {
            Effect::LoadImage { id, attempt } => Some((id, attempt.url)),
            _ => None,
        })
        .collect();
    assert_eq!(loads.len(), 6);
    assert_eq!(loads[0], ("g0".to_string(), "https://x.example/0.gif".to_string()));
    assert_eq!(app.load_status("g6"), Some(LoadStatus::Unobserved));

    // scrolling down releases the top rows
    app.set_viewport(4, 2);
    assert_eq!(app.load_status("g0"), Some(LoadStatus::Unobserved));
    assert_eq!(app.load_status("g6"), Some(LoadStatus::Loading));
}

#[test]
fn image_retry_schedule_through_controller() {
    let b = Recording::seeded(vec![gif("g0", "https://x.example/broken.gif", &[])]);
    let mut app = started(&b, 2);
    let t0 = Instant::now();
    app.set_viewport(0, 1);
    let mut attempts = Vec::new();
    let take = |app: &mut App| -> Vec<u32> {
        app.drain_effects()
            .into_iter()
            .filter_map(|e| match e {
                Effect::LoadImage { attempt, .. } => Some(attempt.seq),
                _ => None,
            })
            .collect()
    };
    attempts.extend(take(&mut app));
    let mut now = t0;
    for delay in [1000, 2000, 3000] {
        let seq = *attempts.last().unwrap();
        app.image_failed("g0", seq, now);
        app.tick(now + ms(delay - 1));
        assert!(take(&mut app).is_empty());
        now += ms(delay);
        app.tick(now);
        attempts.extend(take(&mut app));
    }
    assert_eq!(attempts, vec![0, 1, 2, 3]);
    app.image_failed("g0", 3, now);
    assert_eq!(app.load_status("g0"), Some(LoadStatus::Failed));
    app.tick(now + ms(60_000));
    assert!(take(&mut app).is_empty());
}

#[test]
fn filtered_out_card_loses_pending_timers() {
    let b = Recording::seeded(vec![
        gif("cat", "https://x.example/cat.gif", &["cat"]),
        gif("dog", "https://x.example/dog.gif", &["dog"]),
    ]);
    let mut app = started(&b, 2);
    let t0 = Instant::now();
    app.delete_pressed("dog", t0);
    assert!(app.next_deadline().is_some());
    app.set_query("cat");
    assert!(app.item("dog").is_none());
    assert_eq!(app.next_deadline(), None);
    app.set_query("");
    assert!(!app.is_confirming_delete("dog"));
}

#[test]
fn edit_tags_round_trip() {
    let b = Recording::seeded(vec![gif("g0", "https://x.example/a.gif", &["old", "tag"])]);
    let mut app = started(&b, 2);
    app.open_edit_tags("g0");
    {
        let m = app.modal_mut().unwrap();
        assert_eq!(m.kind, ModalKind::EditTags("g0".into()));
        assert_eq!(m.tags_input, "old tag");
        m.remove_tag(0);
        m.active_input().push_str(" new");
    }
    assert!(app.submit_modal());
    settle(&mut app, &b, Instant::now());
    assert!(app.modal().is_none());
    assert_eq!(app.gifs()[0].tags, vec!["tag", "new"]);
}

#[test]
fn empty_states() {
    let b = Recording::seeded(five());
    let mut app = started(&b, 2);
    assert_eq!(app.empty_message(), None);
    app.set_query("nothing-matches-this");
    assert_eq!(app.empty_message(), Some("No GIFs match your search."));
    assert_eq!(b.calls.load(Ordering::SeqCst), 1);
}
