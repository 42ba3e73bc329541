//! Search-as-you-type over the keyword search service.
//!
//! [`SearchBox`] keeps the input, the debounce deadline and the suggestion list.
//! It never talks to the network itself: it hands out [`KeywordRequest`]s and
//! takes their answers back through [`SearchBox::apply_results`], which drops
//! any answer that is not for the latest request.

use std::time::{Duration, Instant};

use egui::{Key, Modifiers, RichText, Ui};

use crate::error::Result;
use crate::i18n::{tr, Locale};
use crate::map::geo::LatLng;
use crate::maps_api::local_search::{PlaceResult, SearchStatus};

pub const DEBOUNCE: Duration = Duration::from_millis(300);
pub const MAX_SUGGESTIONS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordRequest {
    pub seq: u64,
    pub query: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchBoxAction {
    Search(KeywordRequest),
    Commit(PlaceResult),
    ToggleBookmark(PlaceResult),
}

#[derive(Default)]
pub struct SearchBox {
    text: String,
    suggestions: Vec<PlaceResult>,
    highlighted: Option<usize>,
    open: bool,
    due: Option<Instant>,
    seq: u64,
    searching: bool,
    error: Option<String>,
}

impl SearchBox {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn suggestions(&self) -> &[PlaceResult] {
        &self.suggestions
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_searching(&self) -> bool {
        self.searching
    }

    pub fn debounce_pending(&self) -> bool {
        self.due.is_some()
    }

    /// The user edited the input.
    pub fn set_text(&mut self, text: impl Into<String>, now: Instant) {
        self.text = text.into();
        self.highlighted = None;
        if self.text.trim().is_empty() {
            self.due = None;
            self.suggestions.clear();
            self.open = false;
            self.searching = false;
            // Anything still in flight is now stale.
            self.seq += 1;
        } else {
            self.due = Some(now + DEBOUNCE);
        }
    }

    /// Fire the debounced search once the input has been quiet long enough.
    pub fn tick(&mut self, now: Instant) -> Option<KeywordRequest> {
        match self.due {
            Some(due) if now >= due => self.issue(),
            _ => None,
        }
    }

    /// Time left before the pending search fires.
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.due.map(|due| due.saturating_duration_since(now))
    }

    fn issue(&mut self) -> Option<KeywordRequest> {
        self.due = None;
        let query = self.text.trim();
        if query.is_empty() {
            return None;
        }
        self.seq += 1;
        self.searching = true;
        self.error = None;
        log::debug!("keyword search #{} for {query:?}", self.seq);
        Some(KeywordRequest {
            seq: self.seq,
            query: query.to_string(),
        })
    }

    /// Enter: commit the highlighted suggestion, otherwise search right away.
    pub fn enter(&mut self) -> Option<SearchBoxAction> {
        if self.open {
            if let Some(index) = self.highlighted {
                return self.commit(index).map(SearchBoxAction::Commit);
            }
        }
        self.issue().map(SearchBoxAction::Search)
    }

    /// Move the highlight by `delta` rows, wrapping at both ends.
    pub fn move_highlight(&mut self, delta: i32) {
        let len = self.suggestions.len();
        if len == 0 || !self.open {
            return;
        }
        let len = len as i32;
        let next = match self.highlighted {
            None if delta > 0 => 0,
            None => len - 1,
            Some(current) => (current as i32 + delta).rem_euclid(len),
        };
        self.highlighted = Some(next as usize);
    }

    pub fn dismiss(&mut self) {
        self.open = false;
        self.highlighted = None;
    }

    /// Take suggestion `index`: the input shows its name and the list closes.
    pub fn commit(&mut self, index: usize) -> Option<PlaceResult> {
        let place = self.suggestions.get(index)?.clone();
        self.text = place.place_name.clone();
        self.due = None;
        self.dismiss();
        Some(place)
    }

    /// Returns `false` for an answer to anything but the latest request.
    pub fn apply_results(&mut self, seq: u64, result: Result<SearchStatus>) -> bool {
        if seq != self.seq {
            log::debug!("dropping stale keyword results #{seq}");
            return false;
        }
        self.searching = false;
        self.highlighted = None;
        self.open = true;
        match result {
            Ok(status) => {
                self.suggestions = status.into_places();
                self.suggestions.truncate(MAX_SUGGESTIONS);
                self.error = None;
            }
            Err(err) => {
                log::warn!("keyword search failed: {err}");
                self.suggestions.clear();
                self.error = Some(err.user_message());
            }
        }
        true
    }

    pub fn show(
        &mut self,
        ui: &mut Ui,
        locale: Locale,
        enabled: bool,
        is_bookmarked: impl Fn(LatLng) -> bool,
        can_bookmark: bool,
    ) -> Vec<SearchBoxAction> {
        let mut actions = Vec::new();
        let now = Instant::now();
        let id = ui.make_persistent_id("place_search_input");

        if ui.memory(|m| m.has_focus(id)) {
            let (down, up, escape) = ui.input_mut(|i| {
                (
                    i.consume_key(Modifiers::NONE, Key::ArrowDown),
                    i.consume_key(Modifiers::NONE, Key::ArrowUp),
                    i.consume_key(Modifiers::NONE, Key::Escape),
                )
            });
            if down {
                self.move_highlight(1);
            }
            if up {
                self.move_highlight(-1);
            }
            if escape {
                self.dismiss();
            }
        }

        let hint = if enabled {
            tr(locale, "map.searchPlaceholder")
        } else {
            tr(locale, "map.searchDisabled")
        };
        let input = ui.add_enabled(
            enabled,
            egui::TextEdit::singleline(&mut self.text)
                .id(id)
                .hint_text(hint)
                .desired_width(320.0),
        );
        if input.changed() {
            let text = self.text.clone();
            self.set_text(text, now);
        }
        if input.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter)) {
            actions.extend(self.enter());
            input.request_focus();
        }

        if let Some(request) = self.tick(now) {
            actions.push(SearchBoxAction::Search(request));
        } else if let Some(wait) = self.time_until_due(now) {
            ui.ctx().request_repaint_after(wait);
        }

        let mut list_rect = None;
        if self.searching {
            ui.label(RichText::new(tr(locale, "map.searching")).small().weak());
        } else if self.open {
            let frame = egui::Frame::popup(ui.style()).show(ui, |ui| {
                ui.set_width(320.0);
                if let Some(error) = &self.error {
                    ui.colored_label(ui.visuals().error_fg_color, error);
                } else if self.suggestions.is_empty() {
                    ui.label(RichText::new(tr(locale, "map.noResults")).weak());
                }
                let mut committed = None;
                for (index, place) in self.suggestions.iter().enumerate() {
                    ui.horizontal(|ui| {
                        if can_bookmark {
                            let starred = place.position().is_some_and(&is_bookmarked);
                            let star = if starred { "★" } else { "☆" };
                            let hover = if starred { "map.removeBookmark" } else { "map.addBookmark" };
                            if ui.small_button(star).on_hover_text(tr(locale, hover)).clicked() {
                                actions.push(SearchBoxAction::ToggleBookmark(place.clone()));
                            }
                        }
                        let selected = self.highlighted == Some(index);
                        let row = ui.vertical(|ui| {
                            let title = ui.selectable_label(selected, &place.place_name);
                            ui.label(RichText::new(place.display_address()).small().weak());
                            title
                        });
                        if row.inner.clicked() {
                            committed = Some(index);
                        }
                    });
                }
                if let Some(index) = committed {
                    actions.extend(self.commit(index).map(SearchBoxAction::Commit));
                }
            });
            list_rect = Some(frame.response.rect);
        }

        // A press anywhere outside the input and the list closes it.
        if self.open {
            let outside = ui.input(|i| {
                i.pointer.any_pressed()
                    && i.pointer.interact_pos().is_some_and(|pos| {
                        !input.rect.contains(pos) && !list_rect.is_some_and(|r| r.contains(pos))
                    })
            });
            if outside {
                self.dismiss();
            }
        }

        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn place(name: &str) -> PlaceResult {
        PlaceResult {
            place_name: name.to_string(),
            x: "127.0276".to_string(),
            y: "37.4979".to_string(),
            ..Default::default()
        }
    }

    fn results(names: &[&str]) -> Result<SearchStatus> {
        Ok(SearchStatus::Ok {
            places: names.iter().map(|n| place(n)).collect(),
            meta: Default::default(),
        })
    }

    fn with_suggestions(names: &[&str]) -> SearchBox {
        let mut search = SearchBox::default();
        let t0 = Instant::now();
        search.set_text("강남", t0);
        let request = search.tick(t0 + DEBOUNCE).unwrap();
        assert!(search.apply_results(request.seq, results(names)));
        search
    }

    #[test]
    fn typing_fires_one_search_after_the_quiet_period() {
        let mut search = SearchBox::default();
        let t0 = Instant::now();
        search.set_text("강", t0);
        search.set_text("강남", t0 + Duration::from_millis(100));
        search.set_text("강남역", t0 + Duration::from_millis(200));

        assert_eq!(search.tick(t0 + Duration::from_millis(250)), None);
        assert_eq!(search.tick(t0 + Duration::from_millis(450)), None);
        let request = search.tick(t0 + Duration::from_millis(500)).unwrap();
        assert_eq!(request.query, "강남역");
        assert_eq!(search.tick(t0 + Duration::from_millis(900)), None);
        assert!(search.is_searching());
    }

    #[test]
    fn enter_flushes_a_pending_debounce() {
        let mut search = SearchBox::default();
        let t0 = Instant::now();
        search.set_text("시청", t0);
        assert!(search.debounce_pending());

        let Some(SearchBoxAction::Search(request)) = search.enter() else {
            panic!("expected an immediate search");
        };
        assert_eq!(request.query, "시청");
        assert!(!search.debounce_pending());
        assert_eq!(search.tick(t0 + DEBOUNCE), None);
    }

    #[test]
    fn blank_input_never_searches() {
        let mut search = SearchBox::default();
        let t0 = Instant::now();
        search.set_text("   ", t0);
        assert_eq!(search.tick(t0 + DEBOUNCE), None);
        assert_eq!(search.enter(), None);
    }

    #[test]
    fn suggestions_are_capped() {
        let names: Vec<String> = (0..15).map(|i| format!("place {i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let search = with_suggestions(&refs);
        assert_eq!(search.suggestions().len(), MAX_SUGGESTIONS);
        assert!(search.is_open());
    }

    #[test]
    fn highlight_wraps_both_ways() {
        let mut search = with_suggestions(&["a", "b", "c"]);
        search.move_highlight(-1);
        assert_eq!(search.highlighted(), Some(2));
        search.move_highlight(1);
        assert_eq!(search.highlighted(), Some(0));
        search.move_highlight(1);
        search.move_highlight(1);
        search.move_highlight(1);
        assert_eq!(search.highlighted(), Some(0));
    }

    #[test]
    fn enter_on_a_highlight_commits_it() {
        let mut search = with_suggestions(&["강남역 2호선", "강남역 신분당선"]);
        search.move_highlight(1);
        search.move_highlight(1);
        let Some(SearchBoxAction::Commit(place)) = search.enter() else {
            panic!("expected a commit");
        };
        assert_eq!(place.place_name, "강남역 신분당선");
        assert_eq!(search.text(), "강남역 신분당선");
        assert!(!search.is_open());
        assert!(!search.debounce_pending());
    }

    #[test]
    fn escape_dismisses() {
        let mut search = with_suggestions(&["a"]);
        search.move_highlight(1);
        search.dismiss();
        assert!(!search.is_open());
        assert_eq!(search.highlighted(), None);
    }

    #[test]
    fn older_answers_are_dropped() {
        let mut search = SearchBox::default();
        let t0 = Instant::now();
        search.set_text("강남", t0);
        let first = search.tick(t0 + DEBOUNCE).unwrap();
        search.set_text("강남역", t0 + DEBOUNCE);
        let second = search.enter();
        let Some(SearchBoxAction::Search(second)) = second else {
            panic!("expected a search");
        };

        assert!(!search.apply_results(first.seq, results(&["old"])));
        assert!(search.suggestions().is_empty());
        assert!(search.apply_results(second.seq, results(&["new"])));
        assert_eq!(search.suggestions()[0].place_name, "new");
    }

    #[test]
    fn clearing_the_input_invalidates_in_flight_searches() {
        let mut search = SearchBox::default();
        let t0 = Instant::now();
        search.set_text("강남", t0);
        let request = search.tick(t0 + DEBOUNCE).unwrap();
        search.set_text("", t0 + DEBOUNCE);
        assert!(!search.apply_results(request.seq, results(&["late"])));
        assert!(!search.is_open());
    }

    #[test]
    fn empty_answer_opens_the_empty_state() {
        let mut search = SearchBox::default();
        let t0 = Instant::now();
        search.set_text("zzzz", t0);
        let request = search.tick(t0 + DEBOUNCE).unwrap();
        assert!(search.apply_results(request.seq, Ok(SearchStatus::ZeroResult)));
        assert!(search.is_open());
        assert!(search.suggestions().is_empty());
    }

    #[test]
    fn failures_close_the_loading_state() {
        let mut search = SearchBox::default();
        let t0 = Instant::now();
        search.set_text("강남", t0);
        let request = search.tick(t0 + DEBOUNCE).unwrap();
        search.apply_results(request.seq, Err(AppError::api("kakao", 401, "wrong key")));
        assert!(!search.is_searching());
        assert!(search.suggestions().is_empty());
    }
}
