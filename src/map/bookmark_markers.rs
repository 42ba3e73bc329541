//! Star markers for the user's bookmarks.

use std::collections::HashMap;
use std::sync::Arc;

use crate::bookmarks::Bookmark;

use super::icons::MarkerIcon;
use super::widget::{
    MapWidget, MarkerHandle, MarkerSpec, PopupAction, PopupAnchor, PopupButton, PopupContent,
};

pub struct BookmarkMarkers {
    icon: Arc<MarkerIcon>,
    by_id: HashMap<String, (MarkerHandle, Bookmark)>,
    /// Ids in the order last rendered.
    rendered: Vec<String>,
    remove_label: String,
}

impl Default for BookmarkMarkers {
    fn default() -> Self {
        Self::new("Remove bookmark")
    }
}

impl BookmarkMarkers {
    pub fn new(remove_label: impl Into<String>) -> Self {
        Self {
            icon: Arc::new(MarkerIcon::bookmark()),
            by_id: HashMap::new(),
            rendered: Vec::new(),
            remove_label: remove_label.into(),
        }
    }

    pub fn set_remove_label(&mut self, label: impl Into<String>) {
        self.remove_label = label.into();
    }

    /// Replace the rendered set when the list of ids differs from the last one.
    /// Returns whether anything was redrawn.
    pub fn sync(&mut self, widget: &mut dyn MapWidget, bookmarks: &[Bookmark]) -> bool {
        let same = bookmarks.len() == self.rendered.len()
            && bookmarks.iter().zip(&self.rendered).all(|(b, id)| &b.id == id);
        if same {
            return false;
        }
        self.clear(widget);
        for bookmark in bookmarks {
            let handle = widget.add_marker(MarkerSpec {
                position: bookmark.position(),
                icon: Arc::clone(&self.icon),
                title: bookmark.name.clone(),
            });
            self.by_id.insert(bookmark.id.clone(), (handle, bookmark.clone()));
            self.rendered.push(bookmark.id.clone());
        }
        log::debug!("rendered {} bookmark markers", self.rendered.len());
        true
    }

    pub fn on_marker_clicked(&self, widget: &mut dyn MapWidget, handle: MarkerHandle) -> bool {
        let Some((_, bookmark)) = self.by_id.values().find(|(h, _)| *h == handle) else {
            return false;
        };
        widget.close_popup();
        widget.open_popup(PopupAnchor::Marker(handle), self.popup(bookmark));
        true
    }

    fn popup(&self, bookmark: &Bookmark) -> PopupContent {
        PopupContent {
            title: bookmark.name.clone(),
            link: None,
            lines: bookmark.address.iter().cloned().collect(),
            button: Some(PopupButton {
                label: self.remove_label.clone(),
                action: PopupAction::RemoveBookmark {
                    id: bookmark.id.clone(),
                },
            }),
        }
    }

    /// Close the popup if it belongs to the removed bookmark.
    pub fn on_removed(&self, widget: &mut dyn MapWidget, id: &str) {
        if let Some((handle, _)) = self.by_id.get(id) {
            if widget.popup_anchor() == Some(PopupAnchor::Marker(*handle)) {
                widget.close_popup();
            }
        }
    }

    pub fn handle_for(&self, id: &str) -> Option<MarkerHandle> {
        self.by_id.get(id).map(|(handle, _)| *handle)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn clear(&mut self, widget: &mut dyn MapWidget) {
        for (_, (handle, _)) in self.by_id.drain() {
            widget.remove_marker(handle);
        }
        self.rendered.clear();
    }

    pub fn teardown(&mut self, widget: &mut dyn MapWidget) {
        self.clear(widget);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::icons::IconShape;
    use crate::map::testing::RecordingWidget;

    fn bookmark(id: &str, lat: f64) -> Bookmark {
        Bookmark {
            id: id.to_string(),
            user_id: "u1".to_string(),
            name: format!("spot {id}"),
            address: Some("서울 중구".to_string()),
            lat,
            lng: 126.978,
            created_at: String::new(),
        }
    }

    #[test]
    fn one_star_per_bookmark() {
        let mut widget = RecordingWidget::default();
        let mut markers = BookmarkMarkers::default();
        let list = vec![bookmark("a", 37.56), bookmark("b", 37.57)];

        assert!(markers.sync(&mut widget, &list));
        assert_eq!(widget.marker_count(), 2);
        assert!(widget.markers.values().all(|m| m.icon.shape == IconShape::Star));

        // Same ids: no redraw.
        assert!(!markers.sync(&mut widget, &list));
        assert_eq!(widget.marker_count(), 2);
    }

    #[test]
    fn clicking_a_star_offers_removal() {
        let mut widget = RecordingWidget::default();
        let mut markers = BookmarkMarkers::new("삭제");
        markers.sync(&mut widget, &[bookmark("a", 37.56)]);
        let handle = markers.handle_for("a").unwrap();

        assert!(markers.on_marker_clicked(&mut widget, handle));
        let (_, content) = widget.popup.clone().unwrap();
        assert_eq!(content.title, "spot a");
        let button = content.button.unwrap();
        assert_eq!(button.label, "삭제");
        assert_eq!(button.action, PopupAction::RemoveBookmark { id: "a".into() });

        assert!(!markers.on_marker_clicked(&mut widget, MarkerHandle(999)));
    }

    #[test]
    fn removal_closes_its_popup_and_redraws() {
        let mut widget = RecordingWidget::default();
        let mut markers = BookmarkMarkers::default();
        let list = vec![bookmark("a", 37.56), bookmark("b", 37.57)];
        markers.sync(&mut widget, &list);
        let handle = markers.handle_for("a").unwrap();
        markers.on_marker_clicked(&mut widget, handle);

        markers.on_removed(&mut widget, "b");
        assert!(widget.popup.is_some());
        markers.on_removed(&mut widget, "a");
        assert!(widget.popup.is_none());

        assert!(markers.sync(&mut widget, &list[1..]));
        assert_eq!(widget.marker_count(), 1);
        assert!(markers.handle_for("a").is_none());
    }

    #[test]
    fn signing_out_removes_every_star() {
        let mut widget = RecordingWidget::default();
        let mut markers = BookmarkMarkers::default();
        markers.sync(&mut widget, &[bookmark("a", 37.56)]);
        assert!(markers.sync(&mut widget, &[]));
        assert_eq!(widget.marker_count(), 0);
        assert!(markers.is_empty());
    }
}
