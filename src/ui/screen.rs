use std::time::Instant;

use ratatui::Frame;

use crate::{App, AppState};

/// A UI Screen boundary: responsible for rendering one app state
pub trait Screen {
    fn render(&self, app: &App, f: &mut Frame, now: Instant);
}

/// Bottle, slots and the permission prompt
pub struct BottleScreen;

impl Screen for BottleScreen {
    fn render(&self, app: &App, f: &mut Frame, now: Instant) {
        let area = f.area();
        app.render_bottle(area, f.buffer_mut(), now);
    }
}

/// Full text of one revealed story
pub struct StoryScreen {
    pub story_index: usize,
}

impl Screen for StoryScreen {
    fn render(&self, app: &App, f: &mut Frame, _now: Instant) {
        let area = f.area();
        app.render_story(self.story_index, area, f.buffer_mut());
    }
}

pub struct FootprintsScreen;

impl Screen for FootprintsScreen {
    fn render(&self, app: &App, f: &mut Frame, _now: Instant) {
        let area = f.area();
        app.render_footprints(area, f.buffer_mut());
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: &AppState) -> Box<dyn Screen> {
    match state {
        AppState::Bottle => Box::new(BottleScreen),
        AppState::Story(story_index) => Box::new(StoryScreen {
            story_index: *story_index,
        }),
        AppState::Footprints => Box::new(FootprintsScreen),
    }
}
