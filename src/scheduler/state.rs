use std::time::Instant;

use crate::color::ColorPolicy;
use crate::languages::Language;
use crate::settings::Settings;
use crate::translate::TranslationMode;

/// Explicit session record replacing ambient flags. The scheduler is the
/// only writer; collaborators read a snapshot under the shared lock.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub translating: bool,
    pub scrolling: bool,
    pub target_language: Language,
    pub mode: TranslationMode,
    pub font_size_multiplier: f32,
    pub spread_threshold: f32,
    pub color_policy: ColorPolicy,
    pub last_translation: Option<Instant>,
}

impl SessionState {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            translating: false,
            scrolling: false,
            target_language: settings.target_language,
            mode: settings.translation_mode,
            font_size_multiplier: settings.font_size_multiplier,
            spread_threshold: settings.spread_threshold,
            color_policy: settings.color_policy,
            last_translation: None,
        }
    }

    /// Stop semantics: every adjustable knob returns to its configured
    /// default.
    pub fn reset(&mut self, settings: &Settings) {
        *self = Self::from_settings(settings);
    }

    pub fn set_font_size_multiplier(&mut self, value: f32) {
        self.font_size_multiplier = value.clamp(0.5, 4.0);
    }

    pub fn set_spread_threshold(&mut self, value: f32) {
        self.spread_threshold = value.clamp(0.1, 0.9);
    }
}
