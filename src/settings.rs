use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::color::ColorPolicy;
use crate::languages::Language;
use crate::translate::TranslationMode;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub target_language: Language,
    pub translation_mode: TranslationMode,
    pub retry_attempts: usize,
    pub retry_backoff: Duration,
    pub translate_key: Option<String>,
    pub enhanced_key: Option<String>,
    pub enhanced_model: String,
    pub font_size_multiplier: f32,
    pub spread_threshold: f32,
    pub color_policy: ColorPolicy,
    pub viewport_buffer: f32,
    pub tall_image_buffer_scale: f32,
    pub min_image_size: f32,
    pub min_translation_interval: Duration,
    pub scroll_debounce: Duration,
    pub scroll_clear_delay: Duration,
    pub scroll_displacement: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target_language: Language::Th,
            translation_mode: TranslationMode::Direct,
            retry_attempts: 3,
            retry_backoff: Duration::from_millis(1000),
            translate_key: None,
            enhanced_key: None,
            enhanced_model: "gemini-1.5-flash".to_string(),
            font_size_multiplier: 1.0,
            spread_threshold: 0.61,
            color_policy: ColorPolicy::Sampled,
            viewport_buffer: 100.0,
            tall_image_buffer_scale: 5.0,
            min_image_size: 100.0,
            min_translation_interval: Duration::from_millis(95),
            scroll_debounce: Duration::from_millis(200),
            scroll_clear_delay: Duration::from_millis(280),
            scroll_displacement: 180.0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    translation: Option<TranslationSettings>,
    overlay: Option<OverlaySettings>,
    scheduler: Option<SchedulerSettings>,
    scroll: Option<ScrollSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct TranslationSettings {
    language: Option<String>,
    mode: Option<String>,
    retry_attempts: Option<usize>,
    retry_backoff_ms: Option<u64>,
    translate_key: Option<String>,
    enhanced_key: Option<String>,
    enhanced_model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OverlaySettings {
    font_size_multiplier: Option<f32>,
    spread_threshold: Option<f32>,
    color_policy: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SchedulerSettings {
    viewport_buffer: Option<f32>,
    tall_image_buffer_scale: Option<f32>,
    min_image_size: Option<f32>,
    min_translation_interval_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ScrollSettings {
    debounce_ms: Option<u64>,
    clear_delay_ms: Option<u64>,
    displacement_threshold: Option<f32>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    ensure_home_settings_file()?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(translation) = incoming.translation {
            if let Some(code) = translation.language
                && let Some(language) = Language::parse(&code)
            {
                self.target_language = language;
            }
            if let Some(mode) = translation.mode
                && let Some(mode) = TranslationMode::parse(&mode)
            {
                self.translation_mode = mode;
            }
            if let Some(attempts) = translation.retry_attempts {
                if attempts > 0 {
                    self.retry_attempts = attempts;
                }
            }
            if let Some(backoff) = translation.retry_backoff_ms {
                self.retry_backoff = Duration::from_millis(backoff);
            }
            if let Some(key) = translation.translate_key {
                if !key.trim().is_empty() {
                    self.translate_key = Some(key);
                }
            }
            if let Some(key) = translation.enhanced_key {
                if !key.trim().is_empty() {
                    self.enhanced_key = Some(key);
                }
            }
            if let Some(model) = translation.enhanced_model {
                if !model.trim().is_empty() {
                    self.enhanced_model = model;
                }
            }
        }
        if let Some(overlay) = incoming.overlay {
            if let Some(multiplier) = overlay.font_size_multiplier {
                self.font_size_multiplier = multiplier.clamp(0.5, 4.0);
            }
            if let Some(threshold) = overlay.spread_threshold {
                self.spread_threshold = threshold.clamp(0.1, 0.9);
            }
            if let Some(policy) = overlay.color_policy
                && let Some(policy) = ColorPolicy::parse(&policy)
            {
                self.color_policy = policy;
            }
        }
        if let Some(scheduler) = incoming.scheduler {
            if let Some(buffer) = scheduler.viewport_buffer {
                if buffer >= 0.0 {
                    self.viewport_buffer = buffer;
                }
            }
            if let Some(scale) = scheduler.tall_image_buffer_scale {
                if scale >= 1.0 {
                    self.tall_image_buffer_scale = scale;
                }
            }
            if let Some(size) = scheduler.min_image_size {
                if size >= 0.0 {
                    self.min_image_size = size;
                }
            }
            if let Some(interval) = scheduler.min_translation_interval_ms {
                self.min_translation_interval = Duration::from_millis(interval);
            }
        }
        if let Some(scroll) = incoming.scroll {
            if let Some(debounce) = scroll.debounce_ms {
                self.scroll_debounce = Duration::from_millis(debounce);
            }
            if let Some(delay) = scroll.clear_delay_ms {
                self.scroll_clear_delay = Duration::from_millis(delay);
            }
            if let Some(threshold) = scroll.displacement_threshold {
                if threshold >= 0.0 {
                    self.scroll_displacement = threshold;
                }
            }
        }
    }

    /// API key for the batched endpoint, settings first then environment.
    pub fn resolve_translate_key(&self) -> Option<String> {
        self.translate_key
            .clone()
            .or_else(|| get_env("OVERLAY_TRANSLATE_KEY"))
    }

    /// API key for the enhanced endpoint, settings first then environment.
    pub fn resolve_enhanced_key(&self) -> Option<String> {
        self.enhanced_key
            .clone()
            .or_else(|| get_env("OVERLAY_ENHANCED_KEY"))
    }
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".overlay-translator-rust"))
        }
    })
}

fn get_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::with_temp_home;

    #[test]
    fn defaults_match_the_embedded_file() {
        with_temp_home(|_| {
            let settings = load_settings(None).unwrap();
            assert_eq!(settings.target_language, Language::Th);
            assert_eq!(settings.translation_mode, TranslationMode::Direct);
            assert_eq!(settings.spread_threshold, 0.61);
            assert_eq!(settings.scroll_displacement, 180.0);
        });
    }

    #[test]
    fn later_layers_override_earlier_ones() {
        with_temp_home(|dir| {
            let extra = dir.join("extra.toml");
            fs::write(
                &extra,
                "[translation]\nlanguage = \"ja\"\nmode = \"enhanced\"\n\n[overlay]\nspread_threshold = 0.4\n",
            )
            .unwrap();
            let settings = load_settings(Some(&extra)).unwrap();
            assert_eq!(settings.target_language, Language::Ja);
            assert_eq!(settings.translation_mode, TranslationMode::Enhanced);
            assert_eq!(settings.spread_threshold, 0.4);
        });
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        with_temp_home(|dir| {
            let extra = dir.join("extra.toml");
            fs::write(
                &extra,
                "[overlay]\nfont_size_multiplier = 9.0\nspread_threshold = 0.01\n",
            )
            .unwrap();
            let settings = load_settings(Some(&extra)).unwrap();
            assert_eq!(settings.font_size_multiplier, 4.0);
            assert_eq!(settings.spread_threshold, 0.1);
        });
    }

    #[test]
    fn missing_extra_path_is_an_error() {
        with_temp_home(|dir| {
            let missing = dir.join("nope.toml");
            assert!(load_settings(Some(&missing)).is_err());
        });
    }
}
