use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use overlay_translator_rust::geom::RectF;
use overlay_translator_rust::{
    capture, group_nearby_text, load_settings, logging, should_skip_translation, ColorAnalyzer,
    ColorPolicy, GeminiTranslate, GoogleTranslate, Language, LogNotifier, NullSink,
    OverlayRenderer, RecognizedLine, RetryPolicy, TranslationMode, TranslationService,
};

#[derive(Parser, Debug)]
#[command(
    name = "overlay-translator-rust",
    version,
    about = "Cluster recognized image text, infer overlay colors and translate it"
)]
struct Cli {
    /// Image file the recognition lines were produced from
    #[arg(short = 'd', long = "image")]
    image: PathBuf,

    /// JSON file of recognized lines: [{"text", "bounding_box": [[x,y]x4]}]
    #[arg(short = 'o', long = "lines")]
    lines: PathBuf,

    /// Target language (th, en, ja, ko, zh)
    #[arg(short = 'l', long = "lang")]
    lang: Option<String>,

    /// Translation mode (direct, enhanced)
    #[arg(short = 'm', long = "mode")]
    mode: Option<String>,

    /// Cluster spread threshold (0.1-0.9)
    #[arg(long = "spread-threshold")]
    spread_threshold: Option<f32>,

    /// Font size multiplier (0.5-4.0)
    #[arg(long = "font-scale")]
    font_scale: Option<f32>,

    /// Color inference policy (sampled, perimeter)
    #[arg(long = "color-policy")]
    color_policy: Option<String>,

    /// Batched translation API key; omit for a dry run keeping original text
    #[arg(short = 'k', long = "key")]
    key: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let settings_path = cli.read_settings.as_deref().map(Path::new);
    let mut settings = load_settings(settings_path)?;

    if let Some(lang) = cli.lang.as_deref() {
        settings.target_language = Language::parse(lang)
            .ok_or_else(|| anyhow!("unknown target language '{}'", lang))?;
    }
    if let Some(mode) = cli.mode.as_deref() {
        settings.translation_mode = TranslationMode::parse(mode)
            .ok_or_else(|| anyhow!("unknown translation mode '{}'", mode))?;
    }
    if let Some(threshold) = cli.spread_threshold {
        settings.spread_threshold = threshold.clamp(0.1, 0.9);
    }
    if let Some(scale) = cli.font_scale {
        settings.font_size_multiplier = scale.clamp(0.5, 4.0);
    }
    if let Some(policy) = cli.color_policy.as_deref() {
        settings.color_policy =
            ColorPolicy::parse(policy).ok_or_else(|| anyhow!("unknown color policy '{}'", policy))?;
    }

    let pixels = image::open(&cli.image)
        .with_context(|| format!("failed to open image: {}", cli.image.display()))?
        .to_rgba8();
    let (width, height) = (pixels.width() as f32, pixels.height() as f32);
    let lines: Vec<RecognizedLine> = serde_json::from_str(
        &fs::read_to_string(&cli.lines)
            .with_context(|| format!("failed to read lines: {}", cli.lines.display()))?,
    )
    .with_context(|| "failed to parse recognition lines JSON")?;

    let fragments = capture::fragments_from_lines(lines);
    let groups = group_nearby_text(&fragments, width, settings.spread_threshold);

    let translations = cli
        .key
        .clone()
        .or_else(|| settings.resolve_translate_key())
        .map(|key| {
            let enhanced_key = settings.resolve_enhanced_key().unwrap_or_default();
            TranslationService::new(
                Arc::new(GoogleTranslate::new(key)),
                Arc::new(GeminiTranslate::new(enhanced_key).with_model(&settings.enhanced_model)),
                RetryPolicy::new(settings.retry_attempts, settings.retry_backoff),
                Arc::new(LogNotifier),
            )
        });

    let analyzer = ColorAnalyzer::new(settings.color_policy);
    let renderer = OverlayRenderer::new(Arc::new(NullSink));
    let image_id = cli.image.display().to_string();
    renderer.begin_image(&image_id, RectF::new(0.0, 0.0, width, height));

    for (index, group) in groups.iter().enumerate() {
        let text = group.text();
        if should_skip_translation(&text) {
            continue;
        }
        let colors = analyzer.analyze(&pixels, group.bounds);
        let translated = match &translations {
            Some(service) => {
                service
                    .translate(&text, settings.target_language, settings.translation_mode)
                    .await
            }
            None => text.clone(),
        };
        renderer.place_box(
            &image_id,
            index,
            group.bounds,
            1.0,
            colors,
            &translated,
            settings.font_size_multiplier,
            width,
        );
    }

    let output = serde_json::to_string_pretty(&renderer.snapshot())
        .with_context(|| "failed to serialize overlay output")?;
    println!("{}", output);
    Ok(())
}
