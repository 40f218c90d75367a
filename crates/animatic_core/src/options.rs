//! Render options: quality, validation bounds and post-processing.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Render quality preset.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::EnumIter,
    derive_more::Display,
)]
pub enum RenderQuality {
    /// 854x480 at 15 fps.
    #[display("low")]
    #[serde(rename = "low")]
    Low,
    /// 1280x720 at 30 fps.
    #[default]
    #[display("medium")]
    #[serde(rename = "medium")]
    Medium,
    /// 1920x1080 at 60 fps.
    #[display("high")]
    #[serde(rename = "high")]
    High,
    /// 2560x1440 at 60 fps.
    #[display("production")]
    #[serde(rename = "production")]
    Production,
    /// 3840x2160 at 60 fps.
    #[display("4k")]
    #[serde(rename = "4k")]
    FourK,
}

impl RenderQuality {
    /// Config and CLI spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Production => "production",
            Self::FourK => "4k",
        }
    }

    /// Quality flag passed to the renderer.
    pub fn flag(&self) -> &'static str {
        match self {
            Self::Low => "-ql",
            Self::Medium => "-qm",
            Self::High => "-qh",
            Self::Production => "-qp",
            Self::FourK => "-qk",
        }
    }

    /// Default frame size as `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Low => (854, 480),
            Self::Medium => (1280, 720),
            Self::High => (1920, 1080),
            Self::Production => (2560, 1440),
            Self::FourK => (3840, 2160),
        }
    }

    /// Default frame rate.
    pub fn fps(&self) -> u32 {
        match self {
            Self::Low => 15,
            Self::Medium => 30,
            _ => 60,
        }
    }

    /// Directory the renderer names after this preset, e.g. `720p30`.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Low => "480p15",
            Self::Medium => "720p30",
            Self::High => "1080p60",
            Self::Production => "1440p60",
            Self::FourK => "2160p60",
        }
    }
}

impl std::str::FromStr for RenderQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" | "l" => Ok(Self::Low),
            "medium" | "m" => Ok(Self::Medium),
            "high" | "h" => Ok(Self::High),
            "production" | "p" => Ok(Self::Production),
            "4k" | "k" => Ok(Self::FourK),
            _ => Err(format!("Unknown render quality: {}", s)),
        }
    }
}

/// Corner a watermark is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "kebab-case")]
pub enum WatermarkPosition {
    /// Top left.
    #[display("top-left")]
    TopLeft,
    /// Top right.
    #[display("top-right")]
    TopRight,
    /// Bottom left.
    #[display("bottom-left")]
    BottomLeft,
    /// Bottom right.
    #[default]
    #[display("bottom-right")]
    BottomRight,
}

/// Text watermark burned into the final video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
#[serde(default)]
pub struct WatermarkOptions {
    text: String,
    position: WatermarkPosition,
    opacity: f64,
    font_size: u32,
    margin: u32,
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        Self {
            text: "animatic".to_string(),
            position: WatermarkPosition::default(),
            opacity: 0.6,
            font_size: 24,
            margin: 16,
        }
    }
}

impl WatermarkOptions {
    /// Watermark with the given text and default styling.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Place the watermark in a corner.
    pub fn with_position(mut self, position: WatermarkPosition) -> Self {
        self.position = position;
        self
    }

    /// ffmpeg `drawtext` filter expression for this watermark.
    pub fn drawtext_filter(&self) -> String {
        let m = self.margin;
        let (x, y) = match self.position {
            WatermarkPosition::TopLeft => (format!("{m}"), format!("{m}")),
            WatermarkPosition::TopRight => (format!("w-tw-{m}"), format!("{m}")),
            WatermarkPosition::BottomLeft => (format!("{m}"), format!("h-th-{m}")),
            WatermarkPosition::BottomRight => (format!("w-tw-{m}"), format!("h-th-{m}")),
        };
        let opacity = self.opacity.clamp(0.0, 1.0);
        format!(
            "drawtext=text='{}':fontcolor=white@{:.2}:fontsize={}:x={}:y={}",
            escape_drawtext(&self.text),
            opacity,
            self.font_size,
            x,
            y
        )
    }
}

fn escape_drawtext(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | ':' | '\'' | '%') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Options for one render attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, derive_builder::Builder)]
#[builder(default, setter(into))]
#[serde(default)]
pub struct RenderOptions {
    /// Quality preset.
    quality: RenderQuality,
    /// Width override.
    width: Option<u32>,
    /// Height override.
    height: Option<u32>,
    /// Frame rate override.
    fps: Option<u32>,
    /// Shortest acceptable video.
    min_duration_secs: f64,
    /// Longest acceptable video.
    max_duration_secs: f64,
    /// Allowed drift between expected and probed duration after speed change.
    duration_tolerance_secs: f64,
    /// Playback speed multiplier applied after rendering.
    speed: Option<f64>,
    /// Watermark to burn in.
    watermark: Option<WatermarkOptions>,
    /// Layout helper source inserted after the script's imports.
    layout_preamble: Option<String>,
    /// Scene class to render when the script defines several.
    scene_name: Option<String>,
    /// Local directory finished videos are written to.
    output_dir: PathBuf,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            quality: RenderQuality::default(),
            width: None,
            height: None,
            fps: None,
            min_duration_secs: 1.0,
            max_duration_secs: 600.0,
            duration_tolerance_secs: 0.5,
            speed: None,
            watermark: None,
            layout_preamble: None,
            scene_name: None,
            output_dir: PathBuf::from("renders"),
        }
    }
}

impl RenderOptions {
    /// Start a builder.
    pub fn builder() -> RenderOptionsBuilder {
        RenderOptionsBuilder::default()
    }

    /// Effective `(width, height, fps)`, overrides first.
    pub fn resolution(&self) -> (u32, u32, u32) {
        let (w, h) = self.quality.dimensions();
        (
            self.width.unwrap_or(w),
            self.height.unwrap_or(h),
            self.fps.unwrap_or_else(|| self.quality.fps()),
        )
    }

    /// Same options at a different quality preset.
    pub fn with_quality(mut self, quality: RenderQuality) -> Self {
        self.quality = quality;
        self
    }

    /// Same options with a different watermark, or none.
    pub fn with_watermark(mut self, watermark: Option<WatermarkOptions>) -> Self {
        self.watermark = watermark;
        self
    }

    /// Same options with a playback speed multiplier.
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    /// Same options writing finished videos somewhere else.
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    /// Speed multiplier when it actually changes playback.
    pub fn speed_factor(&self) -> Option<f64> {
        self.speed
            .filter(|s| s.is_finite() && *s > 0.0 && (*s - 1.0).abs() > f64::EPSILON)
    }
}
