//! ffprobe parsing and video bounds checks.

use serde::Deserialize;

/// What ffprobe reported about a video.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoProbe {
    /// Container duration
    pub duration_secs: f64,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
}

#[derive(Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Deserialize)]
struct ProbeOut {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

/// Parse `ffprobe -print_format json -show_streams -show_format` output.
///
/// # Errors
///
/// Returns a message when the JSON is invalid or no video stream with a
/// frame size is present.
pub fn parse_ffprobe_json(raw: &str) -> Result<VideoProbe, String> {
    let parsed: ProbeOut =
        serde_json::from_str(raw).map_err(|e| format!("ffprobe json parse failed: {}", e))?;
    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| "no video stream found".to_string())?;
    let width = video
        .width
        .ok_or_else(|| "missing video width from ffprobe".to_string())?;
    let height = video
        .height
        .ok_or_else(|| "missing video height from ffprobe".to_string())?;
    let duration_secs = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or(video.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(VideoProbe {
        duration_secs,
        width,
        height,
    })
}

/// Check a duration against inclusive bounds.
pub fn check_duration(duration_secs: f64, min_secs: f64, max_secs: f64) -> Result<(), String> {
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return Err("Rendered video has no duration".to_string());
    }
    if duration_secs < min_secs {
        return Err(format!(
            "Rendered video is {:.2}s, shorter than the minimum {:.2}s",
            duration_secs, min_secs
        ));
    }
    if duration_secs > max_secs {
        return Err(format!(
            "Rendered video is {:.2}s, longer than the maximum {:.2}s",
            duration_secs, max_secs
        ));
    }
    Ok(())
}

/// Check frame size, allowing one pixel of rounding either way.
pub fn check_dimensions(probe: &VideoProbe, expected_width: u32, expected_height: u32) -> Result<(), String> {
    let off = |actual: u32, expected: u32| actual.abs_diff(expected) > 1;
    if off(probe.width, expected_width) || off(probe.height, expected_height) {
        return Err(format!(
            "Rendered video is {}x{}, expected {}x{}",
            probe.width, probe.height, expected_width, expected_height
        ));
    }
    Ok(())
}
