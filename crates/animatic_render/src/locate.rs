//! Locating the rendered file in the sandbox.

use animatic_core::RenderOptions;

/// Likely output paths for a scene, most specific first.
///
/// The renderer names its output directory after the frame height and rate
/// (`720p30`), and nests it under the scene file's stem. Quality presets and
/// explicit overrides can disagree, so both spellings are tried.
pub fn candidate_paths(media_dir: &str, file_stem: &str, scene_name: &str, options: &RenderOptions) -> Vec<String> {
    let (_, height, fps) = options.resolution();
    let resolved = format!("{}p{}", height, fps);
    let preset = options.quality().dir_name().to_string();

    let mut candidates = Vec::new();
    for dir in [resolved, preset] {
        for path in [
            format!("{}/videos/{}/{}/{}.mp4", media_dir, file_stem, dir, scene_name),
            format!("{}/videos/{}/{}.mp4", media_dir, dir, scene_name),
        ] {
            if !candidates.contains(&path) {
                candidates.push(path);
            }
        }
    }
    candidates
}

/// Pick the rendered video from a directory listing.
///
/// Partial segment files are ignored. A file named after the scene wins;
/// otherwise the first remaining video in path order.
pub fn select_from_listing(files: &[String], scene_name: &str) -> Option<String> {
    let target = format!("{}.mp4", scene_name);
    let mut videos: Vec<&String> = files
        .iter()
        .filter(|f| f.ends_with(".mp4") && !f.contains("partial_movie_files"))
        .collect();
    videos.sort();

    videos
        .iter()
        .find(|f| f.rsplit('/').next() == Some(target.as_str()))
        .or_else(|| videos.first())
        .map(|f| f.to_string())
}
