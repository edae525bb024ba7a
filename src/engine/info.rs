//! Media metadata as reported by `yt-dlp --dump-json`.

use serde::{Deserialize, Serialize};

/// A directly playable mp4 rendition (video and audio in one file).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoFormat {
    pub format_id: String,
    pub ext: String,
    pub resolution: String,
    pub filesize: Option<u64>,
    pub url: String,
    pub vcodec: String,
    pub acodec: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub duration: f64,
    pub duration_string: String,
    pub uploader: String,
    pub view_count: u64,
    pub webpage_url: String,
    pub extractor: String,
    pub filesize_approx: Option<u64>,
    pub formats: Vec<VideoFormat>,
    pub best_url: Option<String>,
}

// yt-dlp leaves fields out or nulls them depending on the site, so every
// field is optional here and defaults are applied in `VideoInfo::from_raw`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawInfo {
    id: Option<String>,
    title: Option<String>,
    description: Option<String>,
    thumbnail: Option<String>,
    duration: Option<f64>,
    duration_string: Option<String>,
    uploader: Option<String>,
    channel: Option<String>,
    view_count: Option<u64>,
    webpage_url: Option<String>,
    extractor: Option<String>,
    filesize: Option<f64>,
    filesize_approx: Option<f64>,
    formats: Option<Vec<RawFormat>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFormat {
    format_id: Option<String>,
    ext: Option<String>,
    resolution: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    filesize: Option<f64>,
    filesize_approx: Option<f64>,
    url: Option<String>,
    vcodec: Option<String>,
    acodec: Option<String>,
}

impl RawFormat {
    fn is_muxed_mp4(&self) -> bool {
        self.ext.as_deref() == Some("mp4")
            && self.vcodec.as_deref() != Some("none")
            && self.acodec.as_deref() != Some("none")
    }

    fn into_format(self) -> VideoFormat {
        let resolution = non_empty(self.resolution).unwrap_or_else(|| match (self.width, self.height) {
            (Some(w), Some(h)) => format!("{w}x{h}"),
            _ => "unknown".to_string(),
        });

        VideoFormat {
            format_id: self.format_id.unwrap_or_default(),
            ext: self.ext.unwrap_or_default(),
            resolution,
            filesize: positive(self.filesize).or(positive(self.filesize_approx)),
            url: self.url.unwrap_or_default(),
            vcodec: self.vcodec.unwrap_or_default(),
            acodec: self.acodec.unwrap_or_default(),
        }
    }
}

impl VideoInfo {
    /// Parse the JSON printed by `--dump-json`. `requested_url` is used when
    /// the extractor does not report a canonical page URL.
    pub fn from_json(json: &str, requested_url: &str) -> Result<Self, serde_json::Error> {
        let raw: RawInfo = serde_json::from_str(json)?;
        Ok(Self::from_raw(raw, requested_url))
    }

    pub(crate) fn from_raw(raw: RawInfo, requested_url: &str) -> Self {
        let formats: Vec<VideoFormat> = raw
            .formats
            .unwrap_or_default()
            .into_iter()
            .filter(RawFormat::is_muxed_mp4)
            .map(RawFormat::into_format)
            .collect();

        // yt-dlp lists formats worst to best.
        let best = formats.last();
        let best_url = best.map(|f| f.url.clone()).filter(|u| !u.is_empty());
        let filesize_approx = positive(raw.filesize_approx)
            .or(positive(raw.filesize))
            .or(best.and_then(|f| f.filesize));

        let duration = raw.duration.filter(|d| *d > 0.0).unwrap_or(0.0);

        Self {
            id: raw.id.unwrap_or_default(),
            title: non_empty(raw.title).unwrap_or_else(|| "Untitled".to_string()),
            description: raw.description.unwrap_or_default(),
            thumbnail: raw.thumbnail.unwrap_or_default(),
            duration,
            duration_string: non_empty(raw.duration_string)
                .unwrap_or_else(|| format_duration(duration)),
            uploader: non_empty(raw.uploader)
                .or(non_empty(raw.channel))
                .unwrap_or_else(|| "Unknown".to_string()),
            view_count: raw.view_count.unwrap_or(0),
            webpage_url: non_empty(raw.webpage_url).unwrap_or_else(|| requested_url.to_string()),
            extractor: non_empty(raw.extractor).unwrap_or_else(|| "unknown".to_string()),
            filesize_approx,
            formats,
            best_url,
        }
    }
}

/// Render seconds as `M:SS`, or `H:MM:SS` from one hour up.
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let hrs = total / 3600;
    let mins = (total % 3600) / 60;
    let secs = total % 60;

    if hrs > 0 {
        format!("{hrs}:{mins:02}:{secs:02}")
    } else {
        format!("{mins}:{secs:02}")
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn positive(value: Option<f64>) -> Option<u64> {
    value.filter(|v| v.is_finite() && *v > 0.0).map(|v| v as u64)
}
