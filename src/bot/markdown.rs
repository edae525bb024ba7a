//! MarkdownV2 message texts for the Telegram bot.
//!
//! Everything that comes from outside (titles, uploader names, error
//! messages) goes through [`escape_md`] before being interpolated.

use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;

use crate::engine::VideoInfo;
use crate::queue::QueueStatus;

static URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)https?://\S+").expect("valid regex"));

const MD_SPECIAL: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!', '\\',
];

/// Progress never reaches 100 until the download has actually finished.
pub const PROGRESS_CEILING: u8 = 95;

pub fn escape_md(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        if MD_SPECIAL.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// First http(s) URL in a message, if any.
pub fn extract_url(text: &str) -> Option<&str> {
    URL.find(text).map(|m| m.as_str())
}

pub fn progress_bar(percent: u8) -> String {
    let percent = percent.min(100);
    let filled = usize::from(percent / 10);
    format!("{}{} {percent}%", "▓".repeat(filled), "░".repeat(10 - filled))
}

/// Advance the simulated progress: fast at first, slowing down, capped at
/// [`PROGRESS_CEILING`].
pub fn next_progress<R: Rng + ?Sized>(current: u8, rng: &mut R) -> u8 {
    let step = match current {
        0..=29 => rng.gen_range(3..=10),
        30..=59 => rng.gen_range(2..=6),
        60..=84 => rng.gen_range(1..=3),
        _ => 1,
    };
    current.saturating_add(step).min(PROGRESS_CEILING)
}

pub const START: &str = "🔮 *SAVE SYSTEM ONLINE*\n\n\
Send a link\\. I will acquire the media\\.\n\n\
_Compatible with YouTube, Instagram, TikTok, X, and others\\._\n\n\
cmds:\n\
/help — Protocol info\n\
/status — System load";

pub fn help(max_upload_mb: u64) -> String {
    format!(
        "📋 *PROTOCOL*\n\n\
1\\. Transmit URL\n\
2\\. Processing\\.\\.\\.\n\
3\\. Receive File\n\n\
*PARAMETERS:*\n\
• Max Size: {max_upload_mb}MB\n\
• Queue: Active\n\n\
_Execute\\._"
    )
}

pub const SUPPORTED: &str = "📡 *TARGETS*\n\n\
\\[\\+\\] YouTube\n\
\\[\\+\\] Instagram\n\
\\[\\+\\] TikTok\n\
\\[\\+\\] X \\(Twitter\\)\n\
\\[\\+\\] Reddit\n\
\\[\\+\\] Threads\n\n\
_Universal extractor active\\._";

pub const NO_LINK: &str = "⚡ *NO LINK DETECTED*\n\nTransmit a valid URL to begin operation\\.";

pub const RESOLVING: &str = "📡 _RESOLVING RESOURCE\\.\\.\\._";

pub const SEND_FAILED: &str = "❌ TRANSMISSION ERROR\\. Format invalid or size limit reached\\.";

pub fn status(queue: &QueueStatus) -> String {
    format!(
        "⚙️ *SYSTEM STATUS*\n\n\
Processing: {}\n\
Pending: {}\n\
Capacity: {}\n\n\
_Online\\._",
        queue.active, queue.waiting, queue.capacity
    )
}

fn header(info: &VideoInfo) -> String {
    format!(
        "📼 *{}*\n👤 {} • ⏱ {}",
        escape_md(&info.title),
        escape_md(&info.uploader),
        escape_md(&info.duration_string)
    )
}

/// Status text while the download is queued or running. `queue_position`
/// is shown only when the job had to wait behind others.
pub fn acquiring(info: &VideoInfo, percent: u8, queue_position: Option<usize>) -> String {
    let queue = queue_position
        .map(|position| format!("\n⏳ _QUEUE POSITION: {position}_"))
        .unwrap_or_default();
    format!("{}\n\n⬇️ ACQUIRING\\.\\.\\.{queue}\n{}", header(info), progress_bar(percent))
}

pub fn complete(info: &VideoInfo) -> String {
    format!(
        "{}\n\n✅ ACQUISITION COMPLETE\n{}\n\n_Transmitting\\.\\.\\._",
        header(info),
        progress_bar(100)
    )
}

pub fn too_large(info: &VideoInfo, size_mb: f64, max_mb: u64) -> String {
    format!(
        "⚠️ *FILE SIZE EXCEEDED* \\({}MB\\)\n\n📼 _{}_\n⏱ {}\n\n\
_System cannot transmit files over {max_mb}MB via Telegram protocol\\._",
        escape_md(&format!("{size_mb:.1}")),
        escape_md(&info.title),
        escape_md(&info.duration_string)
    )
}

pub fn caption(info: &VideoInfo) -> String {
    format!(
        "📼 *{}*\n👤 {}\n⏱ {}",
        escape_md(&info.title),
        escape_md(&info.uploader),
        escape_md(&info.duration_string)
    )
}

pub fn failed(error: &str) -> String {
    let error = if error.trim().is_empty() { "Unknown system error" } else { error };
    format!(
        "❌ *ACQUISITION FAILED*\n\n_{}_\n\n💡 _Verify URL or check /supported_",
        escape_md(error)
    )
}

/// Plain fallback used when the status message can no longer be edited.
pub fn failed_reply(error: &str) -> String {
    format!("❌ ACQUISITION FAILED\n\n{}", escape_md(error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn info(title: &str) -> VideoInfo {
        let json = format!(r#"{{"title":{},"uploader":"a_b","duration":61}}"#, serde_json::json!(title));
        VideoInfo::from_json(&json, "https://example.com").unwrap()
    }

    #[test]
    fn test_escape_md() {
        assert_eq!(escape_md("hello"), "hello");
        assert_eq!(escape_md("a.b-c!"), "a\\.b\\-c\\!");
        assert_eq!(escape_md("[x](y)"), "\\[x\\]\\(y\\)");
        assert_eq!(escape_md("1_2*3~4`5>6#7+8=9|{}"), "1\\_2\\*3\\~4\\`5\\>6\\#7\\+8\\=9\\|\\{\\}");
        assert_eq!(escape_md("c:\\dir"), "c:\\\\dir");
    }

    #[test]
    fn test_extract_url() {
        assert_eq!(
            extract_url("look https://youtu.be/abc?t=1 and http://x.y"),
            Some("https://youtu.be/abc?t=1")
        );
        assert_eq!(extract_url("HTTPS://EXAMPLE.COM/v"), Some("HTTPS://EXAMPLE.COM/v"));
        assert_eq!(extract_url("no links here"), None);
        assert_eq!(extract_url("ftp://example.com"), None);
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0), "░░░░░░░░░░ 0%");
        assert_eq!(progress_bar(45), "▓▓▓▓░░░░░░ 45%");
        assert_eq!(progress_bar(100), "▓▓▓▓▓▓▓▓▓▓ 100%");
        assert_eq!(progress_bar(250), "▓▓▓▓▓▓▓▓▓▓ 100%");
    }

    #[test]
    fn test_progress_is_monotonic_and_capped() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut percent = 0;
        for _ in 0..200 {
            let next = next_progress(percent, &mut rng);
            assert!(next >= percent);
            assert!(next <= PROGRESS_CEILING);
            percent = next;
        }
        assert_eq!(percent, PROGRESS_CEILING);
    }

    #[test]
    fn test_templates_escape_media_fields() {
        let video = info("Best.Of (2024)!");

        let text = acquiring(&video, 0, Some(3));
        assert!(text.starts_with("📼 *Best\\.Of \\(2024\\)\\!*\n👤 a\\_b • ⏱ 1:01"));
        assert!(text.contains("QUEUE POSITION: 3"));
        assert!(!acquiring(&video, 0, None).contains("QUEUE POSITION"));

        assert!(too_large(&video, 61.24, 50).contains("\\(61\\.2MB\\)"));
        assert!(failed("yt-dlp failed: 404.").contains("yt\\-dlp failed: 404\\."));
        assert!(failed("").contains("Unknown system error"));
    }
}
