//! Caption track selection and `json3` transcript decoding.

use serde::{Deserialize, Serialize};

/// One time-aligned transcript line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start_seconds: f64,
    pub text: String,
}

/// Caption track advertised by the player response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub base_url: String,
    #[serde(default)]
    pub language_code: String,
    /// `"asr"` for auto-generated tracks
    #[serde(default)]
    pub kind: Option<String>,
}

impl CaptionTrack {
    pub fn is_auto_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

/// Prefer an authored English track, then any English track, then the first.
pub fn select_track<'a>(tracks: &'a [CaptionTrack], preferred: &str) -> Option<&'a CaptionTrack> {
    let matches_lang = |t: &&CaptionTrack| {
        t.language_code == preferred || t.language_code.starts_with(&format!("{preferred}-"))
    };
    tracks
        .iter()
        .filter(matches_lang)
        .find(|t| !t.is_auto_generated())
        .or_else(|| tracks.iter().find(matches_lang))
        .or_else(|| tracks.first())
}

#[derive(Debug, Deserialize)]
struct Json3Transcript {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Json3Event {
    #[serde(default)]
    t_start_ms: u64,
    #[serde(default)]
    segs: Option<Vec<Json3Seg>>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

/// Decode a `fmt=json3` caption body into ordered segments.
///
/// Events without text (window/styling events, bare newlines) are dropped.
pub fn parse_json3(body: &str) -> Result<Vec<TranscriptSegment>, serde_json::Error> {
    let parsed: Json3Transcript = serde_json::from_str(body)?;
    let mut segments: Vec<TranscriptSegment> = parsed
        .events
        .into_iter()
        .filter_map(|event| {
            let text: String = event
                .segs?
                .into_iter()
                .map(|s| s.utf8)
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            (!text.is_empty()).then(|| TranscriptSegment {
                start_seconds: event.t_start_ms as f64 / 1000.0,
                text,
            })
        })
        .collect();
    segments.sort_by(|a, b| a.start_seconds.total_cmp(&b.start_seconds));
    Ok(segments)
}

/// Plain text of a transcript, clipped to `max_chars` characters.
pub fn transcript_text(segments: &[TranscriptSegment], max_chars: usize) -> String {
    let joined = segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    if joined.chars().count() <= max_chars {
        joined
    } else {
        joined.chars().take(max_chars).collect()
    }
}

/// Transcript with `[m:ss]` markers, clipped to `max_chars` characters.
pub fn timestamped_text(segments: &[TranscriptSegment], max_chars: usize) -> String {
    let mut out = String::new();
    for segment in segments {
        let line = format!(
            "[{}] {}\n",
            format_clock(segment.start_seconds as u64),
            segment.text
        );
        if out.chars().count() + line.chars().count() > max_chars {
            break;
        }
        out.push_str(&line);
    }
    out.trim_end().to_string()
}

/// `m:ss`, or `h:mm:ss` past an hour.
pub fn format_clock(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}
