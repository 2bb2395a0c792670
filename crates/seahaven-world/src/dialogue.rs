//! Total parser for multi-speaker dialogue text.
//!
//! Each non-blank line of the form `speaker: text` starts a new turn. A line
//! without a speaker prefix continues the previous turn (joined with a space);
//! unprefixed text before the first prefixed line is attributed to the
//! caller's default speaker. The parser never fails: any input yields a
//! possibly empty sequence of `(speaker, text)` pairs.

/// Longest string accepted as a speaker name before the colon.
const MAX_SPEAKER_LEN: usize = 40;

/// One parsed dialogue line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueLine {
    /// Who is speaking.
    pub speaker: String,
    /// What they say.
    pub text: String,
}

/// Split `text` into speaker-attributed lines.
pub fn parse_dialogue(text: &str, default_speaker: &str) -> Vec<DialogueLine> {
    let mut lines: Vec<DialogueLine> = Vec::new();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some((speaker, body)) = split_speaker(line) {
            lines.push(DialogueLine {
                speaker: speaker.to_owned(),
                text: body.to_owned(),
            });
            continue;
        }

        match lines.last_mut() {
            Some(last) => {
                if !last.text.is_empty() {
                    last.text.push(' ');
                }
                last.text.push_str(line);
            }
            None => lines.push(DialogueLine {
                speaker: default_speaker.to_owned(),
                text: line.to_owned(),
            }),
        }
    }

    lines.retain(|l| !l.text.is_empty());
    lines
}

/// Split a `speaker: text` line. Returns `None` when the prefix does not
/// look like a name (empty, too long, or containing sentence punctuation).
fn split_speaker(line: &str) -> Option<(&str, &str)> {
    let (speaker, body) = line.split_once(':')?;
    let speaker = speaker.trim().trim_matches('*').trim();
    if speaker.is_empty() || speaker.len() > MAX_SPEAKER_LEN {
        return None;
    }
    if speaker
        .chars()
        .any(|c| matches!(c, '.' | '!' | '?' | ',' | '"'))
    {
        return None;
    }
    Some((speaker, body.trim()))
}
