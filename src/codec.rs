//! Result codec — the batch report is the only state that survives a
//! request, and it lives inside the rendered Discord message.
//!
//! ```text
//!   embed.description      embed.footer.text
//!   <key> - 🟢             1
//!   <key> - 🔴 reason      0
//! ```
//!
//! Decoding sees nothing but those two strings. It counts credentials
//! from the bitmap and recovers each one as a fixed-length prefix of its
//! line, so it is only correct when every credential in the batch has
//! the exact length the batch command enforces at input time
//! ([`crate::commands::BATCH_KEY_LEN`]). A shorter or longer credential
//! comes back truncated or padded with the line's tail.

use crate::prober::{obfuscate_key, ProbeResult, ProbeStatus};

pub const AVAILABLE_GLYPH: &str = "🟢";
pub const UNAVAILABLE_GLYPH: &str = "🔴";

// ── Report ──────────────────────────────────────────────────────────

/// Rendered batch result: visible lines plus the side-channel bitmap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedReport {
    pub body: String,
    pub bitmap: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEntry {
    pub credential: String,
    pub was_available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("no prior report in message")]
    NoPriorState,
    #[error("bitmap contains {0:?}")]
    MalformedBitmap(char),
    #[error("bitmap has {expected} entries but body has {found} lines")]
    LineCountMismatch { expected: usize, found: usize },
}

/// Reason shown after the glyph on a batch line.
pub fn batch_reason(status: &ProbeStatus) -> String {
    match status {
        ProbeStatus::Valid => String::new(),
        ProbeStatus::InvalidCredential => "Invalid API Key".into(),
        ProbeStatus::QuotaExceeded => "Exceeded quota".into(),
        ProbeStatus::RateLimited => "Server Error - 429".into(),
        // One line per credential: a multi-line message would shift
        // every line after it.
        ProbeStatus::OtherError(message) => message.replace(['\r', '\n'], " "),
    }
}

pub fn encode(results: &[ProbeResult]) -> EncodedReport {
    let body = results
        .iter()
        .map(|r| {
            let glyph = if r.status.is_valid() { AVAILABLE_GLYPH } else { UNAVAILABLE_GLYPH };
            format!("{} - {} {}", r.credential, glyph, batch_reason(&r.status))
        })
        .collect::<Vec<_>>()
        .join("\n");
    let bitmap = results
        .iter()
        .map(|r| if r.status.is_valid() { '1' } else { '0' })
        .collect();
    EncodedReport { body, bitmap }
}

/// Recover `(credential, was_available)` pairs from a rendered report.
///
/// `credential_len` must be the exact length every credential in the
/// batch had; see the module docs.
pub fn decode(
    body: Option<&str>,
    bitmap: Option<&str>,
    credential_len: usize,
) -> Result<Vec<DecodedEntry>, DecodeError> {
    let bitmap = bitmap.map(str::trim).filter(|b| !b.is_empty()).ok_or(DecodeError::NoPriorState)?;
    let body = body.filter(|b| !b.trim().is_empty()).ok_or(DecodeError::NoPriorState)?;

    let flags = bitmap
        .chars()
        .map(|c| match c {
            '1' => Ok(true),
            '0' => Ok(false),
            other => Err(DecodeError::MalformedBitmap(other)),
        })
        .collect::<Result<Vec<bool>, _>>()?;

    let lines: Vec<&str> = body.split('\n').collect();
    if lines.len() < flags.len() {
        return Err(DecodeError::LineCountMismatch { expected: flags.len(), found: lines.len() });
    }

    Ok(lines
        .into_iter()
        .zip(flags)
        .map(|(line, was_available)| DecodedEntry {
            credential: line.chars().take(credential_len).collect(),
            was_available,
        })
        .collect())
}

pub fn available_credentials(entries: &[DecodedEntry]) -> Vec<String> {
    entries
        .iter()
        .filter(|e| e.was_available)
        .map(|e| e.credential.clone())
        .collect()
}

// ── Batch Input ─────────────────────────────────────────────────────

/// Split a pasted batch on `,`, newline, or the two characters `\n`.
///
/// Surrounding whitespace is trimmed and empty entries dropped.
pub fn split_batch(raw: &str) -> Vec<String> {
    raw.replace("\\n", "\n")
        .split([',', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchInputError {
    #[error("no keys provided")]
    Empty,
    #[error("every key must be exactly {expected} characters")]
    LengthMismatch { expected: usize, offending: Vec<String> },
}

/// Reject batches the decoder could not reconstruct.
pub fn validate_batch(credentials: &[String], expected_len: usize) -> Result<(), BatchInputError> {
    if credentials.is_empty() {
        return Err(BatchInputError::Empty);
    }
    let offending: Vec<String> = credentials
        .iter()
        .filter(|c| c.chars().count() != expected_len)
        .map(|c| obfuscate_key(c))
        .collect();
    if offending.is_empty() {
        Ok(())
    } else {
        Err(BatchInputError::LengthMismatch { expected: expected_len, offending })
    }
}
