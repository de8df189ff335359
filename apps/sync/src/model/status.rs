use serde::{Deserialize, Serialize};

/// Server-side resume parsing status, classified from the raw backend string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParsingStatus {
    NotStarted,
    Parsing,
    Parsed,
    Failed,
    Error,
    /// Any status string this client does not recognise. Polled like `Parsing`.
    Unknown(String),
}

impl ParsingStatus {
    /// Classifies a raw status string. Never fails: unrecognised input is `Unknown`.
    pub fn classify(raw: &str) -> Self {
        let folded = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match folded.as_str() {
            "" | "not_started" | "pending" | "queued" | "none" => ParsingStatus::NotStarted,
            "parsing" | "processing" | "in_progress" | "started" | "running" => {
                ParsingStatus::Parsing
            }
            "parsed" | "completed" | "complete" | "success" | "succeeded" | "done" => {
                ParsingStatus::Parsed
            }
            "failed" | "failure" => ParsingStatus::Failed,
            "error" | "errored" => ParsingStatus::Error,
            _ => ParsingStatus::Unknown(raw.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ParsingStatus::Parsed | ParsingStatus::Failed | ParsingStatus::Error
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            ParsingStatus::NotStarted => "not-started",
            ParsingStatus::Parsing => "parsing",
            ParsingStatus::Parsed => "parsed",
            ParsingStatus::Failed => "failed",
            ParsingStatus::Error => "error",
            ParsingStatus::Unknown(_) => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_statuses() {
        assert_eq!(ParsingStatus::classify("parsing"), ParsingStatus::Parsing);
        assert_eq!(ParsingStatus::classify("PARSED"), ParsingStatus::Parsed);
        assert_eq!(ParsingStatus::classify(" failed "), ParsingStatus::Failed);
        assert_eq!(ParsingStatus::classify("error"), ParsingStatus::Error);
        assert_eq!(ParsingStatus::classify("not-started"), ParsingStatus::NotStarted);
        assert_eq!(ParsingStatus::classify("In Progress"), ParsingStatus::Parsing);
    }

    #[test]
    fn test_unknown_keeps_raw_string_and_is_not_terminal() {
        let status = ParsingStatus::classify("ocr_pending_review");
        assert_eq!(status, ParsingStatus::Unknown("ocr_pending_review".to_string()));
        assert!(!status.is_terminal());
        assert_eq!(status.as_str(), "unknown");
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(ParsingStatus::Parsed.is_terminal());
        assert!(ParsingStatus::Failed.is_terminal());
        assert!(ParsingStatus::Error.is_terminal());
        assert!(!ParsingStatus::Parsing.is_terminal());
        assert!(!ParsingStatus::NotStarted.is_terminal());
    }
}
