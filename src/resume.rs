//! Resume parsing collaborator: accepts PDF/DOCX uploads, salvages whatever
//! text it can and pulls candidate contact details out of it. Extraction is
//! best-effort by contract; a garbled file degrades to an empty profile and
//! the caller prompts for the missing fields. Parsing never blocks a session
//! from starting.

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::models::CandidateProfile;

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Error)]
pub enum ResumeError {
    #[error("unsupported file type '{0}'; please upload a PDF or DOCX file")]
    UnsupportedFormat(String),
}

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("email regex")
});

static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\+?1?[-.\s]?)?(\(?[0-9]{3}\)?[-.\s]?)?[0-9]{3}[-.\s]?[0-9]{4}")
        .expect("phone regex")
});

static NAME_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z\s]+$").expect("name line regex"));

/// Parses an uploaded resume. Only PDF and DOCX mime types are accepted;
/// anything else fails with `UnsupportedFormat` and no other effect.
pub fn parse(bytes: &[u8], mime_type: &str) -> Result<CandidateProfile, ResumeError> {
    let text = match mime_type {
        PDF_MIME | DOCX_MIME => extract_text(bytes),
        other => return Err(ResumeError::UnsupportedFormat(other.to_string())),
    };

    if text.is_empty() {
        warn!("Resume text extraction produced no usable text; fields will need manual entry");
    }

    Ok(extract_contact_info(&text))
}

/// Best-effort text recovery: decodes the bytes lossily and keeps the lines
/// that look like prose (at least four alphanumeric characters). Binary or
/// compressed payloads fall through to an empty string rather than an error.
fn extract_text(bytes: &[u8]) -> String {
    let decoded = String::from_utf8_lossy(bytes);

    let mut cleaned = String::with_capacity(decoded.len());
    for c in decoded.chars() {
        if c == '\t' || !c.is_control() {
            cleaned.push(c);
        } else {
            cleaned.push('\n');
        }
    }

    let lines: Vec<&str> = cleaned
        .lines()
        .map(str::trim)
        .filter(|line| line.chars().filter(|c| c.is_alphanumeric()).count() >= 4)
        .collect();

    lines.join("\n")
}

/// Pulls name/email/phone out of resume text: first email and phone match
/// win; the name is guessed from the first few lines (a short line of 2+
/// alphabetic words).
pub fn extract_contact_info(text: &str) -> CandidateProfile {
    let email = EMAIL_RE
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    let phone = PHONE_RE
        .find(text)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();

    let mut name = String::new();
    for line in text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(5)
    {
        if line.len() > 3
            && line.len() < 50
            && NAME_LINE_RE.is_match(line)
            && line.split(' ').count() >= 2
        {
            name = line.to_string();
            break;
        }
    }

    CandidateProfile {
        name,
        email,
        phone,
        resume_text: text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Jane Doe\n\
        Senior Platform Engineer\n\
        jane.doe@example.com | (415) 555-0164\n\
        Experience: eight years building distributed systems.";

    #[test]
    fn rejects_unsupported_mime_types() {
        let err = parse(b"plain text", "text/plain").unwrap_err();
        assert!(matches!(err, ResumeError::UnsupportedFormat(ref mime) if mime == "text/plain"));
    }

    #[test]
    fn accepts_pdf_and_docx_mime_types() {
        assert!(parse(SAMPLE.as_bytes(), PDF_MIME).is_ok());
        assert!(parse(SAMPLE.as_bytes(), DOCX_MIME).is_ok());
    }

    #[test]
    fn extracts_name_email_and_phone() {
        let profile = extract_contact_info(SAMPLE);
        assert_eq!(profile.name, "Jane Doe");
        assert_eq!(profile.email, "jane.doe@example.com");
        assert_eq!(profile.phone, "(415) 555-0164");
        assert!(profile.resume_text.contains("distributed systems"));
    }

    #[test]
    fn name_guess_skips_non_name_lines() {
        let text = "resume-2024.pdf\nJohn Quincy Adams\njqa@example.com";
        let profile = extract_contact_info(text);
        assert_eq!(profile.name, "John Quincy Adams");
    }

    #[test]
    fn missing_fields_stay_empty() {
        let profile = extract_contact_info("x1 y2 z3 unstructured blob 99");
        assert!(profile.name.is_empty());
        assert!(profile.email.is_empty());
    }

    #[test]
    fn binary_garbage_degrades_to_empty_profile() {
        let bytes: Vec<u8> = (0u8..=255).cycle().take(2048).collect();
        let profile = parse(&bytes, PDF_MIME).unwrap();
        assert!(profile.name.is_empty());
        assert!(profile.email.is_empty());
    }
}
