//! Deterministic artifact base filenames: `{keyword}_{company}_{lastname}[_{n}YOE]`.

use std::sync::LazyLock;

use regex::Regex;

use crate::document::profile::ContactProfile;

pub const DEFAULT_COMPANY: &str = "TargetCompany";
pub const DEFAULT_RESUME_KEYWORD: &str = "Resume";
pub const DEFAULT_COVER_LETTER_KEYWORD: &str = "CoverLetter";

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W+").unwrap());
static UNSAFE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w.\-]+").unwrap());

/// Resume filename base, e.g. `AI_Engineer_Acme_Lovelace_4YOE`.
pub fn resume_base_filename(
    keyword: Option<&str>,
    company: Option<&str>,
    contact: &ContactProfile,
    years_of_experience: Option<u32>,
) -> String {
    let yoe = years_of_experience
        .map(|n| n.to_string())
        .unwrap_or_else(|| "X".to_string());
    sanitize(&format!(
        "{}_{}_{}_{}YOE",
        keyword_or(keyword, DEFAULT_RESUME_KEYWORD),
        company_part(company),
        contact.last_name().unwrap_or("Resume"),
        yoe
    ))
}

/// Cover letter filename base, e.g. `CoverLetter_Acme_Lovelace`.
pub fn cover_letter_base_filename(
    keyword: Option<&str>,
    company: Option<&str>,
    contact: &ContactProfile,
) -> String {
    sanitize(&format!(
        "{}_{}_{}",
        keyword_or(keyword, DEFAULT_COVER_LETTER_KEYWORD),
        company_part(company),
        contact.last_name().unwrap_or("CL")
    ))
}

fn keyword_or<'a>(keyword: Option<&'a str>, default: &'a str) -> &'a str {
    keyword.map(str::trim).filter(|k| !k.is_empty()).unwrap_or(default)
}

/// Company names lose their punctuation and spaces entirely: `Acme, Inc.` → `AcmeInc`.
fn company_part(company: Option<&str>) -> String {
    let stripped = company
        .map(|c| NON_WORD.replace_all(c, "").into_owned())
        .unwrap_or_default();
    if stripped.is_empty() {
        DEFAULT_COMPANY.to_string()
    } else {
        stripped
    }
}

fn sanitize(name: &str) -> String {
    UNSAFE_RUN.replace_all(name, "_").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::profile::sample_profile;

    #[test]
    fn test_resume_filename_pattern() {
        let contact = sample_profile().contact;
        assert_eq!(
            resume_base_filename(Some("AI Engineer"), Some("Acme, Inc."), &contact, Some(4)),
            "AI_Engineer_AcmeInc_Lovelace_4YOE"
        );
    }

    #[test]
    fn test_resume_filename_defaults() {
        let mut contact = sample_profile().contact;
        contact.name = String::new();
        assert_eq!(
            resume_base_filename(None, Some("  "), &contact, None),
            "Resume_TargetCompany_Resume_XYOE"
        );
    }

    #[test]
    fn test_cover_letter_filename() {
        let contact = sample_profile().contact;
        assert_eq!(
            cover_letter_base_filename(None, Some("Globex Corp"), &contact),
            "CoverLetter_GlobexCorp_Lovelace"
        );
    }

    #[test]
    fn test_unsafe_characters_collapse_to_one_underscore() {
        let contact = sample_profile().contact;
        assert_eq!(
            cover_letter_base_filename(Some("ML / Data  Sr."), None, &contact),
            "ML_Data_Sr._TargetCompany_Lovelace"
        );
    }

    #[test]
    fn test_naming_is_deterministic() {
        let contact = sample_profile().contact;
        let a = resume_base_filename(Some("AI"), Some("Acme"), &contact, Some(3));
        let b = resume_base_filename(Some("AI"), Some("Acme"), &contact, Some(3));
        assert_eq!(a, b);
    }
}
