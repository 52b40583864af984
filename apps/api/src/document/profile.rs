//! Fixed candidate data: contact record, education history, project links.
//!
//! Loaded once at startup from a JSON file and shared read-only.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("failed to read candidate profile at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("candidate profile JSON is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A labelled external link (LinkedIn, GitHub, portfolio).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactLink {
    pub text: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactProfile {
    pub name: String,
    #[serde(default)]
    pub street_address: String,
    #[serde(default)]
    pub city_state_zip: String,
    /// Short location shown on the cover letter, e.g. "Virginia US".
    #[serde(default)]
    pub location: Option<String>,
    pub phone: String,
    pub email: String,
    pub linkedin: ContactLink,
    pub github: ContactLink,
    pub portfolio: ContactLink,
    /// Free-text line under the name. Built from location, email, and phone when absent.
    #[serde(default)]
    pub contact_line: Option<String>,
}

impl ContactProfile {
    pub fn contact_line(&self) -> String {
        if let Some(line) = self.contact_line.as_deref().filter(|l| !l.trim().is_empty()) {
            return line.to_string();
        }
        let location = self.location();
        [location.as_deref(), Some(self.email.as_str()), Some(self.phone.as_str())]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" | ")
    }

    /// Explicit location, else the first `|` field of an explicit contact line,
    /// else the mailing address.
    pub fn location(&self) -> Option<String> {
        if let Some(location) = self.location.as_deref().filter(|l| !l.trim().is_empty()) {
            return Some(location.trim().to_string());
        }
        if let Some(line) = self.contact_line.as_deref().filter(|l| l.contains('|')) {
            let first = line.split('|').next().unwrap_or_default().trim();
            if !first.is_empty() {
                return Some(first.to_string());
            }
        }
        self.mailing_address()
    }

    /// `street_address, city_state_zip`, skipping whichever is blank.
    pub fn mailing_address(&self) -> Option<String> {
        let parts: Vec<&str> = [self.street_address.trim(), self.city_state_zip.trim()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect();
        (!parts.is_empty()).then(|| parts.join(", "))
    }

    pub fn last_name(&self) -> Option<&str> {
        self.name.split_whitespace().last()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EducationRecord {
    pub degree: String,
    pub institution: String,
    pub dates: String,
}

/// Everything about the candidate that does not come from the generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub contact: ContactProfile,
    #[serde(default)]
    pub education: Vec<EducationRecord>,
    /// Project title → hyperlink target. Titles not listed render unlinked.
    #[serde(default)]
    pub project_links: BTreeMap<String, String>,
}

impl CandidateProfile {
    pub fn from_json(json: &str) -> Result<Self, ProfileError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let json = std::fs::read_to_string(path).map_err(|source| ProfileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
pub(crate) fn sample_profile() -> CandidateProfile {
    CandidateProfile::from_json(
        r#"{
            "contact": {
                "name": "Ada Q. Lovelace",
                "city_state_zip": "Arlington, VA 22201",
                "location": "Virginia US",
                "phone": "+1 (555) 010-2000",
                "email": "ada@example.com",
                "linkedin": {"text": "LinkedIn Profile", "url": "https://www.linkedin.com/in/ada/"},
                "github": {"text": "GitHub Portfolio", "url": "https://github.com/ada"},
                "portfolio": {"text": "Personal Portfolio", "url": "https://ada.example.com/"}
            },
            "education": [
                {"degree": "Master of Science in Computer Science", "institution": "Example University", "dates": "August 2023 - May 2025"}
            ],
            "project_links": {
                "Intelligent Building Code QA": "https://codes.example.com/"
            }
        }"#,
    )
    .unwrap()
}
