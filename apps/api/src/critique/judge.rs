//! Resume judge — one generation call that produces a critique of a tailored
//! resume plus two outreach messages, parsed with the section extractor.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::critique::extractor::{extract_critique, Critique};
use crate::llm_client::prompts::CRITIQUE_PROMPT_TEMPLATE;
use crate::llm_client::{LlmError, TextGenerator};

const JUDGE_TEMPERATURE: f32 = 0.3;
const JUDGE_MAX_OUTPUT_TOKENS: u32 = 2500;
const FALLBACK_COMPANY: &str = "the company";

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{(\w+)\}").unwrap());

#[derive(Debug, Clone, Deserialize)]
pub struct JudgeRequest {
    /// e.g. "Machine Learning Engineer at Acme Robotics"
    pub job_title: String,
    #[serde(default)]
    pub job_requirements: Vec<String>,
    #[serde(default)]
    pub ats_keywords: Vec<String>,
    pub resume_summary: String,
    #[serde(default)]
    pub master_profile: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JudgeOutcome {
    pub critique: Critique,
    /// Unparsed model output, kept so callers can show what the extractor missed.
    pub raw_response: Option<String>,
}

pub async fn judge_resume(
    llm: &dyn TextGenerator,
    candidate_name: &str,
    request: &JudgeRequest,
) -> Result<JudgeOutcome, LlmError> {
    let company_name = infer_company_name(&request.job_title);
    info!(
        "Judging resume for '{}' (company: {})",
        request.job_title, company_name
    );

    let prompt = build_critique_prompt(candidate_name, &company_name, request);
    let raw_response = llm
        .generate(&prompt, JUDGE_TEMPERATURE, JUDGE_MAX_OUTPUT_TOKENS)
        .await?
        .filter(|text| !text.trim().is_empty());

    let critique = raw_response
        .as_deref()
        .map(extract_critique)
        .unwrap_or_default();
    if critique.is_empty() {
        warn!("Judge response yielded no critique sections");
    }

    Ok(JudgeOutcome {
        critique,
        raw_response,
    })
}

/// Text after the last " at " (any case), title-cased; otherwise "the company".
pub fn infer_company_name(job_title: &str) -> String {
    let lowered = job_title.to_ascii_lowercase();
    match lowered.rfind(" at ") {
        Some(index) => {
            let company = job_title[index + 4..].trim();
            if company.is_empty() {
                FALLBACK_COMPANY.to_string()
            } else {
                title_case(company)
            }
        }
        None => FALLBACK_COMPANY.to_string(),
    }
}

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_alpha = false;
    for c in text.chars() {
        if previous_alpha {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        previous_alpha = c.is_alphabetic();
    }
    out
}

pub fn build_critique_prompt(candidate_name: &str, company_name: &str, request: &JudgeRequest) -> String {
    let master_profile = request
        .master_profile
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or("Not provided");

    let job_requirements = request.job_requirements.join("\n");
    let ats_keywords = request.ats_keywords.join(", ");

    // Single pass, so filled-in values are never rescanned for placeholders.
    PLACEHOLDER
        .replace_all(CRITIQUE_PROMPT_TEMPLATE, |caps: &Captures| {
            let value: &str = match &caps[1] {
                "company_name" => company_name,
                "job_title" => &request.job_title,
                "candidate_name" => candidate_name,
                "master_profile" => master_profile,
                "resume_summary" => &request.resume_summary,
                "job_requirements" => &job_requirements,
                "ats_keywords" => &ats_keywords,
                _ => return caps[0].to_string(),
            };
            value.to_string()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeGenerator;

    fn request() -> JudgeRequest {
        JudgeRequest {
            job_title: "ML Engineer at acme robotics".to_string(),
            job_requirements: vec!["Python".to_string(), "Retrieval".to_string()],
            ats_keywords: vec!["RAG".to_string(), "PyTorch".to_string()],
            resume_summary: "Builds retrieval systems.".to_string(),
            master_profile: None,
        }
    }

    #[test]
    fn test_infer_company_name() {
        assert_eq!(infer_company_name("ML Engineer at acme robotics"), "Acme Robotics");
        assert_eq!(infer_company_name("Engineer AT globex"), "Globex");
        assert_eq!(infer_company_name("Data at Scale Lead at initech"), "Initech");
        assert_eq!(infer_company_name("Staff Engineer"), "the company");
        assert_eq!(infer_company_name("Engineer at "), "the company");
    }

    #[test]
    fn test_prompt_fills_every_placeholder() {
        let prompt = build_critique_prompt("Ada Q. Lovelace", "Acme Robotics", &request());
        for placeholder in [
            "{company_name}",
            "{job_title}",
            "{candidate_name}",
            "{master_profile}",
            "{resume_summary}",
            "{job_requirements}",
            "{ats_keywords}",
        ] {
            assert!(!prompt.contains(placeholder), "{placeholder} left in prompt");
        }
        assert!(prompt.contains("Company Name: Acme Robotics"));
        assert!(prompt.contains("Python\nRetrieval"));
        assert!(prompt.contains("RAG, PyTorch"));
        assert!(prompt.contains("Master Profile: Not provided"));
    }

    #[test]
    fn test_placeholder_text_in_inputs_is_not_substituted() {
        let mut req = request();
        req.resume_summary = "Knows {ats_keywords} and {candidate_name}.".to_string();
        req.job_requirements = vec!["Uses {company_name}".to_string()];
        let prompt = build_critique_prompt("Ada Q. Lovelace", "Acme Robotics", &req);
        assert!(prompt.contains("Knows {ats_keywords} and {candidate_name}."));
        assert!(prompt.contains("Uses {company_name}"));
        assert!(prompt.contains("Company Name: Acme Robotics"));
    }

    #[tokio::test]
    async fn test_judge_parses_response() {
        let llm = FakeGenerator::replying(
            "## SCORE: 87/100\n\nPROS:\n- Strong retrieval work\n\nCONS:\n* Thin on MLOps\n\nFINAL_VERDICT:\nGood fit.\n\nHIRING_MANAGER_EMAIL:\nDear Hiring Manager,\n\nHello.\n\nCONNECTION_REQUEST:\nHello, let's connect.",
        );
        let outcome = judge_resume(&llm, "Ada", &request()).await.unwrap();

        assert_eq!(outcome.critique.score, Some(87.0));
        assert_eq!(outcome.critique.pros, vec!["Strong retrieval work"]);
        assert_eq!(outcome.critique.cons, vec!["Thin on MLOps"]);
        assert_eq!(
            outcome.critique.email_to_hiring_manager.as_deref(),
            Some("Dear Hiring Manager,\n\nHello.")
        );
        assert!(outcome.raw_response.is_some());

        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].1, 0.3);
        assert_eq!(prompts[0].2, 2500);
    }

    #[tokio::test]
    async fn test_empty_response_is_all_absent_critique() {
        let outcome = judge_resume(&FakeGenerator::silent(), "Ada", &request())
            .await
            .unwrap();
        assert_eq!(outcome.critique, Critique::default());
        assert!(outcome.raw_response.is_none());
    }

    #[tokio::test]
    async fn test_generation_failure_propagates() {
        let result = judge_resume(&FakeGenerator::failing(500), "Ada", &request()).await;
        assert!(matches!(result, Err(LlmError::Api { status: 500, .. })));
    }
}
