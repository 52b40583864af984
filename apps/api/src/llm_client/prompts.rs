// Prompt constants for text-generation calls.
// Placeholders are `{name}` tokens, filled in one pass before sending.

/// Critique + outreach prompt. The output format block must stay in sync with
/// `critique::extractor::KNOWN_HEADERS`.
pub const CRITIQUE_PROMPT_TEMPLATE: &str = r#"You are an experienced career coach and copywriter. Produce three outputs for one job application and follow every rule below.

---
PERSONALIZATION DATA (use exactly as given):
- Company Name: {company_name}
- Job Title: {job_title}
- Candidate's Name: {candidate_name}
---

RULES FOR ALL TASKS:
1. Always use the exact Company Name ("{company_name}"). Never write "the company" or "your company".
2. Never use bracketed placeholders such as [Hiring Manager Name]. Omit anything you do not know.

Task 1: Resume Critique
- Give a score, pros, cons, suggestions, and a final verdict.
- Markdown is allowed here; use "-" or "*" for list items.

Task 2: Email to the Hiring Manager
- PLAIN TEXT ONLY. No markdown.
- Open with "Dear Hiring Manager," and name the Job Title and Company Name in the first sentence.
- Tie the candidate's experience to the requirements and sign off as {candidate_name}.

Task 3: LinkedIn Connection Request
- PLAIN TEXT ONLY. No markdown.
- Open with "Hello," and mention the Company Name and the Job Title.

---
CONTEXT:
- Candidate's Master Profile: {master_profile}
- Candidate's Tailored Resume Summary: {resume_summary}
- Key Job Requirements: {job_requirements}
- ATS Keywords: {ats_keywords}
---

OUTPUT FORMAT (strict, in this order):

SCORE: <number>/100

PROS:
- ...

CONS:
- ...

SUGGESTIONS:
- ...

FINAL_VERDICT:
...

HIRING_MANAGER_EMAIL:
...

CONNECTION_REQUEST:
...
"#;
