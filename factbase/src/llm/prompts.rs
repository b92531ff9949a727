//! Prompt templates for the conflict classifier and update extraction.
//!
//! These templates use basic `format!()` interpolation for type safety.
//! Missing variables will cause compile-time errors.

/// System prompt for the conflict classifier.
pub const CONFLICT_SYSTEM_PROMPT: &str = "You maintain a business knowledge base. \
You decide how a newly reported fact relates to existing facts about the same topic. \
You answer with a single JSON object and nothing else.";

/// System prompt for update extraction.
pub const EXTRACTION_SYSTEM_PROMPT: &str = "You read conversations between a business owner \
and an assistant and detect when the owner reports a change to a business fact. \
You answer with a single JSON object and nothing else.";

/// Generate a prompt asking the classifier how a candidate fact relates to a
/// group of existing facts.
///
/// # Arguments
/// * `candidate` - Text of the newly reported fact
/// * `reason` - Why the candidate was proposed (may be empty)
/// * `existing` - `(id, text, similarity)` for each existing group member
///
/// # Example
/// ```
/// use factbase::llm::prompts::conflict_resolution_prompt;
///
/// let prompt = conflict_resolution_prompt(
///     "We now open at 8am on weekdays",
///     "owner said hours changed",
///     &[("mem_1", "We open at 9am on weekdays", 0.93)],
/// );
/// assert!(prompt.contains("8am"));
/// assert!(prompt.contains("mem_1"));
/// ```
pub fn conflict_resolution_prompt(
    candidate: &str,
    reason: &str,
    existing: &[(&str, &str, f32)],
) -> String {
    let existing_list = existing
        .iter()
        .map(|(id, text, similarity)| format!("- [{id}] (similarity {similarity:.2}) {text}"))
        .collect::<Vec<_>>()
        .join("\n");

    let reason = if reason.trim().is_empty() {
        "not given"
    } else {
        reason
    };

    format!(
        r#"A new fact was reported for a business. Existing facts on the same topic are listed below.

New fact: {candidate}
Reported because: {reason}

Existing facts:
{existing_list}

Choose exactly one action:
- "merge": the new fact and the existing facts are complementary; write one combined fact in "merged_text" that keeps every still-valid detail
- "replace": the new fact supersedes the existing facts (a change, correction, or newer value)
- "keep_both": the facts are about different things and can both be true
- "reject": the new fact adds nothing beyond the existing facts

Confidence is a score from 0.0 to 1.0 for how sure you are.

Respond with valid JSON only. Example format:
{{"action": "replace", "merged_text": null, "reason": "opening hour changed from 9am to 8am", "confidence": 0.92}}"#
    )
}

/// Generate a prompt asking for at most one fact update in a conversation.
///
/// # Example
/// ```
/// use factbase::llm::prompts::update_extraction_prompt;
///
/// let prompt = update_extraction_prompt("Owner: our hours changed, we close at 6 now");
/// assert!(prompt.contains("close at 6"));
/// ```
pub fn update_extraction_prompt(conversation: &str) -> String {
    format!(
        r#"Read the conversation below. If the business owner reports a change or a new fact about their business
(hours, address, phone, prices, services, policies), extract it as one self-contained statement.

Conversation:
{conversation}

Entry types: "knowledge" (general business facts), "faq" (question and answer pairs), "example" (sample replies), "document" (policy text).

Respond with valid JSON only. If there is an update:
{{"text": "The bakery now closes at 6pm on weekdays", "type": "knowledge", "reason": "owner said closing time changed", "confidence": 0.9}}
If there is no update:
{{"update": null}}"#
    )
}
