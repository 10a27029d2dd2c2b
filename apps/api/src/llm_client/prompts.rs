// Shared prompt fragments.
// Each feature that talks to the model defines its own prompts.rs alongside it.

/// Appended to every system directive that expects a JSON object back.
pub const JSON_ONLY_RULES: &str = "You MUST respond with a single valid JSON object only. \
    Do NOT include any text before or after the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations, commentary, or apologies.";
