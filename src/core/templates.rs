//! Prompt templates for the lore assistant

/// System prompt for the campaign lore assistant
pub const LORE_SYSTEM_PROMPT: &str = r#"
You are an expert worldbuilding assistant for tabletop RPG game masters.

When answering questions:
1. Use ONLY the provided source excerpts and the campaign's working document
2. Stay consistent with the campaign's established setting and tone
3. If the provided material doesn't contain enough information, say so clearly
4. Answer in clean Markdown suitable for a campaign sourcebook

If asked about something not covered by the provided material, clearly state
that it is not part of the campaign's sources.
"#;

/// Header placed before retrieved source excerpts
pub const EXCERPTS_HEADER: &str = "--- RELEVANT SOURCE EXCERPTS ---";

/// Header placed before the live working document
pub const DOCUMENT_HEADER: &str = "--- CURRENT WORKING DOCUMENT ---";

/// Build the canonize prompt: integrate a lore selection into an
/// existing document and return the full updated Markdown.
pub fn build_canonize_prompt(selection: &str, full_response: &str, document_content: &str) -> String {
    format!(
        r#"You are a professional RPG sourcebook editor.
You have access to custom Homebrewery-style markdown blocks for formatting:
- Monster/NPC Stat Block: {{{{monster,frame ... }}}}
- Note Box: {{{{note ... }}}}
- Descriptive Box: {{{{descriptive ... }}}}
- Tables: standard Markdown tables.

Your task is to seamlessly integrate a specific "Lore Selection" into an existing campaign document.

--- EXISTING DOCUMENT ---
{document_content}

--- LORE SELECTION TO INTEGRATE ---
{selection}

--- CONTEXT (Full AI Brainstorming Response) ---
{full_response}

INSTRUCTIONS:
1. Integrate the Lore Selection into the Existing Document.
2. You may APPEND it to the end OR SPLICE it into a relevant section if one exists.
3. Ensure the transition is natural and reads like a professional sourcebook.
4. Remove redundant headers or introductory phrases.
5. DO NOT change the existing lore, only add the new selection and fix the flow.
6. Return ONLY the full, updated Markdown content of the document. No explanations."#
    )
}

/// Strip a wrapping ```markdown code fence from a generated document.
pub fn strip_markdown_fence(text: &str) -> String {
    let trimmed = text.trim();
    let without_open = trimmed
        .strip_prefix("```markdown\n")
        .or_else(|| trimmed.strip_prefix("```\n"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim_end()
        .to_string()
}
