//! Prompt text sent to the model and the fences used around section content.

use scholarbot_llm::SectionExtraction;

/// Wrap `body` in named section fences.
pub fn fence_section(name: &str, body: &str) -> String {
    format!("[begin section '{name}']\n{body}\n[end section '{name}']")
}

/// Wrap a paper's title and abstract as its placeholder note.
pub fn article_note(title: &str, abstract_text: &str) -> String {
    format!("[begin Article]\n{title}\n\n{abstract_text}\n[end Article]")
}

/// The scoped note asking the model to screen one section against the question.
pub fn section_prompt(name: &str, text: &str, question: &str) -> String {
    let section = fence_section(name, text);
    let example = SectionExtraction::example_json();
    format!(
        "{section}
Extract information from section '{name}' above that is relevant to the question:

[begin question]
{question}
[end question]

Reply with a single JSON object and nothing else. It must have exactly two fields:
- \"summary\": a concise paragraph with the information from section '{name}' that is relevant to the question (empty string if there is none)
- \"relevant\": false if section '{name}' does NOT contain ANY information relevant to the question, true otherwise

Example reply:
{example}"
    )
}
