//! Deterministic rendering of a persona into a role-play prompt.
//!
//! Pure string assembly: same persona and question in, same prompt pair out.
//! Absent persona sections are simply left out of the system prompt.

use crate::persona::{Persona, TraitValue};

const PREAMBLE: &str = "You are role-playing as a specific person with the following characteristics:";

const CLOSING: &str = "Respond to the following question as this person would, considering their\n\
values, preferences, and decision-making style. Be authentic and specific.\n\
Explain your reasoning naturally as this person would.";

/// Render a persona and a question into a `(system_prompt, user_prompt)` pair.
///
/// The user prompt is the question text verbatim; all persona context goes
/// into the system prompt.
pub fn build_persona_prompt(persona: &Persona, question_text: &str) -> (String, String) {
    let mut lines: Vec<String> = vec![
        PREAMBLE.to_string(),
        String::new(),
        format!("Name: {}", persona.name),
        String::new(),
    ];

    if let Some(demographics) = &persona.demographics {
        lines.push("Demographics:".to_string());
        for (key, value) in demographics {
            // Nested structures carry no scalar fact to state
            if let Some(rendered) = render_scalar(value) {
                lines.push(format!("  - {}: {}", title_case(key), rendered));
            }
        }
        lines.push(String::new());
    }

    if let Some(personality) = &persona.personality {
        lines.push("Personality:".to_string());
        if !personality.traits.is_empty() {
            lines.push(format!("  - Traits: {}", personality.traits.join(", ")));
        }
        if !personality.values.is_empty() {
            lines.push(format!("  - Values: {}", personality.values.join(", ")));
        }
        lines.push(String::new());
    }

    if let Some(behavior) = &persona.behavior {
        lines.push("Behavior:".to_string());
        for (key, value) in behavior {
            match value {
                TraitValue::Text(text) => {
                    lines.push(format!("  - {}: {}", title_case(key), text));
                }
                TraitValue::List(items) => {
                    lines.push(format!("  - {}:", title_case(key)));
                    for item in items {
                        lines.push(format!("    * {}", item));
                    }
                }
            }
        }
        lines.push(String::new());
    }

    if let Some(notes) = &persona.behavioral_notes {
        lines.push("Additional Context:".to_string());
        lines.push(notes.clone());
        lines.push(String::new());
    }

    lines.push(CLOSING.to_string());

    (lines.join("\n"), question_text.to_string())
}

/// `income_bracket` -> `Income Bracket`
fn title_case(key: &str) -> String {
    key.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_scalar(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
