//! Persona prompts wrapped around every user message before it reaches a model.

pub const COMPANION_NAME: &str = "EMOHEAL";

/// Marks the human turn in the hosted prompt. Generated text is cut here so the
/// model's continuation of the conversation is not echoed back.
pub const STOP_MARKER: &str = "User:";

const PERSONA: &str = "a compassionate AI companion specifically designed for breast cancer patients. \
You provide emotional support, encouragement, and understanding. \
Always be empathetic, caring, and supportive.";

/// Prompt for the local model.
pub fn local_prompt(user_text: &str) -> String {
    format!(
        "You are {name}, {persona} Keep responses warm, personal, and under 100 words.\n\n\
         User message: \"{text}\"\n\n\
         Respond as {name} with empathy and support:",
        name = COMPANION_NAME,
        persona = PERSONA,
        text = user_text,
    )
}

/// Prompt for the hosted model, which continues a plain-text dialogue.
pub fn hosted_prompt(user_text: &str) -> String {
    format!(
        "You are {name}, {persona} {marker} {text}",
        name = COMPANION_NAME,
        persona = PERSONA,
        marker = STOP_MARKER,
        text = user_text,
    )
}

/// Returns the text that precedes the first stop marker.
pub fn cut_at_stop_marker(generated: &str) -> &str {
    match generated.find(STOP_MARKER) {
        Some(idx) => &generated[..idx],
        None => generated,
    }
}
