//! Pre-written supportive replies used when no model answers.

use rand::Rng;
use serde::Serialize;

/// Opening message placed in every new conversation.
pub const GREETING: &str = "Hi there! I'm your EMOHEAL companion. I'm here to listen, support, and walk alongside you on your healing journey. How are you feeling today? 💕";

/// Prompts the client can offer as one-tap messages.
pub const QUICK_SUGGESTIONS: [&str; 3] = [
    "I'm feeling overwhelmed today",
    "I need some encouragement",
    "Tell me something positive",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseCategory {
    Greeting,
    Support,
    Encouragement,
    Comfort,
    Default,
}

#[derive(Debug, Clone, Copy)]
enum Match {
    /// Keyword must be a whole word ("hi" does not match "things").
    Word,
    /// Keyword may appear anywhere ("hope" matches "hopeful").
    Substring,
}

// Checked in order; the first category with a matching keyword wins.
const KEYWORDS: [(ResponseCategory, Match, &[&str]); 4] = [
    (
        ResponseCategory::Greeting,
        Match::Word,
        &["hello", "hi", "hey"],
    ),
    (
        ResponseCategory::Support,
        Match::Substring,
        &["sad", "depressed", "lonely", "scared"],
    ),
    (
        ResponseCategory::Comfort,
        Match::Substring,
        &["tired", "exhausted", "overwhelmed"],
    ),
    (
        ResponseCategory::Encouragement,
        Match::Substring,
        &["hope", "future", "better"],
    ),
];

const GREETING_TEMPLATES: &[&str] = &[
    "Hello beautiful! I'm so glad you're here today. How are you feeling? 💕",
    "Hi there! I've been thinking about you. How has your day been? 🌸",
    "Welcome back! I'm here to listen and support you. What's on your mind? ✨",
];

const SUPPORT_TEMPLATES: &[&str] = &[
    "I hear you, and I want you to know that your feelings are completely valid. You're going through something incredibly challenging, and it's okay to feel overwhelmed. You're not alone in this journey. 💝",
    "I can only imagine how difficult this must be for you. You're showing incredible strength just by being here and reaching out. Remember, it's okay to not be okay sometimes. 🌿",
    "Your feelings matter, and you deserve all the love and support in the world. You're doing amazing, even on the days when it doesn't feel like it. You've got this! 💪",
];

const ENCOURAGEMENT_TEMPLATES: &[&str] = &[
    "You are so much stronger than you know. Every day you wake up and face this challenge, you're proving how resilient you are. I believe in you! 🌟",
    "Remember, healing isn't linear. Some days will be harder than others, and that's completely normal. You're making progress, even when it doesn't feel like it. Keep going! 💫",
    "You're not just surviving; you're learning to thrive in the face of adversity. That's incredible courage. I'm here cheering you on every step of the way! 🎉",
];

const COMFORT_TEMPLATES: &[&str] = &[
    "It's okay to take things one moment at a time. You don't have to have all the answers right now. Just breathe, and know that you're doing exactly what you need to do. 🕊️",
    "Your body is working so hard to heal, and so is your spirit. Give yourself permission to rest, to feel, and to be gentle with yourself. You deserve that kindness. 🌸",
    "In the midst of all this uncertainty, remember that you are loved, you are valued, and you are enough. You don't have to be perfect; you just have to be you. 💖",
];

const DEFAULT_TEMPLATES: &[&str] = &[
    "I'm here to listen and support you. Would you like to talk about how you're feeling, or would you prefer to explore some of our healing tools together? 🌟",
    "Thank you for sharing that with me. I want you to know that I'm here for you, no matter what. How can I best support you right now? 💕",
    "I hear you, and I want you to know that your feelings are important. You're not alone in this journey. What would be most helpful for you right now? ✨",
];

impl ResponseCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseCategory::Greeting => "greeting",
            ResponseCategory::Support => "support",
            ResponseCategory::Encouragement => "encouragement",
            ResponseCategory::Comfort => "comfort",
            ResponseCategory::Default => "default",
        }
    }

    pub fn templates(&self) -> &'static [&'static str] {
        match self {
            ResponseCategory::Greeting => GREETING_TEMPLATES,
            ResponseCategory::Support => SUPPORT_TEMPLATES,
            ResponseCategory::Encouragement => ENCOURAGEMENT_TEMPLATES,
            ResponseCategory::Comfort => COMFORT_TEMPLATES,
            ResponseCategory::Default => DEFAULT_TEMPLATES,
        }
    }

    pub fn all() -> [ResponseCategory; 5] {
        [
            ResponseCategory::Greeting,
            ResponseCategory::Support,
            ResponseCategory::Encouragement,
            ResponseCategory::Comfort,
            ResponseCategory::Default,
        ]
    }
}

/// Maps free text to a category by case-insensitive keyword match.
///
/// Greetings must appear as whole words; every other keyword matches as a
/// substring. Anything unmatched, including empty input, is `Default`.
pub fn classify(text: &str) -> ResponseCategory {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower.split(|c: char| !c.is_alphanumeric()).collect();

    KEYWORDS
        .iter()
        .find(|(_, mode, keywords)| match mode {
            Match::Word => words.iter().any(|w| keywords.contains(w)),
            Match::Substring => keywords.iter().any(|k| lower.contains(k)),
        })
        .map(|(category, _, _)| *category)
        .unwrap_or(ResponseCategory::Default)
}

/// Picks one template of `category` uniformly at random.
pub fn sample<R: Rng + ?Sized>(category: ResponseCategory, rng: &mut R) -> &'static str {
    let templates = category.templates();
    templates[rng.gen_range(0..templates.len())]
}

/// Classifies `text` and samples a reply from the matching category.
pub fn respond<R: Rng + ?Sized>(text: &str, rng: &mut R) -> (ResponseCategory, &'static str) {
    let category = classify(text);
    (category, sample(category, rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn classifies_documented_examples() {
        assert_eq!(classify("hello there"), ResponseCategory::Greeting);
        assert_eq!(classify("I feel so lonely"), ResponseCategory::Support);
        assert_eq!(classify("I'm exhausted today"), ResponseCategory::Comfort);
        assert_eq!(
            classify("I hope things get better"),
            ResponseCategory::Encouragement
        );
        assert_eq!(classify("what's the weather"), ResponseCategory::Default);
    }

    #[test]
    fn matching_ignores_case() {
        assert_eq!(classify("HEY"), ResponseCategory::Greeting);
        assert_eq!(classify("So TIRED"), ResponseCategory::Comfort);
    }

    #[test]
    fn earlier_category_wins() {
        // greeting beats support beats comfort beats encouragement
        assert_eq!(classify("hey, I'm sad"), ResponseCategory::Greeting);
        assert_eq!(classify("sad and tired"), ResponseCategory::Support);
        assert_eq!(classify("tired but hopeful"), ResponseCategory::Comfort);
    }

    #[test]
    fn greetings_need_whole_words() {
        assert_eq!(classify("hi!"), ResponseCategory::Greeting);
        assert_eq!(classify("oh, hey-hey"), ResponseCategory::Greeting);
        assert_eq!(classify("this is fine"), ResponseCategory::Default);
        assert_eq!(classify("they said things"), ResponseCategory::Default);
    }

    #[test]
    fn other_keywords_match_inside_words() {
        assert_eq!(classify("feeling hopeful"), ResponseCategory::Encouragement);
        assert_eq!(classify("the tiredness"), ResponseCategory::Comfort);
        assert_eq!(classify("saddest week"), ResponseCategory::Support);
    }

    #[test]
    fn empty_input_is_default() {
        assert_eq!(classify(""), ResponseCategory::Default);
        assert_eq!(classify("   "), ResponseCategory::Default);
    }

    #[test]
    fn every_category_has_templates() {
        for category in ResponseCategory::all() {
            assert!(!category.templates().is_empty(), "{}", category.as_str());
            assert!(category.templates().iter().all(|t| !t.trim().is_empty()));
        }
    }

    #[test]
    fn sample_stays_within_category() {
        let mut rng = StdRng::seed_from_u64(7);
        for category in ResponseCategory::all() {
            for _ in 0..20 {
                let text = sample(category, &mut rng);
                assert!(category.templates().contains(&text));
            }
        }
    }

    #[test]
    fn sample_reaches_every_template() {
        let mut rng = StdRng::seed_from_u64(42);
        let seen: HashSet<&str> = (0..200)
            .map(|_| sample(ResponseCategory::Support, &mut rng))
            .collect();
        assert_eq!(seen.len(), SUPPORT_TEMPLATES.len());
    }

    #[test]
    fn respond_uses_classified_category() {
        let mut rng = StdRng::seed_from_u64(1);
        let (category, text) = respond("I feel scared", &mut rng);
        assert_eq!(category, ResponseCategory::Support);
        assert!(SUPPORT_TEMPLATES.contains(&text));
    }
}
