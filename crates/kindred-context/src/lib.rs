// SPDX-FileCopyrightText: 2026 Kindred Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt composition: persona framing + retrieved transcript + new message.
//!
//! `compose` is a pure function. Budget enforcement drops retrieved turns
//! least-similar-first; the persona framing and the new user message are
//! never truncated.

use kindred_core::SenderKind;
use kindred_memory::RetrievedTurn;

/// Compose the generation prompt for one turn.
///
/// `retrieved` is expected most-similar-first, as returned by the
/// retriever. When the composed text would exceed `max_prompt_chars`,
/// turns are dropped from the least-similar end until it fits; with no
/// turns left the prompt is returned as-is, transcript section omitted.
pub fn compose(
    persona_description: &str,
    retrieved: &[RetrievedTurn],
    user_text: &str,
    max_prompt_chars: usize,
) -> String {
    // Keep as many of the most similar turns as the budget allows.
    for keep in (0..=retrieved.len()).rev() {
        let prompt = render(persona_description, &retrieved[..keep], user_text);
        if prompt.chars().count() <= max_prompt_chars || keep == 0 {
            return prompt;
        }
    }
    unreachable!("loop always returns at keep == 0");
}

fn render(persona_description: &str, turns: &[RetrievedTurn], user_text: &str) -> String {
    let mut prompt = format!(
        "I want you to act like {persona}. I want you to respond and answer like \
         {persona}, using the tone, manner and vocabulary {persona} would use. \
         You must know all of the knowledge of {persona}.\n",
        persona = persona_description,
    );

    if !turns.is_empty() {
        prompt.push_str("\nThe interactions so far are as follows:\n");
        for turn in turns {
            prompt.push_str(&render_turn(turn));
        }
    }

    prompt.push_str(&format!("\nNow, this is a new message from the user: {user_text}\n"));
    prompt.push_str(&format!("User: {user_text}:"));
    prompt
}

/// Render one retrieved turn as a transcript line.
fn render_turn(turn: &RetrievedTurn) -> String {
    let speaker = match turn.sender {
        SenderKind::User => "User",
        SenderKind::Bot => "Bot",
    };
    format!("{speaker}: {}\n", turn.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kindred_core::MessageId;

    fn turn(sender: SenderKind, text: &str, score: f32) -> RetrievedTurn {
        RetrievedTurn {
            message_id: MessageId(format!("m-{score}")),
            sender,
            text: text.to_string(),
            score,
        }
    }

    #[test]
    fn empty_context_omits_transcript_section() {
        let prompt = compose("Ada", &[], "Hello", 6000);
        assert!(prompt.contains("act like Ada"));
        assert!(prompt.contains("new message from the user: Hello"));
        assert!(!prompt.contains("interactions so far"));
    }

    #[test]
    fn transcript_renders_in_given_order() {
        let turns = vec![
            turn(SenderKind::Bot, "The engine is analytical.", 0.9),
            turn(SenderKind::User, "Tell me about engines.", 0.8),
        ];
        let prompt = compose("Ada", &turns, "And punch cards?", 6000);
        let bot_pos = prompt.find("Bot: The engine is analytical.").unwrap();
        let user_pos = prompt.find("User: Tell me about engines.").unwrap();
        assert!(bot_pos < user_pos);
        assert!(prompt.contains("The interactions so far are as follows:"));
    }

    #[test]
    fn over_budget_drops_least_similar_first() {
        let turns = vec![
            turn(SenderKind::Bot, "most similar turn", 0.9),
            turn(SenderKind::Bot, "middle similarity turn", 0.5),
            turn(SenderKind::Bot, "least similar turn that is quite long indeed", 0.1),
        ];
        let full = compose("Ada", &turns, "hi", usize::MAX);
        // Budget just below the full render forces exactly one drop.
        let budget = full.chars().count() - 1;
        let prompt = compose("Ada", &turns, "hi", budget);

        assert!(prompt.contains("most similar turn"));
        assert!(!prompt.contains("least similar turn"));
        assert!(prompt.chars().count() <= budget);
    }

    #[test]
    fn persona_and_message_survive_tiny_budget() {
        let turns = vec![turn(SenderKind::Bot, "context", 0.9)];
        let prompt = compose("Ada", &turns, "Hello", 1);
        // Budget is unmeetable; framing and the user message are kept whole.
        assert!(prompt.contains("act like Ada"));
        assert!(prompt.contains("Hello"));
        assert!(!prompt.contains("context"));
    }

    #[test]
    fn within_budget_keeps_all_turns() {
        let turns = vec![
            turn(SenderKind::Bot, "a", 0.9),
            turn(SenderKind::User, "b", 0.8),
        ];
        let prompt = compose("Ada", &turns, "hi", 6000);
        assert!(prompt.contains("Bot: a"));
        assert!(prompt.contains("User: b"));
    }

    #[test]
    fn compose_is_pure() {
        let turns = vec![turn(SenderKind::Bot, "a", 0.9)];
        let one = compose("Ada", &turns, "hi", 500);
        let two = compose("Ada", &turns, "hi", 500);
        assert_eq!(one, two);
    }

    #[test]
    fn user_message_is_final_explicit_turn() {
        let prompt = compose("Ada", &[], "What next?", 6000);
        assert!(prompt.ends_with("User: What next?:"));
    }
}
