//! Prompt builders for each kind of generation call.
//!
//! The field names requested here are the ones the normalizer reads back,
//! so keep the two in sync.

use std::collections::HashSet;
use std::fmt::Write;

use crate::matching::Premise;

/// Inputs shared by the full and compact match prompts.
pub struct MatchPrompt<'a> {
    pub text: &'a str,
    pub premise: Option<&'a Premise>,
    pub feedback: Option<&'a str>,
    pub exclude: &'a HashSet<String>,
    pub catalog_excerpt: &'a str,
}

/// Ask for a short, meme-ready premise.
pub fn rewrite_prompt(text: &str) -> String {
    format!(
        "Rewrite the following post as a short, meme-ready premise.\n\
         Respond with ONLY a JSON object with these fields:\n\
         - \"setup\": the situation, at most 60 characters\n\
         - \"punchline\": the twist or reaction, at most 60 characters\n\
         - \"tone\": one or two words (e.g. \"sarcastic\", \"wholesome\")\n\
         - \"tags\": up to 5 short topic keywords\n\n\
         Post:\n\"\"\"\n{}\n\"\"\"",
        text
    )
}

/// Ask for the text compressed to at most `max_chars` characters.
pub fn simplify_prompt(text: &str, max_chars: usize) -> String {
    format!(
        "Compress the following text into a single plain sentence of at most {} characters \
         that keeps its core joke or complaint.\n\
         Respond with ONLY a JSON object: {{\"simplified\": \"...\"}}\n\n\
         Text:\n\"\"\"\n{}\n\"\"\"",
        max_chars, text
    )
}

/// Full match prompt: instructions, context clauses and the catalog excerpt.
pub fn match_prompt(input: &MatchPrompt<'_>) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "You pick meme templates for social media posts and write their captions.\n\
         Choose the 3 best templates from the catalog below for the post, ranked best first.\n\
         Captions must be short (under 60 characters per box) and fit each box's purpose.\n\n",
    );
    push_context(&mut prompt, input);

    prompt.push_str(
        "\n## Output\n\
         Respond with ONLY a JSON array of exactly 3 objects, each with:\n\
         - \"templateId\": the id from the catalog (first column)\n\
         - \"templateName\": the template name\n\
         - \"reasoning\": one sentence on why it fits\n\
         - \"layoutKind\": the layout from the catalog\n\
         - \"textSlots\": array of {\"position\": \"<box position>\", \"text\": \"<caption>\"}, one per box\n\
         - \"primaryTopText\": the top caption\n\
         - \"primaryBottomText\": the bottom caption\n\n",
    );

    prompt.push_str("## Catalog (id | name | boxes | layout | box purposes)\n");
    prompt.push_str(input.catalog_excerpt);
    prompt.push('\n');
    prompt
}

/// Shorter variant used after a failed full attempt.
pub fn compact_match_prompt(input: &MatchPrompt<'_>) -> String {
    let mut prompt = String::new();
    prompt.push_str("Pick the 3 best meme templates for this post, best first.\n");
    push_context(&mut prompt, input);
    prompt.push_str(
        "\nReply with ONLY a JSON array: \
         [{\"templateId\":\"...\",\"reasoning\":\"...\",\
         \"textSlots\":[{\"position\":\"top\",\"text\":\"...\"},{\"position\":\"bottom\",\"text\":\"...\"}]}]\n\n\
         Templates (id | name | boxes | layout | purposes):\n",
    );
    prompt.push_str(input.catalog_excerpt);
    prompt.push('\n');
    prompt
}

fn push_context(prompt: &mut String, input: &MatchPrompt<'_>) {
    let _ = writeln!(prompt, "## Post\n{}", input.text);

    if let Some(premise) = input.premise {
        let _ = writeln!(prompt, "\n## Premise");
        let _ = writeln!(prompt, "Setup: {}", premise.setup);
        if !premise.punchline.is_empty() {
            let _ = writeln!(prompt, "Punchline: {}", premise.punchline);
        }
        if !premise.tone.is_empty() {
            let _ = writeln!(prompt, "Tone: {}", premise.tone);
        }
        if !premise.tags.is_empty() {
            let _ = writeln!(prompt, "Tags: {}", premise.tags.join(", "));
        }
    }

    if let Some(feedback) = input.feedback {
        let _ = writeln!(
            prompt,
            "\n## Feedback on previous suggestions\n{}\nTake this into account.",
            feedback
        );
    }

    if !input.exclude.is_empty() {
        let mut ids: Vec<&str> = input.exclude.iter().map(String::as_str).collect();
        ids.sort_unstable();
        let _ = writeln!(
            prompt,
            "\n## Do not use these template ids\n{}",
            ids.join(", ")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(exclude: &'a HashSet<String>, premise: Option<&'a Premise>) -> MatchPrompt<'a> {
        MatchPrompt {
            text: "I waited 3 hours for the bus",
            premise,
            feedback: None,
            exclude,
            catalog_excerpt: "4087833 | Waiting Skeleton | 2 boxes | top-bottom | top: x",
        }
    }

    #[test]
    fn test_match_prompt_sections() {
        let exclude: HashSet<String> = ["61579".to_string(), "12".to_string()].into();
        let premise = Premise {
            setup: "Waiting for the bus".to_string(),
            punchline: "Three hours later".to_string(),
            tone: "weary".to_string(),
            tags: vec!["transit".to_string()],
        };
        let mut prompt_input = input(&exclude, Some(&premise));
        prompt_input.feedback = Some("funnier please");
        let prompt = match_prompt(&prompt_input);

        assert!(prompt.contains("I waited 3 hours for the bus"));
        assert!(prompt.contains("Punchline: Three hours later"));
        assert!(prompt.contains("funnier please"));
        assert!(prompt.contains("12, 61579"));
        assert!(prompt.contains("Waiting Skeleton"));
        assert!(prompt.contains("\"primaryTopText\""));
    }

    #[test]
    fn test_compact_prompt_is_shorter() {
        let exclude = HashSet::new();
        let full = match_prompt(&input(&exclude, None));
        let compact = compact_match_prompt(&input(&exclude, None));
        assert!(compact.len() < full.len());
        assert!(!compact.contains("Do not use"));
    }

    #[test]
    fn test_simplify_prompt_mentions_limit() {
        assert!(simplify_prompt("long text", 100).contains("at most 100 characters"));
    }
}
