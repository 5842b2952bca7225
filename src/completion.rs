// Copyright (c) 2026 rezky_nightky

use crate::tokenize::quote;

/// Where Tab candidates come from.
pub trait CompletionSource {
    /// Every registered command name.
    fn command_names(&self) -> Vec<String>;
    /// First-argument candidates for a recognised command, `None` otherwise.
    fn argument_candidates(&self, command: &str) -> Option<Vec<String>>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CompletionMode {
    #[default]
    Idle,
    SuggestingCommand,
    SuggestingArgument,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Suggestion {
    /// What the suggestion list shows.
    pub label: String,
    /// The whole input line once accepted.
    pub line: String,
}

/// Tab-completion memo. The list is only rebuilt when the input stops extending
/// the prefix it was built for.
#[derive(Clone, Debug, Default)]
pub struct Completion {
    mode: CompletionMode,
    last_prefix: String,
    suggestions: Vec<Suggestion>,
    cursor: usize,
    accepted: Option<String>,
}

fn starts_with_ci(s: &str, prefix: &str) -> bool {
    s.to_lowercase().starts_with(&prefix.to_lowercase())
}

impl Completion {
    pub fn mode(&self) -> CompletionMode {
        self.mode
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Any key other than Tab leaves suggesting mode but keeps the memo.
    pub fn pause(&mut self) {
        self.mode = CompletionMode::Idle;
    }

    /// Enter and history recall forget everything.
    pub fn clear(&mut self) {
        *self = Completion::default();
    }

    /// Handles one Tab press. Returns the new input line when a suggestion is accepted.
    pub fn on_tab(&mut self, input: &str, source: &dyn CompletionSource) -> Option<String> {
        if !self.suggestions.is_empty() {
            if self.accepted.as_deref() == Some(input) {
                self.cursor = (self.cursor + 1) % self.suggestions.len();
                return Some(self.accept());
            }
            if input.starts_with(&self.last_prefix) {
                return self.search_forward(input, source);
            }
        }
        self.rebuild(input, source)
    }

    fn accept(&mut self) -> String {
        let line = self.suggestions[self.cursor].line.clone();
        self.accepted = Some(line.clone());
        line
    }

    /// Typed past an accepted suggestion: next candidate still matching, else the
    /// memo is dropped and the list rebuilt for the new input.
    fn search_forward(&mut self, input: &str, source: &dyn CompletionSource) -> Option<String> {
        let n = self.suggestions.len();
        let hit = (1..=n)
            .map(|step| (self.cursor + step) % n)
            .find(|&i| starts_with_ci(&self.suggestions[i].line, input));
        match hit {
            Some(i) => {
                self.cursor = i;
                Some(self.accept())
            }
            None => {
                self.clear();
                self.rebuild(input, source)
            }
        }
    }

    fn rebuild(&mut self, input: &str, source: &dyn CompletionSource) -> Option<String> {
        let (mode, suggestions) = match input.split_once(' ') {
            None => {
                let mut names: Vec<String> = source
                    .command_names()
                    .into_iter()
                    .filter(|n| starts_with_ci(n, input))
                    .collect();
                names.sort();
                let s: Vec<Suggestion> = names
                    .into_iter()
                    .map(|n| Suggestion {
                        line: n.clone(),
                        label: n,
                    })
                    .collect();
                (CompletionMode::SuggestingCommand, s)
            }
            Some((command, partial)) => {
                let command = command.to_lowercase();
                let partial = partial.trim_start().trim_start_matches('"');
                let candidates = source.argument_candidates(&command).unwrap_or_default();
                let s: Vec<Suggestion> = candidates
                    .into_iter()
                    .filter(|c| starts_with_ci(c, partial))
                    .map(|c| Suggestion {
                        line: format!("{command} {}", quote(&c)),
                        label: c,
                    })
                    .collect();
                (CompletionMode::SuggestingArgument, s)
            }
        };

        if suggestions.is_empty() {
            self.clear();
            return None;
        }
        self.mode = mode;
        self.last_prefix = input.to_string();
        self.suggestions = suggestions;
        self.cursor = 0;
        Some(self.accept())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    impl CompletionSource for Fixed {
        fn command_names(&self) -> Vec<String> {
            ["rainset", "rainpreset", "rainreset", "rain", "help", "skilltree"]
                .map(String::from)
                .to_vec()
        }

        fn argument_candidates(&self, command: &str) -> Option<Vec<String>> {
            match command {
                "rainpreset" => Some(vec!["storm".into(), "drizzle".into(), "deep".into()]),
                "skilltree" => Some(vec!["ai".into(), "ai > genai".into()]),
                _ => None,
            }
        }
    }

    #[test]
    fn command_prefix_cycles_sorted_and_wraps() {
        let mut c = Completion::default();
        let first = c.on_tab("rai", &Fixed);
        assert_eq!(first.as_deref(), Some("rain"));
        assert_eq!(c.mode(), CompletionMode::SuggestingCommand);
        let labels: Vec<_> = c.suggestions().iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["rain", "rainpreset", "rainreset", "rainset"]);

        assert_eq!(c.on_tab("rain", &Fixed).as_deref(), Some("rainpreset"));
        assert_eq!(c.on_tab("rainpreset", &Fixed).as_deref(), Some("rainreset"));
        assert_eq!(c.on_tab("rainreset", &Fixed).as_deref(), Some("rainset"));
        assert_eq!(c.on_tab("rainset", &Fixed).as_deref(), Some("rain"));
    }

    #[test]
    fn argument_suggestions_follow_a_known_command() {
        let mut c = Completion::default();
        assert_eq!(c.on_tab("rainpreset ", &Fixed).as_deref(), Some("rainpreset storm"));
        assert_eq!(c.mode(), CompletionMode::SuggestingArgument);
        assert_eq!(c.on_tab("rainpreset storm", &Fixed).as_deref(), Some("rainpreset drizzle"));

        let mut c = Completion::default();
        assert_eq!(c.on_tab("nosuch ", &Fixed), None);
        assert_eq!(c.mode(), CompletionMode::Idle);
    }

    #[test]
    fn multi_word_arguments_are_quoted() {
        let mut c = Completion::default();
        assert_eq!(c.on_tab("skilltree ai", &Fixed).as_deref(), Some("skilltree ai"));
        assert_eq!(
            c.on_tab("skilltree ai", &Fixed).as_deref(),
            Some(r#"skilltree "ai > genai""#)
        );
    }

    #[test]
    fn typing_past_a_suggestion_searches_forward_or_clears() {
        let mut c = Completion::default();
        assert_eq!(c.on_tab("rainpreset ", &Fixed).as_deref(), Some("rainpreset storm"));
        c.pause();
        assert_eq!(c.mode(), CompletionMode::Idle);
        // user deletes back to "rainpreset d" and presses Tab again
        assert_eq!(c.on_tab("rainpreset d", &Fixed).as_deref(), Some("rainpreset drizzle"));
        assert_eq!(c.on_tab("rainpreset de", &Fixed).as_deref(), Some("rainpreset deep"));
        assert_eq!(c.on_tab("rainpreset dx", &Fixed), None);
        assert!(c.suggestions().is_empty());
    }

    #[test]
    fn diverging_input_rebuilds() {
        let mut c = Completion::default();
        c.on_tab("rain", &Fixed);
        assert_eq!(c.on_tab("he", &Fixed).as_deref(), Some("help"));
        assert_eq!(c.suggestions().len(), 1);
        assert_eq!(c.on_tab("zz", &Fixed), None);
        assert_eq!(c.mode(), CompletionMode::Idle);
    }
}
