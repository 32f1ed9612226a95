//! Command Classification
//!
//! This module turns free-form utterances into exactly one action family.
//! Classification is an ordered rule table evaluated top to bottom; the first
//! matching rule wins, so precedence between overlapping keywords is encoded
//! by rule position rather than nested conditionals. Tests can enumerate the
//! table directly to pin the order down.

/// Sentinel returned by the transcription layer when nothing usable was heard.
pub const NO_INPUT: &str = "none";

/// A single user utterance, kept in both its original and normalized form.
///
/// The raw text is preserved because the fallback action forwards the command
/// to the answer backend exactly as the user phrased it; every classification
/// decision runs on the normalized form.
#[derive(Debug, Clone)]
pub struct Command {
    raw: String,
    normalized: String,
}

impl Command {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let normalized = raw.trim().to_lowercase();
        Self { raw, normalized }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }
}

/// The category of user intent a command is classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionFamily {
    Introduce,
    Exit,
    NoInput,
    OpenDesktopApp,
    OpenWebsite,
    WebSearch,
    PlayMusic,
    ReportTime,
    Fallback,
}

/// How a rule recognizes its family in normalized command text.
#[derive(Debug)]
enum Matcher {
    /// The whole normalized text equals one of these phrases.
    ExactAny(&'static [&'static str]),
    /// The text is empty or the transcription sentinel.
    NoInput,
    /// Every listed keyword appears somewhere in the text.
    ContainsAll(&'static [&'static str]),
    /// A single keyword appears somewhere in the text.
    Contains(&'static str),
    /// Always matches; terminates the table.
    CatchAll,
}

/// How a rule derives its action parameter from normalized command text.
#[derive(Debug)]
enum Extraction {
    None,
    /// Everything after the first occurrence of the trigger, trimmed.
    AfterFirst(&'static str),
    /// As `AfterFirst`, then internal whitespace removed so the parameter is
    /// a single contiguous token (needed for URL construction).
    AfterFirstJoined(&'static str),
}

/// One entry of the classification policy.
#[derive(Debug)]
pub struct Rule {
    pub family: ActionFamily,
    matcher: Matcher,
    extraction: Extraction,
}

impl Rule {
    const fn new(family: ActionFamily, matcher: Matcher, extraction: Extraction) -> Self {
        Self {
            family,
            matcher,
            extraction,
        }
    }

    fn matches(&self, text: &str) -> bool {
        match &self.matcher {
            Matcher::ExactAny(phrases) => phrases.contains(&text),
            Matcher::NoInput => text.is_empty() || text == NO_INPUT,
            Matcher::ContainsAll(keywords) => keywords.iter().all(|k| text.contains(k)),
            Matcher::Contains(keyword) => text.contains(keyword),
            Matcher::CatchAll => true,
        }
    }

    fn extract(&self, text: &str) -> String {
        match &self.extraction {
            Extraction::None => String::new(),
            Extraction::AfterFirst(trigger) => text
                .split_once(trigger)
                .map(|(_, rest)| rest.trim().to_string())
                .unwrap_or_default(),
            Extraction::AfterFirstJoined(trigger) => text
                .split_once(trigger)
                .map(|(_, rest)| rest.split_whitespace().collect())
                .unwrap_or_default(),
        }
    }
}

/// The classification policy, in precedence order.
///
/// The desktop rule sits above the website rule so that "open desktop chrome"
/// launches an application instead of a browser tab, and both sit above the
/// search rule so a command containing "open" and "search" opens a website.
pub static RULES: &[Rule] = &[
    Rule::new(
        ActionFamily::Introduce,
        Matcher::ExactAny(&["who are you", "what is your name", "who r u"]),
        Extraction::None,
    ),
    Rule::new(
        ActionFamily::Exit,
        Matcher::ExactAny(&["exit", "exits"]),
        Extraction::None,
    ),
    Rule::new(ActionFamily::NoInput, Matcher::NoInput, Extraction::None),
    Rule::new(
        ActionFamily::OpenDesktopApp,
        Matcher::ContainsAll(&["open", "desktop"]),
        Extraction::AfterFirst("desktop"),
    ),
    Rule::new(
        ActionFamily::OpenWebsite,
        Matcher::Contains("open"),
        Extraction::AfterFirstJoined("open"),
    ),
    Rule::new(
        ActionFamily::WebSearch,
        Matcher::Contains("search"),
        Extraction::AfterFirst("search"),
    ),
    Rule::new(
        ActionFamily::PlayMusic,
        Matcher::Contains("play music"),
        Extraction::AfterFirst("play music"),
    ),
    Rule::new(
        ActionFamily::ReportTime,
        Matcher::Contains("the time"),
        Extraction::None,
    ),
    Rule::new(ActionFamily::Fallback, Matcher::CatchAll, Extraction::None),
];

/// The outcome of classifying one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub family: ActionFamily,
    /// Empty when the family takes no parameter or the command ends at the
    /// trigger keyword.
    pub parameter: String,
}

/// Classifies a command against the rule table.
///
/// Total over all inputs: the table ends in a catch-all, so every utterance
/// maps to exactly one family.
pub fn classify(command: &Command) -> Classification {
    let text = command.normalized();
    for rule in RULES {
        if rule.matches(text) {
            return Classification {
                family: rule.family,
                parameter: rule.extract(text),
            };
        }
    }
    Classification {
        family: ActionFamily::Fallback,
        parameter: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_text(text: &str) -> Classification {
        classify(&Command::new(text))
    }

    #[test]
    fn rule_table_order_is_fixed() {
        let families: Vec<ActionFamily> = RULES.iter().map(|r| r.family).collect();
        assert_eq!(
            families,
            vec![
                ActionFamily::Introduce,
                ActionFamily::Exit,
                ActionFamily::NoInput,
                ActionFamily::OpenDesktopApp,
                ActionFamily::OpenWebsite,
                ActionFamily::WebSearch,
                ActionFamily::PlayMusic,
                ActionFamily::ReportTime,
                ActionFamily::Fallback,
            ]
        );
    }

    #[test]
    fn normalization_lowercases_and_trims() {
        let command = Command::new("  OPEN GitHub  ");
        assert_eq!(command.normalized(), "open github");
        assert_eq!(command.raw(), "  OPEN GitHub  ");
    }

    #[test]
    fn introduction_phrases_match_exactly() {
        for phrase in ["who are you", "What is your name", "WHO R U"] {
            assert_eq!(classify_text(phrase).family, ActionFamily::Introduce);
        }
        // Substring is not enough for the introduction set.
        assert_ne!(
            classify_text("tell me who are you").family,
            ActionFamily::Introduce
        );
    }

    #[test]
    fn exit_phrases() {
        assert_eq!(classify_text("exit").family, ActionFamily::Exit);
        assert_eq!(classify_text("exits").family, ActionFamily::Exit);
    }

    #[test]
    fn empty_and_sentinel_are_no_input() {
        assert_eq!(classify_text("").family, ActionFamily::NoInput);
        assert_eq!(classify_text("   ").family, ActionFamily::NoInput);
        assert_eq!(classify_text("none").family, ActionFamily::NoInput);
        assert_eq!(classify_text(" NONE ").family, ActionFamily::NoInput);
    }

    #[test]
    fn desktop_takes_precedence_over_website() {
        let c = classify_text("open desktop chrome");
        assert_eq!(c.family, ActionFamily::OpenDesktopApp);
        assert_eq!(c.parameter, "chrome");
    }

    #[test]
    fn desktop_parameter_may_be_empty() {
        let c = classify_text("open desktop");
        assert_eq!(c.family, ActionFamily::OpenDesktopApp);
        assert_eq!(c.parameter, "");
    }

    #[test]
    fn website_parameter_strips_internal_whitespace() {
        let c = classify_text("open stack overflow");
        assert_eq!(c.family, ActionFamily::OpenWebsite);
        assert_eq!(c.parameter, "stackoverflow");

        let c = classify_text("open github");
        assert_eq!(c.parameter, "github");
    }

    #[test]
    fn open_beats_search_in_the_outer_chain() {
        let c = classify_text("please search open source");
        assert_eq!(c.family, ActionFamily::OpenWebsite);
        assert_eq!(c.parameter, "source");
    }

    #[test]
    fn search_extracts_query() {
        let c = classify_text("search cats");
        assert_eq!(c.family, ActionFamily::WebSearch);
        assert_eq!(c.parameter, "cats");
    }

    #[test]
    fn bare_search_has_empty_parameter() {
        let c = classify_text("search");
        assert_eq!(c.family, ActionFamily::WebSearch);
        assert_eq!(c.parameter, "");
    }

    #[test]
    fn play_music_extracts_track() {
        let c = classify_text("play music bohemian rhapsody");
        assert_eq!(c.family, ActionFamily::PlayMusic);
        assert_eq!(c.parameter, "bohemian rhapsody");
    }

    #[test]
    fn time_requests() {
        assert_eq!(
            classify_text("what is the time").family,
            ActionFamily::ReportTime
        );
    }

    #[test]
    fn unrecognized_commands_fall_back() {
        let c = classify_text("what is rust");
        assert_eq!(c.family, ActionFamily::Fallback);
        assert_eq!(c.parameter, "");
    }
}
