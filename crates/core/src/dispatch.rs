//! Command Dispatch
//!
//! `CommandRouter` is the heart of the assistant: it classifies an utterance,
//! runs the matching executor, and returns the textual result. Collaborators
//! are injected, never global, so every executor can be exercised against
//! recording fakes. No error escapes `dispatch`; executor failures become an
//! `Error: ...` result plus a spoken apology for that action family.
//!
//! Spoken text and returned text deliberately diverge per family (the voice
//! narrates progress, the result summarizes the outcome).

use std::sync::Arc;

use tracing::{error, info};

use crate::answer::AnswerBackend;
use crate::automation::{Browser, DesktopAutomation};
use crate::command::{ActionFamily, Command, classify};
use crate::speech::SpeechOutput;

const INTRODUCTION: &str = "I am Nova, your personal assistant created by Govind Khedkar.";

pub struct CommandRouter {
    speech: Arc<SpeechOutput>,
    answers: Arc<dyn AnswerBackend>,
    browser: Arc<dyn Browser>,
    desktop: Arc<dyn DesktopAutomation>,
}

impl CommandRouter {
    pub fn new(
        speech: Arc<SpeechOutput>,
        answers: Arc<dyn AnswerBackend>,
        browser: Arc<dyn Browser>,
        desktop: Arc<dyn DesktopAutomation>,
    ) -> Self {
        Self {
            speech,
            answers,
            browser,
            desktop,
        }
    }

    /// Classifies and executes one command, returning the result text.
    pub async fn dispatch(&self, raw: &str) -> String {
        let command = Command::new(raw);
        let classification = classify(&command);
        info!(
            family = ?classification.family,
            command = %command.normalized(),
            "Dispatching command"
        );

        match classification.family {
            ActionFamily::Introduce => self.introduce().await,
            ActionFamily::Exit => self.exit().await,
            ActionFamily::NoInput => self.no_input().await,
            ActionFamily::OpenDesktopApp => {
                self.open_desktop_app(&classification.parameter).await
            }
            ActionFamily::OpenWebsite => self.open_website(&classification.parameter).await,
            ActionFamily::WebSearch => self.web_search(&classification.parameter).await,
            ActionFamily::PlayMusic => self.play_music(&classification.parameter).await,
            ActionFamily::ReportTime => self.report_time().await,
            ActionFamily::Fallback => self.fallback(command.raw()).await,
        }
    }

    async fn introduce(&self) -> String {
        self.speech.speak(INTRODUCTION).await;
        INTRODUCTION.to_string()
    }

    async fn exit(&self) -> String {
        self.speech.speak("Goodbye!").await;
        "Goodbye! Exiting now...".to_string()
    }

    async fn no_input(&self) -> String {
        self.speech.speak("I didn't catch that. Please try again.").await;
        "No valid command recognized.".to_string()
    }

    /// Launcher keystrokes run on a blocking thread; they sleep between keys.
    async fn open_desktop_app(&self, app: &str) -> String {
        self.speech
            .speak(&format!("Searching for {app} in the Start Menu..."))
            .await;

        let desktop = Arc::clone(&self.desktop);
        let name = app.to_string();
        let launched = tokio::task::spawn_blocking(move || desktop.launch(&name)).await;
        match launched {
            Ok(Ok(())) => {
                self.speech.speak(&format!("Opening {app}...")).await;
                format!("Opening {app} on your desktop...")
            }
            Ok(Err(e)) => {
                error!(error = %e, app, "Error opening desktop app");
                self.speech
                    .speak(&format!("Sorry, I couldn't open {app}."))
                    .await;
                format!("Error: {e}")
            }
            Err(e) => {
                error!(error = %e, app, "Desktop automation task failed");
                self.speech
                    .speak(&format!("Sorry, I couldn't open {app}."))
                    .await;
                format!("Error: {e}")
            }
        }
    }

    async fn open_website(&self, site: &str) -> String {
        self.speech.speak(&format!("Opening {site}...")).await;
        let url = format!("https://www.{site}.com");
        match self.browser.open_url(&url) {
            Ok(()) => format!("Opening website: {site}"),
            Err(e) => {
                error!(error = %e, url, "Error opening website");
                self.speech
                    .speak(&format!("Sorry, I couldn't open {site}."))
                    .await;
                format!("Error: {e}")
            }
        }
    }

    async fn web_search(&self, query: &str) -> String {
        if query.is_empty() {
            // A bare "search" performs no action and produces no result or
            // speech; preserved from the original behavior.
            return String::new();
        }
        self.speech
            .speak(&format!("Searching for {query} on Google..."))
            .await;
        let url = format!(
            "https://www.google.com/search?q={}",
            urlencoding::encode(query)
        );
        match self.browser.open_url(&url) {
            Ok(()) => format!("Searching for: {query}"),
            Err(e) => {
                error!(error = %e, url, "Error opening search results");
                self.speech
                    .speak("Sorry, the search could not be completed.")
                    .await;
                format!("Error: {e}")
            }
        }
    }

    async fn play_music(&self, track: &str) -> String {
        self.speech
            .speak(&format!("Searching for {track} on YouTube..."))
            .await;
        let query = track.replace(' ', "+");
        let url = format!("https://www.youtube.com/results?search_query={query}");
        match self.browser.open_url(&url) {
            Ok(()) => {
                self.speech
                    .speak(&format!("Playing music: {track} on YouTube..."))
                    .await;
                format!("Playing music: {track}")
            }
            Err(e) => {
                error!(error = %e, url, "Error playing music");
                self.speech
                    .speak("An error occurred while trying to play the music.")
                    .await;
                format!("Error: {e}")
            }
        }
    }

    async fn report_time(&self) -> String {
        let now = chrono::Local::now().format("%I:%M %p").to_string();
        let response = format!("The time is {now}");
        self.speech.speak(&response).await;
        response
    }

    /// Unmatched commands go to the answer backend with the original,
    /// unnormalized phrasing.
    async fn fallback(&self, prompt: &str) -> String {
        let response = match self.answers.ask(prompt).await {
            Ok(answer) => answer,
            Err(e) => format!("Error: {e}"),
        };
        self.speech.speak(&response).await;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::{AnswerError, MockAnswerBackend};
    use crate::automation::{MockBrowser, MockDesktopAutomation};
    use crate::speech::{PlaybackHandle, SpeechError, Voice, VoiceEngine};
    use mockall::predicate::eq;
    use std::sync::Mutex;

    /// Voice engine that logs spoken text instead of producing audio.
    #[derive(Default)]
    struct SpeakLog {
        spoken: Arc<Mutex<Vec<String>>>,
    }

    struct SilentHandle;

    impl PlaybackHandle for SilentHandle {
        fn skip(&mut self, _sentences: u32) -> Result<(), SpeechError> {
            Ok(())
        }
    }

    impl VoiceEngine for SpeakLog {
        fn voices(&self) -> Result<Vec<Voice>, SpeechError> {
            Ok(vec![])
        }

        fn start(
            &self,
            text: &str,
            _voice: Option<&Voice>,
        ) -> Result<Box<dyn PlaybackHandle>, SpeechError> {
            self.spoken.lock().unwrap().push(text.to_string());
            Ok(Box::new(SilentHandle))
        }
    }

    struct Fixture {
        answers: MockAnswerBackend,
        browser: MockBrowser,
        desktop: MockDesktopAutomation,
        spoken: Arc<Mutex<Vec<String>>>,
        engine: Arc<SpeakLog>,
    }

    impl Fixture {
        fn new() -> Self {
            let engine = Arc::new(SpeakLog::default());
            Self {
                answers: MockAnswerBackend::new(),
                browser: MockBrowser::new(),
                desktop: MockDesktopAutomation::new(),
                spoken: engine.spoken.clone(),
                engine,
            }
        }

        fn router(self) -> (CommandRouter, Arc<Mutex<Vec<String>>>) {
            let speech = Arc::new(SpeechOutput::new(self.engine, "zira"));
            let router = CommandRouter::new(
                speech,
                Arc::new(self.answers),
                Arc::new(self.browser),
                Arc::new(self.desktop),
            );
            (router, self.spoken)
        }
    }

    #[tokio::test]
    async fn introduction_is_spoken_verbatim() {
        let (router, spoken) = Fixture::new().router();
        let result = router.dispatch("who are you").await;
        assert_eq!(
            result,
            "I am Nova, your personal assistant created by Govind Khedkar."
        );
        assert_eq!(spoken.lock().unwrap().as_slice(), &[result]);
    }

    #[tokio::test]
    async fn exit_speaks_goodbye() {
        for phrase in ["exit", "exits"] {
            let (router, spoken) = Fixture::new().router();
            let result = router.dispatch(phrase).await;
            assert!(result.starts_with("Goodbye!"));
            assert_eq!(result, "Goodbye! Exiting now...");
            assert_eq!(spoken.lock().unwrap().as_slice(), &["Goodbye!".to_string()]);
        }
    }

    #[tokio::test]
    async fn empty_and_none_apologize_without_side_effects() {
        // Mocks have no expectations; any browser/desktop call would panic.
        for input in ["", "none"] {
            let (router, spoken) = Fixture::new().router();
            let result = router.dispatch(input).await;
            assert_eq!(result, "No valid command recognized.");
            assert_eq!(
                spoken.lock().unwrap().as_slice(),
                &["I didn't catch that. Please try again.".to_string()]
            );
        }
    }

    #[tokio::test]
    async fn open_github_builds_www_url() {
        let mut fixture = Fixture::new();
        fixture
            .browser
            .expect_open_url()
            .with(eq("https://www.github.com"))
            .times(1)
            .returning(|_| Ok(()));
        let (router, spoken) = fixture.router();
        let result = router.dispatch("open github").await;
        assert_eq!(result, "Opening website: github");
        assert_eq!(
            spoken.lock().unwrap().as_slice(),
            &["Opening github...".to_string()]
        );
    }

    #[tokio::test]
    async fn site_names_are_joined_before_url_construction() {
        let mut fixture = Fixture::new();
        fixture
            .browser
            .expect_open_url()
            .with(eq("https://www.stackoverflow.com"))
            .times(1)
            .returning(|_| Ok(()));
        let (router, _) = fixture.router();
        let result = router.dispatch("open stack overflow").await;
        assert_eq!(result, "Opening website: stackoverflow");
    }

    #[tokio::test]
    async fn search_opens_google_and_reports() {
        let mut fixture = Fixture::new();
        fixture
            .browser
            .expect_open_url()
            .with(eq("https://www.google.com/search?q=cats"))
            .times(1)
            .returning(|_| Ok(()));
        let (router, spoken) = fixture.router();
        let result = router.dispatch("search cats").await;
        assert_eq!(result, "Searching for: cats");
        assert_eq!(
            spoken.lock().unwrap().as_slice(),
            &["Searching for cats on Google...".to_string()]
        );
    }

    #[tokio::test]
    async fn bare_search_is_a_silent_no_op() {
        let (router, spoken) = Fixture::new().router();
        let result = router.dispatch("search").await;
        assert_eq!(result, "");
        assert!(spoken.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn play_music_opens_youtube_results() {
        let mut fixture = Fixture::new();
        fixture
            .browser
            .expect_open_url()
            .with(eq("https://www.youtube.com/results?search_query=shape+of+you"))
            .times(1)
            .returning(|_| Ok(()));
        let (router, spoken) = fixture.router();
        let result = router.dispatch("play music shape of you").await;
        assert_eq!(result, "Playing music: shape of you");
        let spoken = spoken.lock().unwrap();
        assert_eq!(spoken.len(), 2);
        assert_eq!(spoken[0], "Searching for shape of you on YouTube...");
        assert_eq!(spoken[1], "Playing music: shape of you on YouTube...");
    }

    #[tokio::test]
    async fn desktop_commands_drive_the_launcher() {
        let mut fixture = Fixture::new();
        fixture
            .desktop
            .expect_launch()
            .with(eq("chrome"))
            .times(1)
            .returning(|_| Ok(()));
        let (router, spoken) = fixture.router();
        let result = router.dispatch("open desktop chrome").await;
        assert_eq!(result, "Opening chrome on your desktop...");
        let spoken = spoken.lock().unwrap();
        assert_eq!(spoken[0], "Searching for chrome in the Start Menu...");
        assert_eq!(spoken[1], "Opening chrome...");
    }

    #[tokio::test]
    async fn desktop_failure_becomes_error_result_and_apology() {
        let mut fixture = Fixture::new();
        fixture
            .desktop
            .expect_launch()
            .returning(|_| Err(anyhow::anyhow!("launcher unavailable")));
        let (router, spoken) = fixture.router();
        let result = router.dispatch("open desktop gimp").await;
        assert_eq!(result, "Error: launcher unavailable");
        assert_eq!(
            spoken.lock().unwrap().last().map(String::as_str),
            Some("Sorry, I couldn't open gimp.")
        );
    }

    #[tokio::test]
    async fn fallback_forwards_raw_text_to_the_answer_backend() {
        let mut fixture = Fixture::new();
        fixture
            .answers
            .expect_ask()
            .with(eq("What is Rust?"))
            .times(1)
            .returning(|_| Ok("Rust is a systems programming language.".to_string()));
        let (router, spoken) = fixture.router();
        let result = router.dispatch("What is Rust?").await;
        assert_eq!(result, "Rust is a systems programming language.");
        assert_eq!(spoken.lock().unwrap().as_slice(), &[result]);
    }

    #[tokio::test]
    async fn fallback_transport_failure_maps_to_the_contract_string() {
        let mut fixture = Fixture::new();
        fixture
            .answers
            .expect_ask()
            .returning(|_| Err(AnswerError::Transport("connection refused".into())));
        let (router, spoken) = fixture.router();
        let result = router.dispatch("tell me a joke").await;
        assert_eq!(result, "Error: Unable to contact Gemini API.");
        // Even the error string is read aloud, like any other answer.
        assert_eq!(spoken.lock().unwrap().as_slice(), &[result]);
    }

    #[tokio::test]
    async fn time_is_spoken_and_returned_identically() {
        let (router, spoken) = Fixture::new().router();
        let result = router.dispatch("what is the time").await;
        assert!(result.starts_with("The time is "));
        assert_eq!(spoken.lock().unwrap().as_slice(), &[result]);
    }
}
