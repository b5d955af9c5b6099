//! Speech capabilities and utterance arbitration.
//!
//! The browser's text-to-speech and speech-to-text engines sit behind the
//! [`Synthesizer`] and [`Recognizer`] traits. [`SpeechCoordinator`] enforces
//! the global discipline: at most one utterance and one recognition active
//! at any time, toggle-off semantics when the active message is re-requested,
//! and graceful degradation (a one-shot notice) when a capability is absent.

use crate::error::Result;
use crate::message::ChatMessage;
use crate::session::Notice;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::warn;

/// A voice offered by the speech-output engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    /// BCP-47 tag the voice speaks.
    pub lang: String,
}

/// Speech-output capability (text-to-speech).
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Voices currently offered. May be empty until the engine is ready;
    /// implementations wait for voice-list readiness before speaking.
    fn voices(&self) -> Vec<Voice>;

    /// Speak `text`, resolving on natural completion.
    ///
    /// `voice` is the pre-selected voice name (engine default when `None`).
    ///
    /// # Errors
    ///
    /// Returns a speech error when synthesis fails or is rejected.
    async fn speak(&self, text: &str, lang: &str, voice: Option<String>) -> Result<()>;

    /// Cancel any queued and active utterances.
    fn cancel_all(&self);
}

/// One event from an in-flight recognition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// Incremental or final transcript.
    Transcript { text: String, is_final: bool },
    /// Recognition ended (naturally or after `stop`).
    Ended,
    /// Engine error, e.g. `not-allowed` or `no-speech`.
    Error { code: String },
}

/// Speech-input capability (speech-to-text). Non-continuous, interim
/// results enabled; the language is set per start.
pub trait Recognizer: Send + Sync {
    /// Begin one recognition in `lang`, delivering events to `events`.
    ///
    /// # Errors
    ///
    /// Returns a speech error when recognition cannot start.
    fn start(&self, lang: &str, events: mpsc::UnboundedSender<RecognitionEvent>) -> Result<()>;

    /// Abort the in-flight recognition, if any.
    fn stop(&self);
}

/// Map a recognition engine error code to its user-facing notice.
#[must_use]
pub fn recognition_error_notice(code: &str) -> Notice {
    match code {
        "not-allowed" | "service-not-allowed" => {
            Notice::speech(crate::persona::MICROPHONE_PERMISSION_DENIED_NOTICE)
        }
        "no-speech" => Notice::speech("No speech was detected. Please try again."),
        "audio-capture" => Notice::speech(
            "No microphone was found. Please ensure a microphone is connected.",
        ),
        other => Notice::speech(format!("Speech recognition error: {other}")),
    }
}

/// Pick a voice for `lang`: exact tag match first, then primary-subtag
/// match, else `None` (engine default).
#[must_use]
pub fn select_voice<'a>(voices: &'a [Voice], lang: &str) -> Option<&'a Voice> {
    voices.iter().find(|v| v.lang == lang).or_else(|| {
        let primary = lang.split('-').next().unwrap_or(lang);
        voices.iter().find(|v| v.lang.starts_with(primary))
    })
}

/// Arbitration guard over the speech capabilities.
pub struct SpeechCoordinator {
    synthesizer: Option<Arc<dyn Synthesizer>>,
    recognizer: Option<Arc<dyn Recognizer>>,
    /// Id of the message currently being spoken.
    active_utterance: Arc<Mutex<Option<String>>>,
    notices: mpsc::UnboundedSender<Notice>,
    warned_no_output: bool,
    warned_no_input: bool,
}

impl SpeechCoordinator {
    /// Build a coordinator over whatever capabilities the host offers.
    #[must_use]
    pub fn new(
        synthesizer: Option<Arc<dyn Synthesizer>>,
        recognizer: Option<Arc<dyn Recognizer>>,
        notices: mpsc::UnboundedSender<Notice>,
    ) -> Self {
        Self {
            synthesizer,
            recognizer,
            active_utterance: Arc::new(Mutex::new(None)),
            notices,
            warned_no_output: false,
            warned_no_input: false,
        }
    }

    /// Id of the message currently speaking, if any.
    #[must_use]
    pub fn speaking_message_id(&self) -> Option<String> {
        self.active_utterance
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Whether speech output is available at all.
    #[must_use]
    pub fn output_supported(&self) -> bool {
        self.synthesizer.is_some()
    }

    /// Request speech for a message.
    ///
    /// Re-requesting the currently speaking message toggles it off. Any
    /// other in-flight utterance is cancelled before the new one starts.
    /// `default_lang` is used when the message carries no language tag.
    pub fn request_speak(&mut self, message: &ChatMessage, default_lang: &str) {
        let Some(synth) = self.synthesizer.clone() else {
            self.notice_once_no_output();
            return;
        };

        let toggled_off = {
            let mut active = self
                .active_utterance
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if active.as_deref() == Some(message.id.as_str()) {
                *active = None;
                true
            } else {
                *active = Some(message.id.clone());
                false
            }
        };
        // Either way any current utterance stops before anything new starts.
        synth.cancel_all();
        if toggled_off {
            return;
        }

        let lang = if message.lang.is_empty() {
            default_lang.to_owned()
        } else {
            message.lang.clone()
        };
        let voice = select_voice(&synth.voices(), &lang).map(|v| v.name.clone());
        if voice.is_none() {
            warn!("no specific voice found for language {lang}; using engine default");
        }

        let text = message.text.clone();
        let id = message.id.clone();
        let active = Arc::clone(&self.active_utterance);
        let notices = self.notices.clone();
        tokio::spawn(async move {
            let outcome = synth.speak(&text, &lang, voice).await;
            // Clear only if this utterance is still the active one; a later
            // request may already own the slot.
            let mut guard = active.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            if guard.as_deref() == Some(id.as_str()) {
                *guard = None;
            }
            drop(guard);
            if let Err(e) = outcome {
                let _ = notices.send(Notice::speech(format!("Speech error: {e}")));
            }
        });
    }

    /// Unconditionally cancel speech output and clear the active id.
    pub fn stop_speaking(&mut self) {
        if let Some(synth) = &self.synthesizer {
            synth.cancel_all();
        }
        *self
            .active_utterance
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
    }

    /// Start one recognition in `lang`, returning the event receiver.
    ///
    /// Any prior recognition is stopped first, preserving the
    /// single-active-recognition invariant. Returns `None` (with a one-shot
    /// notice) when the capability is absent or fails to start.
    pub fn start_listening(
        &mut self,
        lang: &str,
    ) -> Option<mpsc::UnboundedReceiver<RecognitionEvent>> {
        let Some(recognizer) = &self.recognizer else {
            self.notice_once_no_input();
            return None;
        };

        recognizer.stop();
        let (tx, rx) = mpsc::unbounded_channel();
        match recognizer.start(lang, tx) {
            Ok(()) => Some(rx),
            Err(e) => {
                let _ = self.notices.send(Notice::speech(format!("Speech error: {e}")));
                None
            }
        }
    }

    /// Abort the in-flight recognition, if any.
    pub fn stop_listening(&mut self) {
        if let Some(recognizer) = &self.recognizer {
            recognizer.stop();
        }
    }

    fn notice_once_no_output(&mut self) {
        if !self.warned_no_output {
            self.warned_no_output = true;
            let _ = self
                .notices
                .send(Notice::speech(crate::persona::SPEECH_OUTPUT_UNSUPPORTED_NOTICE));
        }
    }

    fn notice_once_no_input(&mut self) {
        if !self.warned_no_input {
            self.warned_no_input = true;
            let _ = self
                .notices
                .send(Notice::speech(crate::persona::SPEECH_INPUT_UNSUPPORTED_NOTICE));
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::error::AssistantError;
    use crate::message::MessageSender;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Synthesizer whose utterances never finish until cancelled; records
    /// speak/cancel calls.
    #[derive(Default)]
    struct HangingSynth {
        spoken: Mutex<Vec<String>>,
        cancels: AtomicUsize,
    }

    #[async_trait]
    impl Synthesizer for HangingSynth {
        fn voices(&self) -> Vec<Voice> {
            vec![
                Voice {
                    name: "Amelie".to_owned(),
                    lang: "fr-CA".to_owned(),
                },
                Voice {
                    name: "Thomas".to_owned(),
                    lang: "fr-FR".to_owned(),
                },
            ]
        }

        async fn speak(&self, text: &str, _lang: &str, _voice: Option<String>) -> Result<()> {
            self.spoken.lock().unwrap().push(text.to_owned());
            std::future::pending::<()>().await;
            Ok(())
        }

        fn cancel_all(&self) {
            self.cancels.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Synthesizer that completes instantly.
    struct InstantSynth {
        fail: bool,
    }

    #[async_trait]
    impl Synthesizer for InstantSynth {
        fn voices(&self) -> Vec<Voice> {
            Vec::new()
        }

        async fn speak(&self, _text: &str, _lang: &str, _voice: Option<String>) -> Result<()> {
            if self.fail {
                Err(AssistantError::Speech("synthesis-failed".to_owned()))
            } else {
                Ok(())
            }
        }

        fn cancel_all(&self) {}
    }

    fn coordinator_with(
        synth: Option<Arc<dyn Synthesizer>>,
    ) -> (SpeechCoordinator, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (SpeechCoordinator::new(synth, None, tx), rx)
    }

    async fn wait_until_idle(coordinator: &SpeechCoordinator) {
        for _ in 0..100 {
            if coordinator.speaking_message_id().is_none() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("utterance never cleared");
    }

    #[test]
    fn recognition_error_codes_map_to_notices() {
        let denied = recognition_error_notice("not-allowed");
        assert_eq!(denied.text, crate::persona::MICROPHONE_PERMISSION_DENIED_NOTICE);
        let unknown = recognition_error_notice("network");
        assert!(unknown.text.contains("network"));
    }

    #[test]
    fn voice_selection_prefers_exact_then_primary_subtag() {
        let voices = vec![
            Voice {
                name: "Amelie".to_owned(),
                lang: "fr-CA".to_owned(),
            },
            Voice {
                name: "Thomas".to_owned(),
                lang: "fr-FR".to_owned(),
            },
        ];
        assert_eq!(select_voice(&voices, "fr-FR").unwrap().name, "Thomas");
        // No exact match for fr-BE; falls back to the first fr voice.
        assert_eq!(select_voice(&voices, "fr-BE").unwrap().name, "Amelie");
        assert!(select_voice(&voices, "nl-NL").is_none());
    }

    #[tokio::test]
    async fn new_request_cancels_current_utterance_first() {
        let synth = Arc::new(HangingSynth::default());
        let (mut coordinator, _rx) = coordinator_with(Some(synth.clone()));

        let b = ChatMessage::new(MessageSender::Bot, "message b", "en-US");
        let a = ChatMessage::new(MessageSender::Bot, "message a", "en-US");

        coordinator.request_speak(&b, "en-US");
        assert_eq!(coordinator.speaking_message_id(), Some(b.id.clone()));

        coordinator.request_speak(&a, "en-US");
        assert_eq!(coordinator.speaking_message_id(), Some(a.id.clone()));
        assert!(synth.cancels.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn re_requesting_active_message_toggles_off() {
        let synth = Arc::new(HangingSynth::default());
        let (mut coordinator, _rx) = coordinator_with(Some(synth.clone()));

        let a = ChatMessage::new(MessageSender::Bot, "message a", "en-US");
        coordinator.request_speak(&a, "en-US");
        assert_eq!(coordinator.speaking_message_id(), Some(a.id.clone()));
        // Let the spawned utterance task reach its await point.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        coordinator.request_speak(&a, "en-US");
        assert_eq!(coordinator.speaking_message_id(), None);
        // Toggling off cancelled but did not start a second utterance.
        assert_eq!(synth.spoken.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn natural_completion_clears_active_id() {
        let (mut coordinator, _rx) =
            coordinator_with(Some(Arc::new(InstantSynth { fail: false })));
        let msg = ChatMessage::new(MessageSender::Bot, "done fast", "en-US");
        coordinator.request_speak(&msg, "en-US");
        wait_until_idle(&coordinator).await;
    }

    #[tokio::test]
    async fn synthesis_error_clears_active_id_and_notifies() {
        let (mut coordinator, mut rx) =
            coordinator_with(Some(Arc::new(InstantSynth { fail: true })));
        let msg = ChatMessage::new(MessageSender::Bot, "will fail", "en-US");
        coordinator.request_speak(&msg, "en-US");
        wait_until_idle(&coordinator).await;

        let notice = rx.recv().await.unwrap();
        assert!(notice.text.contains("Speech error"));
    }

    #[tokio::test]
    async fn missing_synthesizer_notifies_once() {
        let (mut coordinator, mut rx) = coordinator_with(None);
        let msg = ChatMessage::new(MessageSender::Bot, "unheard", "en-US");
        coordinator.request_speak(&msg, "en-US");
        coordinator.request_speak(&msg, "en-US");
        assert!(!coordinator.output_supported());

        let first = rx.recv().await.unwrap();
        assert_eq!(first.text, crate::persona::SPEECH_OUTPUT_UNSUPPORTED_NOTICE);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn stop_speaking_clears_unconditionally() {
        let synth = Arc::new(HangingSynth::default());
        let (mut coordinator, _rx) = coordinator_with(Some(synth));
        let msg = ChatMessage::new(MessageSender::Bot, "speaking", "en-US");
        coordinator.request_speak(&msg, "en-US");
        coordinator.stop_speaking();
        assert_eq!(coordinator.speaking_message_id(), None);
    }

    #[tokio::test]
    async fn missing_recognizer_notifies_once() {
        let (mut coordinator, mut rx) = coordinator_with(None);
        assert!(coordinator.start_listening("en-US").is_none());
        assert!(coordinator.start_listening("en-US").is_none());

        let first = rx.recv().await.unwrap();
        assert_eq!(first.text, crate::persona::SPEECH_INPUT_UNSUPPORTED_NOTICE);
        assert!(rx.try_recv().is_err());
    }
}
