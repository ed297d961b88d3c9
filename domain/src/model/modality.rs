//! Modality routing predicates
//!
//! A model declares which input/output media it supports; a prompt has a
//! shape (plain text, or structured fields that may carry an image path, or
//! a bare path to an audio file on disk). Routing is the pure function from
//! those two facts to exactly one [`ChatOperation`], with "no matching
//! modality" representable as the absence of a selection rather than a
//! fallthrough.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// An input or output medium a model supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Image,
    Audio,
}

impl Modality {
    pub fn as_str(&self) -> &str {
        match self {
            Modality::Text => "text",
            Modality::Image => "image",
            Modality::Audio => "audio",
        }
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Declared input and output modalities of a model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalitySet {
    pub input: Vec<Modality>,
    pub output: Vec<Modality>,
}

impl ModalitySet {
    pub fn new(input: Vec<Modality>, output: Vec<Modality>) -> Self {
        Self { input, output }
    }

    /// The baseline set every chat model is assumed to have.
    pub fn text_only() -> Self {
        Self {
            input: vec![Modality::Text],
            output: vec![Modality::Text],
        }
    }

    pub fn accepts(&self, modality: Modality) -> bool {
        self.input.contains(&modality)
    }

    pub fn produces(&self, modality: Modality) -> bool {
        self.output.contains(&modality)
    }

    pub fn supports_text_in_text_out(&self) -> bool {
        self.accepts(Modality::Text) && self.produces(Modality::Text)
    }

    /// Compact `in->out` description used in diagnostics.
    pub fn describe(&self) -> String {
        let join = |ms: &[Modality]| {
            ms.iter()
                .map(|m| m.as_str())
                .collect::<Vec<_>>()
                .join(",")
        };
        format!("{}->{}", join(&self.input), join(&self.output))
    }
}

impl Default for ModalitySet {
    fn default() -> Self {
        Self::text_only()
    }
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "flac", "ogg"];

fn has_extension(path: &str, extensions: &[&str]) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// A conversation turn as handed to the router.
///
/// Either a plain string, or a structured object with named text/image/
/// content fields (the shapes the upstream prompt layer produces).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Prompt {
    Text(String),
    Structured {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
}

impl Prompt {
    pub fn text(content: impl Into<String>) -> Self {
        Prompt::Text(content.into())
    }

    /// The textual payload, whichever field carries it.
    pub fn text_payload(&self) -> &str {
        match self {
            Prompt::Text(s) => s,
            Prompt::Structured { text, content, .. } => text
                .as_deref()
                .or(content.as_deref())
                .unwrap_or_default(),
        }
    }

    /// An image path carried by or referenced from this prompt.
    ///
    /// Structured prompts name the image explicitly; plain prompts are
    /// scanned for a token with an image extension that exists on disk.
    pub fn image_path(&self) -> Option<String> {
        if let Prompt::Structured { image: Some(path), .. } = self {
            return Some(path.clone());
        }
        self.text_payload()
            .split_whitespace()
            .find(|token| has_extension(token, IMAGE_EXTENSIONS) && Path::new(token).exists())
            .map(|s| s.to_string())
    }

    /// A copy of this prompt with `prefix` inserted before the text payload,
    /// preserving any structured fields.
    pub fn prefixed(&self, prefix: &str) -> Prompt {
        match self {
            Prompt::Text(s) => Prompt::Text(format!("{}{}", prefix, s)),
            Prompt::Structured { text, image, content } => Prompt::Structured {
                text: Some(format!(
                    "{}{}",
                    prefix,
                    text.as_deref().or(content.as_deref()).unwrap_or_default()
                )),
                image: image.clone(),
                content: content.clone(),
            },
        }
    }

    /// The prompt itself is a path to an audio file that exists on disk.
    pub fn audio_path(&self) -> Option<String> {
        let candidate = self.text_payload().trim();
        if has_extension(candidate, AUDIO_EXTENSIONS) && Path::new(candidate).exists() {
            Some(candidate.to_string())
        } else {
            None
        }
    }
}

impl From<&str> for Prompt {
    fn from(s: &str) -> Self {
        Prompt::Text(s.to_string())
    }
}

impl From<String> for Prompt {
    fn from(s: String) -> Self {
        Prompt::Text(s)
    }
}

/// The five chat operations a model/prompt pair can route to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatOperation {
    TextToText,
    ImageToText,
    TextToImage,
    TextToAudio,
    AudioToText,
}

impl ChatOperation {
    /// Select the operation for a model's modality set and a prompt shape.
    ///
    /// Returns `None` when no supported modality matches - the caller turns
    /// that into a descriptive error result rather than raising.
    pub fn select(modalities: &ModalitySet, prompt: &Prompt) -> Option<ChatOperation> {
        if modalities.accepts(Modality::Image) && prompt.image_path().is_some() {
            return Some(ChatOperation::ImageToText);
        }
        if modalities.produces(Modality::Image) {
            return Some(ChatOperation::TextToImage);
        }
        if modalities.produces(Modality::Audio) {
            return Some(ChatOperation::TextToAudio);
        }
        if modalities.accepts(Modality::Audio) && prompt.audio_path().is_some() {
            return Some(ChatOperation::AudioToText);
        }
        if modalities.supports_text_in_text_out() {
            return Some(ChatOperation::TextToText);
        }
        None
    }

    pub fn as_str(&self) -> &str {
        match self {
            ChatOperation::TextToText => "text_to_text",
            ChatOperation::ImageToText => "image_to_text",
            ChatOperation::TextToImage => "text_to_image",
            ChatOperation::TextToAudio => "text_to_audio",
            ChatOperation::AudioToText => "audio_to_text",
        }
    }
}

impl std::fmt::Display for ChatOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_with_suffix(suffix: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(b"payload").unwrap();
        file
    }

    #[test]
    fn plain_text_routes_to_text_to_text() {
        let op = ChatOperation::select(&ModalitySet::text_only(), &Prompt::text("hello"));
        assert_eq!(op, Some(ChatOperation::TextToText));
    }

    #[test]
    fn vision_model_with_image_reference_routes_to_image_to_text() {
        let image = temp_with_suffix(".png");
        let prompt = Prompt::text(format!(
            "describe {}",
            image.path().to_str().unwrap()
        ));
        let modalities = ModalitySet::new(
            vec![Modality::Text, Modality::Image],
            vec![Modality::Text],
        );
        assert_eq!(
            ChatOperation::select(&modalities, &prompt),
            Some(ChatOperation::ImageToText)
        );
    }

    #[test]
    fn vision_model_without_image_falls_back_to_text() {
        let modalities = ModalitySet::new(
            vec![Modality::Text, Modality::Image],
            vec![Modality::Text],
        );
        assert_eq!(
            ChatOperation::select(&modalities, &Prompt::text("just words")),
            Some(ChatOperation::TextToText)
        );
    }

    #[test]
    fn structured_image_field_wins_without_disk_check() {
        let prompt = Prompt::Structured {
            text: Some("what is this".to_string()),
            image: Some("/srv/captures/shot.png".to_string()),
            content: None,
        };
        assert_eq!(prompt.image_path().as_deref(), Some("/srv/captures/shot.png"));
    }

    #[test]
    fn image_output_model_routes_to_text_to_image() {
        let modalities = ModalitySet::new(vec![Modality::Text], vec![Modality::Image]);
        assert_eq!(
            ChatOperation::select(&modalities, &Prompt::text("a lighthouse at dusk")),
            Some(ChatOperation::TextToImage)
        );
    }

    #[test]
    fn audio_output_model_routes_to_text_to_audio() {
        let modalities = ModalitySet::new(vec![Modality::Text], vec![Modality::Audio]);
        assert_eq!(
            ChatOperation::select(&modalities, &Prompt::text("read this aloud")),
            Some(ChatOperation::TextToAudio)
        );
    }

    #[test]
    fn audio_file_prompt_routes_to_audio_to_text() {
        let audio = temp_with_suffix(".mp3");
        let prompt = Prompt::text(audio.path().to_str().unwrap());
        let modalities = ModalitySet::new(
            vec![Modality::Text, Modality::Audio],
            vec![Modality::Text],
        );
        assert_eq!(
            ChatOperation::select(&modalities, &prompt),
            Some(ChatOperation::AudioToText)
        );
    }

    #[test]
    fn audio_path_requires_existing_file() {
        let prompt = Prompt::text("/nonexistent/clip.mp3");
        assert!(prompt.audio_path().is_none());
    }

    #[test]
    fn no_matching_modality_is_representable() {
        // Model that only emits images but cannot take text would be
        // unroutable for a plain text prompt with no image output either.
        let modalities = ModalitySet::new(vec![Modality::Audio], vec![Modality::Text]);
        assert_eq!(
            ChatOperation::select(&modalities, &Prompt::text("hello")),
            None
        );
    }

    #[test]
    fn prefixed_preserves_structured_fields() {
        assert_eq!(
            Prompt::text("hello").prefixed("As critic: ").text_payload(),
            "As critic: hello"
        );

        let prompt = Prompt::Structured {
            text: None,
            image: Some("/tmp/x.png".to_string()),
            content: Some("look".to_string()),
        };
        let prefixed = prompt.prefixed("As critic: ");
        assert_eq!(prefixed.text_payload(), "As critic: look");
        assert_eq!(prefixed.image_path().as_deref(), Some("/tmp/x.png"));
    }

    #[test]
    fn describe_formats_in_out() {
        let modalities = ModalitySet::new(
            vec![Modality::Text, Modality::Image],
            vec![Modality::Text],
        );
        assert_eq!(modalities.describe(), "text,image->text");
    }
}
