//! Generated Artifacts
//!
//! Typed results of single AI calls. Structured artifacts declare the schema
//! they are generated against and validate themselves after parsing, so nothing
//! reaches the caller with a missing or blank required field.

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ai::schema::{Field, ResponseSchema};
use crate::types::{CopyError, Result};

// =============================================================================
// Structured Artifact Contract
// =============================================================================

/// A result shape produced by structured generation
pub trait StructuredArtifact: DeserializeOwned + Send + 'static {
    /// Short name for logs and errors
    const KIND: &'static str;

    /// Schema the model is constrained to
    fn schema() -> ResponseSchema;

    /// Reject payloads that parsed but are not usable
    fn validate(&self) -> Result<()>;
}

fn require_text(kind: &str, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CopyError::malformed(format!(
            "{}: required field '{}' is empty",
            kind, field
        )));
    }
    Ok(())
}

// =============================================================================
// Sales Script
// =============================================================================

/// Persuasive sales structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesScript {
    pub headline: String,
    pub body: String,
    pub cta: String,
}

impl SalesScript {
    /// Plain-text rendering for copying
    pub fn to_plain_text(&self) -> String {
        format!("{}\n\n{}\n\n{}", self.headline, self.body, self.cta)
    }
}

impl StructuredArtifact for SalesScript {
    const KIND: &'static str = "sales_script";

    fn schema() -> ResponseSchema {
        ResponseSchema::object(vec![
            Field::string(
                "headline",
                "Un titular impactante que capte la atención inmediatamente.",
            ),
            Field::string(
                "body",
                "El cuerpo del mensaje de ventas estructurado profesionalmente.",
            ),
            Field::string("cta", "Una llamada a la acción poderosa y clara."),
        ])
    }

    fn validate(&self) -> Result<()> {
        require_text(Self::KIND, "headline", &self.headline)?;
        require_text(Self::KIND, "body", &self.body)?;
        require_text(Self::KIND, "cta", &self.cta)
    }
}

// =============================================================================
// Objection Response
// =============================================================================

/// Rebuttal to a customer objection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectionResponse {
    pub rebuttal: String,
    pub psychology: String,
    pub closing_tip: String,
}

impl StructuredArtifact for ObjectionResponse {
    const KIND: &'static str = "objection_response";

    fn schema() -> ResponseSchema {
        ResponseSchema::object(vec![
            Field::string("rebuttal", "La respuesta exacta que el vendedor debe decir."),
            Field::string(
                "psychology",
                "El principio psicológico que hace funcionar la respuesta.",
            ),
            Field::string("closingTip", "Un consejo concreto para cerrar la venta."),
        ])
    }

    fn validate(&self) -> Result<()> {
        require_text(Self::KIND, "rebuttal", &self.rebuttal)?;
        require_text(Self::KIND, "psychology", &self.psychology)?;
        require_text(Self::KIND, "closingTip", &self.closing_tip)
    }
}

// =============================================================================
// Video Script
// =============================================================================

/// One scene of a short video ad
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    pub visual: String,
    pub audio: String,
    pub duration: String,
}

/// Short-form video ad script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoScript {
    pub hook: String,
    pub scenes: Vec<Scene>,
    pub cta: String,
}

impl StructuredArtifact for VideoScript {
    const KIND: &'static str = "video_script";

    fn schema() -> ResponseSchema {
        ResponseSchema::object(vec![
            Field::string("hook", "El gancho de los primeros 3 segundos."),
            Field::object_array(
                "scenes",
                "Las escenas del video en orden.",
                vec![
                    Field::string("visual", "Lo que se ve en pantalla."),
                    Field::string("audio", "La voz o sonido de la escena."),
                    Field::string("duration", "Duración de la escena, ej. '0:03 - 0:08'."),
                ],
            ),
            Field::string("cta", "La llamada a la acción final."),
        ])
    }

    fn validate(&self) -> Result<()> {
        require_text(Self::KIND, "hook", &self.hook)?;
        require_text(Self::KIND, "cta", &self.cta)?;
        if self.scenes.is_empty() {
            return Err(CopyError::malformed(format!(
                "{}: required field 'scenes' is empty",
                Self::KIND
            )));
        }
        for (idx, scene) in self.scenes.iter().enumerate() {
            require_text(Self::KIND, &format!("scenes[{}].visual", idx), &scene.visual)?;
            require_text(Self::KIND, &format!("scenes[{}].audio", idx), &scene.audio)?;
            require_text(Self::KIND, &format!("scenes[{}].duration", idx), &scene.duration)?;
        }
        Ok(())
    }
}

// =============================================================================
// Marketing Pack
// =============================================================================

/// Social post caption generated alongside a pack image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostCaption {
    pub post_text: String,
}

impl StructuredArtifact for PostCaption {
    const KIND: &'static str = "post_caption";

    fn schema() -> ResponseSchema {
        ResponseSchema::object(vec![Field::string(
            "postText",
            "Texto persuasivo para la publicación en redes sociales, con hashtags.",
        )])
    }

    fn validate(&self) -> Result<()> {
        require_text(Self::KIND, "postText", &self.post_text)
    }
}

/// Image plus post text, ready to publish
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketingPack {
    pub image_url: String,
    pub post_text: String,
}

impl MarketingPack {
    pub fn new(image: &MediaAsset, caption: PostCaption) -> Self {
        Self {
            image_url: image.data_url(),
            post_text: caption.post_text,
        }
    }

    /// Decoded image, when `image_url` is a data URL
    pub fn image_media(&self) -> Result<InlineMedia> {
        InlineMedia::from_data_url(&self.image_url)
    }
}

// =============================================================================
// Media
// =============================================================================

/// Binary payload with its MIME type (reference images, inline results)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineMedia {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl InlineMedia {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Load from disk, guessing the MIME type from the extension
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let mime_type = match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("webp") => "image/webp",
            _ => "image/png",
        };
        Ok(Self::new(mime_type, data))
    }

    /// Base64 encoding of the payload
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.data)
    }

    /// Parse a `data:<mime>;base64,<payload>` URL
    pub fn from_data_url(url: &str) -> Result<Self> {
        let (header, payload) = url
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(','))
            .ok_or_else(|| CopyError::malformed("not a data URL"))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| CopyError::malformed("data URL is not base64-encoded"))?;
        let data = BASE64
            .decode(payload.as_bytes())
            .map_err(|e| CopyError::malformed(format!("invalid data URL payload: {}", e)))?;
        Ok(Self::new(mime_type, data))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// Generated image or video
#[derive(Debug, Clone)]
pub struct MediaAsset {
    pub id: Uuid,
    pub kind: MediaKind,
    pub media: InlineMedia,
    pub created_at: DateTime<Utc>,
}

impl MediaAsset {
    pub fn new(kind: MediaKind, media: InlineMedia) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            media,
            created_at: Utc::now(),
        }
    }

    /// `data:` URL usable directly as an image source
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media.mime_type, self.media.to_base64())
    }

    /// File name derived from id and MIME type
    pub fn file_name(&self) -> String {
        let ext = match self.media.mime_type.as_str() {
            "image/jpeg" => "jpg",
            "image/webp" => "webp",
            "video/mp4" => "mp4",
            "video/webm" => "webm",
            _ if self.kind == MediaKind::Video => "mp4",
            _ => "png",
        };
        let prefix = match self.kind {
            MediaKind::Image => "marketing-ad",
            MediaKind::Video => "marketing-video",
        };
        format!("{}-{}.{}", prefix, self.id.simple(), ext)
    }

    /// Write into `dir`, returning the local reference
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        std::fs::write(&path, &self.media.data)?;
        Ok(path)
    }
}

// =============================================================================
// Tagged Union
// =============================================================================

/// Any result a generator can hand back
#[derive(Debug, Clone)]
pub enum GeneratedArtifact {
    Script(SalesScript),
    Pack(MarketingPack),
    Objection(ObjectionResponse),
    VideoScript(VideoScript),
    Media(MediaAsset),
}

impl GeneratedArtifact {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Script(_) => SalesScript::KIND,
            Self::Pack(_) => "marketing_pack",
            Self::Objection(_) => ObjectionResponse::KIND,
            Self::VideoScript(_) => VideoScript::KIND,
            Self::Media(asset) => match asset.kind {
                MediaKind::Image => "image",
                MediaKind::Video => "video",
            },
        }
    }
}

impl From<SalesScript> for GeneratedArtifact {
    fn from(value: SalesScript) -> Self {
        Self::Script(value)
    }
}

impl From<MarketingPack> for GeneratedArtifact {
    fn from(value: MarketingPack) -> Self {
        Self::Pack(value)
    }
}

impl From<ObjectionResponse> for GeneratedArtifact {
    fn from(value: ObjectionResponse) -> Self {
        Self::Objection(value)
    }
}

impl From<VideoScript> for GeneratedArtifact {
    fn from(value: VideoScript) -> Self {
        Self::VideoScript(value)
    }
}

impl From<MediaAsset> for GeneratedArtifact {
    fn from(value: MediaAsset) -> Self {
        Self::Media(value)
    }
}
