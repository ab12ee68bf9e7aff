//! Generation requests submitted by the caller.
//!
//! Requests are immutable once submitted; generators borrow them.

use serde::{Deserialize, Serialize};

use super::artifact::InlineMedia;
use crate::constants::image as image_constants;

/// Tone of voice for sales copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    /// Professional and authoritative
    #[default]
    Professional,
    /// Aggressive / direct sales
    Aggressive,
    /// Empathetic and close
    Empathetic,
    /// Fun / informal
    Humorous,
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tone::Professional => write!(f, "professional"),
            Tone::Aggressive => write!(f, "aggressive"),
            Tone::Empathetic => write!(f, "empathetic"),
            Tone::Humorous => write!(f, "humorous"),
        }
    }
}

impl std::str::FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "professional" => Ok(Tone::Professional),
            "aggressive" => Ok(Tone::Aggressive),
            "empathetic" => Ok(Tone::Empathetic),
            "humorous" => Ok(Tone::Humorous),
            _ => Err(format!(
                "Unknown tone: {}. Valid values: professional, aggressive, empathetic, humorous",
                s
            )),
        }
    }
}

/// Sales copy request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub product_name: String,
    pub target_audience: String,
    pub key_benefits: Vec<String>,
    pub tone: Tone,
    /// Optional free-text context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl GenerationRequest {
    pub fn new(
        product_name: impl Into<String>,
        target_audience: impl Into<String>,
        key_benefits: Vec<String>,
        tone: Tone,
    ) -> Self {
        Self {
            product_name: product_name.into(),
            target_audience: target_audience.into(),
            key_benefits,
            tone,
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Benefits with blank entries dropped (forms submit empty rows)
    pub fn benefits(&self) -> Vec<&str> {
        self.key_benefits
            .iter()
            .map(|b| b.trim())
            .filter(|b| !b.is_empty())
            .collect()
    }
}

/// Customer objection to rebut
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectionRequest {
    /// What the customer said
    pub objection: String,
    /// Product or context of the sale
    pub context: String,
}

impl ObjectionRequest {
    pub const DEFAULT_CONTEXT: &'static str = "Producto General";

    pub fn new(objection: impl Into<String>, context: Option<String>) -> Self {
        Self {
            objection: objection.into(),
            context: non_blank_or(context, Self::DEFAULT_CONTEXT),
        }
    }
}

/// Short-form video script request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoScriptRequest {
    /// Product or idea
    pub product: String,
    /// Goal of the video (lead capture, flash sale, ...)
    pub goal: String,
}

impl VideoScriptRequest {
    pub const DEFAULT_GOAL: &'static str = "Ventas Directas";

    pub fn new(product: impl Into<String>, goal: Option<String>) -> Self {
        Self {
            product: product.into(),
            goal: non_blank_or(goal, Self::DEFAULT_GOAL),
        }
    }
}

/// Image generation request
#[derive(Debug, Clone)]
pub struct ImageRequest {
    /// Natural-language visual description
    pub description: String,
    /// Optional reference image to guide composition
    pub reference: Option<InlineMedia>,
    /// Aspect ratio hint (e.g. "1:1")
    pub aspect_ratio: String,
}

impl ImageRequest {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            reference: None,
            aspect_ratio: image_constants::DEFAULT_ASPECT_RATIO.to_string(),
        }
    }

    pub fn with_reference(mut self, reference: InlineMedia) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: impl Into<String>) -> Self {
        self.aspect_ratio = aspect_ratio.into();
        self
    }
}

/// Rendered video ad request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRequest {
    pub product: String,
    /// Resolution hint ("720p", "1080p")
    pub resolution: String,
    /// Aspect ratio hint ("16:9", "9:16")
    pub aspect_ratio: String,
    /// Number of videos requested
    pub count: u8,
}

impl VideoRequest {
    pub fn new(
        product: impl Into<String>,
        resolution: impl Into<String>,
        aspect_ratio: impl Into<String>,
    ) -> Self {
        Self {
            product: product.into(),
            resolution: resolution.into(),
            aspect_ratio: aspect_ratio.into(),
            count: 1,
        }
    }
}

fn non_blank_or(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tone_roundtrip_names() {
        assert_eq!("Humorous".parse::<Tone>().unwrap(), Tone::Humorous);
        assert_eq!(Tone::Empathetic.to_string(), "empathetic");
        assert!("sarcastic".parse::<Tone>().is_err());
    }

    #[test]
    fn test_request_json_shape() {
        let json = r#"{"productName":"Curso de Ventas","targetAudience":"Emprendedores","keyBenefits":["Rápido","Económico"],"tone":"professional"}"#;
        let request: GenerationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.product_name, "Curso de Ventas");
        assert_eq!(request.tone, Tone::Professional);
        assert!(request.context.is_none());
    }

    #[test]
    fn test_blank_benefits_dropped() {
        let request = GenerationRequest::new(
            "Curso",
            "Emprendedores",
            vec!["Rápido".into(), "  ".into(), String::new()],
            Tone::Professional,
        );
        assert_eq!(request.benefits(), vec!["Rápido"]);
    }

    #[test]
    fn test_default_contexts() {
        let objection = ObjectionRequest::new("Está muy caro", Some("   ".into()));
        assert_eq!(objection.context, ObjectionRequest::DEFAULT_CONTEXT);

        let script = VideoScriptRequest::new("Zapatos", None);
        assert_eq!(script.goal, VideoScriptRequest::DEFAULT_GOAL);

        let script = VideoScriptRequest::new("Zapatos", Some("Venta flash".into()));
        assert_eq!(script.goal, "Venta flash");
    }
}
