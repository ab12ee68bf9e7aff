use std::path::Path;

use console::style;

use crate::ai::batch::BatchProgress;
use crate::types::{
    GeneratedArtifact, MarketingPack, MediaAsset, MediaKind, ObjectionResponse, Result,
    SalesScript, VideoScript,
};

pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn header(&self, message: &str) {
        println!("\n{}", style(message).bold().underlined());
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    /// One line per completed batch variant (stderr, so stdout stays clean)
    pub fn progress(&self, progress: &BatchProgress) {
        eprintln!(
            "{} [{}/{}] {} ({} ok)",
            style("…").dim(),
            progress.completed,
            progress.total,
            progress.label,
            progress.succeeded
        );
    }

    pub fn saved(&self, label: &str, path: &Path) {
        self.success(&format!("{}: {}", label, path.display()));
    }

    /// Render any artifact; media is written into `dir` and reported by path
    pub fn artifact(&self, artifact: &GeneratedArtifact, dir: &Path) -> Result<()> {
        match artifact {
            GeneratedArtifact::Script(script) => self.script(script),
            GeneratedArtifact::Objection(response) => self.objection(response),
            GeneratedArtifact::VideoScript(script) => self.video_script(script),
            GeneratedArtifact::Pack(pack) => self.pack(pack, dir)?,
            GeneratedArtifact::Media(asset) => self.media(asset, dir)?,
        }
        Ok(())
    }

    fn media(&self, asset: &MediaAsset, dir: &Path) -> Result<()> {
        let label = match asset.kind {
            MediaKind::Image => "Imagen",
            MediaKind::Video => "Video",
        };
        self.saved(label, &asset.write_to(dir)?);
        Ok(())
    }

    fn pack(&self, pack: &MarketingPack, dir: &Path) -> Result<()> {
        self.media(&MediaAsset::new(MediaKind::Image, pack.image_media()?), dir)?;
        println!("{}", pack.post_text);
        Ok(())
    }

    pub fn script(&self, script: &SalesScript) {
        println!("{}", style(&script.headline).bold().cyan());
        println!();
        println!("{}", script.body);
        println!();
        println!("{} {}", style("→").green().bold(), style(&script.cta).bold());
    }

    pub fn objection(&self, response: &ObjectionResponse) {
        self.section("Respuesta");
        println!("{}", response.rebuttal);
        self.section("Psicología");
        println!("{}", response.psychology);
        self.section("Consejo de cierre");
        println!("{}", response.closing_tip);
    }

    pub fn video_script(&self, script: &VideoScript) {
        self.section("Gancho");
        println!("{}", script.hook);

        for (idx, scene) in script.scenes.iter().enumerate() {
            self.section(&format!("Escena {} ({})", idx + 1, scene.duration));
            println!("{} {}", style("Visual:").dim(), scene.visual);
            println!("{} {}", style("Audio:").dim(), scene.audio);
        }

        self.section("Llamada a la acción");
        println!("{}", script.cta);
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InlineMedia, PostCaption};
    use tempfile::TempDir;

    fn png() -> MediaAsset {
        MediaAsset::new(MediaKind::Image, InlineMedia::new("image/png", vec![1, 2, 3]))
    }

    #[test]
    fn test_media_artifact_written_to_dir() {
        let dir = TempDir::new().unwrap();
        let asset = png();
        let expected = dir.path().join(asset.file_name());

        Output::new()
            .artifact(&asset.into(), dir.path())
            .unwrap();

        assert_eq!(std::fs::read(expected).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_pack_artifact_decodes_image() {
        let dir = TempDir::new().unwrap();
        let pack = MarketingPack::new(
            &png(),
            PostCaption {
                post_text: "Aprende a vender #ventas".into(),
            },
        );

        Output::new()
            .artifact(&GeneratedArtifact::from(pack), dir.path())
            .unwrap();

        let written: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(written.len(), 1);
    }
}
