//! Generation Commands
//!
//! One handler per studio operation. Text artifacts print to stdout (or as
//! JSON with `--format json`); images and videos are written to the output
//! directory and reported by path.
//!
//! Usage:
//!   copyforge script <product> -a <audience> -b <benefit>... [--variants]
//!   copyforge images <description> [--single] [--reference <file>]
//!   copyforge pack <description> [--all]
//!   copyforge objection <text> [--context <product>]
//!   copyforge video-script <product> [--goal <goal>]
//!   copyforge video <product> [--resolution 720p] [--aspect-ratio 16:9]

use std::path::PathBuf;

use serde::Serialize;

use crate::ai::batch::Variant;
use crate::cli::ui::output::Output;
use crate::cli::util::CommandContext;
use crate::types::{
    GeneratedArtifact, GenerationRequest, ImageRequest, InlineMedia, MarketingPack,
    ObjectionRequest, Result, Tone, VideoRequest, VideoScriptRequest,
};

/// `script` arguments
#[derive(Debug, Clone)]
pub struct ScriptArgs {
    pub product: String,
    pub audience: String,
    pub benefits: Vec<String>,
    pub tone: Tone,
    pub context: Option<String>,
    pub variants: bool,
}

/// `images` arguments
#[derive(Debug, Clone)]
pub struct ImageArgs {
    pub description: String,
    pub single: bool,
    pub reference: Option<PathBuf>,
    pub aspect_ratio: Option<String>,
}

/// `video` arguments
#[derive(Debug, Clone)]
pub struct VideoArgs {
    pub product: String,
    pub resolution: Option<String>,
    pub aspect_ratio: Option<String>,
}

fn as_json(format: &str) -> bool {
    format.eq_ignore_ascii_case("json")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn script(ctx: &CommandContext, args: ScriptArgs, format: &str) -> Result<()> {
    let output = Output::new();
    let mut request = GenerationRequest::new(args.product, args.audience, args.benefits, args.tone);
    if let Some(context) = args.context {
        request = request.with_context(context);
    }

    if !args.variants {
        let script = ctx.studio.generate_sales_script(&request).await?;
        return if as_json(format) {
            print_json(&script)
        } else {
            output.artifact(&script.into(), &ctx.output_dir)
        };
    }

    let result = ctx
        .studio
        .generate_script_variants(&request, Variant::script_angles())
        .await?;

    if as_json(format) {
        let scripts: Vec<_> = result.items().collect();
        print_json(&scripts)?;
    } else {
        for (variant, script) in result.successes() {
            output.header(&variant.label);
            output.artifact(&GeneratedArtifact::from(script.clone()), &ctx.output_dir)?;
        }
    }
    output.info(&result.summary());
    Ok(())
}

pub async fn images(ctx: &CommandContext, args: ImageArgs) -> Result<()> {
    let output = Output::new();

    if args.single || args.reference.is_some() {
        let mut request = ImageRequest::new(args.description);
        if let Some(path) = &args.reference {
            request = request.with_reference(InlineMedia::from_file(path)?);
        }
        if let Some(aspect_ratio) = args.aspect_ratio {
            request = request.with_aspect_ratio(aspect_ratio);
        }

        let asset = ctx.studio.generate_image(&request).await?;
        return output.artifact(&asset.into(), &ctx.output_dir);
    }

    let result = ctx.studio.generate_image_variants(&args.description).await?;
    for (variant, asset) in result.successes() {
        output.saved(&variant.label, &asset.write_to(&ctx.output_dir)?);
    }
    output.info(&result.summary());
    Ok(())
}

pub async fn pack(ctx: &CommandContext, description: &str, all: bool, format: &str) -> Result<()> {
    let output = Output::new();

    let packs: Vec<(String, MarketingPack)> = if all {
        let result = ctx.studio.generate_marketing_packs(description).await?;
        output.info(&result.summary());
        result
            .successes()
            .iter()
            .map(|(variant, pack)| (variant.label.clone(), pack.clone()))
            .collect()
    } else {
        vec![(
            "pack".to_string(),
            ctx.studio.generate_marketing_pack(description).await?,
        )]
    };

    if as_json(format) {
        let packs: Vec<_> = packs.iter().map(|(_, pack)| pack).collect();
        return print_json(&packs);
    }

    for (label, pack) in packs {
        output.header(&label);
        output.artifact(&pack.into(), &ctx.output_dir)?;
    }
    Ok(())
}

pub async fn objection(
    ctx: &CommandContext,
    text: String,
    context: Option<String>,
    format: &str,
) -> Result<()> {
    let response = ctx
        .studio
        .handle_objection(&ObjectionRequest::new(text, context))
        .await?;

    if as_json(format) {
        return print_json(&response);
    }
    Output::new().artifact(&response.into(), &ctx.output_dir)
}

pub async fn video_script(
    ctx: &CommandContext,
    product: String,
    goal: Option<String>,
    format: &str,
) -> Result<()> {
    let script = ctx
        .studio
        .generate_video_script(&VideoScriptRequest::new(product, goal))
        .await?;

    if as_json(format) {
        return print_json(&script);
    }
    Output::new().artifact(&script.into(), &ctx.output_dir)
}

pub async fn video(ctx: &CommandContext, args: VideoArgs) -> Result<()> {
    let output = Output::new();
    let request = VideoRequest::new(
        args.product,
        args.resolution
            .unwrap_or_else(|| ctx.config.video.resolution.clone()),
        args.aspect_ratio
            .unwrap_or_else(|| ctx.config.video.aspect_ratio.clone()),
    );

    output.info("Generando video; esto puede tardar varios minutos...");
    let asset = ctx.studio.generate_marketing_video(&request).await?;
    output.artifact(&asset.into(), &ctx.output_dir)
}
