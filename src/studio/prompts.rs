//! Prompt templates (Spanish, the audience's language)

use crate::ai::batch::Variant;
use crate::constants::image as image_constants;
use crate::types::{GenerationRequest, ObjectionRequest, Tone, VideoScriptRequest};

fn tone_label(tone: Tone) -> &'static str {
    match tone {
        Tone::Professional => "profesional y con autoridad",
        Tone::Aggressive => "directo y agresivo, orientado al cierre",
        Tone::Empathetic => "empático y cercano",
        Tone::Humorous => "divertido e informal",
    }
}

pub fn sales_script(request: &GenerationRequest, variant: Option<&Variant>) -> String {
    let mut prompt = format!(
        "Actúa como un experto mundial en copywriting y psicología de ventas.\n\
         Genera una estructura de ventas altamente persuasiva para el siguiente producto:\n\
         Producto: {}\n\
         Audiencia: {}\n\
         Beneficios: {}\n\
         Tono: {}\n",
        request.product_name.trim(),
        request.target_audience.trim(),
        request.benefits().join(", "),
        tone_label(request.tone),
    );

    if let Some(context) = request.context.as_deref().filter(|c| !c.trim().is_empty()) {
        prompt.push_str(&format!("Contexto adicional: {}\n", context.trim()));
    }
    if let Some(variant) = variant {
        prompt.push_str(&format!("Enfoque persuasivo: {}\n", variant.angle));
    }

    prompt.push_str(
        "\nEl resultado debe estar en español y ser extremadamente convincente, utilizando \
         gatillos mentales de escasez, autoridad y reciprocidad cuando sea apropiado.",
    );
    prompt
}

pub fn ad_image(description: &str) -> String {
    format!(
        "Imagen publicitaria profesional: {}. {}",
        description.trim(),
        image_constants::STYLE_SUFFIX
    )
}

pub fn post_caption(description: &str) -> String {
    format!(
        "Escribe el texto de una publicación para redes sociales que acompañe un anuncio sobre: {}.\n\
         Debe ser persuasivo, estar en español, terminar con una llamada a la acción clara e \
         incluir entre 3 y 5 hashtags relevantes.",
        description.trim()
    )
}

pub fn objection(request: &ObjectionRequest) -> String {
    format!(
        "Actúa como un coach de ventas experto en manejo de objeciones.\n\
         Un cliente potencial dijo: \"{}\"\n\
         Producto / contexto: {}\n\n\
         Escribe la respuesta exacta que el vendedor debe dar, explica el principio psicológico \
         que la hace funcionar y añade un consejo concreto para cerrar la venta. Responde en español.",
        request.objection.trim(),
        request.context.trim()
    )
}

pub fn video_script(request: &VideoScriptRequest) -> String {
    format!(
        "Actúa como un director creativo especializado en anuncios de video cortos \
         (Reels, TikTok, Shorts).\n\
         Crea un guion de entre 15 y 30 segundos para: {}\n\
         Objetivo del video: {}\n\n\
         Incluye un gancho para los primeros 3 segundos, las escenas en orden (qué se ve, qué se \
         escucha y cuánto dura cada una) y una llamada a la acción final. Responde en español.",
        request.product.trim(),
        request.goal.trim()
    )
}

pub fn marketing_video(product: &str) -> String {
    format!(
        "Video publicitario cinematográfico para {}: interfaz de inteligencia artificial en 3D, \
         texturas y reflejos realistas, iluminación de estudio, ritmo dinámico y estética de \
         marketing digital moderno y exitoso. Sin texto en pantalla.",
        product.trim()
    )
}
