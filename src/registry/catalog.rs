//! Built-in model catalog

use super::types::{ModelDescriptor, ModelKind, ParameterSpec};

const STANDARD_RATIOS: &[&str] = &["1:1", "16:9", "9:16", "4:3", "3:4", "3:2", "2:3", "5:4", "4:5", "21:9"];

/// The models served when no catalog file is configured
pub fn builtin_models() -> Vec<ModelDescriptor> {
    vec![
        ModelDescriptor {
            id: "fal-ai/nano-banana".to_string(),
            edit_id: Some("fal-ai/nano-banana/edit".to_string()),
            name: "Nano Banana".to_string(),
            kind: ModelKind::TextToImage,
            description: "Fast and cost-effective generation. Edit version will be used when you add a reference image."
                .to_string(),
            base_price_cost: Some(0.004),
            parameters: vec![
                ParameterSpec::text("prompt", "Prompt").required(),
                ParameterSpec::select("aspect_ratio", "Aspect Ratio", STANDARD_RATIOS, "1:1"),
                ParameterSpec::number("num_images", "Number of Images", 1.0),
                ParameterSpec::multi_text("image_urls", "Reference Image (optional)"),
            ],
        },
        ModelDescriptor {
            id: "fal-ai/nano-banana-pro".to_string(),
            edit_id: Some("fal-ai/nano-banana-pro/edit".to_string()),
            name: "Nano Banana Pro".to_string(),
            kind: ModelKind::TextToImage,
            description: "High-quality generation with resolution control. Edit version will be used when reference images are provided."
                .to_string(),
            base_price_cost: Some(0.008),
            parameters: vec![
                ParameterSpec::text("prompt", "Prompt").required(),
                ParameterSpec::select("aspect_ratio", "Aspect Ratio", STANDARD_RATIOS, "1:1"),
                ParameterSpec::select("resolution", "Resolution", &["1K", "2K", "4K"], "1K"),
                ParameterSpec::number("num_images", "Number of Images", 1.0),
                ParameterSpec::boolean("enable_web_search", "Web Search", false)
                    .describe("Use latest web information for generation"),
                ParameterSpec::multi_text("image_urls", "Reference Images (optional)"),
            ],
        },
        ModelDescriptor {
            id: "fal-ai/bytedance/seedream/v4.5/text-to-image".to_string(),
            edit_id: Some("fal-ai/bytedance/seedream/v4.5/edit".to_string()),
            name: "Seedream 4.5".to_string(),
            kind: ModelKind::TextToImage,
            description: "ByteDance's generation model. Edit version will be used when reference images are provided."
                .to_string(),
            base_price_cost: Some(0.012),
            parameters: vec![
                ParameterSpec::text("prompt", "Prompt").required(),
                ParameterSpec::select(
                    "image_size",
                    "Aspect Ratio",
                    &[
                        "square_hd",
                        "square",
                        "portrait_4_3",
                        "portrait_16_9",
                        "landscape_4_3",
                        "landscape_16_9",
                        "auto_2K",
                        "auto_4K",
                    ],
                    "square_hd",
                ),
                ParameterSpec::multi_text("image_urls", "Reference Images (optional)"),
            ],
        },
        ModelDescriptor {
            id: "imagineart/imagineart-1.5-preview/text-to-image".to_string(),
            edit_id: None,
            name: "ImagineArt 1.5".to_string(),
            kind: ModelKind::TextToImage,
            description: "High-fidelity visuals.".to_string(),
            base_price_cost: Some(0.01),
            parameters: vec![
                ParameterSpec::text("prompt", "Prompt").required(),
                ParameterSpec::select(
                    "aspect_ratio",
                    "Aspect Ratio",
                    &["1:1", "16:9", "9:16", "4:3", "3:4", "3:1", "1:3", "3:2", "2:3"],
                    "1:1",
                ),
            ],
        },
        ModelDescriptor {
            id: "fal-ai/gpt-image-1.5".to_string(),
            edit_id: Some("fal-ai/gpt-image-1.5/edit".to_string()),
            name: "GPT Image 1.5".to_string(),
            kind: ModelKind::TextToImage,
            description: "OpenAI GPT Image 1.5 via FAL. Strong prompt adherence, high-fidelity details.".to_string(),
            base_price_cost: Some(0.02),
            parameters: vec![
                ParameterSpec::text("prompt", "Prompt").required(),
                ParameterSpec::select("image_size", "Size", &["1024x1024", "1536x1024", "1024x1536"], "1024x1024"),
                ParameterSpec::select("quality", "Quality", &["low", "medium", "high"], "high"),
                ParameterSpec::select("background", "Background", &["auto", "transparent", "opaque"], "auto"),
                ParameterSpec::multi_text("image_urls", "Reference Images (optional)"),
            ],
        },
    ]
}
