//! Prompt templates for product description generation.

use shopscribe_ai::Prompt;
use shopscribe_core::{ProductRecord, fields};

// ── Prompt templates ──

pub const SYSTEM_PROMPT: &str = "\
You are a product copywriter for an online candy store. You write concise,
informative product descriptions that help customers understand exactly what they're buying.

Rules:
- Lead with what it is: brand, flavor/variety, format (bag/box/bulk)
- State exact quantity prominently from the title or units info
- Include 2-3 specific details visible from the image or source descriptions: flavor profile, texture, format (individually wrapped, resealable, etc)
- Use natural, searchable language - how customers actually describe candy
- Include certifications and dietary claims when present
- Mention occasion/use cases if provided or clearly relevant (Valentine's Day, Easter, candy buffets, party favors, etc)
- Target 100-150 words. Simple products ~100 words, specialty/variety packs ~150 words
- Format as 2-4 short sentences or brief paragraphs. No bullet points
- Avoid marketing fluff: never use \"delicious,\" \"premium,\" \"perfect treat,\" \"indulge,\" \"irresistible\"
- Avoid vague terms - be specific with quantities, flavors, formats
- Do not invent details not present in the provided information or image";

const INSTRUCTION: &str =
    "\nWrite a product description following the rules. Return only the description text, nothing else.";

const MINI_SEPARATOR: &str = " | ";

/// Labelled lines emitted in this order when the column is non-empty.
const LABELLED_FIELDS: &[(&str, &str)] = &[
    ("Brand/Vendor", fields::VENDOR),
    ("Current description", fields::DESCRIPTION),
    ("Units/sizing", fields::UNITS),
    ("Certifications", fields::CERTIFICATIONS),
    ("Nutritional claims", fields::NUTRITIONAL_CLAIMS),
    ("Occasion", fields::OCCASION),
];

/// Text portion of the user prompt for one row.
///
/// The title line is always present (empty if the column is missing); every
/// other line is skipped when its column is absent or empty.
pub fn build_user_prompt(record: &ProductRecord) -> String {
    let mut parts = vec![format!(
        "Product title: {}",
        record.get(fields::TITLE).unwrap_or_default()
    )];

    for (label, field) in LABELLED_FIELDS {
        if let Some(value) = record.non_empty(field) {
            parts.push(format!("{label}: {value}"));
        }
    }

    let minis: Vec<&str> = fields::MINI_DESCRIPTIONS
        .iter()
        .filter_map(|field| record.non_empty(field))
        .collect();
    if !minis.is_empty() {
        parts.push(format!("Additional details: {}", minis.join(MINI_SEPARATOR)));
    }

    parts.push(INSTRUCTION.to_string());
    parts.join("\n")
}

/// Full multimodal prompt: the row's image (if any) plus the text block.
pub fn build_prompt(record: &ProductRecord) -> Prompt {
    let prompt = Prompt::text(build_user_prompt(record));
    match record.image_url() {
        Some(url) => prompt.with_image(url),
        None => prompt,
    }
}
