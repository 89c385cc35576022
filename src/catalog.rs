//! Built-in prompt library and FAQ content

use crate::models::{FaqEntry, Prompt, PromptCategory};

const IMAGE_BASE: &str =
    "https://storage.googleapis.com/aistudio-hosting/generative-ai-for-developers/rupveda/prompt-library";

// (title, description, prompt, image file)
type Entry = (&'static str, &'static str, &'static str, &'static str);

const CLASSIC_STYLES: &[Entry] = &[
    (
        "Mughal Miniature",
        "Elegant and detailed royal portrait.",
        "A portrait in the style of a classic Mughal miniature painting, with intricate details and a regal background.",
        "mughal-miniature.jpg",
    ),
    (
        "Rajasthani Folk Art",
        "Vibrant colors and bold lines.",
        "An avatar in the style of vibrant Rajasthani folk art, with large expressive eyes and traditional attire.",
        "rajasthani-folk.jpg",
    ),
    (
        "Kerala Mural",
        "Divine figures, rich colors.",
        "A divine avatar in the style of a Kerala mural painting, with rich ochre, red, and green tones.",
        "kerala-mural.jpg",
    ),
    (
        "Pattachitra Scroll",
        "Mythological storytelling art.",
        "A character portrait in the iconic Pattachitra style from Odisha, with bold outlines and mythological themes.",
        "pattachitra-scroll.jpg",
    ),
    (
        "Bollywood Poster",
        "Dramatic and cinematic look.",
        "A dramatic and colorful vintage Bollywood movie poster look from the 1970s.",
        "bollywood-poster.jpg",
    ),
    (
        "Simple Mehndi Overlay",
        "Elegant henna patterns.",
        "A beautiful portrait with a delicate and simple mehndi (henna) design overlay on the face and hands.",
        "mehndi-overlay.jpg",
    ),
];

const MODERN_FUSION: &[Entry] = &[
    (
        "Cyber-Vedic Warrior",
        "Sci-fi meets ancient India.",
        "A futuristic cyber-Vedic warrior with neon armor, glowing mandala tattoos, and traditional Indian motifs.",
        "cyber-vedic.jpg",
    ),
    (
        "Diwali Glow",
        "Festive and luminous.",
        "A portrait illuminated by the warm glow of Diwali diyas, with festive lights and ethnic wear.",
        "diwali-glow.jpg",
    ),
    (
        "Holi Color Splash",
        "Explosion of vibrant colors.",
        "A joyful portrait with a dynamic splash of vibrant Holi festival colors.",
        "holi-splash.jpg",
    ),
    (
        "Truck Art Pop",
        "Kitsch and colorful design.",
        "A pop art portrait in the style of Indian truck art, with kitschy motifs, a bright color palette, and bold typography.",
        "truck-art.jpg",
    ),
    (
        "Bollywood Bling",
        "Glamorous and sparkling.",
        "A glamorous Bollywood star with sparkling jewelry, designer lehenga, and cinematic lighting.",
        "bollywood-bling.jpg",
    ),
    (
        "Block Print Aesthetic",
        "Textile art-inspired portrait.",
        "A stylized portrait using the aesthetics of Indian block printing, with repeating patterns and earthy tones.",
        "block-print.jpg",
    ),
];

const MYTHICAL_FANTASY: &[Entry] = &[
    (
        "Epic Mahabharata Hero",
        "A legendary warrior avatar.",
        "An epic avatar of a legendary warrior from the Mahabharata, with ornate armor and divine weapons.",
        "mahabharata-hero.jpg",
    ),
    (
        "Apsara Celestial Being",
        "Ethereal and graceful.",
        "An ethereal and graceful Apsara (celestial nymph) adorned with divine jewelry and surrounded by a heavenly aura.",
        "apsara.jpg",
    ),
    (
        "Naga Guardian",
        "Mystical serpent protector.",
        "A mystical Naga guardian, half-human half-serpent, with glowing scales and ancient jewels.",
        "naga-guardian.jpg",
    ),
    (
        "Forest Deity (Vanara)",
        "Connected with nature.",
        "A powerful forest deity inspired by Vanaras, with features blending human and monkey, wise and connected to nature.",
        "vanara.jpg",
    ),
    (
        "Rakshasa Royalty",
        "Powerful and imposing.",
        "A powerful and imposing Rakshasa king or queen, with regal yet fearsome features and opulent, dark attire.",
        "rakshasa.jpg",
    ),
    (
        "Peacock Spirit",
        "The national bird of India.",
        "A majestic avatar inspired by the peacock, with iridescent feathers, a royal crown, and graceful posture.",
        "peacock-spirit.jpg",
    ),
];

const FAQ: &[(&str, &str)] = &[
    (
        "How does the AI avatar generation work?",
        "Our AI uses a powerful generative model. You provide a photo and a text prompt, and the AI analyzes the style of your prompt to create a new, unique image based on your photo. The more descriptive your prompt, the better the result!",
    ),
    (
        "What kind of photos should I upload?",
        "For best results, use a clear, well-lit, front-facing portrait photo. High-resolution images work better than blurry or low-quality ones. Avoid photos with sunglasses or heavy shadows on the face.",
    ),
    (
        "Is my data safe?",
        "We take your privacy seriously. Uploaded images are used only for the generation process and are not stored on our servers. All your generation history and preferences are stored locally on your device.",
    ),
    (
        "Can I use the generated avatars commercially?",
        "The rights to the generated images depend on the terms of service of the underlying AI model. Please refer to the Gemini API terms for detailed information on commercial usage.",
    ),
];

fn category(name: &str, entries: &[Entry]) -> PromptCategory {
    PromptCategory {
        name: name.to_string(),
        prompts: entries
            .iter()
            .map(|(title, description, prompt, image)| Prompt {
                title: title.to_string(),
                description: description.to_string(),
                prompt: prompt.to_string(),
                image_url: Some(format!("{}/{}", IMAGE_BASE, image)),
            })
            .collect(),
    }
}

pub fn prompt_categories() -> Vec<PromptCategory> {
    vec![
        category("Classic Styles", CLASSIC_STYLES),
        category("Modern & Fusion", MODERN_FUSION),
        category("Mythical & Fantasy", MYTHICAL_FANTASY),
    ]
}

pub fn faq_entries() -> Vec<FaqEntry> {
    FAQ.iter()
        .map(|(question, answer)| FaqEntry {
            question: question.to_string(),
            answer: answer.to_string(),
        })
        .collect()
}
