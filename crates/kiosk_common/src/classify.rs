//! Problem classification - maps free text to a problem category.
//!
//! Pure substring keyword matching, no I/O. Category lists are tested
//! in a fixed priority order (out-of-scope, non-audiovisual, network,
//! video, audio) and the first list with at least one match wins. The
//! order is a deliberate tie-break inherited from production behavior:
//! a message containing both a heating and an audio keyword is routed
//! to building services. Do not reorder.

use serde::{Deserialize, Serialize};

/// Closed set of problem categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemCategory {
    /// Polite salutation, answered directly.
    Greeting,
    /// Not a problem report at all.
    OutOfScope,
    /// Building issue (heating, plumbing, furniture) - redirected.
    NonAudiovisual,
    /// Network or workstation issue - redirected to IT.
    Network,
    /// Projector, screen, display.
    Video,
    /// Microphones, speakers, sound.
    Audio,
    /// Something is broken but no specific keyword matched.
    GenericTechnical,
    /// Could not classify.
    Unknown,
}

impl std::fmt::Display for ProblemCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Greeting => "greeting",
            Self::OutOfScope => "out_of_scope",
            Self::NonAudiovisual => "non_audiovisual",
            Self::Network => "network",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::GenericTechnical => "generic_technical",
            Self::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

impl ProblemCategory {
    /// French label used in generated ticket text.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Video => "vidéo",
            Self::Audio => "audio",
            Self::Network => "réseau",
            _ => "technique",
        }
    }
}

/// Result of classifying one message. Produced fresh per call, never
/// persisted. Confidence is exposed for observability only; no code
/// path thresholds on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemClassification {
    pub category: ProblemCategory,
    pub confidence: f32,
    pub matched_keywords: Vec<String>,
}

/// Greetings and other chatter the assistant answers but never escalates.
const OUT_OF_SCOPE_KEYWORDS: &[&str] = &[
    "bonjour",
    "salut",
    "hello",
    "merci",
    "au revoir",
    "comment ça va",
    "test",
    "essai",
    "bonsoir",
    "bonne nuit",
];

/// Actual salutations within the out-of-scope list.
const GREETING_KEYWORDS: &[&str] = &["bonjour", "salut", "hello", "bonsoir"];

/// Building-services issues.
const NON_AUDIOVISUAL_KEYWORDS: &[&str] = &[
    "chauffage",
    "climatisation",
    "température",
    "froid",
    "chaud",
    "électricité",
    "prise",
    "interrupteur",
    "lumière",
    "éclairage",
    "plomberie",
    "eau",
    "toilette",
    "lavabo",
    "fuite",
    "fenêtre",
    "porte",
    "serrure",
    "clé",
    "mobilier",
    "table",
    "chaise",
    "bureau",
    "armoire",
];

/// IT-services issues.
const NETWORK_KEYWORDS: &[&str] = &[
    "réseau",
    "wifi",
    "internet",
    "connexion",
    "access",
    "ordinateur",
    "pc",
    "laptop",
    "clavier",
    "souris",
    "imprimante",
    "scanner",
    "login",
    "mot de passe",
    "session",
    "compte",
    "email",
    "courriel",
];

const VIDEO_KEYWORDS: &[&str] = &[
    "projecteur",
    "écran",
    "moniteur",
    "affichage",
    "image",
    "vidéo",
    "visual",
    "projection",
    "display",
    "tv",
];

const AUDIO_KEYWORDS: &[&str] = &[
    "micro",
    "microphone",
    "son",
    "audio",
    "haut-parleur",
    "speaker",
    "volume",
    "sound",
    "acoustique",
    "casque",
];

/// Generic indicators that something is broken, used when no category
/// keyword matched.
const PROBLEM_INDICATORS: &[&str] = &[
    "problème",
    "panne",
    "ne fonctionne pas",
    "ne marche pas",
    "défaillant",
    "en panne",
    "cassé",
    "ne s'allume pas",
    "ne répond pas",
    "dysfonctionnement",
    "bloqué",
    "erreur",
    "bug",
    "défaut",
    "anomalie",
];

/// Classify a free-text problem report. Empty input is out of scope.
pub fn classify(text: &str) -> ProblemClassification {
    let lower = text.to_lowercase();

    if lower.trim().is_empty() {
        return ProblemClassification {
            category: ProblemCategory::OutOfScope,
            confidence: 0.9,
            matched_keywords: Vec::new(),
        };
    }

    // Priority order is observable behavior; see module docs.
    let ordered: &[(ProblemCategory, &[&str])] = &[
        (ProblemCategory::OutOfScope, OUT_OF_SCOPE_KEYWORDS),
        (ProblemCategory::NonAudiovisual, NON_AUDIOVISUAL_KEYWORDS),
        (ProblemCategory::Network, NETWORK_KEYWORDS),
        (ProblemCategory::Video, VIDEO_KEYWORDS),
        (ProblemCategory::Audio, AUDIO_KEYWORDS),
    ];

    for (category, keywords) in ordered {
        let matched: Vec<String> = keywords
            .iter()
            .filter(|k| lower.contains(**k))
            .map(|k| k.to_string())
            .collect();
        if matched.is_empty() {
            continue;
        }

        if *category == ProblemCategory::OutOfScope {
            // Salutations get their own category so the router can
            // answer politely; both stay at the default confidence.
            let category = if GREETING_KEYWORDS.iter().any(|g| lower.contains(g)) {
                ProblemCategory::Greeting
            } else {
                ProblemCategory::OutOfScope
            };
            return ProblemClassification {
                category,
                confidence: 0.9,
                matched_keywords: matched,
            };
        }

        return ProblemClassification {
            category: *category,
            confidence: keyword_confidence(&lower, matched.len()),
            matched_keywords: matched,
        };
    }

    if PROBLEM_INDICATORS.iter().any(|i| lower.contains(i)) {
        return ProblemClassification {
            category: ProblemCategory::GenericTechnical,
            confidence: 0.6,
            matched_keywords: Vec::new(),
        };
    }

    ProblemClassification {
        category: ProblemCategory::OutOfScope,
        confidence: 0.9,
        matched_keywords: Vec::new(),
    }
}

/// More matched keywords and longer messages raise confidence, capped
/// at 0.95.
fn keyword_confidence(text: &str, match_count: usize) -> f32 {
    let word_count = text.split_whitespace().count();
    let mut confidence = (0.4 + 0.2 * match_count as f32).min(0.9);
    if word_count > 10 {
        confidence += 0.1;
    }
    confidence.min(0.95)
}
