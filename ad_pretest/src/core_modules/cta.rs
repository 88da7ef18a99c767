// THEORY:
// Call-to-action detection works on the OCR words alone. A creative "has a CTA" when
// one of its words contains a known action keyword, compared case-insensitively. The
// first matching word wins. The result is reported next to the scores and never feeds
// into them; the CTA visibility score stays a function of visual noise.

/// Action keywords for German and English creatives.
pub const CTA_KEYWORDS: [&str; 10] = [
    "jetzt",
    "shop",
    "kaufen",
    "mehr",
    "info",
    "anmelden",
    "subscribe",
    "buy",
    "learn",
    "mehr erfahren",
];

/// The OCR word that triggered detection and the keyword it contained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CtaMatch {
    pub word: String,
    pub keyword: &'static str,
}

pub fn detect_cta(words: &[String]) -> Option<CtaMatch> {
    words.iter().find_map(|word| {
        let lowered = word.to_lowercase();
        CTA_KEYWORDS
            .iter()
            .copied()
            .find(|keyword| lowered.contains(keyword))
            .map(|keyword| CtaMatch {
                word: word.clone(),
                keyword,
            })
    })
}
