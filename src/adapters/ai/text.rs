//! Text helpers around the assistant: term detection on the way in, citation
//! and disclaimer cleanup on the way out.

use regex::Regex;
use std::sync::LazyLock;

/// Abbreviations recognised in questions, with their expansion.
pub const MEDICAL_TERMS: &[(&str, &str)] = &[
    ("HTN", "Hypertension"),
    ("DM", "Diabetes Mellitus"),
    ("MI", "Myocardial Infarction"),
    ("CVA", "Stroke"),
    ("COPD", "Chronic Obstructive Pulmonary Disease"),
];

static ABBREVIATIONS: LazyLock<Vec<(Regex, String)>> = LazyLock::new(|| {
    MEDICAL_TERMS
        .iter()
        .filter_map(|(abbr, full)| {
            let re = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(abbr))).ok()?;
            Some((re, format!("{} ({})", abbr, full)))
        })
        .collect()
});

static SYMPTOMS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\b(pain|ache)\b",
        r"(?i)\b(fever|temperature)\b",
        r"(?i)\bcough\b",
        r"(?i)\bdizz(y|iness)\b",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s)"]+"#).expect("valid URL regex"));

static URL_DOMAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://(?:www\.)?([^/]+)").expect("valid domain regex"));

static DISCLAIMERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(I am not a doctor|This is not medical advice|consult with a healthcare professional|cannot provide personalized medical diagnosis)",
    )
    .expect("valid disclaimer regex")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Abbreviations (expanded) and symptom words found in `text`, without duplicates.
pub fn extract_medical_terms(text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for (re, label) in ABBREVIATIONS.iter() {
        if re.is_match(text) && !found.contains(label) {
            found.push(label.clone());
        }
    }
    for re in SYMPTOMS.iter() {
        if let Some(m) = re.find(text) {
            let term = m.as_str().to_string();
            if !found.contains(&term) {
                found.push(term);
            }
        }
    }
    found
}

/// `domain (url)` for every URL in `text`, in order of appearance.
pub fn extract_citations(text: &str) -> Vec<String> {
    URL.find_iter(text)
        .filter_map(|m| {
            let url = m.as_str();
            let domain = URL_DOMAIN.captures(url)?.get(1)?.as_str();
            Some(format!("{} ({})", domain, url))
        })
        .collect()
}

/// Move raw URLs into a trailing "Sources:" list, drop stock disclaimers and
/// collapse whitespace.
pub fn clean_response(raw: &str) -> String {
    let citations = extract_citations(raw);
    let mut text = raw.to_string();
    if !citations.is_empty() {
        text = URL.replace_all(&text, "").into_owned();
        text.push_str("\n\nSources:\n");
        text.push_str(&citations.join("\n"));
    }
    let text = DISCLAIMERS.replace_all(&text, "");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_abbreviations_word_bounded() {
        let terms = extract_medical_terms("My htn and DM are fine, but MIND the gap");
        assert_eq!(
            terms,
            vec![
                "HTN (Hypertension)".to_string(),
                "DM (Diabetes Mellitus)".to_string()
            ]
        );
    }

    #[test]
    fn detects_symptoms_as_written() {
        let terms = extract_medical_terms("Fever since Monday and I feel dizzy");
        assert!(terms.contains(&"Fever".to_string()));
        assert!(terms.contains(&"dizzy".to_string()));
        assert!(extract_medical_terms("painting the fence").is_empty());
    }

    #[test]
    fn citations_keep_domain_and_url() {
        let c = extract_citations("See https://www.nhs.uk/conditions/asthma/ and (http://cdc.gov/flu).");
        assert_eq!(
            c,
            vec![
                "nhs.uk (https://www.nhs.uk/conditions/asthma/)".to_string(),
                "cdc.gov (http://cdc.gov/flu)".to_string()
            ]
        );
    }

    #[test]
    fn clean_moves_urls_and_strips_disclaimers() {
        let raw = "Drink water.  I am not a doctor.\nMore at https://who.int/water";
        let out = clean_response(raw);
        assert!(!out.contains("I am not a doctor"));
        assert!(out.starts_with("Drink water."));
        assert!(out.contains("Sources: who.int (https://who.int/water)"));
        // The bare URL only survives inside the sources list.
        assert_eq!(out.matches("https://who.int/water").count(), 1);
    }

    #[test]
    fn clean_plain_text_only_collapses_whitespace() {
        assert_eq!(clean_response("  a \n\n b  "), "a b");
    }
}
