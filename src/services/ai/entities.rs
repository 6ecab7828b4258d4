//! Pattern-based entity extraction from a single caller utterance.
//!
//! Each field is extracted independently. Within a field the patterns are
//! tried in order and the first one that matches anywhere wins; its first
//! match is stored verbatim (no date or time normalization).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{EntityField, EntitySet, Intent, ServiceInfo};

static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(monday|tuesday|wednesday|thursday|friday|saturday|sunday)",
        r"(tomorrow|today|next week|this week)",
        r"(\d{1,2}[/-]\d{1,2}[/-]\d{2,4})",
        r"(january|february|march|april|may|june|july|august|september|october|november|december)\s+\d{1,2}",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static TIME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(\d{1,2}:\d{2}\s*(?:am|pm))",
        r"(\d{1,2}\s*(?:am|pm))",
        r"(morning|afternoon|evening)",
        r"(early|late)\s+(morning|afternoon)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4})").unwrap());

static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"my name is ([a-zA-Z\s]+)").unwrap());

pub struct EntityExtractor {
    /// (service id, lower-cased words of its display name), catalog order.
    services: Vec<(String, Vec<String>)>,
}

impl EntityExtractor {
    pub fn new(services: &[ServiceInfo]) -> Self {
        let services = services
            .iter()
            .map(|s| {
                let words = s
                    .name
                    .to_lowercase()
                    .split_whitespace()
                    .map(str::to_string)
                    .collect();
                (s.id.clone(), words)
            })
            .collect();

        Self { services }
    }

    /// Extraction does not currently depend on the intent.
    pub fn extract(&self, utterance: &str, _intent: Intent) -> EntitySet {
        let lower = utterance.to_lowercase();
        let mut entities = EntitySet::new();

        if let Some(date) = first_pattern_match(&DATE_PATTERNS, &lower) {
            entities.insert(EntityField::PreferredDate, date);
        }

        if let Some(time) = first_pattern_match(&TIME_PATTERNS, &lower) {
            entities.insert(EntityField::PreferredTime, time);
        }

        if let Some(service_id) = self.match_service(&lower) {
            entities.insert(EntityField::ServiceType, service_id);
        }

        // Phone numbers are matched against the original casing.
        if let Some(phone) = first_match(&PHONE_PATTERN, utterance) {
            entities.insert(EntityField::PhoneNumber, phone);
        }

        if let Some(name) = first_match(&NAME_PATTERN, &lower) {
            let name = name.trim();
            if !name.is_empty() {
                entities.insert(EntityField::PatientName, name);
            }
        }

        entities
    }

    fn match_service(&self, lower: &str) -> Option<&str> {
        self.services
            .iter()
            .find(|(_, words)| words.iter().any(|w| lower.contains(w.as_str())))
            .map(|(id, _)| id.as_str())
    }
}

fn first_pattern_match(patterns: &[Regex], text: &str) -> Option<String> {
    patterns.iter().find_map(|re| first_match(re, text))
}

/// With exactly one capture group the group is returned, otherwise the
/// whole match.
fn first_match(re: &Regex, text: &str) -> Option<String> {
    let caps = re.captures(text)?;
    let m = if re.captures_len() == 2 {
        caps.get(1)
    } else {
        caps.get(0)
    }?;
    Some(m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PracticeProfile;

    fn extractor() -> EntityExtractor {
        EntityExtractor::new(&PracticeProfile::default().services)
    }

    fn extract(text: &str) -> EntitySet {
        extractor().extract(text, Intent::AppointmentScheduling)
    }

    #[test]
    fn test_scheduling_scenario() {
        let entities = extract("I need to schedule an appointment for tomorrow at 2pm");
        assert_eq!(entities.get(EntityField::PreferredDate), Some("tomorrow"));
        assert_eq!(entities.get(EntityField::PreferredTime), Some("2pm"));
        assert!(!entities.contains(EntityField::ServiceType));
        assert!(!entities.contains(EntityField::PhoneNumber));
        assert!(!entities.contains(EntityField::PatientName));
    }

    #[test]
    fn test_weekday_beats_relative_date() {
        let entities = extract("Not today, maybe Friday");
        assert_eq!(entities.get(EntityField::PreferredDate), Some("friday"));
    }

    #[test]
    fn test_numeric_and_month_dates() {
        assert_eq!(
            extract("could I come on 3/15/2025").get(EntityField::PreferredDate),
            Some("3/15/2025")
        );
        // The month pattern keeps only the captured month name.
        assert_eq!(
            extract("sometime around March 15").get(EntityField::PreferredDate),
            Some("march")
        );
    }

    #[test]
    fn test_time_pattern_order() {
        assert_eq!(
            extract("10:30 am works, or 3pm").get(EntityField::PreferredTime),
            Some("10:30 am")
        );
        assert_eq!(
            extract("I can do 9 AM").get(EntityField::PreferredTime),
            Some("9 am")
        );
        // Part-of-day is tried before "early/late", so the bare word wins.
        assert_eq!(
            extract("early morning is best").get(EntityField::PreferredTime),
            Some("morning")
        );
    }

    #[test]
    fn test_service_matches_any_display_word_in_catalog_order() {
        assert_eq!(
            extract("I'm interested in weight loss").get(EntityField::ServiceType),
            Some("weight_loss")
        );
        assert_eq!(
            extract("something for my mental health").get(EntityField::ServiceType),
            Some("psychiatry")
        );
        // "therapy" is a word of "Peptide Therapy" only.
        assert_eq!(
            extract("do you offer therapy").get(EntityField::ServiceType),
            Some("peptide_therapy")
        );
    }

    #[test]
    fn test_phone_and_name() {
        let entities = extract("My name is Jane Doe, call me at (610) 555-0123");
        assert_eq!(entities.get(EntityField::PhoneNumber), Some("(610) 555-0123"));
        assert_eq!(entities.get(EntityField::PatientName), Some("jane doe"));
    }

    #[test]
    fn test_name_runs_until_non_letter() {
        let entities = extract("my name is john smith and I need help");
        assert_eq!(
            entities.get(EntityField::PatientName),
            Some("john smith and i need help")
        );
    }

    #[test]
    fn test_nothing_found_is_empty() {
        assert!(extract("hello there").is_empty());
    }

    #[test]
    fn test_extraction_is_idempotent_and_intent_independent() {
        let text = "My name is Ana, Tuesday at 4:15 pm for hormone testing, 484.555.1234";
        let ex = extractor();
        let first = ex.extract(text, Intent::AppointmentScheduling);
        let second = ex.extract(text, Intent::AppointmentScheduling);
        let other_intent = ex.extract(text, Intent::BillingInquiry);
        assert_eq!(first, second);
        assert_eq!(first, other_intent);
        assert_eq!(first.len(), 5);
    }

    #[test]
    fn test_custom_catalog() {
        let services = vec![ServiceInfo {
            id: "iv".to_string(),
            name: "IV Hydration".to_string(),
            duration_minutes: 30,
            price: 120,
            description: String::new(),
        }];
        let ex = EntityExtractor::new(&services);
        let entities = ex.extract("I want hydration", Intent::ServiceInquiry);
        assert_eq!(entities.get(EntityField::ServiceType), Some("iv"));
    }
}
