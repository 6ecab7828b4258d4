use anyhow::Context;
use chrono::{Datelike, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use super::intent::Intent;

/// Everything the receptionist knows about the practice it answers for:
/// contact details, the bookable service catalog, and the keyword registry
/// used to score caller intent. Loaded once and owned by each engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeProfile {
    #[serde(default)]
    pub info: PracticeInfo,
    #[serde(default = "default_services")]
    pub services: Vec<ServiceInfo>,
    #[serde(default = "default_intent_keywords")]
    pub intents: Vec<IntentKeywords>,
    /// Phrases that send a caller straight to emergency services before
    /// any classification runs. Matched case-insensitively as substrings.
    #[serde(default = "default_emergency_keywords")]
    pub emergency_keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeInfo {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_phone")]
    pub phone: String,
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_hours")]
    pub hours: String,
    #[serde(default = "default_website")]
    pub website: String,
    /// Dialable number used when a call is handed to reception.
    #[serde(default = "default_transfer_number")]
    pub transfer_number: String,
    #[serde(default = "default_emergency_number")]
    pub emergency_number: String,
    #[serde(default)]
    pub business_hours: BusinessHours,
}

/// Weekly opening window, in the practice's local time. `start` and `end`
/// are both inclusive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BusinessHours {
    pub days: Vec<Weekday>,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            start: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default(),
        }
    }
}

impl BusinessHours {
    pub fn is_open(&self, at: NaiveDateTime) -> bool {
        let time = at.time();
        self.days.contains(&at.weekday()) && self.start <= time && time <= self.end
    }
}

fn default_name() -> String {
    "Lehigh Valley Wellness".to_string()
}

fn default_phone() -> String {
    "(484) 357-1916".to_string()
}

fn default_address() -> String {
    "6081 Hamilton Blvd Suite 600, Allentown, PA 18106".to_string()
}

fn default_hours() -> String {
    "Monday-Friday: 8:00 AM - 6:00 PM".to_string()
}

fn default_website() -> String {
    "lehighvalleywellness.org".to_string()
}

fn default_transfer_number() -> String {
    "+14843571916".to_string()
}

fn default_emergency_number() -> String {
    "911".to_string()
}

impl Default for PracticeInfo {
    fn default() -> Self {
        Self {
            name: default_name(),
            phone: default_phone(),
            address: default_address(),
            hours: default_hours(),
            website: default_website(),
            transfer_number: default_transfer_number(),
            emergency_number: default_emergency_number(),
            business_hours: BusinessHours::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceInfo {
    pub id: String,
    pub name: String,
    pub duration_minutes: u32,
    pub price: u32,
    pub description: String,
}

impl ServiceInfo {
    fn new(id: &str, name: &str, duration_minutes: u32, price: u32, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            duration_minutes,
            price,
            description: description.to_string(),
        }
    }
}

fn default_services() -> Vec<ServiceInfo> {
    vec![
        ServiceInfo::new(
            "psychiatry",
            "Psychiatry & Mental Health",
            60,
            250,
            "Comprehensive mental health care including therapy and psychiatric evaluations",
        ),
        ServiceInfo::new(
            "hormone_optimization",
            "Hormone Optimization",
            45,
            200,
            "Advanced hormone replacement therapy for men and women",
        ),
        ServiceInfo::new(
            "weight_loss",
            "Medical Weight Loss",
            45,
            175,
            "Physician-supervised weight loss programs with personalized coaching",
        ),
        ServiceInfo::new(
            "peptide_therapy",
            "Peptide Therapy",
            30,
            150,
            "FDA-approved peptide treatments for anti-aging and wellness",
        ),
        ServiceInfo::new(
            "wellness_consultation",
            "Wellness Consultation",
            60,
            200,
            "Comprehensive wellness assessments and optimization plans",
        ),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntentKeywords {
    pub intent: Intent,
    pub keywords: Vec<String>,
}

fn keywords(intent: Intent, words: &[&str]) -> IntentKeywords {
    IntentKeywords {
        intent,
        keywords: words.iter().map(|w| w.to_string()).collect(),
    }
}

fn default_intent_keywords() -> Vec<IntentKeywords> {
    vec![
        keywords(
            Intent::AppointmentScheduling,
            &[
                "schedule",
                "appointment",
                "book",
                "available",
                "when can i",
                "need to see",
                "consultation",
                "visit",
                "come in",
            ],
        ),
        keywords(
            Intent::AppointmentModification,
            &[
                "reschedule",
                "cancel",
                "change",
                "move",
                "different time",
                "postpone",
                "earlier",
                "later",
            ],
        ),
        keywords(
            Intent::ServiceInquiry,
            &[
                "what is",
                "tell me about",
                "how much",
                "cost",
                "price",
                "hormone",
                "weight loss",
                "peptide",
                "therapy",
                "treatment",
            ],
        ),
        keywords(
            Intent::BillingInquiry,
            &[
                "bill",
                "payment",
                "insurance",
                "cost",
                "charge",
                "fee",
                "copay",
                "deductible",
                "coverage",
            ],
        ),
        keywords(
            Intent::GeneralInfo,
            &[
                "hours",
                "location",
                "address",
                "phone",
                "contact",
                "directions",
                "parking",
            ],
        ),
        keywords(
            Intent::Emergency,
            &[
                "emergency",
                "urgent",
                "pain",
                "bleeding",
                "chest pain",
                "can't breathe",
                "overdose",
                "suicide",
                "help",
            ],
        ),
    ]
}

fn default_emergency_keywords() -> Vec<String> {
    [
        "emergency",
        "urgent",
        "chest pain",
        "can't breathe",
        "bleeding",
        "overdose",
        "suicide",
        "help me",
    ]
    .iter()
    .map(|w| w.to_string())
    .collect()
}

impl Default for PracticeProfile {
    fn default() -> Self {
        Self {
            info: PracticeInfo::default(),
            services: default_services(),
            intents: default_intent_keywords(),
            emergency_keywords: default_emergency_keywords(),
        }
    }
}

impl PracticeProfile {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a profile from `path`, or falls back to the built-in practice.
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read practice profile: {path}"))?;
                Self::from_json(&raw)
                    .with_context(|| format!("failed to parse practice profile: {path}"))
            }
            None => Ok(Self::default()),
        }
    }

    /// First configured emergency phrase found in `utterance`, if any.
    pub fn emergency_keyword(&self, utterance: &str) -> Option<&str> {
        let lowered = utterance.to_lowercase();
        self.emergency_keywords
            .iter()
            .map(|k| k.trim())
            .find(|k| !k.is_empty() && lowered.contains(&k.to_lowercase()))
    }

    pub fn service(&self, id: &str) -> Option<&ServiceInfo> {
        self.services.iter().find(|s| s.id == id)
    }

    /// Catalog keyed by service id, the shape the generation prompt embeds.
    pub fn catalog_json(&self) -> String {
        let catalog: serde_json::Map<String, serde_json::Value> = self
            .services
            .iter()
            .map(|s| {
                (
                    s.id.clone(),
                    serde_json::json!({
                        "name": s.name,
                        "duration": s.duration_minutes,
                        "price": s.price,
                        "description": s.description,
                    }),
                )
            })
            .collect();
        serde_json::to_string_pretty(&catalog).unwrap_or_default()
    }

    pub fn service_names(&self) -> String {
        let names: Vec<String> = self.services.iter().map(|s| s.name.to_lowercase()).collect();
        match names.split_last() {
            Some((last, rest)) if !rest.is_empty() => format!("{}, and {last}", rest.join(", ")),
            Some((last, _)) => last.clone(),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_follows_intent_order() {
        let profile = PracticeProfile::default();
        let order: Vec<Intent> = profile.intents.iter().map(|k| k.intent).collect();
        assert_eq!(order, Intent::ALL.to_vec());
        assert_eq!(profile.services.len(), 5);
    }

    #[test]
    fn test_from_json_partial_keeps_defaults() {
        let json = r#"{"info":{"name":"Bethlehem Wellness"}}"#;
        let profile = PracticeProfile::from_json(json).unwrap();
        assert_eq!(profile.info.name, "Bethlehem Wellness");
        assert_eq!(profile.info.emergency_number, "911");
        assert_eq!(profile.services.len(), 5);
        assert_eq!(profile.intents.len(), 6);
    }

    #[test]
    fn test_from_json_custom_services() {
        let json = r#"{"services":[{"id":"iv_therapy","name":"IV Hydration","duration_minutes":30,"price":120,"description":"Vitamin infusions"}]}"#;
        let profile = PracticeProfile::from_json(json).unwrap();
        assert_eq!(profile.services.len(), 1);
        assert_eq!(profile.service("iv_therapy").map(|s| s.price), Some(120));
        assert!(profile.service("psychiatry").is_none());
    }

    #[test]
    fn test_catalog_json_keyed_by_id() {
        let profile = PracticeProfile::default();
        let catalog: serde_json::Value = serde_json::from_str(&profile.catalog_json()).unwrap();
        assert_eq!(catalog["peptide_therapy"]["price"], 150);
        assert_eq!(catalog["weight_loss"]["name"], "Medical Weight Loss");
    }

    #[test]
    fn test_emergency_keyword_matching() {
        let profile = PracticeProfile::default();
        assert_eq!(
            profile.emergency_keyword("I'm BLEEDING and need an appointment"),
            Some("bleeding")
        );
        assert_eq!(profile.emergency_keyword("Please help me"), Some("help me"));
        assert_eq!(profile.emergency_keyword("can you help with parking"), None);
        assert_eq!(profile.emergency_keyword("what are your hours"), None);
    }

    #[test]
    fn test_emergency_keywords_from_json() {
        let json = r#"{"emergency_keywords":["stroke", "  "]}"#;
        let profile = PracticeProfile::from_json(json).unwrap();
        assert_eq!(profile.emergency_keyword("I think it's a stroke"), Some("stroke"));
        assert_eq!(profile.emergency_keyword("this is an emergency"), None);
    }

    #[test]
    fn test_business_hours_window() {
        let hours = BusinessHours::default();
        let at = |s: &str| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap();
        // 2024-03-04 is a Monday.
        assert!(hours.is_open(at("2024-03-04 08:00")));
        assert!(hours.is_open(at("2024-03-08 18:00")));
        assert!(!hours.is_open(at("2024-03-04 07:59")));
        assert!(!hours.is_open(at("2024-03-04 18:01")));
        assert!(!hours.is_open(at("2024-03-09 10:00")));
    }

    #[test]
    fn test_business_hours_from_json() {
        let json = r#"{"info":{"business_hours":{"days":["Sat"],"start":"09:00:00","end":"12:00:00"}}}"#;
        let profile = PracticeProfile::from_json(json).unwrap();
        let saturday = NaiveDateTime::parse_from_str("2024-03-09 10:30", "%Y-%m-%d %H:%M").unwrap();
        assert!(profile.info.business_hours.is_open(saturday));
        assert_eq!(profile.info.name, "Lehigh Valley Wellness");
    }

    #[test]
    fn test_load_without_path_uses_builtin() {
        let profile = PracticeProfile::load(None).unwrap();
        assert_eq!(profile.info.name, "Lehigh Valley Wellness");
    }
}
