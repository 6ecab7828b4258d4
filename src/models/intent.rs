use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    AppointmentScheduling,
    AppointmentModification,
    ServiceInquiry,
    BillingInquiry,
    GeneralInfo,
    Emergency,
}

impl Intent {
    /// Fixed enumeration order. Keyword-score ties resolve to the earlier entry.
    pub const ALL: [Intent; 6] = [
        Intent::AppointmentScheduling,
        Intent::AppointmentModification,
        Intent::ServiceInquiry,
        Intent::BillingInquiry,
        Intent::GeneralInfo,
        Intent::Emergency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::AppointmentScheduling => "appointment_scheduling",
            Intent::AppointmentModification => "appointment_modification",
            Intent::ServiceInquiry => "service_inquiry",
            Intent::BillingInquiry => "billing_inquiry",
            Intent::GeneralInfo => "general_info",
            Intent::Emergency => "emergency",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Intent::ALL.into_iter().find(|intent| intent.as_str() == s)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EntityField {
    PreferredDate,
    PreferredTime,
    ServiceType,
    PhoneNumber,
    PatientName,
}

impl EntityField {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityField::PreferredDate => "preferred_date",
            EntityField::PreferredTime => "preferred_time",
            EntityField::ServiceType => "service_type",
            EntityField::PhoneNumber => "phone_number",
            EntityField::PatientName => "patient_name",
        }
    }
}

/// Fields pulled out of a single utterance. A missing key means the field
/// was not found; there is no separate "empty" state.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct EntitySet(BTreeMap<EntityField, String>);

impl EntitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: EntityField, value: impl Into<String>) {
        self.0.insert(field, value.into());
    }

    pub fn get(&self, field: EntityField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: EntityField) -> bool {
        self.0.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityField, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Lenient decode for stored rows; malformed JSON yields an empty set.
    pub fn from_json(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_labels_are_verbatim() {
        let labels: Vec<&str> = Intent::ALL.iter().map(|i| i.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "appointment_scheduling",
                "appointment_modification",
                "service_inquiry",
                "billing_inquiry",
                "general_info",
                "emergency",
            ]
        );
        assert_eq!(
            serde_json::to_string(&Intent::BillingInquiry).unwrap(),
            "\"billing_inquiry\""
        );
    }

    #[test]
    fn test_intent_parse_rejects_unknown() {
        assert_eq!(Intent::parse("emergency"), Some(Intent::Emergency));
        assert_eq!(Intent::parse("greeting"), None);
        assert_eq!(Intent::parse("Emergency"), None);
    }

    #[test]
    fn test_entity_set_serializes_present_keys_only() {
        let mut entities = EntitySet::new();
        entities.insert(EntityField::PreferredDate, "tomorrow");
        entities.insert(EntityField::PatientName, "jane doe");

        let json = entities.to_json();
        assert_eq!(json, r#"{"preferred_date":"tomorrow","patient_name":"jane doe"}"#);
        assert_eq!(EntitySet::from_json(&json), entities);
        assert!(!entities.contains(EntityField::ServiceType));
    }

    #[test]
    fn test_entity_set_from_bad_json_is_empty() {
        assert!(EntitySet::from_json("not json").is_empty());
    }
}
