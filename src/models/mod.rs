pub mod call;
pub mod intent;
pub mod practice;

pub use call::{
    Call, CallAnalytics, CallDirection, CallStatus, ConsultationRequest, ConversationTurn,
    IntentCount, NewCall, NewTurn, Speaker, TransferDecision,
};
pub use intent::{EntityField, EntitySet, Intent};
pub use practice::{IntentKeywords, PracticeInfo, PracticeProfile, ServiceInfo};
