pub mod ai;
pub mod calls;
pub mod receptionist;
pub mod telephony;
pub mod twiml;
