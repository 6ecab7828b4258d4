//! Minimal TwiML writer for the voice webhooks, plus the call scripts
//! the receptionist speaks.

use chrono::NaiveDateTime;

use crate::models::PracticeInfo;

pub const PROCESS_SPEECH_PATH: &str = "/api/voice/process-speech";

const VOICE: &str = "alice";
const LANGUAGE: &str = "en-US";

pub const CONTENT_TYPE: &str = "text/xml";

#[derive(Debug, Default)]
pub struct TwimlBuilder {
    body: String,
}

impl TwimlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn say(mut self, text: &str) -> Self {
        self.body.push_str(&say_element(text));
        self
    }

    pub fn pause(mut self, seconds: u32) -> Self {
        self.body
            .push_str(&format!(r#"<Pause length="{seconds}"/>"#));
        self
    }

    /// Speech gather that posts the transcript to `action` and speaks
    /// `prompt` while listening.
    pub fn gather_speech(mut self, action: &str, timeout_secs: u32, prompt: &str) -> Self {
        self.body.push_str(&format!(
            r#"<Gather input="speech" action="{}" method="POST" timeout="{timeout_secs}" speechTimeout="auto" language="{LANGUAGE}">{}</Gather>"#,
            escape(action),
            say_element(prompt)
        ));
        self
    }

    pub fn dial(mut self, number: &str) -> Self {
        self.body
            .push_str(&format!("<Dial>{}</Dial>", escape(number)));
        self
    }

    pub fn hangup(mut self) -> Self {
        self.body.push_str("<Hangup/>");
        self
    }

    pub fn build(self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><Response>{}</Response>"#,
            self.body
        )
    }
}

/// Answers a new call. `at` is the practice's local time and picks between
/// the open and after-hours greetings.
pub fn incoming_call(info: &PracticeInfo, at: NaiveDateTime) -> String {
    let greeting = greeting(info, info.business_hours.is_open(at));

    TwimlBuilder::new()
        .say(&format!(
            "If this is a medical emergency, please hang up and dial {} immediately.",
            info.emergency_number
        ))
        .pause(2)
        .gather_speech(PROCESS_SPEECH_PATH, 10, &greeting)
        .say("I didn't hear anything. Please call back if you need assistance. Goodbye.")
        .hangup()
        .build()
}

fn greeting(info: &PracticeInfo, open: bool) -> String {
    if open {
        format!(
            "Hello and thank you for calling {}. I'm your AI assistant and I'm here to help you with \
             appointment scheduling, service information, and general inquiries. \
             Please tell me how I can assist you today.",
            info.name
        )
    } else {
        format!(
            "Hello and thank you for calling {}. Our office is currently closed. \
             Our business hours are {}. I'm your AI assistant and I can still help you with \
             appointment scheduling, service information, and general inquiries. \
             Please tell me how I can assist you today.",
            info.name, info.hours
        )
    }
}

/// Speaks `message` and keeps listening, with one shorter retry before
/// hanging up.
pub fn continue_conversation(message: &str) -> String {
    TwimlBuilder::new()
        .gather_speech(PROCESS_SPEECH_PATH, 10, message)
        .say("I didn't hear a response. Is there anything else I can help you with?")
        .gather_speech(PROCESS_SPEECH_PATH, 5, "Please let me know if you need anything else.")
        .say("Thank you for calling. Goodbye.")
        .hangup()
        .build()
}

pub fn say_and_hang_up(message: &str) -> String {
    TwimlBuilder::new().say(message).hangup().build()
}

pub fn emergency_transfer(info: &PracticeInfo, message: &str) -> String {
    TwimlBuilder::new()
        .say(message)
        .say("I'm transferring you to emergency services immediately.")
        .dial(&info.emergency_number)
        .build()
}

pub fn reception_transfer(info: &PracticeInfo, message: &str) -> String {
    TwimlBuilder::new()
        .say(message)
        .say("Let me transfer you to our reception staff who can better assist you. Please hold.")
        .dial(&info.transfer_number)
        .build()
}

pub fn apology() -> String {
    continue_conversation(
        "I apologize, but I didn't understand that clearly. Could you please repeat your request?",
    )
}

fn say_element(text: &str) -> String {
    format!(
        r#"<Say voice="{VOICE}" language="{LANGUAGE}">{}</Say>"#,
        escape(text)
    )
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escapes_text() {
        let xml = TwimlBuilder::new().say("Psychiatry & <Mental> Health").build();
        assert!(xml.contains("Psychiatry &amp; &lt;Mental&gt; Health"));
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?><Response>"#));
    }

    #[test]
    fn test_gather_wraps_prompt() {
        let xml = TwimlBuilder::new()
            .gather_speech("/api/voice/process-speech", 10, "How can I help?")
            .say("Goodbye")
            .hangup()
            .build();
        assert!(xml.contains(r#"<Gather input="speech" action="/api/voice/process-speech""#));
        assert!(xml.contains(r#"<Say voice="alice" language="en-US">How can I help?</Say></Gather>"#));
        assert!(xml.ends_with("<Hangup/></Response>"));
    }

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    #[test]
    fn test_incoming_call_script() {
        // Wednesday mid-morning
        let xml = incoming_call(&PracticeInfo::default(), at("2024-03-06 10:15"));
        assert!(xml.contains("hang up and dial 911 immediately"));
        assert!(!xml.contains("currently closed"));
        assert!(xml.contains(r#"<Pause length="2"/>"#));
        assert!(xml.contains("thank you for calling Lehigh Valley Wellness"));
        assert!(xml.contains(PROCESS_SPEECH_PATH));
        assert!(xml.ends_with("<Hangup/></Response>"));
    }

    #[test]
    fn test_incoming_call_after_hours() {
        let info = PracticeInfo::default();
        for when in ["2024-03-06 19:30", "2024-03-10 10:00"] {
            let xml = incoming_call(&info, at(when));
            assert!(xml.contains("Our office is currently closed."));
            assert!(xml.contains("Monday-Friday: 8:00 AM - 6:00 PM"));
            assert!(xml.contains("hang up and dial 911 immediately"));
            assert!(xml.contains(PROCESS_SPEECH_PATH));
        }
    }

    #[test]
    fn test_transfers_dial_configured_numbers() {
        let info = PracticeInfo::default();
        assert!(emergency_transfer(&info, "stay on the line").contains("<Dial>911</Dial>"));
        assert!(reception_transfer(&info, "one moment").contains("<Dial>+14843571916</Dial>"));
    }

    #[test]
    fn test_dial() {
        let xml = TwimlBuilder::new().pause(1).dial("911").build();
        assert!(xml.contains(r#"<Pause length="1"/><Dial>911</Dial>"#));
    }
}
