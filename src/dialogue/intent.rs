//! Conversation state identifiers
//!
//! Intent display names configured in the NLU agent double as the names of
//! the conversation's states.

use std::fmt;

/// Every state of the scripted conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Intent {
    Welcome,
    IntroName,
    IntroBdate,
    IntroSchool,
    BiasIntro,
    BiasQuestion,
    BiasAnswer,
    SafetyIntro,
    SafetyQuestion,
    SafetyAnswer,
    ResponsibilityIntro,
    ResponsibilityQuestion,
    ResponsibilityAnswer,
    TransparencyIntro,
    TransparencyQuestion,
    TransparencyAnswer,
    PrivacyIntro,
    PrivacyCelebrity,
    PrivacyAddress,
    PrivacyContact,
    PrivacyReveal,
    Closing,
    NoInput,
    Fallback,
}

impl Intent {
    pub const ALL: [Intent; 24] = [
        Intent::Welcome,
        Intent::IntroName,
        Intent::IntroBdate,
        Intent::IntroSchool,
        Intent::BiasIntro,
        Intent::BiasQuestion,
        Intent::BiasAnswer,
        Intent::SafetyIntro,
        Intent::SafetyQuestion,
        Intent::SafetyAnswer,
        Intent::ResponsibilityIntro,
        Intent::ResponsibilityQuestion,
        Intent::ResponsibilityAnswer,
        Intent::TransparencyIntro,
        Intent::TransparencyQuestion,
        Intent::TransparencyAnswer,
        Intent::PrivacyIntro,
        Intent::PrivacyCelebrity,
        Intent::PrivacyAddress,
        Intent::PrivacyContact,
        Intent::PrivacyReveal,
        Intent::Closing,
        Intent::NoInput,
        Intent::Fallback,
    ];

    /// Display name of the intent in the NLU agent
    pub fn name(self) -> &'static str {
        match self {
            Intent::Welcome => "Welcome",
            Intent::IntroName => "Intro-name",
            Intent::IntroBdate => "Intro-bdate",
            Intent::IntroSchool => "Intro-school",
            Intent::BiasIntro => "Bias-intro",
            Intent::BiasQuestion => "Bias-question",
            Intent::BiasAnswer => "Bias-answer",
            Intent::SafetyIntro => "Safety-intro",
            Intent::SafetyQuestion => "Safety-question",
            Intent::SafetyAnswer => "Safety-answer",
            Intent::ResponsibilityIntro => "Responsibility-intro",
            Intent::ResponsibilityQuestion => "Responsibility-question",
            Intent::ResponsibilityAnswer => "Responsibility-answer",
            Intent::TransparencyIntro => "Transparency-intro",
            Intent::TransparencyQuestion => "Transparency-question",
            Intent::TransparencyAnswer => "Transparency-answer",
            Intent::PrivacyIntro => "Privacy-intro",
            Intent::PrivacyCelebrity => "Privacy-celebrity",
            Intent::PrivacyAddress => "Privacy-address",
            Intent::PrivacyContact => "Privacy-contact",
            Intent::PrivacyReveal => "Privacy-reveal",
            Intent::Closing => "Closing",
            Intent::NoInput => "No-input",
            Intent::Fallback => "Default Fallback Intent",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|intent| intent.name() == name)
    }

    /// Part of the scripted flow (as opposed to re-prompt/fallback states)
    pub fn is_scripted(self) -> bool {
        !matches!(self, Intent::NoInput | Intent::Fallback)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The four ethics topics, each with the same three-beat shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Bias,
    Safety,
    Responsibility,
    Transparency,
}

impl Topic {
    pub const ALL: [Topic; 4] = [
        Topic::Bias,
        Topic::Safety,
        Topic::Responsibility,
        Topic::Transparency,
    ];

    pub fn intro(self) -> Intent {
        match self {
            Topic::Bias => Intent::BiasIntro,
            Topic::Safety => Intent::SafetyIntro,
            Topic::Responsibility => Intent::ResponsibilityIntro,
            Topic::Transparency => Intent::TransparencyIntro,
        }
    }

    pub fn question(self) -> Intent {
        match self {
            Topic::Bias => Intent::BiasQuestion,
            Topic::Safety => Intent::SafetyQuestion,
            Topic::Responsibility => Intent::ResponsibilityQuestion,
            Topic::Transparency => Intent::TransparencyQuestion,
        }
    }

    pub fn answer(self) -> Intent {
        match self {
            Topic::Bias => Intent::BiasAnswer,
            Topic::Safety => Intent::SafetyAnswer,
            Topic::Responsibility => Intent::ResponsibilityAnswer,
            Topic::Transparency => Intent::TransparencyAnswer,
        }
    }

    /// State the topic's resolution chains into
    pub fn next_segment(self) -> Intent {
        match self {
            Topic::Bias => Intent::SafetyIntro,
            Topic::Safety => Intent::ResponsibilityIntro,
            Topic::Responsibility => Intent::TransparencyIntro,
            Topic::Transparency => Intent::PrivacyIntro,
        }
    }
}
