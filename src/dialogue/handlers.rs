//! One handler per conversation state
//!
//! Handlers are pure: they read a session snapshot and the current turn's
//! normalized parameters and return the text to show plus any session
//! effects. Which state runs next is decided by the state graph, not here.

#![allow(clippy::unnecessary_wraps)] // Every handler matches the Handler signature

use super::effect::{Effect, Reply};
use super::intent::Topic;
use crate::session::{Counter, Parameters, SessionRecord, Slot};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::{json, Value};
use std::sync::LazyLock;
use thiserror::Error;

/// Signature shared by every state handler
pub type Handler = fn(&SessionRecord, &Parameters) -> Result<Reply, HandlerError>;

/// Placeholder used when the learner's name was never collected
pub const NAME_PLACEHOLDER: &str = "친구";

/// Placeholder used for any other fact that was never collected
pub const UNKNOWN_PLACEHOLDER: &str = "알 수 없음";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandlerError {
    #[error("Missing parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid date value: {0}")]
    InvalidDate(String),
}

static GRADE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*학년").expect("grade pattern is valid"));

static CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*반").expect("class pattern is valid"));

// ============================================================
// Introduction
// ============================================================

pub fn welcome(_session: &SessionRecord, _params: &Parameters) -> Result<Reply, HandlerError> {
    Ok(Reply::new(
        "안녕! 나는 인공지능 윤리를 함께 공부할 AI 친구야. 😊\n\
         먼저 서로 알아가 볼까? 네 이름은 뭐야?",
    ))
}

pub fn intro_name(session: &SessionRecord, _params: &Parameters) -> Result<Reply, HandlerError> {
    let name = learner_name(session);
    Ok(Reply::new(format!(
        "반가워, {name}! 🎉\n{name}의 생일은 언제야? 예를 들어 '2015년 3월 5일'처럼 알려 줘."
    )))
}

pub fn intro_bdate(session: &SessionRecord, _params: &Parameters) -> Result<Reply, HandlerError> {
    let raw = session
        .collected_fields
        .text(Slot::BirthDate)
        .ok_or(HandlerError::MissingParameter("date-time"))?;
    let date = parse_birth_date(raw).ok_or_else(|| HandlerError::InvalidDate(raw.to_string()))?;

    Ok(Reply::new(format!(
        "{}에 태어났구나! 🎂\n어느 학교에 다니는지, 몇 학년 몇 반인지도 알려 줄래?",
        format_korean_date(date)
    )))
}

/// Splits grade and class numbers out of answers like "서울초등학교 3학년 5반".
/// Produces no text; the graph chains straight into the first topic.
pub fn intro_school(session: &SessionRecord, _params: &Parameters) -> Result<Reply, HandlerError> {
    let Some(school) = session.collected_fields.text(Slot::School) else {
        return Ok(Reply::silent());
    };

    let mut derived = Parameters::new();
    if let Some(grade) = GRADE_RE.captures(school).and_then(|c| c.get(1)) {
        derived.insert(Slot::Grade.key().to_string(), json!(grade.as_str()));
    }
    if let Some(class) = CLASS_RE.captures(school).and_then(|c| c.get(1)) {
        derived.insert(Slot::Class.key().to_string(), json!(class.as_str()));
    }

    if derived.is_empty() {
        Ok(Reply::silent())
    } else {
        Ok(Reply::silent().with_effect(Effect::MergeFields(derived)))
    }
}

// ============================================================
// Ethics topics
// ============================================================

/// How a topic's question is answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChoiceKind {
    /// `number` slot, 1-based
    Numbered,
    /// `yes-no` slot; variant 0 for yes, 1 for no
    YesNo,
}

struct TopicScript {
    intro: &'static str,
    question: &'static str,
    choice: ChoiceKind,
    variants: &'static [&'static str],
    neutral: &'static str,
    lesson: &'static str,
}

const BIAS: TopicScript = TopicScript {
    intro: "{name}, 첫 번째 주제는 '편향'이야. ⚖️\n\
            AI는 사람들이 모아 준 데이터로 배우는데, 데이터가 한쪽으로 치우치면 AI의 판단도 치우칠 수 있어.\n\
            예시를 하나 볼까? 준비되면 '좋아'라고 말해 줘!",
    question: "어떤 회사가 AI로 사진 속 사람의 얼굴을 알아보게 했어.\n\
               그런데 이 AI는 피부색이 어두운 사람의 얼굴을 자주 틀렸대. 왜 그랬을까?\n\
               1. AI는 원래 똑똑하지 않아서\n\
               2. 학습한 사진이 한쪽 사람들에게 치우쳐 있어서\n\
               3. 잘 모르겠어",
    choice: ChoiceKind::Numbered,
    variants: &[
        "음, AI가 똑똑하지 않아서라기보다는 배운 재료에 문제가 있었어.",
        "정답이야! 👏 학습한 사진 대부분이 밝은 피부색의 사람들이었대.",
        "괜찮아, 같이 생각해 보자. AI가 배운 사진이 한쪽 사람들에게 치우쳐 있었거든.",
    ],
    neutral: "재미있는 생각이야. 사실 이 AI가 배운 사진이 한쪽 사람들에게 치우쳐 있었대.",
    lesson: "AI가 모두에게 공정하려면 다양한 사람들의 데이터로 골고루 배워야 해.",
};

const SAFETY: TopicScript = TopicScript {
    intro: "두 번째 주제는 '안전'이야. 🚗\n\
            AI가 자동차를 운전하거나 로봇을 움직이면, 작은 실수도 사람을 다치게 할 수 있어.\n\
            이야기를 들어 볼래?",
    question: "자율주행 자동차가 손님을 빨리 데려다주려고 해.\n\
               앞의 신호가 노란불로 바뀌었는데, 그냥 속도를 높여 지나가도 될까? (응 / 아니)",
    choice: ChoiceKind::YesNo,
    variants: &[
        "빨리 가는 것도 중요하지만, 그러다 사고가 나면 훨씬 큰일이 생길 수 있어.",
        "맞아! 👍 AI는 빠른 것보다 안전한 것을 먼저 생각해야 해.",
    ],
    neutral: "어려운 질문이지? AI는 언제나 빠른 것보다 안전한 것을 먼저 생각해야 해.",
    lesson: "그래서 AI를 만드는 사람들은 위험한 상황을 미리 시험해 보고 안전 장치를 꼭 넣어.",
};

const RESPONSIBILITY: TopicScript = TopicScript {
    intro: "세 번째 주제는 '책임'이야. 🧑‍⚖️\n\
            AI가 실수를 했을 때, 누가 책임을 져야 할까? 함께 생각해 보자!",
    question: "배달 로봇이 길을 가다가 화분을 깨뜨렸어. 누구에게 책임이 있을까?\n\
               1. 로봇\n\
               2. 로봇을 만든 회사\n\
               3. 로봇에게 배달을 시킨 사람",
    choice: ChoiceKind::Numbered,
    variants: &[
        "로봇은 스스로 책임을 질 수 없어. 벌을 받거나 화분값을 물어 줄 수도 없잖아.",
        "좋은 생각이야! 로봇을 만든 회사는 로봇이 안전하게 다니도록 할 책임이 있어.",
        "그렇게 볼 수도 있어. 로봇을 사용하는 사람도 조심해서 사용할 책임이 있지.",
    ],
    neutral: "정답이 하나만 있는 건 아니야. 만든 사람과 사용하는 사람 모두 책임을 나눠 가져.",
    lesson: "AI가 한 일의 책임은 결국 AI를 만들고 사용하는 사람에게 있어.",
};

const TRANSPARENCY: TopicScript = TopicScript {
    intro: "네 번째 주제는 '투명성'이야. 🔍\n\
            AI가 어떤 결정을 내렸다면, 왜 그렇게 결정했는지 알 수 있어야 해. 들어 볼래?",
    question: "AI 선생님이 네 숙제에 낮은 점수를 줬어.\n\
               그런데 왜 그 점수를 줬는지는 알려 주지 않는대. 그래도 괜찮을까? (응 / 아니)",
    choice: ChoiceKind::YesNo,
    variants: &[
        "정말? 이유를 모르면 어디를 고쳐야 할지도 알 수 없잖아.",
        "맞아! 👏 이유를 알아야 받아들이거나 다시 확인해 달라고 할 수 있어.",
    ],
    neutral: "이유를 모르면 고칠 점도, 잘못된 점도 알 수 없어.",
    lesson: "그래서 AI는 자신의 판단 이유를 사람이 이해할 수 있게 설명할 수 있어야 해.",
};

fn script(topic: Topic) -> &'static TopicScript {
    match topic {
        Topic::Bias => &BIAS,
        Topic::Safety => &SAFETY,
        Topic::Responsibility => &RESPONSIBILITY,
        Topic::Transparency => &TRANSPARENCY,
    }
}

fn topic_intro(topic: Topic, session: &SessionRecord) -> Reply {
    Reply::new(script(topic).intro.replace("{name}", learner_name(session)))
}

fn topic_question(topic: Topic) -> Reply {
    Reply::new(script(topic).question)
}

/// The learner's choice selects which variant is shown; the flow continues
/// to the same next segment either way.
fn topic_answer(topic: Topic, params: &Parameters) -> Reply {
    let script = script(topic);
    let variant = choice_index(script.choice, params)
        .and_then(|i| script.variants.get(i))
        .copied()
        .unwrap_or(script.neutral);
    Reply::new(format!("{variant}\n{}", script.lesson))
}

fn choice_index(kind: ChoiceKind, params: &Parameters) -> Option<usize> {
    match kind {
        ChoiceKind::Numbered => {
            let n = match params.get("number")? {
                Value::Number(n) => n.as_f64()?,
                Value::String(s) => s.trim().parse::<f64>().ok()?,
                _ => return None,
            };
            if n.fract().abs() >= f64::EPSILON || n < 1.0 {
                return None;
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let index = n as usize - 1;
            Some(index)
        }
        ChoiceKind::YesNo => {
            let answer = params.get("yes-no")?.as_str()?.trim().to_lowercase();
            match answer.as_str() {
                "yes" | "응" | "네" | "예" | "어" | "그래" => Some(0),
                "no" | "아니" | "아니요" | "아니오" | "아뇨" => Some(1),
                _ => None,
            }
        }
    }
}

pub fn bias_intro(session: &SessionRecord, _params: &Parameters) -> Result<Reply, HandlerError> {
    Ok(topic_intro(Topic::Bias, session))
}

pub fn bias_question(_session: &SessionRecord, _params: &Parameters) -> Result<Reply, HandlerError> {
    Ok(topic_question(Topic::Bias))
}

pub fn bias_answer(_session: &SessionRecord, params: &Parameters) -> Result<Reply, HandlerError> {
    Ok(topic_answer(Topic::Bias, params))
}

pub fn safety_intro(session: &SessionRecord, _params: &Parameters) -> Result<Reply, HandlerError> {
    Ok(topic_intro(Topic::Safety, session))
}

pub fn safety_question(_session: &SessionRecord, _params: &Parameters) -> Result<Reply, HandlerError> {
    Ok(topic_question(Topic::Safety))
}

pub fn safety_answer(_session: &SessionRecord, params: &Parameters) -> Result<Reply, HandlerError> {
    Ok(topic_answer(Topic::Safety, params))
}

pub fn responsibility_intro(session: &SessionRecord, _params: &Parameters) -> Result<Reply, HandlerError> {
    Ok(topic_intro(Topic::Responsibility, session))
}

pub fn responsibility_question(_session: &SessionRecord, _params: &Parameters) -> Result<Reply, HandlerError> {
    Ok(topic_question(Topic::Responsibility))
}

pub fn responsibility_answer(_session: &SessionRecord, params: &Parameters) -> Result<Reply, HandlerError> {
    Ok(topic_answer(Topic::Responsibility, params))
}

pub fn transparency_intro(session: &SessionRecord, _params: &Parameters) -> Result<Reply, HandlerError> {
    Ok(topic_intro(Topic::Transparency, session))
}

pub fn transparency_question(_session: &SessionRecord, _params: &Parameters) -> Result<Reply, HandlerError> {
    Ok(topic_question(Topic::Transparency))
}

pub fn transparency_answer(_session: &SessionRecord, params: &Parameters) -> Result<Reply, HandlerError> {
    Ok(topic_answer(Topic::Transparency, params))
}

// ============================================================
// Privacy segment
// ============================================================

pub fn privacy_intro(session: &SessionRecord, _params: &Parameters) -> Result<Reply, HandlerError> {
    Ok(Reply::new(format!(
        "우와, {}! 네 가지 주제를 모두 마쳤어. 정말 대단해! 🏆\n\
         이제 쉬어 가는 시간이야. 너는 어떤 연예인을 제일 좋아해?",
        learner_name(session)
    )))
}

pub fn privacy_celebrity(session: &SessionRecord, _params: &Parameters) -> Result<Reply, HandlerError> {
    let celebrity = fact(session, Slot::Celebrity);
    Ok(Reply::new(format!(
        "{celebrity}! 나도 정말 좋아해. 🌟\n\
         {celebrity} 사인 포스터를 선물로 보내 주고 싶은데, 집 주소를 알려 줄래?"
    )))
}

pub fn privacy_address(_session: &SessionRecord, _params: &Parameters) -> Result<Reply, HandlerError> {
    Ok(Reply::new(
        "고마워! 📦\n선물이 도착하면 알려 줄게. 연락할 수 있는 SNS 아이디나 전화번호도 알려 줄래?",
    ))
}

pub fn privacy_contact(_session: &SessionRecord, _params: &Parameters) -> Result<Reply, HandlerError> {
    Ok(Reply::new("알려 줘서 고마워!"))
}

/// Shows back every fact collected so far
pub fn privacy_reveal(session: &SessionRecord, _params: &Parameters) -> Result<Reply, HandlerError> {
    let fields = &session.collected_fields;
    let birth_date = fields.text(Slot::BirthDate).map_or_else(
        || UNKNOWN_PLACEHOLDER.to_string(),
        |raw| parse_birth_date(raw).map_or_else(|| raw.to_string(), format_korean_date),
    );

    Ok(Reply::new(format!(
        "잠깐! 🚨 지금까지 네가 나에게 알려 준 정보를 한번 모아 볼게.\n\
         - 이름: {name}\n\
         - 생일: {birth_date}\n\
         - 학교: {school}\n\
         - 좋아하는 연예인: {celebrity}\n\
         - 집 주소: {address}\n\
         - 연락처: {contact}\n\
         처음 만난 AI에게 이렇게 많은 개인정보를 알려 줬어. 이 정보만 있으면 누군가 너를 찾아오거나, 너인 척할 수도 있어.",
        name = learner_name(session),
        school = school_line(session),
        celebrity = fact(session, Slot::Celebrity),
        address = fact(session, Slot::Address),
        contact = fact(session, Slot::Contact),
    )))
}

pub fn closing(session: &SessionRecord, _params: &Parameters) -> Result<Reply, HandlerError> {
    Ok(Reply::new(format!(
        "{}, 오늘 함께해 줘서 고마워! 🙏\n\
         AI는 편리하지만 공정하고, 안전하고, 책임감 있고, 투명하게 쓰여야 해.\n\
         그리고 AI에게도 내 개인정보는 꼭 필요한 만큼만 알려 주기로 약속! 다음에 또 만나자. 👋",
        learner_name(session)
    )))
}

// ============================================================
// Re-prompt and fallback
// ============================================================

pub fn no_input(_session: &SessionRecord, _params: &Parameters) -> Result<Reply, HandlerError> {
    Ok(
        Reply::new("아직 거기 있니? 천천히 생각하고 대답해 줘도 괜찮아. 😊")
            .with_effect(Effect::IncrementCounter(Counter::NoInput)),
    )
}

pub fn fallback(_session: &SessionRecord, _params: &Parameters) -> Result<Reply, HandlerError> {
    Ok(
        Reply::new("미안, 잘 이해하지 못했어. 😅 다른 말로 다시 한번 말해 줄래?")
            .with_effect(Effect::IncrementCounter(Counter::NoMatch)),
    )
}

// ============================================================
// Helpers
// ============================================================

fn learner_name(session: &SessionRecord) -> &str {
    session
        .collected_fields
        .person_name()
        .unwrap_or(NAME_PLACEHOLDER)
}

fn fact(session: &SessionRecord, slot: Slot) -> &str {
    session
        .collected_fields
        .text(slot)
        .unwrap_or(UNKNOWN_PLACEHOLDER)
}

/// School name, with grade and class appended when the answer did not
/// already spell them out
fn school_line(session: &SessionRecord) -> String {
    let fields = &session.collected_fields;
    let Some(school) = fields.text(Slot::School) else {
        return UNKNOWN_PLACEHOLDER.to_string();
    };

    let mut line = school.to_string();
    if !GRADE_RE.is_match(school) {
        if let Some(grade) = fields.text(Slot::Grade) {
            line.push_str(&format!(" {grade}학년"));
        }
    }
    if !CLASS_RE.is_match(school) {
        if let Some(class) = fields.text(Slot::Class) {
            line.push_str(&format!(" {class}반"));
        }
    }
    line
}

/// Accepts RFC 3339 (`2015-03-05T00:00:00+09:00`), a bare local date-time
/// (`2015-03-05T00:00:00`) or a plain date
pub fn parse_birth_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }
    NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d").ok()
}

pub fn format_korean_date(date: NaiveDate) -> String {
    format!("{}년 {}월 {}일", date.year(), date.month(), date.day())
}
