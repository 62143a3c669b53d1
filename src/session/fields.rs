//! Typed view of the facts collected during a conversation

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Slot values attached to one intent-detection result, keyed by slot name
pub type Parameters = Map<String, Value>;

/// A named entity as reported by the NLU agent (`{"name": "..."}`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedEntity {
    pub name: String,
}

/// Slots the conversation knows how to read back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Person,
    BirthDate,
    School,
    Grade,
    Class,
    Celebrity,
    Address,
    Contact,
}

impl Slot {
    pub const ALL: [Slot; 8] = [
        Slot::Person,
        Slot::BirthDate,
        Slot::School,
        Slot::Grade,
        Slot::Class,
        Slot::Celebrity,
        Slot::Address,
        Slot::Contact,
    ];

    /// Parameter name used by the NLU agent
    pub fn key(self) -> &'static str {
        match self {
            Slot::Person => "person",
            Slot::BirthDate => "date-time",
            Slot::School => "school",
            Slot::Grade => "grade",
            Slot::Class => "class",
            Slot::Celebrity => "celebrity",
            Slot::Address => "address",
            Slot::Contact => "contact",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.key() == key)
    }
}

/// Facts collected across the turns of one session.
///
/// Known slots are typed; anything else the agent extracts is kept verbatim
/// in `extra`. A value that does not fit its slot's type is also kept in
/// `extra` under the slot name, so the latest value for a name is never lost.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollectedFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person: Option<Vec<NamedEntity>>,
    #[serde(rename = "date-time", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub celebrity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl CollectedFields {
    /// Merge a (normalized) parameter bag. Only names present in `params`
    /// are touched.
    pub fn merge(&mut self, params: Parameters) {
        for (key, value) in params {
            self.set(&key, value);
        }
    }

    pub fn set(&mut self, key: &str, value: Value) {
        let Some(slot) = Slot::from_key(key) else {
            self.extra.insert(key.to_string(), value);
            return;
        };

        self.clear(slot);
        if self.assign(slot, &value) {
            self.extra.remove(key);
        } else {
            self.extra.insert(key.to_string(), value);
        }
    }

    /// Current value stored under a parameter name, typed or not
    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.extra.get(key) {
            return Some(value.clone());
        }
        let slot = Slot::from_key(key)?;
        match slot {
            Slot::Person => self
                .person
                .as_ref()
                .and_then(|p| serde_json::to_value(p).ok()),
            _ => self.text(slot).map(|s| Value::String(s.to_string())),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Every parameter name with a stored value
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Slot::ALL
            .into_iter()
            .filter(|slot| self.contains(slot.key()))
            .map(|slot| slot.key().to_string())
            .collect();
        for key in self.extra.keys() {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
        keys
    }

    /// First name in the person list
    pub fn person_name(&self) -> Option<&str> {
        self.person
            .as_ref()
            .and_then(|people| people.first())
            .map(|p| p.name.as_str())
            .filter(|name| !name.is_empty())
    }

    /// Text value of a string-typed slot
    pub fn text(&self, slot: Slot) -> Option<&str> {
        let value = match slot {
            Slot::Person => return self.person_name(),
            Slot::BirthDate => &self.birth_date,
            Slot::School => &self.school,
            Slot::Grade => &self.grade,
            Slot::Class => &self.class,
            Slot::Celebrity => &self.celebrity,
            Slot::Address => &self.address,
            Slot::Contact => &self.contact,
        };
        value.as_deref()
    }

    fn clear(&mut self, slot: Slot) {
        match slot {
            Slot::Person => self.person = None,
            Slot::BirthDate => self.birth_date = None,
            Slot::School => self.school = None,
            Slot::Grade => self.grade = None,
            Slot::Class => self.class = None,
            Slot::Celebrity => self.celebrity = None,
            Slot::Address => self.address = None,
            Slot::Contact => self.contact = None,
        }
    }

    /// Store `value` in the typed field for `slot`; false if it does not fit
    fn assign(&mut self, slot: Slot, value: &Value) -> bool {
        if slot == Slot::Person {
            return match serde_json::from_value::<Vec<NamedEntity>>(value.clone()) {
                Ok(people) => {
                    self.person = Some(people);
                    true
                }
                Err(_) => false,
            };
        }

        let text = match slot {
            Slot::BirthDate => date_text(value),
            Slot::Grade | Slot::Class => number_text(value),
            _ => value.as_str().map(str::to_string),
        };
        let Some(text) = text else {
            return false;
        };

        let field = match slot {
            Slot::BirthDate => &mut self.birth_date,
            Slot::School => &mut self.school,
            Slot::Grade => &mut self.grade,
            Slot::Class => &mut self.class,
            Slot::Celebrity => &mut self.celebrity,
            Slot::Address => &mut self.address,
            Slot::Contact => &mut self.contact,
            Slot::Person => return false,
        };
        *field = Some(text);
        true
    }
}

/// Date-time slots arrive either as a string or as an object wrapping one
fn date_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => ["date_time", "startDateTime", "startDate", "date"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_str))
            .map(str::to_string),
        _ => None,
    }
}

/// Grade/class numbers arrive as JSON numbers (`3.0`) or strings
fn number_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => n
            .as_u64()
            .map(|v| v.to_string())
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract().abs() < f64::EPSILON && *f >= 0.0)
                    .map(|f| format!("{f:.0}"))
            }),
        _ => None,
    }
}
