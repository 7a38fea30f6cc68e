use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identifier of one setting in the registry.
///
/// Ids are opaque dotted names (`cache.force_uri`). The catalog of valid ids
/// is owned by the registry; this type only enforces shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct SettingId(String);

impl SettingId {
    pub fn new(id: String) -> Option<Self> {
        if id.is_empty() || id.len() > 100 {
            None
        } else {
            Some(Self(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for SettingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SettingId {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string()).ok_or_else(|| anyhow::anyhow!("Invalid setting ID"))
    }
}

impl From<&str> for SettingId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Persistence scope of a stored option value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum SettingScope {
    Global,
    Network,
}

/// Tenant identifier, used only for primary-site reads in network mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct SiteId(pub u64);

impl std::fmt::Display for SiteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for SiteId {
    /// The primary site.
    fn default() -> Self {
        Self(1)
    }
}

/// Resolved value of one setting.
///
/// A setting declared with a `Bool` default and a multi-switch cardinality
/// may legitimately hold an `Int` above 1 (state cycling); every other
/// setting stays on its declared variant after coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<String>),
}

impl SettingValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Str(_) => "str",
            Self::List(_) => "list",
        }
    }

    /// Numeric view of a switch-like value. `Bool` maps to 0/1, multi-switch
    /// settings report their stored state, everything else is 0.
    pub fn as_switch(&self) -> i64 {
        match self {
            Self::Bool(b) => i64::from(*b),
            Self::Int(n) => *n,
            Self::Str(_) | Self::List(_) => 0,
        }
    }

    /// True when the switch is in its plain "on" state (exactly 1).
    pub fn is_on(&self) -> bool {
        self.as_switch() == 1
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl std::fmt::Display for SettingValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

/// Uncoerced input to the update pipeline.
///
/// Values arrive from admin forms and the batch command surface as loosely
/// typed data; the registry entry's default decides how each raw value is
/// coerced into a [`SettingValue`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<String>),
}

impl From<bool> for RawValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Vec<String>> for RawValue {
    fn from(v: Vec<String>) -> Self {
        Self::List(v)
    }
}

impl From<&SettingValue> for RawValue {
    fn from(v: &SettingValue) -> Self {
        match v {
            SettingValue::Bool(b) => Self::Bool(*b),
            SettingValue::Int(n) => Self::Int(*n),
            SettingValue::Str(s) => Self::Str(s.clone()),
            SettingValue::List(items) => Self::List(items.clone()),
        }
    }
}

impl RawValue {
    /// Loose truthiness in the tradition of form input handling: empty
    /// strings, `"0"` and the literal `"false"` are false, everything else
    /// with content is true.
    pub fn truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int(n) => *n != 0,
            Self::Str(s) => {
                let s = s.trim();
                !(s.is_empty() || s == "0" || s == "false")
            }
            Self::List(items) => !items.is_empty(),
        }
    }

    /// Integer view with form-input semantics: unparseable text degrades to
    /// its leading integer, or 0.
    pub fn to_i64(&self) -> i64 {
        match self {
            Self::Bool(b) => i64::from(*b),
            Self::Int(n) => *n,
            Self::Str(s) => leading_i64(s),
            Self::List(_) => 0,
        }
    }
}

fn leading_i64(s: &str) -> i64 {
    let s = s.trim();
    let mut end = 0;
    for (i, c) in s.char_indices() {
        if c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+')) {
            end = i + c.len_utf8();
        } else {
            break;
        }
    }
    s[..end].parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setting_id_rejects_empty_and_oversized() {
        assert!(SettingId::new(String::new()).is_none());
        assert!(SettingId::new("x".repeat(101)).is_none());
        assert!(SettingId::new("cache".to_string()).is_some());
    }

    #[test]
    fn switch_views() {
        assert_eq!(SettingValue::Bool(true).as_switch(), 1);
        assert_eq!(SettingValue::Int(2).as_switch(), 2);
        assert!(!SettingValue::Int(2).is_on());
        assert!(SettingValue::Int(1).is_on());
        assert_eq!(SettingValue::Str("x".into()).as_switch(), 0);
    }

    #[test]
    fn raw_truthiness() {
        assert!(!RawValue::from("false").truthy());
        assert!(!RawValue::from("0").truthy());
        assert!(!RawValue::from("").truthy());
        assert!(RawValue::from("1").truthy());
        assert!(RawValue::from("yes").truthy());
    }

    #[test]
    fn raw_integer_degrades_like_form_input() {
        assert_eq!(RawValue::from("42abc").to_i64(), 42);
        assert_eq!(RawValue::from("-7").to_i64(), -7);
        assert_eq!(RawValue::from("abc").to_i64(), 0);
        assert_eq!(RawValue::from(true).to_i64(), 1);
    }

    #[test]
    fn value_serde_is_untagged() {
        let v: SettingValue = serde_json::from_str("[\"a\",\"b\"]").unwrap();
        assert_eq!(v, SettingValue::List(vec!["a".into(), "b".into()]));
        let v: SettingValue = serde_json::from_str("604800").unwrap();
        assert_eq!(v, SettingValue::Int(604800));
    }
}
