//! User record types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Profession categories a user can pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Profession {
    /// Video creator.
    Youtuber,
    /// Plays games, possibly for a living.
    Gamer,
    /// Trades intraday.
    DayTrader,
    /// Coaches people or teams.
    Coach,
    /// Social media influencer.
    Influencer,
    /// Builds things.
    Engineer,
    /// Anything not listed above.
    #[default]
    Other,
}

impl Profession {
    /// Returns all profession variants, in picker order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Youtuber,
            Self::Gamer,
            Self::DayTrader,
            Self::Coach,
            Self::Influencer,
            Self::Engineer,
            Self::Other,
        ]
    }

    /// Returns the stored name of the profession.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Youtuber => "YOUTUBER",
            Self::Gamer => "GAMER",
            Self::DayTrader => "DAY_TRADER",
            Self::Coach => "COACH",
            Self::Influencer => "INFLUENCER",
            Self::Engineer => "ENGINEER",
            Self::Other => "OTHER",
        }
    }

    /// Parses a profession name, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().replace(['-', ' '], "_").as_str() {
            "YOUTUBER" => Some(Self::Youtuber),
            "GAMER" => Some(Self::Gamer),
            "DAY_TRADER" | "DAYTRADER" => Some(Self::DayTrader),
            "COACH" => Some(Self::Coach),
            "INFLUENCER" => Some(Self::Influencer),
            "ENGINEER" => Some(Self::Engineer),
            "OTHER" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for Profession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted user.
///
/// `code` is the identifier in list-capable backends. Single-record backends
/// store exactly one user and treat `code` as an ordinary attribute.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserRecord {
    /// Display name.
    pub name: String,
    /// Contact address (the nickname field in older layouts).
    pub email: String,
    /// Numeric identifier.
    pub code: i32,
    /// Profession category.
    pub profession: Profession,
}

impl UserRecord {
    /// Creates a new user record.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        code: i32,
        profession: Profession,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            code,
            profession,
        }
    }

    /// Returns true if the record has a positive code and a non-blank name.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.code > 0 && !self.name.trim().is_empty()
    }

    /// Returns a copy with every field set in `patch` replaced.
    #[must_use]
    pub fn patched(&self, patch: &UserPatch) -> Self {
        Self {
            name: patch.name.clone().unwrap_or_else(|| self.name.clone()),
            email: patch.email.clone().unwrap_or_else(|| self.email.clone()),
            code: patch.code.unwrap_or(self.code),
            profession: patch.profession.unwrap_or(self.profession),
        }
    }
}

impl fmt::Display for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} <{}> ({})",
            self.code, self.name, self.email, self.profession
        )
    }
}

/// A partial update to a user record.
///
/// Fields left as `None` keep their current value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserPatch {
    /// New name.
    pub name: Option<String>,
    /// New contact address.
    pub email: Option<String>,
    /// New code. List backends use it to locate the record instead.
    pub code: Option<i32>,
    /// New profession.
    pub profession: Option<Profession>,
}

impl UserPatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the contact address.
    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the code.
    #[must_use]
    pub const fn code(mut self, code: i32) -> Self {
        self.code = Some(code);
        self
    }

    /// Sets the profession.
    #[must_use]
    pub const fn profession(mut self, profession: Profession) -> Self {
        self.profession = Some(profession);
        self
    }

    /// Returns true if no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.code.is_none()
            && self.profession.is_none()
    }
}

impl From<&UserRecord> for UserPatch {
    fn from(user: &UserRecord) -> Self {
        Self {
            name: Some(user.name.clone()),
            email: Some(user.email.clone()),
            code: Some(user.code),
            profession: Some(user.profession),
        }
    }
}
