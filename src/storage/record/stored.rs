//! On-disk shapes of the structured record files.

use crate::models::{Profession, UserRecord};
use serde::{Deserialize, Serialize};

/// Profession as written to the structured files.
///
/// Unlike [`Profession`] it has an explicit "never set" value, which is what
/// a freshly created file holds. Unknown names read as [`Self::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoredProfession {
    /// Never set.
    #[default]
    Unspecified,
    /// Video creator.
    Youtuber,
    /// Gamer.
    Gamer,
    /// Day trader.
    DayTrader,
    /// Coach.
    Coach,
    /// Influencer.
    Influencer,
    /// Engineer.
    Engineer,
    /// Anything else.
    #[serde(other)]
    Other,
}

impl StoredProfession {
    /// Maps to the domain profession. Unspecified reads as [`Profession::Other`].
    #[must_use]
    pub const fn to_profession(self) -> Profession {
        match self {
            Self::Youtuber => Profession::Youtuber,
            Self::Gamer => Profession::Gamer,
            Self::DayTrader => Profession::DayTrader,
            Self::Coach => Profession::Coach,
            Self::Influencer => Profession::Influencer,
            Self::Engineer => Profession::Engineer,
            Self::Unspecified | Self::Other => Profession::Other,
        }
    }
}

impl From<Profession> for StoredProfession {
    fn from(profession: Profession) -> Self {
        match profession {
            Profession::Youtuber => Self::Youtuber,
            Profession::Gamer => Self::Gamer,
            Profession::DayTrader => Self::DayTrader,
            Profession::Coach => Self::Coach,
            Profession::Influencer => Self::Influencer,
            Profession::Engineer => Self::Engineer,
            Profession::Other => Self::Other,
        }
    }
}

/// A user as written to the structured files.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredUser {
    /// Display name.
    pub name: String,
    /// Contact address.
    pub email: String,
    /// Numeric code.
    pub code: i32,
    /// Profession, possibly unspecified.
    pub profession: StoredProfession,
}

impl StoredUser {
    /// Converts to the domain record.
    #[must_use]
    pub fn to_record(&self) -> UserRecord {
        UserRecord {
            name: self.name.clone(),
            email: self.email.clone(),
            code: self.code,
            profession: self.profession.to_profession(),
        }
    }
}

impl From<&UserRecord> for StoredUser {
    fn from(user: &UserRecord) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
            code: user.code,
            profession: user.profession.into(),
        }
    }
}

/// The single-record file: one user plus migration state.
///
/// The user's fields sit at the top level of the file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredProfile {
    /// The stored user.
    #[serde(flatten)]
    pub user: StoredUser,
    /// Set once the legacy store has been copied in. Kept across clears.
    pub legacy_migrated: bool,
}

/// The list file: users in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredUsers {
    /// Stored users.
    pub users: Vec<StoredUser>,
}

impl StoredUsers {
    /// Converts every entry to a domain record.
    #[must_use]
    pub fn to_records(&self) -> Vec<UserRecord> {
        self.users.iter().map(StoredUser::to_record).collect()
    }

    /// Index of the first user with `code`.
    #[must_use]
    pub fn position(&self, code: i32) -> Option<usize> {
        self.users.iter().position(|user| user.code == code)
    }
}
