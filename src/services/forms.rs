//! Validation of user-entered form fields.
//!
//! Stores trust their input; these helpers are where raw text becomes a
//! [`UserRecord`] or [`UserPatch`].

use crate::models::{Profession, UserPatch, UserRecord};
use crate::{Error, Result};

/// Raw fields of the "new user" form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUserForm {
    /// Name as typed.
    pub name: String,
    /// Contact address as typed.
    pub email: String,
    /// Code as typed; must parse as an integer.
    pub code: String,
    /// Profession name as typed or picked.
    pub profession: String,
}

impl NewUserForm {
    /// Validates every field and builds the record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] naming the first bad field.
    pub fn validate(&self) -> Result<UserRecord> {
        Ok(UserRecord {
            name: required("name", &self.name)?.to_string(),
            email: required("email", &self.email)?.to_string(),
            code: parse_code(&self.code)?,
            profession: parse_profession(&self.profession)?,
        })
    }
}

/// Raw fields of the "edit user" form.
///
/// The code is fixed by the user being edited, so only the other fields are
/// editable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditUserForm {
    /// Name as typed.
    pub name: String,
    /// Contact address as typed.
    pub email: String,
    /// Profession name as typed or picked.
    pub profession: String,
}

impl EditUserForm {
    /// Pre-fills the form from an existing user.
    #[must_use]
    pub fn from_user(user: &UserRecord) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
            profession: user.profession.as_str().to_string(),
        }
    }

    /// Validates every field and builds the patch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] naming the first bad field.
    pub fn validate(&self) -> Result<UserPatch> {
        Ok(UserPatch::new()
            .name(required("name", &self.name)?)
            .email(required("email", &self.email)?)
            .profession(parse_profession(&self.profession)?))
    }
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::InvalidInput(format!("{field} must not be blank")));
    }
    Ok(value)
}

fn parse_code(value: &str) -> Result<i32> {
    required("code", value)?
        .parse()
        .map_err(|_| Error::InvalidInput(format!("code must be an integer, got '{}'", value.trim())))
}

fn parse_profession(value: &str) -> Result<Profession> {
    Profession::parse(required("profession", value)?)
        .ok_or_else(|| Error::InvalidInput(format!("unknown profession '{}'", value.trim())))
}

/// Keeps only users with a positive code and a non-blank name.
#[must_use]
pub fn valid_users(users: &[UserRecord]) -> Vec<UserRecord> {
    users.iter().filter(|user| user.is_valid()).cloned().collect()
}

/// Profession names for a picker, in display order.
#[must_use]
pub fn profession_names() -> Vec<&'static str> {
    Profession::all().iter().map(Profession::as_str).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, email: &str, code: &str, profession: &str) -> NewUserForm {
        NewUserForm {
            name: name.to_string(),
            email: email.to_string(),
            code: code.to_string(),
            profession: profession.to_string(),
        }
    }

    #[test]
    fn test_valid_new_user() {
        let user = form(" Ana ", "ana@example.com", " 7 ", "engineer")
            .validate()
            .unwrap();
        assert_eq!(user, UserRecord::new("Ana", "ana@example.com", 7, Profession::Engineer));
    }

    #[test]
    fn test_blank_fields_are_rejected() {
        for bad in [
            form("", "e", "1", "COACH"),
            form("n", "  ", "1", "COACH"),
            form("n", "e", "", "COACH"),
            form("n", "e", "1", ""),
        ] {
            assert!(matches!(bad.validate(), Err(Error::InvalidInput(_))), "{bad:?}");
        }
    }

    #[test]
    fn test_code_must_be_integer() {
        let err = form("n", "e", "seven", "COACH").validate().unwrap_err();
        assert!(err.to_string().contains("seven"));
    }

    #[test]
    fn test_unknown_profession() {
        let err = form("n", "e", "1", "astronaut").validate().unwrap_err();
        assert!(err.to_string().contains("astronaut"));
    }

    #[test]
    fn test_edit_form_builds_full_patch() {
        let user = UserRecord::new("Ana", "a@b.c", 3, Profession::DayTrader);
        let mut edit = EditUserForm::from_user(&user);
        edit.name = "Ana Maria".to_string();

        let patch = edit.validate().unwrap();
        assert_eq!(patch.code, None);
        assert_eq!(
            user.patched(&patch),
            UserRecord::new("Ana Maria", "a@b.c", 3, Profession::DayTrader)
        );
    }

    #[test]
    fn test_valid_users_filters_invalid() {
        let users = vec![
            UserRecord::new("Ana", "", 1, Profession::Other),
            UserRecord::new("", "", 2, Profession::Other),
            UserRecord::new("Zero", "", 0, Profession::Other),
            UserRecord::default(),
        ];
        assert_eq!(valid_users(&users), vec![users[0].clone()]);
    }

    #[test]
    fn test_profession_names() {
        let names = profession_names();
        assert_eq!(names.len(), Profession::all().len());
        assert!(names.contains(&"DAY_TRADER"));
    }
}
