//! Validated text types shared across the bioethics workspace.
//!
//! Identifiers arrive from forms, REST paths and CLI arguments. These wrappers
//! trim and check them once at the boundary so the rest of the code can rely on
//! the invariants without re-validating.

/// Maximum length, in characters, of a case or user identifier.
pub const MAX_IDENTIFIER_LEN: usize = 128;

/// Errors that can occur when creating validated text types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
    /// The input exceeded the maximum identifier length
    #[error("Text exceeds maximum length of {max} characters")]
    TooLong { max: usize },
    /// The input contained control characters (newlines, tabs, NUL, ...)
    #[error("Text must not contain control characters")]
    ControlCharacter,
}

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText`, rejecting input that is empty after trimming.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the owned string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

fn identifier(input: &str) -> Result<String, TextError> {
    let text = NonEmptyText::new(input)?;
    if text.as_str().chars().count() > MAX_IDENTIFIER_LEN {
        return Err(TextError::TooLong {
            max: MAX_IDENTIFIER_LEN,
        });
    }
    if text.as_str().chars().any(char::is_control) {
        return Err(TextError::ControlCharacter);
    }
    Ok(text.into_inner())
}

/// Identifier of a bioethical case (clinical history number or generated id).
///
/// Case ids are chosen by the clinician, so any printable text is accepted.
/// Storage never uses the raw id as a path component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CaseId(String);

impl CaseId {
    /// Validates a user-supplied case id.
    ///
    /// # Errors
    ///
    /// Returns [`TextError`] if the trimmed id is empty, longer than
    /// [`MAX_IDENTIFIER_LEN`] characters or contains control characters.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        identifier(input.as_ref()).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of the authenticated account that owns a set of cases.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserId(String);

impl UserId {
    /// Validates a user id issued by the authentication provider.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        identifier(input.as_ref()).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! text_impls {
    ($ty:ident) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::str::FromStr for $ty {
            type Err = TextError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $ty::new(s)
            }
        }

        impl serde::Serialize for $ty {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                $ty::new(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

text_impls!(NonEmptyText);
text_impls!(CaseId);
text_impls!(UserId);
