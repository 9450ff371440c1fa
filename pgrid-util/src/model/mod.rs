use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::{regex, Error};

mod course;
mod credential;
mod description;
mod problem;
mod verdict;

pub use course::*;
pub use credential::*;
pub use description::*;
pub use problem::*;
pub use verdict::*;

macro_rules! def_id {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(String);

        impl<T: Into<String>> From<T> for $name {
            fn from(id: T) -> Self {
                Self(id.into())
            }
        }

        impl FromStr for $name {
            type Err = Infallible;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Ok(Self::from(s.trim()))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

def_id!(
    /// Identifier of a problem set (an assignment) in a course.
    ProblemSetId
);
def_id!(ProblemId);
def_id!(
    /// Identifier the judge assigns to an accepted submission.
    SolutionId
);

/// 32 hex digit identifier of a course.
///
/// Parsed either from the bare id or from the course page url the portal shows
/// in the browser.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CourseId(String);

impl CourseId {
    pub fn is_valid(&self) -> bool {
        regex!(r"^[0-9a-f]{32}$").is_match(&self.0)
    }

    pub fn from_url(url: &str) -> Option<Self> {
        regex!(r"^https?://programming\.pku\.edu\.cn/(?:programming/)?course/([0-9a-fA-F]{32})(?:/show\.do|/)?$")
            .captures(url.trim())
            .map(|caps| Self(caps[1].to_lowercase()))
    }
}

impl<T: Into<String>> From<T> for CourseId {
    fn from(id: T) -> Self {
        Self(id.into())
    }
}

impl FromStr for CourseId {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if let Some(id) = Self::from_url(s) {
            return Ok(id);
        }
        let id = Self(s.trim().to_lowercase());
        if id.is_valid() {
            Ok(id)
        } else {
            Err(anyhow!(
                "Invalid course id : {} (expected 32 hex digits or a course page url)",
                s
            ))
        }
    }
}

impl AsRef<str> for CourseId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Serializes a value through its `Display` and `FromStr` implementations.
pub mod string {
    use std::fmt::Display;
    use std::str::FromStr;

    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer)?
            .parse()
            .map_err(de::Error::custom)
    }
}
