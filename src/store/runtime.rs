//! Movie runtime type
//!
//! Runtimes travel over the wire as the string `"<minutes> mins"` rather
//! than a bare number, in both directions.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Movie runtime in minutes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Runtime(pub i32);

impl Runtime {
    pub fn minutes(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} mins", self.0)
    }
}

impl Serialize for Runtime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Runtime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(RuntimeVisitor)
    }
}

struct RuntimeVisitor;

impl Visitor<'_> for RuntimeVisitor {
    type Value = Runtime;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string in the format \"<minutes> mins\"")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Runtime, E> {
        let invalid = || E::invalid_value(de::Unexpected::Str(value), &self);

        let (minutes, unit) = value.split_once(' ').ok_or_else(invalid)?;
        if unit != "mins" {
            return Err(invalid());
        }

        let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
        Ok(Runtime(minutes))
    }
}
