// Copyright (c) The delegate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::ClassNameParseError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The fully-qualified name of a test class, e.g. `it.jira.IssueOperatorTest`.
///
/// Segments are separated by `.`. The last segment is the simple name, and everything before it is
/// the package. A class in the default package has an empty package.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TestClassName(String);

impl TestClassName {
    /// Parses a fully-qualified class name.
    pub fn new(name: impl Into<String>) -> Result<Self, ClassNameParseError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ClassNameParseError::new(name, "class name is empty"));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(ClassNameParseError::new(
                name,
                "class name contains whitespace",
            ));
        }
        if name.split('.').any(str::is_empty) {
            return Err(ClassNameParseError::new(
                name,
                "class name has an empty segment",
            ));
        }
        Ok(Self(name))
    }

    /// Returns the class name as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the package this class lives in, or `""` for the default package.
    pub fn package(&self) -> &str {
        match self.0.rsplit_once('.') {
            Some((package, _)) => package,
            None => "",
        }
    }

    /// Returns the last segment of the name.
    pub fn simple_name(&self) -> &str {
        match self.0.rsplit_once('.') {
            Some((_, simple)) => simple,
            None => &self.0,
        }
    }

    /// Returns the first segment of the package, or `""` for the default package.
    ///
    /// For `it.jira.IssueOperatorTest` this is `it`.
    pub fn top_level_namespace(&self) -> &str {
        self.package().split('.').next().unwrap_or_default()
    }
}

impl fmt::Display for TestClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TestClassName {
    type Err = ClassNameParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for TestClassName {
    type Error = ClassNameParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TestClassName> for String {
    fn from(value: TestClassName) -> Self {
        value.0
    }
}
