//! Classification of RPC operations for admission control.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Operations that hand back an operation id and keep working in the
/// background.
pub const DEFAULT_ASYNC_HEAVY: &[&str] = &[
    "z_sendmany",
    "z_mergetoaddress",
    "z_shieldcoinbase",
    "saplingmigration",
];

/// Operations that do all their heavy work before returning.
pub const DEFAULT_SYNC_HEAVY: &[&str] = &["generate", "zcrawjoinsplit"];

/// Operation that reports completed background operations.
pub const OPERATION_RESULT_METHOD: &str = "z_getoperationresult";

/// How an operation interacts with the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallClass {
    /// No admission control.
    #[default]
    Plain,
    /// Lease held for exactly the duration of the call.
    SyncHeavy,
    /// Lease taken before the call and handed off to a later poll.
    AsyncHeavy,
    /// A non-empty result releases a lease taken by an async operation.
    Poll,
}

impl CallClass {
    /// Whether the class leases cores before the call.
    #[must_use]
    pub const fn is_heavy(self) -> bool {
        matches!(self, Self::SyncHeavy | Self::AsyncHeavy)
    }
}

impl fmt::Display for CallClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Plain => "plain",
            Self::SyncHeavy => "sync_heavy",
            Self::AsyncHeavy => "async_heavy",
            Self::Poll => "poll",
        };
        f.write_str(name)
    }
}

impl FromStr for CallClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain" => Ok(Self::Plain),
            "sync_heavy" => Ok(Self::SyncHeavy),
            "async_heavy" => Ok(Self::AsyncHeavy),
            "poll" => Ok(Self::Poll),
            other => Err(format!("unknown call class `{other}`")),
        }
    }
}

/// Static `operation name -> class` table. Unlisted names are
/// [`CallClass::Plain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallClassifier {
    table: HashMap<String, CallClass>,
}

impl CallClassifier {
    /// Classifier with no entries: every operation is plain.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Classifier with the built-in heavy and poll operations.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut classifier = Self::empty();
        for name in DEFAULT_ASYNC_HEAVY {
            classifier.insert(*name, CallClass::AsyncHeavy);
        }
        for name in DEFAULT_SYNC_HEAVY {
            classifier.insert(*name, CallClass::SyncHeavy);
        }
        classifier.insert(OPERATION_RESULT_METHOD, CallClass::Poll);
        classifier
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, class: CallClass) -> Self {
        self.insert(name, class);
        self
    }

    /// Set the class of `name`. Setting [`CallClass::Plain`] removes the
    /// entry.
    pub fn insert(&mut self, name: impl Into<String>, class: CallClass) {
        let name = name.into();
        if class == CallClass::Plain {
            self.table.remove(&name);
        } else {
            self.table.insert(name, class);
        }
    }

    /// Apply several overrides at once.
    pub fn extend<I, K>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, CallClass)>,
        K: Into<String>,
    {
        for (name, class) in entries {
            self.insert(name, class);
        }
    }

    /// Class of `name`.
    #[must_use]
    pub fn classify(&self, name: &str) -> CallClass {
        self.table.get(name).copied().unwrap_or_default()
    }

    /// Sorted names registered with `class`.
    #[must_use]
    pub fn names(&self, class: CallClass) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .table
            .iter()
            .filter(|(_, c)| **c == class)
            .map(|(n, _)| n.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}

impl Default for CallClassifier {
    fn default() -> Self {
        Self::with_defaults()
    }
}
