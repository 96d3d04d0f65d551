use std::fmt;
use thiserror::Error;

/// Configuration problems detected before any remote call is made.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum Error {
    #[error("group has no email-id (name: {name:?})")]
    MissingEmailId { name: String },

    #[error("group {group:?} is listed more than once")]
    DuplicateGroup { group: String },

    #[error("group {group:?} cannot have duplicate {role} {email:?}")]
    DuplicateMember {
        group: String,
        role: &'static str,
        email: String,
    },

    #[error("group {group:?} cannot list {email:?} as both {other} and {role}")]
    ConflictingRoles {
        group: String,
        email: String,
        role: &'static str,
        other: &'static str,
    },

    #[error("group {group:?} description must not exceed {max} characters; is {len}")]
    DescriptionTooLong { group: String, len: usize, max: usize },

    #[error("group {group:?} setting {key} must be \"true\" or \"false\", got {value:?}")]
    InvalidBoolSetting {
        group: String,
        key: &'static str,
        value: String,
    },
}

/// A flattened collection of errors.
///
/// Every reconciliation step records its failure here instead of returning
/// early, so that one failed call never prevents the remaining work.
#[derive(Debug, Default)]
pub struct Aggregate(Vec<anyhow::Error>);

// === impl Aggregate ===

impl Aggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error. Nested aggregates are flattened.
    pub fn push(&mut self, error: impl Into<anyhow::Error>) {
        match error.into().downcast::<Aggregate>() {
            Ok(Aggregate(errors)) => self.0.extend(errors),
            Err(error) => self.0.push(error),
        }
    }

    /// Records the error of `res`, if any.
    pub fn record<E: Into<anyhow::Error>>(&mut self, res: Result<(), E>) {
        if let Err(error) = res {
            self.push(error);
        }
    }

    pub fn extend(&mut self, other: Aggregate) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn errors(&self) -> &[anyhow::Error] {
        &self.0
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [] => Ok(()),
            [error] => write!(f, "{error:#}"),
            errors => {
                write!(f, "[")?;
                for (i, error) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{error:#}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl std::error::Error for Aggregate {}

impl From<anyhow::Error> for Aggregate {
    fn from(error: anyhow::Error) -> Self {
        let mut agg = Self::new();
        agg.push(error);
        agg
    }
}

impl FromIterator<anyhow::Error> for Aggregate {
    fn from_iter<T: IntoIterator<Item = anyhow::Error>>(iter: T) -> Self {
        let mut agg = Self::new();
        for error in iter {
            agg.push(error);
        }
        agg
    }
}
