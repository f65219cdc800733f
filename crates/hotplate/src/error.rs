//! error types
use std::fmt;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while parsing, validating and resolving templates
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// wrong arity, wrong argument type or a malformed section
    #[error("{0}")]
    InvalidTemplate(String),

    /// an error found while walking a snippet, with the breadcrumb to where it happened
    #[error("{path}: {message}")]
    Validation { path: Breadcrumb, message: String },

    #[error("The template version is invalid: {0}")]
    InvalidTemplateVersion(String),

    #[error("{0}")]
    UnsupportedFunction(String),

    #[error("The specified reference \"{resource}\" (in {key}) is incorrect.")]
    InvalidTemplateReference { resource: String, key: String },

    #[error("The Referenced Attribute ({resource} {key}) is incorrect.")]
    InvalidTemplateAttribute { resource: String, key: String },

    #[error("The Parameter ({0}) was not defined in template.")]
    UnknownParameter(String),

    #[error("The Parameter ({0}) was not provided.")]
    UserParameterMissing(String),

    #[error("Circular definition for condition \"{0}\"")]
    CircularCondition(String),

    #[error("Invalid condition \"{0}\": the definition of the condition is invalid")]
    InvalidCondition(String),

    #[error("Cannot define the following properties at the same time: {}", .props.join(", "))]
    PropertyConflict { props: Vec<String> },

    #[error("Invalid dependency with external {resource_type} resource: {external_id}")]
    InvalidExternalResourceDependency {
        resource_type: String,
        external_id: String,
    },

    #[error("Invalid translation rule: {0}")]
    InvalidTranslationRule(String),

    /// a client plugin finder failed
    #[error("{plugin} failed to find {value}: {message}")]
    Finder {
        plugin: String,
        value: String,
        message: String,
    },

    /// a broken internal assertion; never wrapped into [Error::Validation]
    #[error("internal invariant violated: {0}")]
    Invariant(String),
}

impl Error {
    pub fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidTemplate(message.into())
    }

    /// Attach a breadcrumb to this error
    ///
    /// An error that already carries a breadcrumb keeps it and gets `path` prepended.
    /// [Error::Invariant] is returned unchanged.
    pub fn at(self, path: &Breadcrumb) -> Self {
        match self {
            Error::Invariant(_) => self,
            Error::Validation {
                path: inner,
                message,
            } => Error::Validation {
                path: path.join(&inner),
                message,
            },
            other => Error::Validation {
                path: path.clone(),
                message: other.to_string(),
            },
        }
    }
}

/// A path into a snippet, used to point at the location of an error
///
/// Renders as `resources.web.properties.networks[2].list_join`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Breadcrumb(Vec<Segment>);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

impl Breadcrumb {
    pub fn root(key: impl Into<String>) -> Self {
        Self(vec![Segment::Key(key.into())])
    }

    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.0.push(Segment::Key(key.into()));
        next
    }

    pub fn index(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.0.push(Segment::Index(index));
        next
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn join(&self, other: &Breadcrumb) -> Self {
        let mut joined = self.clone();
        joined.0.extend(other.0.iter().cloned());
        joined
    }
}

impl fmt::Display for Breadcrumb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Key(key) if position == 0 => f.write_str(key)?,
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}
