//! Resource identifiers.

use std::fmt::{Debug, Display};
use std::str::FromStr;

use snafu::{ensure, OptionExt, Snafu};

/// Errors raised when building or parsing a [`ResourceId`].
#[derive(Snafu, Debug, Clone, PartialEq, Eq)]
#[snafu(context(suffix(Ctx)), visibility(pub(crate)))]
pub enum IdError {
    /// One of the parts contains a `:`.
    #[snafu(display("The {part} of resource id {input:?} cannot contain a colon!"))]
    ColonInPart {
        /// Which part was invalid (`domain`, `category` or `name`).
        part: &'static str,
        /// The offending input.
        input: String,
    },
    /// The name part is empty or contains a `/`.
    #[snafu(display("Resource id {input:?} has an invalid name! Names must be non-empty and cannot contain '/'."))]
    InvalidName {
        /// The offending input.
        input: String,
    },
    /// The id has no `/` separating category and name.
    #[snafu(display("Resource id {input:?} must contain a category followed by '/'!"))]
    MissingCategory {
        /// The offending input.
        input: String,
    },
    /// The id has no domain and no default was given.
    #[snafu(display("Resource id {input:?} must contain a domain!"))]
    MissingDomain {
        /// The offending input.
        input: String,
    },
    /// The id contains more than one `:`.
    #[snafu(display("Resource id {input:?} contains more than one colon!"))]
    MultipleColons {
        /// The offending input.
        input: String,
    },
}

/// Shorthand type for [`Result<T, IdError>`]
pub type IdResult<T> = Result<T, IdError>;

/// Identifier of a resource, unique within one pack.
///
/// The canonical form is `domain:category/name`. The category may itself contain `/` and may be
/// empty (`domain:/name`). Packing and lookup only ever compare the canonical string.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    canonical: Box<str>,
    /// Byte index of the `:`.
    colon: usize,
    /// Byte index of the last `/`.
    slash: usize,
}

impl ResourceId {
    /// Builds an id from its three parts.
    ///
    /// # Errors
    /// Fails if any part contains a `:`, or if `name` is empty or contains a `/`.
    pub fn from_parts(domain: &str, category: &str, name: &str) -> IdResult<Self> {
        ensure!(
            !domain.contains(':'),
            ColonInPartCtx {
                part: "domain",
                input: domain
            }
        );
        ensure!(
            !category.contains(':'),
            ColonInPartCtx {
                part: "category",
                input: category
            }
        );
        ensure!(
            !name.contains(':'),
            ColonInPartCtx {
                part: "name",
                input: name
            }
        );
        ensure!(
            !name.is_empty() && !name.contains('/'),
            InvalidNameCtx { input: name }
        );

        let canonical = format!("{domain}:{category}/{name}");

        Ok(Self {
            colon: domain.len(),
            slash: domain.len() + 1 + category.len(),
            canonical: canonical.into_boxed_str(),
        })
    }

    /// Parses an id of the form `domain:category/name`.
    ///
    /// # Errors
    /// See [`IdError`].
    pub fn parse(input: &str) -> IdResult<Self> {
        Self::parse_inner(input, None)
    }

    /// Parses an id, using `default_domain` when `input` has no `domain:` prefix.
    ///
    /// # Errors
    /// See [`IdError`].
    pub fn parse_with_default_domain(input: &str, default_domain: &str) -> IdResult<Self> {
        Self::parse_inner(input, Some(default_domain))
    }

    fn parse_inner(input: &str, default_domain: Option<&str>) -> IdResult<Self> {
        let (domain, rest) = match input.split_once(':') {
            Some((domain, rest)) => {
                ensure!(!rest.contains(':'), MultipleColonsCtx { input });
                (domain, rest)
            }
            None => (default_domain.context(MissingDomainCtx { input })?, input),
        };

        let (category, name) = rest.rsplit_once('/').context(MissingCategoryCtx { input })?;

        Self::from_parts(domain, category, name)
    }

    /// The canonical `domain:category/name` string.
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// The part before the `:`.
    pub fn domain(&self) -> &str {
        &self.canonical[..self.colon]
    }

    /// The part between the `:` and the last `/`. May be empty.
    pub fn category(&self) -> &str {
        &self.canonical[self.colon + 1..self.slash]
    }

    /// The part after the last `/`.
    pub fn name(&self) -> &str {
        &self.canonical[self.slash + 1..]
    }

    /// `domain:category`, the key used by [`GroupingStrategy::Category`](crate::GroupingStrategy::Category).
    pub fn group_key(&self) -> &str {
        &self.canonical[..self.slash]
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical)
    }
}

impl Debug for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ResourceId({:?})", &*self.canonical)
    }
}

impl FromStr for ResourceId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.canonical
    }
}
