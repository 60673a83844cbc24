// CLASSIFICATION: COMMUNITY
// Filename: path.rs v0.4
// Date Modified: 2026-08-29
// Author: Lukas Bower

//! Textual paths over the labeled directory tree.
//!
//! Components are separated by `:`. A component wrapped in angle brackets is
//! a facet label, parsed with the label grammar; anything else is an entry
//! name. The empty string is the root path. Examples:
//!
//! ```text
//! home:<alice,alice>:data
//! srv:github
//! ```

use std::fmt;
use std::str::FromStr;

use labeldoor_buckle::{Buckle, BuckleParseError};
use labeldoor_wire::PathComponent;

/// Reasons a path string fails to parse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Two separators in a row, or a trailing separator.
    #[error("empty path component")]
    EmptyComponent,
    /// An entry name contains a character outside the allowed set.
    #[error("invalid character {0:?} in entry name")]
    BadName(char),
    /// A facet component's label failed to parse.
    #[error("invalid facet label: {0}")]
    BadFacet(#[from] BuckleParseError),
}

/// A parsed path: a sequence of names and facets rooted at fd 0.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Path(Vec<PathComponent>);

fn valid_name(name: &str) -> Result<(), PathError> {
    for c in name.chars() {
        if !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')) {
            return Err(PathError::BadName(c));
        }
    }
    Ok(())
}

impl Path {
    /// The empty path, naming the root directory itself.
    #[must_use]
    pub fn root() -> Self {
        Path(Vec::new())
    }

    /// Parse the textual form.
    pub fn parse(input: &str) -> Result<Self, PathError> {
        if input.is_empty() {
            return Ok(Path::root());
        }
        let mut components = Vec::new();
        for part in input.split(':') {
            if part.is_empty() {
                return Err(PathError::EmptyComponent);
            }
            if let Some(inner) = part.strip_prefix('<').and_then(|p| p.strip_suffix('>')) {
                components.push(PathComponent::Facet(Buckle::parse(inner)?));
            } else {
                valid_name(part)?;
                components.push(PathComponent::Name(part.to_string()));
            }
        }
        Ok(Path(components))
    }

    /// Build from already-parsed components.
    #[must_use]
    pub fn from_components(components: Vec<PathComponent>) -> Self {
        Path(components)
    }

    /// The component sequence, root-first.
    #[must_use]
    pub fn components(&self) -> &[PathComponent] {
        &self.0
    }

    /// True for the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Append one component.
    pub fn push(&mut self, component: PathComponent) {
        self.0.push(component);
    }

    /// Everything but the last component, and the last component. `None`
    /// for the root path.
    #[must_use]
    pub fn split_last(&self) -> Option<(Path, &PathComponent)> {
        let (last, init) = self.0.split_last()?;
        Some((Path(init.to_vec()), last))
    }

    /// The final component's name, when it is a name.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        match self.0.last()? {
            PathComponent::Name(name) => Some(name),
            PathComponent::Facet(_) => None,
        }
    }

    /// Consume into the component vector the wire layer carries.
    #[must_use]
    pub fn into_components(self) -> Vec<PathComponent> {
        self.0
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            match component {
                PathComponent::Name(name) => f.write_str(name)?,
                PathComponent::Facet(label) => write!(f, "<{label}>")?,
            }
        }
        Ok(())
    }
}
