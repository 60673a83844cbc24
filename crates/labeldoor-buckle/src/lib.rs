// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Define decentralized (secrecy, integrity) label value types and their parser.
// Author: Lukas Bower

//! Decentralized label value types shared across LabelDoor components.
//!
//! A [`Buckle`] pairs a secrecy [`Component`] with an integrity [`Component`].
//! Each component is either the unsatisfiable `False` or a
//! disjunction-of-conjunctions formula over delegated principal vectors.
//! These are pure values: equality is structural and no lattice enforcement
//! happens here. Joins, declassification checks and endorsement live on the
//! trusted host; this crate only makes labels parseable, printable and
//! serializable.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Characters that carry meaning in the textual label grammar.
const SPECIALS: [char; 5] = [',', '&', '|', '/', '\\'];

/// A delegated principal: an ordered chain of name tokens.
///
/// `["alice"]` names the principal `alice`; `["alice", "photos"]` names a
/// principal `alice` has delegated for `photos`.
pub type PrincipalVec = Vec<String>;

/// One conjunct of a component formula: a set of alternative principal
/// vectors, any one of which satisfies the clause.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Clause(pub BTreeSet<PrincipalVec>);

impl Clause {
    /// Build a clause from a single principal name.
    #[must_use]
    pub fn new(principal: &str) -> Self {
        Self::new_from_vec(vec![vec![principal.to_string()]])
    }

    /// Build a clause from alternative principal vectors.
    #[must_use]
    pub fn new_from_vec(alternatives: Vec<PrincipalVec>) -> Self {
        Clause(alternatives.into_iter().collect())
    }
}

/// A secrecy or integrity formula.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Component {
    /// The unsatisfiable component, written `F`.
    False,
    /// A conjunction of [`Clause`]s. The empty conjunction is `true`,
    /// written `T`.
    Formula(BTreeSet<Clause>),
}

/// Privilege held by an execution context.
///
/// A privilege is a component: holding privilege over a clause justifies
/// label transitions (declassify, endorse) that mention it. The context's
/// privilege is host-owned state; clients only derive narrower privileges
/// through the sub-privilege call.
pub type Privilege = Component;

impl Component {
    /// The `true` component: satisfied by everyone, restricts nothing.
    #[must_use]
    pub fn dc_true() -> Self {
        Component::Formula(BTreeSet::new())
    }

    /// The `false` component: satisfiable by no one.
    #[must_use]
    pub fn dc_false() -> Self {
        Component::False
    }

    /// Build a formula component from clauses.
    #[must_use]
    pub fn formula(clauses: impl IntoIterator<Item = Clause>) -> Self {
        Component::Formula(clauses.into_iter().collect())
    }

    /// True if this is the `true` component.
    #[must_use]
    pub fn is_true(&self) -> bool {
        matches!(self, Component::Formula(clauses) if clauses.is_empty())
    }

    /// True if this is the `false` component.
    #[must_use]
    pub fn is_false(&self) -> bool {
        matches!(self, Component::False)
    }
}

/// A decentralized label: a secrecy component and an integrity component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buckle {
    /// Who may observe data carrying this label.
    pub secrecy: Component,
    /// Who vouches for data carrying this label.
    pub integrity: Component,
}

impl Buckle {
    /// Construct a label from components.
    #[must_use]
    pub fn new(secrecy: Component, integrity: Component) -> Self {
        Buckle { secrecy, integrity }
    }

    /// The public label `T,T`: readable by anyone, vouched for by no one.
    #[must_use]
    pub fn public() -> Self {
        Buckle::new(Component::dc_true(), Component::dc_true())
    }

    /// The most restrictive label `F,T`: readable by no one.
    #[must_use]
    pub fn top() -> Self {
        Buckle::new(Component::dc_false(), Component::dc_true())
    }

    /// The least restrictive label `T,F`: carried by data anyone may have
    /// influenced yet everyone vouches for.
    #[must_use]
    pub fn bottom() -> Self {
        Buckle::new(Component::dc_true(), Component::dc_false())
    }

    /// Parse a label from its textual form.
    ///
    /// The grammar separates secrecy from integrity with `,`, clauses with
    /// `&`, alternative principal vectors with `|` and delegation steps with
    /// `/`. A backslash escapes any of those separators (and itself) inside
    /// a token. `T` and `F` denote the true and false components.
    pub fn parse(input: &str) -> Result<Self, BuckleParseError> {
        let sides = split_unescaped(input, ',')?;
        if sides.len() != 2 {
            return Err(BuckleParseError::ComponentCount(sides.len()));
        }
        Ok(Buckle {
            secrecy: parse_component(&sides[0])?,
            integrity: parse_component(&sides[1])?,
        })
    }
}

/// Reasons a label string fails to parse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuckleParseError {
    /// The input did not contain exactly two comma-separated components.
    #[error("expected 2 components, found {0}")]
    ComponentCount(usize),
    /// A clause, alternative or delegation token was empty.
    #[error("empty token")]
    EmptyToken,
    /// A backslash escaped a character outside the special set.
    #[error("invalid escape '\\{0}'")]
    InvalidEscape(char),
    /// The input ended in a bare backslash.
    #[error("dangling escape at end of input")]
    DanglingEscape,
}

fn parse_component(input: &str) -> Result<Component, BuckleParseError> {
    match input {
        "T" => return Ok(Component::dc_true()),
        "F" => return Ok(Component::dc_false()),
        _ => {}
    }
    let mut clauses = BTreeSet::new();
    for clause_src in split_unescaped(input, '&')? {
        let mut alternatives = BTreeSet::new();
        for vector_src in split_unescaped(&clause_src, '|')? {
            let mut principal = Vec::new();
            for token_src in split_unescaped(&vector_src, '/')? {
                principal.push(unescape(&token_src)?);
            }
            alternatives.insert(principal);
        }
        clauses.insert(Clause(alternatives));
    }
    Ok(Component::Formula(clauses))
}

/// Split on an unescaped separator, keeping escape sequences intact so the
/// next level of splitting still sees them. Empty segments are rejected.
fn split_unescaped(input: &str, sep: char) -> Result<Vec<String>, BuckleParseError> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            let escaped = chars.next().ok_or(BuckleParseError::DanglingEscape)?;
            current.push('\\');
            current.push(escaped);
        } else if c == sep {
            if current.is_empty() {
                return Err(BuckleParseError::EmptyToken);
            }
            segments.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    if current.is_empty() {
        return Err(BuckleParseError::EmptyToken);
    }
    segments.push(current);
    Ok(segments)
}

fn unescape(token: &str) -> Result<String, BuckleParseError> {
    let mut out = String::with_capacity(token.len());
    let mut chars = token.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            let escaped = chars.next().ok_or(BuckleParseError::DanglingEscape)?;
            if !SPECIALS.contains(&escaped) {
                return Err(BuckleParseError::InvalidEscape(escaped));
            }
            out.push(escaped);
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

fn escape_into(f: &mut fmt::Formatter<'_>, token: &str) -> fmt::Result {
    for c in token.chars() {
        if SPECIALS.contains(&c) {
            write!(f, "\\")?;
        }
        write!(f, "{c}")?;
    }
    Ok(())
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, vector) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "|")?;
            }
            for (j, token) in vector.iter().enumerate() {
                if j > 0 {
                    write!(f, "/")?;
                }
                escape_into(f, token)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::False => write!(f, "F"),
            Component::Formula(clauses) if clauses.is_empty() => write!(f, "T"),
            Component::Formula(clauses) => {
                for (i, clause) in clauses.iter().enumerate() {
                    if i > 0 {
                        write!(f, "&")?;
                    }
                    write!(f, "{clause}")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Buckle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.secrecy, self.integrity)
    }
}
