//! Pod version parsing, comparison, and constraint matching.
//!
//! Pod versions are dotted numeric segments with optional textual
//! qualifiers (`1.2.3`, `2.0-beta`). Constraints are comma-separated
//! clauses using `=`, `!=`, `>`, `>=`, `<`, `<=`, or the pessimistic
//! operator `~>`; a bare version means exact.
//!
//! Two deliberate tolerance rules are load-bearing for the resolver and
//! must not be "fixed":
//!
//! - [`compare`] on an unparseable left operand reports `Less`; on an
//!   unparseable right operand (left parsed) it reports `Greater`. The
//!   fallback is asymmetric and non-transitive across chains of malformed
//!   values; it is a documented quirk.
//! - [`satisfies`] returns `true` whenever the constraint or the version
//!   fails to parse: the absence of a parseable constraint never blocks a
//!   candidate.

use std::cmp::Ordering;
use std::fmt;

/// A parsed version with comparable segments.
#[derive(Debug, Clone)]
pub struct Version {
    pub original: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
enum Segment {
    Numeric(u64),
    Text(String),
}

impl Version {
    /// Parse a version string. Returns `None` unless the trimmed input
    /// starts with a digit.
    pub fn parse(version: &str) -> Option<Self> {
        let trimmed = version.trim();
        if !trimmed.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(Self {
            original: trimmed.to_string(),
            segments: parse_segments(trimmed),
        })
    }

    fn numeric_segments(&self) -> Vec<u64> {
        self.segments
            .iter()
            .map_while(|s| match s {
                Segment::Numeric(n) => Some(*n),
                Segment::Text(_) => None,
            })
            .collect()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let max_len = self.segments.len().max(other.segments.len());
        for i in 0..max_len {
            let ord = compare_segments(self.segments.get(i), other.segments.get(i));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn compare_segments(a: Option<&Segment>, b: Option<&Segment>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(s), None) => compare_segment_to_empty(s),
        (None, Some(s)) => compare_segment_to_empty(s).reverse(),
        (Some(a), Some(b)) => compare_two_segments(a, b),
    }
}

// Trailing zeros compare equal ("1.0" == "1.0.0"); a trailing text
// qualifier sorts below the plain release ("1.0-beta" < "1.0").
fn compare_segment_to_empty(seg: &Segment) -> Ordering {
    match seg {
        Segment::Numeric(0) => Ordering::Equal,
        Segment::Numeric(_) => Ordering::Greater,
        Segment::Text(s) if s.is_empty() => Ordering::Equal,
        Segment::Text(_) => Ordering::Less,
    }
}

fn compare_two_segments(a: &Segment, b: &Segment) -> Ordering {
    match (a, b) {
        (Segment::Numeric(a), Segment::Numeric(b)) => a.cmp(b),
        (Segment::Numeric(_), Segment::Text(_)) => Ordering::Greater,
        (Segment::Text(_), Segment::Numeric(_)) => Ordering::Less,
        (Segment::Text(a), Segment::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
    }
}

fn parse_segments(version: &str) -> Vec<Segment> {
    version
        .split(['.', '-'])
        .filter(|token| !token.is_empty())
        .map(|token| match token.parse::<u64>() {
            Ok(n) => Segment::Numeric(n),
            Err(_) => Segment::Text(token.to_string()),
        })
        .collect()
}

/// True iff `s` looks like a pinned version: a leading-numeric dotted form
/// rather than a constraint expression or an empty string.
pub fn is_explicit_version(s: &str) -> bool {
    s.trim_start()
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit())
}

/// Component-wise version comparison with the asymmetric malformed-input
/// fallback: unparseable `a` compares less, unparseable `b` (with `a`
/// parsed) compares greater.
pub fn compare(a: &str, b: &str) -> Ordering {
    let Some(version_a) = Version::parse(a) else {
        return Ordering::Less;
    };
    let Some(version_b) = Version::parse(b) else {
        return Ordering::Greater;
    };
    version_a.cmp(&version_b)
}

/// Whether `version` satisfies `constraint`.
///
/// Permissive by design: an unparseable constraint (including the empty
/// string) or an unparseable version always satisfies.
pub fn satisfies(constraint: &str, version: &str) -> bool {
    let Some(parsed_constraint) = Constraint::parse(constraint) else {
        return true;
    };
    let Some(parsed_version) = Version::parse(version) else {
        return true;
    };
    parsed_constraint.matches(&parsed_version)
}

/// The newest of `versions` satisfying `constraint`.
///
/// An empty constraint applies no filtering. When a constraint is given,
/// candidates that fail to parse are dropped before matching. Returns
/// `None` when no candidate remains.
pub fn max_satisfying<S: AsRef<str>>(constraint: &str, versions: &[S]) -> Option<String> {
    let candidates: Vec<&str> = match Constraint::parse(constraint) {
        Some(parsed) => versions
            .iter()
            .map(AsRef::as_ref)
            .filter(|v| Version::parse(v).is_some_and(|ver| parsed.matches(&ver)))
            .collect(),
        None => versions.iter().map(AsRef::as_ref).collect(),
    };

    let mut iter = candidates.into_iter();
    let mut max = iter.next()?;
    for next in iter {
        if compare(next, max) == Ordering::Greater {
            max = next;
        }
    }
    Some(max.to_string())
}

/// A parsed constraint: the conjunction of one or more clauses.
#[derive(Debug, Clone)]
pub struct Constraint {
    clauses: Vec<Clause>,
}

#[derive(Debug, Clone)]
struct Clause {
    op: Op,
    version: Version,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Op {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Pessimistic,
}

impl Constraint {
    /// Parse a comma-separated constraint expression. Returns `None` when
    /// empty or when any clause cannot be parsed.
    pub fn parse(spec: &str) -> Option<Self> {
        let trimmed = spec.trim();
        if trimmed.is_empty() {
            return None;
        }
        let mut clauses = Vec::new();
        for part in trimmed.split(',') {
            clauses.push(parse_clause(part.trim())?);
        }
        Some(Self { clauses })
    }

    /// Check if a version satisfies every clause.
    pub fn matches(&self, version: &Version) -> bool {
        self.clauses.iter().all(|clause| clause.matches(version))
    }
}

fn parse_clause(part: &str) -> Option<Clause> {
    let (op, rest) = if let Some(rest) = part.strip_prefix("~>") {
        (Op::Pessimistic, rest)
    } else if let Some(rest) = part.strip_prefix(">=") {
        (Op::Ge, rest)
    } else if let Some(rest) = part.strip_prefix("<=") {
        (Op::Le, rest)
    } else if let Some(rest) = part.strip_prefix("!=") {
        (Op::Ne, rest)
    } else if let Some(rest) = part.strip_prefix('>') {
        (Op::Gt, rest)
    } else if let Some(rest) = part.strip_prefix('<') {
        (Op::Lt, rest)
    } else if let Some(rest) = part.strip_prefix('=') {
        (Op::Eq, rest)
    } else {
        (Op::Eq, part)
    };
    let version = Version::parse(rest)?;
    Some(Clause { op, version })
}

impl Clause {
    fn matches(&self, version: &Version) -> bool {
        match self.op {
            Op::Eq => version == &self.version,
            Op::Ne => version != &self.version,
            Op::Gt => version > &self.version,
            Op::Ge => version >= &self.version,
            Op::Lt => version < &self.version,
            Op::Le => version <= &self.version,
            Op::Pessimistic => {
                if version < &self.version {
                    return false;
                }
                version < &self.pessimistic_upper()
            }
        }
    }

    /// Upper bound for `~>`: bump the second-to-last numeric segment.
    /// `~> 1.2.3` allows `>= 1.2.3, < 1.3`; `~> 1` allows `>= 1, < 2`.
    fn pessimistic_upper(&self) -> Version {
        let mut numeric = self.version.numeric_segments();
        if numeric.is_empty() {
            numeric.push(0);
        }
        if numeric.len() > 1 {
            numeric.pop();
        }
        if let Some(last) = numeric.last_mut() {
            *last += 1;
        }
        let text = numeric
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(".");
        Version::parse(&text).unwrap_or_else(|| self.version.clone())
    }
}
