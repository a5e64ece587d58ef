//! Semantic version parsing and constraint matching for image tags.
//!
//! Supports the constraint forms commonly used in image subscriptions:
//! - `1.2.3`, `=1.2.3` → Exact version
//! - `1.2`, `1.2.x`, `1.*` → Any version in the partial range
//! - `>1.2.3`, `>=1.2`, `<2`, `<=1.4` → Comparisons
//! - `^1.2.3` → Compatible with 1.2.3 (same major, or same minor below 1.0)
//! - `~1.2.3` → Patch-level changes only
//! - `>=1.0.0 <2.0.0`, `>=1.0.0, <2.0.0` → Conjunction
//! - `^1.0 || ^2.0` → Alternatives

use std::cmp::Ordering;

use crate::error::RegistryError;

/// A pre-release identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Identifier {
    /// Numeric identifier, compared numerically.
    Numeric(u64),
    /// Alphanumeric identifier, compared lexically. Sorts after numeric ones.
    Alpha(String),
}

/// A semantic version parsed from an image tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    /// Major version.
    pub major: u64,
    /// Minor version.
    pub minor: u64,
    /// Patch version.
    pub patch: u64,
    /// Pre-release identifiers (empty for a release).
    pub pre: Vec<Identifier>,
}

impl Version {
    /// Creates a release version.
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: Vec::new(),
        }
    }

    /// Parses a tag as a semantic version.
    ///
    /// A leading `v` is accepted and build metadata (`+...`) is ignored. In
    /// strict mode all three components are required; otherwise missing
    /// minor and patch components default to zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use freightyard_registry::Version;
    ///
    /// assert_eq!(Version::parse("v1.2.3", true), Some(Version::new(1, 2, 3)));
    /// assert_eq!(Version::parse("1.2", true), None);
    /// assert_eq!(Version::parse("1.2", false), Some(Version::new(1, 2, 0)));
    /// assert!(Version::parse("latest", false).is_none());
    /// ```
    #[must_use]
    pub fn parse(tag: &str, strict: bool) -> Option<Self> {
        let input = tag
            .strip_prefix('v')
            .or_else(|| tag.strip_prefix('V'))
            .unwrap_or(tag);
        let input = input.split_once('+').map_or(input, |(version, _)| version);
        let (core, pre) = match input.split_once('-') {
            Some((core, pre)) => (core, Some(pre)),
            None => (input, None),
        };

        let parts: Vec<&str> = core.split('.').collect();
        if parts.len() > 3 || (strict && parts.len() != 3) {
            return None;
        }

        let mut numbers = [0u64; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = parse_number(part)?;
        }

        let pre = match pre {
            Some(pre) => parse_pre(pre)?,
            None => Vec::new(),
        };

        Some(Self {
            major: numbers[0],
            minor: numbers[1],
            patch: numbers[2],
            pre,
        })
    }

    /// Returns true if this is a pre-release version.
    #[must_use]
    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }

    const fn core(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.core().cmp(&other.core()).then_with(|| {
            match (self.pre.is_empty(), other.pre.is_empty()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.pre.cmp(&other.pre),
            }
        })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn parse_number(part: &str) -> Option<u64> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

fn parse_pre(pre: &str) -> Option<Vec<Identifier>> {
    pre.split('.')
        .map(|id| {
            if id.is_empty() || !id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
                None
            } else if let Some(n) = parse_number(id) {
                Some(Identifier::Numeric(n))
            } else {
                Some(Identifier::Alpha(id.to_string()))
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Comparator {
    op: Op,
    version: Version,
}

impl Comparator {
    const fn new(op: Op, version: Version) -> Self {
        Self { op, version }
    }

    fn test(&self, version: &Version) -> bool {
        let ordering = version.cmp(&self.version);
        match self.op {
            Op::Eq => ordering == Ordering::Equal,
            Op::Ne => ordering != Ordering::Equal,
            Op::Gt => ordering == Ordering::Greater,
            Op::Gte => ordering != Ordering::Less,
            Op::Lt => ordering == Ordering::Less,
            Op::Lte => ordering != Ordering::Greater,
        }
    }
}

/// A version written with optional wildcards (`1`, `1.2`, `1.x`).
#[derive(Debug, Clone)]
struct Partial {
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    pre: Vec<Identifier>,
}

impl Partial {
    fn lower(&self) -> Version {
        Version {
            major: self.major.unwrap_or(0),
            minor: self.minor.unwrap_or(0),
            patch: self.patch.unwrap_or(0),
            pre: self.pre.clone(),
        }
    }

    const fn is_full(&self) -> bool {
        self.major.is_some() && self.minor.is_some() && self.patch.is_some()
    }

    /// Exclusive upper bound of the range the partial version denotes.
    fn next(&self) -> Result<Option<Version>, String> {
        Ok(match (self.major, self.minor, self.patch) {
            (Some(major), None, _) => Some(Version::new(bump(major)?, 0, 0)),
            (Some(major), Some(minor), None) => Some(Version::new(major, bump(minor)?, 0)),
            _ => None,
        })
    }
}

fn bump(component: u64) -> Result<u64, String> {
    component
        .checked_add(1)
        .ok_or_else(|| "version component overflows".to_string())
}

/// A parsed semantic version constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConstraint {
    source: String,
    alternatives: Vec<Vec<Comparator>>,
}

impl VersionConstraint {
    /// Parses a constraint string.
    ///
    /// # Examples
    ///
    /// ```
    /// use freightyard_registry::{Version, VersionConstraint};
    ///
    /// let constraint = VersionConstraint::parse("^1.2").unwrap();
    /// assert!(constraint.matches(&Version::new(1, 9, 0)));
    /// assert!(!constraint.matches(&Version::new(2, 0, 0)));
    ///
    /// let constraint = VersionConstraint::parse(">=1.0.0, <1.4 || 3.x").unwrap();
    /// assert!(constraint.matches(&Version::new(1, 3, 9)));
    /// assert!(constraint.matches(&Version::new(3, 1, 0)));
    /// assert!(!constraint.matches(&Version::new(2, 0, 0)));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if any term of the constraint cannot be parsed.
    pub fn parse(input: &str) -> Result<Self, RegistryError> {
        let error = |message: String| RegistryError::InvalidConstraint {
            constraint: input.to_string(),
            message,
        };

        let mut alternatives = Vec::new();
        for alternative in input.split("||") {
            let normalized = alternative.replace(',', " ");
            let mut tokens = normalized.split_whitespace();
            let mut comparators = Vec::new();

            while let Some(token) = tokens.next() {
                // Allow a space between the operator and the version (`>= 1.2`).
                let term = if token.bytes().all(|b| b"<>=!^~".contains(&b)) {
                    let version = tokens
                        .next()
                        .ok_or_else(|| error(format!("operator '{token}' has no version")))?;
                    format!("{token}{version}")
                } else {
                    token.to_string()
                };
                comparators.extend(parse_term(&term).map_err(error)?);
            }

            if comparators.is_empty() && alternative.trim().is_empty() && input.contains("||") {
                return Err(error("empty alternative".to_string()));
            }
            alternatives.push(comparators);
        }

        Ok(Self {
            source: input.trim().to_string(),
            alternatives,
        })
    }

    /// Returns true if the version satisfies the constraint.
    ///
    /// Pre-release versions only satisfy an alternative that names a
    /// pre-release of the same `major.minor.patch`.
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|comparators| {
            comparators.iter().all(|c| c.test(version))
                && (!version.is_prerelease()
                    || comparators
                        .iter()
                        .any(|c| c.version.is_prerelease() && c.version.core() == version.core()))
        })
    }
}

impl std::fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)
    }
}

fn parse_term(term: &str) -> Result<Vec<Comparator>, String> {
    let (op, rest) = ["<=", ">=", "!=", "<", ">", "=", "^", "~"]
        .iter()
        .find_map(|op| term.strip_prefix(op).map(|rest| (*op, rest)))
        .unwrap_or(("", term));

    let partial = parse_partial(rest).ok_or_else(|| format!("invalid version '{rest}'"))?;
    let lower = partial.lower();

    let Some(major) = partial.major else {
        // Fully wildcarded: only meaningful as "anything".
        return match op {
            "" | "=" | ">=" | "^" | "~" => Ok(Vec::new()),
            _ => Err(format!("operator '{op}' requires a version")),
        };
    };

    let comparators = match op {
        "" | "=" => match partial.next()? {
            Some(upper) => vec![Comparator::new(Op::Gte, lower), Comparator::new(Op::Lt, upper)],
            None => vec![Comparator::new(Op::Eq, lower)],
        },
        "!=" => {
            if !partial.is_full() {
                return Err("'!=' requires a full version".to_string());
            }
            vec![Comparator::new(Op::Ne, lower)]
        }
        ">" => match partial.next()? {
            Some(upper) => vec![Comparator::new(Op::Gte, upper)],
            None => vec![Comparator::new(Op::Gt, lower)],
        },
        ">=" => vec![Comparator::new(Op::Gte, lower)],
        "<" => vec![Comparator::new(Op::Lt, lower)],
        "<=" => match partial.next()? {
            Some(upper) => vec![Comparator::new(Op::Lt, upper)],
            None => vec![Comparator::new(Op::Lte, lower)],
        },
        "~" => {
            let upper = match partial.minor {
                Some(minor) => Version::new(major, bump(minor)?, 0),
                None => Version::new(bump(major)?, 0, 0),
            };
            vec![Comparator::new(Op::Gte, lower), Comparator::new(Op::Lt, upper)]
        }
        "^" => {
            let upper = match (major, partial.minor, partial.patch) {
                (0, Some(0), Some(patch)) => Version::new(0, 0, bump(patch)?),
                (0, Some(minor), _) => Version::new(0, bump(minor)?, 0),
                _ => Version::new(bump(major)?, 0, 0),
            };
            vec![Comparator::new(Op::Gte, lower), Comparator::new(Op::Lt, upper)]
        }
        _ => return Err(format!("unknown operator '{op}'")),
    };

    Ok(comparators)
}

fn parse_partial(input: &str) -> Option<Partial> {
    let input = input.strip_prefix('v').unwrap_or(input);
    let input = input.split_once('+').map_or(input, |(version, _)| version);
    let (core, pre) = match input.split_once('-') {
        Some((core, pre)) => (core, parse_pre(pre)?),
        None => (input, Vec::new()),
    };

    let mut components = [None; 3];
    let mut wildcard_seen = false;
    let parts: Vec<&str> = if core.is_empty() {
        Vec::new()
    } else {
        core.split('.').collect()
    };
    if parts.len() > 3 {
        return None;
    }

    for (slot, part) in components.iter_mut().zip(&parts) {
        if matches!(*part, "x" | "X" | "*") {
            wildcard_seen = true;
            continue;
        }
        if wildcard_seen {
            return None;
        }
        *slot = Some(parse_number(part)?);
    }

    let partial = Partial {
        major: components[0],
        minor: components[1],
        patch: components[2],
        pre,
    };
    if !partial.pre.is_empty() && !partial.is_full() {
        return None;
    }
    Some(partial)
}
