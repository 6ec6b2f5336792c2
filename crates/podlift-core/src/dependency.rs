use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A reference to a module under a version constraint.
///
/// `constraint` may be empty (any version), an exact version such as
/// `"1.2.3"`, or a range expression such as `">= 1.0, < 2.0"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRef {
    pub name: String,
    #[serde(default)]
    pub constraint: String,
}

impl DependencyRef {
    pub fn new(name: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraint: constraint.into(),
        }
    }
}

impl fmt::Display for DependencyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}]", self.name, self.constraint)
    }
}

/// A seed dependency from a Podfile target.
///
/// Either a bare reference with no known sub-dependencies, or a
/// manifest-backed reference to a local podspec that carries its own parsed
/// dependency list.
#[derive(Debug, Clone)]
pub enum SeedDep {
    Bare(DependencyRef),
    Local {
        dep: DependencyRef,
        spec_path: PathBuf,
        subdepends: Vec<DependencyRef>,
    },
}

impl SeedDep {
    pub fn name(&self) -> &str {
        match self {
            SeedDep::Bare(d) => &d.name,
            SeedDep::Local { dep, .. } => &dep.name,
        }
    }

    pub fn constraint(&self) -> &str {
        match self {
            SeedDep::Bare(d) => &d.constraint,
            SeedDep::Local { dep, .. } => &dep.constraint,
        }
    }

    /// Parsed sub-dependency list, when the seed is backed by a local spec.
    pub fn subdepends(&self) -> Option<&[DependencyRef]> {
        match self {
            SeedDep::Bare(_) => None,
            SeedDep::Local { subdepends, .. } => Some(subdepends),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, SeedDep::Local { .. })
    }
}

/// First `/`-separated segment of a module name.
///
/// `"Foo/Bar"` and `"Foo"` both have base module `"Foo"`.
pub fn base_module(name: &str) -> &str {
    name.split('/').next().unwrap_or(name)
}

/// Iterate a module name followed by successively shorter path prefixes.
///
/// `"A/B/C"` yields `"A/B/C"`, `"A/B"`, `"A"`. A reference to a non-existent
/// nested sub-module can this way fall back to its parent module.
pub fn ancestor_chain(name: &str) -> impl Iterator<Item = &str> {
    let mut current = Some(name);
    std::iter::from_fn(move || {
        let item = current?;
        current = item.rfind('/').map(|idx| &item[..idx]);
        Some(item)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_module_plain_and_nested() {
        assert_eq!(base_module("Foo"), "Foo");
        assert_eq!(base_module("Foo/Bar/Baz"), "Foo");
    }

    #[test]
    fn ancestor_chain_order() {
        let chain: Vec<&str> = ancestor_chain("A/B/C").collect();
        assert_eq!(chain, vec!["A/B/C", "A/B", "A"]);
    }

    #[test]
    fn ancestor_chain_single_segment() {
        let chain: Vec<&str> = ancestor_chain("A").collect();
        assert_eq!(chain, vec!["A"]);
    }

    #[test]
    fn seed_dep_accessors() {
        let bare = SeedDep::Bare(DependencyRef::new("AFNetworking", "~> 3.0"));
        assert_eq!(bare.name(), "AFNetworking");
        assert_eq!(bare.constraint(), "~> 3.0");
        assert!(bare.subdepends().is_none());
        assert!(!bare.is_local());

        let local = SeedDep::Local {
            dep: DependencyRef::new("MyKit", "1.0.0"),
            spec_path: PathBuf::from("Modules/MyKit/MyKit.podspec"),
            subdepends: vec![DependencyRef::new("AFNetworking", "")],
        };
        assert!(local.is_local());
        assert_eq!(local.subdepends().unwrap().len(), 1);
    }

    #[test]
    fn dependency_ref_display() {
        let dep = DependencyRef::new("SDWebImage", ">= 4.0");
        assert_eq!(dep.to_string(), "[SDWebImage:>= 4.0]");
    }
}
