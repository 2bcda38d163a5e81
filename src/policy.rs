//! Access policy.
//!
//! Decides which catalog entities generated code may see and touch:
//! `visible = (requested or the whole catalog) - denied`, where the
//! deny-list always wins over an explicit request.

use std::collections::BTreeSet;

use crate::catalog::Catalog;
use crate::error::{BoxcarError, Result};

/// An immutable set of entity names that must never be visible.
///
/// Names are stored lowercased; lookups are ASCII case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DenyList {
    names: BTreeSet<String>,
}

impl DenyList {
    /// Creates a deny-list from entity names. Blank names are ignored.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|name| name.as_ref().trim().to_ascii_lowercase())
            .filter(|name| !name.is_empty())
            .collect();
        Self { names }
    }

    /// The system-level deny-list. Empty unless a deployment passes its own.
    pub fn system() -> Self {
        Self::default()
    }

    /// Returns a new list holding the names of both lists.
    pub fn union(&self, other: &DenyList) -> DenyList {
        Self {
            names: self.names.union(&other.names).cloned().collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&name.to_ascii_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// The ordered set of entity names visible to code generation and execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibleEntities {
    names: Vec<String>,
}

impl VisibleEntities {
    /// Builds a visible set directly from names, dropping duplicates.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut visible = Self::default();
        for name in names {
            visible.push(name.into());
        }
        visible
    }

    fn push(&mut self, name: String) {
        if !self.contains(&name) {
            self.names.push(name);
        }
    }

    /// Returns true if `name` is visible (ASCII case-insensitive).
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n.eq_ignore_ascii_case(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// The requested allow-list together with the effective deny-list.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    requested: Option<Vec<String>>,
    denied: DenyList,
}

impl AccessPolicy {
    /// Creates a policy.
    ///
    /// `requested` is `None` for "every entity in the catalog". A present but
    /// empty list, or a blank name in it, is a configuration error. The
    /// caller's `except` names are unioned with `system`.
    pub fn new(
        requested: Option<Vec<String>>,
        except: &[String],
        system: &DenyList,
    ) -> Result<Self> {
        if let Some(names) = &requested {
            if names.is_empty() {
                return Err(BoxcarError::config(
                    "requested entity list must not be empty; omit it to use every entity",
                ));
            }
            if names.iter().any(|name| name.trim().is_empty()) {
                return Err(BoxcarError::config("requested entity list contains a blank name"));
            }
        }

        let requested = requested.map(|names| {
            names
                .into_iter()
                .map(|name| name.trim().to_string())
                .collect()
        });

        Ok(Self {
            requested,
            denied: system.union(&DenyList::new(except)),
        })
    }

    /// A policy that exposes the whole catalog.
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn requested(&self) -> Option<&[String]> {
        self.requested.as_deref()
    }

    pub fn denied(&self) -> &DenyList {
        &self.denied
    }

    /// Computes the visible entities of `catalog` under this policy.
    pub fn compute_visible(&self, catalog: &Catalog) -> Result<VisibleEntities> {
        compute_visible(catalog, self.requested(), &self.denied)
    }
}

/// Computes `(requested or the whole catalog) - denied` over `catalog`.
///
/// Names are resolved against the catalog and returned in its spelling.
/// A requested name the catalog does not hold is a configuration error.
pub fn compute_visible(
    catalog: &Catalog,
    requested: Option<&[String]>,
    denied: &DenyList,
) -> Result<VisibleEntities> {
    let candidates: Vec<String> = match requested {
        None => catalog.entity_names().map(str::to_string).collect(),
        Some(names) => names
            .iter()
            .map(|name| {
                catalog
                    .entity(name)
                    .map(|table| table.name.clone())
                    .ok_or_else(|| {
                        BoxcarError::config(format!("unknown entity '{name}' in requested list"))
                    })
            })
            .collect::<Result<_>>()?,
    };

    Ok(VisibleEntities::from_names(
        candidates.into_iter().filter(|name| !denied.contains(name)),
    ))
}
