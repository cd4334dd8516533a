//! Test manifests: the immutable description a test module supplies before
//! the engine starts running it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One cell type's slice of a manifest: parallel arrays of names and initial
/// values.
///
/// The two arrays are always the same length; [`VarSet::new`] enforces this.
/// Adding a further cell type to the runner means adding another `VarSet`
/// field (plus storage) — nothing else in the model changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarSet {
    names: Vec<String>,
    initials: Vec<i32>,
}

impl VarSet {
    /// Create a variable set from parallel name/initial arrays.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidManifest::MismatchedVarSet`] if the arrays differ in
    /// length.
    pub fn new(names: Vec<String>, initials: Vec<i32>) -> Result<Self, InvalidManifest> {
        if names.len() != initials.len() {
            return Err(InvalidManifest::MismatchedVarSet {
                names: names.len(),
                initials: initials.len(),
            });
        }
        Ok(Self { names, initials })
    }

    /// An empty variable set.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            names: Vec::new(),
            initials: Vec::new(),
        }
    }

    /// Number of cells in this set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the set has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The cell names, in slot order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The initial values, in slot order.
    #[must_use]
    pub fn initials(&self) -> &[i32] {
        &self.initials
    }
}

/// A test manifest: thread count plus one [`VarSet`] per recognised cell
/// type.
///
/// Read-only after engine start. The recognised cell types are atomic and
/// non-atomic 32-bit signed integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    n_threads: usize,
    atomic_int32: VarSet,
    int32: VarSet,
}

impl Manifest {
    /// Create a manifest.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidManifest::NoThreads`] if `n_threads` is zero.
    pub fn new(
        n_threads: usize,
        atomic_int32: VarSet,
        int32: VarSet,
    ) -> Result<Self, InvalidManifest> {
        if n_threads == 0 {
            return Err(InvalidManifest::NoThreads);
        }
        Ok(Self {
            n_threads,
            atomic_int32,
            int32,
        })
    }

    /// Number of threads the test expects.
    #[must_use]
    pub const fn n_threads(&self) -> usize {
        self.n_threads
    }

    /// The atomic 32-bit integer cells.
    #[must_use]
    pub const fn atomic_int32(&self) -> &VarSet {
        &self.atomic_int32
    }

    /// The non-atomic 32-bit integer cells.
    #[must_use]
    pub const fn int32(&self) -> &VarSet {
        &self.int32
    }

    /// Total number of cells across all types.
    ///
    /// This is the width of every [`crate::State`] observed for this test.
    #[must_use]
    pub fn n_cells(&self) -> usize {
        self.atomic_int32.len() + self.int32.len()
    }

    /// Iterate over every cell name in state order (atomic cells first, then
    /// non-atomic).
    pub fn cell_names(&self) -> impl Iterator<Item = &str> {
        self.atomic_int32
            .names()
            .iter()
            .chain(self.int32.names().iter())
            .map(String::as_str)
    }

    /// Iterate over every cell's initial value in state order.
    pub fn cell_initials(&self) -> impl Iterator<Item = i32> + '_ {
        self.atomic_int32
            .initials()
            .iter()
            .chain(self.int32.initials().iter())
            .copied()
    }
}

/// Error returned when a manifest's pieces do not fit together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidManifest {
    /// The manifest declares zero threads.
    NoThreads,
    /// A variable set's name and initial arrays differ in length.
    MismatchedVarSet { names: usize, initials: usize },
}

impl fmt::Display for InvalidManifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoThreads => f.write_str("manifest declares zero threads"),
            Self::MismatchedVarSet { names, initials } => write!(
                f,
                "variable set has {names} names but {initials} initial values"
            ),
        }
    }
}

impl std::error::Error for InvalidManifest {}

#[cfg(test)]
mod tests {
    use super::*;

    fn var_set(pairs: &[(&str, i32)]) -> VarSet {
        VarSet::new(
            pairs.iter().map(|(n, _)| (*n).to_owned()).collect(),
            pairs.iter().map(|(_, v)| *v).collect(),
        )
        .unwrap()
    }

    #[test]
    fn manifest_accessors() {
        let m = Manifest::new(2, var_set(&[("x", 0), ("y", 0)]), var_set(&[("0:r0", 7)])).unwrap();
        assert_eq!(m.n_threads(), 2);
        assert_eq!(m.n_cells(), 3);
        assert_eq!(
            m.cell_names().collect::<Vec<_>>(),
            vec!["x", "y", "0:r0"]
        );
        assert_eq!(m.cell_initials().collect::<Vec<_>>(), vec![0, 0, 7]);
    }

    #[test]
    fn zero_threads_rejected() {
        let err = Manifest::new(0, VarSet::empty(), VarSet::empty()).unwrap_err();
        assert_eq!(err, InvalidManifest::NoThreads);
        assert_eq!(err.to_string(), "manifest declares zero threads");
    }

    #[test]
    fn mismatched_var_set_rejected() {
        let err = VarSet::new(vec!["x".to_owned()], vec![0, 1]).unwrap_err();
        assert!(matches!(
            err,
            InvalidManifest::MismatchedVarSet {
                names: 1,
                initials: 2
            }
        ));
    }

    #[test]
    fn empty_var_sets_allowed() {
        let m = Manifest::new(1, VarSet::empty(), VarSet::empty()).unwrap();
        assert_eq!(m.n_cells(), 0);
        assert_eq!(m.cell_names().count(), 0);
    }
}
