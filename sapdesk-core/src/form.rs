//! Editable draft of one record
//!
//! The form keeps the last persisted field set next to a working copy. Edits
//! only touch the working copy; nothing reaches the server until the owner
//! saves, and a failed save leaves the working copy exactly as it was.

/// Draft binder for one record's editable fields
#[derive(Debug, Clone, PartialEq)]
pub struct FormState<D> {
    baseline: D,
    draft: D,
}

impl<D: Clone + PartialEq> FormState<D> {
    /// Starts a form whose draft equals `baseline`
    pub fn new(baseline: D) -> Self {
        Self {
            draft: baseline.clone(),
            baseline,
        }
    }

    pub fn draft(&self) -> &D {
        &self.draft
    }

    /// Applies an edit to the working copy
    pub fn edit<F>(&mut self, f: F)
    where
        F: FnOnce(&mut D),
    {
        f(&mut self.draft);
    }

    pub fn baseline(&self) -> &D {
        &self.baseline
    }

    /// True when the working copy differs from what was last persisted
    pub fn is_dirty(&self) -> bool {
        self.draft != self.baseline
    }

    /// Reseeds both copies, e.g. after a full record arrives from the server
    pub fn replace(&mut self, baseline: D) {
        self.draft = baseline.clone();
        self.baseline = baseline;
    }
}

impl<D: Clone + PartialEq + Default> Default for FormState<D> {
    fn default() -> Self {
        Self::new(D::default())
    }
}
