//! Selection state store for one map session.
//!
//! The store owns the installed [`SelectionSet`] and the generation token that
//! identifies the current search cycle. It is a plain state machine:
//!
//! - `Empty` until a cycle installs at least one destination;
//! - `Populated` with an optional selected index afterwards.
//!
//! Every cycle starts with [`SelectionStore::begin_search`], which bumps the
//! generation. Results are only installed when they carry the current
//! generation, so a fetch that resolves after a newer cycle has begun is
//! discarded instead of overwriting newer state.

use super::Destination;

/// Monotonic search-cycle token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    /// Raw counter, starting at zero before the first search.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

/// Return the index of the shortest length, preferring the lowest index on
/// ties.
///
/// ```
/// use walkmap::domain::shortest_index;
///
/// assert_eq!(shortest_index([120.0, 80.0, 200.0, 80.0, 150.0]), Some(1));
/// assert_eq!(shortest_index(std::iter::empty()), None);
/// ```
#[must_use]
pub fn shortest_index(lengths: impl IntoIterator<Item = f64>) -> Option<usize> {
    lengths
        .into_iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (index, length)| match best {
            Some((_, best_length)) if length >= best_length => best,
            _ => Some((index, length)),
        })
        .map(|(index, _)| index)
}

/// Destinations installed for one cycle plus the selected index.
///
/// ## Invariants
/// - never empty;
/// - `selected_index`, when present, indexes into `destinations`.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionSet {
    destinations: Vec<Destination>,
    selected_index: Option<usize>,
}

impl SelectionSet {
    fn with_shortest_selected(destinations: Vec<Destination>) -> Option<Self> {
        let selected_index =
            shortest_index(destinations.iter().map(|entry| entry.route.length_m()))?;
        Some(Self {
            destinations,
            selected_index: Some(selected_index),
        })
    }

    /// Installed destinations in fetch order.
    #[must_use]
    pub fn destinations(&self) -> &[Destination] {
        &self.destinations
    }

    /// Number of installed destinations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    /// Always false for an installed set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }

    /// Index of the selected destination.
    #[must_use]
    pub const fn selected_index(&self) -> Option<usize> {
        self.selected_index
    }

    /// Destination at `index`, if in range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Destination> {
        self.destinations.get(index)
    }

    /// The selected destination, if any.
    #[must_use]
    pub fn selected(&self) -> Option<&Destination> {
        self.selected_index.and_then(|index| self.get(index))
    }
}

/// Before/after selected index for one transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionChange {
    /// Selected index before the transition.
    pub previous: Option<usize>,
    /// Selected index after the transition.
    pub current: Option<usize>,
}

impl SelectionChange {
    /// True when the transition left the selection untouched.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        match (self.previous, self.current) {
            (None, None) => true,
            (Some(previous), Some(current)) => previous == current,
            _ => false,
        }
    }
}

/// Result of [`SelectionStore::install`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The set was installed and the shortest route selected.
    Installed {
        /// Number of destinations installed.
        destinations: usize,
        /// Index of the shortest route.
        selected_index: usize,
    },
    /// Nothing survived the cycle; the store stays empty.
    Empty,
    /// The results belong to a superseded cycle and were dropped.
    Stale {
        /// Generation the results were fetched for.
        received: Generation,
        /// Generation in progress when they arrived.
        current: Generation,
    },
}

/// Errors raised by selection transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    /// Nothing is installed.
    #[error("no destinations are installed")]
    Empty,
    /// The index is past the end of the installed set.
    #[error("destination index {index} is out of range for {len} destinations")]
    OutOfRange {
        /// Requested index.
        index: usize,
        /// Installed set size.
        len: usize,
    },
}

/// Selection store state machine.
#[derive(Debug, Clone, Default)]
pub struct SelectionStore {
    generation: Generation,
    selection: Option<SelectionSet>,
}

impl SelectionStore {
    /// Empty store at generation zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generation of the cycle currently in progress.
    #[must_use]
    pub const fn generation(&self) -> Generation {
        self.generation
    }

    /// Installed set, or `None` while empty.
    #[must_use]
    pub const fn selection(&self) -> Option<&SelectionSet> {
        self.selection.as_ref()
    }

    /// Selected index, or `None` when empty or cleared.
    #[must_use]
    pub fn selected_index(&self) -> Option<usize> {
        self.selection.as_ref().and_then(SelectionSet::selected_index)
    }

    /// Start a new cycle: drop the installed set and issue a fresh token.
    pub fn begin_search(&mut self) -> Generation {
        self.generation = self.generation.next();
        self.selection = None;
        self.generation
    }

    /// Install a cycle's resolved destinations in one step.
    ///
    /// Results for any generation other than the current one are discarded.
    /// A repeated install for the current generation replaces the set
    /// wholesale.
    pub fn install(
        &mut self,
        generation: Generation,
        destinations: Vec<Destination>,
    ) -> InstallOutcome {
        if generation != self.generation {
            return InstallOutcome::Stale {
                received: generation,
                current: self.generation,
            };
        }

        let count = destinations.len();
        self.selection = SelectionSet::with_shortest_selected(destinations);
        match self.selection.as_ref().and_then(SelectionSet::selected_index) {
            Some(selected_index) => InstallOutcome::Installed {
                destinations: count,
                selected_index,
            },
            None => InstallOutcome::Empty,
        }
    }

    /// Select the destination at `index`.
    ///
    /// # Errors
    ///
    /// Fails when the store is empty or `index` is out of range; the state is
    /// left untouched in both cases.
    pub fn select(&mut self, index: usize) -> Result<SelectionChange, SelectionError> {
        let selection = self.selection.as_mut().ok_or(SelectionError::Empty)?;
        if index >= selection.len() {
            return Err(SelectionError::OutOfRange {
                index,
                len: selection.len(),
            });
        }
        let previous = selection.selected_index.replace(index);
        Ok(SelectionChange {
            previous,
            current: Some(index),
        })
    }

    /// Clear the selection while keeping the installed set.
    pub fn clear(&mut self) -> SelectionChange {
        let previous = self
            .selection
            .as_mut()
            .and_then(|selection| selection.selected_index.take());
        SelectionChange {
            previous,
            current: None,
        }
    }
}
