//! Arithmetic index sets over an entry's occurrence indices.
//!
//! Override ranges are `{from, from + every, ..}` clipped to `[from, until]`.
//! Editing a range of an entry means intersecting and subtracting such sets,
//! so they are modelled explicitly here instead of stepping through
//! flattened occurrence arrays.

use std::fmt;

/// A non-empty arithmetic progression of occurrence indices.
///
/// Always normalized: `until` is the last index actually hit, and a
/// single-element progression has `every == 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Progression {
    from: u32,
    until: u32,
    every: u32,
}

impl Progression {
    /// Builds the progression `{from, from + every, ..} ∩ [from, until]`.
    ///
    /// Returns `None` when `from > until` or `every == 0`.
    pub fn new(from: u32, until: u32, every: u32) -> Option<Self> {
        if from > until || every == 0 {
            return None;
        }
        let steps = (until - from) / every;
        let until = from + steps * every;
        let every = if steps == 0 { 1 } else { every };
        Some(Self { from, until, every })
    }

    /// A progression holding exactly one index.
    pub const fn single(index: u32) -> Self {
        Self {
            from: index,
            until: index,
            every: 1,
        }
    }

    pub const fn from(&self) -> u32 {
        self.from
    }

    pub const fn until(&self) -> u32 {
        self.until
    }

    pub const fn every(&self) -> u32 {
        self.every
    }

    /// Number of indices in the progression.
    pub const fn len(&self) -> u32 {
        (self.until - self.from) / self.every + 1
    }

    /// Progressions are never empty; provided for API symmetry with `len`.
    pub const fn is_empty(&self) -> bool {
        false
    }

    pub const fn contains(&self, index: u32) -> bool {
        index >= self.from && index <= self.until && (index - self.from) % self.every == 0
    }

    /// Zero-based position of `index` within the progression.
    pub const fn position_of(&self, index: u32) -> Option<u32> {
        if self.contains(index) {
            Some((index - self.from) / self.every)
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + use<> {
        let every = self.every as usize;
        (self.from..=self.until).step_by(every)
    }

    /// First element that is `>= index`, if any.
    fn first_at_or_after(&self, index: u32) -> Option<u32> {
        if index <= self.from {
            return Some(self.from);
        }
        let offset = index - self.from;
        let steps = offset.div_ceil(self.every);
        let candidate = u64::from(self.from) + u64::from(steps) * u64::from(self.every);
        u32::try_from(candidate)
            .ok()
            .filter(|candidate| *candidate <= self.until)
    }

    /// Indices present in both progressions.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let lower = self.from.max(other.from);
        let upper = self.until.min(other.until);
        if lower > upper {
            return None;
        }
        // An overflowing lcm means at most one shared index exists.
        let stride = lcm(self.every, other.every).unwrap_or(u32::MAX);

        // Solve the pair of congruences by stepping through `self`; a solution,
        // if one exists, appears within `other.every` steps.
        let mut candidate = self.first_at_or_after(lower)?;
        for _ in 0..other.every {
            if candidate > upper {
                return None;
            }
            if other.contains(candidate) {
                return Self::new(candidate, upper, stride);
            }
            candidate = candidate.checked_add(self.every)?;
        }
        None
    }

    pub fn is_disjoint(&self, other: &Self) -> bool {
        self.intersect(other).is_none()
    }

    /// `self \ other`, as progressions sharing `self`'s stride class.
    ///
    /// The result is the shorter of two equivalent encodings: one run per gap
    /// between removed indices, or one progression per residue left between
    /// them. Pieces are ordered by their first index.
    pub fn difference(&self, other: &Self) -> Vec<Self> {
        let Some(removed) = self.intersect(other) else {
            return vec![*self];
        };

        let mut pieces = Vec::new();
        if removed.from > self.from {
            pieces.extend(Self::new(self.from, removed.from - self.every, self.every));
        }

        let ratio = removed.every / self.every;
        let removed_count = removed.len();
        if ratio > 1 && removed_count > 1 {
            let per_gap = removed_count - 1;
            let per_residue = ratio - 1;
            if per_gap <= per_residue {
                for start in removed.iter().take(per_gap as usize) {
                    pieces.extend(Self::new(
                        start + self.every,
                        start + removed.every - self.every,
                        self.every,
                    ));
                }
            } else {
                let last_gap_start = removed.until - removed.every;
                for residue in 1..ratio {
                    let offset = residue * self.every;
                    pieces.extend(Self::new(
                        removed.from + offset,
                        last_gap_start + offset,
                        removed.every,
                    ));
                }
            }
        }

        if removed.until < self.until {
            pieces.extend(Self::new(removed.until + self.every, self.until, self.every));
        }

        pieces.sort();
        merge_adjacent(pieces)
    }

    /// Joins `next` onto `self` when the concatenation is still a progression.
    fn joined(&self, next: &Self) -> Option<Self> {
        if next.from <= self.until {
            return None;
        }
        let gap = next.from - self.until;
        let stride = if self.len() > 1 { self.every } else { gap };
        let fits = gap == stride && (next.len() == 1 || next.every == stride);
        fits.then(|| Self {
            from: self.from,
            until: next.until,
            every: stride,
        })
    }
}

fn merge_adjacent(pieces: Vec<Progression>) -> Vec<Progression> {
    let mut merged: Vec<Progression> = Vec::with_capacity(pieces.len());
    for piece in pieces {
        match merged.last().and_then(|last| last.joined(&piece)) {
            Some(joined) => {
                if let Some(last) = merged.last_mut() {
                    *last = joined;
                }
            }
            None => merged.push(piece),
        }
    }
    merged
}

impl fmt::Display for Progression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.every == 1 {
            write!(f, "[{}..={}]", self.from, self.until)
        } else {
            write!(f, "[{}..={} every {}]", self.from, self.until, self.every)
        }
    }
}

const fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

fn lcm(a: u32, b: u32) -> Option<u32> {
    (a / gcd(a, b)).checked_mul(b)
}
