use std::collections::BTreeSet;

/// Sliding window of active chunk indices along the travel axis.
///
/// Index `i` covers depths `(origin - (i + 1) * length, origin - i * length]`,
/// so travelling toward `-z` increases the index. The window keeps `behind`
/// chunks behind the current one and `ahead` chunks in front of it.
#[derive(Clone, Debug)]
pub struct SegmentWindow {
    origin: f32,
    length: f32,
    behind: i64,
    ahead: i64,
    active: BTreeSet<i64>,
}

/// Indices that entered and left the window during one update.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WindowChange {
    /// Newly desired indices, to be instantiated.
    pub spawned: Vec<i64>,
    /// Indices no longer desired, to be destroyed.
    pub despawned: Vec<i64>,
}

impl SegmentWindow {
    /// Creates an empty window; the first [`update`](Self::update) fills it.
    pub fn new(origin: f32, length: f32, behind: u32, ahead: u32) -> Self {
        Self {
            origin,
            length: length.max(f32::EPSILON),
            behind: i64::from(behind),
            ahead: i64::from(ahead),
            active: BTreeSet::new(),
        }
    }

    /// Index of the chunk containing `depth`.
    pub fn current_index(&self, depth: f32) -> i64 {
        ((self.origin - depth) / self.length).floor() as i64
    }

    /// The full set of indices that should be alive at `depth`.
    pub fn desired(&self, depth: f32) -> BTreeSet<i64> {
        let current = self.current_index(depth);
        (current - self.behind..=current + self.ahead).collect()
    }

    /// Currently active indices.
    pub fn active(&self) -> &BTreeSet<i64> {
        &self.active
    }

    /// Recomputes the window for `depth`.
    ///
    /// Returns `None` when the window is unchanged, so callers do no work on
    /// the vast majority of frames.
    pub fn update(&mut self, depth: f32) -> Option<WindowChange> {
        let desired = self.desired(depth);
        if desired == self.active {
            return None;
        }
        let change = WindowChange {
            spawned: desired.difference(&self.active).copied().collect(),
            despawned: self.active.difference(&desired).copied().collect(),
        };
        self.active = desired;
        Some(change)
    }
}
