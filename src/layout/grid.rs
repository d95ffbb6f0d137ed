//! Pane arena and per-pane-count layout rules (spec §4.F).
//!
//! Panes live in a single arena owned by the grid; a pane refers to its
//! neighbors by stable index, never by owning reference, so drag-to-swap
//! never needs a pane to reach back into the grid through a borrow (spec §9).

pub const MIN_PANE_WIDTH: u16 = 30;
pub const MIN_PANE_HEIGHT: u16 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

/// One arena slot: the session assigned to this position. `None` for an
/// as-yet-unfilled slot (shouldn't persist past layout construction).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaneSlot {
    pub session_index: usize,
}

/// Owns all panes for the active workspace. Panes refer to each other only
/// by index into `slots`, so a swap is a plain `Vec::swap`.
#[derive(Debug, Default)]
pub struct PaneArena {
    slots: Vec<PaneSlot>,
}

impl PaneArena {
    #[must_use]
    pub fn from_session_count(count: usize) -> Self {
        PaneArena {
            slots: (0..count).map(|i| PaneSlot { session_index: i }).collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub fn slot(&self, index: usize) -> Option<PaneSlot> {
        self.slots.get(index).copied()
    }

    /// Swap the sessions shown at two pane positions (drag-to-swap, spec
    /// §4.F); the layout itself is unaffected since positions are by index.
    pub fn swap(&mut self, a: usize, b: usize) {
        self.slots.swap(a, b);
    }
}

/// Pure layout function: given a pane count and total terminal area,
/// produce the rect for each pane in arena order. Rects are computed with
/// equal proportions per the layout rule table; clamping to the 30x10
/// minimum happens in the splitter once a drag is in progress, not here.
#[must_use]
pub fn compute_layout(pane_count: usize, area: Rect) -> Vec<Rect> {
    match pane_count {
        0 => Vec::new(),
        1 => vec![area],
        2 => split_n_horizontal(area, 2),
        3 => {
            // Two over one: top row split in two, bottom row full width.
            let top_height = area.height / 2;
            let bottom_height = area.height - top_height;
            let top = Rect {
                height: top_height,
                ..area
            };
            let bottom = Rect {
                y: area.y + top_height,
                height: bottom_height,
                ..area
            };
            let mut rects = split_n_horizontal(top, 2);
            rects.push(bottom);
            rects
        }
        4 => {
            let top_height = area.height / 2;
            let bottom_height = area.height - top_height;
            let top = Rect {
                height: top_height,
                ..area
            };
            let bottom = Rect {
                y: area.y + top_height,
                height: bottom_height,
                ..area
            };
            let mut rects = split_n_horizontal(top, 2);
            rects.extend(split_n_horizontal(bottom, 2));
            rects
        }
        n => {
            // 5+: rows of two, last row may have one.
            let row_count = n.div_ceil(2);
            let row_height = area.height / row_count as u16;
            let mut rects = Vec::with_capacity(n);
            let mut remaining = n;
            for row in 0..row_count {
                let this_row_height = if row + 1 == row_count {
                    area.height - row_height * (row_count as u16 - 1)
                } else {
                    row_height
                };
                let row_rect = Rect {
                    y: area.y + row_height * row as u16,
                    height: this_row_height,
                    ..area
                };
                let cols = remaining.min(2);
                rects.extend(split_n_horizontal(row_rect, cols));
                remaining -= cols;
            }
            rects
        }
    }
}

fn split_n_horizontal(area: Rect, n: usize) -> Vec<Rect> {
    if n == 0 {
        return Vec::new();
    }
    let base_width = area.width / n as u16;
    let mut rects = Vec::with_capacity(n);
    let mut x = area.x;
    for i in 0..n {
        let width = if i + 1 == n {
            area.x + area.width - x
        } else {
            base_width
        };
        rects.push(Rect {
            x,
            width,
            ..area
        });
        x += width;
    }
    rects
}
