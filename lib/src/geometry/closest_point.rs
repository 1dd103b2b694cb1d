//! Radius bounded closest point lookup on a uniform grid.
//!
//! The cell size equals the search radius, so a query only has to visit the
//! 3x3 block of cells around the query point. Box queries visit the cells
//! the box overlaps.

use super::Point;
use crate::Coord;
use std::collections::HashMap;

pub(crate) struct ClosestPointInRadius<T> {
    radius: Coord,
    radius2: i128,
    cells: HashMap<(Coord, Coord), Vec<(Point, T)>>,
}

impl<T: Copy + PartialEq> ClosestPointInRadius<T> {
    /// `radius` must be positive.
    pub fn new(radius: Coord) -> Self {
        debug_assert!(radius > 0);
        let radius = radius.max(1);
        Self {
            radius,
            radius2: radius as i128 * radius as i128,
            cells: HashMap::new(),
        }
    }

    #[inline]
    fn cell(&self, p: &Point) -> (Coord, Coord) {
        (p.x.div_euclid(self.radius), p.y.div_euclid(self.radius))
    }

    pub fn insert(&mut self, p: Point, value: T) {
        let cell = self.cell(&p);
        self.cells.entry(cell).or_default().push((p, value));
    }

    /// Remove `value` stored at `p`. Returns false if it was not there.
    pub fn erase(&mut self, p: &Point, value: &T) -> bool {
        let cell = self.cell(p);
        if let Some(items) = self.cells.get_mut(&cell) {
            if let Some(pos) = items.iter().position(|(q, v)| q == p && v == value) {
                items.remove(pos);
                return true;
            }
        }
        false
    }

    /// Closest accepted value strictly within the radius, with its squared
    /// distance. Ties go to the value inserted first in the lowest cell.
    pub fn find<F>(&self, p: &Point, accept: F) -> Option<(T, i128)>
    where
        F: Fn(&T) -> bool,
    {
        let (cx, cy) = self.cell(p);
        let mut best: Option<(T, i128)> = None;
        for dy in -1..=1 {
            for dx in -1..=1 {
                let Some(items) = self.cells.get(&(cx + dx, cy + dy)) else {
                    continue;
                };
                for (q, value) in items {
                    let d2 = p.distance_squared(q);
                    if d2 < self.radius2
                        && best.map_or(true, |(_, best_d2)| d2 < best_d2)
                        && accept(value)
                    {
                        best = Some((*value, d2));
                    }
                }
            }
        }
        best
    }

    /// Visit every value stored in a cell overlapping the box `min..=max`.
    /// Values in those cells but outside the box are visited too.
    pub fn for_each_in_box<F>(&self, min: &Point, max: &Point, mut visit: F)
    where
        F: FnMut(&Point, &T),
    {
        let (x0, y0) = self.cell(min);
        let (x1, y1) = self.cell(max);
        let num_cells = (x1 - x0 + 1) as i128 * (y1 - y0 + 1) as i128;
        if num_cells > self.cells.len() as i128 {
            for (q, value) in self.cells.values().flatten() {
                visit(q, value);
            }
            return;
        }
        for cy in y0..=y1 {
            for cx in x0..=x1 {
                if let Some(items) = self.cells.get(&(cx, cy)) {
                    for (q, value) in items {
                        visit(q, value);
                    }
                }
            }
        }
    }
}
