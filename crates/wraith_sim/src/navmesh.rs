//! Grid navigation mesh and A* path planning

use std::collections::{BinaryHeap, HashMap, HashSet};
use wraith_ai::PathStatus;
use wraith_math::{Vec3, AABB};

/// A planned path: cell centers, ending at the destination when it is
/// reachable
#[derive(Clone, Debug, PartialEq)]
pub struct NavPath {
    pub waypoints: Vec<Vec3>,
    pub status: PathStatus,
}

impl NavPath {
    /// No usable path
    pub fn invalid() -> Self {
        Self {
            waypoints: Vec::new(),
            status: PathStatus::Invalid,
        }
    }

    /// Length of the path from `position`, starting at waypoint `index`
    pub fn remaining_from(&self, position: Vec3, index: usize) -> f32 {
        let mut total = 0.0;
        let mut previous = position;
        for waypoint in self.waypoints.iter().skip(index) {
            total += previous.distance(*waypoint);
            previous = *waypoint;
        }
        total
    }
}

/// Flat walkable grid on the XZ plane
#[derive(Clone, Debug)]
pub struct NavGrid {
    origin: Vec3,
    cell_size: f32,
    cols: usize,
    rows: usize,
    walkable: Vec<bool>,
}

impl NavGrid {
    /// Create a fully walkable grid covering `width` x `depth` from `origin`
    pub fn new(origin: Vec3, width: f32, depth: f32, cell_size: f32) -> Self {
        let cols = (width / cell_size).ceil().max(1.0) as usize;
        let rows = (depth / cell_size).ceil().max(1.0) as usize;
        Self {
            origin,
            cell_size,
            cols,
            rows,
            walkable: vec![true; cols * rows],
        }
    }

    /// Mark every cell whose center lies inside `obstacle` (grown by
    /// `clearance` on X and Z) as blocked
    pub fn block(&mut self, obstacle: &AABB, clearance: f32) {
        let grown = obstacle.expand(clearance);
        for idx in 0..self.walkable.len() {
            if grown.contains_point_xz(self.center(idx)) {
                self.walkable[idx] = false;
            }
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of walkable cells
    pub fn walkable_count(&self) -> usize {
        self.walkable.iter().filter(|w| **w).count()
    }

    /// Cell containing `point`, if inside the grid
    pub fn cell_at(&self, point: Vec3) -> Option<usize> {
        if !point.is_finite() {
            return None;
        }
        let col = ((point.x - self.origin.x) / self.cell_size).floor();
        let row = ((point.z - self.origin.z) / self.cell_size).floor();
        if col < 0.0 || row < 0.0 {
            return None;
        }
        let (col, row) = (col as usize, row as usize);
        if col >= self.cols || row >= self.rows {
            return None;
        }
        Some(row * self.cols + col)
    }

    /// Center of a cell, on the grid plane
    pub fn center(&self, idx: usize) -> Vec3 {
        let col = idx % self.cols;
        let row = idx / self.cols;
        Vec3::new(
            self.origin.x + (col as f32 + 0.5) * self.cell_size,
            self.origin.y,
            self.origin.z + (row as f32 + 0.5) * self.cell_size,
        )
    }

    pub fn is_walkable(&self, point: Vec3) -> bool {
        self.walkable_cell(point).is_some()
    }

    fn walkable_cell(&self, point: Vec3) -> Option<usize> {
        self.cell_at(point).filter(|idx| self.walkable[*idx])
    }

    /// Nearest walkable point within `radius` of `point`. Points already on
    /// a walkable cell are returned as-is (flattened onto the grid plane).
    pub fn nearest_walkable(&self, point: Vec3, radius: f32) -> Option<Vec3> {
        if !point.is_finite() {
            return None;
        }
        if self.is_walkable(point) {
            return Some(point.with_y(self.origin.y));
        }

        let flat = point.with_y(self.origin.y);
        let reach = (radius / self.cell_size).ceil() as i64 + 1;
        let col = ((point.x - self.origin.x) / self.cell_size).floor() as i64;
        let row = ((point.z - self.origin.z) / self.cell_size).floor() as i64;

        let mut best: Option<(f32, Vec3)> = None;
        for dr in -reach..=reach {
            for dc in -reach..=reach {
                let (c, r) = (col + dc, row + dr);
                if c < 0 || r < 0 || c >= self.cols as i64 || r >= self.rows as i64 {
                    continue;
                }
                let idx = r as usize * self.cols + c as usize;
                if !self.walkable[idx] {
                    continue;
                }
                let center = self.center(idx);
                let distance = center.distance(flat);
                if distance <= radius && best.map_or(true, |(d, _)| distance < d) {
                    best = Some((distance, center));
                }
            }
        }
        best.map(|(_, center)| center)
    }

    /// Plan a path from `start` to `end`.
    ///
    /// Starting off the grid gives an [`PathStatus::Invalid`] path. An
    /// unreachable or blocked destination gives a [`PathStatus::Partial`]
    /// path to the reachable cell closest to it.
    pub fn find_path(&self, start: Vec3, end: Vec3) -> NavPath {
        let Some(start_cell) = self.walkable_cell(start) else {
            return NavPath::invalid();
        };
        if !end.is_finite() {
            return NavPath::invalid();
        }

        let goal_cell = self.walkable_cell(end);
        let (cells, reached) = self.astar(start_cell, goal_cell, end);
        let mut waypoints: Vec<Vec3> = cells.iter().skip(1).map(|&idx| self.center(idx)).collect();

        if reached {
            waypoints.pop();
            waypoints.push(end.with_y(self.origin.y));
            NavPath {
                waypoints,
                status: PathStatus::Complete,
            }
        } else {
            NavPath {
                waypoints,
                status: PathStatus::Partial,
            }
        }
    }

    fn neighbors(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        let col = idx % self.cols;
        let row = idx / self.cols;
        let left = (col > 0).then(|| idx - 1);
        let right = (col + 1 < self.cols).then(|| idx + 1);
        let down = (row > 0).then(|| idx - self.cols);
        let up = (row + 1 < self.rows).then(|| idx + self.cols);
        [left, right, down, up]
            .into_iter()
            .flatten()
            .filter(move |n| self.walkable[*n])
    }

    /// A* over walkable cells. Returns the cell chain and whether it ends
    /// at the goal; otherwise the chain ends at the explored cell nearest
    /// to `end`.
    fn astar(&self, start: usize, goal: Option<usize>, end: Vec3) -> (Vec<usize>, bool) {
        #[derive(Clone, Copy)]
        struct Node {
            idx: usize,
            f_score: f32,
        }

        impl PartialEq for Node {
            fn eq(&self, other: &Self) -> bool {
                self.idx == other.idx
            }
        }

        impl Eq for Node {}

        impl PartialOrd for Node {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for Node {
            fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                other.f_score.total_cmp(&self.f_score)
            }
        }

        let target = end.with_y(self.origin.y);
        let heuristic = |idx: usize| self.center(idx).distance(target);

        let mut open_set = BinaryHeap::new();
        let mut came_from: HashMap<usize, usize> = HashMap::new();
        let mut g_score: HashMap<usize, f32> = HashMap::new();
        let mut closed_set: HashSet<usize> = HashSet::new();

        let mut best = (start, heuristic(start));
        g_score.insert(start, 0.0);
        open_set.push(Node {
            idx: start,
            f_score: best.1,
        });

        while let Some(current) = open_set.pop() {
            if Some(current.idx) == goal {
                return (Self::reconstruct(&came_from, current.idx), true);
            }
            if !closed_set.insert(current.idx) {
                continue;
            }

            let h = heuristic(current.idx);
            if h < best.1 {
                best = (current.idx, h);
            }

            let current_g = g_score.get(&current.idx).copied().unwrap_or(f32::MAX);
            for neighbor in self.neighbors(current.idx) {
                if closed_set.contains(&neighbor) {
                    continue;
                }
                let tentative_g = current_g + self.cell_size;
                if tentative_g < g_score.get(&neighbor).copied().unwrap_or(f32::MAX) {
                    came_from.insert(neighbor, current.idx);
                    g_score.insert(neighbor, tentative_g);
                    open_set.push(Node {
                        idx: neighbor,
                        f_score: tentative_g + heuristic(neighbor),
                    });
                }
            }
        }

        (Self::reconstruct(&came_from, best.0), false)
    }

    fn reconstruct(came_from: &HashMap<usize, usize>, last: usize) -> Vec<usize> {
        let mut path = vec![last];
        let mut current = last;
        while let Some(&prev) = came_from.get(&current) {
            path.push(prev);
            current = prev;
        }
        path.reverse();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid() -> NavGrid {
        NavGrid::new(Vec3::ZERO, 10.0, 10.0, 1.0)
    }

    #[test]
    fn test_cell_lookup() {
        let grid = grid();
        assert_eq!(grid.cols(), 10);
        assert_eq!(grid.cell_at(Vec3::new(0.5, 0.0, 0.5)), Some(0));
        assert_eq!(grid.cell_at(Vec3::new(1.5, 0.0, 2.5)), Some(21));
        assert_eq!(grid.cell_at(Vec3::new(-0.1, 0.0, 0.5)), None);
        assert_eq!(grid.cell_at(Vec3::new(10.5, 0.0, 0.5)), None);
        assert_eq!(grid.center(21), Vec3::new(1.5, 0.0, 2.5));
    }

    #[test]
    fn test_open_path_is_complete() {
        let grid = grid();
        let end = Vec3::new(8.2, 0.0, 0.5);
        let path = grid.find_path(Vec3::new(0.5, 0.0, 0.5), end);
        assert_eq!(path.status, PathStatus::Complete);
        assert_eq!(path.waypoints.last(), Some(&end));
        assert_relative_eq!(
            path.remaining_from(Vec3::new(0.5, 0.0, 0.5), 0),
            7.7,
            epsilon = 1e-4
        );
    }

    #[test]
    fn test_path_goes_around_walls() {
        let mut grid = grid();
        // Wall across column 4 with a gap at the top row
        grid.block(
            &AABB::new(Vec3::new(4.1, -1.0, 0.0), Vec3::new(4.9, 2.0, 8.9)),
            0.0,
        );
        let path = grid.find_path(Vec3::new(1.5, 0.0, 1.5), Vec3::new(8.5, 0.0, 1.5));
        assert_eq!(path.status, PathStatus::Complete);
        assert!(path.waypoints.iter().any(|p| p.z > 9.0));
    }

    #[test]
    fn test_enclosed_goal_is_partial() {
        let mut grid = grid();
        grid.block(
            &AABB::new(Vec3::new(4.1, -1.0, 0.0), Vec3::new(4.9, 2.0, 10.0)),
            0.0,
        );
        let path = grid.find_path(Vec3::new(1.5, 0.0, 1.5), Vec3::new(8.5, 0.0, 1.5));
        assert_eq!(path.status, PathStatus::Partial);
        let last = path.waypoints.last().copied().unwrap_or(Vec3::ZERO);
        assert_relative_eq!(last.x, 3.5);
    }

    #[test]
    fn test_off_grid_start_is_invalid() {
        let grid = grid();
        let path = grid.find_path(Vec3::new(-3.0, 0.0, 0.0), Vec3::new(5.0, 0.0, 5.0));
        assert_eq!(path.status, PathStatus::Invalid);
    }

    #[test]
    fn test_nearest_walkable() {
        let mut grid = grid();
        grid.block(
            &AABB::new(Vec3::new(2.0, -1.0, 2.0), Vec3::new(3.0, 2.0, 3.0)),
            0.0,
        );
        let inside = Vec3::new(2.5, 0.0, 2.5);
        assert!(!grid.is_walkable(inside));
        let nearest = grid.nearest_walkable(inside, 2.0).unwrap();
        assert!(grid.is_walkable(nearest));
        assert_relative_eq!(nearest.distance(inside), 1.0);

        let off = Vec3::new(-0.4, 0.0, 0.5);
        assert_eq!(grid.nearest_walkable(off, 1.0), Some(Vec3::new(0.5, 0.0, 0.5)));
        assert_eq!(grid.nearest_walkable(Vec3::new(-30.0, 0.0, 0.0), 2.0), None);
    }
}
