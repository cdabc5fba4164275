//! Grid Pathfinder
//!
//! Breadth-first search over cardinal neighbours. Runs once per generation
//! to validate reachability and to lay checkpoints along the route.

use std::collections::VecDeque;

use super::cell::{Cell, GridCoord};
use super::grid::MazeGrid;

/// Ordered route from start to finish, both ends included.
pub type SolutionPath = Vec<GridCoord>;

/// Shortest route over {Path, Start, Finish}, or `None` if finish is unreachable.
pub fn find_path(grid: &MazeGrid, start: GridCoord, finish: GridCoord) -> Option<SolutionPath> {
    find_path_with(grid, start, finish, Cell::is_traversable)
}

/// Shortest route using a caller-supplied traversable predicate.
pub fn find_path_with<F>(
    grid: &MazeGrid,
    start: GridCoord,
    finish: GridCoord,
    passable: F,
) -> Option<SolutionPath>
where
    F: Fn(Cell) -> bool,
{
    if !grid.in_bounds(start) || !grid.in_bounds(finish) {
        return None;
    }
    if !passable(grid.cell(start)) || !passable(grid.cell(finish)) {
        return None;
    }

    let width = grid.width();
    let index = |c: GridCoord| c.y * width + c.x;

    let mut visited = vec![false; width * grid.height()];
    let mut parent: Vec<Option<GridCoord>> = vec![None; width * grid.height()];
    let mut queue = VecDeque::new();

    visited[index(start)] = true;
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        if current == finish {
            return Some(reconstruct(&parent, index, start, finish));
        }

        for next in grid.neighbors(current) {
            let idx = index(next);
            if !visited[idx] && passable(grid.cell(next)) {
                visited[idx] = true;
                parent[idx] = Some(current);
                queue.push_back(next);
            }
        }
    }

    None
}

fn reconstruct<I>(
    parent: &[Option<GridCoord>],
    index: I,
    start: GridCoord,
    finish: GridCoord,
) -> SolutionPath
where
    I: Fn(GridCoord) -> usize,
{
    let mut path = vec![finish];
    let mut current = finish;
    while current != start {
        match parent[index(current)] {
            Some(prev) => {
                path.push(prev);
                current = prev;
            }
            None => break,
        }
    }
    path.reverse();
    path
}

/// Flood-fill mask (row-major) of cells reachable from `start`.
pub fn reachable_from<F>(grid: &MazeGrid, start: GridCoord, passable: F) -> Vec<bool>
where
    F: Fn(Cell) -> bool,
{
    let width = grid.width();
    let mut visited = vec![false; width * grid.height()];
    if !grid.in_bounds(start) || !passable(grid.cell(start)) {
        return visited;
    }

    let mut queue = VecDeque::new();
    visited[start.y * width + start.x] = true;
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        for next in grid.neighbors(current) {
            let idx = next.y * width + next.x;
            if !visited[idx] && passable(grid.cell(next)) {
                visited[idx] = true;
                queue.push_back(next);
            }
        }
    }

    visited
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_straight_corridor() {
        let grid = MazeGrid::from_ascii(&[
            "#####",
            "#S F#",
            "#####",
        ]);
        let path = find_path(&grid, grid.start(), grid.finish()).unwrap();
        assert_eq!(
            path,
            vec![GridCoord::new(1, 1), GridCoord::new(2, 1), GridCoord::new(3, 1)]
        );
    }

    #[test]
    fn test_shortest_route_chosen() {
        let grid = MazeGrid::from_ascii(&[
            "#######",
            "#S    #",
            "# ### #",
            "#    F#",
            "#######",
        ]);
        let path = find_path(&grid, grid.start(), grid.finish()).unwrap();
        // Manhattan distance is 6, so 7 cells including both ends.
        assert_eq!(path.len(), 7);
        assert_eq!(path.first(), Some(&grid.start()));
        assert_eq!(path.last(), Some(&grid.finish()));
        for pair in path.windows(2) {
            assert_eq!(pair[0].manhattan(pair[1]), 1);
        }
    }

    #[test]
    fn test_unreachable_returns_none() {
        let grid = MazeGrid::from_ascii(&[
            "#######",
            "#S #  #",
            "#  # F#",
            "#######",
        ]);
        assert!(find_path(&grid, grid.start(), grid.finish()).is_none());
    }

    #[test]
    fn test_overlays_block_route() {
        // Traps are not on the traversable set.
        let grid = MazeGrid::from_ascii(&[
            "#####",
            "#S^F#",
            "#####",
        ]);
        assert!(find_path(&grid, grid.start(), grid.finish()).is_none());
        assert!(find_path_with(&grid, grid.start(), grid.finish(), Cell::is_open).is_some());
    }

    #[test]
    fn test_reachable_mask() {
        let grid = MazeGrid::from_ascii(&[
            "######",
            "#S #F#",
            "######",
        ]);
        let mask = reachable_from(&grid, grid.start(), Cell::is_open);
        assert!(mask[1 * 6 + 1]);
        assert!(mask[1 * 6 + 2]);
        assert!(!mask[1 * 6 + 4]);
        assert_eq!(mask.iter().filter(|v| **v).count(), 2);
    }
}
