//! Bresenham lines between tiles
//!
//! [`line_to`] is the canonical line. Sight and straight-line routing also
//! accept the other Bresenham lines between the same endpoints, produced by
//! starting the error term at a different value.

use bresenham::Bresenham;

use super::coords::TilePos;

/// Tiles on the line from `from` to `to`, excluding `from` and including
/// `to`. Empty when both are the same tile. Stays on `from`'s layer.
pub fn line_to(from: TilePos, to: TilePos) -> Vec<TilePos> {
    if from.xy() == to.xy() {
        return Vec::new();
    }
    let z = from.z();
    let start = (from.x() as isize, from.y() as isize);
    let end = (to.x() as isize, to.y() as isize);

    let mut line: Vec<TilePos> = Bresenham::new(start, end)
        .skip(1)
        .map(|(x, y)| TilePos::new(x as i32, y as i32, z))
        .collect();
    line.push(TilePos::new(to.x(), to.y(), z));
    line
}

/// Line from `from` to `to` with the error term starting at `slope`.
/// `None` when that starting term does not land on `to`.
pub fn line_with_slope(from: TilePos, to: TilePos, slope: i32) -> Option<Vec<TilePos>> {
    let d = to.xy() - from.xy();
    let (ax, ay) = (d.x.abs() * 2, d.y.abs() * 2);
    let (sx, sy) = (d.x.signum(), d.y.signum());
    let steps = d.x.abs().max(d.y.abs());
    let (mut x, mut y, mut t) = (from.x(), from.y(), slope);

    let mut line = Vec::with_capacity(steps as usize);
    for _ in 0..steps {
        if ax == ay {
            x += sx;
            y += sy;
        } else if ax > ay {
            if t > 0 {
                y += sy;
                t -= ax;
            }
            x += sx;
            t += ay;
        } else {
            if t > 0 {
                x += sx;
                t -= ay;
            }
            y += sy;
            t += ax;
        }
        line.push(TilePos::new(x, y, from.z()));
    }
    (x == to.x() && y == to.y()).then_some(line)
}

/// Bresenham lines from `from` to `to` for each starting error term worth
/// trying, the latest minor-axis step first. Neighboring terms can yield the
/// same line. Straight and diagonal pairs have exactly one.
pub fn line_variants(from: TilePos, to: TilePos) -> impl Iterator<Item = Vec<TilePos>> {
    let d = to.xy() - from.xy();
    let (ax, ay) = (d.x.abs() * 2, d.y.abs() * 2);
    let (major, minor) = (ax.max(ay), ax.min(ay));
    let bias = minor - major / 2;
    let sign = bias.signum();
    let (lowest, highest) = if minor == 0 || minor == major || sign == 0 {
        (0, 0)
    } else {
        (-1, bias.abs() * 2 + 1)
    };
    (lowest..=highest)
        .rev()
        .filter_map(move |k| line_with_slope(from, to, k * sign))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_tile_is_empty() {
        let p = TilePos::new(3, 3, 0);
        assert!(line_to(p, p).is_empty());
    }

    #[test]
    fn test_diagonal_line() {
        let line = line_to(TilePos::new(0, 0, 0), TilePos::new(3, 3, 0));
        assert_eq!(
            line,
            vec![
                TilePos::new(1, 1, 0),
                TilePos::new(2, 2, 0),
                TilePos::new(3, 3, 0),
            ]
        );
    }

    #[test]
    fn test_line_is_contiguous_in_every_octant() {
        let from = TilePos::new(0, 0, 0);
        for (x, y) in [(7, 2), (-7, 2), (2, -7), (-2, -7), (5, 0), (0, -5), (-4, -4)] {
            let to = TilePos::new(x, y, 0);
            let line = line_to(from, to);
            assert_eq!(line.last(), Some(&to));
            assert_eq!(line.len() as i32, from.rl_dist(to));

            let mut prev = from;
            for pos in line {
                assert!(prev.is_adjacent(pos), "{prev} -> {pos}");
                prev = pos;
            }
        }
    }

    #[test]
    fn test_variants_reach_goal_contiguously() {
        let from = TilePos::new(0, 0, 0);
        for (x, y) in [(4, 1), (-4, 1), (1, -6), (-3, -7), (9, 2), (6, 6), (0, 5)] {
            let to = TilePos::new(x, y, 0);
            let variants: Vec<Vec<TilePos>> = line_variants(from, to).collect();
            assert!(!variants.is_empty(), "no line to {to}");
            for line in variants {
                assert_eq!(line.last(), Some(&to));
                assert_eq!(line.len() as i32, from.rl_dist(to));
                let mut prev = from;
                for pos in line {
                    assert!(prev.is_adjacent(pos), "{prev} -> {pos}");
                    prev = pos;
                }
            }
        }
    }

    #[test]
    fn test_variants_cover_alternate_lines() {
        let from = TilePos::new(0, 0, 0);
        let to = TilePos::new(4, 1, 0);
        let variants: Vec<Vec<TilePos>> = line_variants(from, to).collect();
        let t = |x, y| TilePos::new(x, y, 0);

        // Minor step taken as late and as early as possible
        assert_eq!(variants.first().unwrap(), &vec![t(1, 0), t(2, 0), t(3, 0), t(4, 1)]);
        assert_eq!(variants.last().unwrap(), &vec![t(1, 1), t(2, 1), t(3, 1), t(4, 1)]);
        assert!(variants.contains(&line_to(from, to)));
    }

    #[test]
    fn test_axis_and_diagonal_have_one_variant() {
        let from = TilePos::new(2, 2, 0);
        for to in [TilePos::new(9, 2, 0), TilePos::new(2, -4, 0), TilePos::new(6, 6, 0)] {
            let variants: Vec<Vec<TilePos>> = line_variants(from, to).collect();
            assert_eq!(variants, vec![line_to(from, to)]);
        }
        assert_eq!(line_variants(from, from).collect::<Vec<_>>(), vec![Vec::new()]);
    }

    #[test]
    fn test_slope_that_misses_goal_is_rejected() {
        // A large starting term climbs too early and overshoots the minor axis
        let from = TilePos::new(0, 0, 0);
        assert!(line_with_slope(from, TilePos::new(6, 1, 0), 50).is_none());
    }
}
