use itertools::Itertools;

use crate::geometry::Point;

/// Counts how many edges of a closed ring a horizontal ray cast from `point` towards `+x` crosses.
///
/// The test is half-open: a point on a left or bottom side of a polygon counts as inside, a point on
/// a right or top side counts as outside. Two polygons sharing a side therefore never both claim a
/// point lying on it.
///
/// Each side is evaluated from its lower endpoint, so that a side shared by two rings walked in
/// opposite directions gives the exact same intersection abscissa in both.
///
/// See <https://wrfranklin.org/Research/Short_Notes/pnpoly.html>.
pub fn crossings<I>(point: &Point, ring: I) -> usize
where
    I: IntoIterator<Item = Point>,
    <I as IntoIterator>::IntoIter: Clone + ExactSizeIterator,
{
    let mut count = 0;
    for (a, b) in ring.into_iter().circular_tuple_windows() {
        if (a.y > point.y) == (b.y > point.y) {
            continue;
        }
        let (lo, hi) = if a.y < b.y { (a, b) } else { (b, a) };
        let x = lo.x + (point.y - lo.y) * (hi.x - lo.x) / (hi.y - lo.y);
        if point.x < x {
            count += 1;
        }
    }
    count
}

/// Returns `true` if the point is inside the polygon, by crossing parity.
///
/// The polygon does not need to be convex, and its orientation does not matter.
pub fn is_inside<I>(point: &Point, ring: I) -> bool
where
    I: IntoIterator<Item = Point>,
    <I as IntoIterator>::IntoIter: Clone + ExactSizeIterator,
{
    crossings(point, ring) % 2 == 1
}

/// Signed area of a closed ring, positive if it is counter-clockwise.
pub fn signed_area<I>(ring: I) -> f64
where
    I: IntoIterator<Item = Point>,
    <I as IntoIterator>::IntoIter: Clone + ExactSizeIterator,
{
    ring.into_iter()
        .circular_tuple_windows()
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum::<f64>()
        / 2.
}

/// Returns `true` if a closed ring runs counter-clockwise.
///
/// The turn is read at the lowest (then rightmost) vertex, which is always convex. Rings that are
/// flat there fall back to the sign of the area.
pub fn is_counterclockwise(ring: &[Point]) -> bool {
    let n = ring.len();
    let Some((idx, _)) = ring.iter().enumerate().min_by(|(_, a), (_, b)| {
        a.y.total_cmp(&b.y).then_with(|| b.x.total_cmp(&a.x))
    }) else {
        return false;
    };
    let prev = ring[(idx + n - 1) % n];
    let next = ring[(idx + 1) % n];
    match prev.cross(&ring[idx], &next) {
        turn if turn > 0. => true,
        turn if turn < 0. => false,
        _ => signed_area(ring.iter().copied()) > 0.,
    }
}
