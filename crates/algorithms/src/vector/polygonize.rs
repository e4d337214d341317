//! Raster to vector conversion
//!
//! Converts each 4-connected region of equal, non-zero cell values into a
//! polygon by tracing cell edges. Holes are preserved as interior rings and
//! collinear vertices along straight runs of cell edges are dropped.

use geo::orient::{Direction, Orient};
use geo::{Coord, LineString, Polygon};
use ndarray::Array2;
use nestshed_core::raster::{Raster, RasterElement};
use nestshed_core::Result;
use std::collections::{HashMap, VecDeque};

/// Grid vertex as (row, col); `(rows, cols)` is the far corner of the grid
type Vertex = (usize, usize);

const FOUR_NEIGHBORS: [(isize, isize); 4] = [(-1, 0), (0, 1), (1, 0), (0, -1)];

/// Polygonize the non-zero, valid cells of `zones`.
///
/// Returns one `(zone_id, polygon)` pair per 4-connected region, in
/// row-major order of each region's first cell. Diagonal contact does not
/// connect two cells. Exteriors are counter-clockwise and interiors
/// clockwise in map coordinates.
pub fn polygonize<T: RasterElement>(zones: &Raster<T>) -> Result<Vec<(i64, Polygon<f64>)>> {
    let (rows, cols) = zones.shape();
    let transform = *zones.transform();

    let zone_at = |row: usize, col: usize| -> Option<i64> {
        let value = unsafe { zones.get_unchecked(row, col) };
        if zones.is_nodata(value) || value == T::zero() {
            return None;
        }
        RasterElement::to_f64(value).map(|v| v as i64)
    };

    let mut labels = Array2::<u32>::zeros((rows, cols));
    let mut next_label = 0u32;
    let mut polygons = Vec::new();

    for row in 0..rows {
        for col in 0..cols {
            if labels[(row, col)] != 0 {
                continue;
            }
            let Some(zone) = zone_at(row, col) else {
                continue;
            };

            next_label += 1;
            let cells = flood_component(&mut labels, next_label, (row, col), |r, c| {
                zone_at(r, c) == Some(zone)
            });

            let edges = boundary_edges(&labels, next_label, &cells);
            let rings = trace_rings(&edges);

            for polygon in assemble_polygons(rings, |(r, c)| {
                let (x, y) = transform.pixel_to_geo_corner(c, r);
                Coord { x, y }
            }) {
                polygons.push((zone, polygon));
            }
        }
    }

    Ok(polygons)
}

/// Label the 4-connected component containing `seed` and return its cells
fn flood_component(
    labels: &mut Array2<u32>,
    label: u32,
    seed: (usize, usize),
    same_zone: impl Fn(usize, usize) -> bool,
) -> Vec<(usize, usize)> {
    let (rows, cols) = labels.dim();
    let mut cells = vec![seed];
    let mut queue = VecDeque::from([seed]);
    labels[seed] = label;

    while let Some((row, col)) = queue.pop_front() {
        for (dr, dc) in FOUR_NEIGHBORS {
            let nr = row as isize + dr;
            let nc = col as isize + dc;
            if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                continue;
            }
            let next = (nr as usize, nc as usize);
            if labels[next] == 0 && same_zone(next.0, next.1) {
                labels[next] = label;
                cells.push(next);
                queue.push_back(next);
            }
        }
    }

    cells
}

/// Directed boundary edges of a component.
///
/// Edges run clockwise around each cell as seen on screen (rows down), so
/// the component always lies to the right of the direction of travel.
fn boundary_edges(labels: &Array2<u32>, label: u32, cells: &[(usize, usize)]) -> Vec<(Vertex, Vertex)> {
    let (rows, cols) = labels.dim();
    let outside = |r: isize, c: isize| {
        r < 0 || c < 0 || r >= rows as isize || c >= cols as isize || labels[(r as usize, c as usize)] != label
    };

    let mut edges = Vec::new();
    for &(r, c) in cells {
        let (ri, ci) = (r as isize, c as isize);
        if outside(ri - 1, ci) {
            edges.push(((r, c), (r, c + 1)));
        }
        if outside(ri, ci + 1) {
            edges.push(((r, c + 1), (r + 1, c + 1)));
        }
        if outside(ri + 1, ci) {
            edges.push(((r + 1, c + 1), (r + 1, c)));
        }
        if outside(ri, ci - 1) {
            edges.push(((r + 1, c), (r, c)));
        }
    }
    edges
}

fn step(from: Vertex, to: Vertex) -> (isize, isize) {
    (to.0 as isize - from.0 as isize, to.1 as isize - from.1 as isize)
}

/// Link boundary edges into simple closed rings.
///
/// Where two corners of the component meet diagonally the walk turns right,
/// hugging the current cell. A vertex reached twice closes a ring, so every
/// returned ring is simple.
fn trace_rings(edges: &[(Vertex, Vertex)]) -> Vec<Vec<Vertex>> {
    let mut outgoing: HashMap<Vertex, Vec<usize>> = HashMap::new();
    for (idx, &(from, _)) in edges.iter().enumerate() {
        outgoing.entry(from).or_default().push(idx);
    }

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();

    for start in 0..edges.len() {
        if used[start] {
            continue;
        }

        let mut path: Vec<Vertex> = vec![edges[start].0];
        let mut position: HashMap<Vertex, usize> = HashMap::from([(edges[start].0, 0)]);
        let mut current = start;
        used[start] = true;

        loop {
            let (from, to) = edges[current];

            if let Some(&p) = position.get(&to) {
                let ring = path.split_off(p);
                for v in &ring {
                    position.remove(v);
                }
                rings.push(ring);
                if path.is_empty() {
                    break;
                }
            }
            path.push(to);
            position.insert(to, path.len() - 1);

            let (dr, dc) = step(from, to);
            let right_turn = (dc, -dr);
            let candidates: Vec<usize> = outgoing
                .get(&to)
                .map(|idxs| idxs.iter().copied().filter(|&i| !used[i]).collect())
                .unwrap_or_default();

            let next = candidates
                .iter()
                .copied()
                .find(|&i| step(edges[i].0, edges[i].1) == right_turn)
                .or_else(|| candidates.first().copied());

            match next {
                Some(n) => {
                    used[n] = true;
                    current = n;
                }
                None => break,
            }
        }
    }

    rings.into_iter().map(drop_collinear).collect()
}

/// Remove vertices in the middle of straight runs
fn drop_collinear(ring: Vec<Vertex>) -> Vec<Vertex> {
    let n = ring.len();
    if n < 4 {
        return ring;
    }
    (0..n)
        .filter(|&i| {
            let prev = ring[(i + n - 1) % n];
            let next = ring[(i + 1) % n];
            step(prev, ring[i]) != step(ring[i], next)
        })
        .map(|i| ring[i])
        .collect()
}

/// Twice the signed area in (col, row) space; positive for exterior rings
fn signed_area2(ring: &[Vertex]) -> i64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let (r0, c0) = ring[i];
            let (r1, c1) = ring[(i + 1) % n];
            c0 as i64 * r1 as i64 - c1 as i64 * r0 as i64
        })
        .sum()
}

fn extent(ring: &[Vertex]) -> (usize, usize, usize, usize) {
    ring.iter().fold(
        (usize::MAX, usize::MAX, 0, 0),
        |(r0, c0, r1, c1), &(r, c)| (r0.min(r), c0.min(c), r1.max(r), c1.max(c)),
    )
}

/// Pair each hole with the smallest exterior whose extent covers it
fn assemble_polygons(
    rings: Vec<Vec<Vertex>>,
    to_coord: impl Fn(Vertex) -> Coord<f64>,
) -> Vec<Polygon<f64>> {
    let mut exteriors = Vec::new();
    let mut holes = Vec::new();
    for ring in rings {
        let area = signed_area2(&ring);
        if area > 0 {
            exteriors.push((ring, area, Vec::new()));
        } else if area < 0 {
            holes.push(ring);
        }
    }

    for hole in holes {
        let (hr0, hc0, hr1, hc1) = extent(&hole);
        let owner = exteriors
            .iter_mut()
            .filter(|(ring, _, _)| {
                let (r0, c0, r1, c1) = extent(ring);
                r0 <= hr0 && c0 <= hc0 && r1 >= hr1 && c1 >= hc1
            })
            .min_by_key(|(_, area, _)| *area);
        if let Some((_, _, interiors)) = owner {
            interiors.push(hole);
        }
    }

    let to_line = |ring: &[Vertex]| {
        let mut coords: Vec<Coord<f64>> = ring.iter().map(|&v| to_coord(v)).collect();
        if let Some(&first) = coords.first() {
            coords.push(first);
        }
        LineString::from(coords)
    };

    exteriors
        .into_iter()
        .map(|(ring, _, interiors)| {
            Polygon::new(to_line(&ring), interiors.iter().map(|h| to_line(h)).collect())
                .orient(Direction::Default)
        })
        .collect()
}
