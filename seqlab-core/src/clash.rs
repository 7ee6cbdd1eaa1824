//! Steric clash detection between two atom sets
//!
//! Atoms of the reference set are bucketed into a uniform grid of cubes
//! sized to the clash threshold, so each probe atom only has to be compared
//! against the 27 cubes around its own cube. Brute-force comparison of the
//! full cross product is kept as a correctness oracle: both modes report the
//! identical clash set and differ only in the number of comparisons made.

use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{Atom, Point};

/// Default atom radius in Angstrom; the clash threshold is twice this.
pub const DEFAULT_ATOM_RADIUS: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchMode {
    Grid,
    BruteForce,
}

/// Integer cube index of one grid cell.
///
/// Keys are quantized to integers before hashing; hashing the raw floating
/// point coordinates would make bucket identity platform-dependent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CubeCoord {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl CubeCoord {
    fn offset(&self, dx: i64, dy: i64, dz: i64) -> CubeCoord {
        CubeCoord {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }
}

/// Maps a point to its cube index relative to `origin`.
///
/// The coordinate is shifted by one cube before rounding so that atoms
/// sitting right at the origin stay clear of the 0 boundary; positive values
/// round up and negative values round down. The asymmetric rounding decides
/// which cube an atom near zero lands in, so the grid build and the probe
/// side must quantize identically.
pub fn cube_coord(centre: &Point, origin: &Point, cube_size: f64) -> CubeCoord {
    let quantize = |c: f64, o: f64| -> i64 {
        let scaled = (c - o) / cube_size + 1.0;
        if scaled > 0.0 {
            scaled.ceil() as i64
        } else {
            scaled.floor() as i64
        }
    };
    CubeCoord {
        x: quantize(centre.x, origin.x),
        y: quantize(centre.y, origin.y),
        z: quantize(centre.z, origin.z),
    }
}

/// A uniform spatial hash over one atom set, built once and queried
/// read-only. Buckets hold indices into the atom slice the grid was built
/// from; rebuilding is required if the origin changes.
#[derive(Debug, Clone)]
pub struct UniformGrid {
    origin: Point,
    cube_size: f64,
    buckets: FnvHashMap<CubeCoord, Vec<usize>>,
}

impl UniformGrid {
    pub fn build(atoms: &[Atom], origin: Point, cube_size: f64) -> Self {
        let mut buckets: FnvHashMap<CubeCoord, Vec<usize>> = FnvHashMap::default();
        for (idx, atom) in atoms.iter().enumerate() {
            let cube = cube_coord(&atom.centre, &origin, cube_size);
            buckets.entry(cube).or_default().push(idx);
        }
        Self {
            origin,
            cube_size,
            buckets,
        }
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn cube_size(&self) -> f64 {
        self.cube_size
    }

    pub fn bucket(&self, cube: CubeCoord) -> &[usize] {
        self.buckets.get(&cube).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn occupied_cubes(&self) -> usize {
        self.buckets.len()
    }
}

/// Result of one clash detection run.
#[derive(Debug, Clone, Serialize)]
pub struct ClashReport {
    /// Clashing atoms of the reference set, deduplicated by serial number
    /// and listed in ascending serial order.
    pub clashing_atoms: Vec<Atom>,
    /// Raw count of distance tests that fell under the threshold; an atom
    /// found from several neighboring probes is counted each time.
    pub clash_hits: u64,
    /// Number of atom-atom distance tests performed.
    pub comparisons: u64,
}

/// Reports every atom of `set_b` that lies within `2 * radius` of some atom
/// of `set_a`.
///
/// The grid is built over `set_b`, with the componentwise minimum of
/// `set_b`'s coordinates as origin. In grid mode each atom of `set_a` is
/// tested against the atoms in the 27 cubes around its own cube, which never
/// performs more comparisons than the `|A| * |B|` of brute-force mode.
pub fn detect_clashes(set_a: &[Atom], set_b: &[Atom], radius: f64, mode: SearchMode) -> ClashReport {
    let cube_size = radius * 2.0;
    let mut clashes: BTreeMap<i32, Atom> = BTreeMap::new();
    let mut clash_hits = 0u64;
    let mut comparisons = 0u64;

    match mode {
        SearchMode::Grid => {
            let origin = set_b
                .iter()
                .fold(Point::new(f64::MAX, f64::MAX, f64::MAX), |min, atom| {
                    min.component_min(&atom.centre)
                });
            let grid = UniformGrid::build(set_b, origin, cube_size);
            log::debug!(
                "grid over {} atoms: {} occupied cubes",
                set_b.len(),
                grid.occupied_cubes()
            );
            for a in set_a {
                let cube = cube_coord(&a.centre, &origin, cube_size);
                for dx in -1..=1 {
                    for dy in -1..=1 {
                        for dz in -1..=1 {
                            for &idx in grid.bucket(cube.offset(dx, dy, dz)) {
                                let b = &set_b[idx];
                                comparisons += 1;
                                if a.distance(b) < cube_size {
                                    clash_hits += 1;
                                    clashes.insert(b.serial, b.clone());
                                }
                            }
                        }
                    }
                }
            }
        }
        SearchMode::BruteForce => {
            for a in set_a {
                for b in set_b {
                    comparisons += 1;
                    if a.distance(b) < cube_size {
                        clash_hits += 1;
                        clashes.insert(b.serial, b.clone());
                    }
                }
            }
        }
    }

    ClashReport {
        clashing_atoms: clashes.into_values().collect(),
        clash_hits,
        comparisons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom_at(serial: i32, x: f64, y: f64, z: f64) -> Atom {
        Atom {
            serial,
            name: "CA".to_string(),
            alt_loc: String::new(),
            res_name: "GLY".to_string(),
            chain_id: "A".to_string(),
            res_seq: serial,
            i_code: String::new(),
            centre: Point::new(x, y, z),
        }
    }

    fn serials(report: &ClashReport) -> Vec<i32> {
        report.clashing_atoms.iter().map(|a| a.serial).collect()
    }

    #[test]
    fn test_cube_coord_rounds_away_from_zero() {
        let origin = Point::new(0.0, 0.0, 0.0);
        let cube = cube_coord(&Point::new(0.5, 4.1, -9.0), &origin, 4.0);
        // 0.5/4 + 1 = 1.125 -> 2; 4.1/4 + 1 = 2.025 -> 3; -9/4 + 1 = -1.25 -> -2
        assert_eq!(cube, CubeCoord { x: 2, y: 3, z: -2 });
    }

    #[test]
    fn test_identical_atoms_clash_in_both_modes() {
        let a = vec![atom_at(1, 1.0, 2.0, 3.0)];
        let b = vec![atom_at(7, 1.0, 2.0, 3.0)];
        for mode in [SearchMode::Grid, SearchMode::BruteForce] {
            let report = detect_clashes(&a, &b, DEFAULT_ATOM_RADIUS, mode);
            assert_eq!(serials(&report), vec![7]);
            assert_eq!(report.clash_hits, 1);
        }
    }

    #[test]
    fn test_distant_sets_do_not_clash() {
        let a = vec![atom_at(1, 0.0, 0.0, 0.0), atom_at(2, 1.0, 1.0, 1.0)];
        let b = vec![atom_at(3, 100.0, 100.0, 100.0), atom_at(4, 105.0, 100.0, 100.0)];
        let grid = detect_clashes(&a, &b, DEFAULT_ATOM_RADIUS, SearchMode::Grid);
        let brute = detect_clashes(&a, &b, DEFAULT_ATOM_RADIUS, SearchMode::BruteForce);
        assert!(grid.clashing_atoms.is_empty());
        assert!(brute.clashing_atoms.is_empty());
        assert_eq!(brute.comparisons, 4);
        assert!(grid.comparisons <= brute.comparisons);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        // Exactly at the threshold distance is not a clash.
        let a = vec![atom_at(1, 0.0, 0.0, 0.0)];
        let b = vec![atom_at(2, 4.0, 0.0, 0.0), atom_at(3, 3.9, 0.0, 0.0)];
        let report = detect_clashes(&a, &b, DEFAULT_ATOM_RADIUS, SearchMode::BruteForce);
        assert_eq!(serials(&report), vec![3]);
    }

    #[test]
    fn test_grid_matches_brute_force_on_cluster() {
        let mut a = Vec::new();
        let mut b = Vec::new();
        // Two interleaved lattices with some pairs inside the threshold.
        for i in 0..5 {
            for j in 0..5 {
                let serial = i * 5 + j;
                a.push(atom_at(serial, i as f64 * 3.0, j as f64 * 3.0, 0.0));
                b.push(atom_at(100 + serial, i as f64 * 3.0 + 1.5, j as f64 * 3.0, 0.5));
            }
        }
        let grid = detect_clashes(&a, &b, DEFAULT_ATOM_RADIUS, SearchMode::Grid);
        let brute = detect_clashes(&a, &b, DEFAULT_ATOM_RADIUS, SearchMode::BruteForce);
        assert_eq!(serials(&grid), serials(&brute));
        assert!(!grid.clashing_atoms.is_empty());
        assert!(grid.comparisons <= brute.comparisons);
        assert_eq!(brute.comparisons, 25 * 25);
    }

    #[test]
    fn test_clashing_atoms_sorted_by_serial() {
        let a = vec![atom_at(1, 0.0, 0.0, 0.0)];
        let b = vec![
            atom_at(42, 0.5, 0.0, 0.0),
            atom_at(7, 0.0, 0.5, 0.0),
            atom_at(19, 0.0, 0.0, 0.5),
        ];
        let report = detect_clashes(&a, &b, DEFAULT_ATOM_RADIUS, SearchMode::Grid);
        assert_eq!(serials(&report), vec![7, 19, 42]);
    }

    #[test]
    fn test_empty_reference_set() {
        let a = vec![atom_at(1, 0.0, 0.0, 0.0)];
        let report = detect_clashes(&a, &[], DEFAULT_ATOM_RADIUS, SearchMode::Grid);
        assert!(report.clashing_atoms.is_empty());
        assert_eq!(report.comparisons, 0);
    }
}
