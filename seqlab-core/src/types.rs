use serde::{Deserialize, Serialize};

/// Hard cap on the number of atoms accepted from a single structure file.
pub const MAX_ATOMS: usize = 10_000;
/// Hard cap on the number of residues built from a single structure file.
pub const MAX_RESIDUES: usize = 1_000;

/// A point in 3D space, in the Angstrom coordinates of the source file.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance between two points.
    pub fn distance(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Componentwise minimum of two points.
    pub fn component_min(&self, other: &Point) -> Point {
        Point {
            x: self.x.min(other.x),
            y: self.y.min(other.y),
            z: self.z.min(other.z),
        }
    }

    /// Componentwise maximum of two points.
    pub fn component_max(&self, other: &Point) -> Point {
        Point {
            x: self.x.max(other.x),
            y: self.y.max(other.y),
            z: self.z.max(other.z),
        }
    }
}

/// One atom from an `ATOM` record, immutable after parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    pub serial: i32,
    pub name: String,
    pub alt_loc: String,
    pub res_name: String,
    pub chain_id: String,
    pub res_seq: i32,
    pub i_code: String,
    pub centre: Point,
}

impl Atom {
    /// Centre-to-centre distance between two atoms.
    pub fn distance(&self, other: &Atom) -> f64 {
        self.centre.distance(&other.centre)
    }
}

/// A residue and its atoms, grouped in file order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Residue {
    pub res_name: String,
    pub chain_id: String,
    pub res_seq: i32,
    pub i_code: String,
    pub atoms: Vec<Atom>,
}

/// The atom array for one structure file, with its coordinate bounds.
///
/// Bounds are computed once at construction; the clash detector uses the
/// componentwise minimum as the origin of its spatial grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub atoms: Vec<Atom>,
    pub min_coords: Point,
    pub max_coords: Point,
}

impl Structure {
    pub fn new(atoms: Vec<Atom>) -> Self {
        let mut min_coords = Point::new(f64::MAX, f64::MAX, f64::MAX);
        let mut max_coords = Point::new(f64::MIN, f64::MIN, f64::MIN);
        for atom in &atoms {
            min_coords = min_coords.component_min(&atom.centre);
            max_coords = max_coords.component_max(&atom.centre);
        }
        Self {
            atoms,
            min_coords,
            max_coords,
        }
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
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

    #[test]
    fn test_point_distance() {
        let a = Point::new(0.0, 0.0, 0.0);
        let b = Point::new(3.0, 4.0, 0.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_structure_bounds() {
        let s = Structure::new(vec![
            atom_at(1, -1.0, 2.0, 3.0),
            atom_at(2, 4.0, -5.0, 6.0),
            atom_at(3, 0.0, 0.0, -7.0),
        ]);
        assert_eq!(s.min_coords, Point::new(-1.0, -5.0, -7.0));
        assert_eq!(s.max_coords, Point::new(4.0, 2.0, 6.0));
    }
}
