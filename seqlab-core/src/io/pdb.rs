//! PDB `ATOM` record parser
//!
//! Reads the fixed-column atom records of a PDB file (columns 1-54, the
//! subset up to the coordinates) and exposes them as a single-pass iterator
//! of [`AtomRecord`] values. Two builders consume the stream: one producing
//! the flat atom array of a [`Structure`], one grouping records into
//! residues. Numeric fields parse permissively: malformed text is reported
//! with a warning and coerced to zero, matching the tolerant convention of
//! legacy PDB tooling, but the file never fails to load because of one bad
//! field.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use thiserror::Error;

use crate::types::{Atom, Point, Residue, Structure, MAX_ATOMS, MAX_RESIDUES};

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("cannot open {path}: {source}")]
    FileUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("structure has more than {MAX_ATOMS} atoms")]
    TooManyAtoms,
    #[error("structure has more than {MAX_RESIDUES} residues")]
    TooManyResidues,
}

/// The raw column fields of one `ATOM` line, untouched except for the
/// column slicing. Conversion to a typed [`Atom`] happens in
/// [`AtomRecord::to_atom`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomRecord {
    pub serial: String,
    pub name: String,
    pub alt_loc: String,
    pub res_name: String,
    pub chain_id: String,
    pub res_seq: String,
    pub i_code: String,
    pub x: String,
    pub y: String,
    pub z: String,
    /// 1-based line number in the source, for diagnostics.
    pub line_number: usize,
}

/// Column layout of an ATOM record, 0-based half-open byte ranges.
/// See the PDB format guide, record type ATOM, columns 1-54.
const COL_SERIAL: (usize, usize) = (6, 11);
const COL_NAME: (usize, usize) = (12, 16);
const COL_ALT_LOC: (usize, usize) = (16, 17);
const COL_RES_NAME: (usize, usize) = (17, 20);
const COL_CHAIN_ID: (usize, usize) = (21, 22);
const COL_RES_SEQ: (usize, usize) = (22, 26);
const COL_I_CODE: (usize, usize) = (26, 27);
const COL_X: (usize, usize) = (30, 38);
const COL_Y: (usize, usize) = (38, 46);
const COL_Z: (usize, usize) = (46, 54);

fn column(line: &str, range: (usize, usize)) -> String {
    let (start, end) = range;
    line.get(start..end.min(line.len()))
        .unwrap_or("")
        .trim()
        .to_string()
}

impl AtomRecord {
    /// Slices one line into its fields, or `None` if the line is not an
    /// `ATOM` record.
    pub fn parse(line: &str, line_number: usize) -> Option<AtomRecord> {
        if !line.starts_with("ATOM  ") {
            return None;
        }
        Some(AtomRecord {
            serial: column(line, COL_SERIAL),
            name: column(line, COL_NAME),
            alt_loc: column(line, COL_ALT_LOC),
            res_name: column(line, COL_RES_NAME),
            chain_id: column(line, COL_CHAIN_ID),
            res_seq: column(line, COL_RES_SEQ),
            i_code: column(line, COL_I_CODE),
            x: column(line, COL_X),
            y: column(line, COL_Y),
            z: column(line, COL_Z),
            line_number,
        })
    }

    /// Converts the raw fields to a typed atom, coercing malformed numeric
    /// fields to zero with a warning.
    pub fn to_atom(&self) -> Atom {
        Atom {
            serial: self.lenient_int(&self.serial, "serial"),
            name: self.name.clone(),
            alt_loc: self.alt_loc.clone(),
            res_name: self.res_name.clone(),
            chain_id: self.chain_id.clone(),
            res_seq: self.lenient_int(&self.res_seq, "resSeq"),
            i_code: self.i_code.clone(),
            centre: Point::new(
                self.lenient_float(&self.x, "x"),
                self.lenient_float(&self.y, "y"),
                self.lenient_float(&self.z, "z"),
            ),
        }
    }

    fn lenient_int(&self, field: &str, what: &str) -> i32 {
        match field.parse::<i32>() {
            Ok(v) => v,
            Err(_) => {
                if !field.is_empty() {
                    log::warn!(
                        "line {}: malformed {} field {:?}, using 0",
                        self.line_number,
                        what,
                        field
                    );
                }
                0
            }
        }
    }

    fn lenient_float(&self, field: &str, what: &str) -> f64 {
        match field.parse::<f64>() {
            Ok(v) => v,
            Err(_) => {
                if !field.is_empty() {
                    log::warn!(
                        "line {}: malformed {} field {:?}, using 0.0",
                        self.line_number,
                        what,
                        field
                    );
                }
                0.0
            }
        }
    }
}

/// Single-pass iterator of `ATOM` records over any line source. Restarting
/// means reopening the source.
pub struct PdbRecords<R: BufRead> {
    lines: Lines<R>,
    line_number: usize,
}

impl<R: BufRead> PdbRecords<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
        }
    }
}

impl<R: BufRead> Iterator for PdbRecords<R> {
    type Item = Result<AtomRecord, PdbError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_number += 1;
            if let Some(record) = AtomRecord::parse(&line, self.line_number) {
                return Some(Ok(record));
            }
        }
    }
}

/// Opens a PDB file, decompressing transparently when the path ends in `.gz`.
pub fn open_records<P: AsRef<Path>>(path: P) -> Result<PdbRecords<Box<dyn BufRead>>, PdbError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| PdbError::FileUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    let reader: Box<dyn BufRead> = if path.to_string_lossy().ends_with(".gz") {
        Box::new(BufReader::new(GzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    Ok(PdbRecords::new(reader))
}

/// Atom-array builder: collects a record stream into a [`Structure`],
/// enforcing the atom-count bound.
pub fn build_structure<I>(records: I) -> Result<Structure, PdbError>
where
    I: IntoIterator<Item = Result<AtomRecord, PdbError>>,
{
    let mut atoms = Vec::new();
    for record in records {
        atoms.push(record?.to_atom());
        if atoms.len() > MAX_ATOMS {
            return Err(PdbError::TooManyAtoms);
        }
    }
    Ok(Structure::new(atoms))
}

/// Residue-array builder: groups consecutive records that share
/// (chainID, resSeq, iCode) into residues, enforcing the residue-count bound.
pub fn build_residues<I>(records: I) -> Result<Vec<Residue>, PdbError>
where
    I: IntoIterator<Item = Result<AtomRecord, PdbError>>,
{
    let mut residues: Vec<Residue> = Vec::new();
    for record in records {
        let atom = record?.to_atom();
        match residues.last_mut() {
            Some(r)
                if r.chain_id == atom.chain_id
                    && r.res_seq == atom.res_seq
                    && r.i_code == atom.i_code =>
            {
                r.atoms.push(atom);
            }
            _ => {
                if residues.len() == MAX_RESIDUES {
                    return Err(PdbError::TooManyResidues);
                }
                residues.push(Residue {
                    res_name: atom.res_name.clone(),
                    chain_id: atom.chain_id.clone(),
                    res_seq: atom.res_seq,
                    i_code: atom.i_code.clone(),
                    atoms: vec![atom],
                });
            }
        }
    }
    Ok(residues)
}

/// Reads the atom array of one PDB file.
pub fn read_structure<P: AsRef<Path>>(path: P) -> Result<Structure, PdbError> {
    build_structure(open_records(path)?)
}

/// Reads one PDB file grouped by residue.
pub fn read_residues<P: AsRef<Path>>(path: P) -> Result<Vec<Residue>, PdbError> {
    build_residues(open_records(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = "\
HEADER    TEST STRUCTURE
ATOM      1  N   GLY A   1      11.104   6.134  -6.504  1.00  0.00           N
ATOM      2  CA  GLY A   1      11.639   6.071  -5.147  1.00  0.00           C
ATOM      3  C   GLY A   2      10.729   6.768  -4.123  1.00  0.00           C
HETATM    4  O   HOH A  99       0.000   0.000   0.000  1.00  0.00           O
TER
";

    #[test]
    fn test_parse_atom_line() {
        let line = "ATOM      2  CA  GLY A   1      11.639   6.071  -5.147  1.00  0.00";
        let record = AtomRecord::parse(line, 1).unwrap();
        assert_eq!(record.serial, "2");
        assert_eq!(record.name, "CA");
        assert_eq!(record.res_name, "GLY");
        assert_eq!(record.chain_id, "A");
        assert_eq!(record.res_seq, "1");
        let atom = record.to_atom();
        assert_eq!(atom.serial, 2);
        assert!((atom.centre.x - 11.639).abs() < 1e-9);
        assert!((atom.centre.z - -5.147).abs() < 1e-9);
    }

    #[test]
    fn test_non_atom_lines_are_skipped() {
        assert!(AtomRecord::parse("HETATM    4  O   HOH A  99", 1).is_none());
        assert!(AtomRecord::parse("TER", 2).is_none());
        assert!(AtomRecord::parse("ATOMIC", 3).is_none());
    }

    #[test]
    fn test_record_stream_filters_to_atoms() {
        let records = PdbRecords::new(SAMPLE.as_bytes());
        let serials: Vec<String> = records.map(|r| r.unwrap().serial).collect();
        assert_eq!(serials, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_malformed_numeric_field_coerces_to_zero() {
        let line = "ATOM      1  CA  GLY A  xx      bogus?   6.071  -5.147";
        let atom = AtomRecord::parse(line, 1).unwrap().to_atom();
        assert_eq!(atom.res_seq, 0);
        assert_eq!(atom.centre.x, 0.0);
        assert!((atom.centre.y - 6.071).abs() < 1e-9);
    }

    #[test]
    fn test_short_line_does_not_crash() {
        let atom = AtomRecord::parse("ATOM      7  CA", 1).unwrap().to_atom();
        assert_eq!(atom.serial, 7);
        assert_eq!(atom.centre, Point::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn test_build_structure_and_bounds() {
        let structure = build_structure(PdbRecords::new(SAMPLE.as_bytes())).unwrap();
        assert_eq!(structure.len(), 3);
        assert!((structure.min_coords.z - -6.504).abs() < 1e-9);
        assert!((structure.max_coords.x - 11.639).abs() < 1e-9);
    }

    #[test]
    fn test_build_residues_groups_by_residue() {
        let residues = build_residues(PdbRecords::new(SAMPLE.as_bytes())).unwrap();
        assert_eq!(residues.len(), 2);
        assert_eq!(residues[0].atoms.len(), 2);
        assert_eq!(residues[0].res_name, "GLY");
        assert_eq!(residues[1].res_seq, 2);
    }

    #[test]
    fn test_read_structure_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let structure = read_structure(file.path()).unwrap();
        assert_eq!(structure.len(), 3);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = read_structure("/no/such/file.pdb").unwrap_err();
        assert!(matches!(err, PdbError::FileUnavailable { .. }));
    }

    #[test]
    fn test_gzipped_file_round_trip() {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.pdb.gz");
        let file = File::create(&path).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(SAMPLE.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let structure = read_structure(&path).unwrap();
        assert_eq!(structure.len(), 3);
    }
}
