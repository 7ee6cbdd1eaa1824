//! File format I/O modules for SeqLab
//!
//! Parsers produce typed record streams that dedicated builders consume;
//! computation never reads files directly.

pub mod pdb;

pub use pdb::{read_residues, read_structure, AtomRecord, PdbError, PdbRecords};
