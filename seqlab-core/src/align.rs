//! Pairwise sequence alignment with exhaustive optimal-path enumeration
//!
//! Builds a Needleman-Wunsch (global) or Smith-Waterman (local) score/trace
//! matrix, reconstructs the recorded traceback, and enumerates every
//! co-optimal backtracking path through the matrix.

use fnv::FnvHashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on the length of one input sequence.
pub const MAX_SEQUENCE_LEN: usize = 100;

#[derive(Debug, Error)]
pub enum AlignError {
    #[error("sequence of {0} symbols exceeds the limit of {MAX_SEQUENCE_LEN}")]
    SequenceTooLong(usize),
}

/// Scoring weights for the alignment recurrence.
///
/// `gap_penalty` is a positive cost: it is subtracted for every gap step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scoring {
    pub match_score: i32,
    pub mismatch_score: i32,
    pub gap_penalty: i32,
}

impl Default for Scoring {
    fn default() -> Self {
        Self {
            match_score: 2,
            mismatch_score: -1,
            gap_penalty: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Global,
    Local,
}

/// Per-cell backpointer of the fill pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Stop,
    Up,
    Left,
    Diag,
}

impl Direction {
    fn symbol(self) -> char {
        match self {
            Direction::Stop => '.',
            Direction::Up => 'U',
            Direction::Left => 'L',
            Direction::Diag => 'D',
        }
    }
}

/// The three candidate scores that competed at one cell.
///
/// Kept for every interior cell so the path enumeration can detect genuine
/// ties against the recorded direction.
#[derive(Debug, Clone, Copy, Default)]
pub struct Candidates {
    pub up: i32,
    pub diag: i32,
    pub left: i32,
}

impl Candidates {
    fn get(&self, dir: Direction) -> i32 {
        match dir {
            Direction::Up => self.up,
            Direction::Diag => self.diag,
            Direction::Left => self.left,
            Direction::Stop => 0,
        }
    }
}

/// A finished score/trace matrix for one pair of sequences.
///
/// Built once per [`align`] call; all queries are read-only afterwards.
#[derive(Debug, Clone)]
pub struct AlignmentMatrix {
    x: Vec<u8>,
    y: Vec<u8>,
    mode: Mode,
    score: Vec<Vec<i32>>,
    trace: Vec<Vec<Direction>>,
    cand: Vec<Vec<Candidates>>,
    best_cell: (usize, usize),
    best_score: i32,
}

/// Two gap-padded strings of equal length plus derived metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alignment {
    pub aligned_x: String,
    pub aligned_y: String,
    pub matches: usize,
}

impl Alignment {
    /// Builds an alignment from byte columns collected in reverse-discovery
    /// order, as backtracking produces them.
    fn from_reversed(mut ax: Vec<u8>, mut ay: Vec<u8>) -> Self {
        ax.reverse();
        ay.reverse();
        let matches = ax.iter().zip(ay.iter()).filter(|(a, b)| a == b).count();
        Self {
            aligned_x: String::from_utf8_lossy(&ax).into_owned(),
            aligned_y: String::from_utf8_lossy(&ay).into_owned(),
            matches,
        }
    }

    pub fn len(&self) -> usize {
        self.aligned_x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aligned_x.is_empty()
    }

    /// Percent identity over the full alignment length, gaps included.
    pub fn percent_identity(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.matches as f64 / self.len() as f64 * 100.0
    }

    /// Hamming distance of the two gap-padded strings: the number of
    /// non-matching columns.
    pub fn hamming_distance(&self) -> usize {
        self.len() - self.matches
    }

    /// The `|`/space marker line between the two strands.
    pub fn match_line(&self) -> String {
        self.aligned_x
            .bytes()
            .zip(self.aligned_y.bytes())
            .map(|(a, b)| if a == b { '|' } else { ' ' })
            .collect()
    }
}

/// One co-optimal backtracking path: the visited cells in discovery order
/// (from the start cell towards the matrix origin) and the alignment they
/// spell out.
#[derive(Debug, Clone, Serialize)]
pub struct OptimalPath {
    pub cells: Vec<(usize, usize)>,
    pub alignment: Alignment,
}

/// Fills the score, trace and candidate matrices for `x` against `y`.
///
/// Ties for the recorded trace direction break DIAG, then UP, then LEFT:
/// a later candidate overwrites only when strictly greater. All three
/// candidates are retained so [`AlignmentMatrix::enumerate_optimal_paths`]
/// can revisit the ties.
pub fn align(x: &str, y: &str, scoring: Scoring, mode: Mode) -> Result<AlignmentMatrix, AlignError> {
    if x.len() > MAX_SEQUENCE_LEN {
        return Err(AlignError::SequenceTooLong(x.len()));
    }
    if y.len() > MAX_SEQUENCE_LEN {
        return Err(AlignError::SequenceTooLong(y.len()));
    }
    let x: Vec<u8> = x.bytes().collect();
    let y: Vec<u8> = y.bytes().collect();
    let (m, n) = (x.len(), y.len());

    let mut score = vec![vec![0i32; n + 1]; m + 1];
    let mut trace = vec![vec![Direction::Stop; n + 1]; m + 1];
    let mut cand = vec![vec![Candidates::default(); n + 1]; m + 1];

    // Border cells are STOP in both modes: traceback halts at row/column 0
    // and any unaligned prefix is appended afterwards.
    if mode == Mode::Global {
        for i in 1..=m {
            score[i][0] = score[i - 1][0] - scoring.gap_penalty;
        }
        for j in 1..=n {
            score[0][j] = score[0][j - 1] - scoring.gap_penalty;
        }
    }

    let mut best_cell = (m, n);
    let mut best_score = i32::MIN;
    for i in 1..=m {
        for j in 1..=n {
            let diag = score[i - 1][j - 1]
                + if x[i - 1] == y[j - 1] {
                    scoring.match_score
                } else {
                    scoring.mismatch_score
                };
            let up = score[i - 1][j] - scoring.gap_penalty;
            let left = score[i][j - 1] - scoring.gap_penalty;
            cand[i][j] = Candidates { up, diag, left };

            let mut cell = diag;
            let mut dir = Direction::Diag;
            if up > cell {
                cell = up;
                dir = Direction::Up;
            }
            if left > cell {
                cell = left;
                dir = Direction::Left;
            }
            if mode == Mode::Local {
                cell = cell.max(0);
                if cell == 0 {
                    // A floored score breaks the trace chain.
                    dir = Direction::Stop;
                }
            }
            score[i][j] = cell;
            trace[i][j] = dir;
            // First occurrence wins on ties, in row-major fill order.
            if cell > best_score {
                best_score = cell;
                best_cell = (i, j);
            }
        }
    }

    let (best_cell, best_score) = match mode {
        Mode::Global => ((m, n), score[m][n]),
        Mode::Local => {
            if best_score == i32::MIN {
                // One of the sequences is empty.
                ((0, 0), 0)
            } else {
                (best_cell, best_score)
            }
        }
    };

    Ok(AlignmentMatrix {
        x,
        y,
        mode,
        score,
        trace,
        cand,
        best_cell,
        best_score,
    })
}

impl AlignmentMatrix {
    pub fn rows(&self) -> usize {
        self.x.len() + 1
    }

    pub fn cols(&self) -> usize {
        self.y.len() + 1
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn score_at(&self, i: usize, j: usize) -> i32 {
        self.score[i][j]
    }

    pub fn trace_at(&self, i: usize, j: usize) -> Direction {
        self.trace[i][j]
    }

    /// The optimal alignment score: the bottom-right cell for global mode,
    /// the matrix maximum for local mode.
    pub fn best_score(&self) -> i32 {
        self.best_score
    }

    /// Where the recorded traceback starts.
    pub fn best_cell(&self) -> (usize, usize) {
        self.best_cell
    }

    /// Walks the recorded trace directions from the best cell to the first
    /// STOP cell and returns the single recorded alignment.
    pub fn backtrack(&self) -> Alignment {
        let (mut i, mut j) = self.best_cell;
        let mut ax = Vec::new();
        let mut ay = Vec::new();
        loop {
            match self.trace[i][j] {
                Direction::Stop => break,
                Direction::Diag => {
                    ax.push(self.x[i - 1]);
                    ay.push(self.y[j - 1]);
                    i -= 1;
                    j -= 1;
                }
                Direction::Up => {
                    ax.push(self.x[i - 1]);
                    ay.push(b'-');
                    i -= 1;
                }
                Direction::Left => {
                    ax.push(b'-');
                    ay.push(self.y[j - 1]);
                    j -= 1;
                }
            }
        }
        if self.mode == Mode::Global {
            self.push_unaligned_prefix(i, j, &mut ax, &mut ay);
        }
        Alignment::from_reversed(ax, ay)
    }

    /// Emits one pure-gap column per remaining index until both reach 0.
    fn push_unaligned_prefix(&self, mut i: usize, mut j: usize, ax: &mut Vec<u8>, ay: &mut Vec<u8>) {
        while i > 0 {
            ax.push(self.x[i - 1]);
            ay.push(b'-');
            i -= 1;
        }
        while j > 0 {
            ax.push(b'-');
            ay.push(self.y[j - 1]);
            j -= 1;
        }
    }

    /// Depth-first enumeration of every score-optimal backtracking path.
    ///
    /// At each cell the recorded direction is followed first, then any other
    /// direction whose stored candidate equals the recorded one (a genuine
    /// tie) and whose target is not already on the current path. The visited
    /// set is scoped to the current path only: a cell is released when the
    /// search returns from it, so sibling branches may reuse it. The result
    /// order is deterministic across runs.
    ///
    /// Always yields at least one path; with no interior ties it is exactly
    /// the [`backtrack`](Self::backtrack) result.
    pub fn enumerate_optimal_paths(&self) -> Vec<OptimalPath> {
        let mut search = PathSearch {
            matrix: self,
            destination: (0, 0),
            path: Vec::new(),
            visited: FnvHashSet::default(),
            found: Vec::new(),
        };
        search.visit(self.best_cell);
        search.found
    }

    /// Renders the score matrix with the sequences along the margins.
    pub fn render_score_matrix(&self) -> String {
        self.render_matrix(|i, j| self.score[i][j].to_string())
    }

    /// Renders the trace matrix (`D`/`U`/`L`, `.` for STOP).
    pub fn render_trace_matrix(&self) -> String {
        self.render_matrix(|i, j| self.trace[i][j].symbol().to_string())
    }

    fn render_matrix<F>(&self, value: F) -> String
    where
        F: Fn(usize, usize) -> String,
    {
        let mut out = String::new();
        out.push_str("      ");
        for &c in &self.y {
            out.push_str(&format!("{:>5}", c as char));
        }
        out.push('\n');
        for i in 0..self.rows() {
            if i == 0 {
                out.push(' ');
            } else {
                out.push(self.x[i - 1] as char);
            }
            for j in 0..self.cols() {
                out.push_str(&format!("{:>5}", value(i, j)));
            }
            out.push('\n');
        }
        out
    }
}

/// Backtracking state for the recursive path enumeration. The path stack and
/// the visited set always describe the current branch only.
struct PathSearch<'a> {
    matrix: &'a AlignmentMatrix,
    destination: (usize, usize),
    path: Vec<(usize, usize)>,
    visited: FnvHashSet<(usize, usize)>,
    found: Vec<OptimalPath>,
}

/// Fan-out priority for tie exploration after the recorded direction.
const TIE_ORDER: [Direction; 3] = [Direction::Diag, Direction::Up, Direction::Left];

fn step(cell: (usize, usize), dir: Direction) -> Option<(usize, usize)> {
    let (i, j) = cell;
    match dir {
        Direction::Diag => Some((i.checked_sub(1)?, j.checked_sub(1)?)),
        Direction::Up => Some((i.checked_sub(1)?, j)),
        Direction::Left => Some((i, j.checked_sub(1)?)),
        Direction::Stop => None,
    }
}

impl PathSearch<'_> {
    // Recursion depth is bounded by the anti-diagonal count m + n, itself
    // bounded by 2 * MAX_SEQUENCE_LEN.
    fn visit(&mut self, cell: (usize, usize)) {
        self.visited.insert(cell);
        self.path.push(cell);

        let (i, j) = cell;
        let recorded = self.matrix.trace[i][j];
        if cell == self.destination || recorded == Direction::Stop {
            self.emit();
        } else {
            let cand = self.matrix.cand[i][j];
            let recorded_score = cand.get(recorded);
            let others = TIE_ORDER.iter().copied().filter(|&d| d != recorded);
            for dir in std::iter::once(recorded).chain(others) {
                if dir != recorded && cand.get(dir) != recorded_score {
                    continue;
                }
                // An out-of-bounds target ends the branch silently.
                if let Some(target) = step(cell, dir) {
                    if !self.visited.contains(&target) {
                        self.visit(target);
                    }
                }
            }
        }

        self.path.pop();
        self.visited.remove(&cell);
    }

    /// Re-derives the aligned strings from the coordinate deltas of the
    /// current path stack and records the finished path.
    fn emit(&mut self) {
        let matrix = self.matrix;
        let (mut xi, mut yj) = self.path[0];
        let mut ax = Vec::new();
        let mut ay = Vec::new();
        for pair in self.path.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if b == (a.0 - 1, a.1 - 1) {
                ax.push(matrix.x[a.0 - 1]);
                ay.push(matrix.y[a.1 - 1]);
                xi -= 1;
                yj -= 1;
            } else if b == (a.0 - 1, a.1) {
                ax.push(matrix.x[a.0 - 1]);
                ay.push(b'-');
                xi -= 1;
            } else {
                ax.push(b'-');
                ay.push(matrix.y[a.1 - 1]);
                yj -= 1;
            }
        }
        if matrix.mode == Mode::Global {
            matrix.push_unaligned_prefix(xi, yj, &mut ax, &mut ay);
        }
        self.found.push(OptimalPath {
            cells: self.path.clone(),
            alignment: Alignment::from_reversed(ax, ay),
        });
    }
}
