use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use seqlab_core::*;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "seqlab")]
#[command(about = "SeqLab - pairwise alignment and steric clash detection")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum AlignMode {
    Global,
    Local,
}

#[derive(Subcommand)]
enum Commands {
    /// Align two sequences and enumerate co-optimal paths
    Align {
        /// First sequence (X, rows of the matrix)
        x: String,

        /// Second sequence (Y, columns of the matrix)
        y: String,

        /// Alignment mode
        #[arg(short, long, value_enum, default_value = "global")]
        mode: AlignMode,

        /// Score awarded to a matching pair
        #[arg(long = "match", default_value = "2")]
        match_score: i32,

        /// Score awarded to a mismatching pair
        #[arg(long, default_value = "-1")]
        mismatch: i32,

        /// Penalty subtracted per gap symbol
        #[arg(long, default_value = "2")]
        gap: i32,

        /// Enumerate and print every co-optimal path
        #[arg(long)]
        all_paths: bool,

        /// Emit results as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Detect steric clashes between the atoms of two PDB files
    Clashes {
        /// Probe structure (set A)
        file_a: PathBuf,

        /// Reference structure (set B); clashing atoms are reported from here
        file_b: PathBuf,

        /// Atom radius in Angstrom; two atoms clash when their centres are
        /// closer than twice this
        #[arg(short, long, default_value = "2.0")]
        radius: f64,

        /// Compare the full cross product instead of using the spatial grid
        #[arg(long)]
        brute_force: bool,

        /// Emit results as JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Align {
            x,
            y,
            mode,
            match_score,
            mismatch,
            gap,
            all_paths,
            json,
        } => {
            let scoring = Scoring {
                match_score,
                mismatch_score: mismatch,
                gap_penalty: gap,
            };
            let mode = match mode {
                AlignMode::Global => Mode::Global,
                AlignMode::Local => Mode::Local,
            };
            cmd_align(&x, &y, scoring, mode, all_paths, json)
        }
        Commands::Clashes {
            file_a,
            file_b,
            radius,
            brute_force,
            json,
        } => {
            let mode = if brute_force {
                SearchMode::BruteForce
            } else {
                SearchMode::Grid
            };
            cmd_clashes(&file_a, &file_b, radius, mode, json)
        }
    }
}

fn cmd_align(
    x: &str,
    y: &str,
    scoring: Scoring,
    mode: Mode,
    all_paths: bool,
    json: bool,
) -> Result<()> {
    log::debug!("aligning {} vs {} with {:?}", x, y, scoring);
    let matrix = align(x, y, scoring, mode)?;

    if json {
        let alignment = matrix.backtrack();
        let paths = if all_paths {
            Some(matrix.enumerate_optimal_paths())
        } else {
            None
        };
        let report = serde_json::json!({
            "mode": mode,
            "scoring": scoring,
            "score": matrix.best_score(),
            "best_cell": matrix.best_cell(),
            "alignment": &alignment,
            "percent_identity": alignment.percent_identity(),
            "hamming_distance": alignment.hamming_distance(),
            "optimal_paths": paths,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Score matrix:");
    print!("{}", matrix.render_score_matrix());
    println!();
    println!("Trace matrix:");
    print!("{}", matrix.render_trace_matrix());
    println!();
    println!("Optimal score: {}", matrix.best_score());

    print_alignment(&matrix.backtrack());

    if all_paths {
        let paths = matrix.enumerate_optimal_paths();
        println!();
        println!("All optimal paths:");
        for (idx, path) in paths.iter().enumerate() {
            let coords: Vec<String> = path
                .cells
                .iter()
                .map(|(i, j)| format!("({}, {})", i, j))
                .collect();
            println!();
            println!("* Path {}: {}", idx + 1, coords.join(" "));
            print_alignment(&path.alignment);
        }
        println!();
        println!("Number of optimal paths found: {}", paths.len());
    }

    Ok(())
}

fn print_alignment(alignment: &Alignment) {
    println!();
    println!("{}", alignment.aligned_x);
    println!("{}", alignment.match_line());
    println!("{}", alignment.aligned_y);
    println!("Percent identity: {:.2}%", alignment.percent_identity());
    println!("Hamming distance: {}", alignment.hamming_distance());
}

fn cmd_clashes(
    file_a: &PathBuf,
    file_b: &PathBuf,
    radius: f64,
    mode: SearchMode,
    json: bool,
) -> Result<()> {
    let a = io::read_structure(file_a)?;
    let b = io::read_structure(file_b)?;
    log::info!(
        "loaded {} atoms from {}, {} atoms from {}",
        a.len(),
        file_a.display(),
        b.len(),
        file_b.display()
    );

    let report = detect_clashes(&a.atoms, &b.atoms, radius, mode);

    if json {
        let out = serde_json::json!({
            "mode": mode,
            "radius": radius,
            "clashing_atoms": report.clashing_atoms,
            "num_clashing_atoms": report.clashing_atoms.len(),
            "comparisons": report.comparisons,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    for atom in &report.clashing_atoms {
        println!(
            "{} {} {} {}",
            atom.serial, atom.res_name, atom.res_seq, atom.name
        );
    }
    println!("Number of clashing atoms:   {}", report.clashing_atoms.len());
    println!("Number of comparisons made: {}", report.comparisons);

    Ok(())
}
