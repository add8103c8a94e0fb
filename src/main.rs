//! Laser Grid command line
//!
//! Generates daily puzzles and inspects puzzle files. Everything is printed
//! as JSON on stdout; logs go to stderr (`RUST_LOG=info`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};

use laser_grid::generate::PuzzleGenerator;
use laser_grid::{Difficulty, GridPosition, Puzzle, PuzzleValidator, Tuning};

/// Daily laser-reflection puzzles
#[derive(Parser, Debug)]
#[command(name = "laser-grid", version)]
struct Cli {
    /// JSON tuning table overriding the built-in one
    #[arg(long, global = true)]
    tuning: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate one puzzle
    Generate {
        /// easy, medium or hard
        #[arg(short, long, value_parser = parse_difficulty)]
        difficulty: Difficulty,
        /// Puzzle day (YYYY-MM-DD), defaults to today (UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Layout seed, derived from date and difficulty when omitted
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Generate the easy, medium and hard puzzles for a day
    Daily {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Validate a puzzle file
    Validate { puzzle: PathBuf },
    /// Trace the beam of a puzzle file
    Trace {
        puzzle: PathBuf,
        /// Override the entry cell
        #[arg(long, num_args = 2, value_names = ["ROW", "COL"])]
        entry: Option<Vec<i32>>,
    },
    /// Check an answer against a puzzle file
    Check {
        puzzle: PathBuf,
        row: i32,
        col: i32,
    },
    /// Show the part of the solution path in one quadrant (0-3)
    Hint { puzzle: PathBuf, quadrant: u8 },
}

fn parse_difficulty(s: &str) -> Result<Difficulty, String> {
    Difficulty::from_str(s).ok_or_else(|| format!("unknown difficulty '{s}'"))
}

fn load_tuning(path: Option<&Path>) -> Result<Tuning> {
    match path {
        Some(path) => Tuning::from_json_file(path)
            .with_context(|| format!("loading tuning from {}", path.display())),
        None => Ok(Tuning::default()),
    }
}

fn load_puzzle(path: &Path) -> Result<Puzzle> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let tuning = load_tuning(cli.tuning.as_deref())?;
    let today = Utc::now().date_naive();

    match cli.command {
        Command::Generate {
            difficulty,
            date,
            seed,
        } => {
            let generator = PuzzleGenerator::new(tuning)?;
            let result = generator.generate(difficulty, date.unwrap_or(today), seed)?;
            print_json(&result)
        }
        Command::Daily { date } => {
            let generator = PuzzleGenerator::new(tuning)?;
            let mut puzzles = Vec::new();
            for (difficulty, result) in generator.generate_daily_set(date.unwrap_or(today)) {
                puzzles.push(result.with_context(|| format!("generating {difficulty} puzzle"))?);
            }
            print_json(&puzzles)
        }
        Command::Validate { puzzle } => {
            let json = std::fs::read_to_string(&puzzle)
                .with_context(|| format!("reading {}", puzzle.display()))?;
            let report = PuzzleValidator::new(tuning).validate_json(&json);
            print_json(&report)?;
            if !report.valid {
                bail!("{} is not a valid puzzle", puzzle.display());
            }
            Ok(())
        }
        Command::Trace { puzzle, entry } => {
            let puzzle = load_puzzle(&puzzle)?;
            let entry = match entry.as_deref() {
                Some([row, col]) => GridPosition::new(*row, *col),
                _ => puzzle.entry,
            };
            print_json(&laser_grid::trace(&puzzle.materials, entry, puzzle.grid_size))
        }
        Command::Check { puzzle, row, col } => {
            let puzzle = load_puzzle(&puzzle)?;
            print_json(&puzzle.validate_answer(GridPosition::new(row, col)))
        }
        Command::Hint { puzzle, quadrant } => {
            let puzzle = load_puzzle(&puzzle)?;
            print_json(&puzzle.hint_path(quadrant)?)
        }
    }
}
