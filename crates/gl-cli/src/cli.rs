use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use gl_types::{Grade, RecordId, Semester};

#[derive(Parser)]
#[command(
    name = "gradeledger",
    about = "Grade Ledger: student grade records with a tamper-evident audit chain",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Overrides the configured data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Record a new grade
    Add(AddArgs),
    /// Logically delete a grade record
    Delete(DeleteArgs),
    /// List all active records
    List,
    /// Show one student's active records
    Student(StudentArgs),
    /// Search records by name, student id, or subject
    Search(SearchArgs),
    /// Show a student's GPA and pass rate
    Summary(StudentArgs),
    /// Count records by grade or subject
    Distribution(DistributionArgs),
    /// Show record and block counts
    Stats,
    /// Verify ledger integrity
    Verify,
    /// Show recent ledger blocks
    Log(LogArgs),
    /// Erase all records and restart the ledger
    Reset(ResetArgs),
}

#[derive(Args)]
pub struct AddArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub student_id: String,
    #[arg(long)]
    pub subject: String,
    #[arg(long)]
    pub grade: Grade,
    #[arg(long)]
    pub semester: Semester,
    #[arg(long, default_value = "")]
    pub remarks: String,
}

#[derive(Args)]
pub struct DeleteArgs {
    pub id: RecordId,
    #[arg(short, long, default_value = "")]
    pub reason: String,
}

#[derive(Args)]
pub struct StudentArgs {
    pub student_id: String,
}

#[derive(Args)]
pub struct SearchArgs {
    pub term: String,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum DistributionKind {
    #[default]
    Grade,
    Subject,
}

#[derive(Args)]
pub struct DistributionArgs {
    #[arg(long, value_enum, default_value_t)]
    pub by: DistributionKind,
}

#[derive(Args)]
pub struct LogArgs {
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
}

#[derive(Args)]
pub struct ResetArgs {
    /// Must be the literal word RESET
    #[arg(long)]
    pub confirm: Option<String>,
}
