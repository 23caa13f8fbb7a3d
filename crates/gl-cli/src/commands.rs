use std::process::ExitCode;

use anyhow::{bail, Context};
use colored::Colorize;
use serde::Serialize;

use gl_service::{
    Block, FileGradeService, GradeRecord, GradeService, LedgerStore, NewGrade, Receipt,
    RecordStore, ServiceConfig,
};

use crate::cli::*;

/// Literal word `reset` must be confirmed with.
const RESET_CONFIRMATION: &str = "RESET";

pub fn run_command(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = resolve_config(&cli)?;
    let service = FileGradeService::from_config(&config)
        .with_context(|| format!("cannot open grade ledger in {}", config.data_dir.display()))?;

    let ok = execute(&service, cli.command, cli.format)?;
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn resolve_config(cli: &Cli) -> anyhow::Result<ServiceConfig> {
    let mut config = match &cli.config {
        Some(path) => ServiceConfig::load(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    Ok(config)
}

/// Run one command. Returns `false` when the ledger failed verification.
pub fn execute<R: RecordStore, L: LedgerStore>(
    svc: &GradeService<R, L>,
    command: Command,
    format: OutputFormat,
) -> anyhow::Result<bool> {
    match command {
        Command::Add(args) => {
            let grade = NewGrade::new(
                args.name,
                args.student_id,
                args.subject,
                args.grade,
                args.semester,
                args.remarks,
            );
            let receipt = svc.add_grade(grade)?;
            emit(format, &receipt, || print_receipt("Recorded", &receipt))?;
        }
        Command::Delete(args) => {
            let receipt = svc.delete_grade(args.id, &args.reason)?;
            emit(format, &receipt, || print_receipt("Deleted", &receipt))?;
        }
        Command::List => {
            let records = svc.all_active_records()?;
            emit(format, &records, || print_records(&records))?;
        }
        Command::Student(args) => {
            let records = svc.records_for_student(&args.student_id)?;
            emit(format, &records, || print_records(&records))?;
        }
        Command::Search(args) => {
            let records = svc.search_records(&args.term)?;
            emit(format, &records, || print_records(&records))?;
        }
        Command::Summary(args) => {
            let summary = svc.student_summary(&args.student_id)?;
            emit(format, &summary, || match &summary {
                Some(s) => {
                    println!("{} ({})", s.student_name.bold(), s.student_id.cyan());
                    println!("  Records:      {}", s.record_count);
                    println!("  Subjects:     {}", s.subject_count);
                    println!("  Most common:  {}", s.most_common_grade.to_string().yellow());
                    println!("  GPA:          {:.2}", s.gpa);
                    println!("  Pass rate:    {:.1}%", s.pass_rate);
                }
                None => println!("No records for student {}.", args.student_id.cyan()),
            })?;
        }
        Command::Distribution(args) => match args.by {
            DistributionKind::Grade => {
                let counts = svc.grade_distribution()?;
                emit(format, &counts, || {
                    for c in &counts {
                        println!("{:>3}  {}", c.grade.to_string().yellow(), c.count);
                    }
                })?;
            }
            DistributionKind::Subject => {
                let counts = svc.subject_distribution()?;
                emit(format, &counts, || {
                    for c in &counts {
                        println!("{:<20}  {}", c.subject, c.count);
                    }
                })?;
            }
        },
        Command::Stats => {
            let stats = svc.stats()?;
            emit(format, &stats, || {
                println!("Active records: {}", stats.active_record_count.to_string().bold());
                println!("Ledger blocks:  {}", stats.block_count.to_string().bold());
            })?;
        }
        Command::Verify => {
            let verification = svc.verify()?;
            emit(format, &verification, || {
                if verification.is_valid() {
                    println!("{} {}", "✓".green().bold(), verification.message);
                } else {
                    println!("{} {}", "✗".red().bold(), verification.message.red());
                }
            })?;
            return Ok(verification.is_valid());
        }
        Command::Log(args) => {
            let blocks = svc.history(args.limit)?;
            emit(format, &blocks, || blocks.iter().for_each(print_block))?;
        }
        Command::Reset(args) => {
            if args.confirm.as_deref() != Some(RESET_CONFIRMATION) {
                bail!("reset erases every record and block; pass --confirm {RESET_CONFIRMATION} to proceed");
            }
            svc.reset()?;
            let stats = svc.stats()?;
            emit(format, &stats, || println!("{} Ledger reset. New genesis block created.", "✓".green().bold()))?;
        }
    }
    Ok(true)
}

fn emit<T: Serialize>(format: OutputFormat, value: &T, text: impl FnOnce()) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => text(),
    }
    Ok(())
}

fn print_receipt(action: &str, receipt: &Receipt) {
    println!("{} {} record {}", "✓".green().bold(), action, receipt.record_id.to_string().bold());
    println!(
        "  Block #{} {}  {}",
        receipt.block.index(),
        receipt.block.operation_tag().to_string().cyan(),
        short_hash(receipt.block.hash()).dimmed()
    );
}

fn print_records(records: &[GradeRecord]) {
    if records.is_empty() {
        println!("No records.");
        return;
    }
    for r in records {
        println!(
            "{:>4}  {:<20} {:<10} {:<16} {:>2}  {:<6} {}",
            r.id.to_string().yellow(),
            r.student_name,
            r.student_id.cyan(),
            r.subject,
            r.grade.to_string().bold(),
            r.semester,
            r.remarks.dimmed()
        );
    }
}

fn print_block(block: &Block) {
    println!(
        "{}  {}  {}  {}",
        format!("#{}", block.index()).yellow().bold(),
        short_hash(block.hash()).dimmed(),
        block.timestamp(),
        block.operation_tag().to_string().cyan()
    );
}

fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}
