//! worktally binary: dispatches CLI commands onto the core library.

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use worktally::cli::{Cli, Command};
use worktally::config::import_config;
use worktally::db::Database;
use worktally::error::Error;
use worktally::types::Project;
use worktally::units::parse_value;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let db_path = database_path(cli.database.as_deref())?;
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    let db = Database::open(&db_path)
        .with_context(|| format!("cannot open database at {}", db_path.display()))?;

    match cli.command {
        Command::Import { file, strategy } => cmd_import(&db, &file, strategy),
        Command::Projects => cmd_projects(&db),
        Command::Metrics { project } => cmd_metrics(&db, &project),
        Command::Tasks { project, details } => cmd_tasks(&db, &project, details),
        Command::Record {
            project,
            task,
            values,
        } => cmd_record(&db, &project, &task, &values),
    }
}

fn database_path(override_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = override_path {
        return Ok(PathBuf::from(path));
    }
    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(home.join(".worktally").join("worktally.db"))
}

fn cmd_import(db: &Database, file: &str, strategy: worktally::config::ImportStrategy) -> Result<()> {
    match import_config(db, std::path::Path::new(file), strategy) {
        Ok(projects) => {
            println!("The following projects were imported:");
            for project in &projects {
                print_project_summary(project);
            }
            Ok(())
        }
        Err(Error::ProjectConflict { names }) => {
            eprintln!(
                "Conflicts found between current projects and projects defined in '{}':",
                file
            );
            for name in &names {
                eprintln!(" * {}", name);
            }
            eprintln!(
                "\nRe-run with '--strategy merge' to reconcile the definitions, or \
                 '--strategy overwrite' to replace the projects along with their recorded data."
            );
            std::process::exit(1);
        }
        Err(err) => Err(err.into()),
    }
}

fn cmd_projects(db: &Database) -> Result<()> {
    let projects = db.list_projects()?;
    if projects.is_empty() {
        println!("No projects defined. Use 'worktally import' to add some.");
        return Ok(());
    }
    for project in &projects {
        print_project_summary(project);
    }
    Ok(())
}

fn cmd_metrics(db: &Database, name: &str) -> Result<()> {
    let project = lookup_project(db, name)?;

    println!("{} metrics:", project.qualified_name());
    for metric in &project.metrics {
        println!(" * {} ({})", metric.name, metric.value_kind.display_name());
        if let Some(desc) = &metric.description {
            println!("   - Description: {}", desc);
        }
        if let Some(allowed) = &metric.allowed_values {
            let values: Vec<String> = allowed.iter().map(|v| v.canonical_text()).collect();
            println!("   - Possible values: {}", values.join(", "));
        }
        if let Some(default) = &metric.default_value {
            println!("   - Default value: {}", default.canonical_text());
        }
    }
    Ok(())
}

fn cmd_tasks(db: &Database, name: &str, details: bool) -> Result<()> {
    let project = lookup_project(db, name)?;

    if project.tasks.is_empty() {
        println!("No tasks recorded for '{}'.", project.qualified_name());
        return Ok(());
    }

    for task in &project.tasks {
        println!(" * {}", task.name);
        if let Some(desc) = &task.description {
            println!("   - Description: {}", desc);
        }
        if details {
            for metric in &project.metrics {
                if let Some(total) = task.total(metric) {
                    println!("   - {}: {}", metric.name, total);
                }
            }
        }
    }
    Ok(())
}

fn cmd_record(db: &Database, name: &str, task_name: &str, values: &[String]) -> Result<()> {
    if values.len() % 2 != 0 {
        bail!("values must be METRIC VALUE pairs");
    }

    let mut project = lookup_project(db, name)?;

    let mut parsed = Vec::with_capacity(values.len() / 2);
    for pair in values.chunks(2) {
        let metric = project
            .metric(&pair[0])
            .ok_or_else(|| {
                anyhow!(
                    "no metric named '{}' in project '{}'",
                    pair[0],
                    project.qualified_name()
                )
            })?
            .clone();
        let value = parse_value(metric.value_kind, &pair[1])?;
        parsed.push((metric, value));
    }

    let task = project.ensure_task(task_name);
    for (metric, value) in parsed {
        task.record(&metric, value)?;
    }

    db.save_project(&mut project)?;
    println!("Recorded {} value(s) against task '{}'.", values.len() / 2, task_name);
    Ok(())
}

fn lookup_project(db: &Database, name: &str) -> Result<Project> {
    if let Some(project) = db.get_project(name)? {
        return Ok(project);
    }

    let matches = db.matching_names(name)?;
    if matches.is_empty() {
        bail!("no project named '{}'", name);
    }
    bail!(
        "no project named '{}'; did you mean: {}?",
        name,
        matches.join(", ")
    );
}

fn print_project_summary(project: &Project) {
    let desc = project
        .description
        .as_deref()
        .unwrap_or("No description provided");
    println!(" * {} - {}", project.qualified_name(), desc);
}
