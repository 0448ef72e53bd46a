mod error;
mod models;
mod report;
mod store;
mod tracker;
mod transfer;
mod tui;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use models::{source_label, Application, ApplicationDraft, Contact, Status};
use report::{build_weekly_report, format_date, render_report, truncate};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use store::{SqliteStorage, Storage};
use tracker::{AssumeYes, Confirm, Tracker};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jobtrack")]
#[command(about = "Personal job application tracker - record, search, and report on applications")]
struct Cli {
    /// Path to the tracker database
    #[arg(long, global = true, env = "JOBTRACK_DB")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the tracker database
    Init,

    /// Record a new application
    Add {
        #[command(flatten)]
        fields: FieldArgs,
    },

    /// Change fields of an application
    Edit {
        /// Application ID (or unique prefix)
        id: String,

        #[command(flatten)]
        fields: FieldArgs,
    },

    /// List applications, favorites first then newest
    List {
        /// Filter by company, position, or location
        #[arg(short, long, default_value = "")]
        search: String,
    },

    /// Show application details
    Show {
        /// Application ID (or unique prefix)
        id: String,
    },

    /// Delete an application
    Delete {
        /// Application ID (or unique prefix)
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Toggle the favorite flag
    Favorite {
        /// Application ID (or unique prefix)
        id: String,
    },

    /// Manage contacts of an application
    Contact {
        #[command(subcommand)]
        command: ContactCommands,
    },

    /// Show the weekly application report
    Report {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export all applications as JSON
    Export {
        /// Output file (`-` for stdout). Defaults to job-applications-<date>.json
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace all applications with the contents of a JSON export
    Import {
        /// JSON file to import
        file: PathBuf,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Manage job sources
    Source {
        #[command(subcommand)]
        command: SourceCommands,
    },

    /// Browse applications interactively
    Browse {
        /// Filter by company, position, or location
        #[arg(short, long)]
        search: Option<String>,
    },
}

#[derive(Subcommand)]
enum ContactCommands {
    /// Add a contact to an application
    Add {
        /// Application ID (or unique prefix)
        id: String,

        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        role: Option<String>,

        #[arg(short, long)]
        email: Option<String>,

        #[arg(short, long)]
        phone: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Remove a contact by its position in `show` output
    Remove {
        /// Application ID (or unique prefix)
        id: String,

        /// Contact number, starting at 1
        index: usize,
    },
}

#[derive(Subcommand)]
enum SourceCommands {
    /// List job sources
    List,

    /// Add a job source
    Add {
        /// Source label
        label: String,
    },

    /// Remove a job source
    Remove {
        /// Source label
        label: String,
    },
}

/// Application fields shared by `add` and `edit`. An empty string clears an
/// optional field.
#[derive(Args)]
struct FieldArgs {
    #[arg(long)]
    company: Option<String>,

    #[arg(long)]
    position: Option<String>,

    #[arg(long)]
    location: Option<String>,

    #[arg(long, value_enum)]
    status: Option<Status>,

    /// One of the managed job sources
    #[arg(long)]
    source: Option<String>,

    /// Date applied (YYYY-MM-DD), defaults to today
    #[arg(long)]
    date: Option<NaiveDate>,

    #[arg(long)]
    url: Option<String>,

    #[arg(long)]
    salary: Option<String>,

    #[arg(long)]
    company_url: Option<String>,

    #[arg(long)]
    last_contact: Option<String>,

    #[arg(long)]
    next_steps: Option<String>,

    #[arg(long)]
    notes: Option<String>,
}

impl FieldArgs {
    fn apply(self, draft: &mut ApplicationDraft) {
        fn optional(value: String) -> Option<String> {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        }

        if let Some(v) = self.company {
            draft.company = v.trim().to_string();
        }
        if let Some(v) = self.position {
            draft.position = v.trim().to_string();
        }
        if let Some(v) = self.location {
            draft.location = v.trim().to_string();
        }
        if let Some(v) = self.status {
            draft.status = v;
        }
        if let Some(v) = self.source {
            draft.source = v;
        }
        if let Some(v) = self.date {
            draft.applied_date = v;
        }
        if let Some(v) = self.url {
            draft.job_url = optional(v);
        }
        if let Some(v) = self.salary {
            draft.salary = optional(v);
        }
        if let Some(v) = self.company_url {
            draft.company_url = optional(v);
        }
        if let Some(v) = self.last_contact {
            draft.last_contact = optional(v);
        }
        if let Some(v) = self.next_steps {
            draft.next_steps = optional(v);
        }
        if let Some(v) = self.notes {
            draft.notes = v;
        }
    }
}

/// Asks on the terminal; anything but y/yes declines.
struct Prompt;

impl Confirm for Prompt {
    fn confirm(&mut self, prompt: &str) -> bool {
        print!("{} [y/N] ", prompt);
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

fn confirmer(yes: bool) -> Box<dyn Confirm> {
    if yes {
        Box::new(AssumeYes)
    } else {
        Box::new(Prompt)
    }
}

/// Resolve a full id or unique prefix to the stored id.
fn resolve_id<S: Storage>(tracker: &Tracker<S>, key: &str) -> Result<String> {
    match tracker.find_by_prefix(key).as_slice() {
        [] => Err(anyhow!("Application '{}' not found", key)),
        [app] => Ok(app.id.clone()),
        many => Err(anyhow!(
            "'{}' matches {} applications, use a longer id",
            key,
            many.len()
        )),
    }
}

fn check_source<S: Storage>(tracker: &Tracker<S>, source: &str) -> Result<()> {
    if !tracker.sources().iter().any(|s| s == source) {
        bail!(
            "Unknown source '{}'. Available: {}",
            source,
            tracker.sources().join(", ")
        );
    }
    Ok(())
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn print_application(app: &Application) {
    let d = &app.details;
    println!("Application {}", app.id);
    println!("Position: {}", d.position);
    println!("Company: {}", d.company);
    println!("Location: {}", d.location);
    println!("Status: {}", d.status);
    println!("Source: {}", source_label(&d.source));
    println!("Applied: {}", format_date(d.applied_date));
    if d.favorite {
        println!("Favorite: yes");
    }
    if let Some(salary) = &d.salary {
        println!("Salary: {}", salary);
    }
    if let Some(url) = &d.job_url {
        println!("Job URL: {}", url);
    }
    if let Some(url) = &d.company_url {
        println!("Company URL: {}", url);
    }
    if let Some(last) = &d.last_contact {
        println!("Last contact: {}", last);
    }
    if let Some(next) = &d.next_steps {
        println!("Next steps: {}", next);
    }
    if !d.contacts.is_empty() {
        println!("\nContacts ({}):", d.contacts.len());
        for (i, c) in d.contacts.iter().enumerate() {
            match &c.role {
                Some(role) => println!("  {}. {} - {}", i + 1, c.name, role),
                None => println!("  {}. {}", i + 1, c.name),
            }
            for v in [&c.email, &c.phone, &c.notes].into_iter().flatten() {
                println!("     {}", v);
            }
        }
    }
    if !d.notes.is_empty() {
        println!("\n--- Notes ---\n{}", textwrap::fill(&d.notes, 78));
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let storage = match &cli.db {
        Some(path) => SqliteStorage::open_at(path),
        None => SqliteStorage::open(),
    }
    .context("Failed to open tracker database")?;
    let db_path = storage.path().map(|p| p.display().to_string());
    let mut tracker = Tracker::load(storage)?;

    match cli.command {
        Commands::Init => {
            println!(
                "Database initialized at {}",
                db_path.as_deref().unwrap_or("(memory)")
            );
        }

        Commands::Add { fields } => {
            let mut draft = ApplicationDraft::new(Local::now().date_naive());
            fields.apply(&mut draft);
            check_source(&tracker, &draft.source)?;
            let app = tracker.create(draft)?;
            println!(
                "Added application {} ({} at {})",
                short_id(&app.id),
                app.details.position,
                app.details.company
            );
        }

        Commands::Edit { id, fields } => {
            let id = resolve_id(&tracker, &id)?;
            let Some(existing) = tracker.get(&id) else {
                bail!("Application '{}' not found", id);
            };
            let mut draft = existing.details.clone();
            let source_changed = fields.source.is_some();
            fields.apply(&mut draft);
            if source_changed {
                check_source(&tracker, &draft.source)?;
            }
            match tracker.update(&id, draft)? {
                Some(app) => println!("Updated application {}", short_id(&app.id)),
                None => println!("Application '{}' not found.", id),
            }
        }

        Commands::List { search } => {
            let apps = tracker.view(&search);
            if apps.is_empty() {
                if tracker.applications().is_empty() {
                    println!("No applications yet. Add one with 'jobtrack add'.");
                } else {
                    println!("No applications match '{}'.", search);
                }
            } else {
                println!(
                    "{:<2}{:<10} {:<12} {:<13} {:<20} {:<24} {:<16}",
                    "", "ID", "APPLIED", "STATUS", "COMPANY", "POSITION", "LOCATION"
                );
                println!("{}", "-".repeat(100));
                for app in apps {
                    let d = &app.details;
                    println!(
                        "{:<2}{:<10} {:<12} {:<13} {:<20} {:<24} {:<16}",
                        if d.favorite { "*" } else { "" },
                        short_id(&app.id),
                        d.applied_date.format("%Y-%m-%d").to_string(),
                        d.status,
                        truncate(&d.company, 20),
                        truncate(&d.position, 24),
                        truncate(&d.location, 16)
                    );
                }
            }
        }

        Commands::Show { id } => {
            let id = resolve_id(&tracker, &id)?;
            match tracker.get(&id) {
                Some(app) => print_application(app),
                None => println!("Application '{}' not found.", id),
            }
        }

        Commands::Delete { id, yes } => {
            let id = resolve_id(&tracker, &id)?;
            let mut confirm = confirmer(yes);
            if tracker.delete(&id, &mut *confirm)? {
                println!("Deleted application {}", short_id(&id));
            } else {
                println!("Nothing deleted.");
            }
        }

        Commands::Favorite { id } => {
            let id = resolve_id(&tracker, &id)?;
            match tracker.toggle_favorite(&id)? {
                Some(true) => println!("Marked {} as favorite.", short_id(&id)),
                Some(false) => println!("Removed {} from favorites.", short_id(&id)),
                None => println!("Application '{}' not found.", id),
            }
        }

        Commands::Contact { command } => match command {
            ContactCommands::Add {
                id,
                name,
                role,
                email,
                phone,
                notes,
            } => {
                let id = resolve_id(&tracker, &id)?;
                let contact = Contact {
                    name: name.trim().to_string(),
                    role,
                    email,
                    phone,
                    notes,
                };
                match tracker.add_contact(&id, contact)? {
                    Some(app) => println!(
                        "Added contact to {} ({} contacts)",
                        short_id(&app.id),
                        app.details.contacts.len()
                    ),
                    None => println!("Application '{}' not found.", id),
                }
            }

            ContactCommands::Remove { id, index } => {
                let id = resolve_id(&tracker, &id)?;
                if index == 0 {
                    bail!("Contact numbers start at 1");
                }
                match tracker.remove_contact(&id, index - 1)? {
                    Some(app) => println!(
                        "{} now has {} contacts",
                        short_id(&app.id),
                        app.details.contacts.len()
                    ),
                    None => println!("Application '{}' not found.", id),
                }
            }
        },

        Commands::Report { json } => {
            let buckets = build_weekly_report(tracker.applications());
            if json {
                println!("{}", serde_json::to_string_pretty(&buckets)?);
            } else if buckets.is_empty() {
                println!("No applications yet.");
            } else {
                print!("{}", render_report(&buckets));
            }
        }

        Commands::Export { output } => {
            let document = tracker.export()?;
            let path = output.unwrap_or_else(|| {
                PathBuf::from(transfer::export_filename(Utc::now().date_naive()))
            });
            if path.as_os_str() == "-" {
                println!("{}", document);
            } else {
                std::fs::write(&path, &document)
                    .with_context(|| format!("Failed to write to {}", path.display()))?;
                println!(
                    "Exported {} applications to {}",
                    tracker.applications().len(),
                    path.display()
                );
            }
        }

        Commands::Import { file, yes } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("Failed to read import file: {}", file.display()))?;
            let records = transfer::parse_import_file(&bytes).map_err(|e| {
                anyhow!("Error importing data. Please check the file format. ({})", e)
            })?;
            let count = records.len();
            let mut confirm = confirmer(yes);
            if tracker.commit_import(records, &mut *confirm)? {
                println!("Imported {} applications from {}", count, file.display());
            } else {
                println!("Import cancelled. Existing data kept.");
            }
        }

        Commands::Source { command } => match command {
            SourceCommands::List => {
                for source in tracker.sources() {
                    let label = source_label(source);
                    if label == source {
                        println!("{}", source);
                    } else {
                        println!("{:<20} ({})", source, label);
                    }
                }
            }

            SourceCommands::Add { label } => {
                let added = tracker.add_source(&label)?;
                println!("Added source '{}'.", added);
            }

            SourceCommands::Remove { label } => {
                if tracker.remove_source(&label)? {
                    println!("Removed source '{}'.", label);
                } else {
                    println!("Source '{}' not found.", label);
                }
            }
        },

        Commands::Browse { search } => {
            tui::run_browse(&mut tracker, search.as_deref())?;
        }
    }

    Ok(())
}
