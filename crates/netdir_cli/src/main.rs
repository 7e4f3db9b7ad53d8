//! Command-line front end for the netdir directory.
//!
//! # Responsibility
//! - Map subcommands onto `netdir_core` services.
//! - Report every outcome as one `[success]` / `[error]` notification line.
//!
//! # Invariants
//! - Never panics on bad input; failures exit with a non-zero status.

use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use netdir_core::graph::{
    build_organization_network, build_people_network, related_organizations, related_people,
};
use netdir_core::{
    default_log_level, init_logging, AppConfig, DeletedOrganization, DirectoryError,
    DirectoryService, ImportExportService, ImportReport, Notification, Organization, Person, RepairReport,
    SqliteDocumentStore,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "netdir", version, about = "People and organization directory")]
struct Cli {
    /// SQLite database file.
    #[arg(long, env = "NETDIR_DB", default_value = netdir_core::config::DEFAULT_DB_FILE_NAME)]
    db: PathBuf,

    /// Scopes every collection; records of other app ids are invisible.
    #[arg(long, env = "NETDIR_APP_ID", default_value = netdir_core::config::DEFAULT_APP_ID)]
    app_id: String,

    /// Absolute directory for rolling log files. Logging is off when unset.
    #[arg(long, env = "NETDIR_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[arg(long, env = "NETDIR_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    People,
    Orgs,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print records as JSON lines.
    List {
        kind: Kind,
        /// Case-insensitive name filter.
        #[arg(long)]
        search: Option<String>,
    },
    ImportPeople {
        file: PathBuf,
    },
    ImportOrgs {
        file: PathBuf,
    },
    /// Write the people CSV to `--out`, or stdout.
    ExportPeople {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    ExportOrgs {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Create or replace a person from a JSON file.
    SavePerson {
        file: PathBuf,
        /// Replace this person instead of creating one.
        #[arg(long)]
        id: Option<String>,
    },
    /// Create or replace an organization from a JSON file.
    SaveOrg {
        file: PathBuf,
        #[arg(long)]
        id: Option<String>,
    },
    RenameOrg {
        id: String,
        name: String,
    },
    DeletePerson {
        id: String,
    },
    DeleteOrg {
        id: String,
    },
    /// Print the people or organization network as JSON.
    Graph {
        kind: Kind,
    },
    /// Print the organizations of a person, or the people of an organization,
    /// with each member's role.
    Related {
        kind: Kind,
        id: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let notification = match run(cli) {
        Ok(notification) => notification,
        Err(failure) => failure.into_notification(),
    };
    report(&notification)
}

/// Failure from any stage of a CLI run.
enum Failure {
    Setup(String),
    Directory(DirectoryError),
}

impl Failure {
    fn into_notification(self) -> Notification {
        match self {
            Self::Setup(message) => Notification::error(message),
            Self::Directory(err) => {
                eprintln!("{err}");
                Notification::from(&err)
            }
        }
    }
}

impl From<DirectoryError> for Failure {
    fn from(value: DirectoryError) -> Self {
        Self::Directory(value)
    }
}

fn run(cli: Cli) -> Result<Notification, Failure> {
    let config = load_config(&cli)?;
    if let Some(log_dir) = config.log_dir() {
        init_logging(config.log_level(), &log_dir.to_string_lossy()).map_err(Failure::Setup)?;
    }
    info!(
        "event=cli_start module=cli status=ok app_id={} command={:?}",
        config.app_id(),
        cli.command
    );

    let conn = netdir_core::db::open_db(config.db_path())
        .map_err(|err| Failure::Setup(format!("Failed to open database: {err}")))?;
    let store = SqliteDocumentStore::new(&conn, config.app_id());
    execute(cli.command, &store)
}

fn load_config(cli: &Cli) -> Result<AppConfig, Failure> {
    let config =
        AppConfig::new(&cli.app_id, cli.db.clone()).map_err(|err| Failure::Setup(err.to_string()))?;
    match &cli.log_dir {
        Some(log_dir) => {
            let level = cli
                .log_level
                .clone()
                .unwrap_or_else(|| default_log_level().to_string());
            config
                .with_logging(level, absolute(log_dir))
                .map_err(|err| Failure::Setup(err.to_string()))
        }
        None => Ok(config),
    }
}

fn execute(command: Command, store: &SqliteDocumentStore<'_>) -> Result<Notification, Failure> {
    let directory = DirectoryService::new(store);
    let transfer = ImportExportService::new(store);

    let notification = match command {
        Command::List { kind, search } => {
            let lines = match (kind, search) {
                (Kind::People, None) => json_lines(&directory.list_people()?, person_json),
                (Kind::People, Some(term)) => {
                    json_lines(&directory.search_people(&term)?, person_json)
                }
                (Kind::Orgs, None) => json_lines(&directory.list_organizations()?, org_json),
                (Kind::Orgs, Some(term)) => {
                    json_lines(&directory.search_organizations(&term)?, org_json)
                }
            };
            let count = lines.len();
            for line in lines {
                println!("{line}");
            }
            Notification::success(format!("{count} record(s)."))
        }
        Command::ImportPeople { file } => {
            import_notification(&transfer.import_people_file(&file)?, "people")
        }
        Command::ImportOrgs { file } => {
            import_notification(&transfer.import_organizations_file(&file)?, "organizations")
        }
        Command::ExportPeople { out } => match out {
            Some(path) => {
                transfer.export_people_file(&path)?;
                Notification::success("Exported.")
            }
            None => {
                println!("{}", transfer.export_people_csv()?);
                Notification::success("Exported.")
            }
        },
        Command::ExportOrgs { out } => match out {
            Some(path) => {
                transfer.export_organizations_file(&path)?;
                Notification::success("Exported.")
            }
            None => {
                println!("{}", transfer.export_organizations_csv()?);
                Notification::success("Exported.")
            }
        },
        Command::SavePerson { file, id } => {
            let mut person: Person = serde_json::from_value(read_json(&file)?)
                .map_err(|err| Failure::Setup(format!("Invalid person JSON: {err}")))?;
            person.id = id.unwrap_or_default();
            let saved = directory.save_person(person)?;
            println!("{}", saved.id);
            Notification::success("Saved!")
        }
        Command::SaveOrg { file, id } => {
            let mut organization = Organization::from_loose_json(&read_json(&file)?);
            organization.id = id.unwrap_or_default();
            let saved = directory.save_organization(organization)?;
            println!("{}", saved.organization.id);
            saved_notification(saved.repair.as_ref())
        }
        Command::RenameOrg { id, name } => {
            let mut organization = directory.get_organization(&id)?.ok_or_else(|| {
                Failure::Setup(format!("Organization `{id}` not found."))
            })?;
            organization.name = name;
            let saved = directory.save_organization(organization)?;
            saved_notification(saved.repair.as_ref())
        }
        Command::DeletePerson { id } => {
            directory.delete_person(&id)?;
            Notification::success("Deleted!")
        }
        Command::DeleteOrg { id } => {
            deleted_notification(&directory.delete_organization(&id)?)
        }
        Command::Graph { kind } => {
            let graph = match kind {
                Kind::People => build_people_network(&directory.list_people()?),
                Kind::Orgs => build_organization_network(
                    &directory.list_organizations()?,
                    &directory.list_people()?,
                ),
            };
            let rendered = serde_json::to_string_pretty(&graph)
                .map_err(|err| Failure::Setup(format!("Failed to render graph: {err}")))?;
            println!("{rendered}");
            Notification::success(format!(
                "{} node(s), {} edge(s).",
                graph.nodes.len(),
                graph.edges.len()
            ))
        }
        Command::Related { kind, id } => {
            let lines = match kind {
                Kind::People => {
                    let person = directory
                        .get_person(&id)?
                        .ok_or_else(|| Failure::Setup(format!("Person `{id}` not found.")))?;
                    let organizations = directory.list_organizations()?;
                    related_organizations(&person, &organizations)
                        .into_iter()
                        .map(|related| {
                            related_json(&related.entity.id, &related.entity.name, related.role)
                        })
                        .collect::<Vec<_>>()
                }
                Kind::Orgs => {
                    let organization = directory.get_organization(&id)?.ok_or_else(|| {
                        Failure::Setup(format!("Organization `{id}` not found."))
                    })?;
                    let people = directory.list_people()?;
                    related_people(&organization, &people)
                        .into_iter()
                        .map(|related| {
                            related_json(&related.entity.id, &related.entity.name, related.role)
                        })
                        .collect::<Vec<_>>()
                }
            };
            let count = lines.len();
            for line in lines {
                println!("{line}");
            }
            Notification::success(format!("{count} related record(s)."))
        }
    };
    Ok(notification)
}

fn related_json(id: &str, name: &str, role: &str) -> String {
    serde_json::json!({ "id": id, "name": name, "role": role }).to_string()
}

fn import_notification(report: &ImportReport, kind: &str) -> Notification {
    for skipped in &report.skipped {
        eprintln!("line {}: skipped ({})", skipped.line_number, skipped.reason);
    }
    for name in &report.unresolved_organizations {
        eprintln!("organization `{name}` not found; kept as name only");
    }
    Notification::success(format!("{} {kind} imported.", report.imported()))
}

fn saved_notification(repair: Option<&RepairReport>) -> Notification {
    match repair {
        Some(repair) if !repair.is_noop() => Notification::success(format!(
            "Saved! {} member record(s) updated.",
            repair.updated.len()
        )),
        _ => Notification::success("Saved!"),
    }
}

fn deleted_notification(deleted: &DeletedOrganization) -> Notification {
    Notification::success(format!(
        "Deleted! {} member record(s) updated.",
        deleted.repair.updated.len()
    ))
}

fn json_lines<T>(records: &[T], render: fn(&T) -> serde_json::Value) -> Vec<String> {
    records.iter().map(|record| render(record).to_string()).collect()
}

fn person_json(person: &Person) -> serde_json::Value {
    with_id(&person.id, serde_json::to_value(person))
}

fn org_json(organization: &Organization) -> serde_json::Value {
    with_id(&organization.id, serde_json::to_value(organization))
}

/// Record ids are not part of the stored body; splice them back in.
fn with_id(id: &str, value: serde_json::Result<serde_json::Value>) -> serde_json::Value {
    match value {
        Ok(serde_json::Value::Object(mut fields)) => {
            fields.insert("id".to_string(), serde_json::Value::String(id.to_string()));
            serde_json::Value::Object(fields)
        }
        _ => serde_json::json!({ "id": id }),
    }
}

fn read_json(path: &Path) -> Result<serde_json::Value, Failure> {
    let text = std::fs::read_to_string(path).map_err(|source| {
        Failure::Directory(DirectoryError::FileRead {
            path: path.to_path_buf(),
            source,
        })
    })?;
    serde_json::from_str(&text)
        .map_err(|err| Failure::Setup(format!("Invalid JSON in `{}`: {err}", path.display())))
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn report(notification: &Notification) -> ExitCode {
    if notification.is_error() {
        eprintln!("[error] {}", notification.message);
        ExitCode::FAILURE
    } else {
        println!("[success] {}", notification.message);
        ExitCode::SUCCESS
    }
}
