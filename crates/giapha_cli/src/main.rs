//! Giapha command-line front end.
//!
//! # Responsibility
//! - Wire config, logging and the SQLite connection into core use-cases.
//! - Decide where backup snapshots are read from and written to.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use giapha_core::db::open_db;
use giapha_core::{
    init_logging_from_config, load_config, AvatarChange, AvatarUpload, BackupService,
    FsObjectStore, Gender, GiaphaConfig, ImportMode, ImportOptions, LogViewInvalidator,
    MemberEditor, MemberForm, ProfileRepository, Role, SqliteProfileRepository, StaticIdentity,
};
use log::info;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "giapha")]
#[command(version)]
#[command(about = "Family register maintenance: backup, restore and member records")]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file (overrides config)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or migrate the database
    Init,

    /// Assign a role to a user profile
    GrantRole {
        /// User id
        #[arg(short, long)]
        user: Uuid,

        #[arg(short, long, value_enum)]
        role: RoleArg,
    },

    /// Export all persons and relationships as JSON
    Export {
        /// Acting user id
        #[arg(long = "as")]
        acting_user: Uuid,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Replace all persons and relationships from a JSON snapshot
    Import {
        /// Acting user id
        #[arg(long = "as")]
        acting_user: Uuid,

        /// Snapshot file
        #[arg(short, long)]
        file: PathBuf,

        /// Run the restore inside one transaction
        #[arg(long)]
        atomic: bool,

        /// Records per insert batch (overrides config)
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// Add one member record
    AddMember {
        /// Acting user id
        #[arg(long = "as")]
        acting_user: Uuid,

        #[arg(short, long)]
        name: String,

        #[arg(short, long, value_enum, default_value = "male")]
        gender: GenderArg,

        #[arg(long)]
        birth_year: Option<i64>,

        /// Avatar image file
        #[arg(long)]
        avatar: Option<PathBuf>,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::GrantRole { .. } => "grant-role",
            Self::Export { .. } => "export",
            Self::Import { .. } => "import",
            Self::AddMember { .. } => "add-member",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    Admin,
    Member,
}

impl From<RoleArg> for Role {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::Admin => Role::Admin,
            RoleArg::Member => Role::Member,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum GenderArg {
    Male,
    Female,
    Other,
}

impl From<GenderArg> for Gender {
    fn from(value: GenderArg) -> Self {
        match value {
            GenderArg::Male => Gender::Male,
            GenderArg::Female => Gender::Female,
            GenderArg::Other => Gender::Other,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?.unwrap_or_default();
    if let Some(database) = cli.database {
        config.database = database;
    }
    init_logging_from_config(&config).map_err(anyhow::Error::msg)?;

    let conn = open_db(&config.database)
        .with_context(|| format!("failed to open `{}`", config.database.display()))?;

    info!(
        "event=cli_command module=cli status=start command={}",
        cli.command.name()
    );
    match cli.command {
        Commands::Init => {
            println!("database ready at {}", config.database.display());
        }
        Commands::GrantRole { user, role } => {
            let role = Role::from(role);
            SqliteProfileRepository::new(&conn).set_role(user, role)?;
            println!("user {user} is now {}", role.as_str());
        }
        Commands::Export { acting_user, out } => {
            let identity = StaticIdentity::signed_in(acting_user);
            let invalidator = LogViewInvalidator;
            let snapshot = BackupService::new(&conn, &identity, &invalidator).export_snapshot()?;
            let json = snapshot.to_json_pretty()?;
            match out {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("failed to write `{}`", path.display()))?;
                    eprintln!(
                        "exported {} persons and {} relationships to {}",
                        snapshot.persons.len(),
                        snapshot.relationships.len(),
                        path.display()
                    );
                }
                None => println!("{json}"),
            }
        }
        Commands::Import {
            acting_user,
            file,
            atomic,
            chunk_size,
        } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read `{}`", file.display()))?;
            let options = import_options(&config, atomic, chunk_size);
            let identity = StaticIdentity::signed_in(acting_user);
            let invalidator = LogViewInvalidator;
            let report = BackupService::new(&conn, &identity, &invalidator)
                .with_options(options)
                .import_snapshot_json(&text)?;
            println!(
                "imported {} persons ({} batches) and {} relationships ({} batches)",
                report.persons_imported,
                report.person_batches,
                report.relationships_imported,
                report.relationship_batches
            );
        }
        Commands::AddMember {
            acting_user,
            name,
            gender,
            birth_year,
            avatar,
        } => {
            let identity = StaticIdentity::signed_in(acting_user);
            let objects = FsObjectStore::new(&config.avatar_root, config.public_base_url.clone());
            let mut form = MemberForm::new(name, gender.into());
            form.birth_year = birth_year;
            let change = match avatar {
                Some(path) => AvatarChange::Replace(read_avatar(&path)?),
                None => AvatarChange::Keep,
            };
            let id = MemberEditor::new(&conn, &identity, &objects).save(&form, change)?;
            println!("{id}");
        }
    }

    Ok(())
}

fn import_options(config: &GiaphaConfig, atomic: bool, chunk_size: Option<usize>) -> ImportOptions {
    ImportOptions {
        chunk_size: chunk_size.unwrap_or(config.import_chunk_size),
        mode: if atomic {
            ImportMode::Atomic
        } else {
            ImportMode::NonAtomic
        },
    }
}

fn read_avatar(path: &Path) -> anyhow::Result<AvatarUpload> {
    let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
        bail!("avatar path has no file name: {}", path.display());
    };
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read `{}`", path.display()))?;
    Ok(AvatarUpload {
        file_name: file_name.to_string(),
        bytes,
    })
}
