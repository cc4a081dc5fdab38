//! Edu Journal CLI
//!
//! Gradebook, attendance, posts and user directory from the terminal.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use edu_journal::{
    access::{self, capabilities_for, Capability, Session},
    config::Config,
    core::{parse_iso_date, range_days, to_iso_date, MAX_WINDOW_DAYS},
    exchange::{self, Dataset},
    model::{AttendanceStatus, MarkKind, NewUser, UserPatch, UserRole},
    store::{Action, AppStore, FileKeyValueStore, StudentsAction, UsersAction},
    VERSION,
};

#[cfg(feature = "remote")]
use edu_journal::{
    model::{PostId, PostPatch, PostPayload},
    store::{
        thunks::{self, DetailLoad, ImageAttachment},
        PostsAction, Relevance, SharedStore,
    },
    HttpPostsApi,
};

/// Environment variable holding the log filter.
const LOG_ENV_VAR: &str = "EDU_JOURNAL_LOG";

#[derive(Parser)]
#[command(name = "edu-journal")]
#[command(version = VERSION)]
#[command(about = "Gradebook, attendance journal, posts and user directory", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show every student with windowed statistics, best average first
    Students,

    /// Show or set the statistics window in days
    Window {
        /// New window size
        #[arg(value_parser = clap::value_parser!(u32).range(..=i64::from(MAX_WINDOW_DAYS)))]
        days: Option<u32>,
    },

    /// Add, rename, remove or inspect a student
    #[command(subcommand)]
    Student(StudentCmd),

    /// Add, change or remove marks
    #[command(subcommand)]
    Mark(MarkCmd),

    /// Record attendance for a day (today by default)
    Attend {
        student_id: String,
        /// present, absent, late or none
        status: AttendanceStatus,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },

    /// Browse and manage the user directory
    #[command(subcommand)]
    Users(UsersCmd),

    /// Read and edit posts on the remote API
    #[cfg(feature = "remote")]
    #[command(subcommand)]
    Posts(PostsCmd),

    /// Export a dataset to CSV
    Export {
        #[arg(long, value_enum, default_value = "students")]
        dataset: Dataset,
        path: PathBuf,
    },

    /// Replace a dataset with the contents of a CSV file
    Import {
        #[arg(long, value_enum, default_value = "students")]
        dataset: Dataset,
        path: PathBuf,
    },

    /// Show configuration
    Config,

    /// Show the session role and what it may do
    Whoami,
}

#[derive(Subcommand)]
enum StudentCmd {
    Add {
        name: String,
        #[arg(long)]
        group: Option<String>,
    },
    Remove {
        id: String,
    },
    Rename {
        id: String,
        name: String,
    },
    /// Marks and attendance inside the current window
    Show {
        id: String,
    },
}

#[derive(Subcommand)]
enum MarkCmd {
    Add {
        student_id: String,
        value: f64,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        #[arg(long)]
        subject: Option<String>,
        /// class, self, exam or topic
        #[arg(long)]
        kind: Option<MarkKind>,
    },
    Update {
        student_id: String,
        mark_id: String,
        value: f64,
    },
    Remove {
        student_id: String,
        mark_id: String,
    },
}

#[derive(Args)]
struct UserFields {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    group: Option<String>,
    /// student, teacher or admin
    #[arg(long)]
    role: Option<UserRole>,
}

#[derive(Subcommand)]
enum UsersCmd {
    List,
    Show {
        id: String,
    },
    Add {
        #[command(flatten)]
        fields: UserFields,
    },
    Update {
        id: String,
        #[command(flatten)]
        fields: UserFields,
    },
    Delete {
        id: String,
    },
}

#[cfg(feature = "remote")]
#[derive(Args)]
struct PostFields {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    content: Option<String>,
    #[arg(long)]
    author: Option<String>,
    #[arg(long)]
    image_url: Option<String>,
    /// MIME type of an attached image, checked before sending
    #[arg(long)]
    image_type: Option<String>,
    /// Size in bytes of an attached image, checked before sending
    #[arg(long)]
    image_size: Option<u64>,
}

#[cfg(feature = "remote")]
impl PostFields {
    fn image(&self) -> Option<ImageAttachment> {
        if self.image_type.is_none() && self.image_size.is_none() {
            return None;
        }
        Some(ImageAttachment {
            mime: self.image_type.clone().unwrap_or_default(),
            size: self.image_size.unwrap_or(0),
        })
    }
}

#[cfg(feature = "remote")]
#[derive(Subcommand)]
enum PostsCmd {
    List {
        /// Number of posts to fetch (config `posts_limit` by default)
        #[arg(long)]
        limit: Option<usize>,
    },
    Show {
        id: String,
    },
    Create {
        #[command(flatten)]
        fields: PostFields,
    },
    Update {
        id: String,
        #[command(flatten)]
        fields: PostFields,
    },
    Delete {
        id: String,
    },
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    parse_iso_date(raw).map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: could not install logger: {e}");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = Config::load().context("failed to load configuration")?;
    let session = config.session();

    match cli.command {
        Commands::Students => cmd_students(&config),
        Commands::Window { days } => cmd_window(&config, &session, days),
        Commands::Student(cmd) => cmd_student(&config, &session, cmd),
        Commands::Mark(cmd) => cmd_mark(&config, &session, cmd),
        Commands::Attend {
            student_id,
            status,
            date,
        } => cmd_attend(&config, &session, student_id, status, date),
        Commands::Users(cmd) => cmd_users(&config, &session, cmd),
        #[cfg(feature = "remote")]
        Commands::Posts(cmd) => cmd_posts(&config, &session, cmd).await,
        Commands::Export { dataset, path } => cmd_export(&config, &session, dataset, path),
        Commands::Import { dataset, path } => cmd_import(&config, &session, dataset, path),
        Commands::Config => cmd_config(&config),
        Commands::Whoami => cmd_whoami(&session),
    }
}

fn open_store(config: &Config) -> Result<AppStore> {
    config
        .ensure_directories()
        .context("failed to create data directory")?;
    let clock = config.clock()?;
    let kv = FileKeyValueStore::new(&config.data_path);
    Ok(AppStore::load_or_default(clock, Some(Box::new(kv))))
}

/// Dispatch as `session`, failing with `missing` when nothing matched.
fn apply(
    store: &mut AppStore,
    session: &Session,
    action: impl Into<Action>,
    missing: impl FnOnce() -> String,
) -> Result<()> {
    if !store.dispatch_as(session, action)? {
        bail!(missing());
    }
    store.persist().context("failed to save journal")?;
    Ok(())
}

fn cmd_students(config: &Config) -> Result<()> {
    let store = open_store(config)?;

    println!(
        "Window: last {} days up to {}",
        store.days_window(),
        to_iso_date(store.today())
    );
    println!();
    println!(
        "{:<32}  {:<22} {:<9} {:>6} {:>6} {:>4} {:>4} {:>4}",
        "ID", "Name", "Group", "Avg", "All", "P%", "A%", "L%"
    );
    for row in store.leaderboard() {
        println!(
            "{:<32}  {:<22} {:<9} {:>6.1} {:>6.1} {:>4} {:>4} {:>4}",
            row.student_id,
            row.name,
            row.group.as_deref().unwrap_or("-"),
            row.average_window,
            row.average_all,
            row.attendance.present_pct,
            row.attendance.absent_pct,
            row.attendance.late_pct,
        );
    }
    Ok(())
}

fn cmd_window(config: &Config, session: &Session, days: Option<u32>) -> Result<()> {
    let mut store = open_store(config)?;
    match days {
        None => println!("{}", store.days_window()),
        Some(days) => {
            apply(&mut store, session, StudentsAction::SetDaysWindow(days), || {
                "window unchanged".to_string()
            })?;
            println!("Statistics window set to {days} days");
        }
    }
    Ok(())
}

fn cmd_student(config: &Config, session: &Session, cmd: StudentCmd) -> Result<()> {
    let mut store = open_store(config)?;

    match cmd {
        StudentCmd::Add { name, group } => {
            let name = name.trim().to_string();
            if name.is_empty() {
                bail!("student name is required");
            }
            let action = StudentsAction::add_student(name, group);
            let id = match &action {
                StudentsAction::AddStudent { id, .. } => id.clone(),
                _ => unreachable!("add_student builds AddStudent"),
            };
            apply(&mut store, session, action, String::new)?;
            println!("Added student {id}");
        }
        StudentCmd::Remove { id } => {
            let missing = no_student(&id);
            apply(&mut store, session, StudentsAction::RemoveStudent { id }, missing)?;
            println!("Removed");
        }
        StudentCmd::Rename { id, name } => {
            let missing = no_student(&id);
            apply(
                &mut store,
                session,
                StudentsAction::RenameStudent { id, name },
                missing,
            )?;
            println!("Renamed");
        }
        StudentCmd::Show { id } => {
            let student = store
                .student(&id)
                .with_context(no_student(&id))?;
            let stats = store
                .student_stats(&id)
                .with_context(no_student(&id))?;
            let today = store.today();
            let window = store.days_window();

            println!("{} ({})", student.name, student.group.as_deref().unwrap_or("no group"));
            println!(
                "Average: {:.1} over {window} days, {:.1} overall",
                stats.average_window, stats.average_all
            );
            println!(
                "Attendance: {}% present, {}% absent, {}% late ({} days unrecorded)",
                stats.attendance.present_pct,
                stats.attendance.absent_pct,
                stats.attendance.late_pct,
                stats.attendance.unrecorded,
            );
            println!();
            println!("Marks:");
            for mark in student
                .marks
                .iter()
                .filter(|m| edu_journal::core::is_in_window(m.date, today, window))
            {
                println!(
                    "  {}  {:>5.1}  {:<6} {}  [{}]",
                    to_iso_date(mark.date),
                    mark.value,
                    mark.kind.map(MarkKind::as_str).unwrap_or("-"),
                    mark.subject.as_deref().unwrap_or(""),
                    mark.id,
                );
            }
            println!();
            println!("Attendance:");
            for date in range_days(today, window) {
                println!("  {}  {}", to_iso_date(date), student.status_on(date));
            }
        }
    }
    Ok(())
}

fn no_student(id: &str) -> impl FnOnce() -> String {
    let id = id.to_string();
    move || format!("no student with id {id}")
}

fn cmd_mark(config: &Config, session: &Session, cmd: MarkCmd) -> Result<()> {
    let mut store = open_store(config)?;

    match cmd {
        MarkCmd::Add {
            student_id,
            value,
            date,
            subject,
            kind,
        } => {
            check_mark_value(value)?;
            let missing = no_student(&student_id);
            let action = store.mark_action(student_id, value, date, subject, kind);
            apply(&mut store, session, action, missing)?;
            println!("Mark recorded");
        }
        MarkCmd::Update {
            student_id,
            mark_id,
            value,
        } => {
            check_mark_value(value)?;
            let missing = format!("no mark {mark_id} for student {student_id}");
            apply(
                &mut store,
                session,
                StudentsAction::UpdateMark {
                    student_id,
                    mark_id,
                    value,
                },
                || missing,
            )?;
            println!("Mark updated");
        }
        MarkCmd::Remove {
            student_id,
            mark_id,
        } => {
            let missing = format!("no mark {mark_id} for student {student_id}");
            apply(
                &mut store,
                session,
                StudentsAction::RemoveMark {
                    student_id,
                    mark_id,
                },
                || missing,
            )?;
            println!("Mark removed");
        }
    }
    Ok(())
}

fn check_mark_value(value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        bail!("mark must be a non-negative number, got {value}");
    }
    Ok(())
}

fn cmd_attend(
    config: &Config,
    session: &Session,
    student_id: String,
    status: AttendanceStatus,
    date: Option<NaiveDate>,
) -> Result<()> {
    let mut store = open_store(config)?;
    let missing = no_student(&student_id);
    let action = store.attendance_action(student_id, status, date);
    let day = match &action {
        StudentsAction::SetAttendance { date, .. } => *date,
        _ => store.today(),
    };
    apply(&mut store, session, action, missing)?;
    println!("{} marked {status}", to_iso_date(day));
    Ok(())
}

fn cmd_users(config: &Config, session: &Session, cmd: UsersCmd) -> Result<()> {
    access::require(session, Capability::ViewUsers)?;
    let mut store = open_store(config)?;

    match cmd {
        UsersCmd::List => {
            println!(
                "{:<32}  {:<22} {:<8} {:<9} {:<24} Phone",
                "ID", "Name", "Role", "Group", "Email"
            );
            for user in store.users().iter() {
                println!(
                    "{:<32}  {:<22} {:<8} {:<9} {:<24} {}",
                    user.id,
                    user.name,
                    user.role,
                    user.group.as_deref().unwrap_or("-"),
                    user.email.as_deref().unwrap_or("-"),
                    user.phone.as_deref().unwrap_or("-"),
                );
            }
        }
        UsersCmd::Show { id } => {
            let user = store
                .user(&id)
                .with_context(|| format!("no user with id {id}"))?;
            println!("{}", serde_json::to_string_pretty(user)?);
        }
        UsersCmd::Add { fields } => {
            let action = UsersAction::add_user(NewUser {
                name: fields.name,
                email: fields.email,
                phone: fields.phone,
                group: fields.group,
                role: fields.role,
            })?;
            let id = match &action {
                UsersAction::AddUser(user) => user.id.clone(),
                _ => unreachable!("add_user builds AddUser"),
            };
            apply(&mut store, session, action, String::new)?;
            println!("Added user {id}");
        }
        UsersCmd::Update { id, fields } => {
            let patch = UserPatch {
                name: fields.name,
                email: fields.email,
                phone: fields.phone,
                group: fields.group,
                role: fields.role,
            };
            if patch.is_empty() {
                bail!("nothing to update; pass at least one field");
            }
            let missing = format!("no user with id {id}");
            apply(
                &mut store,
                session,
                UsersAction::update_user(id, patch)?,
                || missing,
            )?;
            println!("User updated");
        }
        UsersCmd::Delete { id } => {
            let missing = format!("no user with id {id}");
            apply(&mut store, session, UsersAction::DeleteUser { id }, || missing)?;
            println!("User deleted");
        }
    }
    Ok(())
}

#[cfg(feature = "remote")]
async fn cmd_posts(config: &Config, session: &Session, cmd: PostsCmd) -> Result<()> {
    access::require(session, Capability::ViewPosts)?;
    let api = HttpPostsApi::new(config.api.to_api_config())?;
    let store = SharedStore::new(open_store(config)?);
    store.dispatch(PostsAction::SetLimit(config.posts_limit)).await;

    match cmd {
        PostsCmd::List { limit } => {
            if let Some(limit) = limit {
                store.dispatch(PostsAction::SetLimit(limit)).await;
            }
            if !thunks::fetch_posts(&store, &api).await {
                bail!(last_error(&store).await);
            }
            let posts = store.read(|s| s.posts().posts().to_vec()).await;
            if posts.is_empty() {
                println!("No posts.");
            }
            for post in posts {
                println!("[{}] {}", post.id, post.title);
                println!("    {}", post.excerpt(80));
            }
        }
        PostsCmd::Show { id } => {
            let id = PostId::parse(&id);
            match thunks::load_post_detail(&store, &api, &id, &Relevance::always()).await {
                DetailLoad::Loaded(post) => {
                    println!("{}", post.title);
                    if let Some(author) = &post.author {
                        println!("by {author}");
                    }
                    if let Some(url) = &post.image_url {
                        println!("image: {url}");
                    }
                    println!();
                    println!("{}", post.content);
                }
                DetailLoad::Failed(message) => bail!(message),
                DetailLoad::Dropped => {}
            }
        }
        PostsCmd::Create { fields } => {
            let image = fields.image();
            let payload = PostPayload {
                title: fields.title.unwrap_or_default(),
                content: fields.content.unwrap_or_default(),
                author: fields.author,
                image_url: fields.image_url,
            };
            match thunks::create_post(&store, &api, session, payload, image.as_ref()).await? {
                Some(post) => println!("Created post {}", post.id),
                None => bail!(last_error(&store).await),
            }
        }
        PostsCmd::Update { id, fields } => {
            let image = fields.image();
            let patch = PostPatch {
                title: fields.title,
                content: fields.content,
                author: fields.author,
                image_url: fields.image_url,
            };
            if patch.is_empty() {
                bail!("nothing to update; pass at least one field");
            }
            let id = PostId::parse(&id);
            match thunks::update_post(&store, &api, session, &id, patch, image.as_ref()).await? {
                Some(post) => println!("Updated post {}", post.id),
                None => bail!(last_error(&store).await),
            }
        }
        PostsCmd::Delete { id } => {
            let id = PostId::parse(&id);
            if !thunks::delete_post(&store, &api, session, &id).await? {
                bail!(last_error(&store).await);
            }
            println!("Deleted post {id}");
        }
    }
    Ok(())
}

#[cfg(feature = "remote")]
async fn last_error(store: &SharedStore) -> String {
    store
        .read(|s| s.posts().error().map(str::to_string))
        .await
        .unwrap_or_else(|| "request failed".to_string())
}

fn cmd_export(config: &Config, session: &Session, dataset: Dataset, path: PathBuf) -> Result<()> {
    access::require(session, Capability::ImportExport)?;
    let store = open_store(config)?;

    let rows = match dataset {
        Dataset::Students => exchange::export_students_file(store.students(), &path)?,
        Dataset::Users => exchange::export_users_file(store.users(), &path)?,
    };
    println!("Exported {rows} rows to {}", path.display());
    Ok(())
}

fn cmd_import(config: &Config, session: &Session, dataset: Dataset, path: PathBuf) -> Result<()> {
    access::require(session, Capability::ImportExport)?;
    let mut store = open_store(config)?;

    match dataset {
        Dataset::Students => {
            let state = exchange::import_students_file(&path)
                .with_context(|| format!("failed to import {}", path.display()))?;
            let count = state.len();
            apply(&mut store, session, StudentsAction::ReplaceAll(state), String::new)?;
            println!("Imported {count} students");
        }
        Dataset::Users => {
            let state = exchange::import_users_file(&path)
                .with_context(|| format!("failed to import {}", path.display()))?;
            let count = state.len();
            apply(&mut store, session, UsersAction::ReplaceAll(state), String::new)?;
            println!("Imported {count} users");
        }
    }
    Ok(())
}

fn cmd_config(config: &Config) -> Result<()> {
    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

fn cmd_whoami(session: &Session) -> Result<()> {
    println!("Role: {}", session.role);
    println!();
    for capability in capabilities_for(session.role) {
        println!("  {:<14} {}", capability.as_str(), capability.description());
    }
    Ok(())
}
