use clap::{Args, Parser, Subcommand};
use serde_json::{json, Map, Value};

use crate::api::{self, BatchOptions, StudentFilter, StudentSort};
use crate::batch::DEFAULT_CONCURRENCY;
use crate::client::HttpBackend;
use crate::error::Result;
use crate::runtime;
use crate::session::{LocalFsStore, SessionStore, DEFAULT_BASE_URL};
use crate::types::{ApiResponse, BatchReport, Progress};

#[derive(Parser)]
#[command(name = "deptctl", version, about = "Department admin console (JSON only)")]
pub struct Cli {
    /// Backend base URL (overrides the stored one)
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in as the HOD (password read from stdin); stores the token locally
    Login { email: String },
    /// Forget the stored session
    Logout,
    /// Show the stored session
    Whoami,
    #[command(subcommand)]
    Student(StudentCmd),
    #[command(subcommand)]
    Professor(ProfessorCmd),
    #[command(subcommand)]
    Class(ClassCmd),
    /// Show recent activity log entries (most recent first)
    Log(LogArgs),
}

/* ------------ students ------------ */

#[derive(Subcommand)]
enum StudentCmd {
    List(StudentListArgs),
    Get { id: String },
    Create(StudentCreateArgs),
    Update(StudentUpdateArgs),
    Delete(DeleteArgs),
    /// Update many students at once (bounded concurrent requests)
    UpdateMany(UpdateManyArgs),
    /// Delete many students in one bulk call
    DeleteMany(IdListArgs),
}

#[derive(Args)]
struct StudentListArgs {
    #[arg(long)]
    semester: Option<u32>,
    #[arg(long)]
    division: Option<String>,
    /// Case-insensitive name substring
    #[arg(long)]
    name: Option<String>,
    /// Sort key: name | semester
    #[arg(long, value_parser = parse_sort)]
    sort: Option<StudentSort>,
}

#[derive(Args)]
struct StudentCreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long = "registration-no")]
    registration_no: Option<String>,
    #[arg(long)]
    semester: Option<u32>,
    #[arg(long)]
    division: Option<String>,
}

#[derive(Args)]
struct StudentUpdateArgs {
    id: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long = "registration-no")]
    registration_no: Option<String>,
    #[arg(long)]
    semester: Option<u32>,
    #[arg(long)]
    division: Option<String>,
}

#[derive(Args)]
struct DeleteArgs {
    id: String,
    #[arg(long = "yes")]
    yes: bool,
}

#[derive(Args)]
struct UpdateManyArgs {
    /// Comma-separated student ids
    #[arg(long, value_delimiter = ',')]
    ids: Vec<String>,
    /// New semester (numeric)
    #[arg(long)]
    semester: Option<String>,
    /// New division
    #[arg(long)]
    division: Option<String>,
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,
}

#[derive(Args)]
struct IdListArgs {
    /// Comma-separated ids
    #[arg(long, value_delimiter = ',')]
    ids: Vec<String>,
    #[arg(long = "yes")]
    yes: bool,
}

/* ------------ professors ------------ */

#[derive(Subcommand)]
enum ProfessorCmd {
    List,
    Get { id: String },
    Create(ProfessorCreateArgs),
    Update(ProfessorUpdateArgs),
    Delete(DeleteArgs),
}

#[derive(Args)]
struct ProfessorCreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    department: Option<String>,
    #[arg(long)]
    subject: Option<String>,
}

#[derive(Args)]
struct ProfessorUpdateArgs {
    id: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    department: Option<String>,
    #[arg(long)]
    subject: Option<String>,
}

/* ------------ classes ------------ */

#[derive(Subcommand)]
enum ClassCmd {
    List,
    Get { id: String },
    Create(ClassCreateArgs),
    Update(ClassUpdateArgs),
    Delete(DeleteArgs),
    /// Put a professor in charge of a class
    Assign { class_id: String, professor_id: String },
    /// Add students to a class
    AddStudents(ClassStudentsArgs),
    /// Remove students from a class in one bulk call
    RemoveStudents(ClassStudentsRemoveArgs),
}

#[derive(Args)]
struct ClassCreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    semester: Option<u32>,
    #[arg(long)]
    division: Option<String>,
}

#[derive(Args)]
struct ClassUpdateArgs {
    id: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    semester: Option<u32>,
    #[arg(long)]
    division: Option<String>,
}

#[derive(Args)]
struct ClassStudentsArgs {
    class_id: String,
    /// Comma-separated student ids
    #[arg(long, value_delimiter = ',')]
    ids: Vec<String>,
}

#[derive(Args)]
struct ClassStudentsRemoveArgs {
    class_id: String,
    /// Comma-separated student ids
    #[arg(long, value_delimiter = ',')]
    ids: Vec<String>,
    #[arg(long = "yes")]
    yes: bool,
}

#[derive(Args)]
struct LogArgs {
    #[arg(long)]
    errors: bool,
    /// Scope filter: student | professor | class | hod
    #[arg(long)]
    entity: Option<String>,
}

fn parse_sort(s: &str) -> std::result::Result<StudentSort, String> {
    match s {
        "name" => Ok(StudentSort::Name),
        "semester" => Ok(StudentSort::Semester),
        other => Err(format!("unknown sort key: {other} (use name|semester)")),
    }
}

pub fn run() {
    let cli = Cli::parse();
    let store = LocalFsStore::new().unwrap();

    let base_url = cli
        .base_url
        .clone()
        .or_else(|| store.base_url().ok().flatten())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let token = store.session().ok().flatten().map(|s| s.token);
    let backend = match HttpBackend::new(&base_url, token) {
        Ok(b) => b,
        Err(e) => return print_json(ApiResponse::<()>::err(e.to_string())),
    };

    match cli.cmd {
        Command::Login { email } => {
            use std::io::BufRead;
            let mut password = String::new();
            std::io::stdin().lock().read_line(&mut password).unwrap();
            let password = password.trim_end().to_string();
            // Remember an explicitly chosen backend across commands.
            if cli.base_url.is_some() {
                let _ = store.set_base_url(&base_url);
            }
            finish(runtime::block_on(api::login(
                &backend, &store, &email, &password,
            )));
        }
        Command::Logout => finish(api::logout(&store).map(|_| json!({ "logged_out": true }))),
        Command::Whoami => finish(api::whoami(&store)),
        Command::Student(sc) => student_cmd(&backend, sc),
        Command::Professor(pc) => professor_cmd(&backend, pc),
        Command::Class(cc) => class_cmd(&backend, cc),
        Command::Log(args) => {
            let logger = crate::log::ActivityLogger::new().unwrap();
            finish(logger.read_logs(args.entity.as_deref(), args.errors));
        }
    }
}

fn student_cmd(backend: &HttpBackend, sc: StudentCmd) {
    match sc {
        StudentCmd::List(args) => {
            let filter = StudentFilter {
                semester: args.semester,
                division: args.division,
                name: args.name,
                sort: args.sort,
            };
            finish(runtime::block_on(api::students(backend, &filter)));
        }
        StudentCmd::Get { id } => finish(runtime::block_on(api::student(backend, &id))),
        StudentCmd::Create(args) => {
            finish(runtime::block_on(api::student_create(backend, &args.into_map())));
        }
        StudentCmd::Update(args) => {
            let (id, fields) = args.into_parts();
            finish(runtime::block_on(api::student_update(backend, &id, &fields)));
        }
        StudentCmd::Delete(DeleteArgs { id, yes }) => {
            if !yes {
                return print_json(ApiResponse::<()>::err("refusing to delete without --yes"));
            }
            finish(
                runtime::block_on(api::student_delete(backend, &id))
                    .map(|message| json!({ "deleted": id, "message": message })),
            );
        }
        StudentCmd::UpdateMany(args) => {
            let ids = clean_ids(&args.ids);
            let mut updates = Map::new();
            if let Some(semester) = args.semester {
                updates.insert("semester".to_string(), Value::from(semester));
            }
            if let Some(division) = args.division {
                updates.insert("division".to_string(), Value::from(division));
            }
            let progress = stderr_progress();
            let opts = BatchOptions {
                concurrency: args.concurrency,
                on_progress: Some(&progress),
            };
            finish_batch(
                runtime::block_on(api::student_update_many(backend, &ids, &updates, opts)),
                "updated",
            );
        }
        StudentCmd::DeleteMany(args) => {
            if !args.yes {
                return print_json(ApiResponse::<()>::err("refusing to delete without --yes"));
            }
            let ids = clean_ids(&args.ids);
            let progress = stderr_progress();
            let opts = BatchOptions {
                on_progress: Some(&progress),
                ..Default::default()
            };
            finish_batch(
                runtime::block_on(api::student_delete_many(backend, &ids, opts)),
                "deleted",
            );
        }
    }
}

fn professor_cmd(backend: &HttpBackend, pc: ProfessorCmd) {
    match pc {
        ProfessorCmd::List => finish(runtime::block_on(api::professors(backend))),
        ProfessorCmd::Get { id } => finish(runtime::block_on(api::professor(backend, &id))),
        ProfessorCmd::Create(args) => {
            finish(runtime::block_on(api::professor_create(backend, &args.into_map())));
        }
        ProfessorCmd::Update(args) => {
            let (id, fields) = args.into_parts();
            finish(runtime::block_on(api::professor_update(backend, &id, &fields)));
        }
        ProfessorCmd::Delete(DeleteArgs { id, yes }) => {
            if !yes {
                return print_json(ApiResponse::<()>::err("refusing to delete without --yes"));
            }
            finish(
                runtime::block_on(api::professor_delete(backend, &id))
                    .map(|message| json!({ "deleted": id, "message": message })),
            );
        }
    }
}

fn class_cmd(backend: &HttpBackend, cc: ClassCmd) {
    match cc {
        ClassCmd::List => finish(runtime::block_on(api::classes(backend))),
        ClassCmd::Get { id } => finish(runtime::block_on(api::class(backend, &id))),
        ClassCmd::Create(args) => {
            finish(runtime::block_on(api::class_create(backend, &args.into_map())));
        }
        ClassCmd::Update(args) => {
            let (id, fields) = args.into_parts();
            finish(runtime::block_on(api::class_update(backend, &id, &fields)));
        }
        ClassCmd::Delete(DeleteArgs { id, yes }) => {
            if !yes {
                return print_json(ApiResponse::<()>::err("refusing to delete without --yes"));
            }
            finish(
                runtime::block_on(api::class_delete(backend, &id))
                    .map(|message| json!({ "deleted": id, "message": message })),
            );
        }
        ClassCmd::Assign {
            class_id,
            professor_id,
        } => finish(runtime::block_on(api::class_assign_professor(
            backend,
            &class_id,
            &professor_id,
        ))),
        ClassCmd::AddStudents(args) => {
            let ids = clean_ids(&args.ids);
            finish(runtime::block_on(api::class_add_students(
                backend,
                &args.class_id,
                &ids,
            )));
        }
        ClassCmd::RemoveStudents(args) => {
            if !args.yes {
                return print_json(ApiResponse::<()>::err("refusing to remove without --yes"));
            }
            let ids = clean_ids(&args.ids);
            let progress = stderr_progress();
            let opts = BatchOptions {
                on_progress: Some(&progress),
                ..Default::default()
            };
            finish_batch(
                runtime::block_on(api::class_remove_students(
                    backend,
                    &args.class_id,
                    &ids,
                    opts,
                )),
                "removed",
            );
        }
    }
}

/* ------------ field flag -> payload plumbing ------------ */

impl StudentCreateArgs {
    fn into_map(self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("name".to_string(), Value::from(self.name));
        map.insert("email".to_string(), Value::from(self.email));
        if let Some(r) = self.registration_no {
            map.insert("registrationNo".to_string(), Value::from(r));
        }
        if let Some(s) = self.semester {
            map.insert("semester".to_string(), Value::from(s));
        }
        if let Some(d) = self.division {
            map.insert("division".to_string(), Value::from(d));
        }
        map
    }
}

impl StudentUpdateArgs {
    fn into_parts(self) -> (String, Map<String, Value>) {
        let StudentUpdateArgs {
            id,
            name,
            email,
            registration_no,
            semester,
            division,
        } = self;
        let mut map = Map::new();
        if let Some(n) = name {
            map.insert("name".to_string(), Value::from(n));
        }
        if let Some(e) = email {
            map.insert("email".to_string(), Value::from(e));
        }
        if let Some(r) = registration_no {
            map.insert("registrationNo".to_string(), Value::from(r));
        }
        if let Some(s) = semester {
            map.insert("semester".to_string(), Value::from(s));
        }
        if let Some(d) = division {
            map.insert("division".to_string(), Value::from(d));
        }
        (id, map)
    }
}

impl ProfessorCreateArgs {
    fn into_map(self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("name".to_string(), Value::from(self.name));
        map.insert("email".to_string(), Value::from(self.email));
        if let Some(d) = self.department {
            map.insert("department".to_string(), Value::from(d));
        }
        if let Some(s) = self.subject {
            map.insert("subject".to_string(), Value::from(s));
        }
        map
    }
}

impl ProfessorUpdateArgs {
    fn into_parts(self) -> (String, Map<String, Value>) {
        let ProfessorUpdateArgs {
            id,
            name,
            email,
            department,
            subject,
        } = self;
        let mut map = Map::new();
        if let Some(n) = name {
            map.insert("name".to_string(), Value::from(n));
        }
        if let Some(e) = email {
            map.insert("email".to_string(), Value::from(e));
        }
        if let Some(d) = department {
            map.insert("department".to_string(), Value::from(d));
        }
        if let Some(s) = subject {
            map.insert("subject".to_string(), Value::from(s));
        }
        (id, map)
    }
}

impl ClassCreateArgs {
    fn into_map(self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("name".to_string(), Value::from(self.name));
        if let Some(s) = self.semester {
            map.insert("semester".to_string(), Value::from(s));
        }
        if let Some(d) = self.division {
            map.insert("division".to_string(), Value::from(d));
        }
        map
    }
}

impl ClassUpdateArgs {
    fn into_parts(self) -> (String, Map<String, Value>) {
        let ClassUpdateArgs {
            id,
            name,
            semester,
            division,
        } = self;
        let mut map = Map::new();
        if let Some(n) = name {
            map.insert("name".to_string(), Value::from(n));
        }
        if let Some(s) = semester {
            map.insert("semester".to_string(), Value::from(s));
        }
        if let Some(d) = division {
            map.insert("division".to_string(), Value::from(d));
        }
        (id, map)
    }
}

/* ------------ output ------------ */

fn clean_ids(raw: &[String]) -> Vec<String> {
    raw.iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn stderr_progress() -> impl Fn(Progress) + Send + Sync {
    |p: Progress| eprintln!("{}/{}", p.done, p.total)
}

fn finish_batch(res: Result<BatchReport>, verb: &str) {
    match res {
        Ok(report) => {
            let notice = if report.is_full_success() {
                format!("{verb} {} of {}", report.success.len(), report.total())
            } else {
                format!("{} of {} failed", report.failed.len(), report.total())
            };
            print_json(ApiResponse::ok(json!({
                "notice": notice,
                "succeeded": report.success.len(),
                "failed": report.failed.len(),
                "failures": report.failed,
            })));
        }
        Err(e) => print_json(ApiResponse::<()>::err(e.to_string())),
    }
}

fn finish<T: serde::Serialize>(res: Result<T>) {
    match res {
        Ok(v) => print_json(ApiResponse::ok(v)),
        Err(e) => print_json(ApiResponse::<()>::err(e.to_string())),
    }
}

fn print_json<T: serde::Serialize>(val: T) {
    // pretty JSON output
    println!("{}", serde_json::to_string_pretty(&val).unwrap());
}
