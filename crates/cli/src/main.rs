use anyhow::Context;
use bioethics_core::{
    assess, build_consent_text,
    config::{case_data_dir_from_env_value, knowledge_base_path_from_env_value},
    export::{export_consent, export_report, export_report_markdown},
    prompts::GUIDED_QUESTIONS,
    Case, CaseForm, CaseId, CaseSession, CoreConfig, DilemmaCategory, FileCaseStore,
    KnowledgeBase, NoticeLevel, SessionServices, UserId,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "bioethics")]
#[command(about = "Bioethics case deliberation CLI")]
struct Cli {
    /// Case storage directory (defaults to BIOETHICS_DATA_DIR, then `case_data`)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Dilemma knowledge base override (defaults to BIOETHICS_KNOWLEDGE_BASE)
    #[arg(long, global = true)]
    knowledge_base: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a case form for bias without saving it
    Assess {
        /// Case form file (YAML or JSON)
        file: PathBuf,
        /// Print the assessment as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the informed consent text for a case form
    Consent {
        /// Case form file (YAML or JSON)
        file: PathBuf,
        /// Write a PDF to this directory instead of printing the text
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Assess a case form and save the report for a user
    Report {
        /// Case form file (YAML or JSON)
        file: PathBuf,
        /// Owner of the case
        #[arg(long)]
        user: String,
        /// Analyst name used when the form has none (defaults to the user id)
        #[arg(long)]
        analyst: Option<String>,
        /// Dilemma suggested by the AI, recorded on the report
        #[arg(long)]
        suggested_dilemma: Option<String>,
        /// Also print the informed consent text
        #[arg(long)]
        consent: bool,
    },
    /// List a user's saved cases
    List {
        /// Owner of the cases
        #[arg(long)]
        user: String,
    },
    /// Export a saved case as a report document
    Export {
        /// Case id (clinical history number)
        case_id: String,
        /// Owner of the case
        #[arg(long)]
        user: String,
        /// Output directory
        #[arg(long, default_value = ".")]
        out: PathBuf,
        /// Report format
        #[arg(long, value_enum, default_value_t = ExportFormat::Pdf)]
        format: ExportFormat,
        /// Also export the informed consent form as PDF
        #[arg(long)]
        consent: bool,
    },
    /// List the dilemma categories
    Dilemmas,
    /// List the guided deliberation questions
    Questions,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ExportFormat {
    Pdf,
    Markdown,
}

fn load_form(path: &Path) -> anyhow::Result<CaseForm> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading case form {}", path.display()))?;
    serde_yaml::from_str(&contents).with_context(|| format!("parsing case form {}", path.display()))
}

fn core_config(cli: &Cli) -> anyhow::Result<CoreConfig> {
    let data_dir = cli.data_dir.clone().unwrap_or_else(|| {
        case_data_dir_from_env_value(std::env::var("BIOETHICS_DATA_DIR").ok())
    });
    let knowledge_base = cli.knowledge_base.clone().or_else(|| {
        knowledge_base_path_from_env_value(std::env::var("BIOETHICS_KNOWLEDGE_BASE").ok())
    });
    Ok(CoreConfig::new(data_dir, knowledge_base)?)
}

fn session(cfg: CoreConfig, user: &str, analyst: Option<String>) -> anyhow::Result<CaseSession> {
    let knowledge_base = KnowledgeBase::load(cfg.knowledge_base_path())?;
    let services = SessionServices {
        store: Arc::new(FileCaseStore::new(Arc::new(cfg))),
        knowledge_base: Arc::new(knowledge_base),
        completer: None,
    };
    let user_id = UserId::new(user)?;
    let analyst = analyst.unwrap_or_else(|| user.to_string());
    Ok(CaseSession::new(services, user_id, analyst))
}

fn print_notices(session: &mut CaseSession) {
    for notice in session.take_notices() {
        match notice.level {
            NoticeLevel::Info => println!("{}", notice.message),
            NoticeLevel::Warning => eprintln!("Warning: {}", notice.message),
            NoticeLevel::Error => eprintln!("Error: {}", notice.message),
        }
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bioethics_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = core_config(&cli)?;

    match cli.command {
        Some(Commands::Assess { file, json }) => {
            let case = Case::from_form(&load_form(&file)?)?;
            let assessment = assess(&case.perspectives);
            if json {
                println!("{}", serde_json::to_string_pretty(&assessment)?);
            } else {
                println!("Case {}: severity {}", case.case_id, assessment.severity);
                for warning in &assessment.warnings {
                    println!("  ! {warning}");
                }
                for recommendation in &assessment.recommendations {
                    println!("  > {recommendation}");
                }
            }
        }
        Some(Commands::Consent { file, out }) => {
            let case = Case::from_form(&load_form(&file)?)?;
            let knowledge_base = KnowledgeBase::load(cfg.knowledge_base_path())?;
            let text = build_consent_text(&case, &knowledge_base);
            match out {
                Some(dir) => {
                    let path = export_consent(case.case_id.as_str(), &text, &dir)?;
                    println!("Wrote {}", path.display());
                }
                None => print!("{text}"),
            }
        }
        Some(Commands::Report {
            file,
            user,
            analyst,
            suggested_dilemma,
            consent,
        }) => {
            let form = load_form(&file)?;
            let mut session = session(cfg, &user, analyst)?;
            if let Some(suggestion) = suggested_dilemma {
                session.suggest_dilemma(suggestion);
            }
            let report = session.submit(&form, consent)?;
            println!(
                "Case {}: severity {} ({} warning(s))",
                report.case_id,
                report.assessment.severity,
                report.assessment.warnings.len()
            );
            if let Some(text) = session.consent_text() {
                print!("\n{text}");
            }
            print_notices(&mut session);
        }
        Some(Commands::List { user }) => {
            let session = session(cfg, &user, None)?;
            let cases = session.list_cases()?;
            if cases.is_empty() {
                println!("No cases found.");
            } else {
                for (case_id, report) in cases {
                    println!(
                        "ID: {}, Analysed: {}, Severity: {}, {}",
                        case_id,
                        report.analysed_at.format("%Y-%m-%d %H:%M"),
                        report.assessment.severity,
                        report.patient_summary
                    );
                }
            }
        }
        Some(Commands::Export {
            case_id,
            user,
            out,
            format,
            consent,
        }) => {
            let mut session = session(cfg, &user, None)?;
            let report = session.resume(&CaseId::new(&case_id)?)?;
            let path = match format {
                ExportFormat::Pdf => export_report(report, &out)?,
                ExportFormat::Markdown => export_report_markdown(report, &out)?,
            };
            println!("Wrote {}", path.display());
            if consent {
                let text = session.generate_consent()?.to_string();
                let path = export_consent(&case_id, &text, &out)?;
                println!("Wrote {}", path.display());
            }
        }
        Some(Commands::Dilemmas) => {
            for category in DilemmaCategory::ALL {
                println!("{:<20} {}", category.key(), category.label());
            }
        }
        Some(Commands::Questions) => {
            for (i, question) in GUIDED_QUESTIONS.iter().enumerate() {
                println!("{}. {question}", i + 1);
            }
        }
        None => {
            println!("Use --help to see available commands.");
        }
    }

    Ok(())
}
