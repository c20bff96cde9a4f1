//! hrtrack CLI - recruitment records over a local SQLite store

mod app;
mod output;

use anyhow::{Context, Result};
use app::{App, Settings};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use colored::Colorize;
use hrtrack_core::application::{
    DeleteOutcome, NewApplicant, NewInterview, NewRecruitment, NewRole, RecruitmentUpdate,
    TxContext,
};
use hrtrack_core::domain::{RecruitmentId, RecruitmentStatus};
use hrtrack_core::error::AppError;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_DB_PATH: &str = "~/.hrtrack/recruitment.db";
const DEFAULT_MAX_CONNECTIONS: &str = "5";

#[derive(Parser)]
#[command(name = "hrtrack")]
#[command(about = "Recruitment records with year-scoped ids (HR <year>/<n>)", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// SQLite database file (`:memory:` for a throwaway store)
    #[arg(long, env = "HRTRACK_DB_PATH", default_value = DEFAULT_DB_PATH)]
    db: String,

    /// Connection pool size
    #[arg(long, env = "HRTRACK_MAX_CONNECTIONS", default_value = DEFAULT_MAX_CONNECTIONS)]
    max_connections: u32,

    /// Log format: pretty | json
    #[arg(long, env = "HRTRACK_LOG_FORMAT", default_value = "pretty")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage roles
    Role {
        #[command(subcommand)]
        command: RoleCommand,
    },

    /// Manage recruitments
    Recruitment {
        #[command(subcommand)]
        command: RecruitmentCommand,
    },

    /// Manage applicants of a recruitment
    Applicant {
        #[command(subcommand)]
        command: ApplicantCommand,
    },

    /// Manage interviews
    Interview {
        #[command(subcommand)]
        command: InterviewCommand,
    },

    /// Show the last issued recruitment number per year
    Ids,
}

#[derive(Subcommand)]
enum RoleCommand {
    /// Create a role
    Add {
        #[arg(long)]
        title: String,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        department: Option<String>,
    },
}

#[derive(Subcommand)]
enum RecruitmentCommand {
    /// Open a recruitment for a role
    Create {
        /// Role ID (e.g., ROLE-1a2b3c4d)
        #[arg(long)]
        role: String,

        /// Application deadline (YYYY-MM-DD)
        #[arg(long)]
        deadline: NaiveDate,
    },

    /// Delete a recruitment with its interviews and applications
    Delete {
        /// Recruitment ID (e.g., "HR 2024/7")
        id: RecruitmentId,
    },

    /// Show a recruitment with applicants and interviews
    Show {
        id: RecruitmentId,

        /// Print JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// Change status and/or offer acceptance date
    Update {
        id: RecruitmentId,

        /// New status (e.g., "OFFER PHASE", FILLED)
        #[arg(long)]
        status: Option<RecruitmentStatus>,

        /// Offer acceptance date and time (YYYY-MM-DD HH:MM)
        #[arg(long, value_parser = parse_date_time)]
        offer_accepted: Option<NaiveDateTime>,
    },

    /// List all recruitments
    List {
        /// Only recruitments that are still running
        #[arg(long)]
        ongoing: bool,
    },
}

#[derive(Subcommand)]
enum ApplicantCommand {
    /// Register an applicant and link them to a recruitment
    Add {
        #[arg(long)]
        recruitment: RecruitmentId,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        phone: Option<String>,
    },

    /// Remove an applicant (and their interviews) from a recruitment
    Remove {
        #[arg(long)]
        recruitment: RecruitmentId,

        #[arg(long)]
        applicant: String,
    },

    /// Set an applicant's rank (0 = unranked)
    Rank {
        #[arg(long)]
        applicant: String,

        #[arg(long)]
        rank: i32,
    },

    /// Show ranked (best first) and unranked applicants of a recruitment
    Ranking {
        #[arg(long)]
        recruitment: RecruitmentId,
    },
}

#[derive(Subcommand)]
enum InterviewCommand {
    /// Schedule an interview, linking the applicant if needed
    Schedule {
        #[arg(long)]
        recruitment: RecruitmentId,

        #[arg(long)]
        applicant: String,

        /// Date and time (YYYY-MM-DD HH:MM)
        #[arg(long, value_parser = parse_date_time)]
        at: NaiveDateTime,

        #[arg(long)]
        location: Option<String>,

        #[arg(long)]
        interviewer: Option<String>,
    },

    /// Move an interview to a new date and time
    Reschedule {
        id: String,

        /// Date and time (YYYY-MM-DD HH:MM)
        #[arg(long, value_parser = parse_date_time)]
        at: NaiveDateTime,
    },

    /// Cancel an interview
    Cancel { id: String },
}

fn parse_date_time(s: &str) -> std::result::Result<NaiveDateTime, String> {
    ["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .ok_or_else(|| format!("expected YYYY-MM-DD HH:MM, got {:?}", s))
}

fn init_logging(log_format: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("hrtrack=warn"))
        .context("Failed to create env filter")?;

    match log_format {
        "json" => {
            // Machine-readable structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_format)?;
    info!("hrtrack v{} starting...", hrtrack_core::VERSION);

    let app = App::bootstrap(&Settings {
        db_path: cli.db.clone(),
        max_connections: cli.max_connections,
    })
    .await?;

    let result = run(&app, cli.command).await;
    app.shutdown().await;
    result
}

async fn run(app: &App, command: Commands) -> Result<()> {
    let service = &app.service;
    // One context per command invocation
    let mut ctx = TxContext::new();

    match command {
        Commands::Role {
            command:
                RoleCommand::Add {
                    title,
                    description,
                    department,
                },
        } => {
            let role = service
                .create_role(
                    &mut ctx,
                    NewRole {
                        title,
                        description,
                        department,
                    },
                )
                .await?;

            println!("{}", "✓ Role created".green().bold());
            println!();
            println!("{}", output::roles_table(vec![role]));
        }

        Commands::Recruitment { command } => match command {
            RecruitmentCommand::Create { role, deadline } => {
                let recruitment = service
                    .create_recruitment(
                        &mut ctx,
                        NewRecruitment {
                            role_id: role,
                            application_deadline: deadline,
                        },
                    )
                    .await?;

                println!(
                    "{}",
                    format!("✓ Recruitment {} created", recruitment.id).green().bold()
                );
                println!();
                println!("{}", output::recruitments_table(vec![recruitment]));
            }

            RecruitmentCommand::Delete { id } => {
                match service.delete_recruitment(&mut ctx, id).await? {
                    DeleteOutcome::Deleted(summary) => {
                        println!(
                            "{}",
                            format!(
                                "✓ Recruitment {} deleted ({} interviews, {} applications)",
                                id, summary.interviews, summary.applications
                            )
                            .green()
                            .bold()
                        );
                    }
                    DeleteOutcome::NotFound => {
                        println!("{}", format!("Recruitment {} not found", id).yellow());
                    }
                }
            }

            RecruitmentCommand::Show { id, json } => {
                let details = service.recruitment_details(&id).await?;

                if json {
                    let value = serde_json::json!({
                        "recruitment": details.recruitment,
                        "applicants": details.applicants,
                        "interviews": details.interviews,
                    });
                    println!("{}", serde_json::to_string_pretty(&value)?);
                } else {
                    println!("{}", format!("Recruitment {}", id).cyan().bold());
                    println!("{}", output::recruitments_table(vec![details.recruitment]));
                    println!();
                    println!("{}", "Applicants".cyan().bold());
                    println!("{}", output::applicants_table(details.applicants));
                    println!();
                    println!("{}", "Interviews".cyan().bold());
                    println!("{}", output::interviews_table(details.interviews));
                }
            }

            RecruitmentCommand::Update {
                id,
                status,
                offer_accepted,
            } => {
                service
                    .update_recruitment(
                        &mut ctx,
                        id,
                        RecruitmentUpdate {
                            status,
                            offer_acceptance_date: offer_accepted,
                        },
                    )
                    .await?;

                println!("{}", format!("✓ Recruitment {} updated", id).green().bold());
            }

            RecruitmentCommand::List { ongoing } => {
                let mut recruitments = service.list_recruitments().await?;
                if ongoing {
                    recruitments.retain(|r| r.status.is_ongoing());
                }
                if recruitments.is_empty() {
                    println!("{}", "No recruitments".yellow());
                } else {
                    println!("{}", output::recruitments_table(recruitments));
                }
            }
        },

        Commands::Applicant { command } => match command {
            ApplicantCommand::Add {
                recruitment,
                first_name,
                last_name,
                email,
                phone,
            } => {
                // Register and link in one transaction
                let svc = service.clone();
                let applicant = service
                    .coordinator()
                    .run(&mut ctx, move |ctx| {
                        Box::pin(async move {
                            let applicant = svc
                                .register_applicant(
                                    ctx,
                                    NewApplicant {
                                        first_name,
                                        last_name,
                                        email,
                                        phone,
                                    },
                                )
                                .await?;
                            svc.add_applicant_to_recruitment(ctx, applicant.clone(), recruitment)
                                .await?;
                            Ok::<_, AppError>(applicant)
                        })
                    })
                    .await?;

                println!(
                    "{}",
                    format!("✓ Applicant {} added to {}", applicant.id, recruitment)
                        .green()
                        .bold()
                );
            }

            ApplicantCommand::Remove {
                recruitment,
                applicant,
            } => {
                let summary = service
                    .remove_applicant_from_recruitment(&mut ctx, applicant.clone(), recruitment)
                    .await?;

                if summary.link_removed {
                    println!(
                        "{}",
                        format!(
                            "✓ Applicant {} removed from {} ({} interviews deleted)",
                            applicant, recruitment, summary.interviews
                        )
                        .green()
                        .bold()
                    );
                } else {
                    println!(
                        "{}",
                        format!("Applicant {} was not linked to {}", applicant, recruitment)
                            .yellow()
                    );
                }
            }

            ApplicantCommand::Rank { applicant, rank } => {
                service
                    .update_applicant_rank(&mut ctx, applicant.clone(), rank)
                    .await?;
                println!(
                    "{}",
                    format!("✓ Applicant {} ranked {}", applicant, rank).green().bold()
                );
            }

            ApplicantCommand::Ranking { recruitment } => {
                let ranked = service.ranked_applicants(&recruitment).await?;
                let unranked = service.unranked_applicants(&recruitment).await?;

                println!("{}", "Ranked".cyan().bold());
                println!("{}", output::applicants_table(ranked));
                println!();
                println!("{}", "Unranked".cyan().bold());
                println!("{}", output::applicants_table(unranked));
            }
        },

        Commands::Interview { command } => match command {
            InterviewCommand::Schedule {
                recruitment,
                applicant,
                at,
                location,
                interviewer,
            } => {
                let interview = service
                    .schedule_interview(
                        &mut ctx,
                        NewInterview {
                            recruitment_id: recruitment,
                            applicant_id: applicant,
                            date_time: at,
                            location,
                            interviewer,
                        },
                    )
                    .await?;

                println!("{}", "✓ Interview scheduled".green().bold());
                println!();
                println!("{}", output::interviews_table(vec![interview]));
            }

            InterviewCommand::Reschedule { id, at } => {
                service.reschedule_interview(&mut ctx, id.clone(), at).await?;
                println!(
                    "{}",
                    format!("✓ Interview {} moved to {}", id, at.format("%Y-%m-%d %H:%M"))
                        .green()
                        .bold()
                );
            }

            InterviewCommand::Cancel { id } => {
                service.cancel_interview(&mut ctx, id.clone()).await?;
                println!("{}", format!("✓ Interview {} cancelled", id).green().bold());
            }
        },

        Commands::Ids => {
            if !service.allocator().is_ready() {
                println!(
                    "{}",
                    "Sequence recovery did not complete; recruitment creation is disabled"
                        .red()
                        .bold()
                );
            }
            let snapshot = service.allocator().snapshot().await?;
            if snapshot.is_empty() {
                println!("{}", "No recruitment ids issued yet".yellow());
            } else {
                println!("{}", output::sequences_table(snapshot));
            }
        }
    }

    Ok(())
}
