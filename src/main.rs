use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod canvas;
mod client;
mod config;
mod error;
mod export;
mod models;
mod normalize;
mod pipeline;
mod report;
mod resolve;

use client::CanvasClient;
use config::{CanvasConfig, ExportTarget};

#[derive(Parser)]
#[command(name = "canvas-peer-review-export")]
#[command(
    about = "Export Canvas peer-review assessments as reconciled CSV tables",
    long_about = None
)]
struct Cli {
    /// Canvas instance root
    #[arg(long, env = "CANVAS_BASE_URL", default_value = "https://canvas.ualberta.ca")]
    base_url: String,
    /// Bearer token for the Canvas API
    #[arg(long, env = "CANVAS_ACCESS_TOKEN", hide_env_values = true)]
    access_token: String,
    #[arg(long, env = "CANVAS_COURSE_ID", default_value_t = 28424)]
    course_id: i64,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TargetArgs {
    #[arg(long, default_value_t = 646756)]
    assignment_id: i64,
    #[arg(long, default_value_t = 9732)]
    rubric_id: i64,
    #[arg(long, default_value_t = 21951)]
    rubric_association_id: i64,
}

#[derive(Subcommand)]
enum Commands {
    /// Write users.csv, submissions.csv and assessments.csv
    Export {
        #[command(flatten)]
        target: TargetArgs,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Summarize the peer reviews of one rubric association as markdown
    Summary {
        #[command(flatten)]
        target: TargetArgs,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List the rubrics defined in the course
    Rubrics,
    /// List the peer-review pairings of an assignment
    PeerReviews {
        #[arg(long, default_value_t = 646756)]
        assignment_id: i64,
    },
    /// Show one course member
    User {
        #[arg(long, default_value_t = 121189)]
        user_id: i64,
    },
    /// List a user's assignments in the course
    Assignments {
        #[arg(long, default_value_t = 121189)]
        user_id: i64,
    },
}

impl TargetArgs {
    fn into_target(self, course_id: i64) -> ExportTarget {
        ExportTarget {
            course_id,
            assignment_id: self.assignment_id,
            rubric_id: self.rubric_id,
            rubric_association_id: self.rubric_association_id,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let course_id = cli.course_id;
    let client = CanvasClient::new(CanvasConfig::new(cli.base_url, cli.access_token))?;
    let config = client.config();

    match cli.command {
        Commands::Export { target, out_dir } => {
            let target = target.into_target(course_id);
            let tables = pipeline::build_tables(&client, config, &target).await?;
            let written = export::write_tables(&out_dir, &tables)?;
            for path in written {
                info!(path = %path.display(), "table written");
            }
            println!(
                "Exported {} users, {} submissions, {} assessments to {}.",
                tables.users.len(),
                tables.submissions.len(),
                tables.assessments.len(),
                out_dir.display()
            );
        }
        Commands::Summary { target, out } => {
            let target = target.into_target(course_id);
            let tables = pipeline::build_tables(&client, config, &target).await?;
            let report = report::build_report(&target, &tables);
            match out {
                Some(path) => {
                    std::fs::write(&path, report)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Summary written to {}.", path.display());
                }
                None => print!("{report}"),
            }
        }
        Commands::Rubrics => {
            let rubrics = canvas::list_rubrics(&client, config, course_id).await?;
            if rubrics.is_empty() {
                println!("No rubrics found in course {course_id}.");
                return Ok(());
            }
            println!("Rubrics in course {course_id}:");
            for rubric in rubrics {
                match rubric.points_possible {
                    Some(points) => {
                        println!("- {} {} ({} points)", rubric.id, rubric.title, points)
                    }
                    None => println!("- {} {}", rubric.id, rubric.title),
                }
            }
        }
        Commands::PeerReviews { assignment_id } => {
            let reviews =
                canvas::list_peer_reviews(&client, config, course_id, assignment_id).await?;
            println!(
                "Found {} peer reviews for assignment {assignment_id} in course {course_id}.",
                reviews.len()
            );
            for review in reviews {
                println!(
                    "- assessor {} reviews user {} ({} {}, {})",
                    review.assessor_id,
                    review.user_id,
                    review.asset_type,
                    review.asset_id,
                    review.workflow_state
                );
            }
        }
        Commands::User { user_id } => {
            match canvas::get_user_in_course(&client, config, course_id, user_id).await? {
                Some(user) => println!(
                    "{} {} (student {}, {})",
                    user.id, user.name, user.student_id, user.email
                ),
                None => println!("User {user_id} is not in course {course_id}."),
            }
        }
        Commands::Assignments { user_id } => {
            let assignments =
                canvas::list_user_assignments(&client, config, course_id, user_id).await?;
            println!("Found {} assignments for user {user_id}.", assignments.len());
            for assignment in assignments {
                match assignment.due_at {
                    Some(due_at) => println!(
                        "- {} {} (due {})",
                        assignment.id,
                        assignment.name,
                        normalize::display_time(due_at)
                    ),
                    None => println!("- {} {}", assignment.id, assignment.name),
                }
            }
        }
    }

    Ok(())
}
