use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

use work_schedule_maker::config::{TemplateConfig, TemplateLayout, UserConfig, UserProfile};
use work_schedule_maker::pipeline::{SchedulePipeline, ScheduleRequest};
use work_schedule_maker::store::{FsObjectStore, ObjectStore, PgWorkDataStore};

#[derive(Parser)]
#[command(name = "work-schedule-maker")]
#[command(about = "Attendance export to monthly work schedule pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the work data schema
    InitDb,
    /// Store a schedule template in the object store
    PutTemplate {
        #[arg(long)]
        file: PathBuf,
    },
    /// Ingest a raw attendance export and persist its work records
    Ingest {
        #[arg(long)]
        file: PathBuf,
    },
    /// Render the work schedule for one employee and month
    Render {
        #[arg(long)]
        month: String,
        #[arg(long)]
        user_config: PathBuf,
        #[arg(long)]
        template_config: PathBuf,
    },
}

fn object_name(file: &Path) -> anyhow::Result<&str> {
    file.file_name()
        .and_then(|name| name.to_str())
        .context("file path has no usable name")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must point at the work data Postgres instance")?;
    let data_dir =
        std::env::var("DATA_DIR").context("DATA_DIR must point at the object store root")?;
    let bucket_name =
        std::env::var("BUCKET_NAME").unwrap_or_else(|_| "workforce".to_string());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    let objects = Arc::new(FsObjectStore::new(&data_dir));
    let work_data = Arc::new(PgWorkDataStore::new(pool.clone()));
    let pipeline = SchedulePipeline::new(objects.clone(), work_data, &bucket_name);

    match cli.command {
        Commands::InitDb => {
            PgWorkDataStore::init(&pool).await?;
            println!("Schema ready.");
        }
        Commands::PutTemplate { file } => {
            let body = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let name = object_name(&file)?;
            objects
                .put(&bucket_name, &format!("template/{name}"), &body)
                .await?;
            println!("Template stored as template/{name}.");
        }
        Commands::Ingest { file } => {
            let body = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let name = object_name(&file)?;
            objects
                .put(&bucket_name, &format!("raw/{name}"), &body)
                .await?;
            let outcome = pipeline.ingest_export(name).await?;
            println!(
                "Ingested work data for {} covering {}.",
                outcome.user_id,
                outcome.work_months.join(", ")
            );
        }
        Commands::Render {
            month,
            user_config,
            template_config,
        } => {
            let user = UserConfig::from_json(
                &std::fs::read(&user_config)
                    .with_context(|| format!("failed to read {}", user_config.display()))?,
            )?;
            let template = TemplateConfig::from_json(
                &std::fs::read(&template_config)
                    .with_context(|| format!("failed to read {}", template_config.display()))?,
            )?;
            let request = ScheduleRequest {
                work_month: month,
                user: UserProfile::from_config(&user)?,
                template: TemplateLayout::from_config(&template)?,
            };
            let outcome = pipeline.build_schedule(&request).await?;
            println!(
                "Work schedule for {} written to work_schedule/{}.",
                outcome.work_month, outcome.object_name
            );
        }
    }

    Ok(())
}
