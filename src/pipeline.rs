//! The two pipeline operations: ingesting an uploaded export and building
//! one employee-month schedule. Each invocation is stateless and
//! single-threaded; only collaborator calls suspend. Failures are logged
//! with context and returned to the caller, which owns retry policy.

use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::calendar::{self, YearMonth};
use crate::config::{TemplateLayout, UserProfile};
use crate::error::{Error, Result};
use crate::models::{IngestOutcome, RenderedSchedule, ScheduleOutcome};
use crate::normalize;
use crate::parse;
use crate::render;
use crate::store::{ObjectStore, WorkDataStore};

/// One month-render request with its validated configuration.
#[derive(Debug, Clone)]
pub struct ScheduleRequest {
    pub work_month: String,
    pub user: UserProfile,
    pub template: TemplateLayout,
}

pub struct SchedulePipeline {
    objects: Arc<dyn ObjectStore>,
    work_data: Arc<dyn WorkDataStore>,
    bucket_name: String,
}

impl SchedulePipeline {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        work_data: Arc<dyn WorkDataStore>,
        bucket_name: impl Into<String>,
    ) -> Self {
        Self {
            objects,
            work_data,
            bucket_name: bucket_name.into(),
        }
    }

    /// Parse and normalize an uploaded export from `raw/{file_name}` and
    /// persist its records. Returns the employee and the distinct months
    /// covered so the caller can fan out one render per month.
    pub async fn ingest_export(&self, file_name: &str) -> Result<IngestOutcome> {
        let invocation = Uuid::new_v4();
        info!(%invocation, file_name, "ingesting work data export");

        match self.ingest_inner(file_name).await {
            Ok(outcome) => {
                info!(
                    %invocation,
                    user_id = %outcome.user_id,
                    work_months = ?outcome.work_months,
                    "export ingested"
                );
                Ok(outcome)
            }
            Err(err) => {
                error!(%invocation, file_name, error = %err, "export ingestion failed");
                Err(err)
            }
        }
    }

    async fn ingest_inner(&self, file_name: &str) -> Result<IngestOutcome> {
        let raw = self
            .objects
            .get(&self.bucket_name, &format!("raw/{file_name}"))
            .await?;
        let rows = parse::parse_export(&raw)?;
        let records = normalize::normalize_records(&rows)?;
        let work_months = normalize::work_months(&records);
        let user_id = records
            .first()
            .map(|record| record.id.clone())
            .ok_or_else(|| Error::Transform("export produced no records".to_string()))?;

        self.work_data.batch_write(&records).await?;

        Ok(IngestOutcome { user_id, work_months })
    }

    /// Reconcile one employee-month against the calendar, render it onto
    /// the configured template and store the result under
    /// `work_schedule/{id}_{YYYY}_{MM}.xlsx`.
    pub async fn build_schedule(&self, request: &ScheduleRequest) -> Result<ScheduleOutcome> {
        let invocation = Uuid::new_v4();
        info!(
            %invocation,
            user_id = %request.user.id,
            work_month = %request.work_month,
            "building work schedule"
        );

        match self.build_inner(request).await {
            Ok(outcome) => {
                info!(%invocation, object_name = %outcome.object_name, "work schedule built");
                Ok(outcome)
            }
            Err(err) => {
                error!(
                    %invocation,
                    user_id = %request.user.id,
                    work_month = %request.work_month,
                    error = %err,
                    "work schedule build failed"
                );
                Err(err)
            }
        }
    }

    async fn build_inner(&self, request: &ScheduleRequest) -> Result<ScheduleOutcome> {
        let month = YearMonth::parse(&request.work_month)?;

        let stored = self
            .work_data
            .query(&request.user.id, &format!("WorkData#{month}"))
            .await?;
        let rows = calendar::reconcile_month(&month, &stored, request.user.time_sharing)?;

        let template = self
            .objects
            .get(&self.bucket_name, &format!("template/{}", request.template.name))
            .await?;
        let bytes = render::render_schedule(&template, &request.template, &request.user, &month, &rows)?;

        let schedule = RenderedSchedule {
            user_id: request.user.id.clone(),
            work_month: month.to_string(),
            object_name: format!("{}_{:04}_{:02}.xlsx", request.user.id, month.year, month.month),
            bytes,
        };
        self.objects
            .put(
                &self.bucket_name,
                &format!("work_schedule/{}", schedule.object_name),
                &schedule.bytes,
            )
            .await?;

        Ok(ScheduleOutcome {
            work_month: schedule.work_month,
            bucket_name: self.bucket_name.clone(),
            object_name: schedule.object_name,
        })
    }
}
