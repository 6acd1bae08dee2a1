use std::sync::Arc;

use common::error::Res;
use db::{
    ProjectStore, Store, UsageLedger,
    dtos::{alert::NewAlert, usage::UsageScope},
    models::alert::{Alert, BUDGET_ALERT},
};
use log::info;
use logger::{AuditAction, AuditEvent, Auditor, RequestOrigin};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    notify::{BudgetNotice, Notifiers},
    window::EvaluationTime,
};

/// Percent of the budget at which a project gets its alert.
pub const ALERT_THRESHOLD: Decimal = Decimal::from_parts(80, 0, 0, false, 0);
const CRITICAL_THRESHOLD: Decimal = Decimal::from_parts(90, 0, 0, false, 0);
/// Largest percentage reported, so ratios against tiny limits stay storable.
pub const PERCENT_CAP: Decimal = Decimal::from_parts(999_999_999, 0, 0, false, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpendBand {
    Normal,
    Warning,
    Critical,
    Exceeded,
}

/// Bands are inclusive at their lower bound and checked from the top.
pub fn classify(percent_used: Decimal) -> SpendBand {
    if percent_used >= Decimal::ONE_HUNDRED {
        SpendBand::Exceeded
    } else if percent_used >= CRITICAL_THRESHOLD {
        SpendBand::Critical
    } else if percent_used >= ALERT_THRESHOLD {
        SpendBand::Warning
    } else {
        SpendBand::Normal
    }
}

/// `None` without a limit. A zero limit counts as fully used.
pub fn percent_used(spend: Decimal, limit: Option<Decimal>) -> Option<Decimal> {
    let limit = limit?;
    if limit.is_zero() {
        return Some(Decimal::ONE_HUNDRED);
    }
    let percent = spend
        .checked_div(limit)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .unwrap_or(PERCENT_CAP);
    Some(percent.min(PERCENT_CAP))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectSpendStatus {
    pub project_id: Uuid,
    pub current_spend: Decimal,
    pub spending_limit: Option<Decimal>,
    pub percent_used: Option<Decimal>,
    pub remaining: Option<Decimal>,
    pub status: SpendBand,
}

impl ProjectSpendStatus {
    pub fn new(project_id: Uuid, current_spend: Decimal, spending_limit: Option<Decimal>) -> Self {
        let percent_used = percent_used(current_spend, spending_limit);
        ProjectSpendStatus {
            project_id,
            current_spend,
            spending_limit,
            percent_used,
            remaining: spending_limit.map(|l| (l - current_spend).max(Decimal::ZERO)),
            status: percent_used.map(classify).unwrap_or(SpendBand::Normal),
        }
    }
}

/// Current-month spend of a project against its limit, `None` for unknown projects.
pub async fn project_spend_status<S>(
    store: &S,
    project_id: Uuid,
    at: EvaluationTime,
) -> Res<Option<ProjectSpendStatus>>
where
    S: ProjectStore + UsageLedger + ?Sized,
{
    let Some(project) = store.get_project(project_id).await? else {
        return Ok(None);
    };
    let spend = store
        .sum_billed_cost(UsageScope::Project(project_id), Some(at.month_start))
        .await?;

    Ok(Some(ProjectSpendStatus::new(
        project_id,
        spend,
        project.spending_limit,
    )))
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlertOutcome {
    ProjectMissing,
    Unlimited,
    BelowThreshold(ProjectSpendStatus),
    AlreadyAlerted(ProjectSpendStatus),
    Created(Alert),
}

/// Watches project budgets and raises at most one alert per project and
/// calendar month once spend crosses [`ALERT_THRESHOLD`].
pub struct SpendMonitor {
    store: Arc<dyn Store>,
    notifiers: Notifiers,
    auditor: Arc<Auditor>,
}

impl SpendMonitor {
    pub fn new(store: Arc<dyn Store>, notifiers: Notifiers, auditor: Arc<Auditor>) -> Self {
        SpendMonitor {
            store,
            notifiers,
            auditor,
        }
    }

    pub async fn status(&self, project_id: Uuid) -> Res<Option<ProjectSpendStatus>> {
        project_spend_status(&*self.store, project_id, EvaluationTime::now()).await
    }

    pub async fn check_project(&self, project_id: Uuid) -> Res<AlertOutcome> {
        self.check_project_at(project_id, EvaluationTime::now()).await
    }

    pub async fn check_project_at(&self, project_id: Uuid, at: EvaluationTime) -> Res<AlertOutcome> {
        let Some(project) = self.store.get_project(project_id).await? else {
            return Ok(AlertOutcome::ProjectMissing);
        };
        let Some(limit) = project.spending_limit else {
            return Ok(AlertOutcome::Unlimited);
        };

        let spend = self
            .store
            .sum_billed_cost(UsageScope::Project(project_id), Some(at.month_start))
            .await?;
        let status = ProjectSpendStatus::new(project_id, spend, Some(limit));
        let percent = status.percent_used.unwrap_or_default();
        if percent < ALERT_THRESHOLD {
            return Ok(AlertOutcome::BelowThreshold(status));
        }

        if self
            .store
            .find_alert_since(project_id, BUDGET_ALERT, at.month_start)
            .await?
            .is_some()
        {
            return Ok(AlertOutcome::AlreadyAlerted(status));
        }

        let message = format!(
            "Project {} has used {}% of its monthly budget ({} of {})",
            project.name,
            percent.round_dp(2),
            spend.round_dp(6),
            limit
        );
        let inserted = self
            .store
            .insert_alert(NewAlert {
                project_id,
                alert_type: BUDGET_ALERT.to_string(),
                period: at.period,
                message: message.clone(),
                percent_used: percent,
            })
            .await?;
        // a concurrent check may have won the insert
        let Some(alert) = inserted else {
            return Ok(AlertOutcome::AlreadyAlerted(status));
        };
        info!("Budget alert raised for project {} at {}%", project_id, percent.round_dp(2));

        let notice = BudgetNotice {
            project_id,
            project_name: project.name.clone(),
            period: at.period,
            current_spend: spend,
            spending_limit: limit,
            percent_used: percent,
            message,
        };
        self.notifiers.notify_all(&notice).await;

        self.auditor
            .record(
                AuditEvent::new(AuditAction::BudgetAlertTriggered)
                    .user(project.owner_id)
                    .project(Some(project_id))
                    .metadata(json!({
                        "alert_id": alert.id,
                        "period": at.period,
                        "percent_used": percent,
                        "current_spend": spend,
                        "spending_limit": limit,
                        "band": status.status,
                    })),
                &RequestOrigin::default(),
            )
            .await;

        Ok(AlertOutcome::Created(alert))
    }
}
