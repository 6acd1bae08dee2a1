use common::error::Res;
use db::{
    KeyStore, UsageLedger,
    dtos::usage::UsageScope,
    models::key::{ApiKey, ApiKeyLimits},
};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::window::EvaluationTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStatus {
    Ok,
    LimitExceeded,
    Inactive,
    Expired,
    NotFound,
}

/// Billed spend per window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct UsageTotals {
    pub daily: Decimal,
    pub monthly: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LimitExceeded {
    pub daily: bool,
    pub monthly: bool,
    pub total: bool,
    pub any: bool,
}

/// `max(0, limit - spend)` per window, `None` where no limit is set.
///
/// Reaching a limit exactly blocks the key even though the remaining
/// budget reads zero rather than negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RemainingBudget {
    pub daily: Option<Decimal>,
    pub monthly: Option<Decimal>,
    pub total: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyUsageStatus {
    pub key_id: Uuid,
    pub usage: UsageTotals,
    pub limits: ApiKeyLimits,
    pub limit_exceeded: LimitExceeded,
    pub remaining: RemainingBudget,
    pub status: KeyStatus,
}

impl KeyUsageStatus {
    fn without_usage(key_id: Uuid, limits: ApiKeyLimits, status: KeyStatus) -> Self {
        Self {
            key_id,
            usage: UsageTotals::default(),
            limits,
            limit_exceeded: LimitExceeded::default(),
            remaining: RemainingBudget::default(),
            status,
        }
    }

    /// Names of the windows whose limit is reached, e.g. `["daily", "total"]`.
    pub fn exceeded_windows(&self) -> Vec<&'static str> {
        let e = &self.limit_exceeded;
        [(e.daily, "daily"), (e.monthly, "monthly"), (e.total, "total")]
            .into_iter()
            .filter_map(|(hit, name)| hit.then_some(name))
            .collect()
    }
}

/// Usage status of a key against its limits, evaluated on the local clock.
pub async fn get_key_usage_status<S>(store: &S, key_id: Uuid) -> Res<KeyUsageStatus>
where
    S: KeyStore + UsageLedger + ?Sized,
{
    get_key_usage_status_at(store, key_id, EvaluationTime::now()).await
}

pub async fn get_key_usage_status_at<S>(
    store: &S,
    key_id: Uuid,
    at: EvaluationTime,
) -> Res<KeyUsageStatus>
where
    S: KeyStore + UsageLedger + ?Sized,
{
    match store.get_key(key_id).await? {
        Some(key) => evaluate_key(store, &key, at).await,
        None => Ok(KeyUsageStatus::without_usage(
            key_id,
            ApiKeyLimits::default(),
            KeyStatus::NotFound,
        )),
    }
}

/// Classifies an already loaded key.
///
/// Inactive and expired keys short-circuit before the ledger is read and
/// take precedence over any limit breach. Ledger errors propagate.
pub async fn evaluate_key<S>(store: &S, key: &ApiKey, at: EvaluationTime) -> Res<KeyUsageStatus>
where
    S: UsageLedger + ?Sized,
{
    let limits = key.limits();

    if !key.active {
        return Ok(KeyUsageStatus::without_usage(key.id, limits, KeyStatus::Inactive));
    }
    if key.expires.is_some_and(|expires| expires < at.now) {
        return Ok(KeyUsageStatus::without_usage(key.id, limits, KeyStatus::Expired));
    }

    let scope = UsageScope::Key(key.id);
    let (daily, monthly, total) = futures::try_join!(
        store.sum_billed_cost(scope, Some(at.day_start)),
        store.sum_billed_cost(scope, Some(at.month_start)),
        store.sum_billed_cost(scope, None),
    )?;
    let usage = UsageTotals {
        daily,
        monthly,
        total,
    };

    let reached = |spent: Decimal, limit: Option<Decimal>| limit.is_some_and(|l| spent >= l);
    let remaining = |spent: Decimal, limit: Option<Decimal>| {
        limit.map(|l| (l - spent).max(Decimal::ZERO))
    };

    let mut limit_exceeded = LimitExceeded {
        daily: reached(daily, limits.daily_usage_limit),
        monthly: reached(monthly, limits.monthly_usage_limit),
        total: reached(total, limits.total_usage_limit),
        any: false,
    };
    limit_exceeded.any = limit_exceeded.daily || limit_exceeded.monthly || limit_exceeded.total;

    let status = if limit_exceeded.any {
        KeyStatus::LimitExceeded
    } else {
        KeyStatus::Ok
    };

    Ok(KeyUsageStatus {
        key_id: key.id,
        usage,
        limits,
        limit_exceeded,
        remaining: RemainingBudget {
            daily: remaining(daily, limits.daily_usage_limit),
            monthly: remaining(monthly, limits.monthly_usage_limit),
            total: remaining(total, limits.total_usage_limit),
        },
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use db::{
        MemoryStore,
        dtos::{key::KeyCreateRequest, usage::NewUsageRecord},
    };
    use rust_decimal_macros::dec;

    fn clock() -> EvaluationTime {
        EvaluationTime::at(&Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap())
    }

    fn new_key(limits: ApiKeyLimits) -> KeyCreateRequest {
        KeyCreateRequest {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            project_id: None,
            name: "test".to_string(),
            key_hash: "hash".to_string(),
            expires: None,
            daily_usage_limit: limits.daily_usage_limit,
            monthly_usage_limit: limits.monthly_usage_limit,
            total_usage_limit: limits.total_usage_limit,
        }
    }

    async fn spend(store: &MemoryStore, key: &ApiKey, billed: Decimal, at: DateTime<Utc>) {
        store
            .append_usage(NewUsageRecord {
                key_id: key.id,
                project_id: key.project_id,
                billing_user_id: key.user_id,
                model: "test-model".to_string(),
                timestamp: at,
                tokens_input: 100,
                tokens_output: 50,
                provider_cost: billed,
                markup_amount: Decimal::ZERO,
                billed_cost: billed,
                success: true,
                cached: false,
                cache_hit: false,
                error_type: None,
            })
            .await
            .unwrap();
    }

    #[actix_web::test]
    async fn unknown_key_is_not_found() {
        let store = MemoryStore::new();
        let status = get_key_usage_status_at(&store, Uuid::new_v4(), clock())
            .await
            .unwrap();

        assert_eq!(status.status, KeyStatus::NotFound);
        assert_eq!(status.usage, UsageTotals::default());
    }

    #[actix_web::test]
    async fn inactive_key_reports_zero_usage_whatever_the_ledger_says() {
        let store = MemoryStore::new();
        let key = store.insert_key(new_key(ApiKeyLimits::default())).await.unwrap();
        spend(&store, &key, dec!(42), clock().now).await;
        store
            .update_key(
                key.id,
                db::dtos::key::KeyUpdateRequest {
                    active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let status = get_key_usage_status_at(&store, key.id, clock()).await.unwrap();

        assert_eq!(status.status, KeyStatus::Inactive);
        assert_eq!(status.usage, UsageTotals::default());
        assert!(!status.limit_exceeded.any);
    }

    #[actix_web::test]
    async fn inactive_key_never_touches_the_ledger() {
        let store = MemoryStore::new();
        let key = store.insert_key(new_key(ApiKeyLimits::default())).await.unwrap();
        let key = ApiKey {
            active: false,
            ..key
        };
        store.fail_usage_reads(true).await;

        let status = evaluate_key(&store, &key, clock()).await.unwrap();
        assert_eq!(status.status, KeyStatus::Inactive);
    }

    #[actix_web::test]
    async fn expiry_wins_over_limit_breach() {
        let store = MemoryStore::new();
        let mut request = new_key(ApiKeyLimits {
            daily_usage_limit: Some(dec!(1)),
            ..Default::default()
        });
        request.expires = Some(clock().now - Duration::minutes(1));
        let key = store.insert_key(request).await.unwrap();
        spend(&store, &key, dec!(5), clock().now).await;

        let status = get_key_usage_status_at(&store, key.id, clock()).await.unwrap();

        assert_eq!(status.status, KeyStatus::Expired);
        assert_eq!(status.usage.total, Decimal::ZERO);
    }

    #[actix_web::test]
    async fn reaching_the_daily_limit_exactly_counts_as_exceeded() {
        let store = MemoryStore::new();
        let key = store
            .insert_key(new_key(ApiKeyLimits {
                daily_usage_limit: Some(dec!(10)),
                ..Default::default()
            }))
            .await
            .unwrap();
        spend(&store, &key, dec!(4), clock().now - Duration::hours(1)).await;
        spend(&store, &key, dec!(6), clock().now - Duration::hours(2)).await;
        // yesterday does not count towards the daily window
        spend(&store, &key, dec!(50), clock().day_start - Duration::seconds(1)).await;

        let status = get_key_usage_status_at(&store, key.id, clock()).await.unwrap();

        assert_eq!(status.usage.daily, dec!(10));
        assert!(status.limit_exceeded.daily);
        assert!(status.limit_exceeded.any);
        assert_eq!(status.status, KeyStatus::LimitExceeded);
        assert_eq!(status.remaining.daily, Some(Decimal::ZERO));
        assert_eq!(status.exceeded_windows(), vec!["daily"]);
    }

    #[actix_web::test]
    async fn monthly_limit_is_summed_over_the_calendar_month() {
        let store = MemoryStore::new();
        let key = store
            .insert_key(new_key(ApiKeyLimits {
                monthly_usage_limit: Some(dec!(5.00)),
                ..Default::default()
            }))
            .await
            .unwrap();
        for days_ago in [0, 3, 7] {
            spend(&store, &key, dec!(2), clock().now - Duration::days(days_ago)).await;
        }
        // last month
        spend(&store, &key, dec!(2), clock().month_start - Duration::hours(1)).await;

        let status = get_key_usage_status_at(&store, key.id, clock()).await.unwrap();

        assert_eq!(status.usage.daily, dec!(2));
        assert_eq!(status.usage.monthly, dec!(6));
        assert_eq!(status.usage.total, dec!(8));
        assert!(status.limit_exceeded.monthly);
        assert!(!status.limit_exceeded.daily);
        assert_eq!(status.status, KeyStatus::LimitExceeded);
    }

    #[actix_web::test]
    async fn total_limit_alone_can_block() {
        let store = MemoryStore::new();
        let key = store
            .insert_key(new_key(ApiKeyLimits {
                daily_usage_limit: Some(dec!(100)),
                monthly_usage_limit: Some(dec!(100)),
                total_usage_limit: Some(dec!(3)),
            }))
            .await
            .unwrap();
        spend(&store, &key, dec!(3), clock().now - Duration::days(90)).await;

        let status = get_key_usage_status_at(&store, key.id, clock()).await.unwrap();

        assert_eq!(status.limit_exceeded.total, true);
        assert_eq!(status.limit_exceeded.daily, false);
        assert_eq!(status.limit_exceeded.monthly, false);
        assert_eq!(status.status, KeyStatus::LimitExceeded);
    }

    #[actix_web::test]
    async fn key_without_limits_is_always_ok() {
        let store = MemoryStore::new();
        let key = store.insert_key(new_key(ApiKeyLimits::default())).await.unwrap();
        spend(&store, &key, dec!(1000000), clock().now).await;

        let status = get_key_usage_status_at(&store, key.id, clock()).await.unwrap();

        assert_eq!(status.status, KeyStatus::Ok);
        assert_eq!(status.remaining, RemainingBudget::default());
    }

    #[actix_web::test]
    async fn repeated_evaluation_is_stable() {
        let store = MemoryStore::new();
        let key = store
            .insert_key(new_key(ApiKeyLimits {
                daily_usage_limit: Some(dec!(10)),
                ..Default::default()
            }))
            .await
            .unwrap();
        spend(&store, &key, dec!(3.25), clock().now).await;

        let first = get_key_usage_status_at(&store, key.id, clock()).await.unwrap();
        let second = get_key_usage_status_at(&store, key.id, clock()).await.unwrap();

        assert_eq!(first, second);
    }

    #[actix_web::test]
    async fn ledger_failures_propagate() {
        let store = MemoryStore::new();
        let key = store.insert_key(new_key(ApiKeyLimits::default())).await.unwrap();
        store.fail_usage_reads(true).await;

        assert!(get_key_usage_status_at(&store, key.id, clock()).await.is_err());
    }
}
