//! 定时清扫任务
//!
//! 三个内存表各自按 cron 表达式清扫：限流桶、过期的工作量证明挑战、离线用户。

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use application::GuardContext;
use config::SweepConfig;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::info;

/// 注册清扫任务并启动调度器，返回的调度器需在停机时调用 `shutdown`
pub async fn start(guards: Arc<GuardContext>, config: &SweepConfig) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let max_age = Duration::from_secs(config.rate_limit_max_age_secs);
    let rate_limit_guards = guards.clone();
    scheduler
        .add(Job::new_async(config.rate_limit_schedule.as_str(), move |_uuid, _l| {
            let guards = rate_limit_guards.clone();
            Box::pin(async move {
                guards.sweep_rate_limits(max_age);
            })
        })?)
        .await?;

    let pow_guards = guards.clone();
    scheduler
        .add(Job::new_async(config.pow_schedule.as_str(), move |_uuid, _l| {
            let guards = pow_guards.clone();
            Box::pin(async move {
                guards.sweep_pow();
            })
        })?)
        .await?;

    let threshold = Duration::from_secs(config.presence_threshold_secs);
    let presence_guards = guards;
    scheduler
        .add(Job::new_async(config.presence_schedule.as_str(), move |_uuid, _l| {
            let guards = presence_guards.clone();
            Box::pin(async move {
                guards.sweep_presence(threshold);
            })
        })?)
        .await?;

    scheduler.start().await?;
    info!(
        rate_limit = %config.rate_limit_schedule,
        pow = %config.pow_schedule,
        presence = %config.presence_schedule,
        "定时清扫任务已启动"
    );
    Ok(scheduler)
}
