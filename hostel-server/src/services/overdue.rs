//! 出门逾期巡检
//!
//! 周期任务和 `POST /api/outpass/check-overdue` 共用同一个入口：
//! 对 `checked_out` 的记录逐条调用 `check_overdue_status`，写回成功的
//! 再广播 `outpass/overdue` 并通知申请人。

use std::time::Duration;

use shared::message::NotificationPayload;
use shared::models::{OutpassRequest, OverdueCheckResult, SYSTEM_ACTOR};
use shared::util::now_millis;
use tokio_util::sync::CancellationToken;

use crate::core::ServerState;
use crate::db::repository::outpass;
use crate::utils::AppResult;
use crate::utils::time::local_now;

/// Scan checked-out passes, flip the late ones to `overdue` and publish each mark
pub async fn run_overdue_check(state: &ServerState, actor: i64) -> AppResult<OverdueCheckResult> {
    let now_local = local_now(state.config.timezone);
    let now = now_millis();

    let candidates = outpass::find_checked_out(&state.pool).await?;
    let mut result = OverdueCheckResult {
        checked: candidates.len(),
        marked_overdue: Vec::new(),
    };

    for mut request in candidates {
        let expected = request.updated_at;
        if !request.check_overdue_status(now_local, actor, now)? {
            continue;
        }
        if !outpass::save(&state.pool, &mut request, expected).await? {
            // 读取之后已被签入或改动，留给下一轮
            tracing::debug!(outpass_id = request.id, "Outpass changed during sweep, skipped");
            continue;
        }
        publish_overdue(state, &request).await;
        result.marked_overdue.push(request.id);
    }

    if !result.marked_overdue.is_empty() {
        tracing::info!(
            checked = result.checked,
            marked = result.marked_overdue.len(),
            "Outpasses marked overdue"
        );
    }
    Ok(result)
}

async fn publish_overdue(state: &ServerState, request: &OutpassRequest) {
    state
        .broadcast_sync("outpass", "overdue", &request.id.to_string(), Some(request))
        .await;
    state.notify(
        request.requested_by,
        NotificationPayload::new(
            format!("Outpass to {}", request.destination),
            format!(
                "You were due back by {} {}, please report to the gate",
                request.in_date, request.in_time
            ),
        )
        .with_reference(request.id.to_string()),
    );
}

/// Periodic sweep until `shutdown` fires; returns how many passes it marked
pub async fn run_overdue_task(
    state: ServerState,
    interval: Duration,
    shutdown: CancellationToken,
) -> usize {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut marked = 0;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => match run_overdue_check(&state, SYSTEM_ACTOR).await {
                Ok(result) => marked += result.marked_overdue.len(),
                Err(e) => tracing::error!(error = %e, "Overdue check failed"),
            },
        }
    }
    marked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, NaiveDate};
    use shared::message::{EventType, SyncPayload};
    use shared::models::{
        EmergencyContact, OutpassCreate, OutpassStatus, OutpassType, TransportMode,
    };

    use crate::core::Config;
    use crate::db::DbService;

    async fn state() -> ServerState {
        ServerState::new(Config::for_tests(), DbService::memory().await.unwrap())
    }

    fn checked_out(id: i64, in_date: NaiveDate) -> OutpassRequest {
        let mut request = OutpassRequest::new(
            id,
            OutpassCreate {
                reason: "Weekend at home".into(),
                outpass_type: OutpassType::Home,
                out_date: in_date - ChronoDuration::days(2),
                out_time: "08:00".into(),
                in_date,
                in_time: "20:00".into(),
                destination: "Nashik".into(),
                contact_number: "9876543210".into(),
                emergency_contact: EmergencyContact {
                    name: "Parent".into(),
                    phone: "9876543211".into(),
                    relation: "mother".into(),
                },
                transport_mode: TransportMode::Bus,
                parent_approval_required: Some(false),
                documents: vec![],
                rules_acknowledged: true,
            },
            10,
            0,
        )
        .unwrap();
        request.review(true, 2, None, 1).unwrap();
        request.check_out(3, None, 2).unwrap();
        request
    }

    #[tokio::test]
    async fn test_only_late_passes_are_marked() {
        let state = state().await;
        let today = crate::utils::time::today(state.config.timezone);

        outpass::insert(&state.pool, &checked_out(1, today - ChronoDuration::days(3)))
            .await
            .unwrap();
        outpass::insert(&state.pool, &checked_out(2, today + ChronoDuration::days(3)))
            .await
            .unwrap();

        let result = run_overdue_check(&state, SYSTEM_ACTOR).await.unwrap();
        assert_eq!(result.checked, 2);
        assert_eq!(result.marked_overdue, vec![1]);

        let late = outpass::find_by_id(&state.pool, 1).await.unwrap().unwrap();
        assert_eq!(late.status, OutpassStatus::Overdue);
        assert_eq!(late.status_history.last().unwrap().changed_by, SYSTEM_ACTOR);

        // 第二次巡检不会重复标记
        let again = run_overdue_check(&state, SYSTEM_ACTOR).await.unwrap();
        assert_eq!(again.checked, 1);
        assert!(again.marked_overdue.is_empty());
    }

    #[tokio::test]
    async fn test_sweep_publishes_sync_and_notifies_requester() {
        let state = state().await;
        let today = crate::utils::time::today(state.config.timezone);
        outpass::insert(&state.pool, &checked_out(1, today - ChronoDuration::days(1)))
            .await
            .unwrap();
        let mut rx = state.bus.subscribe();

        run_overdue_check(&state, SYSTEM_ACTOR).await.unwrap();

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.event_type, EventType::Sync);
        let payload: SyncPayload = msg.parse_payload().unwrap();
        assert_eq!(payload.resource, "outpass");
        assert_eq!(payload.action, "overdue");
        assert_eq!(payload.id, "1");
        assert_eq!(payload.data.unwrap()["status"], "overdue");

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.event_type, EventType::Notification);
        assert_eq!(msg.target.as_deref(), Some("10"));
    }

    #[tokio::test]
    async fn test_sweep_skips_pass_checked_in_after_it_was_read() {
        let state = state().await;
        let today = crate::utils::time::today(state.config.timezone);
        outpass::insert(&state.pool, &checked_out(1, today - ChronoDuration::days(1)))
            .await
            .unwrap();

        // 巡检读到的旧副本
        let mut stale = outpass::find_checked_out(&state.pool).await.unwrap().remove(0);
        let stale_expected = stale.updated_at;

        let mut fresh = outpass::find_by_id(&state.pool, 1).await.unwrap().unwrap();
        let expected = fresh.updated_at;
        fresh.check_in(3, None, now_millis()).unwrap();
        assert!(outpass::save(&state.pool, &mut fresh, expected).await.unwrap());

        let now_local = local_now(state.config.timezone);
        assert!(stale.check_overdue_status(now_local, SYSTEM_ACTOR, now_millis()).unwrap());
        assert!(!outpass::save(&state.pool, &mut stale, stale_expected).await.unwrap());

        let stored = outpass::find_by_id(&state.pool, 1).await.unwrap().unwrap();
        assert_eq!(stored.status, OutpassStatus::Returned);
        assert_eq!(stored.checked_in_by, Some(3));

        // 已签入的记录不再是巡检候选
        let result = run_overdue_check(&state, SYSTEM_ACTOR).await.unwrap();
        assert_eq!(result.checked, 0);
    }

    #[tokio::test]
    async fn test_task_sweeps_on_first_tick_and_stops() {
        let state = state().await;
        let today = crate::utils::time::today(state.config.timezone);
        outpass::insert(&state.pool, &checked_out(1, today - ChronoDuration::days(1)))
            .await
            .unwrap();

        let token = CancellationToken::new();
        let handle = tokio::spawn(run_overdue_task(
            state.clone(),
            Duration::from_secs(3600),
            token.clone(),
        ));

        for _ in 0..50 {
            let stored = outpass::find_by_id(&state.pool, 1).await.unwrap().unwrap();
            if stored.status == OutpassStatus::Overdue {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        token.cancel();
        assert_eq!(handle.await.unwrap(), 1);
    }
}
