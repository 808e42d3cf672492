
use std::sync::Arc;

use common::{
    full_itinerary, harness, preview, test_clock, tuscan_answers, FailingStorage, GatedGateway,
    HeldStorage, ScriptedGateway,
};
use honeymoon_core::{AnswersError, GatewayError, PaymentIntent, PlannerPhase};
use honeymoon_observability::PlannerMetrics;
use honeymoon_planner::{
    FailureReason, MarkdownRenderer, PaymentMode, Planner, PlannerConfig, PlannerError,
    PlannerState, Transition,
};
use honeymoon_storage::{session_ttl, KeyValueStorage, SessionStore, SESSION_KEY};
use tokio::sync::oneshot;
use tokio::task::yield_now;

fn preview_ids(state: &PlannerState) -> Vec<String> {
    state
        .recommendations()
        .map(|recommendations| {
            recommendations
                .previews
                .iter()
                .map(|preview| preview.id.clone())
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn matched_answers_show_preview_and_save_session() {
    let gateway =
        ScriptedGateway::new().with_match(Ok(Some(vec![preview("abc", "Tuscan Retreat")])));
    let h = harness(gateway, PaymentMode::Simulated);

    let transition = h.planner.submit(tuscan_answers()).await.unwrap();

    assert_eq!(transition, Transition::Applied(PlannerPhase::Preview));
    assert_eq!(preview_ids(&h.planner.state()), vec!["abc"]);
    assert!(!h.planner.is_loading());

    let session = h.planner.sessions().load().await.expect("session saved");
    assert_eq!(session.recommended_tours.len(), 1);
    assert_eq!(session.recommended_tours, vec![preview("abc", "Tuscan Retreat")]);
    assert_eq!(session.questionnaire_answers, Some(tuscan_answers()));
    assert_eq!(session.timestamp, honeymoon_core::Clock::now(&h.clock));
    assert_eq!(h.metrics.snapshot().matches_total, 1);
}

#[tokio::test]
async fn backend_outage_shows_error_and_keeps_previous_session() {
    let gateway = ScriptedGateway::new().with_match(Err(GatewayError::Status {
        status: 503,
        body: "service unavailable".to_string(),
    }));
    let h = harness(gateway, PaymentMode::Simulated);
    h.planner
        .sessions()
        .save(&[preview("old", "Alpine Escape")], None)
        .await;

    let transition = h.planner.submit(tuscan_answers()).await.unwrap();

    assert_eq!(transition, Transition::Applied(PlannerPhase::Error));
    let state = h.planner.state();
    let failure = state.failure().expect("error state");
    assert_eq!(failure.reason, FailureReason::Gateway);
    assert!(failure.message.contains("503"));

    let session = h.planner.sessions().load().await.expect("old session kept");
    assert_eq!(session.recommended_tours[0].id, "old");
    assert_eq!(h.metrics.snapshot().gateway_failures_total, 1);
}

#[tokio::test]
async fn null_and_empty_matches_are_no_matches() {
    let gateway = ScriptedGateway::new()
        .with_match(Ok(None))
        .with_match(Ok(Some(Vec::new())));
    let h = harness(gateway, PaymentMode::Simulated);

    for _ in 0..2 {
        let transition = h.planner.submit(tuscan_answers()).await.unwrap();
        assert_eq!(transition, Transition::Applied(PlannerPhase::Error));
        assert_eq!(
            h.planner.state().failure().map(|failure| failure.reason),
            Some(FailureReason::NoMatches)
        );
        h.planner.restart();
    }

    assert_eq!(h.storage.get_item(SESSION_KEY).await.unwrap(), None);
    assert_eq!(h.metrics.snapshot().no_match_total, 2);
    assert_eq!(h.metrics.snapshot().gateway_failures_total, 0);
}

#[tokio::test]
async fn invalid_answers_never_reach_the_backend() {
    let h = harness(ScriptedGateway::new(), PaymentMode::Simulated);

    let mut answers = tuscan_answers();
    answers.duration = 0;
    let error = h.planner.submit(answers).await.unwrap_err();

    assert_eq!(
        error,
        PlannerError::InvalidAnswers(AnswersError::DurationOutOfRange(0))
    );
    assert_eq!(h.planner.phase(), PlannerPhase::Questionnaire);
    assert!(h.gateway.calls().is_empty());
}

#[tokio::test]
async fn loading_phase_blocks_other_actions() {
    let (tx, rx) = oneshot::channel();
    let h = harness(GatedGateway::new(vec![rx]), PaymentMode::Simulated);

    let submit = h.planner.submit(tuscan_answers());
    let observe = async {
        while h.planner.generation() < 1 {
            yield_now().await;
        }
        assert!(h.planner.is_loading());
        assert_eq!(h.planner.phase(), PlannerPhase::LoadingPreview);

        let error = h.planner.select("abc").await.unwrap_err();
        assert!(matches!(error, PlannerError::InvalidTransition { .. }));

        tx.send(Ok(Some(vec![preview("abc", "Tuscan Retreat")])))
            .unwrap();
    };

    let (transition, ()) = tokio::join!(submit, observe);
    assert_eq!(
        transition.unwrap(),
        Transition::Applied(PlannerPhase::Preview)
    );
    assert!(!h.planner.is_loading());
}

#[tokio::test]
async fn newer_submission_wins_when_responses_arrive_out_of_order() {
    let (first_tx, first_rx) = oneshot::channel();
    let (second_tx, second_rx) = oneshot::channel();
    let h = harness(
        GatedGateway::new(vec![first_rx, second_rx]),
        PaymentMode::Simulated,
    );

    let first = h.planner.submit(tuscan_answers());
    let second = async {
        while h.planner.generation() < 1 {
            yield_now().await;
        }
        let mut answers = tuscan_answers();
        answers.duration = 10;
        h.planner.submit(answers).await
    };
    let driver = async {
        while h.planner.generation() < 2 {
            yield_now().await;
        }
        second_tx
            .send(Ok(Some(vec![preview("b", "Amalfi Coast")])))
            .unwrap();
        while h.planner.phase() != PlannerPhase::Preview {
            yield_now().await;
        }
        first_tx
            .send(Ok(Some(vec![preview("a", "Tuscan Retreat")])))
            .unwrap();
    };

    let (first, second, ()) = tokio::join!(first, second, driver);

    assert_eq!(first.unwrap(), Transition::Superseded);
    assert_eq!(second.unwrap(), Transition::Applied(PlannerPhase::Preview));
    assert_eq!(preview_ids(&h.planner.state()), vec!["b"]);

    let session = h.planner.sessions().load().await.expect("session saved");
    assert_eq!(session.recommended_tours[0].id, "b");
    assert_eq!(
        session.questionnaire_answers.map(|answers| answers.duration),
        Some(10)
    );
    assert_eq!(h.metrics.snapshot().stale_discarded_total, 1);
}

#[tokio::test]
async fn slow_session_write_cannot_overwrite_newer_session() {
    let (release_tx, release_rx) = oneshot::channel();
    let storage = Arc::new(HeldStorage::new(release_rx));
    let gateway = ScriptedGateway::new()
        .with_match(Ok(Some(vec![preview("old", "Alpine Escape")])))
        .with_match(Ok(Some(vec![preview("new", "Tuscan Retreat")])));
    let planner = Planner::new(
        Arc::new(gateway),
        SessionStore::with_clock(storage.clone(), Arc::new(test_clock())),
        PlannerConfig::default(),
        PlannerMetrics::shared(),
    );

    let first = planner.submit(tuscan_answers());
    let driver = async {
        while !storage.is_holding() {
            yield_now().await;
        }
        planner.restart();

        let second = planner.submit(tuscan_answers());
        let release = async {
            while planner.generation() < 3 || planner.phase() != PlannerPhase::Preview {
                yield_now().await;
            }
            release_tx.send(()).unwrap();
        };
        let (second, ()) = tokio::join!(second, release);
        second
    };

    let (first, second) = tokio::join!(first, driver);

    assert_eq!(first.unwrap(), Transition::Applied(PlannerPhase::Preview));
    assert_eq!(second.unwrap(), Transition::Applied(PlannerPhase::Preview));
    assert_eq!(preview_ids(&planner.state()), vec!["new"]);

    let session = planner.sessions().load().await.expect("session saved");
    assert_eq!(session.recommended_tours[0].id, "new");
}

#[tokio::test]
async fn preview_left_before_its_save_runs_is_not_persisted() {
    let (release_tx, release_rx) = oneshot::channel();
    let storage = Arc::new(HeldStorage::new(release_rx));
    let gateway = ScriptedGateway::new()
        .with_match(Ok(Some(vec![preview("old", "Alpine Escape")])))
        .with_match(Ok(Some(vec![preview("new", "Tuscan Retreat")])));
    let planner = Planner::new(
        Arc::new(gateway),
        SessionStore::with_clock(storage.clone(), Arc::new(test_clock())),
        PlannerConfig::default(),
        PlannerMetrics::shared(),
    );

    let first = planner.submit(tuscan_answers());
    let driver = async {
        while !storage.is_holding() {
            yield_now().await;
        }
        planner.restart();

        let second = planner.submit(tuscan_answers());
        let leave = async {
            while planner.generation() < 3 || planner.phase() != PlannerPhase::Preview {
                yield_now().await;
            }
            planner.restart();
            release_tx.send(()).unwrap();
        };
        let (second, ()) = tokio::join!(second, leave);
        second
    };

    let (first, second) = tokio::join!(first, driver);
    first.unwrap();
    second.unwrap();

    assert_eq!(planner.phase(), PlannerPhase::Questionnaire);
    let session = planner.sessions().load().await.expect("first save landed");
    assert_eq!(session.recommended_tours[0].id, "old");
}

#[tokio::test]
async fn simulated_payment_unlocks_on_select() {
    let gateway = ScriptedGateway::new()
        .with_match(Ok(Some(vec![
            preview("abc", "Tuscan Retreat"),
            preview("def", "Amalfi Coast"),
        ])))
        .with_unlock(Ok(Some(full_itinerary("abc", "Tuscan Retreat"))));
    let h = harness(gateway, PaymentMode::Simulated);
    h.planner.submit(tuscan_answers()).await.unwrap();

    let transition = h.planner.select("abc").await.unwrap();

    assert_eq!(
        transition,
        Transition::Applied(PlannerPhase::FullItinerary)
    );
    let PlannerState::FullItinerary { itinerary, .. } = h.planner.state() else {
        panic!("expected full itinerary");
    };
    assert_eq!(itinerary.days.len(), 2);
    assert_eq!(h.gateway.calls(), vec!["match", "unlock:abc"]);
    assert_eq!(h.metrics.snapshot().unlocks_total, 1);
}

#[tokio::test]
async fn required_payment_goes_through_payment_phase() {
    let gateway = ScriptedGateway::new()
        .with_match(Ok(Some(vec![preview("abc", "Tuscan Retreat")])))
        .with_payment(Ok(PaymentIntent {
            client_secret: "pi_123_secret".to_string(),
        }))
        .with_unlock(Ok(Some(full_itinerary("abc", "Tuscan Retreat"))));
    let h = harness(gateway, PaymentMode::Required);
    h.planner.submit(tuscan_answers()).await.unwrap();

    let transition = h.planner.select("abc").await.unwrap();
    assert_eq!(transition, Transition::Applied(PlannerPhase::Payment));
    assert_eq!(h.gateway.calls(), vec!["match"]);

    let transition = h.planner.pay().await.unwrap();
    assert_eq!(
        transition,
        Transition::Applied(PlannerPhase::FullItinerary)
    );
    assert_eq!(
        h.gateway.calls(),
        vec!["match", "payment:abc", "unlock:abc"]
    );
}

#[tokio::test]
async fn payment_failure_is_reported_as_payment_error() {
    let gateway = ScriptedGateway::new()
        .with_match(Ok(Some(vec![preview("abc", "Tuscan Retreat")])))
        .with_payment(Err(GatewayError::Function {
            function: "create-payment-intent".to_string(),
            message: "card declined".to_string(),
        }));
    let h = harness(gateway, PaymentMode::Required);
    h.planner.submit(tuscan_answers()).await.unwrap();
    h.planner.select("abc").await.unwrap();

    let transition = h.planner.pay().await.unwrap();

    assert_eq!(transition, Transition::Applied(PlannerPhase::Error));
    let state = h.planner.state();
    let failure = state.failure().unwrap();
    assert_eq!(failure.reason, FailureReason::Payment);
    assert!(failure.message.contains("card declined"));
}

#[tokio::test]
async fn missing_itinerary_is_not_found() {
    let gateway = ScriptedGateway::new()
        .with_match(Ok(Some(vec![preview("abc", "Tuscan Retreat")])))
        .with_unlock(Ok(None));
    let h = harness(gateway, PaymentMode::Simulated);
    h.planner.submit(tuscan_answers()).await.unwrap();

    h.planner.select("abc").await.unwrap();

    let state = h.planner.state();
    let failure = state.failure().unwrap();
    assert_eq!(failure.reason, FailureReason::NotFound);
    assert_eq!(failure.message, "Itinerary abc could not be found.");
}

#[tokio::test]
async fn unlocked_itinerary_for_another_id_is_rejected() {
    let gateway = ScriptedGateway::new()
        .with_match(Ok(Some(vec![preview("abc", "Tuscan Retreat")])))
        .with_unlock(Ok(Some(full_itinerary("zzz", "Somewhere Else"))));
    let h = harness(gateway, PaymentMode::Simulated);
    h.planner.submit(tuscan_answers()).await.unwrap();

    h.planner.select("abc").await.unwrap();

    let state = h.planner.state();
    assert_eq!(
        state.failure().map(|failure| failure.reason),
        Some(FailureReason::Gateway)
    );
}

#[tokio::test]
async fn selecting_unknown_itinerary_is_rejected() {
    let gateway =
        ScriptedGateway::new().with_match(Ok(Some(vec![preview("abc", "Tuscan Retreat")])));
    let h = harness(gateway, PaymentMode::Simulated);
    h.planner.submit(tuscan_answers()).await.unwrap();

    let error = h.planner.select("nope").await.unwrap_err();

    assert_eq!(error, PlannerError::UnknownItinerary("nope".to_string()));
    assert_eq!(h.planner.phase(), PlannerPhase::Preview);
}

#[tokio::test]
async fn back_export_and_restart() {
    let gateway = ScriptedGateway::new()
        .with_match(Ok(Some(vec![preview("abc", "Tuscan Retreat")])))
        .with_unlock(Ok(Some(full_itinerary("abc", "Tuscan Retreat"))))
        .with_unlock(Ok(Some(full_itinerary("abc", "Tuscan Retreat"))));
    let h = harness(gateway, PaymentMode::Simulated);
    h.planner.submit(tuscan_answers()).await.unwrap();

    assert!(h.planner.export(&MarkdownRenderer).is_err());
    assert!(h.planner.back_to_recommendations().is_err());

    h.planner.select("abc").await.unwrap();
    h.planner.back_to_recommendations().unwrap();
    assert_eq!(preview_ids(&h.planner.state()), vec!["abc"]);

    h.planner.select("abc").await.unwrap();
    let document = h.planner.export(&MarkdownRenderer).unwrap();
    assert_eq!(document.file_name, "tuscan-retreat.md");
    assert!(document.body.contains("## Day 1: Arrive in Florence"));
    assert_eq!(h.planner.phase(), PlannerPhase::Export);
    assert_eq!(h.metrics.snapshot().exports_total, 1);

    h.planner.restart();
    assert_eq!(h.planner.phase(), PlannerPhase::Questionnaire);
    assert!(h.planner.sessions().has_valid().await);
}

#[tokio::test]
async fn resume_restores_saved_recommendations() {
    let gateway =
        ScriptedGateway::new().with_match(Ok(Some(vec![preview("abc", "Tuscan Retreat")])));
    let h = harness(gateway, PaymentMode::Simulated);
    h.planner.submit(tuscan_answers()).await.unwrap();
    h.planner.restart();

    assert!(h.planner.resume_session().await.unwrap());

    let state = h.planner.state();
    assert_eq!(preview_ids(&state), vec!["abc"]);
    assert_eq!(
        state.recommendations().and_then(|r| r.answers.clone()),
        Some(tuscan_answers())
    );
    assert!(matches!(
        h.planner.resume_session().await,
        Err(PlannerError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn resume_ignores_expired_session() {
    let gateway =
        ScriptedGateway::new().with_match(Ok(Some(vec![preview("abc", "Tuscan Retreat")])));
    let h = harness(gateway, PaymentMode::Simulated);
    h.planner.submit(tuscan_answers()).await.unwrap();
    h.planner.restart();

    h.clock.advance(session_ttl());

    assert!(!h.planner.resume_session().await.unwrap());
    assert_eq!(h.planner.phase(), PlannerPhase::Questionnaire);
}

#[tokio::test]
async fn storage_failures_do_not_block_planning() {
    let gateway =
        ScriptedGateway::new().with_match(Ok(Some(vec![preview("abc", "Tuscan Retreat")])));
    let planner = Planner::new(
        Arc::new(gateway),
        SessionStore::new(FailingStorage),
        PlannerConfig::default(),
        PlannerMetrics::shared(),
    );

    let transition = planner.submit(tuscan_answers()).await.unwrap();

    assert_eq!(transition, Transition::Applied(PlannerPhase::Preview));
    planner.restart();
    assert!(!planner.resume_session().await.unwrap());
}
