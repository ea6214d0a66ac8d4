//! Races between concurrent operations on a multi-threaded runtime.
//!
//! Each test spawns competing tasks against one service and checks that
//! exactly one outcome committed and the losers saw a conflict.

mod common;

use std::sync::Arc;

use chrono::Duration;
use pretty_assertions::assert_eq;
use tokio::sync::Barrier;

use capstone_core::enums::{
    ArtifactKind, AuditAction, EntityType, InvitationKind, InvitationStatus, Stage,
};
use capstone_db::repos::audit::AuditFilter;

use common::{ADMIN, MENTOR, env, names};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reciprocal_accepts_create_one_team() {
    for _ in 0..8 {
        let env = env().await;
        let ab = env.svc.send_invitation(InvitationKind::Teammate, "alice", "bob").await.unwrap();
        let ba = env.svc.send_invitation(InvitationKind::Teammate, "bob", "alice").await.unwrap();
        let start = Arc::new(Barrier::new(2));

        let first = {
            let svc = env.svc.clone();
            let start = Arc::clone(&start);
            tokio::spawn(async move {
                start.wait().await;
                svc.respond_invitation(&ab.id, "bob", true).await
            })
        };
        let second = {
            let svc = env.svc.clone();
            let start = Arc::clone(&start);
            tokio::spawn(async move {
                start.wait().await;
                svc.respond_invitation(&ba.id, "alice", true).await
            })
        };
        let first = first.await.unwrap().unwrap();
        let second = second.await.unwrap().unwrap();
        assert_eq!(first.team_id, second.team_id);

        let created = env
            .svc
            .query_audit(&AuditFilter {
                entity_type: Some(EntityType::Team),
                action: Some(AuditAction::Created),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(created.len(), 1);
        assert!(env.svc.locks().is_empty());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn last_seat_goes_to_exactly_one_acceptor() {
    let env = env().await;
    let mut tasks = Vec::new();
    for recipient in ["bob", "carol", "dave", "erin"] {
        let inv = env
            .svc
            .send_invitation(InvitationKind::Teammate, "alice", recipient)
            .await
            .unwrap();
        let svc = env.svc.clone();
        tasks.push(tokio::spawn(async move {
            svc.respond_invitation(&inv.id, recipient, true).await
        }));
    }

    let mut accepted = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(e) => assert_eq!(e.kind(), "conflict", "loser sees a conflict: {e}"),
        }
    }
    assert_eq!(accepted, 1);

    let team = env.svc.team_for_member("alice").await.unwrap().unwrap();
    assert_eq!(team.member_ids.len(), 2);
    assert_eq!(team.stage, Stage::Forming);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sweep_and_accept_have_one_winner() {
    let env = env().await;
    let inv = env.svc.send_invitation(InvitationKind::Teammate, "alice", "bob").await.unwrap();
    let far_future = inv.created_at + env.svc.invitation_ttl() + Duration::days(1);

    let accept = {
        let svc = env.svc.clone();
        let id = inv.id.clone();
        tokio::spawn(async move { svc.respond_invitation(&id, "bob", true).await })
    };
    let sweep = {
        let svc = env.svc.clone();
        tokio::spawn(async move { svc.sweep_expired_invitations(far_future).await })
    };
    let accepted = accept.await.unwrap();
    let expired = sweep.await.unwrap().unwrap();

    let stored = env.svc.get_invitation(&inv.id).await.unwrap();
    match stored.status {
        InvitationStatus::Accepted => {
            assert!(accepted.is_ok());
            assert!(expired.is_empty());
            assert!(env.svc.team_for_member("bob").await.unwrap().is_some());
        }
        InvitationStatus::Expired => {
            assert_eq!(accepted.unwrap_err().kind(), "conflict");
            assert_eq!(expired.len(), 1);
            assert!(env.svc.team_for_member("bob").await.unwrap().is_none());
        }
        other => panic!("unexpected final status {other}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn competing_decisions_on_one_artifact() {
    let env = env().await;
    let team = env.svc.declare_team(ADMIN, &names(&["carol", "dave"])).await.unwrap();
    env.svc.bind_mentor(&team.id, ADMIN, MENTOR).await.unwrap();
    env.svc
        .submit_project_request(&team.id, "carol", "Title", "Abstract")
        .await
        .unwrap();
    env.svc.decide_project_request(&team.id, MENTOR, true, None).await.unwrap();
    let slides = env
        .svc
        .submit_artifact(&team.id, "dave", ArtifactKind::Presentation, "https://x.example/s")
        .await
        .unwrap();

    let approve = {
        let svc = env.svc.clone();
        let id = slides.id.clone();
        tokio::spawn(async move { svc.decide_artifact(&id, MENTOR, true, None).await })
    };
    let reject = {
        let svc = env.svc.clone();
        let id = slides.id.clone();
        tokio::spawn(async move { svc.decide_artifact(&id, ADMIN, false, None).await })
    };
    let outcomes = [approve.await.unwrap(), reject.await.unwrap()];
    let winners = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);

    let stage = env.svc.get_team_stage(&team.id).await.unwrap();
    if outcomes[0].is_ok() {
        assert_eq!(stage, Stage::AwaitingReport);
    } else {
        assert_eq!(stage, Stage::AwaitingPresentation);
    }
    assert!(env.svc.locks().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn independent_teams_progress_in_parallel() {
    let env = env().await;
    let a = env.svc.declare_team(ADMIN, &names(&["alice", "bob"])).await.unwrap();
    let b = env.svc.declare_team(ADMIN, &names(&["carol", "dave"])).await.unwrap();

    let tasks: Vec<_> = [a.id.clone(), b.id.clone()]
        .into_iter()
        .map(|team_id| {
            let svc = env.svc.clone();
            tokio::spawn(async move {
                let team = svc.bind_mentor(&team_id, ADMIN, MENTOR).await?;
                svc.save_project_draft(&team_id, &team.member_ids[0], "T", "A").await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    for team_id in [&a.id, &b.id] {
        let team = env.svc.get_team(team_id).await.unwrap();
        assert_eq!(team.mentor_id.as_deref(), Some(MENTOR));
        assert_eq!(env.svc.get_project_request(team_id).await.unwrap().title, "T");
    }
}
