use std::collections::BTreeSet;

use aide_walkthrough::db::Database;
use aide_walkthrough::models::*;
use aide_walkthrough::walkthrough::{extract, plan};
use chrono::Utc;
use speculate2::speculate;
use uuid::Uuid;

fn key() -> ProjectKey {
    ProjectKey::new("/work/shop", "ana")
}

fn snapshot_for(key: &ProjectKey, files: &[&str]) -> PlanSnapshot {
    let features = extract(files);
    PlanSnapshot {
        project_key: key.clone(),
        plan: plan(&features),
        features,
        generated_at: Utc::now(),
    }
}

fn execution(key: &ProjectKey, step_no: u32, success: bool) -> ExecutionRecord {
    ExecutionRecord {
        id: Uuid::new_v4(),
        project_key: key.clone(),
        step_no,
        success,
        message: format!("step {}", step_no),
        executed_at: Utc::now(),
    }
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "session progress" {
        it "returns none for an unknown key" {
            let progress = db.get_progress(&key()).expect("Failed to load progress");
            assert!(progress.is_none());
        }

        it "inserts a record only once" {
            let fresh = SessionProgress::fresh(key(), Utc::now());
            assert!(db.insert_progress_if_absent(&fresh).expect("Failed to insert"));

            let mut other = SessionProgress::fresh(key(), Utc::now());
            other.total_steps = 9;
            assert!(!db.insert_progress_if_absent(&other).expect("Failed to insert"));

            let stored = db.get_progress(&key()).unwrap().unwrap();
            assert_eq!(stored.total_steps, 0);
        }

        it "round-trips completed steps and status" {
            let mut progress = SessionProgress::fresh(key(), Utc::now());
            db.insert_progress_if_absent(&progress).unwrap();

            progress.completed_steps = BTreeSet::from([1, 2, 5]);
            progress.total_steps = 5;
            progress.status = SessionStatus::Completed;
            progress.revision = 1;
            assert!(db.update_progress_if_revision(0, &progress).unwrap());

            let stored = db.get_progress(&key()).unwrap().unwrap();
            assert_eq!(stored.completed_steps, BTreeSet::from([1, 2, 5]));
            assert_eq!(stored.status, SessionStatus::Completed);
            assert_eq!(stored.revision, 1);
        }

        it "rejects an update against a stale revision" {
            let mut progress = SessionProgress::fresh(key(), Utc::now());
            db.insert_progress_if_absent(&progress).unwrap();

            progress.completed_steps.insert(1);
            progress.revision = 1;
            assert!(db.update_progress_if_revision(0, &progress).unwrap());

            let mut stale = progress.clone();
            stale.completed_steps.insert(2);
            stale.revision = 1;
            assert!(!db.update_progress_if_revision(0, &stale).unwrap());

            let stored = db.get_progress(&key()).unwrap().unwrap();
            assert_eq!(stored.completed_steps, BTreeSet::from([1]));
        }

        it "keeps users of the same project apart" {
            let ana = ProjectKey::new("/work/shop", "ana");
            let ben = ProjectKey::new("/work/shop", "ben");
            db.insert_progress_if_absent(&SessionProgress::fresh(ana.clone(), Utc::now())).unwrap();

            assert!(db.get_progress(&ana).unwrap().is_some());
            assert!(db.get_progress(&ben).unwrap().is_none());
        }
    }

    describe "plans" {
        it "stores and loads a plan snapshot" {
            let snapshot = snapshot_for(&key(), &["requirements.txt", "manage.py"]);
            db.upsert_plan(&snapshot).expect("Failed to save plan");

            let stored = db.get_plan(&key()).unwrap().expect("plan missing");
            assert_eq!(stored.plan, snapshot.plan);
            assert_eq!(stored.features, snapshot.features);
        }

        it "replaces the previous plan" {
            db.upsert_plan(&snapshot_for(&key(), &["requirements.txt"])).unwrap();
            db.upsert_plan(&snapshot_for(&key(), &["package.json"])).unwrap();

            let stored = db.get_plan(&key()).unwrap().unwrap();
            assert!(stored.features.has_manifest_node);
            assert!(!stored.features.has_manifest_python);
        }
    }

    describe "executions" {
        it "lists executions in the order they were recorded" {
            for (step_no, success) in [(1, true), (2, false), (2, true)] {
                db.create_execution(&execution(&key(), step_no, success)).unwrap();
            }

            let records = db.get_executions(&key()).unwrap();
            let summary: Vec<(u32, bool)> = records.iter().map(|r| (r.step_no, r.success)).collect();
            assert_eq!(summary, vec![(1, true), (2, false), (2, true)]);
        }

        it "only lists executions for the requested key" {
            db.create_execution(&execution(&key(), 1, true)).unwrap();
            let other = ProjectKey::new("/work/other", "ana");

            assert!(db.get_executions(&other).unwrap().is_empty());
        }
    }
}

mod durability {
    use super::*;

    #[test]
    fn progress_survives_reopening_the_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("walkthrough.db");

        {
            let db = Database::open(path.clone()).unwrap();
            db.migrate().unwrap();
            let mut progress = SessionProgress::fresh(key(), Utc::now());
            db.insert_progress_if_absent(&progress).unwrap();
            progress.completed_steps.insert(3);
            progress.revision = 1;
            db.update_progress_if_revision(0, &progress).unwrap();
        }

        let db = Database::open(path).unwrap();
        db.migrate().unwrap();
        let stored = db.get_progress(&key()).unwrap().unwrap();
        assert_eq!(stored.completed_steps, BTreeSet::from([3]));
        assert_eq!(stored.revision, 1);
    }
}
