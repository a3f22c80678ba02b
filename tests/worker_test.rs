mod fixtures;
mod helpers;

use std::time::Duration;

use image::ImageFormat;

use echallan_anpr::models::violation::{Violation, ViolationStatus, PLACEHOLDER_VIOLATION_TYPE};
use echallan_anpr::services::matcher::UNKNOWN_PLATE;
use echallan_anpr::services::state_machine::{
    MATCHED_CONFIDENCE, MATCHED_FINE_AMOUNT, MATCHED_VIOLATION_TYPE, UNIDENTIFIED_VIOLATION_TYPE,
};
use fixtures::{REGISTERED_PLATE, REGISTRY, SECOND_REGISTERED_PLATE, UNREGISTERED_PLATE};
use helpers::{path_str, read, worker, Reply, Sandbox, ScriptedOcrEngine};

fn pending(sandbox_path: &std::path::Path) -> Violation {
    Violation::new_pending(path_str(sandbox_path), "Junction 4, FC Road")
}

#[tokio::test]
async fn test_registered_plate_is_processed_with_fine() {
    let sandbox = Sandbox::new();
    let image = sandbox.blank_frame("cam1/0001.png");
    let engine = ScriptedOcrEngine::new(vec![read(&["mh 12 ab 1234"])]);
    let worker = worker(&sandbox, REGISTRY, engine.clone());

    let violation = pending(&image);
    let id = violation.id;
    worker.store().insert(violation);

    let processed = worker.run_cycle().await.expect("Cycle failed");
    assert_eq!(processed, 1);

    let stored = worker.store().get(id).expect("Violation vanished");
    assert_eq!(stored.status, ViolationStatus::Processed);
    assert_eq!(stored.vehicle_number.as_deref(), Some(REGISTERED_PLATE));
    assert_eq!(stored.violation_type, MATCHED_VIOLATION_TYPE);
    assert_eq!(stored.fine_amount, MATCHED_FINE_AMOUNT);
    assert_eq!(stored.confidence_score, MATCHED_CONFIDENCE);
    assert_eq!(stored.location, "Junction 4, FC Road");

    // Nothing to localize on a blank frame: the whole frame was read.
    assert_eq!(engine.calls(), vec![(320, 240)]);
    assert_eq!(stored.cropped_plate_path, None);

    let annotated = sandbox.layout.processed_root.join("cam1/0001.png");
    assert!(annotated.exists(), "Annotated copy missing at {}", annotated.display());
}

#[tokio::test]
async fn test_unregistered_plate_needs_review() {
    let sandbox = Sandbox::new();
    let image = sandbox.blank_frame("0002.png");
    let engine = ScriptedOcrEngine::new(vec![read(&[UNREGISTERED_PLATE])]);
    let worker = worker(&sandbox, REGISTRY, engine);

    let violation = pending(&image);
    let id = violation.id;
    worker.store().insert(violation);
    worker.run_cycle().await.expect("Cycle failed");

    let stored = worker.store().get(id).expect("Violation vanished");
    assert_eq!(stored.status, ViolationStatus::NeedsReview);
    assert_eq!(stored.vehicle_number.as_deref(), Some(UNREGISTERED_PLATE));
    assert_eq!(stored.violation_type, UNIDENTIFIED_VIOLATION_TYPE);
    assert_eq!(stored.fine_amount, 0.0);
}

#[tokio::test]
async fn test_registered_candidate_wins_over_earlier_unregistered() {
    let sandbox = Sandbox::new();
    let image = sandbox.blank_frame("0003.png");
    let engine = ScriptedOcrEngine::new(vec![read(&[
        "IND",
        UNREGISTERED_PLATE,
        SECOND_REGISTERED_PLATE,
    ])]);
    let worker = worker(&sandbox, REGISTRY, engine);

    let violation = pending(&image);
    let id = violation.id;
    worker.store().insert(violation);
    worker.run_cycle().await.expect("Cycle failed");

    let stored = worker.store().get(id).expect("Violation vanished");
    assert_eq!(stored.status, ViolationStatus::Processed);
    assert_eq!(stored.vehicle_number.as_deref(), Some(SECOND_REGISTERED_PLATE));
}

#[tokio::test]
async fn test_no_admissible_text_records_unknown() {
    let sandbox = Sandbox::new();
    let image = sandbox.blank_frame("0004.png");
    // "AB12" is four characters and the worker wants more than four.
    let engine = ScriptedOcrEngine::new(vec![read(&["IND", "AB12", "--"])]);
    let worker = worker(&sandbox, REGISTRY, engine);

    let violation = pending(&image);
    let id = violation.id;
    worker.store().insert(violation);
    worker.run_cycle().await.expect("Cycle failed");

    let stored = worker.store().get(id).expect("Violation vanished");
    assert_eq!(stored.status, ViolationStatus::NeedsReview);
    assert_eq!(stored.vehicle_number.as_deref(), Some(UNKNOWN_PLATE));
    assert_eq!(stored.fine_amount, 0.0);
}

#[tokio::test]
async fn test_undecodable_image_marks_error() {
    let sandbox = Sandbox::new();
    let image = sandbox.corrupt_frame("0005.jpg");
    let engine = ScriptedOcrEngine::new(vec![read(&[REGISTERED_PLATE])]);
    let worker = worker(&sandbox, REGISTRY, engine.clone());

    let violation = pending(&image);
    let id = violation.id;
    worker.store().insert(violation);
    worker.run_cycle().await.expect("Cycle failed");

    let stored = worker.store().get(id).expect("Violation vanished");
    assert_eq!(stored.status, ViolationStatus::Error);
    assert_eq!(stored.vehicle_number, None);
    assert_eq!(stored.violation_type, PLACEHOLDER_VIOLATION_TYPE);
    assert!(engine.calls().is_empty(), "OCR must not run on an unreadable file");
}

#[tokio::test]
async fn test_missing_image_marks_error() {
    let sandbox = Sandbox::new();
    let image = sandbox.missing_frame("never-uploaded.png");
    let engine = ScriptedOcrEngine::new(Vec::new());
    let worker = worker(&sandbox, REGISTRY, engine);

    let violation = pending(&image);
    let id = violation.id;
    worker.store().insert(violation);

    let status = worker
        .process_violation(worker.store().get(id).expect("Violation vanished"))
        .await;
    assert_eq!(status, ViolationStatus::Error);
    assert_eq!(worker.store().get(id).map(|v| v.status), Some(ViolationStatus::Error));
}

#[tokio::test]
async fn test_engine_failure_is_isolated_to_one_record() {
    let sandbox = Sandbox::new();
    let first = pending(&sandbox.blank_frame("a.png"));
    let second = pending(&sandbox.blank_frame("b.png"));
    let (first_id, second_id) = (first.id, second.id);

    let engine = ScriptedOcrEngine::new(vec![Reply::Crash, read(&[REGISTERED_PLATE])]);
    let worker = worker(&sandbox, REGISTRY, engine);
    worker.store().insert(first);
    worker.store().insert(second);

    assert_eq!(worker.run_cycle().await.expect("Cycle failed"), 2);

    let store = worker.store();
    assert_eq!(store.get(first_id).map(|v| v.status), Some(ViolationStatus::Error));
    assert_eq!(store.get(second_id).map(|v| v.status), Some(ViolationStatus::Processed));
}

#[tokio::test]
async fn test_terminal_records_are_not_picked_up_again() {
    let sandbox = Sandbox::new();
    let engine = ScriptedOcrEngine::new(vec![
        read(&[REGISTERED_PLATE]),
        read(&[UNREGISTERED_PLATE]),
        Reply::Crash,
    ]);
    let worker = worker(&sandbox, REGISTRY, engine.clone());
    for name in ["1.png", "2.png", "3.png"] {
        worker.store().insert(pending(&sandbox.blank_frame(name)));
    }

    assert_eq!(worker.run_cycle().await.expect("Cycle failed"), 3);
    assert_eq!(worker.run_cycle().await.expect("Cycle failed"), 0);
    assert_eq!(engine.calls().len(), 3);

    let statuses: Vec<_> = worker.store().snapshot().into_iter().map(|v| v.status).collect();
    assert_eq!(
        statuses,
        vec![
            ViolationStatus::Processed,
            ViolationStatus::NeedsReview,
            ViolationStatus::Error
        ]
    );
}

#[tokio::test]
async fn test_localized_plate_is_cropped_before_reading() {
    let sandbox = Sandbox::new();
    let image = sandbox.plate_frame("cam2/0006.png");
    let engine = ScriptedOcrEngine::new(vec![read(&[REGISTERED_PLATE])]);
    let worker = worker(&sandbox, REGISTRY, engine.clone());

    let violation = pending(&image);
    let id = violation.id;
    worker.store().insert(violation);
    worker.run_cycle().await.expect("Cycle failed");

    let calls = engine.calls();
    assert_eq!(calls.len(), 1);
    let (width, height) = calls[0];
    assert!(width < 480 && height < 360, "Expected a crop, engine saw {width}x{height}");
    assert!(width >= 180 && height >= 50, "Crop lost the plate: {width}x{height}");

    let stored = worker.store().get(id).expect("Violation vanished");
    assert_eq!(stored.status, ViolationStatus::Processed);
    let crop = stored.cropped_plate_path.expect("Crop path not recorded");
    assert!(crop.ends_with("0006_plate.png"));
    assert!(std::path::Path::new(&crop).exists());
}

#[tokio::test]
async fn test_failed_commit_falls_back_to_error() {
    let sandbox = Sandbox::new();
    let image = sandbox.blank_frame("0007.png");
    let engine = ScriptedOcrEngine::new(vec![read(&[REGISTERED_PLATE])]);
    let worker = worker(&sandbox, REGISTRY, engine);

    let violation = pending(&image);
    let id = violation.id;
    worker.store().insert(violation);
    worker.store().reject_commits(true);

    worker.run_cycle().await.expect("Cycle failed");

    let stored = worker.store().get(id).expect("Violation vanished");
    assert_eq!(stored.status, ViolationStatus::Error);
    assert_eq!(stored.fine_amount, 0.0);
}

#[tokio::test]
async fn test_image_decoded_by_content_not_extension() {
    let sandbox = Sandbox::new();
    let mislabelled = pending(&sandbox.blank_frame_as("IMG_0042.jpg", ImageFormat::Png));
    let bare = pending(&sandbox.blank_frame_as("snapshot", ImageFormat::Jpeg));
    let (mislabelled_id, bare_id) = (mislabelled.id, bare.id);

    let engine = ScriptedOcrEngine::new(vec![read(&[REGISTERED_PLATE]), read(&[REGISTERED_PLATE])]);
    let worker = worker(&sandbox, REGISTRY, engine.clone());
    worker.store().insert(mislabelled);
    worker.store().insert(bare);

    assert_eq!(worker.run_cycle().await.expect("Cycle failed"), 2);
    assert_eq!(engine.calls().len(), 2);

    let store = worker.store();
    assert_eq!(store.get(mislabelled_id).map(|v| v.status), Some(ViolationStatus::Processed));
    assert_eq!(store.get(bare_id).map(|v| v.status), Some(ViolationStatus::Processed));

    // Without a usable extension the annotated copy is written as PNG.
    let annotated = sandbox.layout.processed_root.join("snapshot");
    let written = image::ImageReader::open(&annotated)
        .expect("Annotated copy missing")
        .with_guessed_format()
        .expect("Unreadable annotated copy");
    assert_eq!(written.format(), Some(ImageFormat::Png));
    assert!(sandbox.layout.processed_root.join("IMG_0042.jpg").exists());
}

#[tokio::test]
async fn test_loop_keeps_polling_through_store_outage() {
    let sandbox = Sandbox::new();
    let engine = ScriptedOcrEngine::new(vec![read(&[REGISTERED_PLATE])]);
    let worker = worker(&sandbox, REGISTRY, engine)
        .with_poll_intervals(Duration::from_millis(10), Duration::from_millis(10));

    let violation = pending(&sandbox.blank_frame("outage.png"));
    let id = violation.id;
    worker.store().insert(violation);
    worker.store().reject_fetches(true);

    let recovered = async {
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(worker.store().get(id).map(|v| v.status), Some(ViolationStatus::Pending));
        worker.store().reject_fetches(false);
        while worker.store().get(id).map(|v| v.status) != Some(ViolationStatus::Processed) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };

    let outcome = tokio::time::timeout(Duration::from_secs(30), async {
        tokio::select! {
            _ = worker.run() => panic!("Worker loop returned"),
            _ = recovered => {}
        }
    })
    .await;
    assert!(outcome.is_ok(), "Worker never recovered from the store outage");
}
