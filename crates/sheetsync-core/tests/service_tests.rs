use std::collections::HashMap;
use std::time::Duration;

use futures::future::join_all;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use sheetsync_calc::{Scalar, SheetKey};
use sheetsync_core::{
    CellUpdate, CreateWorkbook, ErrorKind, ServiceConfig, SheetError, SimulationRequest, WaitOutcome,
};
use sheetsync_store::{Revision, SnapshotStore};
use sheetsync_test_utils::TestContext;

fn input(text: impl Into<String>) -> CellUpdate {
    CellUpdate::Input(text.into())
}

#[tokio::test]
async fn test_worked_example_bumps_one_revision_per_edit() {
    let ctx = TestContext::default();
    let doc = ctx.blank_workbook().await;
    let svc = &ctx.service;

    svc.set_cell(&ctx.credentials, doc.id, 1, 1, 1, input("2")).await.unwrap();
    svc.set_cell(&ctx.credentials, doc.id, 1, 2, 1, input("7")).await.unwrap();
    let b1 = svc
        .set_cell(&ctx.credentials, doc.id, 1, 1, 2, input("=A1*A2*3"))
        .await
        .unwrap();

    assert_eq!(b1.output.value, Scalar::Number(42.0));
    assert_eq!(b1.output.formatted_value, "42");
    assert_eq!(b1.output.formula.as_deref(), Some("=A1*A2*3"));
    assert_eq!(b1.revision().get(), doc.revision.get() + 3);
    assert_eq!(ctx.store.commits(), 3);

    let read = svc.get_cell(&ctx.credentials, doc.id, 1, 1, 2).await.unwrap();
    assert_eq!(read, b1.output);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_increments_never_lose_an_update() {
    let ctx = TestContext::default();
    let id = ctx.blank_workbook().await.id;

    let tasks = (0..20).map(|_| {
        let service = ctx.service.clone();
        let credentials = ctx.credentials.clone();
        tokio::spawn(async move {
            service
                .gateway()
                .mutate(&credentials, id, |workbook| {
                    let sheet = SheetKey::Id(1);
                    let current = match workbook.read_cell(&sheet, 1, 1)? {
                        Scalar::Number(n) => n,
                        _ => 0.0,
                    };
                    workbook.set_value(&sheet, 1, 1, Scalar::Number(current + 1.0))
                })
                .await
                .unwrap()
                .revision()
        })
    });
    let mut revisions: Vec<u64> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap().get())
        .collect();
    revisions.sort_unstable();

    assert_eq!(revisions, (2..=21).collect::<Vec<_>>());
    let cell = ctx.service.get_cell(&ctx.credentials, id, 1, 1, 1).await.unwrap();
    assert_eq!(cell.value, Scalar::Number(20.0));
    assert!(ctx.store.inner().locks().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_different_documents_do_not_serialize() {
    let ctx = TestContext::default();
    let a = ctx.blank_workbook().await;
    let b = ctx.blank_workbook().await;

    let held = ctx.store.inner().get_for_update(a.id).await.unwrap();
    let other = tokio::time::timeout(
        Duration::from_secs(1),
        ctx.service.set_cell(&ctx.credentials, b.id, 1, 1, 1, input("1")),
    )
    .await;
    assert!(other.is_ok());
    drop(held);
}

#[tokio::test]
async fn test_simulation_is_read_only_and_repeatable() {
    let ctx = TestContext::default();
    let doc = ctx.seeded().await;
    let request: SimulationRequest = serde_json::from_str(
        r#"{"inputs": {"Sheet1": {"A1": 10}}, "outputs": {"Sheet1": ["B1", "A1:B2"]}}"#,
    )
    .unwrap();

    let first = ctx.service.simulate(&ctx.credentials, doc.id, &request).await.unwrap();
    let second = ctx.service.simulate(&ctx.credentials, doc.id, &request).await.unwrap();

    let rendered = serde_json::to_string(&first.result).unwrap();
    assert_eq!(rendered, r#"{"Sheet1":{"B1":210,"A1:B2":[[10,210],[7,null]]}}"#);
    assert_eq!(rendered, serde_json::to_string(&second.result).unwrap());

    let stored = ctx.service.get_workbook(&ctx.credentials, doc.id).await.unwrap();
    assert_eq!(stored, doc);
    assert_eq!(ctx.store.leases(), 0);
    assert_eq!(ctx.store.commits(), 0);
}

#[tokio::test]
async fn test_simulation_error_messages() {
    let ctx = TestContext::default();
    let doc = ctx.seeded().await;

    let cases = [
        (r#"{"inputs": {"Sheet1": {"A1:B2": [[1]]}}}"#, "[[1]] is not a valid value for A1:B2"),
        (r#"{"inputs": {"NonExistent": {"A1": 1}}}"#, "\"NonExistent\" sheet does not exist"),
        (r#"{"outputs": {"NonExistent": ["A1"]}}"#, "\"NonExistent\" sheet does not exist"),
        (r#"{"outputs": {"Sheet1": ["A1:"]}}"#, "\"A1:\" reference cannot be parsed"),
    ];
    for (json, message) in cases {
        let request: SimulationRequest = serde_json::from_str(json).unwrap();
        let err = ctx.service.simulate(&ctx.credentials, doc.id, &request).await.unwrap_err();
        assert_eq!(err, SheetError::validation(message), "{json}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_wait_sees_concurrent_mutation() {
    let ctx = TestContext::new(ServiceConfig::new().with_wait_interval(Duration::from_millis(500)));
    let doc = ctx.seeded().await;
    let (id, known) = (doc.id, doc.revision);

    let writer = {
        let service = ctx.service.clone();
        let credentials = ctx.credentials.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1200)).await;
            service.set_cell(&credentials, id, 1, 3, 3, input("x")).await.unwrap()
        })
    };

    let started = tokio::time::Instant::now();
    let outcome = ctx.service.wait_for_revision(&ctx.credentials, id, known).await.unwrap();
    let committed = writer.await.unwrap();

    let WaitOutcome::Updated(record) = outcome else {
        panic!("expected an update");
    };
    assert_eq!(record.revision, known.next());
    assert_eq!(record.snapshot, committed.document.snapshot);
    assert_eq!(started.elapsed(), Duration::from_millis(1500));
}

#[tokio::test(start_paused = true)]
async fn test_wait_without_change_and_client_ahead() {
    let ctx = TestContext::new(ServiceConfig::new().with_wait_attempts(3));
    let doc = ctx.seeded().await;

    let outcome = ctx
        .service
        .wait_for_revision(&ctx.credentials, doc.id, doc.revision)
        .await
        .unwrap();
    assert_eq!(outcome, WaitOutcome::NoChange);
    assert_eq!(ctx.store.gets(), 3);

    let err = ctx
        .service
        .wait_for_revision(&ctx.credentials, doc.id, Revision::new(10))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_other_tenants_cannot_see_documents() {
    let ctx = TestContext::default();
    let doc = ctx.seeded().await;
    let intruder = ctx.other_tenant();

    let not_found = SheetError::not_found("Workbook not found");
    assert_eq!(ctx.service.get_workbook(&intruder, doc.id).await.unwrap_err(), not_found);
    assert_eq!(
        ctx.service
            .set_cell(&intruder, doc.id, 1, 1, 1, input("1"))
            .await
            .unwrap_err(),
        not_found
    );
    assert_eq!(
        ctx.service
            .simulate(&intruder, doc.id, &SimulationRequest::default())
            .await
            .unwrap_err(),
        not_found
    );
    assert!(ctx.service.list_workbooks(&intruder).await.unwrap().is_empty());
    assert_eq!(ctx.store.leases(), 0);
}

#[tokio::test]
async fn test_workbook_lifecycle() {
    let ctx = TestContext::new(ServiceConfig::new().with_max_workbooks(2));
    let first = ctx.blank_workbook().await;
    let second = ctx.seeded().await;
    assert_eq!(first.name, "Book");
    assert_eq!(second.name, "Seeded");

    let err = ctx
        .service
        .create_workbook(&ctx.credentials, CreateWorkbook::Blank { name: None })
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "You cannot create more than 2 workbooks with this license key."
    );

    let listed: Vec<_> = ctx
        .service
        .list_workbooks(&ctx.credentials)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(listed, vec![first.id, second.id]);

    let sheets = ctx.service.list_sheets(&ctx.credentials, second.id).await.unwrap();
    assert_eq!(sheets.len(), 1);
    assert_eq!(
        ctx.service.get_sheet(&ctx.credentials, second.id, 7).await.unwrap_err(),
        SheetError::not_found("Sheet not found")
    );
}

fn apply_model(model: &mut HashMap<(u32, u32), String>, at: (u32, u32), text: &str) -> bool {
    if text.is_empty() {
        model.remove(&at).is_some()
    } else {
        model.insert(at, text.to_string()).as_deref() != Some(text)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_revision_counts_only_real_changes(
        edits in prop::collection::vec((1u32..3, 1u32..3, prop::sample::select(vec!["", "1", "2", "x"])), 1..12)
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        runtime.block_on(async {
            let ctx = TestContext::default();
            let doc = ctx.blank_workbook().await;
            let mut model = HashMap::new();
            let mut expected_changes = 0u64;
            let mut last = doc.clone();

            for (row, column, text) in edits {
                let mutation = ctx
                    .service
                    .set_cell(&ctx.credentials, doc.id, 1, row, column, input(text))
                    .await
                    .unwrap();
                let changed = apply_model(&mut model, (row, column), text);
                prop_assert_eq!(mutation.changed, changed);
                if changed {
                    expected_changes += 1;
                } else {
                    prop_assert_eq!(mutation.document.modified_at, last.modified_at);
                }
                last = mutation.document;
            }

            prop_assert_eq!(last.revision.get(), 1 + expected_changes);
            prop_assert_eq!(ctx.store.commits() as u64, expected_changes);
            Ok(())
        })?;
    }
}
