//! Collection view tests
//!
//! End-to-end behaviour of views over a shared collection, driven by the
//! scripted in-memory fetcher.

use discovery_collection::prelude::*;
use discovery_collection::Record;
use discovery_test_utils::{int_ids, sample, samples, ScriptedFetcher};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn collection_over(fetcher: &Arc<ScriptedFetcher<Record>>) -> Collection<Record> {
    Collection::new("my_data", Arc::clone(fetcher))
}

#[tokio::test]
async fn test_identical_in_flight_ranges_share_one_fetch() {
    let fetcher = Arc::new(ScriptedFetcher::gated(samples(0..100)));
    let view = collection_over(&fetcher).create_view(ViewOptions::new());
    let range = RowRange::new(0, 49);

    let (first, second, ()) = tokio::join!(
        view.handle_load_object_rows(range),
        view.handle_load_object_rows(range),
        async {
            fetcher.wait_for_calls(1).await;
            tokio::task::yield_now().await;
            fetcher.release(1);
        }
    );

    let first = first.unwrap();
    assert_eq!(fetcher.call_count(), 1);
    assert_eq!(first.len(), 50);
    assert_eq!(first, second.unwrap());
    assert_eq!(view.in_flight(), 0);
}

#[tokio::test]
async fn test_shared_failure_reaches_every_waiter() {
    let fetcher = Arc::new(ScriptedFetcher::gated(samples(0..10)));
    fetcher.fail_next(FetchError::Status {
        status: 502,
        message: "bad gateway".to_string(),
    });
    let view = collection_over(&fetcher).create_view(ViewOptions::new());
    let range = RowRange::new(0, 9);

    let (first, second, ()) = tokio::join!(
        view.handle_load_object_rows(range),
        view.handle_load_object_rows(range),
        async {
            fetcher.wait_for_calls(1).await;
            fetcher.release(1);
        }
    );

    assert_eq!(first.unwrap_err(), second.unwrap_err());
    assert_eq!(fetcher.call_count(), 1);
    assert_eq!(view.in_flight(), 0);

    // the failed range is not trapped as in flight
    fetcher.release(1);
    let rows = view.handle_load_object_rows(range).await.unwrap();
    assert_eq!(rows.len(), 10);
    assert_eq!(fetcher.call_count(), 2);
}

#[tokio::test]
async fn test_cache_is_shared_across_views() {
    let fetcher = Arc::new(ScriptedFetcher::new(samples([1, 2])));
    let collection = collection_over(&fetcher);
    let default_view = collection.create_view(ViewOptions::new());
    let map_preview = collection.create_view(
        ViewOptions::new().with_conditions(Conditions::new().with("location", "Boston")),
    );

    default_view.load_page(0).await.unwrap();

    assert!(map_preview.ids().is_empty());
    assert_eq!(map_preview.get(&Identifier::Int(1)), Some(sample(1, "s1")));
    assert_eq!(map_preview.get(&Identifier::Int(2)), Some(sample(2, "s2")));
}

#[tokio::test]
async fn test_fetches_span_of_missing_rows() {
    let fetcher = Arc::new(ScriptedFetcher::new(samples([10, 20, 30, 40])));
    let collection = collection_over(&fetcher);
    let view = collection.create_view(ViewOptions::new().with_page_size(1));

    view.load_page(0).await.unwrap();
    collection.update(sample(30, "s30"));
    assert_eq!(view.ids(), int_ids(&[10, 20, 30, 40]));

    let rows = view
        .handle_load_object_rows(RowRange::new(0, 3))
        .await
        .unwrap();

    let calls = fetcher.calls();
    assert_eq!(calls.len(), 2);
    // rows 1 and 3 are missing: one request spans from the first to the last
    assert_eq!(calls[1].offset, 1);
    assert_eq!(calls[1].limit, 3);
    assert!(!calls[1].list_all_ids);
    assert_eq!(rows, samples([10, 20, 30, 40]));
}

#[tokio::test]
async fn test_list_all_ids_only_when_ordering_unknown() {
    let fetcher = Arc::new(ScriptedFetcher::new(samples(0..10)));
    let view = collection_over(&fetcher).create_view(ViewOptions::new().with_page_size(5));

    view.load_page(0).await.unwrap();
    view.load_page(1).await.unwrap();

    let calls = fetcher.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].list_all_ids);
    assert!(!calls[1].list_all_ids);
    assert_eq!((calls[1].offset, calls[1].limit), (5, 5));

    view.reset(ResetOptions::new());
    view.load_page(0).await.unwrap();
    assert!(fetcher.calls()[2].list_all_ids);
}

#[tokio::test]
async fn test_reset_clears_window_but_not_cache() {
    let fetcher = Arc::new(ScriptedFetcher::new(samples([1, 2, 3])));
    let view = collection_over(&fetcher).create_view(ViewOptions::new());
    view.load_page(0).await.unwrap();
    assert_eq!(view.len(), 3);

    view.reset(ResetOptions::new());

    assert!(view.ids().is_empty());
    assert!(view.is_loading());
    assert_eq!(view.len(), 0);
    assert!(view.loaded().is_empty());
    assert_eq!(view.get(&Identifier::Int(2)), Some(sample(2, "s2")));
}

#[tokio::test]
async fn test_short_result_set_returns_partial_rows() {
    let fetcher = Arc::new(ScriptedFetcher::new(samples([1, 2, 3])));
    let view = collection_over(&fetcher).create_view(ViewOptions::new());

    let rows = view
        .handle_load_object_rows(RowRange::new(0, 9))
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);

    // answered from cache, clamped to the known length
    let again = view
        .handle_load_object_rows(RowRange::new(0, 9))
        .await
        .unwrap();
    assert_eq!(again, rows);
    assert_eq!(fetcher.call_count(), 1);

    let past_end = view
        .handle_load_object_rows(RowRange::new(5, 9))
        .await
        .unwrap();
    assert!(past_end.is_empty());
    assert_eq!(fetcher.call_count(), 1);
}

#[tokio::test]
async fn test_load_first_page_end_to_end() {
    let fetcher = Arc::new(ScriptedFetcher::fixed(
        FetchResponse::new(vec![sample(1, "s1"), sample(2, "s2")]).with_ids(int_ids(&[1, 2])),
    ));
    let view = collection_over(&fetcher).create_view(ViewOptions::new().with_page_size(2));

    let rows = view.load_page(0).await.unwrap();

    let calls = fetcher.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].domain, "my_data");
    assert_eq!((calls[0].limit, calls[0].offset), (2, 0));
    assert!(calls[0].list_all_ids);
    assert_eq!(rows, vec![sample(1, "s1"), sample(2, "s2")]);
    assert_eq!(view.len(), 2);
    assert!(!view.is_loading());
}

#[tokio::test]
async fn test_reset_with_new_conditions_loads_first_page() {
    let fetcher = Arc::new(ScriptedFetcher::new(samples(0..4)));
    let view = collection_over(&fetcher).create_view(ViewOptions::new().with_page_size(2));
    view.load_page(0).await.unwrap();

    let handle = view
        .reset(
            ResetOptions::new()
                .with_conditions(Conditions::new().with("search", "covid"))
                .load_first_page(),
        )
        .expect("first page task");
    let rows = handle.await.unwrap().unwrap();

    assert_eq!(rows, samples(0..2));
    let calls = fetcher.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[1].list_all_ids);
    assert_eq!(calls[1].conditions.get("search").unwrap(), "covid");
    assert!(!view.is_loading());
}

#[tokio::test]
async fn test_reset_orphans_in_flight_fetch() {
    let fetcher = Arc::new(ScriptedFetcher::gated(samples(0..4)));
    let view = collection_over(&fetcher).create_view(ViewOptions::new().with_page_size(2));

    let orphan = tokio::spawn({
        let view = view.clone();
        async move { view.load_page(0).await }
    });
    fetcher.wait_for_calls(1).await;
    assert_eq!(view.in_flight(), 1);

    view.reset(ResetOptions::new());
    assert_eq!(view.in_flight(), 0);

    // the same range is fetched again instead of joining the orphan
    let fresh = tokio::spawn({
        let view = view.clone();
        async move { view.load_page(0).await }
    });
    fetcher.wait_for_calls(2).await;
    fetcher.release(2);

    assert_eq!(orphan.await.unwrap().unwrap(), samples(0..2));
    assert_eq!(fresh.await.unwrap().unwrap(), samples(0..2));
    assert_eq!(fetcher.call_count(), 2);
    assert_eq!(view.in_flight(), 0);
    assert_eq!(view.len(), 4);
}

#[tokio::test]
async fn test_abandoned_request_still_merges() {
    let fetcher = Arc::new(ScriptedFetcher::gated(samples(0..4)));
    let collection = collection_over(&fetcher);
    let view = collection.create_view(ViewOptions::new().with_page_size(2));

    let waited = tokio::time::timeout(Duration::from_millis(20), view.load_page(0)).await;
    assert!(waited.is_err());
    assert_eq!(fetcher.call_count(), 1);

    fetcher.release(1);
    for _ in 0..200 {
        if view.in_flight() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert_eq!(view.in_flight(), 0);
    assert!(!view.is_loading());
    assert_eq!(view.len(), 4);
    assert_eq!(collection.len(), 2);

    // served from the merged rows
    assert_eq!(view.load_page(0).await.unwrap(), samples(0..2));
    assert_eq!(fetcher.call_count(), 1);
}

#[tokio::test]
async fn test_update_is_visible_through_views() {
    let fetcher = Arc::new(ScriptedFetcher::new(samples([1, 2])));
    let collection = collection_over(&fetcher);
    let view = collection.create_view(ViewOptions::new());
    view.load_page(0).await.unwrap();

    collection.update(sample(2, "renamed"));

    assert_eq!(view.loaded(), vec![sample(1, "s1"), sample(2, "renamed")]);
    let rows = view.load_page(0).await.unwrap();
    assert_eq!(rows[1], sample(2, "renamed"));
    assert_eq!(fetcher.call_count(), 1);
}

#[test]
fn test_joined_request_waits_for_shared_fetch() {
    let fetcher = Arc::new(ScriptedFetcher::gated(samples(0..5)));
    let view = collection_over(&fetcher).create_view(ViewOptions::new().with_page_size(5));

    let mut first = tokio_test::task::spawn(view.load_page(0));
    let mut second = tokio_test::task::spawn(view.load_page(0));
    tokio_test::assert_pending!(first.poll());
    tokio_test::assert_pending!(second.poll());
    assert_eq!(fetcher.call_count(), 1);
    assert_eq!(view.in_flight(), 1);

    fetcher.release(1);
    let rows = tokio_test::assert_ready_ok!(first.poll());
    assert_eq!(rows, samples(0..5));
    assert_eq!(tokio_test::assert_ready_ok!(second.poll()), rows);
    assert_eq!(fetcher.call_count(), 1);
    assert_eq!(view.in_flight(), 0);
}
