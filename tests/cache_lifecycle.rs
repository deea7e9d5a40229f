use std::sync::Arc;
use std::time::Duration;

use djobba_microcopy::services::text_store::{FileTextStore, MemoryTextStore};
use djobba_microcopy::{
    variables, Language, MicrocopyCache, Presenter, TextEntry, TextResolver, TextState, TextStore,
    Variables, DEFAULT_TTL,
};
use tempfile::tempdir;

fn catalogue() -> Vec<TextEntry> {
    vec![
        TextEntry::new("homepage.headline", "Vind je volgende opdracht")
            .with_en("Find your next assignment"),
        TextEntry::new("wallet.payout", "Uitbetaling van {{amount}} op {{date}}")
            .with_en("Payout of {{amount}} on {{date}}")
            .with_variables(["amount", "date"]),
    ]
}

#[tokio::test(start_paused = true)]
async fn stale_snapshot_survives_outage_until_store_recovers() {
    let store = Arc::new(MemoryTextStore::new(catalogue()));
    let resolver = TextResolver::new(MicrocopyCache::new(
        Arc::clone(&store) as Arc<dyn TextStore>
    ));

    let vars = variables([("amount", "€ 250,00"), ("date", "1 november")]);
    assert_eq!(
        resolver.resolve_text("wallet.payout", &vars, Language::Nl).await,
        "Uitbetaling van € 250,00 op 1 november"
    );

    store.set_failing(true);
    store.set_entries(Vec::new());
    tokio::time::advance(DEFAULT_TTL + Duration::from_secs(1)).await;

    assert_eq!(
        resolver
            .resolve_text("homepage.headline", &Variables::new(), Language::En)
            .await,
        "Find your next assignment"
    );

    store.set_failing(false);
    store.set_entries(vec![TextEntry::new("homepage.headline", "Nieuwe kop")]);
    assert_eq!(
        resolver
            .resolve_text("homepage.headline", &Variables::new(), Language::Nl)
            .await,
        "Nieuwe kop"
    );
    assert_eq!(
        resolver
            .resolve_text("wallet.payout", &vars, Language::Nl)
            .await,
        "[wallet.payout]"
    );
    assert_eq!(store.fetch_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn reset_refetches_even_within_ttl() {
    let store = Arc::new(MemoryTextStore::new(catalogue()));
    let cache = MicrocopyCache::new(Arc::clone(&store) as Arc<dyn TextStore>);
    let resolver = TextResolver::new(cache.clone());

    resolver
        .resolve("homepage.headline", &Variables::new(), Language::Nl)
        .await;
    tokio::time::advance(Duration::from_secs(1)).await;
    cache.reset();
    resolver
        .resolve("homepage.headline", &Variables::new(), Language::Nl)
        .await;

    assert_eq!(store.fetch_calls(), 2);
}

#[tokio::test]
async fn presenter_over_file_export() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("microcopy.json");
    std::fs::write(
        &path,
        serde_json::to_vec(&catalogue()).expect("serialize catalogue"),
    )
    .expect("write export");

    let cache = MicrocopyCache::new(Arc::new(FileTextStore::new(&path)) as Arc<dyn TextStore>);
    let presenter = Presenter::new(TextResolver::new(cache));

    let mut single = presenter.subscribe("homepage.headline", Variables::new(), Language::En);
    assert_eq!(
        single.settled().await,
        TextState::Resolved("Find your next assignment".into())
    );

    let mut batch = presenter.subscribe_many(
        ["homepage.headline", "wallet.payout"],
        variables([("amount", 99)]),
        Language::Nl,
    );
    let view = batch.settled().await;
    assert_eq!(view.texts["homepage.headline"], "Vind je volgende opdracht");
    assert_eq!(view.texts["wallet.payout"], "Uitbetaling van 99 op {{date}}");
}

#[tokio::test(start_paused = true)]
async fn reset_while_fetching_serves_the_edited_table() {
    let store = Arc::new(MemoryTextStore::new(catalogue()));
    store.set_latency(Some(Duration::from_millis(100)));
    let cache = MicrocopyCache::new(Arc::clone(&store) as Arc<dyn TextStore>);
    let resolver = TextResolver::new(cache.clone());

    let early = {
        let resolver = resolver.clone();
        tokio::spawn(async move {
            resolver
                .resolve_text("homepage.headline", &Variables::new(), Language::Nl)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    cache.reset();
    tokio::time::sleep(Duration::from_millis(95)).await;
    store.set_entries(vec![TextEntry::new("homepage.headline", "Bewerkte kop")]);

    assert_eq!(
        early.await.expect("join handle"),
        "Vind je volgende opdracht"
    );
    assert_eq!(
        resolver
            .resolve_text("homepage.headline", &Variables::new(), Language::Nl)
            .await,
        "Bewerkte kop"
    );
    assert_eq!(store.fetch_calls(), 2);
}
