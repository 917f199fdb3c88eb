use super::*;

async fn memory_storage() -> Storage {
    Storage::new("sqlite::memory:").await.expect("db")
}

fn deck_draft(name: &str) -> DeckDraft {
    DeckDraft {
        name: name.to_string(),
        description: format!("{name} description"),
    }
}

fn card_draft(front: &str, back: &str) -> CardDraft {
    CardDraft {
        front: front.to_string(),
        back: back.to_string(),
    }
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = memory_storage().await;
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = std::env::temp_dir().join(format!("flashcards_storage_test_{suffix}"));
    let db_path = temp_root.join("nested").join("storage.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );

    std::fs::remove_dir_all(temp_root).expect("cleanup");
}

#[tokio::test]
async fn read_deck_returns_cards_in_insertion_order() {
    let storage = memory_storage().await;
    let deck = storage.create_deck(&deck_draft("rust")).await.expect("deck");
    for (front, back) in [("Q1", "A1"), ("Q2", "A2"), ("Q3", "A3")] {
        storage
            .create_card(deck.id, &card_draft(front, back))
            .await
            .expect("card")
            .expect("deck exists");
    }

    let loaded = storage
        .read_deck(deck.id)
        .await
        .expect("read")
        .expect("deck");
    let fronts: Vec<&str> = loaded.cards.iter().map(|c| c.front.as_str()).collect();
    assert_eq!(fronts, ["Q1", "Q2", "Q3"]);
    assert!(loaded.cards.iter().all(|c| c.deck_id == deck.id));
}

#[tokio::test]
async fn list_decks_groups_cards_by_owner() {
    let storage = memory_storage().await;
    let first = storage.create_deck(&deck_draft("first")).await.expect("deck");
    let second = storage.create_deck(&deck_draft("second")).await.expect("deck");
    storage
        .create_card(second.id, &card_draft("s1", "b"))
        .await
        .expect("card");
    storage
        .create_card(first.id, &card_draft("f1", "b"))
        .await
        .expect("card");
    storage
        .create_card(second.id, &card_draft("s2", "b"))
        .await
        .expect("card");

    let decks = storage.list_decks().await.expect("list");
    assert_eq!(decks.len(), 2);
    assert_eq!(decks[0].id, first.id);
    assert_eq!(decks[0].card_count(), 1);
    assert_eq!(decks[1].card_count(), 2);
    assert_eq!(decks[1].cards[1].front, "s2");
}

#[tokio::test]
async fn create_card_for_missing_deck_returns_none() {
    let storage = memory_storage().await;
    let card = storage
        .create_card(DeckId(404), &card_draft("q", "a"))
        .await
        .expect("query");
    assert!(card.is_none());
}

#[tokio::test]
async fn update_deck_and_card_in_place() {
    let storage = memory_storage().await;
    let deck = storage.create_deck(&deck_draft("old")).await.expect("deck");
    let card = storage
        .create_card(deck.id, &card_draft("q", "a"))
        .await
        .expect("card")
        .expect("deck exists");

    let renamed = storage
        .update_deck(deck.id, &deck_draft("new"))
        .await
        .expect("update")
        .expect("deck");
    assert_eq!(renamed.name, "new");
    assert_eq!(renamed.cards, vec![card.clone()]);

    let edited = storage
        .update_card(card.id, &card_draft("q2", "a2"))
        .await
        .expect("update")
        .expect("card");
    assert_eq!(edited.id, card.id);
    assert_eq!(edited.front, "q2");

    assert!(storage
        .update_card(CardId(999), &card_draft("x", "y"))
        .await
        .expect("update")
        .is_none());
}

#[tokio::test]
async fn delete_deck_removes_owned_cards() {
    let storage = memory_storage().await;
    let deck = storage.create_deck(&deck_draft("doomed")).await.expect("deck");
    let card = storage
        .create_card(deck.id, &card_draft("q", "a"))
        .await
        .expect("card")
        .expect("deck exists");

    assert!(storage.delete_deck(deck.id).await.expect("delete"));
    assert!(storage.read_deck(deck.id).await.expect("read").is_none());
    assert!(storage.read_card(card.id).await.expect("read").is_none());
    assert!(!storage.delete_deck(deck.id).await.expect("second delete"));
}

#[tokio::test]
async fn delete_card_leaves_siblings() {
    let storage = memory_storage().await;
    let deck = storage.create_deck(&deck_draft("deck")).await.expect("deck");
    let keep = storage
        .create_card(deck.id, &card_draft("keep", "a"))
        .await
        .expect("card")
        .expect("deck exists");
    let drop_me = storage
        .create_card(deck.id, &card_draft("drop", "a"))
        .await
        .expect("card")
        .expect("deck exists");

    assert!(storage.delete_card(drop_me.id).await.expect("delete"));
    let cards = storage.cards_for_deck(deck.id).await.expect("cards");
    assert_eq!(cards, vec![keep]);
}

#[test]
fn sqlite_path_ignores_memory_and_query_suffix() {
    assert!(sqlite_path("sqlite::memory:").is_none());
    assert_eq!(
        sqlite_path("sqlite://./data/cards.db?mode=rwc"),
        Some(PathBuf::from("./data/cards.db"))
    );
}
