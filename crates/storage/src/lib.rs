use anyhow::{Context, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

use shared::{
    domain::{Card, CardId, Deck, DeckId},
    protocol::{CardDraft, DeckDraft},
};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        // Every connection to `sqlite::memory:` opens its own database.
        let max_connections = if database_url.contains(":memory:") {
            1
        } else {
            5
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn list_decks(&self) -> Result<Vec<Deck>> {
        let deck_rows = sqlx::query("SELECT id, name, description FROM decks ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        let card_rows = sqlx::query("SELECT id, deck_id, front, back FROM cards ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        let mut decks: Vec<Deck> = deck_rows.iter().map(deck_from_row).collect();
        let positions: HashMap<DeckId, usize> = decks
            .iter()
            .enumerate()
            .map(|(position, deck)| (deck.id, position))
            .collect();
        for card in card_rows.iter().map(card_from_row) {
            if let Some(&position) = positions.get(&card.deck_id) {
                decks[position].cards.push(card);
            }
        }
        Ok(decks)
    }

    pub async fn read_deck(&self, deck_id: DeckId) -> Result<Option<Deck>> {
        let Some(row) = sqlx::query("SELECT id, name, description FROM decks WHERE id = ?")
            .bind(deck_id.0)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let mut deck = deck_from_row(&row);
        deck.cards = self.cards_for_deck(deck_id).await?;
        Ok(Some(deck))
    }

    pub async fn cards_for_deck(&self, deck_id: DeckId) -> Result<Vec<Card>> {
        let rows =
            sqlx::query("SELECT id, deck_id, front, back FROM cards WHERE deck_id = ? ORDER BY id")
                .bind(deck_id.0)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.iter().map(card_from_row).collect())
    }

    pub async fn create_deck(&self, draft: &DeckDraft) -> Result<Deck> {
        let rec = sqlx::query("INSERT INTO decks (name, description) VALUES (?, ?) RETURNING id")
            .bind(&draft.name)
            .bind(&draft.description)
            .fetch_one(&self.pool)
            .await?;
        Ok(Deck {
            id: DeckId(rec.get::<i64, _>(0)),
            name: draft.name.clone(),
            description: draft.description.clone(),
            cards: Vec::new(),
        })
    }

    pub async fn update_deck(&self, deck_id: DeckId, draft: &DeckDraft) -> Result<Option<Deck>> {
        let updated = sqlx::query("UPDATE decks SET name = ?, description = ? WHERE id = ?")
            .bind(&draft.name)
            .bind(&draft.description)
            .bind(deck_id.0)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if updated == 0 {
            return Ok(None);
        }
        self.read_deck(deck_id).await
    }

    /// Removes the deck and every card it owns. Returns `false` if no such deck existed.
    pub async fn delete_deck(&self, deck_id: DeckId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let cards = sqlx::query("DELETE FROM cards WHERE deck_id = ?")
            .bind(deck_id.0)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let decks = sqlx::query("DELETE FROM decks WHERE id = ?")
            .bind(deck_id.0)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        debug!(deck_id = deck_id.0, cards, "deleted deck");
        Ok(decks > 0)
    }

    /// Returns `None` when the owning deck does not exist.
    pub async fn create_card(&self, deck_id: DeckId, draft: &CardDraft) -> Result<Option<Card>> {
        let deck_exists: Option<i64> = sqlx::query_scalar("SELECT id FROM decks WHERE id = ?")
            .bind(deck_id.0)
            .fetch_optional(&self.pool)
            .await?;
        if deck_exists.is_none() {
            return Ok(None);
        }

        let rec =
            sqlx::query("INSERT INTO cards (deck_id, front, back) VALUES (?, ?, ?) RETURNING id")
                .bind(deck_id.0)
                .bind(&draft.front)
                .bind(&draft.back)
                .fetch_one(&self.pool)
                .await?;
        Ok(Some(Card {
            id: CardId(rec.get::<i64, _>(0)),
            deck_id,
            front: draft.front.clone(),
            back: draft.back.clone(),
        }))
    }

    pub async fn read_card(&self, card_id: CardId) -> Result<Option<Card>> {
        let row = sqlx::query("SELECT id, deck_id, front, back FROM cards WHERE id = ?")
            .bind(card_id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(card_from_row))
    }

    pub async fn update_card(&self, card_id: CardId, draft: &CardDraft) -> Result<Option<Card>> {
        let updated = sqlx::query("UPDATE cards SET front = ?, back = ? WHERE id = ?")
            .bind(&draft.front)
            .bind(&draft.back)
            .bind(card_id.0)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if updated == 0 {
            return Ok(None);
        }
        self.read_card(card_id).await
    }

    pub async fn delete_card(&self, card_id: CardId) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM cards WHERE id = ?")
            .bind(card_id.0)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }
}

fn deck_from_row(row: &SqliteRow) -> Deck {
    Deck {
        id: DeckId(row.get::<i64, _>("id")),
        name: row.get::<String, _>("name"),
        description: row.get::<String, _>("description"),
        cards: Vec::new(),
    }
}

fn card_from_row(row: &SqliteRow) -> Card {
    Card {
        id: CardId(row.get::<i64, _>("id")),
        deck_id: DeckId(row.get::<i64, _>("deck_id")),
        front: row.get::<String, _>("front"),
        back: row.get::<String, _>("back"),
    }
}

/// Creates the directory a file-backed SQLite URL points into.
pub fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

pub fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.contains(":memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
