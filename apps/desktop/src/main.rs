use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use client_core::{
    mutations::DeleteOutcome, CardView, ConfirmPrompt, DeckApi, DeckListOrchestrator,
    DeckViewOrchestrator, HttpDeckApi, InvalidationBus, Navigator,
};
use shared::{
    domain::{CardId, Deck, DeckId},
    protocol::{CardDraft, DeckDraft},
};
use tracing_subscriber::EnvFilter;

mod settings;
mod terminal;

use settings::load_settings;
use terminal::{run_study, Console, TerminalConfirm, TerminalNavigator};

#[derive(Parser, Debug)]
#[command(name = "flashcards", about = "Study flashcard decks from the terminal")]
struct Cli {
    /// Deck service base URL. Overrides `flashcards.toml` and `FLASHCARDS__SERVER_URL`.
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    config: Option<PathBuf>,
    /// Answer yes to every confirmation.
    #[arg(long, short = 'y')]
    yes: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List decks.
    Decks,
    /// Show a deck and its cards.
    Show { deck_id: i64 },
    /// Study a deck interactively.
    Study { deck_id: i64 },
    CreateDeck {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    EditDeck {
        deck_id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    DeleteDeck { deck_id: i64 },
    AddCard {
        deck_id: i64,
        front: String,
        back: String,
    },
    EditCard {
        card_id: i64,
        #[arg(long)]
        front: Option<String>,
        #[arg(long)]
        back: Option<String>,
    },
    DeleteCard { deck_id: i64, card_id: i64 },
}

struct App {
    api: Arc<dyn DeckApi>,
    bus: InvalidationBus,
    navigator: Arc<TerminalNavigator>,
    confirm: Arc<dyn ConfirmPrompt>,
    console: Arc<Console>,
}

impl App {
    fn deck_view(&self) -> DeckViewOrchestrator {
        DeckViewOrchestrator::new(
            Arc::clone(&self.api),
            self.bus.clone(),
            self.navigator.clone() as Arc<dyn Navigator>,
            Arc::clone(&self.confirm),
        )
    }

    async fn load_deck(&self, deck_id: i64) -> Result<(DeckViewOrchestrator, Deck)> {
        let view = self.deck_view();
        view.mount(DeckId(deck_id)).await?;
        let deck = view
            .deck()
            .ok_or_else(|| anyhow!("deck {deck_id} did not load"))?;
        Ok((view, deck))
    }

    fn report_navigation(&self) {
        if let Some(route) = self.navigator.last() {
            println!("-> {route}");
        }
    }

    async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Decks => {
                let list = DeckListOrchestrator::deck_list(Arc::clone(&self.api), self.bus.clone());
                list.mount(()).await?;
                let decks = list.snapshot().ready().cloned().unwrap_or_default();
                if decks.is_empty() {
                    println!("No decks yet. Create one with `flashcards create-deck <name>`.");
                }
                for deck in decks {
                    println!("{:>4}  {}  ({} cards)", deck.id, deck.name, deck.card_count());
                }
            }
            Command::Show { deck_id } => {
                let (_view, deck) = self.load_deck(deck_id).await?;
                print_deck(&deck);
            }
            Command::Study { deck_id } => {
                let (view, _deck) = self.load_deck(deck_id).await?;
                let mut controller = view.start_study()?;
                run_study(&mut controller, &self.console).await?;
                view.unmount();
                self.report_navigation();
            }
            Command::CreateDeck { name, description } => {
                let view = self.deck_view();
                let deck = view
                    .mutations()
                    .create_deck(DeckDraft { name, description })
                    .await?;
                println!("created deck {}", deck.id);
                self.report_navigation();
            }
            Command::EditDeck {
                deck_id,
                name,
                description,
            } => {
                let (view, mut deck) = self.load_deck(deck_id).await?;
                if let Some(name) = name {
                    deck.name = name;
                }
                if let Some(description) = description {
                    deck.description = description;
                }
                let deck = view.mutations().update_deck(deck).await?;
                println!("updated deck {}", deck.id);
                self.report_navigation();
            }
            Command::DeleteDeck { deck_id } => {
                let (view, deck) = self.load_deck(deck_id).await?;
                println!("{} ({} cards)", deck.name, deck.card_count());
                report_delete(view.delete_deck().await?, "deck");
                self.report_navigation();
            }
            Command::AddCard {
                deck_id,
                front,
                back,
            } => {
                let view = self.deck_view();
                let card = view
                    .mutations()
                    .create_card(DeckId(deck_id), CardDraft { front, back })
                    .await?;
                println!("added card {} to deck {}", card.id, card.deck_id);
            }
            Command::EditCard {
                card_id,
                front,
                back,
            } => {
                let card_view = CardView::card(Arc::clone(&self.api), self.bus.clone());
                card_view.mount(CardId(card_id)).await?;
                let mut card = card_view
                    .snapshot()
                    .ready()
                    .cloned()
                    .ok_or_else(|| anyhow!("card {card_id} did not load"))?;
                card_view.unmount();
                if let Some(front) = front {
                    card.front = front;
                }
                if let Some(back) = back {
                    card.back = back;
                }
                let card = self.deck_view().mutations().update_card(card).await?;
                println!("updated card {}", card.id);
                self.report_navigation();
            }
            Command::DeleteCard { deck_id, card_id } => {
                let (view, deck) = self.load_deck(deck_id).await?;
                let card = deck
                    .card(CardId(card_id))
                    .ok_or_else(|| anyhow!("deck {deck_id} has no card {card_id}"))?;
                println!("{} / {}", card.front, card.back);
                report_delete(view.delete_card(CardId(card_id)).await?, "card");
                self.report_navigation();
            }
        }
        Ok(())
    }
}

fn print_deck(deck: &Deck) {
    println!("{} (deck {})", deck.name, deck.id);
    if !deck.description.is_empty() {
        println!("{}", deck.description);
    }
    for card in &deck.cards {
        println!("{:>4}  {}  |  {}", card.id, card.front, card.back);
    }
}

fn report_delete(outcome: DeleteOutcome, what: &str) {
    match outcome {
        DeleteOutcome::Deleted => println!("{what} deleted"),
        DeleteOutcome::Declined => println!("{what} kept"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref(), cli.server_url)?;
    tracing::debug!(server_url = %settings.server_url, "client settings loaded");

    let console = Console::stdin();
    let app = App {
        api: Arc::new(HttpDeckApi::new(&settings.server_url)?),
        bus: InvalidationBus::new(),
        navigator: Arc::new(TerminalNavigator::default()),
        confirm: Arc::new(TerminalConfirm::new(Arc::clone(&console), cli.yes)),
        console,
    };
    app.run(cli.command).await
}
