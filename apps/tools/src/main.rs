use anyhow::Result;
use clap::{Parser, Subcommand};
use shared::protocol::{CardDraft, DeckDraft};
use storage::Storage;

const SAMPLE_DECKS: &[(&str, &str, &[(&str, &str)])] = &[
    (
        "Rendering in React",
        "React's component structure allows for quickly building a complex web application.",
        &[
            (
                "Differentiate between Real DOM and Virtual DOM.",
                "Virtual DOM updates are faster but do not directly update the HTML",
            ),
            (
                "How do you modify the state of a different React component?",
                "Not at all! State is visible to the component only.",
            ),
            (
                "How do you pass data 'down' to a React child component?",
                "As props or via context",
            ),
        ],
    ),
    (
        "React Router",
        "React Router is a collection of navigational components that compose declaratively.",
        &[(
            "What path will match the follow Route?",
            "All paths. A route without a path matches everything.",
        )],
    ),
];

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/flashcards.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Insert the sample decks.
    Seed,
    /// Print every deck with its card count.
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::Seed => {
            for (name, description, cards) in SAMPLE_DECKS {
                let deck = storage
                    .create_deck(&DeckDraft {
                        name: name.to_string(),
                        description: description.to_string(),
                    })
                    .await?;
                for (front, back) in cards.iter() {
                    storage
                        .create_card(
                            deck.id,
                            &CardDraft {
                                front: front.to_string(),
                                back: back.to_string(),
                            },
                        )
                        .await?;
                }
                println!("created deck_id={} cards={}", deck.id, cards.len());
            }
        }
        Command::List => {
            for deck in storage.list_decks().await? {
                println!("{:>4}  {}  ({} cards)", deck.id, deck.name, deck.card_count());
            }
        }
    }

    Ok(())
}
