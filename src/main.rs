use anki_bridge::{
    anki::{
        CardTemplate,
        ModelRef,
        ModelSchema,
        Tags,
    },
    reconcile::NoteRequest,
    AnkiBridge,
    BridgeConfig,
    Result,
};
use clap::{
    Parser,
    Subcommand,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "anki-bridge")]
#[command(about = "Add notes to Anki without duplicating decks, note types or notes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// AnkiConnect endpoint (overrides config file)
    #[arg(long, global = true, env = "ANKI_CONNECT_URL")]
    url: Option<String>,

    /// Reference cache region, one per profile (overrides config file)
    #[arg(long, global = true)]
    region: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that AnkiConnect is reachable
    Status,
    /// List decks
    Decks,
    /// List note types with at least `min_fields` fields
    Models {
        #[arg(long, default_value = "0")]
        min_fields: usize,
    },
    /// Show the field names of a note type
    Fields { model: String },
    /// Add one note, creating its deck and note type if needed
    AddNote {
        #[arg(long)]
        model: String,
        /// NAME=VALUE, in field order
        #[arg(long = "field", required = true, value_parser = parse_field)]
        fields: Vec<(String, String)>,
        /// Omit to use the currently selected deck
        #[arg(long)]
        deck: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        front: Option<String>,
        #[arg(long)]
        back: Option<String>,
        #[arg(long)]
        css: Option<String>,
        /// Skip the note if its first field already exists for this note type
        #[arg(long)]
        skip_duplicates: bool,
    },
}

fn parse_field(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{}'", raw)),
    }
}

fn default_templates(fields: &[String]) -> (String, String) {
    let front = format!("{{{{{}}}}}", fields[0]);
    let rest: Vec<String> = fields[1..].iter().map(|field| format!("{{{{{}}}}}", field)).collect();
    let back = format!("{{{{FrontSide}}}}<hr id=answer>{}", rest.join("<br>"));
    (front, back)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = BridgeConfig::load();
    if let Some(url) = cli.url {
        config.anki_connect_url = url;
    }
    if let Some(region) = cli.region {
        config.cache_region = region;
    }

    let mut bridge = AnkiBridge::from_config(&config)?;
    if !bridge.is_available().await {
        println!("AnkiConnect is not reachable at {}", config.anki_connect_url);
        return Ok(());
    }

    match cli.command {
        Commands::Status => {
            println!("AnkiConnect is online at {}", config.anki_connect_url);
            println!("Permission: {:?}", bridge.request_permission().await?);
            println!("Selected deck: {}", bridge.selected_deck_name().await?);
        }
        Commands::Decks => {
            for deck in bridge.deck_list().await? {
                println!("{}\t{}", deck.id, deck.name);
            }
        }
        Commands::Models { min_fields } => {
            for model in bridge.model_list(min_fields).await? {
                println!("{}\t{}", model.id, model.name);
            }
        }
        Commands::Fields { model } => {
            match bridge.field_list(&ModelRef::Name(model.clone())).await? {
                Some(fields) => println!("{}", fields.join("\n")),
                None => println!("No note type named '{}'", model),
            }
        }
        Commands::AddNote { model, fields, deck, tags, front, back, css, skip_duplicates } => {
            let (field_names, values): (Vec<String>, Vec<String>) = fields.into_iter().unzip();
            let (default_front, default_back) = default_templates(&field_names);
            let schema = ModelSchema {
                name: model,
                fields: field_names,
                templates: vec![CardTemplate::new(
                    "Card 1",
                    front.unwrap_or(default_front),
                    back.unwrap_or(default_back),
                )],
                css,
            };

            if skip_duplicates {
                if let Some(model_id) =
                    bridge.resolve_model(&schema.name, schema.field_count()).await?
                {
                    let mut batch = vec![values.clone()];
                    let mut batch_tags = vec![Tags::new()];
                    bridge.remove_duplicates(&mut batch, &mut batch_tags, model_id).await?;
                    if batch.is_empty() {
                        println!("Skipped: '{}' already exists", values[0]);
                        return Ok(());
                    }
                }
            }

            let mut request = NoteRequest::new(schema, values).with_tags(tags);
            if let Some(deck) = deck {
                request = request.in_deck(deck);
            }
            let outcome = bridge.submit_note(&request).await?;
            info!("Submission finished: {}", outcome);
            println!("{}", outcome.code());
        }
    }

    Ok(())
}
