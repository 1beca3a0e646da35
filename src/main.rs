//*** START FILE: src/main.rs ***//
use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use storycoach::api::{HttpApi, LocalBackend};
use storycoach::config::{self, Config};
use storycoach::parsing::parse_story_text;
use storycoach::practice::PracticeFilter;
use storycoach::reading::{Rect, Resolution, StaticSelection};
use storycoach::services::{Backend, Speech};
use storycoach::session::Credentials;
use storycoach::store::{JsonFileStore, KeyValueStore};
use storycoach::{AuthMode, CoachApp, CoachError};

const DEFAULT_CONFIG_FILE: &str = "storycoach.toml";

#[derive(Parser, Debug)]
#[command(name = "storycoach", version, about = "Read Chinese stories with lookups, highlights and flashcard practice")]
struct Cli {
    /// TOML config file (defaults to ./storycoach.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use the built-in catalog and dictionary instead of the server
    #[arg(long, global = true)]
    offline: bool,

    /// Echo speech requests to stdout
    #[arg(long, global = true)]
    speak: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the granularity a selection would get
    Classify { text: String },
    Login(CredentialArgs),
    Register(CredentialArgs),
    Logout,
    /// List reading levels
    Levels,
    /// List stories of one level
    Stories {
        #[arg(long)]
        level: String,
    },
    /// Open a story and look up a selection in it
    Read(ReadArgs),
    /// Like `read`, then save the lookup as a flashcard
    Save(ReadArgs),
    /// Replay practice steps over the saved flashcards
    Practice {
        #[arg(long, default_value = "all")]
        filter: PracticeFilter,
        /// Comma separated: next, prev, flip, learn, unlearn, toggle
        #[arg(long, default_value = "")]
        steps: String,
    },
}

#[derive(Args, Debug)]
struct CredentialArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    password: String,
}

#[derive(Args, Debug)]
struct ReadArgs {
    #[arg(long, required_unless_present = "file")]
    story: Option<i64>,
    /// Annotated story text file instead of a catalog story
    #[arg(long, conflicts_with = "story")]
    file: Option<PathBuf>,
    #[arg(long, conflicts_with = "segment")]
    select: Option<String>,
    /// Click on the segment with this index
    #[arg(long)]
    segment: Option<usize>,
    /// Selection rectangle as left,top,width,height
    #[arg(long, value_parser = parse_rect)]
    rect: Option<Rect>,
    /// Read the whole story aloud first
    #[arg(long)]
    listen: bool,
}

fn parse_rect(s: &str) -> Result<Rect, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>().map_err(|e| format!("'{}': {}", p, e)))
        .collect::<Result<_, _>>()?;
    match parts.as_slice() {
        [left, top, width, height] => Ok(Rect { left: *left, top: *top, width: *width, height: *height }),
        _ => Err(format!("expected left,top,width,height, got '{}'", s)),
    }
}

struct EchoSpeech;

impl Speech for EchoSpeech {
    fn speak(&self, text: &str, lang: &str) {
        println!("(speak {}) {}", lang, text);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("storycoach=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => Ok(config::load_config_from_file(&p.to_string_lossy()).map_err(CoachError::Config)?),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            Ok(config::load_config_from_file(DEFAULT_CONFIG_FILE).map_err(CoachError::Config)?)
        }
        None => Ok(Config::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let store = Arc::new(JsonFileStore::open(Path::new(&config.store_path))?);

    if cli.offline {
        let shared: Arc<dyn KeyValueStore> = store.clone();
        let app = CoachApp::new(LocalBackend::persistent(shared), store, &config);
        run(with_speech(app, cli.speak), cli.command, &config).await
    } else {
        let app = CoachApp::new(HttpApi::new(&config.server_url), store, &config);
        run(with_speech(app, cli.speak), cli.command, &config).await
    }
}

fn with_speech<B: Backend>(app: CoachApp<B, JsonFileStore>, speak: bool) -> CoachApp<B, JsonFileStore> {
    if speak {
        app.with_speech(Box::new(EchoSpeech))
    } else {
        app
    }
}

async fn run<B: Backend>(mut app: CoachApp<B, JsonFileStore>, command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Classify { text } => {
            println!("{}", config.granularity.classify(&text));
        }
        Command::Login(args) => sign_in(&mut app, AuthMode::Login, args).await?,
        Command::Register(args) => sign_in(&mut app, AuthMode::Register, args).await?,
        Command::Logout => {
            app.logout();
            println!("Signed out.");
        }
        Command::Levels => {
            require_session(&app)?;
            app.refresh_library().await?;
            for level in app.levels() {
                println!("{}", level);
            }
        }
        Command::Stories { level } => {
            require_session(&app)?;
            app.select_level(&level).await?;
            for story in app.stories() {
                println!("{:>4}  {}", story.id, story.title);
            }
        }
        Command::Read(args) => {
            read(&mut app, &args).await?;
        }
        Command::Save(args) => {
            let resolution = read(&mut app, &args).await?;
            ensure_saveable(&app, resolution.as_ref())?;
            app.save_flashcard().await?;
            println!("Saved. {} flashcard(s) in the collection.", app.practice().state().flashcards.len());
        }
        Command::Practice { filter, steps } => practice(&mut app, filter, &steps).await?,
    }

    match app.error() {
        Some(message) => Err(anyhow!(message.to_string())),
        None => Ok(()),
    }
}

async fn sign_in<B: Backend>(app: &mut CoachApp<B, JsonFileStore>, mode: AuthMode, args: CredentialArgs) -> Result<()> {
    let credentials = Credentials { username: args.username, password: args.password };
    app.authenticate(mode, &credentials).await?;
    println!(
        "Welcome, {}. {} level(s), {} flashcard(s).",
        credentials.username,
        app.levels().len(),
        app.practice().state().flashcards.len()
    );
    Ok(())
}

fn require_session<B: Backend>(app: &CoachApp<B, JsonFileStore>) -> Result<()> {
    if app.session().is_none() {
        bail!("Not signed in. Run `storycoach login` (or `register`) first.");
    }
    Ok(())
}

async fn read<B: Backend>(app: &mut CoachApp<B, JsonFileStore>, args: &ReadArgs) -> Result<Option<Resolution>> {
    match (&args.file, args.story) {
        (Some(path), _) => {
            let contents = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
            app.load_story(parse_story_text(0, &contents)?);
        }
        (None, Some(id)) => {
            require_session(app)?;
            app.select_story(id).await?;
        }
        (None, None) => bail!("Pass --story or --file."),
    }
    if args.listen {
        app.speak_story();
    }

    let resolution = if let Some(text) = &args.select {
        let source = StaticSelection { text: text.clone(), rect: args.rect };
        app.select_from(&source).await
    } else if let Some(segment) = args.segment {
        match app.click_segment(segment, args.rect).await {
            Some(resolution) => Some(resolution),
            None => bail!("No segment {} in this story.", segment),
        }
    } else {
        None
    };

    print_story(app);
    print_bubble(app);
    Ok(resolution)
}

/// Only a bubble from this very lookup may be saved; a failed lookup reports
/// its own error instead.
fn ensure_saveable<B: Backend, S: KeyValueStore>(app: &CoachApp<B, S>, resolution: Option<&Resolution>) -> Result<()> {
    if let Some(Resolution::Failed(e)) = resolution {
        return Err(e.clone().into());
    }
    if app.reading().bubble.is_none() {
        match app.error() {
            Some(message) => bail!(message.to_string()),
            None => bail!("Nothing to save."),
        }
    }
    Ok(())
}

fn print_story<B: Backend>(app: &CoachApp<B, JsonFileStore>) {
    let Some(story) = app.story() else { return };
    let highlighted = app.highlighted_segments();
    println!("{}", story.title);
    let line: Vec<String> = story
        .segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            let text = match &segment.pinyin {
                Some(p) => format!("{}({})", segment.hanzi, p),
                None => segment.hanzi.clone(),
            };
            if highlighted.contains(&i) {
                format!("[{}]", text)
            } else {
                text
            }
        })
        .collect();
    println!("{}", line.join(" "));
}

fn print_bubble<B: Backend>(app: &CoachApp<B, JsonFileStore>) {
    let Some(bubble) = &app.reading().bubble else { return };
    let result = &bubble.result;
    println!();
    println!("{}  {}  <{}>", result.text, result.pinyin, result.granularity);
    println!("  {}", result.translation);
    println!("  at ({:.0}, {:.0})", bubble.x, bubble.y);
}

async fn practice<B: Backend>(app: &mut CoachApp<B, JsonFileStore>, filter: PracticeFilter, steps: &str) -> Result<()> {
    require_session(app)?;
    app.refresh_flashcards().await?;
    app.practice_mut().set_filter(filter);
    print_card(app, "start");

    for step in steps.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let deck = app.practice_mut();
        match step {
            "next" => deck.next(),
            "prev" | "previous" => deck.previous(),
            "flip" => deck.flip(),
            "toggle" => deck.toggle_active_learned(),
            "learn" | "unlearn" => {
                if let Some(id) = deck.active_card().map(|c| c.id) {
                    deck.mark_learned(id, step == "learn");
                }
            }
            other => bail!("Unknown practice step '{}'", other),
        }
        print_card(app, step);
    }
    Ok(())
}

fn print_card<B: Backend>(app: &CoachApp<B, JsonFileStore>, step: &str) {
    let deck = app.practice();
    let cursor = deck.cursor();
    let (Some(index), Some(card)) = (cursor.index, deck.active_card()) else {
        println!("{:>8}: deck empty ({})", step, deck.filter());
        return;
    };
    let learned = if deck.is_learned(card.id) { " (learned)" } else { "" };
    print!("{:>8}: [{}/{}] {}{}", step, index + 1, deck.deck().len(), card.source_text, learned);
    if cursor.show_answer {
        print!("  |  {}  {}", card.pinyin.as_deref().unwrap_or(""), card.translation);
    }
    println!();
}
//*** END FILE: src/main.rs ***//
