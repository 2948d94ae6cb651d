use anyhow::{Context, Result};
use cinefeed::catalog::{Category, Movie};
use cinefeed::config::{Config, API_KEY_ENV};
use cinefeed::feed::{CatalogState, FeedState, PaginationController};
use cinefeed::playback::PlaybackSource;
use cinefeed::tmdb::TmdbClient;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "cinefeed",
    about = "Browse TMDB popular, top rated and revenue movie catalogs"
)]
struct Args {
    /// Config file (defaults to ~/.config/cinefeed/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of pages to load per feed
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pages: u32,

    /// Only load extra pages for this feed (popular, top-rated, revenue)
    #[arg(long)]
    category: Option<Category>,

    /// Keep loading until row INDEX is no longer near the end of each feed,
    /// as a scrolling UI would
    #[arg(long, value_name = "INDEX")]
    scroll_to: Option<usize>,

    /// Show details and the playback source of a loaded movie
    #[arg(long, value_name = "ID")]
    movie: Option<u64>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => Config::default_path()?,
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let api_key = config.tmdb.api_key_from_env().with_context(|| {
        format!(
            "No TMDB API key: set {} or tmdb.api_key in {}",
            API_KEY_ENV,
            config_path.display()
        )
    })?;

    let http = reqwest::Client::builder()
        .pool_idle_timeout(Duration::from_secs(30))
        .timeout(Duration::from_secs(config.tmdb.timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;
    let client =
        TmdbClient::new(http, &config.tmdb, api_key).context("Failed to create TMDB client")?;
    let controller = PaginationController::new(client);

    for handle in controller.start() {
        handle.await.context("Initial load task failed")?;
    }

    let extra: Vec<Category> = match args.category {
        Some(category) => vec![category],
        None => Category::ALL.to_vec(),
    };
    for _ in 1..args.pages {
        let handles: Vec<_> = extra
            .iter()
            .filter_map(|&category| controller.load_more(category))
            .collect();
        if handles.is_empty() {
            tracing::debug!("All requested feeds have ended");
            break;
        }
        for handle in handles {
            handle.await.context("Page load task failed")?;
        }
    }

    if let Some(index) = args.scroll_to {
        scroll_to(&controller, &extra, index, config.prefetch_threshold).await?;
    }

    let state = controller.snapshot();

    if let Some(id) = args.movie {
        let Some(movie) = controller.movie(id) else {
            eprintln!("Error: movie {} is not in any loaded feed", id);
            std::process::exit(1);
        };
        let playback = PlaybackSource::for_movie(&movie);
        if args.json {
            let value = serde_json::json!({ "movie": movie, "playback": playback });
            println!("{}", serde_json::to_string_pretty(&value)?);
        } else {
            print_movie(&movie, &playback);
        }
        return Ok(());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        print_catalog(&state);
    }
    Ok(())
}

/// Issues `load_more` for every feed whose visible window ending at `index`
/// is within `threshold` items of the end, until none is. A feed that fails
/// is left alone rather than retried.
async fn scroll_to(
    controller: &PaginationController<TmdbClient>,
    categories: &[Category],
    index: usize,
    threshold: usize,
) -> Result<()> {
    loop {
        let state = controller.snapshot();
        let handles: Vec<_> = categories
            .iter()
            .map(|&category| state.feed(category))
            .filter(|feed| feed.last_error().is_none() && feed.is_near_end(index, threshold))
            .filter_map(|feed| controller.load_more(feed.category()))
            .collect();
        if handles.is_empty() {
            return Ok(());
        }
        for handle in handles {
            handle.await.context("Page load task failed")?;
        }
    }
}

fn print_catalog(state: &CatalogState) {
    for feed in state.feeds() {
        print_feed(feed);
        println!();
    }
}

fn print_feed(feed: &FeedState) {
    let status = if feed.end_reached() {
        "end reached".to_string()
    } else {
        format!("next page {}", feed.next_page())
    };
    println!(
        "== {} ({} movies, {})",
        feed.category(),
        feed.items().len(),
        status
    );

    if let Some(error) = feed.last_error() {
        println!("   ! {}", error);
    }

    for movie in feed.items().iter() {
        let year = movie
            .release_year()
            .map(|y| format!(" ({})", y))
            .unwrap_or_default();
        let rating = movie
            .vote_average
            .map(|v| format!("  ★ {:.1}", v))
            .unwrap_or_default();
        println!("   {:>8}  {}{}{}", movie.id, movie.title, year, rating);
    }
}

fn print_movie(movie: &Movie, playback: &PlaybackSource) {
    println!("{} [{}]", movie.title, movie.id);
    if let Some(date) = &movie.release_date {
        println!("Released: {}", date);
    }
    if let Some(rating) = movie.vote_average {
        println!("Rating:   {:.1}/10", rating);
    }
    if let Some(poster) = &movie.poster_url {
        println!("Poster:   {}", poster);
    }
    if let Some(backdrop) = &movie.backdrop_url {
        println!("Backdrop: {}", backdrop);
    }
    if let Some(overview) = &movie.overview {
        println!();
        println!("{}", overview);
    }
    println!();
    println!("Stream:   {}", playback.manifest_url);
    println!("License:  {} ({:?})", playback.license_url, playback.drm);
    println!("DRM id:   {}", playback.drm.system_id());
}
