//! sealpir: plan, pack and query a synthetic database end to end
//!
//! Generates random items, runs the full client/server exchange for a few
//! random indices through the wire format and checks every recovered item.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use eyre::{bail, Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use sealpir::pir::{
    plan_with, ClientSession, GaloisKeyMessage, PlanConfig, QueryMessage, ReplyMessage,
    ServerSession,
};

#[derive(Parser)]
#[command(name = "sealpir")]
#[command(about = "SealPIR private information retrieval demo")]
#[command(version)]
struct Args {
    /// Number of items in the database
    num_items: u64,

    /// Size of every item in bytes
    item_bytes: usize,

    /// JSON file with planner overrides
    #[arg(long)]
    config: Option<PathBuf>,

    /// Force the ring dimension
    #[arg(long)]
    poly_degree: Option<usize>,

    /// Force the plaintext width in bits
    #[arg(long)]
    plaintext_bits: Option<u32>,

    /// Force the hypercube dimension count
    #[arg(long)]
    dimensions: Option<usize>,

    /// Number of shards answered by one query
    #[arg(long)]
    shards: Option<usize>,

    /// Random queries to run
    #[arg(long, default_value = "4")]
    queries: usize,

    /// Seed for the database contents and queried indices
    #[arg(long)]
    seed: Option<u64>,

    /// Print the chosen parameters as JSON and exit
    #[arg(long)]
    plan_only: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match &args.config {
        Some(path) => PlanConfig::from_json_file(path)
            .wrap_err_with(|| format!("Failed to load config {}", path.display()))?,
        None => PlanConfig::default(),
    };
    if args.poly_degree.is_some() {
        config.poly_degree = args.poly_degree;
    }
    if args.plaintext_bits.is_some() {
        config.plaintext_bits = args.plaintext_bits;
    }
    if args.dimensions.is_some() {
        config.dimension_count = args.dimensions;
    }
    if let Some(shards) = args.shards {
        config.shards = shards;
    }

    let params = plan_with(args.num_items, args.item_bytes, &config)
        .wrap_err("No parameters fit this database")?;

    if args.plan_only {
        println!("{}", serde_json::to_string_pretty(&params)?);
        return Ok(());
    }

    info!(
        "Plan: N={} logt={} dims={:?} items/plaintext={} shards={}",
        params.plaintext_coeff_count(),
        params.plaintext_bits(),
        params.dimension_sizes,
        params.items_per_plaintext,
        params.shards
    );

    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    info!("Seed: {}", seed);

    let db_bytes = usize::try_from(args.num_items)
        .ok()
        .and_then(|n| n.checked_mul(args.item_bytes))
        .ok_or_else(|| eyre::eyre!("Database of {} x {} bytes is too large", args.num_items, args.item_bytes))?;
    let mut database = vec![0u8; db_bytes];
    rng.fill(database.as_mut_slice());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message("Packing database...");
    pb.enable_steady_tick(Duration::from_millis(100));

    let pack_start = Instant::now();
    let mut server = ServerSession::new(params.clone())?;
    server.load_database(&database)?;
    pb.finish_with_message("Database packed");
    info!("Pack time: {:.2?}", pack_start.elapsed());

    let mut client = ClientSession::new(params.clone(), 1)?;
    let keys_start = Instant::now();
    let key_bytes = client.galois_keys()?.to_bytes()?;
    server.register_keys(&GaloisKeyMessage::from_bytes(&key_bytes)?)?;
    info!(
        "Galois keys: {:.2} MB, {:.2?}",
        key_bytes.len() as f64 / (1024.0 * 1024.0),
        keys_start.elapsed()
    );

    let pb = ProgressBar::new(args.queries as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let mut answer_time = Duration::ZERO;
    let mut query_size = 0;
    let mut reply_size = 0;
    for _ in 0..args.queries {
        let index = rng.gen_range(0..args.num_items);

        let (state, query) = client.build_query(index)?;
        let query_bytes = query.to_bytes()?;
        query_size = query_bytes.len();

        let start = Instant::now();
        let reply = server.answer(&QueryMessage::from_bytes(&query_bytes)?)?;
        answer_time += start.elapsed();

        let reply_bytes = reply.to_bytes()?;
        reply_size = reply_bytes.len();
        let item = client.recover(&state, &ReplyMessage::from_bytes(&reply_bytes)?)?;

        let offset = index as usize * args.item_bytes;
        if item != database[offset..offset + args.item_bytes] {
            bail!("Item {} recovered incorrectly", index);
        }
        pb.inc(1);
    }
    pb.finish_with_message("Done");

    println!();
    println!("=== SealPIR ===");
    println!("Items: {} x {} bytes", args.num_items, args.item_bytes);
    println!("Dimensions: {:?}", params.dimension_sizes);
    println!(
        "Query: {} ciphertexts, {:.2} KB",
        params.query_ciphertexts(),
        query_size as f64 / 1024.0
    );
    println!(
        "Reply: {} ciphertexts, {:.2} KB",
        params.reply_ciphertexts(),
        reply_size as f64 / 1024.0
    );
    if args.queries > 0 {
        println!("Answer time: {:.2?} per query", answer_time / args.queries as u32);
    }
    println!("All {} queries verified", args.queries);

    Ok(())
}
