use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use trackfetch_api::*;
use trackfetch_core::factories::{
    core_consumer::CoreConsumerModConfig, mem_producer::MemProducerConfig,
    MemProducer, MemTransport,
};

/// Trackfetch showcase: follow the live tracks of a simulated producer.
#[derive(clap::Parser)]
struct Args {
    /// Json config file. Missing keys take their defaults.
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Print the default config and exit.
    #[arg(long)]
    print_default_config: bool,

    /// How many tracks the simulated producer publishes.
    #[arg(long, default_value_t = 2)]
    tracks: u32,

    /// Milliseconds between two items of a simulated track.
    #[arg(long, default_value_t = 100)]
    item_interval_ms: u32,

    /// Lose every nth track interest. 0 loses nothing.
    #[arg(long, default_value_t = 0)]
    lose_every: u64,

    /// Stop after this many seconds instead of running until ctrl-c.
    #[arg(long)]
    run_secs: Option<u64>,

    /// Write logs to a file in this directory instead of stderr.
    #[arg(long)]
    log_dir: Option<std::path::PathBuf>,
}

/// Prints every delivered track item to stdout.
#[derive(Debug)]
struct PrintDisplay;

impl DisplayHandler for PrintDisplay {
    fn display(&self, record: TrackRecord) {
        println!("{} {} {}", record.track_id, record.seq, record.payload);
    }
}

#[tokio::main]
async fn main() {
    let args = <Args as clap::Parser>::parse();

    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();
    let _guard = match &args.log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::never(
                dir,
                format!(
                    "{}-{}.log",
                    env!("CARGO_PKG_NAME"),
                    std::process::id()
                ),
            );
            let (non_blocking, guard) =
                tracing_appender::non_blocking(file_appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(non_blocking)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    };

    if let Err(err) = run(args).await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> TfResult<()> {
    let mut config = trackfetch_core::default_config()?;

    if args.print_default_config {
        println!("{}", config.to_json()?);
        return Ok(());
    }

    if let Some(path) = &args.config {
        let json = std::fs::read_to_string(path)
            .map_err(|e| TfError::other_src("read config file", e))?;
        config = Config::from_json(&json)?;
    }

    let factory = trackfetch_core::default_consumer_factory();
    factory.validate_config(&config)?;
    let consumer_config =
        config.get_module_config::<CoreConsumerModConfig>()?.core_consumer;

    let transport = MemTransport::create();
    if args.lose_every > 0 {
        let lose_every = args.lose_every;
        let count = AtomicU64::new(0);
        transport.set_loss(move |interest| {
            interest.name.get(-3)
                == Some(&NameComponent::from(name::TRACKS_COMPONENT))
                && count.fetch_add(1, Ordering::Relaxed) % lose_every
                    == lose_every - 1
        });
    }

    let time_partition = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_err(|e| TfError::other_src("system clock", e))?
        .as_secs();
    let _producer = MemProducer::create(
        MemProducerConfig {
            item_interval_ms: args.item_interval_ms,
            ..Default::default()
        },
        transport.clone(),
        &consumer_config.prefix()?,
        NameComponent::from(time_partition),
        (0..args.tracks).map(TrackId::new),
    )?;

    let consumer = factory
        .create(&config, transport, Arc::new(PrintDisplay))
        .await?;
    consumer.start();

    match args.run_secs {
        Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
        None => {
            tokio::signal::ctrl_c()
                .await
                .map_err(|e| TfError::other_src("wait for ctrl-c", e))?;
        }
    }

    let status = consumer.status().await?;
    for track in status.tracks {
        tracing::info!(
            track_id = %track.track_id,
            last_received_seq = track.last_received_seq,
            last_issued_seq = track.last_issued_seq,
            "final track state"
        );
    }

    Ok(())
}
