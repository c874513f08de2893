
use std::time::Duration;

use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;
use tracing::level_filters::LevelFilter;

use wpfimine::{run, Loggable, MiningConfig, Strategy};
use wpfimine::data::synthetic::{generate_weight_table, ProbabilityAssigner};
use wpfimine::io::{read_uncertain_database, read_weight_table, PrettyFormatter};
use wpfimine::miner::MiningReportFormatter;

/// Mines weighted probabilistic frequent itemsets from an uncertain transaction database
#[derive( Parser, Debug )]
#[command( version, about )]
struct Args {
    /// Transactions in FIMI format, items given as `id` or `id:probability`
    #[arg( long )]
    data: String,

    /// Item weights, one `id weight` pair per line. Drawn uniformly from [0.1, 1] if omitted
    #[arg( long )]
    weights: Option<String>,

    /// Minimum support as a fraction of the transactions
    #[arg( long, default_value_t = 0.3 )]
    minsup_ratio: f64,

    /// Minimum weighted existential probability
    #[arg( long, default_value_t = 0.6 )]
    threshold: f64,

    /// Scale factor of the statistical bound
    #[arg( long, default_value_t = 0.6 )]
    alpha: f64,

    /// weight-order or statistical-bound
    #[arg( long, default_value_t = Strategy::WeightOrder )]
    strategy: Strategy,

    /// Seed for drawn probabilities and weights
    #[arg( long, default_value_t = 0 )]
    seed: u64,

    /// Stop between levels once this many milliseconds have passed
    #[arg( long )]
    time_budget_ms: Option<u64>,

    /// Print the result as JSON
    #[arg( long )]
    json: bool,

    /// Log at debug level
    #[arg( short, long )]
    verbose: bool,
}

fn main() -> Result<(), String> {
    let args = Args::parse();
    prepare_logging( args.verbose )?;

    let mut rng = StdRng::seed_from_u64( args.seed );
    let database = read_uncertain_database( &args.data, &ProbabilityAssigner::new(), &mut rng )
	.map_err( |err| format!( "{}: {err}", args.data ))?;
    info!( "read {} transactions over {} items from {}", database.len(), database.universe().len(), args.data );

    let weights = match &args.weights {
	Some( path ) => read_weight_table( path ).map_err( |err| format!( "{path}: {err}" ))?,
	None => generate_weight_table( database.universe(), &mut rng ).map_err( |err| err.to_string() )?,
    };

    let mut config = MiningConfig::new( args.minsup_ratio, args.threshold, args.alpha, args.strategy );
    if let Some( budget ) = args.time_budget_ms {
	config = config.with_time_budget( Duration::from_millis( budget ));
    }
    let result = run( &database, &weights, &config ).map_err( |err| err.to_string() )?;
    result.log( "mined", tracing::Level::DEBUG );

    if args.json {
	let json = serde_json::to_string_pretty( &result ).map_err( |err| err.to_string() )?;
	println!( "{json}" );
    } else {
	let mut formatter = MiningReportFormatter::new();
	formatter.show_itemsets();
	formatter.with_weights( &weights );
	println!( "{}", formatter.format_pretty( &result ));
    }

    Ok( () )
}

/// Logs to stderr so that stdout only carries the result
fn prepare_logging( verbose: bool ) -> Result<(), String> {
    let level = if verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    let subscriber = tracing_subscriber::fmt::fmt()
	.with_max_level( level )
	.with_writer( std::io::stderr )
	.finish();
    tracing::subscriber::set_global_default( subscriber ).map_err( |err| err.to_string() )
}
