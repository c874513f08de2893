use tracing::info;
use tracing::level_filters::LevelFilter;

use rand::prelude::*;

use std::time::*;

use wpfimine::{run, MiningConfig, Strategy, UncertainDatabase, WeightTable};
use wpfimine::data::synthetic::{generate_transactions, generate_weight_table, ProbabilityAssigner};

const SEED: u64 = 17;
const TRANSACTIONS: usize = 2000;
const ITEMS: usize = 40;
const DENSITY: f64 = 0.25;

fn main() -> Result<(), String> {
    prepare_logging();

    let mut rng = StdRng::seed_from_u64( SEED );
    let rows = generate_transactions( TRANSACTIONS, ITEMS, DENSITY, &mut rng );
    let database = ProbabilityAssigner::new().assign( &rows, &mut rng ).map_err( |err| err.to_string() )?;
    let weights = generate_weight_table( database.universe(), &mut rng ).map_err( |err| err.to_string() )?;
    info!( "Generated {} transactions over {} items", database.len(), database.universe().len() );

    for minsup_ratio in [0.05, 0.1, 0.2, 0.3] {
	for strategy in [Strategy::WeightOrder, Strategy::StatisticalBound] {
	    benchmark_strategy( &database, &weights, minsup_ratio, strategy )?;
	}
    }

    Result::Ok( () )
}

fn benchmark_strategy( database: &UncertainDatabase, weights: &WeightTable, minsup_ratio: f64, strategy: Strategy ) -> Result<(), String> {
    info!( "Start benchmark: {strategy} with minsup ratio {minsup_ratio}" );
    let config = MiningConfig::new( minsup_ratio, 0.3, 0.6, strategy );
    let start = Instant::now();
    let result = run( database, weights, &config ).map_err( |err| err.to_string() )?;
    let time = start.elapsed();

    for diagnostics in result.diagnostics() {
	info!( "level {}: {} candidates, {} counted, {} accepted in {}ms",
	       diagnostics.size, diagnostics.generated, diagnostics.counted, diagnostics.accepted, diagnostics.elapsed.as_millis() );
    }
    if let Some( bound ) = result.rate_bound() {
	info!( "mu* = {bound:.6}" );
    }
    info!( "Result: {} itemsets in {}ms", result.itemset_count(), time.as_millis() );
    Ok( () )
}

fn prepare_logging() {
    let subscriber = tracing_subscriber::fmt::fmt()
	.with_max_level( LevelFilter::INFO )
	.finish();
    tracing::subscriber::set_global_default( subscriber ).expect( "no other subscriber is installed" );
}
