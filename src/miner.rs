
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::*;
use crate::model::{CandidateGenerator, FrequentnessOracle, ScanOutcome, StatisticalBoundPruning, WeightOrderPruning};

mod serialize;

pub use serialize::MiningReportFormatter;

pub trait Miner {
    /// Mines all weighted probabilistic frequent itemsets of the context's database.
    fn mine( &self, context: &RunContext, strategy: Strategy ) -> Result<MiningResult>;
}

/// Level-wise search: seed with the singletons, then alternate generation and scan until a level comes out empty.
pub struct AprioriMiner {
    time_budget: Option<Duration>,
}

/// Counts and timing of one generate and scan round
#[derive( Debug, Clone, PartialEq )]
pub struct LevelDiagnostics {
    /// size of the candidates
    pub size: usize,
    pub generated: usize,
    /// candidates with support of at least minsup
    pub counted: usize,
    pub accepted: usize,
    pub elapsed: Duration,
}

/// Why the search stopped
#[derive( Debug, Clone, Copy, PartialEq, Eq, Serialize )]
#[serde( rename_all = "snake_case" )]
pub enum Termination {
    /// a level without accepted itemsets was reached
    Exhausted,
    /// the time budget ran out between two levels
    TimeBudget,
}

/// All accepted levels of a run, in order of size, with per level diagnostics.
#[derive( Debug, Clone )]
pub struct MiningResult {
    parameters: RunParameters,
    strategy: Strategy,
    /// mu*, if the strategy uses it
    rate_bound: Option<f64>,
    levels: Vec<Level>,
    diagnostics: Vec<LevelDiagnostics>,
    termination: Termination,
    elapsed: Duration,
}

/// Validates the configuration, derives the run parameters and mines the database.
pub fn run( database: &UncertainDatabase, weights: &WeightTable, config: &MiningConfig ) -> Result<MiningResult> {
    let parameters = RunParameters::from_config( config, database, weights )?;
    let context = RunContext::new( database, weights, parameters )?;
    info!( "mining {} transactions over {} items, minsup {}, threshold {}, strategy {}",
	   database.len(), database.universe().len(), parameters.minsup(), parameters.threshold(), config.strategy );

    let miner = match config.time_budget {
	Some( budget ) => AprioriMiner::with_time_budget( budget ),
	None => AprioriMiner::new(),
    };
    miner.mine( &context, config.strategy )
}

impl Miner for AprioriMiner {
    fn mine( &self, context: &RunContext, strategy: Strategy ) -> Result<MiningResult> {
	let start = Instant::now();
	let generator: Box<dyn CandidateGenerator + '_> = match strategy {
	    Strategy::WeightOrder => Box::new( WeightOrderPruning::new( context )),
	    Strategy::StatisticalBound => Box::new( StatisticalBoundPruning::new( context )? ),
	};
	let oracle = FrequentnessOracle::new( context );

	let mut levels: Vec<Level> = Vec::new();
	let mut diagnostics: Vec<LevelDiagnostics> = Vec::new();
	let mut termination = Termination::Exhausted;

	let mut current = {
	    let _span = info_span!( "level", k = 1 ).entered();
	    let level_start = Instant::now();
	    let singletons: Vec<Itemset> = context.universe().iter().map( |item| Itemset::singleton( *item )).collect();
	    let outcome = oracle.scan( 1, &singletons )?;
	    diagnostics.push( record( &outcome, level_start ));
	    outcome.level
	};

	while !current.is_empty() {
	    current.log( "accepted", tracing::Level::DEBUG );
	    levels.push( current );
	    let last = levels.last().expect( "a level was just added" );

	    if let Some( budget ) = self.time_budget {
		if start.elapsed() >= budget {
		    warn!( "time budget of {budget:?} exhausted after level {}", last.size() );
		    termination = Termination::TimeBudget;
		    break;
		}
	    }

	    let size = last.size() + 1;
	    let _span = info_span!( "level", k = size ).entered();
	    let level_start = Instant::now();
	    let candidates = generator.generate( last )?;
	    let outcome = oracle.scan( size, &candidates )?;
	    diagnostics.push( record( &outcome, level_start ));
	    current = outcome.level;
	}

	let result = MiningResult{
	    parameters: *context.parameters(),
	    strategy: generator.strategy(),
	    rate_bound: generator.rate_bound(),
	    levels,
	    diagnostics,
	    termination,
	    elapsed: start.elapsed(),
	};
	info!( "found {} itemsets in {} levels, {:?}", result.itemset_count(), result.levels.len(), result.termination );
	Ok( result )
    }
}

fn record( outcome: &ScanOutcome, level_start: Instant ) -> LevelDiagnostics {
    let diagnostics = LevelDiagnostics{
	size: outcome.level.size(),
	generated: outcome.generated,
	counted: outcome.counted,
	accepted: outcome.level.len(),
	elapsed: level_start.elapsed(),
    };
    info!( "{} candidates, {} pass the support count, {} accepted", diagnostics.generated, diagnostics.counted, diagnostics.accepted );
    diagnostics
}

impl AprioriMiner {
    pub fn new() -> AprioriMiner {
	AprioriMiner{ time_budget: None }
    }

    /// Stops after the first level that completes once the budget is used up
    pub fn with_time_budget( budget: Duration ) -> AprioriMiner {
	AprioriMiner{ time_budget: Some( budget ) }
    }
}

impl Default for AprioriMiner {
    fn default() -> Self {
	AprioriMiner::new()
    }
}

impl MiningResult {
    pub fn parameters( &self ) -> &RunParameters {
	&self.parameters
    }

    pub fn strategy( &self ) -> Strategy {
	self.strategy
    }

    pub fn rate_bound( &self ) -> Option<f64> {
	self.rate_bound
    }

    /// Non-empty accepted levels, the i-th holding itemsets of size i + 1
    pub fn levels( &self ) -> &[Level] {
	&self.levels
    }

    /// One entry per scan, including the final one that accepted nothing
    pub fn diagnostics( &self ) -> &[LevelDiagnostics] {
	&self.diagnostics
    }

    pub fn termination( &self ) -> Termination {
	self.termination
    }

    pub fn elapsed( &self ) -> Duration {
	self.elapsed
    }

    /// Existential probability of an accepted itemset
    pub fn probability( &self, itemset: &Itemset ) -> Option<f64> {
	self.levels.iter()
	    .find( |level| level.size() == itemset.len() )
	    .and_then( |level| level.probability( itemset ))
    }

    pub fn itemset_count( &self ) -> usize {
	self.levels.iter().map( |level| level.len() ).sum()
    }

    /// All accepted itemsets by size, then in canonical order
    pub fn iter<'a>( &'a self ) -> impl Iterator<Item = (&'a Itemset, f64)> + 'a {
	self.levels.iter().flat_map( |level| level.iter() )
    }
}

impl Loggable for MiningResult {
    fn log( &self, message: &str, level: tracing::Level ) {
	log_at( level, &format!( "{message}: {} itemsets, strategy {}, {:?}", self.itemset_count(), self.strategy, self.termination ));
	for accepted in &self.levels {
	    accepted.log( "level", level );
	}
	debug!( "{} scans in {:?}", self.diagnostics.len(), self.elapsed );
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;
    use proptest::strategy::Strategy as _;
    use crate::model::{existential_probability, poisson_survival, ExtendedFloat, Strategy};

    fn classical() -> (UncertainDatabase, WeightTable) {
	let database = UncertainDatabase::from_certain( vec!( vec!( 1, 2 ), vec!( 1, 2, 3 ), vec!( 2, 3 ))).unwrap();
	let weights = WeightTable::uniform( database.universe(), 1.0 ).unwrap();
	(database, weights)
    }

    fn itemsets( level: &Level ) -> Vec<Vec<ItemId>> {
	level.itemsets().map( |itemset| itemset.items().to_vec() ).collect()
    }

    #[test]
    fn test_certain_database_counts_classically() {
	let (database, weights) = classical();
	let parameters = RunParameters::new( 2, 0.5, 0.6, &weights ).unwrap();
	let context = RunContext::new( &database, &weights, parameters ).unwrap();
	let result = AprioriMiner::new().mine( &context, Strategy::WeightOrder ).unwrap();

	assert_eq!( result.levels().len(), 2 );
	assert_eq!( itemsets( &result.levels()[0] ), vec!( vec!( 1 ), vec!( 2 ), vec!( 3 )));
	// {1, 3} occurs once
	assert_eq!( itemsets( &result.levels()[1] ), vec!( vec!( 1, 2 ), vec!( 2, 3 )));
	assert!( result.iter().all( |(_, p)| p == 1.0 ));
	assert_eq!( result.itemset_count(), 5 );
	assert_eq!( result.termination(), Termination::Exhausted );

	// the last scan tried {1, 2, 3} and accepted nothing
	let last = result.diagnostics().last().unwrap();
	assert_eq!( result.diagnostics().len(), 3 );
	assert_eq!( (last.size, last.generated, last.counted, last.accepted), (3, 1, 0, 0) );
	assert_eq!( (result.diagnostics()[1].generated, result.diagnostics()[1].counted), (3, 2) );
    }

    #[test]
    fn test_run_from_config() {
	let (database, weights) = classical();
	// floor( 0.7 * 3 ) = 2
	let config = MiningConfig::new( 0.7, 0.5, 0.6, Strategy::WeightOrder );
	let result = run( &database, &weights, &config ).unwrap();
	assert_eq!( result.parameters().minsup(), 2 );
	assert_eq!( result.probability( &Itemset::new( vec!( 2, 3 ))), Some( 1.0 ));
	assert_eq!( result.probability( &Itemset::new( vec!( 1, 3 ))), None );
	assert_eq!( result.rate_bound(), None );
    }

    #[test]
    fn test_unsatisfiable_threshold() {
	let (database, weights) = classical();
	let parameters = RunParameters::new( 2, 1.1, 0.6, &weights ).unwrap();
	let context = RunContext::new( &database, &weights, parameters ).unwrap();
	for strategy in [Strategy::WeightOrder, Strategy::StatisticalBound] {
	    let result = AprioriMiner::new().mine( &context, strategy ).unwrap();
	    assert!( result.levels().is_empty() );
	    assert_eq!( result.diagnostics().len(), 1 );
	    assert_eq!( result.termination(), Termination::Exhausted );
	}
    }

    #[test]
    fn test_statistical_bound_strategy() {
	let (database, weights) = classical();
	let config = MiningConfig::new( 0.7, 0.5, 0.6, Strategy::StatisticalBound );
	let result = run( &database, &weights, &config ).unwrap();
	assert_eq!( result.strategy(), Strategy::StatisticalBound );

	// 1 - F( 1, mu* ) = t / m = 0.5
	let bound = result.rate_bound().unwrap();
	let reached = poisson_survival( 2, &ExtendedFloat::from_f64( bound ).unwrap() ).unwrap();
	assert!( ( reached - 0.5 ).abs() < 1e-6 );

	// the seed does not depend on the strategy
	assert_eq!( itemsets( &result.levels()[0] ), vec!( vec!( 1 ), vec!( 2 ), vec!( 3 )));
	// support rates of at most 1 never reach mu* of about 1.68
	assert_eq!( result.levels().len(), 1 );
    }

    #[test]
    fn test_rejects_invalid_input() {
	let (database, weights) = classical();
	let too_strict = MiningConfig::new( 0.7, 1.1, 0.6, Strategy::WeightOrder );
	assert!( matches!( run( &database, &weights, &too_strict ), Err( MiningError::InvalidInput( _ ))));

	let empty = UncertainDatabase::new( vec!() );
	assert!( matches!( run( &empty, &weights, &MiningConfig::default() ), Err( MiningError::InvalidInput( _ ))));

	let partial = WeightTable::new( vec!( (1, 1.0), (2, 1.0) )).unwrap();
	assert!( matches!( run( &database, &partial, &MiningConfig::default() ), Err( MiningError::InvalidInput( _ ))));
    }

    #[test]
    fn test_time_budget_stops_between_levels() {
	let (database, weights) = classical();
	let config = MiningConfig::new( 0.7, 0.5, 0.6, Strategy::WeightOrder ).with_time_budget( Duration::ZERO );
	let result = run( &database, &weights, &config ).unwrap();
	assert_eq!( result.termination(), Termination::TimeBudget );
	// the seed level always completes
	assert_eq!( result.levels().len(), 1 );
	assert_eq!( result.diagnostics().len(), 1 );
    }

    #[test]
    fn test_uncertain_probabilities() {
	let database = UncertainDatabase::from_rows( vec!(
	    vec!( (1, 0.9), (2, 0.7) ),
	    vec!( (1, 0.8), (2, 0.9), (3, 0.4) ),
	    vec!( (1, 0.6), (3, 0.5) ),
	    vec!( (2, 1.0) ),
	)).unwrap();
	let weights = WeightTable::new( vec!( (1, 0.9), (2, 0.8), (3, 0.4) )).unwrap();
	let parameters = RunParameters::new( 2, 0.3, 0.6, &weights ).unwrap();
	let context = RunContext::new( &database, &weights, parameters ).unwrap();
	let result = AprioriMiner::new().mine( &context, Strategy::WeightOrder ).unwrap();

	for (itemset, probability) in result.iter() {
	    assert_eq!( probability, existential_probability( &database, itemset, 2 ));
	    assert!( weights.itemset_weight( itemset ).unwrap() * probability >= 0.3 );
	}
	assert!( result.probability( &Itemset::new( vec!( 1, 2 ))).is_some() );
	// {3}: 0.4 * 0.2
	assert_eq!( result.probability( &Itemset::singleton( 3 )), None );
    }

    fn rows_strategy() -> impl proptest::strategy::Strategy<Value = Vec<Vec<(ItemId, f64)>>> {
	let row = prop::collection::btree_map( 0usize .. 6, 0.1f64 ..= 1.0, 1 .. 5 )
	    .prop_map( |items| items.into_iter().collect::<Vec<_>>() );
	prop::collection::vec( row, 1 .. 10 )
    }

    proptest! {
	#![proptest_config( ProptestConfig::with_cases( 64 ))]

	#[test]
	fn mining_terminates_with_sound_levels(
	    rows in rows_strategy(),
	    raw_weights in prop::collection::vec( 0.1f64 ..= 1.0, 6 ),
	    minsup in 1u64 .. 4,
	    threshold in 0.0f64 .. 0.8,
	) {
	    let database = UncertainDatabase::from_rows( rows ).unwrap();
	    prop_assume!( minsup <= database.len() as Count );
	    let weights = WeightTable::new( raw_weights.into_iter().enumerate() ).unwrap();
	    let parameters = RunParameters::new( minsup, threshold, 0.6, &weights ).unwrap();
	    let context = RunContext::new( &database, &weights, parameters ).unwrap();

	    let full = AprioriMiner::new().mine( &context, Strategy::WeightOrder ).unwrap();
	    let bounded = AprioriMiner::new().mine( &context, Strategy::StatisticalBound ).unwrap();
	    for result in [&full, &bounded] {
		prop_assert!( result.levels().len() <= database.universe().len() );
		for (i, level) in result.levels().iter().enumerate() {
		    prop_assert_eq!( level.size(), i + 1 );
		    prop_assert!( !level.is_empty() );
		}
		for (itemset, probability) in result.iter() {
		    prop_assert!( database.query_support( itemset ) >= minsup );
		    prop_assert!( weights.itemset_weight( itemset ).unwrap() * probability >= threshold );
		}
	    }
	    // bound pruning only removes candidates
	    for (itemset, _) in bounded.iter() {
		prop_assert!( full.probability( itemset ).is_some(), "{} only found with the bound", itemset );
	    }
	}
    }
}
