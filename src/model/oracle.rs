
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::data::{Count, Itemset};
use crate::error::{MiningError, Result};

use super::{existential_probability, Level, RunContext};

/// Decides which candidates of a level are weighted probabilistic frequent.
pub struct FrequentnessOracle<'c, 'a> {
    context: &'c RunContext<'a>,
}

/// Accepted level of one scan together with its candidate counts
#[derive( Debug, Clone )]
pub struct ScanOutcome {
    pub level: Level,
    /// candidates handed to the scan
    pub generated: usize,
    /// candidates that passed the support prefilter
    pub counted: usize,
}

impl <'c, 'a> FrequentnessOracle<'c, 'a> {
    pub fn new( context: &'c RunContext<'a> ) -> FrequentnessOracle<'c, 'a> {
	FrequentnessOracle{ context }
    }

    /// Filters candidates of the given size in two stages.
    ///
    /// One pass over the database counts every candidate and drops those contained in fewer than
    /// minsup transactions. Only the survivors get their existential probability computed, and
    /// are accepted if weight * Pr reaches the threshold.
    pub fn scan( &self, size: usize, candidates: &[Itemset] ) -> Result<ScanOutcome> {
	if candidates.iter().any( |candidate| candidate.is_empty() ) {
	    return Err( MiningError::ArithmeticDegeneracy );
	}
	let parameters = self.context.parameters();
	let minsup: Count = parameters.minsup();
	let database = self.context.database();
	let weights = self.context.weights();

	let supports = database.count_supports( candidates );
	let survivors: Vec<&Itemset> = candidates.iter()
	    .zip( supports.iter() )
	    .filter( |(_, support)| **support >= minsup )
	    .map( |(candidate, _)| candidate )
	    .collect();

	let evaluated = survivors.par_iter()
	    .map( |candidate| -> Result<(&Itemset, f64, f64)> {
		let weight = weights.itemset_weight( candidate )?;
		let probability = existential_probability( database, candidate, minsup );
		Ok( (*candidate, weight, probability) )
	    })
	    .collect::<Result<Vec<_>>>()?;

	let mut level = Level::new( size );
	for (candidate, weight, probability) in evaluated {
	    trace!( "{candidate} has probability {probability:.6}" );
	    if weight * probability >= parameters.threshold() {
		debug!( "accepted {candidate} with weight {weight:.4}, probability {probability:.4}" );
		level.accept( candidate.clone(), probability );
	    } else {
		debug!( "rejected {candidate} with weight {weight:.4}, probability {probability:.4}" );
	    }
	}

	Ok( ScanOutcome{ level, generated: candidates.len(), counted: survivors.len() } )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::UncertainDatabase;
    use crate::model::{RunParameters, WeightTable};

    #[test]
    fn test_two_stage_acceptance() {
	let database = UncertainDatabase::from_rows( vec!(
	    vec!( (1, 0.9), (2, 0.8) ),
	    vec!( (1, 0.9), (2, 0.5), (3, 0.2) ),
	    vec!( (2, 0.6), (3, 0.3) ),
	)).unwrap();
	let weights = WeightTable::new( vec!( (1, 1.0), (2, 0.6), (3, 1.0) )).unwrap();
	let parameters = RunParameters::new( 2, 0.4, 0.6, &weights ).unwrap();
	let context = RunContext::new( &database, &weights, parameters ).unwrap();
	let oracle = FrequentnessOracle::new( &context );

	let candidates: Vec<Itemset> = vec!( 1, 2, 3 ).into_iter().map( Itemset::singleton ).collect();
	let outcome = oracle.scan( 1, &candidates ).unwrap();
	assert_eq!( outcome.generated, 3 );
	// every item occurs in at least two transactions
	assert_eq!( outcome.counted, 3 );
	// weighted: {1} 0.81, {2} 0.6 * 0.7, {3} 0.06
	assert_approx!( outcome.level.probability( &Itemset::singleton( 1 )).unwrap(), 0.81, 1e-12 );
	assert!( outcome.level.contains( &Itemset::singleton( 2 )));
	assert!( !outcome.level.contains( &Itemset::singleton( 3 )));

	// {1, 3} occurs once only and never reaches the probability stage
	let pairs = vec!( Itemset::new( vec!( 1, 2 )), Itemset::new( vec!( 1, 3 )));
	let outcome = oracle.scan( 2, &pairs ).unwrap();
	assert_eq!( outcome.counted, 1 );
	assert_eq!( outcome.level.size(), 2 );
    }

    #[test]
    fn test_empty_candidate_is_degenerate() {
	let database = UncertainDatabase::from_certain( vec!( vec!( 1 ))).unwrap();
	let weights = WeightTable::uniform( database.universe(), 1.0 ).unwrap();
	let parameters = RunParameters::new( 1, 0.5, 0.6, &weights ).unwrap();
	let context = RunContext::new( &database, &weights, parameters ).unwrap();
	let oracle = FrequentnessOracle::new( &context );
	assert!( matches!( oracle.scan( 0, &[Itemset::default()] ), Err( MiningError::ArithmeticDegeneracy )));
	assert_eq!( oracle.scan( 1, &[] ).unwrap().level.len(), 0 );
    }
}
