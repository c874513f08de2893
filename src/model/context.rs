
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::data::{Count, ItemId, UncertainDatabase};
use crate::error::{MiningError, Result};

use super::WeightTable;

/// Candidate generation strategy
#[derive( Debug, Clone, Copy, PartialEq, Eq, Serialize )]
#[serde( rename_all = "snake_case" )]
pub enum Strategy {
    /// prune extensions by mean weight only
    WeightOrder,
    /// additionally prune by a Poisson bound on the expected support
    StatisticalBound,
}

/// Caller-facing settings of a mining run.
#[derive( Debug, Clone )]
pub struct MiningConfig {
    /// minimum support as a fraction of the number of transactions
    pub minsup_ratio: f64,
    /// minimum value of weight(X) * Pr(X)
    pub threshold: f64,
    /// scale factor of the joint rate cutoff of the statistical bound
    pub scale_factor: f64,
    pub strategy: Strategy,
    /// stop between levels once exceeded
    pub time_budget: Option<Duration>,
}

/// Absolute parameters of a run. Fixed once created.
#[derive( Debug, Clone, Copy, PartialEq, Serialize )]
pub struct RunParameters {
    minsup: Count,
    threshold: f64,
    alpha: f64,
    max_weight: f64,
}

/// Immutable view of everything a run reads: database, weights, parameters and item supports.
#[derive( Debug )]
pub struct RunContext<'a> {
    database: &'a UncertainDatabase,
    weights: &'a WeightTable,
    parameters: RunParameters,
    supports: FxHashMap<ItemId, Count>,
}

impl fmt::Display for Strategy {
    fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
	match self {
	    Strategy::WeightOrder => write!( f, "weight-order" ),
	    Strategy::StatisticalBound => write!( f, "statistical-bound" ),
	}
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str( s: &str ) -> std::result::Result<Self, Self::Err> {
	match s.to_ascii_lowercase().as_str() {
	    "weight-order" | "weight_order" | "2" => Ok( Strategy::WeightOrder ),
	    "statistical-bound" | "statistical_bound" | "3" => Ok( Strategy::StatisticalBound ),
	    other => Err( format!( "unknown strategy '{other}', expected weight-order or statistical-bound" )),
	}
    }
}

impl Default for MiningConfig {
    fn default() -> Self {
	MiningConfig{
	    minsup_ratio: 0.3,
	    threshold: 0.6,
	    scale_factor: 0.6,
	    strategy: Strategy::WeightOrder,
	    time_budget: None,
	}
    }
}

impl MiningConfig {
    pub fn new( minsup_ratio: f64, threshold: f64, scale_factor: f64, strategy: Strategy ) -> MiningConfig {
	MiningConfig{ minsup_ratio, threshold, scale_factor, strategy, time_budget: None }
    }

    pub fn with_time_budget( mut self, budget: Duration ) -> MiningConfig {
	self.time_budget = Some( budget );
	self
    }

    /// Checks the ranges of the ratio, the threshold and the scale factor.
    pub fn validate( &self ) -> Result<()> {
	if !( 0.0 ..= 1.0 ).contains( &self.minsup_ratio ) {
	    return Err( MiningError::invalid( format!( "minimum support ratio {} is outside [0, 1]", self.minsup_ratio )));
	}
	if !( 0.0 ..= 1.0 ).contains( &self.threshold ) {
	    return Err( MiningError::invalid( format!( "threshold {} is outside [0, 1]", self.threshold )));
	}
	if !( self.scale_factor.is_finite() && self.scale_factor >= 0.0 ) {
	    return Err( MiningError::invalid( format!( "scale factor {} must be finite and non-negative", self.scale_factor )));
	}
	Ok( () )
    }
}

impl RunParameters {
    /// Creates parameters with m taken as the largest weight of the table.
    /// Only checks that the numbers are usable, thresholds above 1 are allowed here.
    pub fn new( minsup: Count, threshold: f64, alpha: f64, weights: &WeightTable ) -> Result<RunParameters> {
	if !( threshold.is_finite() && threshold >= 0.0 ) {
	    return Err( MiningError::invalid( format!( "threshold {threshold} must be finite and non-negative" )));
	}
	if !alpha.is_finite() {
	    return Err( MiningError::invalid( format!( "scale factor {alpha} is not finite" )));
	}
	if weights.is_empty() {
	    return Err( MiningError::invalid( "weight table is empty" ));
	}
	Ok( RunParameters{ minsup, threshold, alpha, max_weight: weights.max_weight() } )
    }

    /// Validates the config and converts the support ratio into a transaction count.
    pub fn from_config( config: &MiningConfig, database: &UncertainDatabase, weights: &WeightTable ) -> Result<RunParameters> {
	config.validate()?;
	if database.is_empty() {
	    return Err( MiningError::invalid( "database has no transactions" ));
	}
	let minsup = ( config.minsup_ratio * database.len() as f64 ).floor() as Count;
	RunParameters::new( minsup, config.threshold, config.scale_factor, weights )
    }

    pub fn minsup( &self ) -> Count { self.minsup }
    pub fn threshold( &self ) -> f64 { self.threshold }
    pub fn alpha( &self ) -> f64 { self.alpha }
    /// m, the largest weight of the table
    pub fn max_weight( &self ) -> f64 { self.max_weight }
}

impl <'a> RunContext<'a> {

    /// Validates the inputs against each other and counts the support of every item.
    pub fn new( database: &'a UncertainDatabase, weights: &'a WeightTable, parameters: RunParameters ) -> Result<RunContext<'a>> {
	if database.is_empty() {
	    return Err( MiningError::invalid( "database has no transactions" ));
	}
	if database.universe().is_empty() {
	    return Err( MiningError::invalid( "item universe is empty" ));
	}
	if parameters.minsup > database.len() as Count {
	    return Err( MiningError::invalid( format!( "minimum support {} exceeds the {} transactions", parameters.minsup, database.len() )));
	}
	if let Some( item ) = database.universe().iter().find( |item| weights.weight( **item ).is_none() ) {
	    return Err( MiningError::invalid( format!( "item {item} has no weight" )));
	}

	Ok( RunContext{
	    database,
	    weights,
	    parameters,
	    supports: database.item_supports(),
	})
    }

    pub fn database( &self ) -> &'a UncertainDatabase {
	self.database
    }

    pub fn weights( &self ) -> &'a WeightTable {
	self.weights
    }

    pub fn parameters( &self ) -> &RunParameters {
	&self.parameters
    }

    /// Number of transactions n
    pub fn len( &self ) -> usize {
	self.database.len()
    }

    pub fn universe( &self ) -> &'a [ItemId] {
	self.database.universe()
    }

    /// cnt(i), the number of transactions containing the item
    pub fn support( &self, item: ItemId ) -> Count {
	self.supports.get( &item ).copied().unwrap_or( 0 )
    }

    /// cnt(i) / n
    pub fn support_rate( &self, item: ItemId ) -> f64 {
	self.support( item ) as f64 / self.len() as f64
    }

    /// Weight of an item of the universe.
    pub fn weight( &self, item: ItemId ) -> f64 {
	self.weights.weight( item ).expect( "universe items are weighted, checked on construction" )
    }
}
