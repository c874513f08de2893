
use num_bigint::BigUint;
use tracing::{debug, warn};

use crate::data::Count;
use crate::error::{MiningError, Result};

use super::RunContext;

mod extended;

pub use extended::ExtendedFloat;
use extended::PRECISION_BITS;

/// Fractional bits of the fixed point rate the bisection works on
const FIXED_POINT_BITS: u64 = 64;
/// Width of the final bisection interval
const TOLERANCE: f64 = 1e-6;
const MAX_BISECTION_ITERATIONS: usize = 200;

/// Finds the smallest Poisson rate mu* whose upper tail Pr( X >= minsup ) reaches t / m.
///
/// An itemset whose expected support is below mu* can not be weighted frequent,
/// so the rate prunes candidates before any probability is computed.
#[derive( Debug, Clone )]
pub struct ChernoffBoundEstimator {
    minsup: Count,
    target: f64,
    /// n, the rate never exceeds the number of transactions
    upper: u64,
}

/// Splits e^mu = sum mu^i / i! into the terms below k and the rest.
fn split_exponential_series( mu: &ExtendedFloat, k: Count ) -> (ExtendedFloat, ExtendedFloat) {
    let peak = mu.to_f64().ceil();
    let mut head = ExtendedFloat::zero();
    let mut tail = ExtendedFloat::zero();
    let mut term = ExtendedFloat::one();
    let mut i: u64 = 0;
    loop {
	if i < k {
	    head = &head + &term;
	} else {
	    tail = &tail + &term;
	}
	i += 1;
	term = ( &term * mu ).div_u64( i );
	if term.is_zero() {
	    break;
	}
	// past the mode the terms only shrink
	if i >= k && i as f64 > peak {
	    if let (Some( t ), Some( s )) = ( term.magnitude(), tail.magnitude() ) {
		if t + PRECISION_BITS as i64 + 8 < s {
		    break;
		}
	    }
	}
    }
    (head, tail)
}

/// Pr( X >= minsup ) for X ~ Poisson( mu ).
///
/// Evaluated as T / (S + T) of the split exponential series, so neither e^-mu nor 1 - cdf is formed.
pub fn poisson_survival( minsup: Count, mu: &ExtendedFloat ) -> Result<f64> {
    if minsup == 0 {
	return Ok( 1.0 );
    }
    let (head, tail) = split_exponential_series( mu, minsup );
    let total = &head + &tail;
    match tail.ratio( &total ) {
	Some( value ) if value.is_finite() => Ok( value.clamp( 0.0, 1.0 )),
	_ => Err( MiningError::PrecisionLoss( format!( "upper tail from {minsup} at rate {}", mu.to_f64() ))),
    }
}

/// Pr( X <= k ) for X ~ Poisson( mu )
pub fn poisson_cdf( k: u64, mu: f64 ) -> Result<f64> {
    let rate = ExtendedFloat::from_f64( mu )
	.ok_or_else( || MiningError::invalid( format!( "Poisson rate {mu} must be finite and non-negative" )))?;
    let (head, tail) = split_exponential_series( &rate, k.saturating_add( 1 ));
    let total = &head + &tail;
    match head.ratio( &total ) {
	Some( value ) if value.is_finite() => Ok( value.clamp( 0.0, 1.0 )),
	_ => Err( MiningError::PrecisionLoss( format!( "distribution up to {k} at rate {mu}" ))),
    }
}

impl ChernoffBoundEstimator {

    pub fn new( minsup: Count, threshold: f64, max_weight: f64, transactions: usize ) -> Result<ChernoffBoundEstimator> {
	if max_weight <= 0.0 || !max_weight.is_finite() {
	    return Err( MiningError::ArithmeticDegeneracy );
	}
	if !( threshold.is_finite() && threshold >= 0.0 ) {
	    return Err( MiningError::invalid( format!( "threshold {threshold} must be finite and non-negative" )));
	}
	Ok( ChernoffBoundEstimator{ minsup, target: threshold / max_weight, upper: transactions as u64 } )
    }

    pub fn from_context( context: &RunContext ) -> Result<ChernoffBoundEstimator> {
	let parameters = context.parameters();
	ChernoffBoundEstimator::new( parameters.minsup(), parameters.threshold(), parameters.max_weight(), context.len() )
    }

    /// t / m, the tail probability mu* has to reach
    pub fn target( &self ) -> f64 {
	self.target
    }

    /// Bisects [0, n] for the rate whose upper tail equals t / m.
    ///
    /// The rate is held in fixed point so the midpoints are exact. If the target is not reached
    /// anywhere in the interval the result is the nearest endpoint.
    pub fn compute_mu( &self ) -> Result<f64> {
	let tolerance = BigUint::from( ( TOLERANCE * 2f64.powi( FIXED_POINT_BITS as i32 )) as u64 );
	let mut low = BigUint::from( 0u32 );
	let mut high = BigUint::from( self.upper ) << FIXED_POINT_BITS as usize;
	let mut iterations = 0;

	while &high - &low > tolerance {
	    if iterations >= MAX_BISECTION_ITERATIONS {
		let width = ExtendedFloat::from_fixed( &high - &low, FIXED_POINT_BITS ).to_f64();
		return Err( MiningError::NonConvergent{ iterations, width } );
	    }
	    let middle: BigUint = ( &low + &high ) >> 1usize;
	    let value = poisson_survival( self.minsup, &ExtendedFloat::from_fixed( middle.clone(), FIXED_POINT_BITS ))?;
	    if value < self.target {
		low = middle;
	    } else {
		high = middle;
	    }
	    iterations += 1;
	}

	let middle = ExtendedFloat::from_fixed( ( &low + &high ) >> 1usize, FIXED_POINT_BITS );
	let mu = middle.to_f64();
	let reached = poisson_survival( self.minsup, &middle )?;
	if ( reached - self.target ).abs() > TOLERANCE {
	    warn!( "rate bound {mu} reaches {reached} instead of {}, target out of range", self.target );
	}
	debug!( "rate bound {mu} for minsup {} after {iterations} bisections", self.minsup );
	if mu.is_finite() {
	    Ok( mu )
	} else {
	    Err( MiningError::PrecisionLoss( "rate bound is not representable".to_string() ))
	}
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use statrs::distribution::{DiscreteCDF, Poisson};

    fn rate( mu: f64 ) -> ExtendedFloat {
	ExtendedFloat::from_f64( mu ).unwrap()
    }

    #[test]
    fn test_matches_reference_cdf() {
	for mu in [0.5, 3.0, 12.5, 40.0] {
	    let reference = Poisson::new( mu ).unwrap();
	    for k in [0u64, 1, 5, 20, 60] {
		let cdf = poisson_cdf( k, mu ).unwrap();
		assert!( ( cdf - reference.cdf( k )).abs() < 1e-9, "mu {mu} k {k}: {cdf} vs {}", reference.cdf( k ));
		// survival from k + 1 is the complement
		let survival = poisson_survival( k + 1, &rate( mu )).unwrap();
		assert!( ( survival + cdf - 1.0 ).abs() < 1e-12 );
	    }
	}
    }

    #[test]
    fn test_edge_rates() {
	assert_eq!( poisson_survival( 0, &rate( 3.0 )).unwrap(), 1.0 );
	assert_eq!( poisson_survival( 1, &ExtendedFloat::zero() ).unwrap(), 0.0 );
	assert_eq!( poisson_cdf( 0, 0.0 ).unwrap(), 1.0 );
	assert!( poisson_cdf( 3, -1.0 ).is_err() );
	assert!( poisson_cdf( 3, f64::NAN ).is_err() );
    }

    #[test]
    fn test_large_rates() {
	// e^-2000 is zero in f64
	assert_eq!( poisson_survival( 1, &rate( 2000.0 )).unwrap(), 1.0 );
	let centre = poisson_cdf( 2000, 2000.0 ).unwrap();
	assert!( centre > 0.5 && centre < 0.52, "{centre}" );

	let reference = Poisson::new( 500.0 ).unwrap();
	for k in [450u64, 500, 550] {
	    assert!( ( poisson_cdf( k, 500.0 ).unwrap() - reference.cdf( k )).abs() < 1e-8 );
	}
    }

    #[test]
    fn test_rate_bound_reaches_target() {
	let estimator = ChernoffBoundEstimator::new( 5, 0.6, 0.9, 100 ).unwrap();
	let mu = estimator.compute_mu().unwrap();
	let reached = poisson_survival( 5, &rate( mu )).unwrap();
	assert!( ( reached - estimator.target() ).abs() < 1e-6, "{reached} vs {}", estimator.target() );

	let reference = 1.0 - Poisson::new( mu ).unwrap().cdf( 4 );
	assert!( ( reference - 2.0 / 3.0 ).abs() < 1e-6 );
    }

    #[test]
    fn test_rate_bound_endpoints() {
	// every rate reaches the target without a support requirement
	let free = ChernoffBoundEstimator::new( 0, 0.6, 0.9, 50 ).unwrap();
	assert!( free.compute_mu().unwrap() < 1e-6 );

	// a target above 1 is never reached, the search ends at n
	let unreachable = ChernoffBoundEstimator::new( 3, 1.0, 0.5, 50 ).unwrap();
	assert!( ( unreachable.compute_mu().unwrap() - 50.0 ).abs() < 1e-5 );

	assert!( matches!( ChernoffBoundEstimator::new( 3, 0.5, 0.0, 50 ), Err( MiningError::ArithmeticDegeneracy )));
    }
}
