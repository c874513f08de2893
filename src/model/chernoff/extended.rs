
use std::cmp::Ordering;
use std::ops::{Add, Mul};

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};

/// Significant bits kept in the mantissa, a little over 57 decimal digits.
pub const PRECISION_BITS: u64 = 192;

/// Non-negative binary floating point number mantissa * 2^exponent with PRECISION_BITS significant bits.
/// Products and sums truncate towards zero; there is no overflow or underflow.
#[derive( Debug, Clone )]
pub struct ExtendedFloat {
    mantissa: BigUint,
    exponent: i64,
}

impl ExtendedFloat {

    pub fn zero() -> ExtendedFloat {
	ExtendedFloat{ mantissa: BigUint::zero(), exponent: 0 }
    }

    pub fn one() -> ExtendedFloat {
	ExtendedFloat{ mantissa: BigUint::one(), exponent: 0 }
    }

    pub fn from_u64( value: u64 ) -> ExtendedFloat {
	ExtendedFloat::normalized( BigUint::from( value ), 0 )
    }

    /// Interprets value as a fixed point number with the given number of fractional bits
    pub fn from_fixed( value: BigUint, fractional_bits: u64 ) -> ExtendedFloat {
	ExtendedFloat::normalized( value, -( fractional_bits as i64 ))
    }

    /// Exact conversion of a finite, non-negative machine float
    pub fn from_f64( value: f64 ) -> Option<ExtendedFloat> {
	if !value.is_finite() || value < 0.0 {
	    return None;
	}
	if value == 0.0 {
	    return Some( ExtendedFloat::zero() );
	}
	let bits = value.to_bits();
	let biased_exponent = ( ( bits >> 52 ) & 0x7ff ) as i64;
	let fraction = bits & ( ( 1u64 << 52 ) - 1 );
	let (mantissa, exponent) = if biased_exponent == 0 {
	    // subnormal
	    (fraction, -1074)
	} else {
	    (fraction | ( 1u64 << 52 ), biased_exponent - 1075)
	};
	Some( ExtendedFloat::normalized( BigUint::from( mantissa ), exponent ))
    }

    pub fn is_zero( &self ) -> bool {
	self.mantissa.is_zero()
    }

    /// Position of the highest set bit, i.e. floor(log2(self)) + 1. None for zero.
    pub fn magnitude( &self ) -> Option<i64> {
	if self.is_zero() {
	    None
	} else {
	    Some( self.exponent + self.mantissa.bits() as i64 )
	}
    }

    /// Divides by a positive integer.
    pub fn div_u64( &self, divisor: u64 ) -> ExtendedFloat {
	assert!( divisor > 0, "division by zero" );
	// widen first so the quotient keeps full precision
	let shift = ( PRECISION_BITS + 64 ).saturating_sub( self.mantissa.bits() );
	let widened: BigUint = &self.mantissa << shift as usize;
	ExtendedFloat::normalized( widened / divisor, self.exponent - shift as i64 )
    }

    /// Quotient self / other rounded to a machine float. None if other is zero.
    pub fn ratio( &self, other: &ExtendedFloat ) -> Option<f64> {
	if other.is_zero() {
	    return None;
	}
	if self.is_zero() {
	    return Some( 0.0 );
	}
	let shift = PRECISION_BITS + 64;
	let quotient: BigUint = ( &self.mantissa << shift as usize ) / &other.mantissa;
	let exponent = self.exponent - other.exponent - shift as i64;
	quotient.to_f64().map( |q| scale_by_power_of_two( q, exponent ))
    }

    /// Nearest machine float, infinite if out of range
    pub fn to_f64( &self ) -> f64 {
	match self.mantissa.to_f64() {
	    Some( m ) => scale_by_power_of_two( m, self.exponent ),
	    None => f64::INFINITY,
	}
    }

    fn normalized( mut mantissa: BigUint, mut exponent: i64 ) -> ExtendedFloat {
	if mantissa.is_zero() {
	    return ExtendedFloat::zero();
	}
	let bits = mantissa.bits();
	if bits > PRECISION_BITS {
	    let excess = bits - PRECISION_BITS;
	    mantissa >>= excess as usize;
	    exponent += excess as i64;
	}
	ExtendedFloat{ mantissa, exponent }
    }
}

impl <'a> Add<&'a ExtendedFloat> for &'a ExtendedFloat {
    type Output = ExtendedFloat;

    fn add( self, other: &'a ExtendedFloat ) -> ExtendedFloat {
	let (large, small) = match ( self.magnitude(), other.magnitude() ) {
	    (None, _) => return other.clone(),
	    (_, None) => return self.clone(),
	    (Some( a ), Some( b )) => if a >= b { (self, other) } else { (other, self) },
	};
	// the smaller summand lies entirely below the kept bits
	let gap = large.magnitude().unwrap_or( 0 ) - small.magnitude().unwrap_or( 0 );
	if gap > PRECISION_BITS as i64 + 2 {
	    return large.clone();
	}
	let exponent = large.exponent.min( small.exponent );
	let aligned_large: BigUint = &large.mantissa << ( large.exponent - exponent ) as usize;
	let aligned_small: BigUint = &small.mantissa << ( small.exponent - exponent ) as usize;
	ExtendedFloat::normalized( aligned_large + aligned_small, exponent )
    }
}

impl <'a> Mul<&'a ExtendedFloat> for &'a ExtendedFloat {
    type Output = ExtendedFloat;

    fn mul( self, other: &'a ExtendedFloat ) -> ExtendedFloat {
	ExtendedFloat::normalized( &self.mantissa * &other.mantissa, self.exponent + other.exponent )
    }
}

impl PartialEq for ExtendedFloat {
    fn eq( &self, other: &Self ) -> bool {
	self.cmp( other ) == Ordering::Equal
    }
}

impl Eq for ExtendedFloat {}

impl PartialOrd for ExtendedFloat {
    fn partial_cmp( &self, other: &Self ) -> Option<Ordering> {
	Some( self.cmp( other ))
    }
}

impl Ord for ExtendedFloat {
    fn cmp( &self, other: &Self ) -> Ordering {
	match ( self.magnitude(), other.magnitude() ) {
	    (None, None) => Ordering::Equal,
	    (None, Some( _ )) => Ordering::Less,
	    (Some( _ ), None) => Ordering::Greater,
	    (Some( a ), Some( b )) if a != b => a.cmp( &b ),
	    _ => {
		let exponent = self.exponent.min( other.exponent );
		let left: BigUint = &self.mantissa << ( self.exponent - exponent ) as usize;
		let right: BigUint = &other.mantissa << ( other.exponent - exponent ) as usize;
		left.cmp( &right )
	    }
	}
    }
}

/// value * 2^exponent without intermediate overflow of the power
fn scale_by_power_of_two( value: f64, exponent: i64 ) -> f64 {
    let exponent = exponent.clamp( -2200, 2200 ) as i32;
    let half = exponent / 2;
    value * 2f64.powi( half ) * 2f64.powi( exponent - half )
}
