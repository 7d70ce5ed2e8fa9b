//! Named constructors for CREATE_RESOURCE.

use crate::core::engine::{Bm25Params, MultiValueKeyMaker, ValueCountMatchSpy, Weighting};
use crate::driver::codec::Decoder;
use crate::driver::error::{DriverError, DriverResult};
use crate::driver::registry::Resource;

pub const BOOL_WEIGHT: &str = "bool_weight";
pub const BM25_WEIGHT: &str = "bm25_weight";
pub const TRAD_WEIGHT: &str = "trad_weight";
pub const VALUE_COUNT_MATCH_SPY: &str = "value_count_match_spy";
pub const MULTI_VALUE_KEY_MAKER: &str = "multi_value_key_maker";

/// Every constructor name the server knows
pub const CONSTRUCTORS: [&str; 5] = [
    BOOL_WEIGHT,
    BM25_WEIGHT,
    TRAD_WEIGHT,
    VALUE_COUNT_MATCH_SPY,
    MULTI_VALUE_KEY_MAKER,
];

fn non_negative(name: &str, value: f64) -> DriverResult<f64> {
    if value.is_nan() || value < 0.0 {
        return Err(DriverError::BadArgument(format!(
            "{name} must be a non-negative number, got {value}"
        )));
    }
    Ok(value)
}

/// Read a constructor name and its parameters and build the object
pub fn construct(dec: &mut Decoder<'_>) -> DriverResult<Resource> {
    let name = dec.read_string()?;
    match name.as_str() {
        BOOL_WEIGHT => Ok(Resource::Weight(Weighting::Bool)),
        BM25_WEIGHT => {
            let params = Bm25Params {
                k1: non_negative("k1", dec.read_f64()?)?,
                k2: non_negative("k2", dec.read_f64()?)?,
                k3: non_negative("k3", dec.read_f64()?)?,
                b: dec.read_f64()?,
                min_normlen: non_negative("min_normlen", dec.read_f64()?)?,
            };
            if !(0.0..=1.0).contains(&params.b) {
                return Err(DriverError::BadArgument(format!(
                    "b must be between 0 and 1, got {}",
                    params.b
                )));
            }
            Ok(Resource::Weight(Weighting::Bm25(params)))
        }
        TRAD_WEIGHT => Ok(Resource::Weight(Weighting::Trad {
            k: non_negative("k", dec.read_f64()?)?,
        })),
        VALUE_COUNT_MATCH_SPY => Ok(Resource::MatchSpy(ValueCountMatchSpy::new(dec.read_u32()?))),
        MULTI_VALUE_KEY_MAKER => {
            let count = dec.read_u32()?;
            let mut maker = MultiValueKeyMaker::new();
            for _ in 0..count {
                let slot = dec.read_u32()?;
                let reverse = dec.read_bool()?;
                maker.add_value(slot, reverse);
            }
            Ok(Resource::KeyMaker(maker))
        }
        other => Err(DriverError::BadArgument(format!(
            "Unknown resource constructor '{other}'"
        ))),
    }
}
