pub const FALLBACK_CONFIDENCE: f64 = -1.0;
pub const DEFAULT_VALUE_COUNT: usize = 2;
