use crate::digits::{leading_digit, leading_two_digits};
use crate::model::{BenfordDataPoint, Conformity, Value};

/// Expected first-digit frequencies (%), digits 1-9.
pub const EXPECTED_FIRST_DIGIT: [f64; 9] = [30.1, 17.6, 12.5, 9.7, 7.9, 6.7, 5.8, 5.1, 4.6];

/// MAD upper limits for close / acceptable / marginal conformity.
pub const FIRST_DIGIT_MAD_LIMITS: [f64; 3] = [0.006, 0.012, 0.015];
pub const TWO_DIGIT_MAD_LIMITS: [f64; 3] = [0.0012, 0.0018, 0.0022];

/// Expected frequency (%) of a first-two-digits value in 10..=99.
pub fn expected_two_digit(d: u8) -> f64 {
    (1.0 + 1.0 / f64::from(d)).log10() * 100.0
}

pub fn classify_first_digit(mad: f64) -> Conformity {
    classify(mad, &FIRST_DIGIT_MAD_LIMITS)
}

pub fn classify_two_digit(mad: f64) -> Conformity {
    classify(mad, &TWO_DIGIT_MAD_LIMITS)
}

fn classify(mad: f64, limits: &[f64; 3]) -> Conformity {
    if mad <= limits[0] {
        Conformity::Close
    } else if mad <= limits[1] {
        Conformity::Acceptable
    } else if mad <= limits[2] {
        Conformity::MarginallyAcceptable
    } else {
        Conformity::Nonconformity
    }
}

/// Digit-frequency buckets, filled one value at a time during the row pass.
#[derive(Debug, Clone)]
pub struct BenfordCounter {
    first: [usize; 9],
    first_total: usize,
    second: [usize; 90],
    second_total: usize,
}

impl Default for BenfordCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl BenfordCounter {
    pub fn new() -> Self {
        Self {
            first: [0; 9],
            first_total: 0,
            second: [0; 90],
            second_total: 0,
        }
    }

    /// Count one value. Returns whether a first digit was extracted.
    pub fn record(&mut self, value: &Value) -> bool {
        let Some(d) = leading_digit(value) else {
            return false;
        };
        self.first[usize::from(d - 1)] += 1;
        self.first_total += 1;

        if let Some(dd) = leading_two_digits(value) {
            self.second[usize::from(dd - 10)] += 1;
            self.second_total += 1;
        }
        true
    }

    /// Number of values that yielded a first digit.
    pub fn valid_count(&self) -> usize {
        self.first_total
    }

    pub fn finish(&self) -> BenfordReport {
        let first_digit: Vec<BenfordDataPoint> = (1..=9u8)
            .map(|d| {
                let count = self.first[usize::from(d - 1)];
                data_point(d, count, self.first_total, EXPECTED_FIRST_DIGIT[usize::from(d - 1)])
            })
            .collect();

        let two_digit: Vec<BenfordDataPoint> = (10..=99u8)
            .map(|d| {
                let count = self.second[usize::from(d - 10)];
                data_point(d, count, self.second_total, expected_two_digit(d))
            })
            .collect();

        let mad = mean_absolute_deviation(&first_digit);
        let mad_two_digit = mean_absolute_deviation(&two_digit);

        BenfordReport {
            conformity: classify_first_digit(mad),
            conformity_two_digit: classify_two_digit(mad_two_digit),
            first_digit,
            two_digit,
            mad,
            mad_two_digit,
            valid_count: self.first_total,
        }
    }
}

fn data_point(digit: u8, count: usize, total: usize, expected: f64) -> BenfordDataPoint {
    let actual = if total > 0 {
        count as f64 / total as f64 * 100.0
    } else {
        0.0
    };
    BenfordDataPoint {
        digit,
        count,
        actual,
        expected,
    }
}

/// Average of |actual - expected| over all buckets, as proportions.
pub fn mean_absolute_deviation(points: &[BenfordDataPoint]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let sum: f64 = points
        .iter()
        .map(|p| (p.actual / 100.0 - p.expected / 100.0).abs())
        .sum();
    sum / points.len() as f64
}

#[derive(Debug, Clone)]
pub struct BenfordReport {
    pub first_digit: Vec<BenfordDataPoint>,
    pub two_digit: Vec<BenfordDataPoint>,
    pub mad: f64,
    pub mad_two_digit: f64,
    pub conformity: Conformity,
    pub conformity_two_digit: Conformity,
    pub valid_count: usize,
}
