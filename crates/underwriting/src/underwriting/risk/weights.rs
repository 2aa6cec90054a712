//! Additive weight tables. Each category resolves to exactly one band.
//!
//! Weights are held in hundredths so sums compare exactly against decision thresholds.

use super::super::domain::CoverageType;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Band {
    pub label: &'static str,
    pub hundredths: u32,
}

impl Band {
    pub fn weight(self) -> f64 {
        f64::from(self.hundredths) / 100.0
    }
}

const fn band(label: &'static str, hundredths: u32) -> Band {
    Band { label, hundredths }
}

pub(crate) fn driver_age(age: u8) -> Band {
    match age {
        0..=24 => band("under 25", 30),
        25..=34 => band("25 to 34", 20),
        35..=44 => band("35 to 44", 10),
        _ => band("45 and over", 5),
    }
}

pub(crate) fn driving_experience(years: u8) -> Band {
    match years {
        0..=1 => band("under 2 years", 25),
        2..=4 => band("2 to 4 years", 15),
        5..=9 => band("5 to 9 years", 10),
        _ => band("10 years and over", 5),
    }
}

pub(crate) fn accident_history(previous_accidents: u32) -> Band {
    match previous_accidents {
        0 => band("no accidents", 0),
        1 => band("one accident", 20),
        2 => band("two accidents", 40),
        _ => band("more than two accidents", 60),
    }
}

pub(crate) fn vehicle_age(age: i32) -> Band {
    if age < 3 {
        band("under 3 years", 5)
    } else if age < 5 {
        band("3 to 4 years", 10)
    } else if age < 10 {
        band("5 to 9 years", 20)
    } else {
        band("10 years and over", 30)
    }
}

pub(crate) fn coverage_type(coverage_type: CoverageType) -> Band {
    match coverage_type {
        CoverageType::Comprehensive => band("comprehensive", 5),
        CoverageType::Collision => band("collision", 15),
        CoverageType::Liability => band("liability", 25),
    }
}
