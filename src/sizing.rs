//! Clothing size recommendation from chest, waist and shoulder measurements.

use std::fmt;

use serde::Serialize;

use crate::types::{Gender, MeasurementKey, MeasurementSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ClothingSize {
    Xs,
    S,
    M,
    L,
    Xl,
    Xxl,
}

impl ClothingSize {
    pub const ALL: [ClothingSize; 6] = [
        ClothingSize::Xs,
        ClothingSize::S,
        ClothingSize::M,
        ClothingSize::L,
        ClothingSize::Xl,
        ClothingSize::Xxl,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            ClothingSize::Xs => "XS",
            ClothingSize::S => "S",
            ClothingSize::M => "M",
            ClothingSize::L => "L",
            ClothingSize::Xl => "XL",
            ClothingSize::Xxl => "XXL",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }

    /// One size up, saturating at XXL.
    pub fn larger(&self) -> Self {
        Self::ALL[(self.index() + 1).min(Self::ALL.len() - 1)]
    }

    /// One size down, saturating at XS.
    pub fn smaller(&self) -> Self {
        Self::ALL[self.index().saturating_sub(1)]
    }

    pub const fn fit_description(&self) -> &'static str {
        match self {
            ClothingSize::Xs | ClothingSize::S => "Slim fit",
            ClothingSize::M => "Regular fit",
            ClothingSize::L => "Relaxed fit",
            ClothingSize::Xl | ClothingSize::Xxl => "Loose fit",
        }
    }
}

impl fmt::Display for ClothingSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upper bounds (exclusive) of XS..XL; anything above the last is XXL.
type SizeChart = [f64; 5];

fn chest_chart(gender: Gender) -> SizeChart {
    match gender {
        Gender::Male => [86.0, 94.0, 102.0, 110.0, 118.0],
        Gender::Female => [82.0, 88.0, 94.0, 100.0, 108.0],
        Gender::Other => [84.0, 92.0, 100.0, 108.0, 116.0],
    }
}

fn waist_chart(gender: Gender) -> SizeChart {
    match gender {
        Gender::Male => [74.0, 82.0, 90.0, 98.0, 108.0],
        Gender::Female => [64.0, 70.0, 78.0, 88.0, 98.0],
        Gender::Other => [70.0, 78.0, 86.0, 96.0, 106.0],
    }
}

fn average_shoulder(gender: Gender) -> f64 {
    match gender {
        Gender::Male => 45.0,
        Gender::Female => 39.0,
        Gender::Other => 42.0,
    }
}

/// Shoulder deviation from the average that moves shirts and jackets by one size.
const SHOULDER_STEP_CM: f64 = 4.0;

/// Look up a measurement in a chart; absent or invalid measurements give M.
fn lookup(chart: &SizeChart, value: Option<f64>) -> ClothingSize {
    let Some(v) = value.filter(|v| v.is_finite() && *v >= 0.0) else {
        return ClothingSize::M;
    };
    chart
        .iter()
        .position(|&max| v < max)
        .map_or(ClothingSize::Xxl, |i| ClothingSize::ALL[i])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeRecommendation {
    pub tshirt: ClothingSize,
    pub shirt: ClothingSize,
    pub jacket: ClothingSize,
    pub pants: ClothingSize,
}

pub fn recommend_sizes(measurements: &MeasurementSet, gender: Gender) -> SizeRecommendation {
    let upper = lookup(&chest_chart(gender), measurements.get(MeasurementKey::Chest));
    let pants = lookup(&waist_chart(gender), measurements.get(MeasurementKey::Waist));

    let shirt = match measurements.get(MeasurementKey::Shoulder) {
        Some(shoulder) => {
            let diff = shoulder - average_shoulder(gender);
            if diff > SHOULDER_STEP_CM {
                upper.larger()
            } else if diff < -SHOULDER_STEP_CM {
                upper.smaller()
            } else {
                upper
            }
        }
        None => upper,
    };

    SizeRecommendation {
        tshirt: upper,
        shirt,
        jacket: shirt,
        pants,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chart_boundaries_are_half_open() {
        let chart = chest_chart(Gender::Male);
        assert_eq!(lookup(&chart, Some(85.9)), ClothingSize::Xs);
        assert_eq!(lookup(&chart, Some(86.0)), ClothingSize::S);
        assert_eq!(lookup(&chart, Some(117.9)), ClothingSize::Xl);
        assert_eq!(lookup(&chart, Some(118.0)), ClothingSize::Xxl);
        assert_eq!(lookup(&chart, None), ClothingSize::M);
    }

    #[test]
    fn male_recommendation() {
        let set = MeasurementSet::from([
            (MeasurementKey::Chest, 100.0),
            (MeasurementKey::Waist, 85.0),
            (MeasurementKey::Shoulder, 50.0),
        ]);
        let sizes = recommend_sizes(&set, Gender::Male);
        assert_eq!(sizes.tshirt, ClothingSize::M);
        assert_eq!(sizes.shirt, ClothingSize::L);
        assert_eq!(sizes.jacket, ClothingSize::L);
        assert_eq!(sizes.pants, ClothingSize::M);
    }

    #[test]
    fn narrow_shoulders_step_down() {
        let set = MeasurementSet::from([
            (MeasurementKey::Chest, 83.0),
            (MeasurementKey::Shoulder, 34.0),
        ]);
        let sizes = recommend_sizes(&set, Gender::Female);
        assert_eq!(sizes.tshirt, ClothingSize::S);
        assert_eq!(sizes.shirt, ClothingSize::Xs);
        assert_eq!(sizes.pants, ClothingSize::M);
    }

    #[test]
    fn steps_saturate() {
        assert_eq!(ClothingSize::Xxl.larger(), ClothingSize::Xxl);
        assert_eq!(ClothingSize::Xs.smaller(), ClothingSize::Xs);
    }

    #[test]
    fn fit_descriptions() {
        assert_eq!(ClothingSize::S.fit_description(), "Slim fit");
        assert_eq!(ClothingSize::M.fit_description(), "Regular fit");
        assert_eq!(ClothingSize::L.fit_description(), "Relaxed fit");
        assert_eq!(ClothingSize::Xxl.fit_description(), "Loose fit");
    }
}
