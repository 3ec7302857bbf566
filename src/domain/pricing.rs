//! Estimate cost calculation
//!
//! A fixed price table per project type and feature, extra pages priced per
//! page, then linear multipliers for design level and timeline. Both bounds
//! are rounded to the nearest 50.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use super::estimates::{DesignLevel, Feature, ProjectType, Timeline};

/// Pages covered by the base price
pub const INCLUDED_PAGES: u32 = 5;

pub const MAX_PAGES: u32 = 100;

const EXTRA_PAGE_RANGE: (i64, i64) = (80, 150);

const ROUNDING_STEP: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceRange {
    pub min: Decimal,
    pub max: Decimal,
}

impl PriceRange {
    fn from_units((min, max): (i64, i64)) -> Self {
        Self {
            min: Decimal::from(min),
            max: Decimal::from(max),
        }
    }

    fn zero() -> Self {
        Self::from_units((0, 0))
    }

    fn add(self, other: PriceRange) -> Self {
        Self {
            min: self.min + other.min,
            max: self.max + other.max,
        }
    }

    fn scale(self, factor: Decimal) -> Self {
        Self {
            min: self.min * factor,
            max: self.max * factor,
        }
    }
}

fn base_range(project_type: ProjectType) -> (i64, i64) {
    match project_type {
        ProjectType::LandingPage => (500, 1_000),
        ProjectType::Showcase => (1_500, 3_000),
        ProjectType::Ecommerce => (3_000, 6_000),
        ProjectType::WebApp => (5_000, 12_000),
        ProjectType::MobileApp => (8_000, 15_000),
        ProjectType::Redesign => (1_000, 2_500),
        ProjectType::Other => (1_000, 3_000),
    }
}

fn feature_range(feature: Feature) -> (i64, i64) {
    match feature {
        Feature::ContactForm => (100, 200),
        Feature::Blog => (300, 600),
        Feature::Multilingual => (400, 800),
        Feature::Seo => (300, 500),
        Feature::Booking => (500, 1_000),
        Feature::Payment => (600, 1_200),
        Feature::UserAccounts => (800, 1_500),
        Feature::Cms => (500, 1_000),
        Feature::Analytics => (150, 300),
        Feature::Newsletter => (150, 300),
    }
}

fn design_multiplier(level: DesignLevel) -> Decimal {
    match level {
        DesignLevel::Template => Decimal::ONE,
        DesignLevel::Custom => Decimal::new(13, 1),
        DesignLevel::Premium => Decimal::new(16, 1),
    }
}

fn timeline_multiplier(timeline: Timeline) -> Decimal {
    match timeline {
        Timeline::Flexible => Decimal::new(9, 1),
        Timeline::Standard => Decimal::ONE,
        Timeline::Urgent => Decimal::new(13, 1),
    }
}

/// Normalized scope: pages clamped, features deduplicated in input order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EstimateInput {
    pub project_type: ProjectType,
    pub pages: u32,
    pub features: Vec<Feature>,
    pub design_level: DesignLevel,
    pub timeline: Timeline,
}

impl EstimateInput {
    pub fn new(
        project_type: ProjectType,
        pages: u32,
        features: &[Feature],
        design_level: DesignLevel,
        timeline: Timeline,
    ) -> Self {
        let mut unique = Vec::with_capacity(features.len());
        for feature in features {
            if !unique.contains(feature) {
                unique.push(*feature);
            }
        }

        Self {
            project_type,
            pages: pages.clamp(1, MAX_PAGES),
            features: unique,
            design_level,
            timeline,
        }
    }
}

/// Calculation result with the intermediate amounts shown to visitors
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EstimateBreakdown {
    pub base: PriceRange,
    pub extra_pages: u32,
    pub pages: PriceRange,
    pub features: PriceRange,
    pub design_multiplier: Decimal,
    pub timeline_multiplier: Decimal,
    pub total: PriceRange,
}

fn round_to_step(value: Decimal) -> Decimal {
    let step = Decimal::from(ROUNDING_STEP);
    (value / step).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero) * step
}

pub fn calculate(input: &EstimateInput) -> EstimateBreakdown {
    let base = PriceRange::from_units(base_range(input.project_type));

    let extra_pages = input.pages.saturating_sub(INCLUDED_PAGES);
    let pages = PriceRange::from_units(EXTRA_PAGE_RANGE).scale(Decimal::from(extra_pages));

    let features = input
        .features
        .iter()
        .map(|f| PriceRange::from_units(feature_range(*f)))
        .fold(PriceRange::zero(), PriceRange::add);

    let design = design_multiplier(input.design_level);
    let timeline = timeline_multiplier(input.timeline);

    let raw = base.add(pages).add(features).scale(design * timeline);
    let min = round_to_step(raw.min);
    let max = round_to_step(raw.max).max(min);

    EstimateBreakdown {
        base,
        extra_pages,
        pages,
        features,
        design_multiplier: design,
        timeline_multiplier: timeline,
        total: PriceRange { min, max },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(
        project_type: ProjectType,
        pages: u32,
        features: &[Feature],
        design_level: DesignLevel,
        timeline: Timeline,
    ) -> EstimateInput {
        EstimateInput::new(project_type, pages, features, design_level, timeline)
    }

    #[test]
    fn base_price_only() {
        let result = calculate(&input(
            ProjectType::LandingPage,
            1,
            &[],
            DesignLevel::Template,
            Timeline::Standard,
        ));
        assert_eq!(result.total.min, Decimal::from(500));
        assert_eq!(result.total.max, Decimal::from(1000));
        assert_eq!(result.extra_pages, 0);
    }

    #[test]
    fn pages_features_and_multipliers_combine() {
        // (1500 + 3*80 + 300 + 300) * 1.3 * 1.3 = 3954.6 -> 3950
        // (3000 + 3*150 + 600 + 500) * 1.3 * 1.3 = 7689.5 -> 7700
        let result = calculate(&input(
            ProjectType::Showcase,
            8,
            &[Feature::Blog, Feature::Seo],
            DesignLevel::Custom,
            Timeline::Urgent,
        ));
        assert_eq!(result.extra_pages, 3);
        assert_eq!(result.pages.min, Decimal::from(240));
        assert_eq!(result.pages.max, Decimal::from(450));
        assert_eq!(result.features.min, Decimal::from(600));
        assert_eq!(result.features.max, Decimal::from(1100));
        assert_eq!(result.total.min, Decimal::from(3950));
        assert_eq!(result.total.max, Decimal::from(7700));
    }

    #[test]
    fn flexible_timeline_discounts() {
        let result = calculate(&input(
            ProjectType::LandingPage,
            3,
            &[],
            DesignLevel::Template,
            Timeline::Flexible,
        ));
        assert_eq!(result.total.min, Decimal::from(450));
        assert_eq!(result.total.max, Decimal::from(900));
    }

    #[test]
    fn duplicate_features_count_once() {
        let once = calculate(&input(
            ProjectType::WebApp,
            5,
            &[Feature::Payment],
            DesignLevel::Premium,
            Timeline::Standard,
        ));
        let twice = calculate(&input(
            ProjectType::WebApp,
            5,
            &[Feature::Payment, Feature::Payment],
            DesignLevel::Premium,
            Timeline::Standard,
        ));
        assert_eq!(once, twice);
    }

    #[test]
    fn page_count_is_clamped() {
        let zero = input(
            ProjectType::Other,
            0,
            &[],
            DesignLevel::Template,
            Timeline::Standard,
        );
        assert_eq!(zero.pages, 1);

        let huge = input(
            ProjectType::Other,
            10_000,
            &[],
            DesignLevel::Template,
            Timeline::Standard,
        );
        assert_eq!(huge.pages, MAX_PAGES);
    }

    #[test]
    fn bounds_are_multiples_of_fifty_and_ordered() {
        for project_type in ProjectType::ALL {
            for design in DesignLevel::ALL {
                for timeline in Timeline::ALL {
                    let result = calculate(&input(
                        *project_type,
                        7,
                        &[Feature::Analytics, Feature::Newsletter],
                        *design,
                        *timeline,
                    ));
                    let step = Decimal::from(ROUNDING_STEP);
                    assert!(result.total.min <= result.total.max);
                    assert_eq!(result.total.min % step, Decimal::ZERO);
                    assert_eq!(result.total.max % step, Decimal::ZERO);
                }
            }
        }
    }

    #[test]
    fn midpoint_rounds_up() {
        assert_eq!(round_to_step(Decimal::from(1025)), Decimal::from(1050));
        assert_eq!(round_to_step(Decimal::from(1024)), Decimal::from(1000));
    }
}
