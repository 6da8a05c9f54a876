// traffic_analyzer.rs
//
// Fixed-rule signal recommendation, used as the baseline the learned policy is
// compared against.

use crate::control_system::traffic_light_controller::Action;
use crate::shared_data::Observation;
use crate::simulation_engine::vehicles::Axis;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleBasedAnalyzer {
    /// One axis must carry this many times the other's vehicles to claim green.
    pub dominance_ratio: f64,
    /// Without a dominant axis, request the red axis every `cycle_steps` steps.
    pub cycle_steps: usize,
}

impl Default for RuleBasedAnalyzer {
    fn default() -> Self {
        Self {
            dominance_ratio: 1.5,
            cycle_steps: 50,
        }
    }
}

impl RuleBasedAnalyzer {
    pub fn recommend_action(&self, observation: &Observation, step: usize) -> Action {
        let counts = &observation.counts;
        let ns = (counts.north + counts.south) as f64;
        let ew = (counts.east + counts.west) as f64;
        let green = if observation.ns_green {
            Axis::NorthSouth
        } else {
            Axis::EastWest
        };

        if ns > ew * self.dominance_ratio && green == Axis::EastWest {
            Action::NsGreen
        } else if ew > ns * self.dominance_ratio && green == Axis::NorthSouth {
            Action::EwGreen
        } else if self.cycle_steps > 0 && step % self.cycle_steps == 0 {
            Action::for_axis(green.opposite())
        } else {
            Action::for_axis(green)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared_data::PerDirection;

    fn observation(counts: PerDirection<usize>, ns_green: bool) -> Observation {
        Observation {
            counts,
            ns_green,
            ..Observation::default()
        }
    }

    #[test]
    fn dominant_axis_claims_green() {
        let analyzer = RuleBasedAnalyzer::default();
        let heavy_ns = observation(PerDirection::new(3, 2, 1, 1), false);
        assert_eq!(analyzer.recommend_action(&heavy_ns, 7), Action::NsGreen);

        let heavy_ew = observation(PerDirection::new(1, 0, 2, 2), true);
        assert_eq!(analyzer.recommend_action(&heavy_ew, 7), Action::EwGreen);
    }

    #[test]
    fn balanced_traffic_keeps_green_between_cycles() {
        let analyzer = RuleBasedAnalyzer::default();
        let balanced = observation(PerDirection::new(1, 1, 1, 1), true);
        assert_eq!(analyzer.recommend_action(&balanced, 7), Action::NsGreen);
        assert_eq!(analyzer.recommend_action(&balanced, 50), Action::EwGreen);
    }
}
